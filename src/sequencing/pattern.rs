/*
Pattern Model
=============

A pattern is what the user edits: a 16..64 step bassline, the synth knob
settings it was written with, a waveform, and a drum lane per instrument.

    steps    [Step; pages * 16]     note + accent/slide/extend per step
    knobs    Knobs                  tune, cutoff, resonance, ...
    waveform Sawtooth | Square
    drums    DrumLane per instrument, same length as steps

On disk and on the clipboard a pattern is plain JSON:

    {
      "pages": 1,
      "steps": [{ "step": 0, "note": "C-2", "accent": true, "slide": false, "extend": false }, ...],
      "knobs": { "tune": 0, "cutoff": 800, "resonance": 5, "envMod": 50, "decay": 500,
                 "accent": 70, "drive": 0, "tone": 20000, "distVolume": 100 },
      "waveform": "sawtooth",
      "drums": { "kick": { "steps": [true, false, ...], "volume": 1.0 }, ... }
    }

`Pattern::from_value` is the single load boundary: whatever comes in
(old files, hand-edited JSON, AI output) is coerced into a well-formed
pattern. It never fails.
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::notes::Note;
use crate::error::Error;

/// Steps per page (one bar of sixteenths)
pub const STEPS_PER_PAGE: usize = 16;
/// Maximum number of pages a pattern may span
pub const MAX_PAGES: usize = 4;

/// One slot of the step grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub note: Option<Note>,
    pub accent: bool,
    pub slide: bool,
    pub extend: bool,
}

impl Step {
    pub fn is_empty(&self) -> bool {
        *self == Step::default()
    }

    pub fn flag(&self, flag: StepFlag) -> bool {
        match flag {
            StepFlag::Accent => self.accent,
            StepFlag::Slide => self.slide,
            StepFlag::Extend => self.extend,
        }
    }

    pub fn toggle(&mut self, flag: StepFlag) {
        let value = match flag {
            StepFlag::Accent => &mut self.accent,
            StepFlag::Slide => &mut self.slide,
            StepFlag::Extend => &mut self.extend,
        };
        *value = !*value;
    }
}

/// Per-step articulation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFlag {
    Accent,
    Slide,
    Extend,
}

impl FromStr for StepFlag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accent" | "acc" => Ok(StepFlag::Accent),
            "slide" => Ok(StepFlag::Slide),
            "extend" | "ext" | "tie" => Ok(StepFlag::Extend),
            other => Err(Error::UnknownFlag(other.to_string())),
        }
    }
}

/// Oscillator shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sawtooth,
    Square,
}

impl Waveform {
    pub fn toggled(self) -> Self {
        match self {
            Waveform::Sawtooth => Waveform::Square,
            Waveform::Square => Waveform::Sawtooth,
        }
    }

    /// Anything other than "square" is a sawtooth
    fn from_loose(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("square") => Waveform::Square,
            _ => Waveform::Sawtooth,
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Waveform::Sawtooth => "sawtooth",
            Waveform::Square => "square",
        })
    }
}

/// Names of the synth knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnobKey {
    Tune,
    Cutoff,
    Resonance,
    EnvMod,
    Decay,
    Accent,
    Drive,
    Tone,
    DistVolume,
}

impl KnobKey {
    pub const ALL: [KnobKey; 9] = [
        KnobKey::Tune,
        KnobKey::Cutoff,
        KnobKey::Resonance,
        KnobKey::EnvMod,
        KnobKey::Decay,
        KnobKey::Accent,
        KnobKey::Drive,
        KnobKey::Tone,
        KnobKey::DistVolume,
    ];

    /// Inclusive (min, max) range
    pub fn range(self) -> (f32, f32) {
        match self {
            KnobKey::Tune => (-12.0, 12.0),
            KnobKey::Cutoff => (20.0, 4000.0),
            KnobKey::Resonance => (0.1, 30.0),
            KnobKey::EnvMod => (0.0, 100.0),
            KnobKey::Decay => (50.0, 2000.0),
            KnobKey::Accent => (0.0, 100.0),
            KnobKey::Drive => (0.0, 100.0),
            KnobKey::Tone => (20.0, 20_000.0),
            KnobKey::DistVolume => (0.0, 100.0),
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            KnobKey::Tune => 0.0,
            KnobKey::Cutoff => 800.0,
            KnobKey::Resonance => 5.0,
            KnobKey::EnvMod => 50.0,
            KnobKey::Decay => 500.0,
            KnobKey::Accent => 70.0,
            KnobKey::Drive => 0.0,
            KnobKey::Tone => 20_000.0,
            KnobKey::DistVolume => 100.0,
        }
    }

    /// Clamp into range; NaN falls back to the default
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        let (min, max) = self.range();
        value.clamp(min, max)
    }

    /// JSON field name
    pub fn name(self) -> &'static str {
        match self {
            KnobKey::Tune => "tune",
            KnobKey::Cutoff => "cutoff",
            KnobKey::Resonance => "resonance",
            KnobKey::EnvMod => "envMod",
            KnobKey::Decay => "decay",
            KnobKey::Accent => "accent",
            KnobKey::Drive => "drive",
            KnobKey::Tone => "tone",
            KnobKey::DistVolume => "distVolume",
        }
    }
}

impl FromStr for KnobKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnobKey::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownKnob(s.to_string()))
    }
}

/// Synth knob settings stored with a pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Knobs {
    /// Semitones, -12..12
    pub tune: f32,
    /// Hz
    pub cutoff: f32,
    pub resonance: f32,
    /// Percent
    pub env_mod: f32,
    /// Milliseconds
    pub decay: f32,
    /// Percent
    pub accent: f32,
    /// Percent, 0 bypasses the distortion stage
    pub drive: f32,
    /// Hz, lowpass ahead of the waveshaper
    pub tone: f32,
    /// Percent
    pub dist_volume: f32,
}

impl Default for Knobs {
    fn default() -> Self {
        let mut knobs = Knobs {
            tune: 0.0,
            cutoff: 0.0,
            resonance: 0.0,
            env_mod: 0.0,
            decay: 0.0,
            accent: 0.0,
            drive: 0.0,
            tone: 0.0,
            dist_volume: 0.0,
        };
        for key in KnobKey::ALL {
            *knobs.slot(key) = key.default_value();
        }
        knobs
    }
}

impl Knobs {
    pub fn get(&self, key: KnobKey) -> f32 {
        match key {
            KnobKey::Tune => self.tune,
            KnobKey::Cutoff => self.cutoff,
            KnobKey::Resonance => self.resonance,
            KnobKey::EnvMod => self.env_mod,
            KnobKey::Decay => self.decay,
            KnobKey::Accent => self.accent,
            KnobKey::Drive => self.drive,
            KnobKey::Tone => self.tone,
            KnobKey::DistVolume => self.dist_volume,
        }
    }

    /// Set a knob, clamped to its declared range. Returns the stored value.
    pub fn set(&mut self, key: KnobKey, value: f32) -> f32 {
        let clamped = key.clamp(value);
        *self.slot(key) = clamped;
        clamped
    }

    fn slot(&mut self, key: KnobKey) -> &mut f32 {
        match key {
            KnobKey::Tune => &mut self.tune,
            KnobKey::Cutoff => &mut self.cutoff,
            KnobKey::Resonance => &mut self.resonance,
            KnobKey::EnvMod => &mut self.env_mod,
            KnobKey::Decay => &mut self.decay,
            KnobKey::Accent => &mut self.accent,
            KnobKey::Drive => &mut self.drive,
            KnobKey::Tone => &mut self.tone,
            KnobKey::DistVolume => &mut self.dist_volume,
        }
    }

    fn from_loose(value: Option<&Value>) -> Self {
        let mut knobs = Knobs::default();
        let Some(map) = value.and_then(Value::as_object) else {
            return knobs;
        };
        for key in KnobKey::ALL {
            if let Some(v) = map.get(key.name()).and_then(Value::as_f64) {
                knobs.set(key, v as f32);
            }
        }
        knobs
    }
}

/// Drum machine voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrumInstrument {
    Kick,
    Snare,
    ClosedHat,
    OpenHat,
    Clap,
}

impl DrumInstrument {
    pub const ALL: [DrumInstrument; 5] = [
        DrumInstrument::Kick,
        DrumInstrument::Snare,
        DrumInstrument::ClosedHat,
        DrumInstrument::OpenHat,
        DrumInstrument::Clap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DrumInstrument::Kick => "kick",
            DrumInstrument::Snare => "snare",
            DrumInstrument::ClosedHat => "closedHat",
            DrumInstrument::OpenHat => "openHat",
            DrumInstrument::Clap => "clap",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Classic preset used when an old file only says `"kick": true`
    fn legacy_preset(self, step: usize) -> bool {
        match self {
            DrumInstrument::Kick => step % 4 == 0,
            DrumInstrument::Snare => step % STEPS_PER_PAGE == 4 || step % STEPS_PER_PAGE == 12,
            _ => false,
        }
    }
}

impl FromStr for DrumInstrument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrumInstrument::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownInstrument(s.to_string()))
    }
}

/// One instrument's trigger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumLane {
    pub steps: Vec<bool>,
    /// 0.0..=1.0
    pub volume: f32,
}

impl DrumLane {
    pub fn new(len: usize) -> Self {
        Self {
            steps: vec![false; len],
            volume: 1.0,
        }
    }

    pub fn is_on(&self, step: usize) -> bool {
        self.steps.get(step).copied().unwrap_or(false)
    }

    fn from_loose(instrument: DrumInstrument, value: Option<&Value>, len: usize) -> Self {
        let mut lane = DrumLane::new(len);
        match value {
            Some(Value::Bool(on)) => {
                if *on {
                    for (i, cell) in lane.steps.iter_mut().enumerate() {
                        *cell = instrument.legacy_preset(i);
                    }
                }
            }
            Some(Value::Object(map)) => {
                if let Some(cells) = map.get("steps").and_then(Value::as_array) {
                    for (cell, raw) in lane.steps.iter_mut().zip(cells) {
                        *cell = truthy(raw);
                    }
                }
                if let Some(v) = map.get("volume").and_then(Value::as_f64) {
                    lane.volume = clamp_volume(v as f32);
                }
            }
            _ => {}
        }
        lane
    }
}

/// Lane volume range; NaN falls back to full volume
pub(crate) fn clamp_volume(v: f32) -> f32 {
    if v.is_nan() {
        1.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Drum sub-pattern: one lane per instrument
#[derive(Debug, Clone, PartialEq)]
pub struct Drums {
    lanes: [DrumLane; 5],
}

impl Drums {
    pub fn new(len: usize) -> Self {
        Self {
            lanes: std::array::from_fn(|_| DrumLane::new(len)),
        }
    }

    pub fn lane(&self, instrument: DrumInstrument) -> &DrumLane {
        &self.lanes[instrument.index()]
    }

    pub fn lane_mut(&mut self, instrument: DrumInstrument) -> &mut DrumLane {
        &mut self.lanes[instrument.index()]
    }

    /// Instruments that fire on `step`, with their lane volume
    pub fn hits_at(&self, step: usize) -> impl Iterator<Item = (DrumInstrument, f32)> + '_ {
        DrumInstrument::ALL
            .into_iter()
            .filter(move |d| self.lane(*d).is_on(step))
            .map(|d| (d, self.lane(d).volume))
    }

    fn resize(&mut self, len: usize) {
        for lane in &mut self.lanes {
            lane.steps.resize(len, false);
        }
    }

    fn clear(&mut self) {
        for lane in &mut self.lanes {
            lane.steps.fill(false);
        }
    }

    fn from_loose(value: Option<&Value>, len: usize) -> Self {
        let map = value.and_then(Value::as_object);
        Self {
            lanes: DrumInstrument::ALL
                .map(|d| DrumLane::from_loose(d, map.and_then(|m| m.get(d.name())), len)),
        }
    }
}

impl Serialize for Drums {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.lanes.len()))?;
        for instrument in DrumInstrument::ALL {
            map.serialize_entry(instrument.name(), self.lane(instrument))?;
        }
        map.end()
    }
}

/// A complete editable pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    steps: Vec<Step>,
    pub knobs: Knobs,
    pub waveform: Waveform,
    drums: Drums,
}

impl Default for Pattern {
    fn default() -> Self {
        Self::with_pages(1)
    }
}

impl Pattern {
    /// Empty pattern spanning `pages` pages (clamped to 1..=4)
    pub fn with_pages(pages: usize) -> Self {
        let len = clamp_pages(pages) * STEPS_PER_PAGE;
        Self {
            steps: vec![Step::default(); len],
            knobs: Knobs::default(),
            waveform: Waveform::default(),
            drums: Drums::new(len),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut Step> {
        self.steps.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// No step carries a note or a flag
    pub fn is_blank(&self) -> bool {
        self.steps.iter().all(Step::is_empty)
    }

    pub fn pages(&self) -> usize {
        self.steps.len() / STEPS_PER_PAGE
    }

    pub fn drums(&self) -> &Drums {
        &self.drums
    }

    pub fn drums_mut(&mut self) -> &mut Drums {
        &mut self.drums
    }

    /// Resize to `pages` pages, keeping existing steps and zero-filling new ones
    pub fn set_pages(&mut self, pages: usize) {
        let len = clamp_pages(pages) * STEPS_PER_PAGE;
        self.steps.resize(len, Step::default());
        self.drums.resize(len);
    }

    /// Reset every step and every drum cell; knobs and waveform are kept
    pub fn clear(&mut self) {
        self.steps.fill(Step::default());
        self.drums.clear();
    }

    /// Normalize an arbitrary JSON-like value into a well-formed pattern.
    ///
    /// Missing fields take defaults, unparsable notes become rests,
    /// steps past the pattern length are ignored and non-boolean flags are
    /// coerced with the usual truthiness rules.
    pub fn from_value(raw: &Value) -> Self {
        let empty = Map::new();
        let obj = raw.as_object().unwrap_or(&empty);
        let raw_steps = obj.get("steps").and_then(Value::as_array);

        let pages = obj
            .get("pages")
            .and_then(Value::as_f64)
            .filter(|p| p.is_finite())
            .map(|p| p.round().max(1.0) as usize)
            .or_else(|| raw_steps.map(|s| s.len().div_ceil(STEPS_PER_PAGE)))
            .unwrap_or(1);

        let mut pattern = Pattern::with_pages(pages);
        let len = pattern.len();

        if let Some(raw_steps) = raw_steps {
            if raw_steps.len() > len {
                debug!(dropped = raw_steps.len() - len, "ignoring steps past pattern length");
            }
            for (step, raw) in pattern.steps.iter_mut().zip(raw_steps) {
                let Some(fields) = raw.as_object() else {
                    continue;
                };
                *step = step_from_loose(fields);
            }
        }

        pattern.knobs = Knobs::from_loose(obj.get("knobs"));
        pattern.waveform = Waveform::from_loose(obj.get("waveform"));
        pattern.drums = Drums::from_loose(obj.get("drums"), len);
        pattern
    }

    /// Normalize a loaded document: a bare pattern, a library entry
    /// (`pattern` field) or a preset file (`tb303` field).
    pub fn from_document(raw: &Value) -> Self {
        let inner = raw
            .get("pattern")
            .filter(|v| v.is_object())
            .or_else(|| raw.get("tb303").filter(|v| v.is_object()))
            .unwrap_or(raw);
        Self::from_value(inner)
    }

    /// Parse JSON text. Only syntax errors fail; content is normalized.
    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_document(&value))
    }

    pub fn to_value(&self) -> Value {
        // Serializing plain data into a Value cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// The empty pattern as pretty JSON, used as a fill-in template
    pub fn template_json() -> String {
        Pattern::default().to_json_pretty()
    }
}

fn step_from_loose(fields: &Map<String, Value>) -> Step {
    let note = match fields.get("note") {
        Some(Value::String(s)) => {
            let note = Note::normalize(s);
            if note.is_none() {
                debug!(raw = %s, "dropping unparsable note");
            }
            note
        }
        _ => None,
    };
    let flag = |name: &str| fields.get(name).map(truthy).unwrap_or(false);
    Step {
        note,
        accent: flag("accent"),
        slide: flag("slide"),
        extend: flag("extend"),
    }
}

/// Loose boolean coercion for hand-written JSON
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn clamp_pages(pages: usize) -> usize {
    pages.clamp(1, MAX_PAGES)
}

#[derive(Serialize)]
struct StepRecord<'a> {
    step: usize,
    #[serde(flatten)]
    inner: &'a Step,
}

impl Serialize for Pattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let steps: Vec<StepRecord<'_>> = self
            .steps
            .iter()
            .enumerate()
            .map(|(step, inner)| StepRecord { step, inner })
            .collect();
        let mut s = serializer.serialize_struct("Pattern", 5)?;
        s.serialize_field("pages", &self.pages())?;
        s.serialize_field("steps", &steps)?;
        s.serialize_field("knobs", &self.knobs)?;
        s.serialize_field("waveform", &self.waveform)?;
        s.serialize_field("drums", &self.drums)?;
        s.end()
    }
}

/// Deserialization goes through the lenient loader
impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Pattern::from_value(&value))
    }
}
