/*
Bass Voice Scheduling
=====================

One resolved chain becomes one voice. Nothing here touches audio: the
output is a schedule of timestamped parameter changes that a backend plays
back on its own clock.

    osc  ──► lowpass ──► lowpass ──► [tone ─► shaper ─► trim] ──► VCA
    freq      cutoff      cutoff          (only if drive > 0)       gain

Timeline for a chain of n steps starting at t0, step length d:

    t0            t0+d          t0+2d                     t0+n·d
    |  note 1     |  slide →    |  tie (held)   ...  ──┐  |
    freq: set f1  set f1, linear to f2 over 0.85·d,     |  |
                  then set f2                           |  |
    gain: ───────── level (accent dependent) ──────────┘╲ | release 2 ms
    cutoff: initial ╲_ exp. decay to cutoff  (restarted at each tie)

Filter sweep:

    extra   = 2000 Hz * envMod / 100
    accent  → cutoff × 1.3, resonance × 1.15, extra × 1.5
    initial = cutoff + extra, decays to cutoff over decay · (0.7 if accent)
*/

use crate::dsp::automation::{AutomationLane, AutomationPoint, Ramp};
use crate::sequencing::chain::{Chain, Link};
use crate::sequencing::notes::Note;
use crate::sequencing::pattern::{Knobs, Waveform};

/// Share of a step a slide takes to reach the new pitch
pub const GLIDE_RATIO: f64 = 0.85;
/// VCA release at the end of a chain
pub const RELEASE: f64 = 0.002;
/// The oscillator keeps running this long after the release
pub const TAIL: f64 = 0.05;
/// Level the release decays to (exponential ramps cannot reach zero)
pub const FLOOR_GAIN: f32 = 0.001;
/// Filter envelope range at envMod = 100 %
pub const ENV_RANGE_HZ: f32 = 2000.0;

pub const BASE_GAIN: f32 = 0.55;
/// Gain added by an accent at the default accent knob (70 %)
pub const ACCENT_BOOST: f32 = 0.30;

const ACCENT_CUTOFF: f32 = 1.3;
const ACCENT_RESONANCE: f32 = 1.15;
const ACCENT_ENV: f32 = 1.5;
const ACCENT_DECAY: f32 = 0.7;
const DEFAULT_ACCENT_KNOB: f32 = 70.0;

const SLIDE_SETTLE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamTarget {
    OscFrequency,
    FilterCutoff,
    AmpGain,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamEvent {
    pub target: ParamTarget,
    pub ramp: Ramp,
    pub value: f32,
    /// Seconds on the backend clock
    pub at: f64,
}

/// Distortion stage settings, present only when drive is above zero
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shaper {
    /// 0..100
    pub drive: f32,
    /// Lowpass ahead of the shaper, Hz
    pub tone: f32,
    /// Output trim, 0..1
    pub trim: f32,
}

/// Filter envelope for one chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSweep {
    /// Where the sweep settles, Hz
    pub cutoff: f32,
    /// Where the sweep starts, Hz
    pub initial: f32,
    /// Resonance as peak gain in dB
    pub resonance: f32,
    /// Seconds from initial to cutoff
    pub decay: f64,
}

impl FilterSweep {
    pub fn new(knobs: &Knobs, accent: bool) -> Self {
        let mut cutoff = knobs.cutoff;
        let mut resonance = knobs.resonance;
        let mut extra = ENV_RANGE_HZ * knobs.env_mod / 100.0;
        if accent {
            cutoff *= ACCENT_CUTOFF;
            resonance *= ACCENT_RESONANCE;
            extra *= ACCENT_ENV;
        }
        let decay = (knobs.decay / 1000.0) * if accent { ACCENT_DECAY } else { 1.0 };
        Self {
            cutoff,
            initial: cutoff + extra,
            resonance,
            decay: decay as f64,
        }
    }

    /// Envelope value `elapsed` seconds after a (re)trigger
    pub fn value_after(&self, elapsed: f64) -> f32 {
        if elapsed >= self.decay || self.decay <= 0.0 {
            return self.cutoff;
        }
        let frac = (elapsed.max(0.0) / self.decay) as f32;
        self.initial * (self.cutoff / self.initial).powf(frac)
    }
}

/// VCA level for a chain. The accent knob scales the accent boost.
pub fn voice_gain(knobs: &Knobs, accent: bool) -> f32 {
    if accent {
        (BASE_GAIN + ACCENT_BOOST * knobs.accent / DEFAULT_ACCENT_KNOB).min(1.0)
    } else {
        BASE_GAIN
    }
}

/// Note frequency with the tune knob applied
pub fn tuned_frequency(note: Note, tune: f32) -> f32 {
    (note.frequency() * 2f64.powf(tune as f64 / 12.0)) as f32
}

/// Everything a backend needs to play one bass voice
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSchedule {
    pub start: f64,
    /// End of the release
    pub end: f64,
    /// Oscillator stop time
    pub stop: f64,
    pub waveform: Waveform,
    pub accent: bool,
    /// Resonance as peak gain in dB, shared by both filter stages
    pub resonance: f32,
    pub shaper: Option<Shaper>,
    pub events: Vec<ParamEvent>,
}

impl VoiceSchedule {
    pub fn events_for(&self, target: ParamTarget) -> impl Iterator<Item = &ParamEvent> + '_ {
        self.events.iter().filter(move |e| e.target == target)
    }

    /// Automation lane for one parameter
    pub fn lane(&self, target: ParamTarget) -> AutomationLane {
        let mut lane = AutomationLane::new(0.0);
        for e in self.events_for(target) {
            lane.push(AutomationPoint {
                ramp: e.ramp,
                value: e.value,
                at: e.at,
            });
        }
        lane
    }

    fn push(&mut self, target: ParamTarget, ramp: Ramp, value: f32, at: f64) {
        self.events.push(ParamEvent { target, ramp, value, at });
    }
}

/// Turn a resolved chain into a voice starting at `start` (backend clock)
pub fn schedule_chain(
    chain: &Chain,
    knobs: &Knobs,
    waveform: Waveform,
    start: f64,
    step_duration: f64,
) -> VoiceSchedule {
    let accent = chain.accent();
    let total = chain.len() as f64 * step_duration;
    let end = start + total;
    let sweep = FilterSweep::new(knobs, accent);

    let mut voice = VoiceSchedule {
        start,
        end,
        stop: end + TAIL,
        waveform,
        accent,
        resonance: sweep.resonance,
        shaper: (knobs.drive > 0.0).then_some(Shaper {
            drive: knobs.drive,
            tone: knobs.tone,
            trim: knobs.dist_volume / 100.0,
        }),
        events: Vec::with_capacity(chain.len() * 3 + 6),
    };

    // Pitch
    let freqs: Vec<f32> = chain.notes().map(|n| tuned_frequency(n, knobs.tune)).collect();
    let Some(&first) = freqs.first() else {
        return voice;
    };
    voice.push(ParamTarget::OscFrequency, Ramp::Set, first, start);

    let mut retriggers = Vec::new();
    for (k, step) in chain.steps().iter().enumerate().skip(1) {
        let t = start + k as f64 * step_duration;
        match step.link {
            Link::Slide => {
                let glide_end = t + step_duration * GLIDE_RATIO;
                voice.push(ParamTarget::OscFrequency, Ramp::Set, freqs[k - 1], t);
                voice.push(ParamTarget::OscFrequency, Ramp::Linear, freqs[k], glide_end);
                voice.push(ParamTarget::OscFrequency, Ramp::Set, freqs[k], glide_end + SLIDE_SETTLE);
            }
            Link::Tie => {
                voice.push(ParamTarget::OscFrequency, Ramp::Set, freqs[k], t);
                retriggers.push(t);
            }
            Link::Start => {}
        }
    }

    // Filter: one decay segment per trigger, cut short where the next begins
    let mut segment_starts = vec![start];
    segment_starts.extend(retriggers);
    for (i, &seg_start) in segment_starts.iter().enumerate() {
        voice.push(ParamTarget::FilterCutoff, Ramp::Set, sweep.initial, seg_start);
        let settled = seg_start + sweep.decay;
        match segment_starts.get(i + 1) {
            Some(&next) if next < settled => {
                let reached = sweep.value_after(next - seg_start);
                voice.push(ParamTarget::FilterCutoff, Ramp::Exponential, reached, next);
            }
            _ => voice.push(ParamTarget::FilterCutoff, Ramp::Exponential, sweep.cutoff, settled),
        }
    }

    // Amplitude
    let level = voice_gain(knobs, accent);
    voice.push(ParamTarget::AmpGain, Ramp::Set, level, start);
    voice.push(ParamTarget::AmpGain, Ramp::Set, level, (end - RELEASE).max(start));
    voice.push(ParamTarget::AmpGain, Ramp::Exponential, FLOOR_GAIN, end);

    voice
}

/// Short audition blip for a single note (grid clicks)
pub fn schedule_preview(note: Note, knobs: &Knobs, waveform: Waveform, start: f64) -> VoiceSchedule {
    const LENGTH: f64 = 0.25;
    const LEVEL: f32 = 0.4;
    let mut voice = VoiceSchedule {
        start,
        end: start + LENGTH,
        stop: start + LENGTH,
        waveform,
        accent: false,
        resonance: 0.0,
        shaper: None,
        events: Vec::with_capacity(4),
    };
    voice.push(ParamTarget::OscFrequency, Ramp::Set, tuned_frequency(note, knobs.tune), start);
    voice.push(ParamTarget::FilterCutoff, Ramp::Set, 20_000.0, start);
    voice.push(ParamTarget::AmpGain, Ramp::Set, LEVEL, start);
    voice.push(ParamTarget::AmpGain, Ramp::Exponential, FLOOR_GAIN, start + LENGTH);
    voice
}
