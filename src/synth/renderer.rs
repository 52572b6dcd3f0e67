//! Reference renderer: plays scheduled voices and drum hits sample by sample.
//!
//! Runs on the audio thread. It owns the sample clock the schedules refer to
//! (frame 0 is t = 0 s) and mixes everything down to mono.

use crate::dsp::automation::AutomationLane;
use crate::dsp::distortion::{drive_curve, soft_clip};
use crate::dsp::filter::SVFilter;
use crate::dsp::oscillator::Oscillator;
use crate::sequencing::pattern::Waveform;

use super::driver::{ParamTarget, VoiceSchedule};
use super::drums::{DrumHit, DrumRecipe, DrumSource};
use super::message::{MessageReceiver, SynthMessage};

const MAX_VOICES: usize = 32;
const MAX_DRUMS: usize = 64;

struct BassVoice {
    start: f64,
    stop: f64,
    frequency: AutomationLane,
    cutoff: AutomationLane,
    gain: AutomationLane,
    osc: Oscillator,
    stages: [SVFilter; 2],
    shaper: Option<(SVFilter, f32, f32)>,
}

impl BassVoice {
    fn new(schedule: &VoiceSchedule) -> Self {
        let osc = match schedule.waveform {
            Waveform::Sawtooth => Oscillator::saw(),
            Waveform::Square => Oscillator::square(),
        };
        let stage = SVFilter::lowpass(1000.0).with_resonance_db(schedule.resonance);
        Self {
            start: schedule.start,
            stop: schedule.stop,
            frequency: schedule.lane(ParamTarget::OscFrequency),
            cutoff: schedule.lane(ParamTarget::FilterCutoff),
            gain: schedule.lane(ParamTarget::AmpGain),
            osc,
            stages: [stage.clone(), stage],
            shaper: schedule
                .shaper
                .map(|s| (SVFilter::lowpass(s.tone), s.drive, s.trim)),
        }
    }

    #[inline]
    fn next_sample(&mut self, t: f64, sample_rate: f32) -> f32 {
        if t < self.start || t >= self.stop {
            return 0.0;
        }
        let mut s = self.osc.next_sample(self.frequency.value_at(t), sample_rate);
        let cutoff = self.cutoff.value_at(t);
        for stage in &mut self.stages {
            stage.set_cutoff(cutoff);
            s = stage.process(s, sample_rate);
        }
        if let Some((tone, drive, trim)) = &mut self.shaper {
            s = drive_curve(tone.process(s, sample_rate), *drive) * *trim;
        }
        s * self.gain.value_at(t)
    }
}

struct DrumVoice {
    hit: DrumHit,
    recipe: DrumRecipe,
    osc: Oscillator,
    filter: Option<SVFilter>,
}

impl DrumVoice {
    fn new(hit: DrumHit, seed: u64) -> Self {
        let recipe = DrumRecipe::for_instrument(hit.instrument);
        let (osc, filter) = match recipe.source {
            DrumSource::Sine { .. } => (Oscillator::sine(), None),
            DrumSource::Noise { filter, cutoff_hz } => (
                Oscillator::noise().with_seed(seed),
                Some(SVFilter::new(filter, cutoff_hz)),
            ),
        };
        Self { hit, recipe, osc, filter }
    }

    fn finished(&self, t: f64) -> bool {
        t - self.hit.at >= self.recipe.length()
    }

    #[inline]
    fn next_sample(&mut self, t: f64, sample_rate: f32) -> f32 {
        let elapsed = t - self.hit.at;
        if elapsed < 0.0 {
            return 0.0;
        }
        let mut s = self.osc.next_sample(self.recipe.frequency(elapsed), sample_rate);
        if let Some(filter) = &mut self.filter {
            s = filter.process(s, sample_rate);
        }
        s * self.recipe.envelope(elapsed) * self.hit.volume
    }
}

pub struct Renderer {
    sample_rate: f32,
    master_gain: f32,
    frames: u64,
    voices: Vec<BassVoice>,
    drums: Vec<DrumVoice>,
    hits_seen: u64,
}

impl Renderer {
    pub fn new(sample_rate: f32, master_gain: f32) -> Self {
        Self {
            sample_rate,
            master_gain,
            frames: 0,
            voices: Vec::with_capacity(MAX_VOICES),
            drums: Vec::with_capacity(MAX_DRUMS),
            hits_seen: 0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Clock position of the next sample, seconds
    pub fn time(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len() + self.drums.len()
    }

    pub fn handle(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::Voice(schedule) => {
                if self.voices.len() >= MAX_VOICES {
                    // Oldest voice makes room
                    self.voices.remove(0);
                }
                self.voices.push(BassVoice::new(&schedule));
            }
            SynthMessage::Drum(hit) => {
                if self.drums.len() >= MAX_DRUMS {
                    self.drums.remove(0);
                }
                self.hits_seen += 1;
                self.drums.push(DrumVoice::new(hit, self.hits_seen));
            }
            SynthMessage::CancelAfter(at) => {
                self.voices.retain(|v| v.start <= at);
                self.drums.retain(|d| d.hit.at <= at);
            }
            SynthMessage::AllNotesOff => {
                self.voices.clear();
                self.drums.clear();
            }
        }
    }

    /// Apply every pending message
    pub fn drain<R: MessageReceiver + ?Sized>(&mut self, receiver: &mut R) {
        while let Some(message) = receiver.pop() {
            self.handle(message);
        }
    }

    /// Render one mono block and advance the clock
    pub fn render(&mut self, out: &mut [f32]) {
        let sr = self.sample_rate;
        for sample in out.iter_mut() {
            let t = self.frames as f64 / sr as f64;
            let mut mix = 0.0;
            for voice in &mut self.voices {
                mix += voice.next_sample(t, sr);
            }
            for drum in &mut self.drums {
                mix += drum.next_sample(t, sr);
            }
            *sample = soft_clip(mix * self.master_gain, 1.0);
            self.frames += 1;
        }

        let now = self.time();
        self.voices.retain(|v| now < v.stop);
        self.drums.retain(|d| !d.finished(now));
    }
}
