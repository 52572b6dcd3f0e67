use std::f32::consts::PI;

/*
| type              | constructed by       | passes          | rejects      |
| ----------------- | -------------------- | --------------- | ------------ |
| low-pass          | LPF                  | below cutoff    | above cutoff |
| high-pass         | HPF                  | above cutoff    | below cutoff |
| band-pass         | LPF ∘ HPF (series)   | between cutoffs | outside      |

Trapezoidal state-variable filter (Simper). Cutoff may change every sample,
which the bass voice needs for its decaying filter sweep.

Resonance is given the way a synth panel labels it, as a peak gain in dB:
q = 10^(dB / 20), damping k = 1 / q.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
}

#[derive(Debug, Clone)]
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    pub cutoff_hz: f32,
    k: f32,
    filter_type: FilterType,
}

/// Butterworth damping (no resonant peak)
const FLAT_K: f32 = std::f32::consts::SQRT_2;

impl SVFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            k: FLAT_K,
            filter_type,
        }
    }

    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz)
    }

    /// Resonance as peak gain in dB
    pub fn with_resonance_db(mut self, db: f32) -> Self {
        self.set_resonance_db(db);
        self
    }

    pub fn set_resonance_db(&mut self, db: f32) {
        let q = 10f32.powf(db / 20.0).max(0.5);
        self.k = 1.0 / q;
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff_hz = cutoff;
    }

    #[inline]
    fn compute_g(&self, sample_rate: f32) -> f32 {
        // Keep below Nyquist so tan() stays finite
        let fc = self.cutoff_hz.clamp(1.0, sample_rate * 0.49);
        (PI * fc / sample_rate).tan()
    }

    pub fn next_sample(&mut self, sample: f32, k: f32, g: f32) -> FilterOutputs {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
        }
    }

    /// Filter one sample at the current cutoff
    #[inline]
    pub fn process(&mut self, sample: f32, sample_rate: f32) -> f32 {
        let g = self.compute_g(sample_rate);
        let outputs = self.next_sample(sample, self.k, g);
        match self.filter_type {
            FilterType::LowPass => outputs.lowpass,
            FilterType::HighPass => outputs.highpass,
            FilterType::BandPass => outputs.bandpass,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample, sample_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::Oscillator;

    const SR: f32 = 48_000.0;

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len().min(256);
        buffer
            .get(skip..)
            .unwrap_or(buffer)
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    fn sine(freq: f32, n: usize) -> Vec<f32> {
        let mut osc = Oscillator::sine();
        (0..n).map(|_| osc.next_sample(freq, SR)).collect()
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = SVFilter::lowpass(500.0);
        let mut buffer = vec![1.0; 2048];
        filter.render(&mut buffer, SR);
        assert!((buffer[2047] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut filter = SVFilter::new(FilterType::HighPass, 500.0);
        let mut buffer = vec![1.0; 2048];
        filter.render(&mut buffer, SR);
        assert!(buffer[2047].abs() < 0.01);
    }

    #[test]
    fn test_lowpass_filters_high_freq() {
        let mut filter = SVFilter::lowpass(500.0);
        let mut buffer = sine(5_000.0, 4096);
        filter.render(&mut buffer, SR);
        // Ten times the cutoff is ~40 dB down for a 12 dB/oct slope
        assert!(peak_after_transient(&buffer) < 0.05);
    }

    #[test]
    fn test_resonance_boosts_cutoff() {
        let mut flat = SVFilter::lowpass(1_000.0);
        let mut resonant = SVFilter::lowpass(1_000.0).with_resonance_db(12.0);
        let mut a = sine(1_000.0, 4096);
        let mut b = a.clone();
        flat.render(&mut a, SR);
        resonant.render(&mut b, SR);
        assert!(peak_after_transient(&b) > 2.0 * peak_after_transient(&a));
    }

    #[test]
    fn test_cutoff_above_nyquist_is_stable() {
        let mut filter = SVFilter::lowpass(40_000.0);
        let mut buffer = sine(440.0, 1024);
        filter.render(&mut buffer, SR);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }
}
