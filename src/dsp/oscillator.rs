use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/*
Oscillators
===========

The bass voice uses a band-limited sawtooth or square; drums use a sine
(kick body) or white noise (snare, hats, clap).

Saw and square are naive ramps corrected with a polyBLEP residual at each
discontinuity, which keeps aliasing low enough for a bass line without the
cost of wavetables:

    saw:     2 * phase - 1            minus blep(phase)
    square:  +1 / -1 at phase 0.5     plus blep(phase) minus blep(phase + 0.5)

Phase runs 0..1 and is advanced by freq / sample_rate every sample, so the
frequency can change per sample (slides, kick pitch drops) without clicks.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorWaveform {
    Sine,
    Saw,
    Square,
    Noise,
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: OscillatorWaveform,
    phase: f32,
    rng: StdRng,
}

impl Oscillator {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
            rng: StdRng::seed_from_u64(0x303),
        }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorWaveform::Sine)
    }

    pub fn saw() -> Self {
        Self::new(OscillatorWaveform::Saw)
    }

    pub fn square() -> Self {
        Self::new(OscillatorWaveform::Square)
    }

    pub fn noise() -> Self {
        Self::new(OscillatorWaveform::Noise)
    }

    /// Reseed the noise source, so two noise voices do not sound identical
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.waveform
    }

    /// Produce one sample at `freq` Hz and advance the phase
    #[inline]
    pub fn next_sample(&mut self, freq: f32, sample_rate: f32) -> f32 {
        let dt = (freq / sample_rate).clamp(0.0, 0.5);
        let t = self.phase;

        let out = match self.waveform {
            OscillatorWaveform::Sine => (std::f32::consts::TAU * t).sin(),
            OscillatorWaveform::Saw => 2.0 * t - 1.0 - poly_blep(t, dt),
            OscillatorWaveform::Square => {
                let naive = if t < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(t, dt) - poly_blep((t + 0.5).fract(), dt)
            }
            OscillatorWaveform::Noise => self.rng.gen_range(-1.0..=1.0),
        };

        self.phase += dt;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        out
    }
}

/// Polynomial band-limited step residual
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let x = t / dt;
        x + x - x * x - 1.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        x * x + x + x + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(osc: &mut Oscillator, freq: f32, n: usize) -> Vec<f32> {
        (0..n).map(|_| osc.next_sample(freq, 48_000.0)).collect()
    }

    #[test]
    fn test_output_bounded() {
        for mut osc in [Oscillator::sine(), Oscillator::saw(), Oscillator::square(), Oscillator::noise()] {
            let out = render(&mut osc, 440.0, 4800);
            assert!(out.iter().all(|s| s.abs() <= 1.01), "{:?}", osc.waveform());
        }
    }

    #[test]
    fn test_sine_period() {
        // 480 Hz at 48 kHz = exactly 100 samples per period
        let mut osc = Oscillator::sine();
        let out = render(&mut osc, 480.0, 200);
        assert!(out[0].abs() < 1e-6);
        assert!((out[25] - 1.0).abs() < 1e-3);
        assert!((out[100] - out[0]).abs() < 1e-3);
    }

    #[test]
    fn test_saw_and_square_are_zero_mean() {
        for mut osc in [Oscillator::saw(), Oscillator::square()] {
            let out = render(&mut osc, 100.0, 48_000);
            let mean = out.iter().sum::<f32>() / out.len() as f32;
            assert!(mean.abs() < 0.01, "{mean}");
        }
    }

    #[test]
    fn test_noise_is_seeded() {
        let a = render(&mut Oscillator::noise().with_seed(1), 0.0, 64);
        let b = render(&mut Oscillator::noise().with_seed(1), 0.0, 64);
        let c = render(&mut Oscillator::noise().with_seed(2), 0.0, 64);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
