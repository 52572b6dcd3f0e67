//! Spectrum display
//!
//! Hann-windowed FFT over the most recent output samples, read at
//! log-spaced frequencies and drawn as bars that fall back slowly.

use std::sync::Arc;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Bar, BarChart, BarGroup, Block, Borders},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

const FFT_SIZE: usize = 2048;
const MIN_FREQ: f32 = 30.0;
const FLOOR_DB: f32 = -90.0;
/// dB lost per frame when the level drops
const FALL_DB: f32 = 1.5;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Newest samples, oldest first
    history: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// FFT bin read for each display band
    bands: Vec<usize>,
    levels: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: f32, bands: usize) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(FFT_SIZE);
        let window = (0..FFT_SIZE)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (FFT_SIZE - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();

        let nyquist = (sample_rate / 2.0).min(16_000.0).max(MIN_FREQ * 2.0);
        let ratio = nyquist / MIN_FREQ;
        let last_bin = FFT_SIZE / 2 - 1;
        let bands = (0..bands.max(1))
            .map(|i| {
                let t = i as f32 / (bands.max(2) - 1) as f32;
                let freq = MIN_FREQ * ratio.powf(t);
                ((freq * FFT_SIZE as f32 / sample_rate).round() as usize).min(last_bin)
            })
            .collect::<Vec<_>>();

        Self {
            fft,
            window,
            history: vec![0.0; FFT_SIZE],
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            levels: vec![FLOOR_DB; bands.len()],
            bands,
        }
    }

    /// Append new output samples, keeping the last `FFT_SIZE`
    pub fn push(&mut self, samples: &[f32]) {
        if samples.len() >= FFT_SIZE {
            self.history.copy_from_slice(&samples[samples.len() - FFT_SIZE..]);
        } else if !samples.is_empty() {
            self.history.drain(..samples.len());
            self.history.extend_from_slice(samples);
        }
    }

    pub fn update(&mut self) {
        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(&self.history).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        for (level, &bin) in self.levels.iter_mut().zip(&self.bands) {
            let c = self.scratch[bin];
            let db = (10.0 * (c.re * c.re + c.im * c.im).max(1e-12).log10()).max(FLOOR_DB);
            *level = if db > *level { db } else { (*level - FALL_DB).max(db) };
        }
    }

    /// Drop everything, e.g. when playback stops
    pub fn clear(&mut self) {
        self.history.fill(0.0);
        self.levels.fill(FLOOR_DB);
    }

    /// Levels in dB, low band first
    pub fn levels(&self) -> &[f32] {
        &self.levels
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, levels: &[f32], running: bool) {
    let block = Block::default().title(" Spectrum ").borders(Borders::ALL);
    let bars: Vec<Bar> = levels
        .iter()
        .map(|db| Bar::default().value((db - FLOOR_DB).max(0.0) as u64).text_value(String::new()))
        .collect();

    let chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(1)
        .bar_gap(0)
        .max((-FLOOR_DB + 10.0) as u64)
        .bar_style(Style::default().fg(if running { Color::Green } else { Color::DarkGray }));

    frame.render_widget(chart, area);
}
