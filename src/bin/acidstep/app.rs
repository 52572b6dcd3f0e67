//! Audio output and the interactive session

use color_eyre::eyre::Result as EyreResult;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{info, warn};

use acidstep::{
    config::EngineConfig,
    io::Library,
    runtime::{EngineContext, UiSink},
    sequencing::Pattern,
    synth::{AudioBackend, NullBackend, Renderer, RingBackend, SampleClock, SynthMessage},
    Error, MAX_BLOCK_SIZE,
};

use super::ui::{TuiSink, UiApp};
use super::Storage;

const MESSAGE_QUEUE: usize = 1024;
/// About 0.3 s of mono audio for the spectrum
const SAMPLE_QUEUE: usize = 16_384;

/// Keeps the cpal stream alive
pub struct AudioOutput {
    _stream: cpal::Stream,
    pub sample_rate: f32,
}

impl AudioOutput {
    /// Open the default device with a renderer fed by a message ring.
    ///
    /// Returns the stream, the backend that feeds it and a tap of the
    /// rendered samples.
    pub fn open(master_gain: f32) -> Result<(Self, RingBackend, Consumer<f32>), Error> {
        let unavailable = |e: &dyn std::fmt::Display| Error::AudioUnavailable(e.to_string());

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioUnavailable("no default output device".into()))?;
        let config = device.default_output_config().map_err(|e| unavailable(&e))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let (msg_tx, mut msg_rx) = RingBuffer::<SynthMessage>::new(MESSAGE_QUEUE);
        let (mut sample_tx, sample_rx): (Producer<f32>, Consumer<f32>) = RingBuffer::new(SAMPLE_QUEUE);
        let clock = SampleClock::new(sample_rate as f64);
        let audio_clock = clock.clone();

        let mut renderer = Renderer::new(sample_rate, master_gain);
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| {
                    renderer.drain(&mut msg_rx);
                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;

                    while frames_written < total_frames {
                        let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let block = &mut render_buf[..frames];
                        renderer.render(block);

                        // Spectrum tap; a slow UI just misses samples
                        for &s in block.iter() {
                            let _ = sample_tx.push(s);
                        }

                        let out_off = frames_written * channels;
                        for (i, &s) in block.iter().enumerate() {
                            for ch in 0..channels {
                                data[out_off + i * channels + ch] = s;
                            }
                        }
                        audio_clock.advance(frames as u64);
                        frames_written += frames;
                    }
                },
                |err| warn!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| unavailable(&e))?;
        stream.play().map_err(|e| unavailable(&e))?;

        info!(sample_rate, channels, "audio output open");
        Ok((
            Self {
                _stream: stream,
                sample_rate,
            },
            RingBackend::new(msg_tx, clock),
            sample_rx,
        ))
    }
}

/// Run the terminal UI until the user quits
pub fn run(
    config: EngineConfig,
    library: Library<Storage>,
    pattern: Pattern,
    track: Vec<String>,
) -> EyreResult<()> {
    let (output, backend, samples): (Option<AudioOutput>, Box<dyn AudioBackend>, Option<Consumer<f32>>) =
        match AudioOutput::open(config.master_gain) {
            Ok((output, backend, samples)) => (Some(output), Box::new(backend), Some(samples)),
            Err(e) => {
                warn!(error = %e, "running without sound");
                (None, Box::new(NullBackend::default()), None)
            }
        };
    let sample_rate = output.as_ref().map_or(48_000.0, |o| o.sample_rate);

    let mut sink = TuiSink::default();
    if output.is_none() {
        sink.notice("No audio output, running silent");
    }
    let ctx = EngineContext::with_ui(config, backend, sink).with_pattern(pattern);

    let mut app = UiApp::new(ctx, library, track, samples, sample_rate);
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();

    app.shutdown();
    drop(output);
    result
}
