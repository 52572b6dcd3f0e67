//! Benchmarks for the per-tick work and the reference renderer.
//!
//! Run with: cargo bench
//!
//! A tick has to resolve a chain and build its schedule well inside one
//! step (125 ms at 120 BPM); the renderer has to keep up with the audio
//! callback.
//!
//! Reference timing at 48kHz sample rate:
//!   - 128 samples = 2.67ms deadline
//!   - 512 samples = 10.67ms deadline

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use acidstep::dsp::distortion::drive_buffer;
use acidstep::dsp::filter::SVFilter;
use acidstep::sequencing::{chain_at, generate::random_pattern, resolve, Note, Pattern, Step, MAX_PAGES};
use acidstep::synth::{schedule_chain, Renderer, SynthMessage};

/// Common buffer sizes used in audio applications.
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

/// Every step slides into the next: the longest possible chain
fn slide_ring(pages: usize) -> Pattern {
    let mut pattern = Pattern::with_pages(pages);
    for i in 0..pattern.len() {
        let step = pattern.step_mut(i).unwrap();
        *step = Step {
            note: Note::normalize(if i % 2 == 0 { "C-2" } else { "D#-2" }),
            slide: true,
            ..Step::default()
        };
    }
    pattern
}

fn bench_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequencing/chain");

    let random = random_pattern(&mut StdRng::seed_from_u64(303), MAX_PAGES);
    group.bench_function("tick_all_steps_random", |b| {
        b.iter(|| {
            for i in 0..random.len() {
                black_box(chain_at(black_box(random.steps()), i));
            }
        })
    });

    for pages in 1..=MAX_PAGES {
        let ring = slide_ring(pages);
        group.bench_with_input(BenchmarkId::new("resolve_slide_ring", pages * 16), &ring, |b, ring| {
            b.iter(|| black_box(resolve(black_box(ring.steps()), 0)))
        });
    }

    let ring = slide_ring(MAX_PAGES);
    let chain = resolve(ring.steps(), 0).unwrap();
    group.bench_function("schedule_chain_64", |b| {
        b.iter(|| black_box(schedule_chain(black_box(&chain), &ring.knobs, ring.waveform, 0.0, 0.125)))
    });

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth/render");
    let pattern = random_pattern(&mut StdRng::seed_from_u64(909), 1);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("pattern_voices", size), &size, |b, _| {
            let mut renderer = Renderer::new(48_000.0, 0.3);
            for i in 0..pattern.len() {
                if let Some(chain) = chain_at(pattern.steps(), i) {
                    let voice = schedule_chain(&chain, &pattern.knobs, pattern.waveform, 0.0, 10.0);
                    renderer.handle(SynthMessage::Voice(Box::new(voice)));
                }
            }
            b.iter(|| renderer.render(black_box(&mut buffer)))
        });

        let input: Vec<f32> = (0..size).map(|i| (i as f32 / size as f32) * 2.0 - 1.0).collect();
        let mut filter = SVFilter::lowpass(800.0).with_resonance_db(12.0);
        let mut work = input.clone();
        group.bench_with_input(BenchmarkId::new("filter_drive", size), &size, |b, _| {
            b.iter(|| {
                work.copy_from_slice(&input);
                filter.render(black_box(&mut work), 48_000.0);
                drive_buffer(black_box(&mut work), 60.0);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chains, bench_render);
criterion_main!(benches);
