use click_metronome::sequencer::{ManualClock, Metronome, TapTempoEstimator};
use click_metronome::synth::click::{ClickRequest, ClickSynthesizer, ClickVoice};
use click_metronome::synth::envelope::RampEnvelope;
use click_metronome::synth::filter::HighPassFilter;
use click_metronome::{ClickSpec, NullSink};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

const SAMPLE_RATE: f32 = 48000.0;
const BUFFER_SIZE: usize = 512;

/// One audio callback's worth of a single click (critical for real-time performance)
fn bench_click_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("click_voice");

    for is_accent in [true, false] {
        let request = ClickRequest::new(is_accent, 0.7, 42);
        group.bench_with_input(
            BenchmarkId::from_parameter(if is_accent { "accent" } else { "regular" }),
            &request,
            |b, request| {
                b.iter(|| {
                    let mut voice = ClickVoice::new(request, SAMPLE_RATE);
                    for _ in 0..BUFFER_SIZE {
                        black_box(voice.next_sample());
                    }
                });
            },
        );
    }
    group.finish();
}

/// Full synthesizer buffer with overlapping clicks
fn bench_synthesizer_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("click_synthesizer");

    for overlapping in [1usize, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(overlapping),
            &overlapping,
            |b, &overlapping| {
                let mut synth = ClickSynthesizer::new(SAMPLE_RATE, 8, 0.7, 10.0);
                let mut buffer = vec![0.0f32; BUFFER_SIZE];
                let mut seed = 0u64;

                b.iter(|| {
                    for _ in 0..overlapping {
                        seed += 1;
                        synth.play(ClickRequest::new(seed % 4 == 0, 0.7, seed));
                    }
                    synth.render(&mut buffer);
                    black_box(&buffer);
                });
            },
        );
    }
    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let envelope = ClickSpec::for_beat(true).tone_envelope();

    c.bench_function("envelope_value_at", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..BUFFER_SIZE {
                sum += black_box(&envelope).value_at(i as f32 / SAMPLE_RATE);
            }
            black_box(sum)
        });
    });

    c.bench_function("envelope_build", |b| {
        b.iter(|| {
            black_box(
                RampEnvelope::new(0.0)
                    .linear_to(black_box(0.4), 0.005)
                    .exponential_to(0.12, 0.035)
                    .exponential_to(0.001, 0.115),
            )
        });
    });
}

fn bench_highpass(c: &mut Criterion) {
    let mut filter = HighPassFilter::for_click_noise(SAMPLE_RATE);

    c.bench_function("highpass_buffer", |b| {
        b.iter(|| {
            for i in 0..BUFFER_SIZE {
                black_box(filter.process(black_box((i as f32 * 0.37).sin())));
            }
        });
    });
}

/// Scheduler overhead per beat, without audio
fn bench_scheduler(c: &mut Criterion) {
    c.bench_function("metronome_poll_beat", |b| {
        let clock = ManualClock::new();
        let mut metronome = Metronome::with_defaults(clock.clone(), NullSink::new());
        metronome.set_tempo(200).ok();
        metronome.start();
        let period = Duration::from_millis(300);

        b.iter(|| {
            clock.advance(period);
            black_box(metronome.poll())
        });
    });

    c.bench_function("tap_tempo_estimate", |b| {
        let mut taps = TapTempoEstimator::new();
        let mut now = Duration::ZERO;

        b.iter(|| {
            now += Duration::from_millis(500);
            black_box(taps.register_tap(now))
        });
    });
}

criterion_group!(
    benches,
    bench_click_voice,
    bench_synthesizer_buffer,
    bench_envelope,
    bench_highpass,
    bench_scheduler
);
criterion_main!(benches);
