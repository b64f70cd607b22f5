//! End-to-end comparisons on WAV files written to a temporary directory.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use sd_audio::divergence::{DivergenceCalculator, compute};
use sd_audio::error::{AudioError, DegenerateInputError, Side};
use sd_audio::loader::{AudioLoader, AudioSource};
use sd_core::config::{CompareParams, ZeroBinPolicy};

fn write_wav_i16(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

fn write_wav_f32(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

fn sine(freq: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
    let len = (sample_rate as f32 * secs) as usize;
    (0..len)
        .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Deterministic white noise (xorshift32), uniform in [-0.5, 0.5].
fn white_noise(sample_rate: u32, secs: f32, seed: u32) -> Vec<f32> {
    let len = (sample_rate as f32 * secs) as usize;
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as f32 / u32::MAX as f32 - 0.5
        })
        .collect()
}

fn source(path: &Path) -> AudioSource {
    AudioSource::from(path)
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        Self { _dir: dir, root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn params(max_duration_secs: f32, zero_bins: ZeroBinPolicy) -> CompareParams {
    CompareParams {
        max_duration_secs,
        zero_bins,
        ..CompareParams::default()
    }
}

#[test]
fn silent_clips_compare_to_zero() {
    let fx = Fixture::new();
    let a = fx.path("silence_a.wav");
    let b = fx.path("silence_b.wav");
    write_wav_i16(&a, &vec![0.0; 10_000], 2000, 1);
    write_wav_i16(&b, &vec![0.0; 10_000], 2000, 1);

    for policy in [ZeroBinPolicy::Skip, ZeroBinPolicy::Smooth] {
        let calc = DivergenceCalculator::new(params(10.0, policy)).unwrap();
        let report = calc.compute(&source(&a), &source(&b)).unwrap();
        assert_eq!(report.bins, 10_000);
        assert_eq!(report.max_samples, 20_000);
        assert_eq!(report.score.value(), 0.0, "{policy}");
    }

    let strict = DivergenceCalculator::new(params(10.0, ZeroBinPolicy::Strict)).unwrap();
    assert!(matches!(
        strict.compute(&source(&a), &source(&b)),
        Err(AudioError::Degenerate(DegenerateInputError::SilentInput {
            side: Side::Sample
        }))
    ));
}

#[test]
fn silence_against_tone_is_mismatched() {
    let fx = Fixture::new();
    let quiet = fx.path("quiet.wav");
    let tone = fx.path("tone.wav");
    write_wav_i16(&quiet, &vec![0.0; 4000], 2000, 1);
    write_wav_i16(&tone, &sine(300.0, 2000, 2.0), 2000, 1);

    let skip = DivergenceCalculator::new(params(10.0, ZeroBinPolicy::Skip)).unwrap();
    assert!(matches!(
        skip.compute(&source(&quiet), &source(&tone)),
        Err(AudioError::Degenerate(DegenerateInputError::MismatchedSilence))
    ));

    let smooth = DivergenceCalculator::new(params(10.0, ZeroBinPolicy::Smooth)).unwrap();
    let score = smooth
        .compute(&source(&quiet), &source(&tone))
        .unwrap()
        .score
        .value();
    assert!(score.is_finite() && score > 0.0);
}

#[test]
fn tone_against_itself_resampled_and_reloaded() {
    let fx = Fixture::new();
    let original = fx.path("tone_8k.wav");
    let reloaded = fx.path("tone_2k.wav");
    write_wav_i16(&original, &sine(150.0, 8000, 3.0), 8000, 1);

    let loader = AudioLoader::new(2000, 60.0);
    let resampled = loader.load_path(&original).unwrap();
    write_wav_f32(&reloaded, resampled.samples(), 2000);

    let calc = DivergenceCalculator::new(CompareParams::default()).unwrap();
    let report = calc.compute(&source(&original), &source(&reloaded)).unwrap();
    assert_eq!(report.bins, resampled.len());
    assert!(report.score.value() < 1e-6, "score = {}", report.score);
}

#[test]
fn tone_vs_noise_exceeds_self_comparison() {
    let fx = Fixture::new();
    let tone = fx.path("tone.wav");
    let noise = fx.path("noise.wav");
    write_wav_i16(&tone, &sine(440.0, 16000, 2.0), 16000, 1);
    write_wav_i16(&noise, &white_noise(16000, 2.0, 7), 16000, 1);

    let calc = DivergenceCalculator::new(CompareParams::default()).unwrap();
    let itself = calc.compute(&source(&tone), &source(&tone)).unwrap();
    let versus = calc.compute(&source(&tone), &source(&noise)).unwrap();
    assert!(itself.score.value() < 1e-9);
    assert!(versus.score.value() > itself.score.value());
    assert!(versus.score.value().is_finite());
}

#[test]
fn divergence_is_asymmetric_by_design() {
    let fx = Fixture::new();
    let tone = fx.path("tone.wav");
    let noise = fx.path("noise.wav");
    write_wav_i16(&tone, &sine(440.0, 2000, 2.0), 2000, 1);
    write_wav_i16(&noise, &white_noise(2000, 2.0, 99), 2000, 1);

    let forward = compute(&tone, &noise, 2000, 60.0).unwrap().value();
    let backward = compute(&noise, &tone, 2000, 60.0).unwrap().value();
    // KL is not a distance: both directions are valid, they just differ.
    assert!(forward > 0.0 && backward > 0.0);
    assert!((forward - backward).abs() > 1e-6);
}

#[test]
fn duration_cap_governs_n() {
    let fx = Fixture::new();
    let a = fx.path("five.wav");
    let b = fx.path("eight.wav");
    write_wav_i16(&a, &sine(200.0, 2000, 5.0), 2000, 1);
    write_wav_i16(&b, &sine(250.0, 2000, 8.0), 2000, 1);

    let calc = DivergenceCalculator::new(params(2.0, ZeroBinPolicy::Skip)).unwrap();
    let report = calc.compute(&source(&a), &source(&b)).unwrap();
    assert_eq!(report.bins, 4000);
    assert_eq!(report.sample_len, 4000);
    assert_eq!(report.reference_len, 4000);
}

#[test]
fn n_never_exceeds_cap_or_lengths() {
    let fx = Fixture::new();
    let short = fx.path("short.wav");
    let long = fx.path("long.wav");
    write_wav_i16(&short, &white_noise(4000, 1.5, 3), 4000, 1);
    write_wav_i16(&long, &white_noise(4000, 4.0, 5), 4000, 1);

    for max_duration in [0.5f32, 1.0, 1.5, 3.0, 10.0] {
        let calc = DivergenceCalculator::new(params(max_duration, ZeroBinPolicy::Skip)).unwrap();
        let report = calc.compute(&source(&short), &source(&long)).unwrap();
        assert!(report.bins <= report.max_samples);
        assert!(report.bins <= report.sample_len);
        assert!(report.bins <= report.reference_len);
        assert!(report.score.value().is_finite() && report.score.value() >= 0.0);
    }
}

#[test]
fn ten_second_override_call_site() {
    let fx = Fixture::new();
    let a = fx.path("a.wav");
    let b = fx.path("b.wav");
    write_wav_i16(&a, &sine(300.0, 2000, 12.0), 2000, 1);
    write_wav_i16(&b, &white_noise(2000, 12.0, 11), 2000, 1);

    let calc = DivergenceCalculator::new(params(10.0, ZeroBinPolicy::Skip)).unwrap();
    let report = calc.compute(&source(&a), &source(&b)).unwrap();
    assert_eq!(report.bins, 20_000);
    let score = compute(&a, &b, 2000, 10.0).unwrap();
    assert_eq!(score, report.score);
}

#[test]
fn stereo_clip_matches_its_mono_downmix() {
    let fx = Fixture::new();
    let stereo = fx.path("stereo.wav");
    let mono = fx.path("mono.wav");
    let tone = sine(180.0, 2000, 2.0);
    let interleaved: Vec<f32> = tone.iter().flat_map(|&s| [s, s]).collect();
    write_wav_i16(&stereo, &interleaved, 2000, 2);
    write_wav_i16(&mono, &tone, 2000, 1);

    let calc = DivergenceCalculator::new(CompareParams::default()).unwrap();
    let report = calc.compute(&source(&stereo), &source(&mono)).unwrap();
    assert_eq!(report.sample_len, report.reference_len);
    assert!(report.score.value() < 1e-9);
}

#[test]
fn missing_file_is_a_load_error() {
    let fx = Fixture::new();
    let present = fx.path("present.wav");
    write_wav_i16(&present, &sine(200.0, 2000, 1.0), 2000, 1);
    let err = compute(&present, &fx.path("absent.wav"), 2000, 60.0).unwrap_err();
    assert!(matches!(err, AudioError::Load(_)));
}

#[test]
fn nan_sample_in_float_wav_is_rejected() {
    let fx = Fixture::new();
    let corrupt = fx.path("corrupt.wav");
    let noise = fx.path("noise.wav");
    let mut samples = sine(250.0, 2000, 2.0);
    samples[100] = f32::NAN;
    write_wav_f32(&corrupt, &samples, 2000);
    write_wav_f32(&noise, &white_noise(2000, 2.0, 13), 2000);

    for policy in [ZeroBinPolicy::Smooth, ZeroBinPolicy::Skip, ZeroBinPolicy::Strict] {
        let calc = DivergenceCalculator::new(params(60.0, policy)).unwrap();
        assert!(
            matches!(
                calc.compute(&source(&corrupt), &source(&noise)),
                Err(AudioError::Degenerate(DegenerateInputError::NonFinite {
                    side: Side::Sample
                }))
            ),
            "{policy}"
        );
        assert!(
            matches!(
                calc.compute(&source(&noise), &source(&corrupt)),
                Err(AudioError::Degenerate(DegenerateInputError::NonFinite {
                    side: Side::Reference
                }))
            ),
            "{policy}"
        );
    }
}

#[test]
fn bytes_and_path_sources_agree() {
    let fx = Fixture::new();
    let a = fx.path("a.wav");
    let b = fx.path("b.wav");
    write_wav_i16(&a, &sine(200.0, 8000, 1.0), 8000, 1);
    write_wav_i16(&b, &white_noise(8000, 1.0, 42), 8000, 1);

    let calc = DivergenceCalculator::new(CompareParams::default()).unwrap();
    let from_paths = calc.compute(&source(&a), &source(&b)).unwrap();
    let from_bytes = calc
        .compute(
            &AudioSource::bytes(std::fs::read(&a).unwrap(), Some("wav")),
            &AudioSource::bytes(std::fs::read(&b).unwrap(), None),
        )
        .unwrap();
    assert_eq!(from_paths.score, from_bytes.score);
    assert_eq!(from_paths.bins, from_bytes.bins);
}
