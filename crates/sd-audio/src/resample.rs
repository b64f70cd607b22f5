//! Band-limited resampling using rubato.
//!
//! One fixed windowed-sinc configuration is used for every clip, so that two
//! signals brought to the same rate went through the same filter.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use sd_core::signal::AudioSignal;

use crate::error::LoadError;

/// Frames fed to the resampler per call.
const CHUNK_SIZE: usize = 1024;

fn sinc_parameters() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Number of output frames for `input_len` frames resampled by `ratio`.
fn expected_len(input_len: usize, ratio: f64) -> usize {
    (input_len as f64 * ratio).ceil() as usize
}

/// Resample `signal` to `target_rate`.
///
/// Identity when the rates already match. Otherwise the whole signal is run
/// through a sinc resampler, the filter delay is removed and the output is
/// cut to `ceil(len × ratio)` frames. Deterministic for a given input.
///
/// # Errors
/// Returns [`LoadError::Resample`] if rubato rejects the ratio or fails mid-stream.
///
/// # Example
/// ```
/// use sd_audio::resample::resample;
/// use sd_core::signal::AudioSignal;
/// let signal = AudioSignal::new(vec![0.0; 8000], 8000);
/// let out = resample(&signal, 2000).unwrap();
/// assert_eq!(out.sample_rate(), 2000);
/// assert_eq!(out.len(), 2000);
/// ```
pub fn resample(signal: &AudioSignal, target_rate: u32) -> Result<AudioSignal, LoadError> {
    if signal.sample_rate() == target_rate {
        return Ok(signal.clone());
    }
    if signal.sample_rate() == 0 || target_rate == 0 {
        return Err(LoadError::Resample(format!(
            "taux invalide {} -> {target_rate}",
            signal.sample_rate()
        )));
    }
    if signal.is_empty() {
        return Ok(AudioSignal::new(Vec::new(), target_rate));
    }

    let ratio = f64::from(target_rate) / f64::from(signal.sample_rate());
    let mut resampler = SincFixedIn::<f64>::new(ratio, 1.0, sinc_parameters(), CHUNK_SIZE, 1)
        .map_err(|e| LoadError::Resample(e.to_string()))?;

    let expected = expected_len(signal.len(), ratio);
    let delay = resampler.output_delay();
    let input: Vec<f64> = signal.samples().iter().map(|&s| f64::from(s)).collect();
    let mut output: Vec<f64> = Vec::with_capacity(expected + delay);

    let mut chunks = input.chunks_exact(CHUNK_SIZE);
    for chunk in &mut chunks {
        let wave: [&[f64]; 1] = [chunk];
        let frames = resampler
            .process(&wave[..], None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let wave: [&[f64]; 1] = [remainder];
        let frames = resampler
            .process_partial(Some(&wave[..]), None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    // Flush the filter tail until the delayed output covers the whole input.
    while output.len() < expected + delay {
        let frames = resampler
            .process_partial::<Vec<f64>>(None, None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    let samples: Vec<f32> = output
        .iter()
        .skip(delay)
        .take(expected)
        .map(|&s| s as f32)
        .collect();

    log::debug!(
        "Resampled {} -> {} samples ({} Hz -> {} Hz, delay {delay})",
        signal.len(),
        samples.len(),
        signal.sample_rate(),
        target_rate
    );

    Ok(AudioSignal::new(samples, target_rate))
}
