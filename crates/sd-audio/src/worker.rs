use std::thread;

use rayon::prelude::*;
use sd_core::signal::DivergenceReport;
use sd_core::traits::SpectralMetric;

use crate::divergence::DivergenceCalculator;
use crate::error::AudioError;
use crate::loader::AudioSource;

/// Résultat d'une comparaison, tel que livré par les workers.
pub type CompareResult = Result<DivergenceReport, AudioError>;

/// Run one comparison on a dedicated thread, keeping the caller responsive.
///
/// The receiver yields exactly one result. Dropping it early is harmless: the
/// worker finishes its comparison and discards the result.
///
/// # Errors
/// Returns [`AudioError::Worker`] if the thread cannot be spawned.
///
/// # Example
/// ```no_run
/// use sd_audio::divergence::DivergenceCalculator;
/// use sd_audio::loader::AudioSource;
/// use sd_audio::worker::spawn_comparison;
/// use sd_core::config::CompareParams;
/// use std::path::PathBuf;
///
/// let calc = DivergenceCalculator::new(CompareParams::default()).unwrap();
/// let rx = spawn_comparison(
///     calc,
///     AudioSource::from(PathBuf::from("a.wav")),
///     AudioSource::from(PathBuf::from("b.wav")),
/// )
/// .unwrap();
/// let report = rx.recv().unwrap().unwrap();
/// ```
pub fn spawn_comparison<M>(
    calculator: DivergenceCalculator<M>,
    sample: AudioSource,
    reference: AudioSource,
) -> Result<flume::Receiver<CompareResult>, AudioError>
where
    M: SpectralMetric + 'static,
    AudioError: From<M::Error>,
{
    let (tx, rx) = flume::bounded(1);

    thread::Builder::new()
        .name("sd-compare".to_string())
        .spawn(move || {
            let result = calculator.compute(&sample, &reference);
            if tx.send(result).is_err() {
                log::debug!("Résultat de comparaison abandonné : récepteur fermé");
            }
        })
        .map_err(|e| AudioError::Worker(e.to_string()))?;

    Ok(rx)
}

/// Compare one sample against many references in parallel.
///
/// The sample is loaded once. Results come back in the order of
/// `references`; a reference that fails to load only fails its own slot.
///
/// # Errors
/// Returns the sample's [`AudioError::Load`] if the sample itself cannot be loaded.
pub fn compare_against<M>(
    calculator: &DivergenceCalculator<M>,
    sample: &AudioSource,
    references: &[AudioSource],
) -> Result<Vec<CompareResult>, AudioError>
where
    M: SpectralMetric,
    AudioError: From<M::Error>,
{
    let sample_signal = calculator.loader().load(sample)?;

    let results = references
        .par_iter()
        .map(|reference| {
            let reference_signal = calculator.loader().load(reference)?;
            calculator.compare_signals(&sample_signal, &reference_signal)
        })
        .collect();

    Ok(results)
}
