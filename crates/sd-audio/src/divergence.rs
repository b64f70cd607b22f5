use std::path::Path;

use sd_core::config::{CompareParams, ZeroBinPolicy};
use sd_core::signal::{AudioSignal, DivergenceReport, DivergenceScore};
use sd_core::traits::SpectralMetric;

use crate::error::{AudioError, DegenerateInputError, Side};
use crate::fft::SpectrumComputer;
use crate::loader::{AudioLoader, AudioSource};

/// Entropie relative (divergence de Kullback-Leibler), logarithme naturel.
///
/// Each input is an unnormalized non-negative weight vector; the metric
/// normalizes both to sum 1 and evaluates `Σ p_i ln(p_i / q_i)`. Zero bins
/// follow the configured [`ZeroBinPolicy`].
///
/// # Example
/// ```
/// use sd_audio::divergence::RelativeEntropy;
/// use sd_core::config::ZeroBinPolicy;
/// use sd_core::traits::SpectralMetric;
/// let kl = RelativeEntropy::new(ZeroBinPolicy::Skip, 1e-10);
/// let score = kl.divergence(&[1.0, 1.0], &[1.0, 3.0]).unwrap();
/// assert!((score.value() - 0.5 * (4.0f64 / 3.0).ln()).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct RelativeEntropy {
    policy: ZeroBinPolicy,
    epsilon: f64,
}

impl Default for RelativeEntropy {
    fn default() -> Self {
        Self::from_params(&CompareParams::default())
    }
}

impl RelativeEntropy {
    /// Metric with an explicit policy. `epsilon` is only read by `Smooth`.
    #[must_use]
    pub fn new(policy: ZeroBinPolicy, epsilon: f64) -> Self {
        Self { policy, epsilon }
    }

    /// Metric configured from comparison parameters.
    #[must_use]
    pub fn from_params(params: &CompareParams) -> Self {
        Self::new(params.zero_bins, params.epsilon)
    }

    /// Zero-bin policy in force.
    #[must_use]
    pub fn policy(&self) -> ZeroBinPolicy {
        self.policy
    }

    /// Each spectrum normalized by its own total; bins where either side is
    /// zero contribute nothing.
    fn skip(p: &[f64], q: &[f64]) -> Result<f64, DegenerateInputError> {
        let sum_p: f64 = p.iter().sum();
        let sum_q: f64 = q.iter().sum();
        if sum_p == 0.0 && sum_q == 0.0 {
            return Ok(0.0);
        }
        if sum_p == 0.0 || sum_q == 0.0 {
            return Err(DegenerateInputError::MismatchedSilence);
        }

        let mut total = 0.0;
        let mut support = 0usize;
        let mut dropped = 0usize;
        for (&pi, &qi) in p.iter().zip(q) {
            if pi > 0.0 && qi > 0.0 {
                total += kl_term(pi / sum_p, qi / sum_q);
                support += 1;
            } else if pi > 0.0 {
                dropped += 1;
            }
        }
        if support == 0 {
            return Err(DegenerateInputError::MismatchedSilence);
        }
        if dropped > 0 {
            log::debug!("{dropped} bins de référence nuls ignorés sur {}", p.len());
        }
        Ok(total)
    }

    fn smooth(p: &[f64], q: &[f64], epsilon: f64) -> f64 {
        let sum_p: f64 = p.iter().map(|v| v + epsilon).sum();
        let sum_q: f64 = q.iter().map(|v| v + epsilon).sum();
        p.iter()
            .zip(q)
            .map(|(pi, qi)| kl_term((pi + epsilon) / sum_p, (qi + epsilon) / sum_q))
            .sum()
    }

    fn strict(p: &[f64], q: &[f64]) -> Result<f64, DegenerateInputError> {
        let sum_p: f64 = p.iter().sum();
        let sum_q: f64 = q.iter().sum();
        if sum_p == 0.0 {
            return Err(DegenerateInputError::SilentInput { side: Side::Sample });
        }
        if sum_q == 0.0 {
            return Err(DegenerateInputError::SilentInput {
                side: Side::Reference,
            });
        }

        let mut total = 0.0;
        for (index, (&pi, &qi)) in p.iter().zip(q).enumerate() {
            if pi == 0.0 {
                continue;
            }
            if qi == 0.0 {
                return Err(DegenerateInputError::ZeroReferenceBin { index });
            }
            total += kl_term(pi / sum_p, qi / sum_q);
        }
        Ok(total)
    }
}

/// `p ln(p / q)` for strictly positive, normalized `p` and `q`.
#[inline]
fn kl_term(p: f64, q: f64) -> f64 {
    p * (p / q).ln()
}

impl SpectralMetric for RelativeEntropy {
    type Error = DegenerateInputError;

    fn divergence(
        &self,
        sample: &[f64],
        reference: &[f64],
    ) -> Result<DivergenceScore, Self::Error> {
        if sample.len() != reference.len() {
            return Err(DegenerateInputError::LengthMismatch {
                sample: sample.len(),
                reference: reference.len(),
            });
        }
        if sample.is_empty() {
            return Err(DegenerateInputError::EmptySignal);
        }
        if sample.iter().any(|v| !v.is_finite()) {
            return Err(DegenerateInputError::NonFinite { side: Side::Sample });
        }
        if reference.iter().any(|v| !v.is_finite()) {
            return Err(DegenerateInputError::NonFinite {
                side: Side::Reference,
            });
        }

        let value = match self.policy {
            ZeroBinPolicy::Skip => Self::skip(sample, reference)?,
            ZeroBinPolicy::Smooth => Self::smooth(sample, reference, self.epsilon),
            ZeroBinPolicy::Strict => Self::strict(sample, reference)?,
        };
        Ok(DivergenceScore::new(value))
    }

    fn name(&self) -> &'static str {
        "relative-entropy"
    }
}

/// Longueur comparée : `min(len_a, len_b, max_samples)`.
///
/// # Example
/// ```
/// use sd_audio::divergence::comparison_len;
/// assert_eq!(comparison_len(10_000, 30_000, 20_000), 10_000);
/// assert_eq!(comparison_len(50_000, 30_000, 20_000), 20_000);
/// ```
#[must_use]
pub fn comparison_len(sample_len: usize, reference_len: usize, max_samples: usize) -> usize {
    sample_len.min(reference_len).min(max_samples)
}

/// Pipeline complet : chargement, spectres, troncature commune, divergence.
///
/// Each call is independent: no state is shared between comparisons, and
/// the only side effects are the file reads of the two loads.
///
/// # Example
/// ```no_run
/// use sd_audio::divergence::DivergenceCalculator;
/// use sd_audio::loader::AudioSource;
/// use sd_core::config::CompareParams;
/// use std::path::PathBuf;
///
/// let calc = DivergenceCalculator::new(CompareParams::default()).unwrap();
/// let report = calc
///     .compute(
///         &AudioSource::from(PathBuf::from("a.wav")),
///         &AudioSource::from(PathBuf::from("b.wav")),
///     )
///     .unwrap();
/// println!("{} sur {} bins", report.score, report.bins);
/// ```
#[derive(Clone, Debug)]
pub struct DivergenceCalculator<M = RelativeEntropy> {
    params: CompareParams,
    loader: AudioLoader,
    metric: M,
}

impl DivergenceCalculator<RelativeEntropy> {
    /// Calculator using [`RelativeEntropy`] with the parameters' zero-bin policy.
    ///
    /// # Errors
    /// Returns [`AudioError::Config`] if the parameters are invalid.
    pub fn new(params: CompareParams) -> Result<Self, AudioError> {
        Self::with_metric(params, RelativeEntropy::from_params(&params))
    }
}

impl<M> DivergenceCalculator<M>
where
    M: SpectralMetric,
    AudioError: From<M::Error>,
{
    /// Calculator with a custom metric.
    ///
    /// # Errors
    /// Returns [`AudioError::Config`] if the parameters are invalid.
    pub fn with_metric(params: CompareParams, metric: M) -> Result<Self, AudioError> {
        params.validate()?;
        Ok(Self {
            params,
            loader: AudioLoader::from_params(&params),
            metric,
        })
    }

    /// Parameters in force.
    #[must_use]
    pub fn params(&self) -> &CompareParams {
        &self.params
    }

    /// Loader built from the parameters.
    #[must_use]
    pub fn loader(&self) -> &AudioLoader {
        &self.loader
    }

    /// Load both clips and compare them.
    ///
    /// # Errors
    /// [`AudioError::Load`] if either clip cannot be loaded,
    /// [`AudioError::Degenerate`] if the divergence is undefined for them.
    pub fn compute(
        &self,
        sample: &AudioSource,
        reference: &AudioSource,
    ) -> Result<DivergenceReport, AudioError> {
        let sample = self.loader.load(sample)?;
        let reference = self.loader.load(reference)?;
        self.compare_signals(&sample, &reference)
    }

    /// Compare two already-loaded signals at the calculator's sample rate.
    ///
    /// # Errors
    /// [`AudioError::RateMismatch`] if a signal is not at the configured rate,
    /// [`AudioError::Degenerate`] if nothing is left to compare or the metric
    /// rejects the spectra.
    pub fn compare_signals(
        &self,
        sample: &AudioSignal,
        reference: &AudioSignal,
    ) -> Result<DivergenceReport, AudioError> {
        for signal in [sample, reference] {
            if signal.sample_rate() != self.params.sample_rate {
                return Err(AudioError::RateMismatch {
                    expected: self.params.sample_rate,
                    found: signal.sample_rate(),
                });
            }
        }

        let max_samples = self.params.max_samples();
        let n = comparison_len(sample.len(), reference.len(), max_samples);
        if n == 0 {
            return Err(DegenerateInputError::EmptySignal.into());
        }

        let mut computer = SpectrumComputer::new();
        let sample_spectrum = computer.magnitude(sample)?;
        let reference_spectrum = computer.magnitude(reference)?;

        let score = self.metric.divergence(
            sample_spectrum.head(n),
            reference_spectrum.head(n),
        )?;

        log::debug!(
            "{} = {score} sur {n} bins ({} vs {} échantillons)",
            self.metric.name(),
            sample.len(),
            reference.len()
        );

        Ok(DivergenceReport {
            score,
            bins: n,
            sample_len: sample.len(),
            reference_len: reference.len(),
            sample_rate: self.params.sample_rate,
            max_samples,
            zero_bins: self.params.zero_bins,
        })
    }
}

/// Compare two audio files with the default zero-bin policy.
///
/// # Errors
/// Same as [`DivergenceCalculator::compute`], plus [`AudioError::Config`] for
/// a zero sample rate or a non-positive duration.
///
/// # Example
/// ```no_run
/// use sd_audio::divergence::compute;
/// let score = compute("a.wav".as_ref(), "b.wav".as_ref(), 2000, 10.0).unwrap();
/// println!("{score}");
/// ```
pub fn compute(
    sample: &Path,
    reference: &Path,
    sample_rate: u32,
    max_duration_secs: f32,
) -> Result<DivergenceScore, AudioError> {
    let params = CompareParams {
        sample_rate,
        max_duration_secs,
        ..CompareParams::default()
    };
    let report =
        DivergenceCalculator::new(params)?.compute(&sample.into(), &reference.into())?;
    Ok(report.score)
}
