use std::fmt;

use serde::Serialize;

use crate::config::ZeroBinPolicy;

/// Signal audio mono, immuable une fois chargé.
///
/// Les échantillons sont des `f32` normalisés [-1, 1] à `sample_rate` Hz.
///
/// # Example
/// ```
/// use sd_core::signal::AudioSignal;
/// let signal = AudioSignal::new(vec![0.0; 4000], 2000);
/// assert_eq!(signal.len(), 4000);
/// assert!((signal.duration_secs() - 2.0).abs() < f64::EPSILON);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    /// Wrap already-decoded mono samples.
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Échantillons mono.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` si le signal ne contient aucun échantillon.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Durée en secondes. 0 si le sample rate est nul.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Consume the signal and return its samples.
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Spectre d'amplitude : |X[k]| pour chaque bin de la DFT, miroir inclus.
///
/// Même longueur que le signal source. Toutes les valeurs sont >= 0.
///
/// # Example
/// ```
/// use sd_core::signal::SpectrumMagnitude;
/// let spectrum = SpectrumMagnitude::new(vec![4.0, 1.0, 0.5, 1.0]);
/// assert_eq!(spectrum.head(2), &[4.0, 1.0]);
/// assert_eq!(spectrum.head(10).len(), 4);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumMagnitude {
    bins: Vec<f64>,
}

impl SpectrumMagnitude {
    /// Wrap magnitude bins.
    #[must_use]
    pub fn new(bins: Vec<f64>) -> Self {
        Self { bins }
    }

    /// All bins.
    #[must_use]
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// The first `n` bins (or all of them if fewer).
    #[must_use]
    pub fn head(&self, n: usize) -> &[f64] {
        &self.bins[..n.min(self.bins.len())]
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// `true` if there are no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Somme des amplitudes.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.bins.iter().sum()
    }
}

/// Score de divergence >= 0. 0 = spectres identiques au sens de la métrique.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct DivergenceScore(f64);

impl DivergenceScore {
    /// Build a score. Negative values are clamped to 0; NaN is kept as is.
    ///
    /// # Example
    /// ```
    /// use sd_core::signal::DivergenceScore;
    /// assert_eq!(DivergenceScore::new(-1e-17).value(), 0.0);
    /// assert_eq!(DivergenceScore::new(0.25).value(), 0.25);
    /// assert!(DivergenceScore::new(f64::NAN).value().is_nan());
    /// ```
    #[must_use]
    pub fn new(value: f64) -> Self {
        if value < 0.0 {
            Self(0.0)
        } else {
            Self(value)
        }
    }

    /// Raw value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for DivergenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Résultat complet d'une comparaison : le score et les faits qui l'ont produit.
#[derive(Clone, Debug, Serialize)]
pub struct DivergenceReport {
    /// KL divergence of the sample spectrum relative to the reference spectrum.
    pub score: DivergenceScore,
    /// Nombre de bins comparés (`n`).
    pub bins: usize,
    /// Length of the loaded sample signal.
    pub sample_len: usize,
    /// Length of the loaded reference signal.
    pub reference_len: usize,
    /// Common sample rate of both signals.
    pub sample_rate: u32,
    /// `sample_rate × max_duration_secs`, in samples.
    pub max_samples: usize,
    /// Policy applied to zero-magnitude bins.
    pub zero_bins: ZeroBinPolicy,
}
