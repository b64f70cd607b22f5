use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// Default analysis sample rate. Low on purpose: only the macro spectral shape matters.
pub const DEFAULT_SAMPLE_RATE: u32 = 2000;
/// Default duration cap in seconds.
pub const DEFAULT_MAX_DURATION_SECS: f32 = 60.0;
/// Default additive smoothing for [`ZeroBinPolicy::Smooth`].
pub const DEFAULT_SMOOTHING_EPSILON: f64 = 1e-10;

/// Traitement des bins d'amplitude nulle dans le calcul d'entropie relative.
///
/// # Example
/// ```
/// use sd_core::config::ZeroBinPolicy;
/// let policy: ZeroBinPolicy = "smooth".parse().unwrap();
/// assert_eq!(policy, ZeroBinPolicy::Smooth);
/// assert_eq!(ZeroBinPolicy::default(), ZeroBinPolicy::Skip);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroBinPolicy {
    /// Drop bins where either spectrum is zero, compare over the common support.
    #[default]
    Skip,
    /// Add `epsilon` to every bin of both spectra before normalizing.
    Smooth,
    /// Fail on a zero reference bin facing a non-zero sample bin, or on silence.
    Strict,
}

impl FromStr for ZeroBinPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "smooth" => Ok(Self::Smooth),
            "strict" => Ok(Self::Strict),
            _ => Err(CoreError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Même règle que [`FromStr`] : insensible à la casse.
impl<'de> Deserialize<'de> for ZeroBinPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for ZeroBinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skip => "skip",
            Self::Smooth => "smooth",
            Self::Strict => "strict",
        };
        f.write_str(name)
    }
}

/// Paramètres d'une comparaison, surchargeables à chaque appel.
///
/// # Example
/// ```
/// use sd_core::config::CompareParams;
/// let params = CompareParams::default();
/// assert_eq!(params.sample_rate, 2000);
/// assert_eq!(params.max_samples(), 120_000);
/// let short = CompareParams { max_duration_secs: 10.0, ..params };
/// assert_eq!(short.max_samples(), 20_000);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompareParams {
    /// Common analysis sample rate in Hz.
    pub sample_rate: u32,
    /// Durée maximale analysée par signal, en secondes.
    pub max_duration_secs: f32,
    /// Zero-bin handling.
    pub zero_bins: ZeroBinPolicy,
    /// Additive smoothing, only read by [`ZeroBinPolicy::Smooth`].
    pub epsilon: f64,
}

impl Default for CompareParams {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            zero_bins: ZeroBinPolicy::Skip,
            epsilon: DEFAULT_SMOOTHING_EPSILON,
        }
    }
}

impl CompareParams {
    /// Cap on signal length: `sample_rate × max_duration_secs`, floored.
    #[must_use]
    pub fn max_samples(&self) -> usize {
        (f64::from(self.sample_rate) * f64::from(self.max_duration_secs)).floor() as usize
    }

    /// Reject parameters the pipeline cannot honour.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidParameter`] for a zero sample rate, a
    /// non-positive or non-finite duration, or a non-positive epsilon.
    ///
    /// # Example
    /// ```
    /// use sd_core::config::CompareParams;
    /// let bad = CompareParams { sample_rate: 0, ..CompareParams::default() };
    /// assert!(bad.validate().is_err());
    /// assert!(CompareParams::default().validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.sample_rate == 0 {
            return Err(CoreError::InvalidParameter {
                name: "sample_rate",
                value: self.sample_rate.to_string(),
            });
        }
        if !self.max_duration_secs.is_finite() || self.max_duration_secs <= 0.0 {
            return Err(CoreError::InvalidParameter {
                name: "max_duration_secs",
                value: self.max_duration_secs.to_string(),
            });
        }
        if self.zero_bins == ZeroBinPolicy::Smooth
            && (!self.epsilon.is_finite() || self.epsilon <= 0.0)
        {
            return Err(CoreError::InvalidParameter {
                name: "smoothing_epsilon",
                value: self.epsilon.to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration complète de specdiv.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use sd_core::config::CompareConfig;
/// let config = CompareConfig::default();
/// assert_eq!(config.sample_rate, 2000);
/// assert_eq!(config.store_root.to_str(), Some("recordings"));
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CompareConfig {
    // === Comparaison ===
    /// Sample rate commun d'analyse (Hz).
    pub sample_rate: u32,
    /// Durée maximale analysée (s).
    pub max_duration_secs: f32,
    /// Politique des bins nuls.
    pub zero_bins: ZeroBinPolicy,
    /// Lissage additif pour `Smooth`.
    pub smoothing_epsilon: f64,

    // === Stockage ===
    /// Racine du catalogue d'enregistrements.
    pub store_root: PathBuf,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            zero_bins: ZeroBinPolicy::Skip,
            smoothing_epsilon: DEFAULT_SMOOTHING_EPSILON,
            store_root: PathBuf::from("recordings"),
        }
    }
}

impl CompareConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.sample_rate = self.sample_rate.clamp(1, 384_000);
        if !self.max_duration_secs.is_finite() {
            self.max_duration_secs = DEFAULT_MAX_DURATION_SECS;
        }
        self.max_duration_secs = self.max_duration_secs.clamp(0.001, 3600.0);
        if !self.smoothing_epsilon.is_finite() {
            self.smoothing_epsilon = DEFAULT_SMOOTHING_EPSILON;
        }
        self.smoothing_epsilon = self.smoothing_epsilon.clamp(1e-300, 1.0);
    }

    /// Per-invocation parameters derived from this configuration.
    #[must_use]
    pub fn params(&self) -> CompareParams {
        CompareParams {
            sample_rate: self.sample_rate,
            max_duration_secs: self.max_duration_secs,
            zero_bins: self.zero_bins,
            epsilon: self.smoothing_epsilon,
        }
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    compare: Option<CompareSection>,
    store: Option<StoreSection>,
}

/// Compare section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct CompareSection {
    sample_rate: Option<u32>,
    max_duration_secs: Option<f32>,
    zero_bins: Option<ZeroBinPolicy>,
    smoothing_epsilon: Option<f64>,
}

/// Store section of the TOML config.
#[derive(Deserialize)]
struct StoreSection {
    root: Option<PathBuf>,
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use sd_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<CompareConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content)
        .with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))
}

/// Parse TOML text into a config, merged over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema.
///
/// # Example
/// ```
/// use sd_core::config::{parse_config, ZeroBinPolicy};
/// let config = parse_config("[compare]\nmax_duration_secs = 10.0\nzero_bins = \"Strict\"\n").unwrap();
/// assert_eq!(config.max_duration_secs, 10.0);
/// assert_eq!(config.zero_bins, ZeroBinPolicy::Strict);
/// assert_eq!(config.sample_rate, 2000);
/// ```
pub fn parse_config(content: &str) -> Result<CompareConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    let mut config = CompareConfig::default();

    if let Some(c) = file.compare {
        if let Some(v) = c.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = c.max_duration_secs {
            config.max_duration_secs = v;
        }
        if let Some(v) = c.zero_bins {
            config.zero_bins = v;
        }
        if let Some(v) = c.smoothing_epsilon {
            config.smoothing_epsilon = v;
        }
    }

    if let Some(s) = file.store {
        if let Some(v) = s.root {
            config.store_root = v;
        }
    }

    config.clamp_all();
    log::debug!(
        "Config : {} Hz, {} s max, bins nuls = {}",
        config.sample_rate,
        config.max_duration_secs,
        config.zero_bins
    );
    Ok(config)
}
