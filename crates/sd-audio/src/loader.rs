use std::path::{Path, PathBuf};
use std::sync::Arc;

use sd_core::config::CompareParams;
use sd_core::signal::AudioSignal;

use crate::decode::{decode_bytes, decode_file};
use crate::error::LoadError;
use crate::resample::resample;

/// Origine d'un clip : fichier sur disque ou octets en mémoire.
#[derive(Clone, Debug)]
pub enum AudioSource {
    /// Audio file path.
    Path(PathBuf),
    /// Encoded audio bytes, with an optional format hint (`"wav"`, `"mp3"`...).
    Bytes {
        /// Encoded data, shared.
        data: Arc<[u8]>,
        /// Extension passed to the format detector as a hint.
        extension: Option<String>,
    },
}

impl AudioSource {
    /// Bytes source with a format hint.
    #[must_use]
    pub fn bytes(data: impl Into<Arc<[u8]>>, extension: Option<&str>) -> Self {
        Self::Bytes {
            data: data.into(),
            extension: extension.map(str::to_string),
        }
    }

    /// Human-readable description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { data, .. } => format!("<{} octets>", data.len()),
        }
    }
}

impl From<PathBuf> for AudioSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for AudioSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Charge un clip en signal mono au taux cible, plafonné en durée.
///
/// Pipeline : décodage (symphonia) → downmix mono → rééchantillonnage sinc
/// (rubato) → troncature à `sample_rate × max_duration_secs` échantillons.
///
/// # Example
/// ```no_run
/// use sd_audio::loader::{AudioLoader, AudioSource};
/// use std::path::PathBuf;
/// let loader = AudioLoader::new(2000, 60.0);
/// let signal = loader.load(&AudioSource::from(PathBuf::from("clip.wav"))).unwrap();
/// assert!(signal.len() <= loader.max_samples());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct AudioLoader {
    sample_rate: u32,
    max_duration_secs: f32,
}

impl Default for AudioLoader {
    fn default() -> Self {
        Self::from_params(&CompareParams::default())
    }
}

impl AudioLoader {
    /// Loader targeting `sample_rate` Hz, keeping at most `max_duration_secs` seconds.
    #[must_use]
    pub fn new(sample_rate: u32, max_duration_secs: f32) -> Self {
        Self {
            sample_rate,
            max_duration_secs,
        }
    }

    /// Loader configured from comparison parameters.
    #[must_use]
    pub fn from_params(params: &CompareParams) -> Self {
        Self::new(params.sample_rate, params.max_duration_secs)
    }

    /// Target sample rate.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Longueur maximale d'un signal chargé, en échantillons.
    #[must_use]
    pub fn max_samples(&self) -> usize {
        (f64::from(self.sample_rate) * f64::from(self.max_duration_secs)).floor() as usize
    }

    /// Load, downmix, resample and truncate one clip.
    ///
    /// # Errors
    /// Returns a [`LoadError`] if the source is missing or undecodable, or if
    /// resampling fails.
    pub fn load(&self, source: &AudioSource) -> Result<AudioSignal, LoadError> {
        let max_secs = Some(f64::from(self.max_duration_secs));
        let native = match source {
            AudioSource::Path(path) => decode_file(path, max_secs)?,
            AudioSource::Bytes { data, extension } => {
                decode_bytes(Arc::clone(data), extension.as_deref(), max_secs)?
            }
        };

        let resampled = resample(&native, self.sample_rate)?;
        let mut samples = resampled.into_samples();
        samples.truncate(self.max_samples());

        log::info!(
            "Chargé {} : {} échantillons @ {} Hz",
            source.describe(),
            samples.len(),
            self.sample_rate
        );
        Ok(AudioSignal::new(samples, self.sample_rate))
    }

    /// Shorthand for [`AudioLoader::load`] on a path.
    ///
    /// # Errors
    /// See [`AudioLoader::load`].
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<AudioSignal, LoadError> {
        self.load(&AudioSource::from(path.as_ref()))
    }
}
