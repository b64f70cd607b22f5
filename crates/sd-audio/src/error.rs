use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which side of a comparison an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The clip being scored.
    Sample,
    /// The clip it is scored against.
    Reference,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample => f.write_str("échantillon"),
            Self::Reference => f.write_str("référence"),
        }
    }
}

/// La source audio est absente ou indécodable.
#[derive(Error, Debug)]
pub enum LoadError {
    /// File does not exist.
    #[error("Fichier audio introuvable : {}", path.display())]
    NotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// File exists but cannot be opened or read.
    #[error("Impossible d'ouvrir {} : {source}", path.display())]
    Io {
        /// Path being opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Container/format not recognized.
    #[error("Format audio non supporté : {0}")]
    UnsupportedFormat(String),

    /// No decodable audio track in the container.
    #[error("Aucune piste audio trouvée")]
    NoTrack,

    /// Codec could not be instantiated.
    #[error("Erreur de décodage : {0}")]
    DecodeError(String),

    /// The stream decoded to zero samples.
    #[error("Aucun échantillon décodé")]
    Empty,

    /// Resampler construction or processing failed.
    #[error("Erreur de rééchantillonnage : {0}")]
    Resample(String),
}

/// Entrées pour lesquelles l'entropie relative n'est pas définie.
#[derive(Error, Debug, PartialEq)]
pub enum DegenerateInputError {
    /// Nothing left to compare after truncation.
    #[error("Signal vide après troncature")]
    EmptySignal,

    /// Slices of different lengths reached the metric.
    #[error("Longueurs différentes : {sample} vs {reference}")]
    LengthMismatch {
        /// Sample slice length.
        sample: usize,
        /// Reference slice length.
        reference: usize,
    },

    /// One spectrum has zero total energy.
    #[error("Spectre nul côté {side}")]
    SilentInput {
        /// Which spectrum is silent.
        side: Side,
    },

    /// A spectrum holds NaN or infinite magnitudes (corrupt samples).
    #[error("Spectre non fini côté {side}")]
    NonFinite {
        /// Which spectrum is affected.
        side: Side,
    },

    /// Exactly one spectrum has energy, and the two share no non-zero bin.
    #[error("Silence non apparié : aucun bin commun non nul")]
    MismatchedSilence,

    /// Sample bin has mass where the reference has none.
    #[error("Bin de référence nul à l'indice {index} face à un bin non nul")]
    ZeroReferenceBin {
        /// Bin index in the truncated spectrum.
        index: usize,
    },
}

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Loading a clip failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Divergence undefined for the given inputs.
    #[error(transparent)]
    Degenerate(#[from] DegenerateInputError),

    /// Invalid comparison parameters.
    #[error(transparent)]
    Config(#[from] sd_core::CoreError),

    /// The FFT rejected its buffers.
    #[error("Calcul du spectre impossible : {0}")]
    Spectrum(String),

    /// A signal handed to the calculator is not at the configured rate.
    #[error("Sample rate inattendu : {found} Hz au lieu de {expected} Hz")]
    RateMismatch {
        /// Configured analysis rate.
        expected: u32,
        /// Rate of the offending signal.
        found: u32,
    },

    /// The comparison worker thread could not be spawned or vanished.
    #[error("Thread de comparaison indisponible : {0}")]
    Worker(String),
}
