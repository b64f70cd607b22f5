use std::path::PathBuf;

use thiserror::Error;

/// Errors originating from the recording store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure on a store path.
    #[error("Erreur d'E/S sur {} : {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest exists but is not valid JSON for this schema.
    #[error("Manifeste corrompu {} : {source}", path.display())]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The manifest was written by an incompatible version of the store.
    #[error("Version de manifeste non supportée ({version}) : {}", path.display())]
    UnsupportedVersion {
        /// Manifest path.
        path: PathBuf,
        /// Version found in the file.
        version: u32,
    },

    /// A recording with this key is already stored.
    #[error("Enregistrement déjà présent : {0}")]
    Duplicate(String),

    /// Key text or components are malformed.
    #[error("Clé invalide : {0} (attendu : utilisateur/machine/horodatage RFC 3339)")]
    InvalidKey(String),

    /// Refused to store a clip with no bytes.
    #[error("Clip vide refusé")]
    EmptyClip,
}
