use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// A comparison parameter is outside its valid domain.
    #[error("Paramètre invalide : {name} = {value}")]
    InvalidParameter {
        /// Parameter name as it appears in the TOML/CLI.
        name: &'static str,
        /// Offending value, formatted.
        value: String,
    },

    /// Unknown zero-bin policy name.
    #[error("Politique de bins nuls inconnue : {0} (attendu : skip, smooth, strict)")]
    UnknownPolicy(String),
}
