use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sd_core::config::{CompareConfig, ZeroBinPolicy};
use sd_store::RecordingKey;

/// specdiv — Divergence spectrale entre clips audio enregistrés.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Racine du catalogue d'enregistrements (remplace [store] root).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Format de sortie.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare deux fichiers audio : divergence de SAMPLE relativement à REFERENCE.
    Compare {
        /// Clip évalué.
        sample: PathBuf,
        /// Clip de référence.
        reference: PathBuf,
    },

    /// Compare deux enregistrements du catalogue (clés user/machine/RFC3339).
    CompareKeys {
        sample: RecordingKey,
        reference: RecordingKey,
    },

    /// Importe un fichier audio dans le catalogue sous une clé explicite.
    Save {
        /// Fichier audio à importer.
        file: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long)]
        machine: String,
        /// Horodatage RFC 3339. Défaut : maintenant.
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },

    /// Liste les enregistrements, filtrés par utilisateur et/ou machine.
    List {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        machine: Option<String>,
    },

    /// Classe les autres enregistrements par divergence croissante face à SAMPLE.
    Rank {
        sample: RecordingKey,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        machine: Option<String>,
    },
}

/// Surcharges par appel des paramètres de comparaison.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Sample rate commun d'analyse (Hz).
    #[arg(long, global = true)]
    pub sample_rate: Option<u32>,

    /// Durée maximale analysée par clip (s). `10` reproduit l'appel court.
    #[arg(long = "max-duration", global = true)]
    pub max_duration_secs: Option<f32>,

    /// Politique des bins nuls : skip, smooth, strict.
    #[arg(long, global = true)]
    pub zero_bins: Option<ZeroBinPolicy>,

    /// Lissage additif pour `--zero-bins smooth`.
    #[arg(long, global = true)]
    pub epsilon: Option<f64>,
}

impl Overrides {
    /// Apply the given overrides on top of a loaded configuration.
    ///
    /// Values are not clamped: out-of-range overrides are rejected later by
    /// parameter validation rather than silently corrected.
    pub fn apply(&self, config: &mut CompareConfig) {
        if let Some(v) = self.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = self.max_duration_secs {
            config.max_duration_secs = v;
        }
        if let Some(v) = self.zero_bins {
            config.zero_bins = v;
        }
        if let Some(v) = self.epsilon {
            config.smoothing_epsilon = v;
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lisible, une ligne par résultat.
    #[default]
    Text,
    /// JSON indenté.
    Json,
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("horodatage RFC 3339 attendu ({e})"))
}
