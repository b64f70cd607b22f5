use anyhow::Result;
use clap::Parser;
use sd_core::config::CompareConfig;

pub mod cli;
pub mod commands;
pub mod report;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config puis appliquer les overrides CLI
    let mut config = resolve_config(&cli)?;
    cli.overrides.apply(&mut config);
    if let Some(ref root) = cli.store {
        config.store_root.clone_from(root);
    }

    // 4. Exécuter
    let output = commands::run(&cli.command, &config, cli.format)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Missing config file falls back to defaults; an unreadable one is an error.
fn resolve_config(cli: &cli::Cli) -> Result<CompareConfig> {
    if cli.config.exists() {
        sd_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(CompareConfig::default())
    }
}
