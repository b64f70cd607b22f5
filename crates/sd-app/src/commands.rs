use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SubsecRound, Utc};
use sd_audio::divergence::DivergenceCalculator;
use sd_audio::loader::{AudioLoader, AudioSource};
use sd_audio::worker::{compare_against, spawn_comparison};
use sd_core::config::CompareConfig;
use sd_core::signal::DivergenceReport;
use sd_store::{RecordingEntry, RecordingKey, RecordingStore};

use crate::cli::{Command, OutputFormat};
use crate::report::{self, FailedEntry, RankedEntry, Ranking};

/// Exécute une sous-commande et retourne la sortie à afficher.
///
/// # Errors
/// Propagates load, comparison, store and serialization failures.
pub fn run(command: &Command, config: &CompareConfig, format: OutputFormat) -> Result<String> {
    match command {
        Command::Compare { sample, reference } => {
            let report = compare_pair(
                config,
                AudioSource::from(sample.as_path()),
                AudioSource::from(reference.as_path()),
            )?;
            report::comparison(&report, format)
        }
        Command::CompareKeys { sample, reference } => {
            let store = open_store(config)?;
            let sample = store.clip_path(lookup(&store, sample)?);
            let reference = store.clip_path(lookup(&store, reference)?);
            let report = compare_pair(config, sample.into(), reference.into())?;
            report::comparison(&report, format)
        }
        Command::Save {
            file,
            user,
            machine,
            at,
        } => {
            let recorded_at = at.unwrap_or_else(|| Utc::now().trunc_subsecs(0));
            let key = RecordingKey::new(user.as_str(), machine.as_str(), recorded_at)?;
            save(config, file, key, format)
        }
        Command::List { user, machine } => {
            let store = open_store(config)?;
            let found: Vec<&RecordingEntry> =
                store.filter(user.as_deref(), machine.as_deref()).collect();
            report::entries(&found, format)
        }
        Command::Rank {
            sample,
            user,
            machine,
        } => {
            let ranking = rank(config, sample, user.as_deref(), machine.as_deref())?;
            report::ranking(&ranking, format)
        }
    }
}

fn open_store(config: &CompareConfig) -> Result<RecordingStore> {
    RecordingStore::open(&config.store_root)
        .with_context(|| format!("Catalogue inaccessible : {}", config.store_root.display()))
}

fn lookup<'a>(store: &'a RecordingStore, key: &RecordingKey) -> Result<&'a RecordingEntry> {
    store
        .get(key)
        .with_context(|| format!("Enregistrement inconnu : {key}"))
}

/// One comparison, run on the worker thread.
fn compare_pair(
    config: &CompareConfig,
    sample: AudioSource,
    reference: AudioSource,
) -> Result<DivergenceReport> {
    let calculator = DivergenceCalculator::new(config.params())?;
    log::info!(
        "Comparaison {} vs {} ({} Hz, {} s max, bins nuls : {})",
        sample.describe(),
        reference.describe(),
        config.sample_rate,
        config.max_duration_secs,
        config.zero_bins
    );
    let rx = spawn_comparison(calculator, sample, reference)?;
    let report = rx.recv().context("Thread de comparaison interrompu")??;
    log::debug!("n = {} bins, score = {}", report.bins, report.score);
    Ok(report)
}

/// Import a recorded file. The bytes must decode before they are stored.
fn save(
    config: &CompareConfig,
    file: &Path,
    key: RecordingKey,
    format: OutputFormat,
) -> Result<String> {
    let data: Arc<[u8]> = std::fs::read(file)
        .with_context(|| format!("Impossible de lire {}", file.display()))?
        .into();
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .map_or_else(|| "wav".to_string(), str::to_ascii_lowercase);

    let source = AudioSource::Bytes {
        data: Arc::clone(&data),
        extension: Some(extension.clone()),
    };
    let signal = AudioLoader::from_params(&config.params())
        .load(&source)
        .with_context(|| format!("{} n'est pas un clip audio exploitable", file.display()))?;

    let mut store = open_store(config)?;
    let entry = store.append(key, &data, &extension)?;
    report::saved(entry, signal.duration_secs(), format)
}

fn rank(
    config: &CompareConfig,
    sample_key: &RecordingKey,
    user: Option<&str>,
    machine: Option<&str>,
) -> Result<Ranking> {
    let store = open_store(config)?;
    let sample = lookup(&store, sample_key)?;
    let candidates: Vec<&RecordingEntry> = store
        .filter(user, machine)
        .filter(|e| e.key != sample.key)
        .collect();
    if candidates.is_empty() {
        log::warn!("Aucun autre enregistrement à comparer avec {sample_key}");
    }

    let references: Vec<AudioSource> = candidates
        .iter()
        .map(|e| AudioSource::from(store.clip_path(e)))
        .collect();
    let calculator = DivergenceCalculator::new(config.params())?;
    let results = compare_against(
        &calculator,
        &AudioSource::from(store.clip_path(sample)),
        &references,
    )?;

    let mut ranking = Ranking {
        sample: sample.key.clone(),
        ranked: Vec::new(),
        failed: Vec::new(),
    };
    for (entry, result) in candidates.into_iter().zip(results) {
        match result {
            Ok(report) => ranking.ranked.push(RankedEntry {
                key: entry.key.clone(),
                report,
            }),
            Err(e) => {
                log::warn!("Comparaison impossible avec {} : {e}", entry.key);
                ranking.failed.push(FailedEntry {
                    key: entry.key.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    ranking.sort();
    Ok(ranking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use sd_core::config::ZeroBinPolicy;
    use std::path::PathBuf;

    fn write_wav(path: &Path, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample((s * f32::from(i16::MAX)) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn tone(freq: f32) -> Vec<f32> {
        (0..16_000)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / 8000.0).sin())
            .collect()
    }

    fn chirp() -> Vec<f32> {
        (0..16_000)
            .map(|i| {
                let t = i as f32 / 8000.0;
                0.5 * (2.0 * std::f32::consts::PI * (100.0 + 200.0 * t) * t).sin()
            })
            .collect()
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0).unwrap()
    }

    struct Bench {
        _dir: tempfile::TempDir,
        root: PathBuf,
        config: CompareConfig,
    }

    impl Bench {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().to_path_buf();
            let config = CompareConfig {
                store_root: root.join("recordings"),
                ..CompareConfig::default()
            };
            Self {
                _dir: dir,
                root,
                config,
            }
        }

        fn clip(&self, name: &str, samples: &[f32]) -> PathBuf {
            let path = self.root.join(name);
            write_wav(&path, samples);
            path
        }

        fn save(&self, file: &Path, user: &str, minute: u32) -> Result<String> {
            let command = Command::Save {
                file: file.to_path_buf(),
                user: user.to_string(),
                machine: "m1".to_string(),
                at: Some(at(minute)),
            };
            run(&command, &self.config, OutputFormat::Json)
        }
    }

    fn key(user: &str, minute: u32) -> RecordingKey {
        RecordingKey::new(user, "m1", at(minute)).unwrap()
    }

    #[test]
    fn compare_paths_prints_score() {
        let bench = Bench::new();
        let a = bench.clip("a.wav", &tone(300.0));
        let command = Command::Compare {
            sample: a.clone(),
            reference: a,
        };
        let out = run(&command, &bench.config, OutputFormat::Text).unwrap();
        let score: f64 = out.parse().unwrap();
        assert!(score < 1e-9);
    }

    #[test]
    fn compare_honours_duration_override() {
        let bench = Bench::new();
        let a = bench.clip("a.wav", &tone(300.0));
        let b = bench.clip("b.wav", &chirp());
        let config = CompareConfig {
            max_duration_secs: 1.0,
            ..bench.config.clone()
        };
        let command = Command::Compare {
            sample: a,
            reference: b,
        };
        let out = run(&command, &config, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["bins"], 2000);
        assert_eq!(value["max_samples"], 2000);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let bench = Bench::new();
        let a = bench.clip("a.wav", &tone(300.0));
        let config = CompareConfig {
            sample_rate: 0,
            ..bench.config.clone()
        };
        let command = Command::Compare {
            sample: a.clone(),
            reference: a,
        };
        assert!(run(&command, &config, OutputFormat::Text).is_err());
    }

    #[test]
    fn save_list_and_compare_keys() {
        let bench = Bench::new();
        let a = bench.clip("a.wav", &tone(300.0));
        let b = bench.clip("b.wav", &chirp());
        bench.save(&a, "alice", 0).unwrap();
        bench.save(&b, "bob", 1).unwrap();

        let list = Command::List {
            user: None,
            machine: Some("m1".to_string()),
        };
        let out = run(&list, &bench.config, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["file_name"], "clip-000001.wav");

        let same = Command::CompareKeys {
            sample: key("alice", 0),
            reference: key("alice", 0),
        };
        let score: f64 = run(&same, &bench.config, OutputFormat::Text)
            .unwrap()
            .parse()
            .unwrap();
        assert!(score < 1e-9);

        let cross = Command::CompareKeys {
            sample: key("alice", 0),
            reference: key("bob", 1),
        };
        let score: f64 = run(&cross, &bench.config, OutputFormat::Text)
            .unwrap()
            .parse()
            .unwrap();
        assert!(score > 0.0);
    }

    #[test]
    fn save_rejects_duplicates_and_garbage() {
        let bench = Bench::new();
        let a = bench.clip("a.wav", &tone(300.0));
        bench.save(&a, "alice", 0).unwrap();
        assert!(bench.save(&a, "alice", 0).is_err());

        let junk = bench.root.join("junk.wav");
        std::fs::write(&junk, b"pas un fichier audio").unwrap();
        assert!(bench.save(&junk, "alice", 5).is_err());

        let store = RecordingStore::open(&bench.config.store_root).unwrap();
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn unknown_key_is_an_error() {
        let bench = Bench::new();
        let command = Command::CompareKeys {
            sample: key("alice", 0),
            reference: key("bob", 0),
        };
        assert!(run(&command, &bench.config, OutputFormat::Text).is_err());
    }

    #[test]
    fn rank_orders_by_divergence() {
        let bench = Bench::new();
        let a = bench.clip("a.wav", &tone(300.0));
        let twin = bench.clip("twin.wav", &tone(300.0));
        let other = bench.clip("other.wav", &chirp());
        bench.save(&a, "alice", 0).unwrap();
        bench.save(&other, "bob", 1).unwrap();
        bench.save(&twin, "carol", 2).unwrap();

        let ranking = rank(&bench.config, &key("alice", 0), None, None).unwrap();
        assert_eq!(ranking.ranked.len(), 2);
        assert!(ranking.failed.is_empty());
        assert_eq!(ranking.ranked[0].key, key("carol", 2));
        assert_eq!(ranking.ranked[1].key, key("bob", 1));
        assert!(ranking.ranked[0].report.score < ranking.ranked[1].report.score);

        let only_bob = rank(&bench.config, &key("alice", 0), Some("bob"), None).unwrap();
        assert_eq!(only_bob.ranked.len(), 1);
    }

    #[test]
    fn rank_under_strict_policy_reports_per_clip_failures() {
        let bench = Bench::new();
        let a = bench.clip("a.wav", &tone(300.0));
        let silent = bench.clip("silent.wav", &[0.0; 16_000]);
        bench.save(&a, "alice", 0).unwrap();
        bench.save(&silent, "bob", 1).unwrap();

        let config = CompareConfig {
            zero_bins: ZeroBinPolicy::Strict,
            ..bench.config.clone()
        };
        let ranking = rank(&config, &key("alice", 0), None, None).unwrap();
        assert!(ranking.ranked.is_empty());
        assert_eq!(ranking.failed.len(), 1);
        assert_eq!(ranking.failed[0].key, key("bob", 1));
    }
}
