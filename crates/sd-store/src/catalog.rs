use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::key::RecordingKey;

const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;

/// One stored clip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingEntry {
    /// Sequential id, starting at 1.
    pub id: u64,
    pub key: RecordingKey,
    /// Nom de fichier opaque relatif à la racine du store.
    pub file_name: String,
    pub byte_len: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    entries: Vec<RecordingEntry>,
}

/// Catalogue append-only de clips enregistrés.
///
/// Clip bytes are written as-is under opaque names (`clip-000001.wav`); the
/// key lives only in `manifest.json`, so user or machine names never reach the
/// filesystem. Nothing is ever overwritten or removed.
#[derive(Debug)]
pub struct RecordingStore {
    root: PathBuf,
    manifest: Manifest,
}

impl RecordingStore {
    /// Open the store at `root`, creating the directory if needed.
    ///
    /// A missing manifest means an empty store.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the directory cannot be created or the
    /// manifest read, [`StoreError::Manifest`] if it is not valid (keys
    /// included), [`StoreError::UnsupportedVersion`] if it has another version.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = match fs::read_to_string(&manifest_path) {
            Ok(text) => {
                let manifest: Manifest =
                    serde_json::from_str(&text).map_err(|source| StoreError::Manifest {
                        path: manifest_path.clone(),
                        source,
                    })?;
                if manifest.version != MANIFEST_VERSION {
                    return Err(StoreError::UnsupportedVersion {
                        path: manifest_path,
                        version: manifest.version,
                    });
                }
                manifest
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Manifest {
                version: MANIFEST_VERSION,
                entries: Vec::new(),
            },
            Err(source) => {
                return Err(StoreError::Io {
                    path: manifest_path,
                    source,
                });
            }
        };

        log::debug!(
            "Store ouvert : {} ({} enregistrements)",
            root.display(),
            manifest.entries.len()
        );
        Ok(Self { root, manifest })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `bytes` under `key`. `extension` names the clip file (`"wav"`).
    ///
    /// # Errors
    /// - [`StoreError::EmptyClip`] if `bytes` is empty.
    /// - [`StoreError::Duplicate`] if `key` is already present.
    /// - [`StoreError::Io`] / [`StoreError::Manifest`] on write failure; the
    ///   clip file is removed again so the store stays consistent.
    pub fn append(
        &mut self,
        key: RecordingKey,
        bytes: &[u8],
        extension: &str,
    ) -> Result<&RecordingEntry, StoreError> {
        if bytes.is_empty() {
            return Err(StoreError::EmptyClip);
        }
        if self.get(&key).is_some() {
            return Err(StoreError::Duplicate(key.to_string()));
        }

        let id = self.manifest.entries.last().map_or(1, |e| e.id + 1);
        let extension = extension.trim_start_matches('.');
        let file_name = format!("clip-{id:06}.{extension}");
        let clip_path = self.root.join(&file_name);

        // create_new : jamais d'écrasement
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&clip_path)
            .map_err(|source| StoreError::Io {
                path: clip_path.clone(),
                source,
            })?;
        if let Err(source) = file.write_all(bytes).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&clip_path);
            return Err(StoreError::Io {
                path: clip_path,
                source,
            });
        }

        self.manifest.entries.push(RecordingEntry {
            id,
            key,
            file_name,
            byte_len: bytes.len() as u64,
        });
        if let Err(e) = self.save_manifest() {
            self.manifest.entries.pop();
            let _ = fs::remove_file(&clip_path);
            return Err(e);
        }

        let entry = &self.manifest.entries[self.manifest.entries.len() - 1];
        log::info!("Enregistré {} → {}", entry.key, entry.file_name);
        Ok(entry)
    }

    /// Entry stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &RecordingKey) -> Option<&RecordingEntry> {
        self.manifest.entries.iter().find(|e| &e.key == key)
    }

    /// All entries, in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[RecordingEntry] {
        &self.manifest.entries
    }

    /// Entries matching the optional user and machine filters.
    pub fn filter<'a>(
        &'a self,
        user: Option<&'a str>,
        machine: Option<&'a str>,
    ) -> impl Iterator<Item = &'a RecordingEntry> + 'a {
        self.manifest.entries.iter().filter(move |e| {
            user.is_none_or(|u| e.key.user() == u) && machine.is_none_or(|m| e.key.machine() == m)
        })
    }

    /// Absolute path of an entry's clip file.
    #[must_use]
    pub fn clip_path(&self, entry: &RecordingEntry) -> PathBuf {
        self.root.join(&entry.file_name)
    }

    /// Écrit le manifeste dans un fichier temporaire puis le renomme.
    fn save_manifest(&self) -> Result<(), StoreError> {
        let final_path = self.root.join(MANIFEST_FILE);
        let tmp_path = self.root.join(format!("{MANIFEST_FILE}.tmp"));

        let json = serde_json::to_vec_pretty(&self.manifest).map_err(|source| {
            StoreError::Manifest {
                path: final_path.clone(),
                source,
            }
        })?;
        fs::write(&tmp_path, json).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &final_path).map_err(|source| StoreError::Io {
            path: final_path,
            source,
        })
    }
}
