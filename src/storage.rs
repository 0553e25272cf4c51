//! Whole-file key-value persistence.
//!
//! Every load reads the entire backing file and every save rewrites it.
//! There is no locking: two concurrent writers race and the last one wins.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Entries<V> = BTreeMap<String, V>;

pub trait KeyValueStorage<V>: Send + Sync {
    /// A missing backing store loads as an empty map.
    fn load(&self) -> Result<Entries<V>, StorageError>;

    fn save(&self, entries: &Entries<V>) -> Result<(), StorageError>;
}

pub struct JsonFile<V> {
    path: PathBuf,
    _values: PhantomData<fn() -> V>,
}

impl<V> JsonFile<V> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _values: PhantomData,
        }
    }
}

impl<V> KeyValueStorage<V> for JsonFile<V>
where
    V: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Entries<V>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entries: &Entries<V>) -> Result<(), StorageError> {
        let mut raw = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;
        raw.push('\n');

        fs::write(&self.path, raw).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file: JsonFile<String> = JsonFile::new(dir.path().join("nope.json"));
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let file: JsonFile<String> = JsonFile::new(&path);
        assert!(matches!(file.load(), Err(StorageError::Json { .. })));
    }

    #[test]
    fn test_save_is_pretty_and_keeps_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.json");
        let file = JsonFile::new(&path);

        let mut entries = Entries::new();
        entries.insert("irie".to_string(), "everyting criss 🇯🇲".to_string());
        file.save(&entries).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"irie\": \"everyting criss 🇯🇲\"\n"));
        assert_eq!(file.load().unwrap(), entries);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file: JsonFile<String> = JsonFile::new(dir.path().join("missing").join("dict.json"));
        assert!(matches!(
            file.save(&Entries::new()),
            Err(StorageError::Io { .. })
        ));
    }
}
