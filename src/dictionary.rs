use crate::error::BotError;
use crate::storage::{Entries, JsonFile, KeyValueStorage};
use rand::seq::IteratorRandom;
use serde_json::Value;
use std::path::PathBuf;
use tracing::warn;

/// The phrase book. Keys are case-folded on the way in; values are kept
/// byte for byte.
///
/// Entries whose value is not a JSON string are skipped by lookups and
/// written back unchanged on save.
pub struct DictionaryStore {
    storage: Box<dyn KeyValueStorage<Value>>,
}

impl DictionaryStore {
    pub fn new(storage: impl KeyValueStorage<Value> + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonFile::new(path))
    }

    /// Unreadable storage counts as an empty dictionary.
    fn raw(&self) -> Entries<Value> {
        self.storage.load().unwrap_or_else(|e| {
            warn!("Dictionary unreadable, treating as empty: {}", e);
            Entries::new()
        })
    }

    fn entries(&self) -> Entries<String> {
        self.raw()
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(text) => Some((key, text)),
                other => {
                    warn!("Skipping dictionary key '{}': value is not a string ({})", key, other);
                    None
                }
            })
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().remove(&key.to_lowercase())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries().contains_key(&key.to_lowercase())
    }

    pub fn list_keys(&self) -> Vec<String> {
        // BTreeMap iterates in lexicographic order already.
        self.entries().into_keys().collect()
    }

    pub fn add(&self, key: &str, value: &str) -> Result<(), BotError> {
        let mut entries = self.raw();
        let key = key.to_lowercase();

        if entries.contains_key(&key) {
            return Err(BotError::AlreadyExists(key));
        }

        entries.insert(key, Value::String(value.to_string()));
        self.storage.save(&entries)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), BotError> {
        let mut entries = self.raw();
        let key = key.to_lowercase();

        if entries.remove(&key).is_none() {
            return Err(BotError::NotFound(key));
        }

        self.storage.save(&entries)?;
        Ok(())
    }

    pub fn update(&self, key: &str, new_value: &str) -> Result<(), BotError> {
        let mut entries = self.raw();
        let key = key.to_lowercase();

        match entries.get_mut(&key) {
            Some(value) => *value = Value::String(new_value.to_string()),
            None => return Err(BotError::NotFound(key)),
        }

        self.storage.save(&entries)?;
        Ok(())
    }

    pub fn random_entry(&self) -> Option<(String, String)> {
        let mut rng = rand::thread_rng();
        self.entries().into_iter().choose(&mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store_with(raw: &str) -> (TempDir, DictionaryStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jamaican_dict.json");
        fs::write(&path, raw).unwrap();
        let store = DictionaryStore::open(path);
        (dir, store)
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let (_dir, store) = store_with(r#"{"wagwan": "hello"}"#);
        assert_eq!(store.get("WagWan").as_deref(), Some("hello"));
        assert_eq!(store.get("nah"), None);
    }

    #[test]
    fn test_missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DictionaryStore::open(dir.path().join("absent.json"));
        assert!(store.list_keys().is_empty());
        assert!(store.random_entry().is_none());
        assert!(matches!(store.remove("x"), Err(BotError::NotFound(_))));
    }

    #[test]
    fn test_list_keys_sorted() {
        let (_dir, store) = store_with(r#"{"zed": "1", "bless": "2", "irie": "3"}"#);
        assert_eq!(store.list_keys(), vec!["bless", "irie", "zed"]);
    }

    #[test]
    fn test_add_rejects_existing_key_any_case() {
        let (_dir, store) = store_with(r#"{"wagwan": "hello"}"#);

        let err = store.add("WAGWAN", "other").unwrap_err();
        assert!(matches!(err, BotError::AlreadyExists(k) if k == "wagwan"));
        assert_eq!(store.get("wagwan").as_deref(), Some("hello"));

        store.add("Likkle", "small").unwrap();
        assert_eq!(store.get("likkle").as_deref(), Some("small"));
        assert_eq!(store.list_keys(), vec!["likkle", "wagwan"]);
    }

    #[test]
    fn test_update_and_remove_missing_key_leave_store_alone() {
        let (dir, store) = store_with(r#"{"wagwan": "hello"}"#);
        let before = fs::read_to_string(dir.path().join("jamaican_dict.json")).unwrap();

        assert!(matches!(store.update("nope", "x"), Err(BotError::NotFound(_))));
        assert!(matches!(store.remove("nope"), Err(BotError::NotFound(_))));

        let after = fs::read_to_string(dir.path().join("jamaican_dict.json")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_update_then_remove() {
        let (_dir, store) = store_with(r#"{"wagwan": "hello"}"#);

        store.update("Wagwan", "yo").unwrap();
        assert_eq!(store.get("wagwan").as_deref(), Some("yo"));

        store.remove("wagwan").unwrap();
        assert!(!store.contains("wagwan"));
    }

    #[test]
    fn test_round_trip_preserves_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let store = DictionaryStore::open(dir.path().join("d.json"));

        store.add("Bumbo", "Mi nuh know — wah gwaan? ñ 🇯🇲").unwrap();

        let reopened = DictionaryStore::open(dir.path().join("d.json"));
        assert_eq!(
            reopened.get("bumbo").as_deref(),
            Some("Mi nuh know — wah gwaan? ñ 🇯🇲")
        );
    }

    #[test]
    fn test_random_entry_comes_from_store() {
        let (_dir, store) = store_with(r#"{"a": "1", "b": "2"}"#);
        for _ in 0..20 {
            let (key, value) = store.random_entry().unwrap();
            assert_eq!(store.get(&key), Some(value));
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = DictionaryStore::open(dir.path().join("gone").join("d.json"));
        assert!(matches!(store.add("a", "b"), Err(BotError::Persistence(_))));
    }

    #[test]
    fn test_non_string_value_does_not_cost_the_rest() {
        let (dir, store) = store_with(r#"{"wagwan": "hello", "count": 3}"#);

        assert_eq!(store.get("wagwan").as_deref(), Some("hello"));
        assert_eq!(store.get("count"), None);
        assert_eq!(store.list_keys(), vec!["wagwan"]);

        store.add("irie", "good").unwrap();
        assert!(matches!(store.add("count", "x"), Err(BotError::AlreadyExists(_))));

        let raw = fs::read_to_string(dir.path().join("jamaican_dict.json")).unwrap();
        let saved: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            saved,
            serde_json::json!({ "count": 3, "irie": "good", "wagwan": "hello" })
        );
    }
}
