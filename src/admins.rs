use crate::storage::{JsonFile, KeyValueStorage};
use serde_json::Value;
use std::path::PathBuf;
use tracing::warn;

/// Static allow-list of admin user ids. Nothing in the bot writes to it.
pub struct AdminRegistry {
    storage: Box<dyn KeyValueStorage<Value>>,
}

impl AdminRegistry {
    pub fn new(storage: impl KeyValueStorage<Value> + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonFile::new(path))
    }

    /// Only a literal JSON `true` grants admin.
    pub fn is_admin(&self, user_id: u64) -> bool {
        match self.storage.load() {
            Ok(admins) => admins.get(&user_id.to_string()) == Some(&Value::Bool(true)),
            Err(e) => {
                warn!("Admin list unreadable, nobody is admin: {}", e);
                false
            }
        }
    }
}
