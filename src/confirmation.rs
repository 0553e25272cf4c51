use crate::dictionary::DictionaryStore;
use crate::error::BotError;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Remove,
    Update { new_value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub action: PendingAction,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Yes,
    No,
}

impl Reply {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "yes" => Some(Reply::Yes),
            "no" => Some(Reply::No),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Removed { key: String },
    Updated { key: String },
    Failed { key: String, error: BotError },
    Cancelled { key: String },
}

/// At most one staged destructive edit per user, waiting for a yes/no.
#[derive(Default)]
pub struct ConfirmationTracker {
    pending: Mutex<HashMap<u64, PendingConfirmation>>,
}

impl ConfirmationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `confirmation` for `user_id`. Whatever was staged before is
    /// replaced and handed back.
    pub fn propose(
        &self,
        user_id: u64,
        confirmation: PendingConfirmation,
    ) -> Option<PendingConfirmation> {
        self.pending.lock().insert(user_id, confirmation)
    }

    pub fn pending(&self, user_id: u64) -> Option<PendingConfirmation> {
        self.pending.lock().get(&user_id).cloned()
    }

    /// Returns `None` when `text` is not a confirmation: either nothing is
    /// staged for the user or the text is not a yes/no. The staged entry is
    /// consumed before the store is touched.
    pub fn resolve(&self, user_id: u64, text: &str, store: &DictionaryStore) -> Option<Outcome> {
        let reply = Reply::parse(text)?;
        let PendingConfirmation { action, key } = self.pending.lock().remove(&user_id)?;

        let outcome = match (reply, action) {
            (Reply::No, _) => Outcome::Cancelled { key },
            (Reply::Yes, PendingAction::Remove) => match store.remove(&key) {
                Ok(()) => Outcome::Removed { key },
                Err(error) => Outcome::Failed { key, error },
            },
            (Reply::Yes, PendingAction::Update { new_value }) => {
                match store.update(&key, &new_value) {
                    Ok(()) => Outcome::Updated { key },
                    Err(error) => Outcome::Failed { key, error },
                }
            }
        };

        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store() -> (TempDir, DictionaryStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.json");
        fs::write(&path, r#"{"foo": "bar", "wagwan": "hello"}"#).unwrap();
        (dir, DictionaryStore::open(path))
    }

    fn remove(key: &str) -> PendingConfirmation {
        PendingConfirmation {
            action: PendingAction::Remove,
            key: key.to_string(),
        }
    }

    fn update(key: &str, value: &str) -> PendingConfirmation {
        PendingConfirmation {
            action: PendingAction::Update {
                new_value: value.to_string(),
            },
            key: key.to_string(),
        }
    }

    #[test]
    fn test_reply_parsing() {
        assert_eq!(Reply::parse("  YES "), Some(Reply::Yes));
        assert_eq!(Reply::parse("No"), Some(Reply::No));
        assert_eq!(Reply::parse("yes please"), None);
        assert_eq!(Reply::parse("y"), None);
    }

    #[test]
    fn test_no_pending_means_not_a_confirmation() {
        let (_dir, store) = store();
        let tracker = ConfirmationTracker::new();
        assert!(tracker.resolve(1, "yes", &store).is_none());
        assert!(store.contains("foo"));
    }

    #[test]
    fn test_yes_removes() {
        let (_dir, store) = store();
        let tracker = ConfirmationTracker::new();
        tracker.propose(1, remove("foo"));

        let outcome = tracker.resolve(1, "yes", &store).unwrap();
        assert!(matches!(outcome, Outcome::Removed { key } if key == "foo"));
        assert!(!store.contains("foo"));
        assert!(tracker.pending(1).is_none());
    }

    #[test]
    fn test_yes_on_vanished_key_fails_without_side_effects() {
        let (_dir, store) = store();
        let tracker = ConfirmationTracker::new();
        tracker.propose(1, remove("foo"));
        store.remove("foo").unwrap();

        let outcome = tracker.resolve(1, "yes", &store).unwrap();
        assert!(matches!(
            outcome,
            Outcome::Failed {
                error: BotError::NotFound(_),
                ..
            }
        ));
        assert!(tracker.pending(1).is_none());
        assert_eq!(store.list_keys(), vec!["wagwan"]);
    }

    #[test]
    fn test_no_cancels_without_touching_store() {
        let (_dir, store) = store();
        let tracker = ConfirmationTracker::new();
        tracker.propose(1, update("foo", "baz"));

        let outcome = tracker.resolve(1, " NO ", &store).unwrap();
        assert!(matches!(outcome, Outcome::Cancelled { key } if key == "foo"));
        assert_eq!(store.get("foo").as_deref(), Some("bar"));
        assert!(tracker.pending(1).is_none());
    }

    #[test]
    fn test_other_text_leaves_pending_untouched() {
        let (_dir, store) = store();
        let tracker = ConfirmationTracker::new();
        tracker.propose(1, remove("foo"));

        assert!(tracker.resolve(1, "maybe", &store).is_none());
        assert_eq!(tracker.pending(1), Some(remove("foo")));
        assert!(store.contains("foo"));
    }

    #[test]
    fn test_second_proposal_replaces_first() {
        let (_dir, store) = store();
        let tracker = ConfirmationTracker::new();

        assert!(tracker.propose(1, remove("foo")).is_none());
        let replaced = tracker.propose(1, update("wagwan", "yo"));
        assert_eq!(replaced, Some(remove("foo")));

        let outcome = tracker.resolve(1, "yes", &store).unwrap();
        assert!(matches!(outcome, Outcome::Updated { key } if key == "wagwan"));
        assert_eq!(store.get("wagwan").as_deref(), Some("yo"));
        assert_eq!(store.get("foo").as_deref(), Some("bar"));
    }

    #[test]
    fn test_confirmations_are_per_user() {
        let (_dir, store) = store();
        let tracker = ConfirmationTracker::new();
        tracker.propose(1, remove("foo"));

        assert!(tracker.resolve(2, "yes", &store).is_none());
        assert!(store.contains("foo"));
        assert!(tracker.pending(1).is_some());
    }
}
