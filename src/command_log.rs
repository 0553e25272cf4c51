use chrono::Local;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Append-only audit trail of what users asked the bot to do.
pub struct CommandLog {
    file: Option<Mutex<File>>,
}

impl CommandLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            file: Some(Mutex::new(file)),
        })
    }

    /// Mirrors to tracing only.
    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn log(&self, action: &str, details: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("[{}] [{}] {}\n", timestamp, action, details);

        if action == "ERROR" {
            tracing::warn!("[{}] {}", action, details);
        } else {
            tracing::info!("[{}] {}", action, details);
        }

        if let Some(file) = &self.file {
            let mut file = file.lock();
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }

    pub fn log_command(&self, user_id: u64, command: &str) {
        self.log("COMMAND", &format!("user={} {}", user_id, command));
    }

    pub fn log_confirmation(&self, user_id: u64, outcome: &str) {
        self.log("CONFIRM", &format!("user={} {}", user_id, outcome));
    }

    pub fn log_denied(&self, user_id: u64, reason: &str) {
        self.log("DENIED", &format!("user={} {}", user_id, reason));
    }

    pub fn log_error(&self, error: &str) {
        self.log("ERROR", error);
    }
}
