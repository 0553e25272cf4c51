use crate::admins::AdminRegistry;
use crate::command_log::CommandLog;
use crate::confirmation::{ConfirmationTracker, Outcome, PendingAction, PendingConfirmation};
use crate::dictionary::DictionaryStore;
use crate::error::BotError;
use crate::llm::LlmBackend;
use crate::patois::{self, TALK_PROMPT, TRANSLATE_PROMPT};
use crate::rate_limiter::{RateLimiter, Verdict};
use crate::security::scrub_output;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Discord rejects messages over 2000 characters; leave some headroom.
pub const MAX_MESSAGE_CHARS: usize = 1900;
pub const KEYS_PER_PAGE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Roulette,
    Help,
    Add { key: String, value: String },
    Remove { key: String },
    Update { key: String, new_value: String },
    Talk { prompt: String },
    Translate { text: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::List => "list",
            Command::Roulette => "roulette",
            Command::Help => "help",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
            Command::Update { .. } => "update",
            Command::Talk { .. } => "talk",
            Command::Translate { .. } => "translate",
        }
    }

    /// Commands that wait on the model and need the interaction deferred.
    pub fn is_slow(&self) -> bool {
        matches!(self, Command::Talk { .. } | Command::Translate { .. })
    }

    fn summary(&self) -> String {
        match self {
            Command::Add { key, .. } | Command::Remove { key } | Command::Update { key, .. } => {
                format!("/{} key={}", self.name(), key)
            }
            Command::Talk { prompt: text } | Command::Translate { text } => {
                format!("/{} chars={}", self.name(), text.chars().count())
            }
            _ => format!("/{}", self.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    /// Only the requester sees it.
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accent {
    Blue,
    Gold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub title: String,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub accent: Accent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Listing(Listing),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub body: Body,
    pub visibility: Visibility,
}

impl Reply {
    pub fn public(text: impl Into<String>) -> Self {
        Self {
            body: Body::Text(text.into()),
            visibility: Visibility::Public,
        }
    }

    pub fn private(text: impl Into<String>) -> Self {
        Self {
            body: Body::Text(text.into()),
            visibility: Visibility::Private,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            Body::Text(text) => Some(text),
            Body::Listing(_) => None,
        }
    }
}

/// What the bot says back to an ordinary channel message.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MessageResponse {
    /// Dictionary hit for a prefixed message.
    pub lookup: Option<String>,
    /// Result of a pending yes/no confirmation.
    pub confirmation: Option<String>,
}

type Interceptor = fn(&CommandService, u64, &Command, DateTime<Utc>) -> Result<(), BotError>;

/// Runs, in order, before any slash command is routed.
const INTERCEPTORS: &[Interceptor] = &[
    CommandService::log_invocation,
    CommandService::enforce_rate_limit,
];

pub struct CommandService {
    dictionary: DictionaryStore,
    admins: AdminRegistry,
    llm: Arc<dyn LlmBackend>,
    limiter: RateLimiter,
    confirmations: ConfirmationTracker,
    log: CommandLog,
    prefix: String,
}

impl CommandService {
    pub fn new(
        dictionary: DictionaryStore,
        admins: AdminRegistry,
        llm: Arc<dyn LlmBackend>,
        limiter: RateLimiter,
        log: CommandLog,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            dictionary,
            admins,
            llm,
            limiter,
            confirmations: ConfirmationTracker::new(),
            log,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Runs the interceptor chain. `Err` carries the reply to send instead of
    /// running the command.
    pub fn admit(&self, user_id: u64, command: &Command, now: DateTime<Utc>) -> Result<(), Reply> {
        for interceptor in INTERCEPTORS {
            if let Err(err) = interceptor(self, user_id, command, now) {
                return Err(self.failure(user_id, command, err));
            }
        }
        Ok(())
    }

    /// Routes an admitted command.
    pub async fn execute(&self, user_id: u64, command: Command) -> Vec<Reply> {
        let result = match &command {
            Command::List => Ok(vec![self.list()]),
            Command::Roulette => Ok(vec![self.roulette()]),
            Command::Help => Ok(vec![self.help(user_id)]),
            Command::Add { key, value } => self.add(user_id, key, value).map(|r| vec![r]),
            Command::Remove { key } => self.stage_remove(user_id, key).map(|r| vec![r]),
            Command::Update { key, new_value } => {
                self.stage_update(user_id, key, new_value).map(|r| vec![r])
            }
            Command::Talk { prompt } => self.generate(prompt, Some(TALK_PROMPT)).await,
            Command::Translate { text } => {
                let prompt = format!("{TRANSLATE_PROMPT}\n\n{text}");
                self.generate(&prompt, None).await
            }
        };

        result.unwrap_or_else(|err| vec![self.failure(user_id, &command, err)])
    }

    pub async fn dispatch(&self, user_id: u64, command: Command, now: DateTime<Utc>) -> Vec<Reply> {
        match self.admit(user_id, &command, now) {
            Ok(()) => self.execute(user_id, command).await,
            Err(reply) => vec![reply],
        }
    }

    /// Handles a plain channel message: prefix lookups and yes/no replies to a
    /// staged confirmation.
    pub fn on_message(&self, user_id: u64, content: &str) -> MessageResponse {
        let lookup = content
            .strip_prefix(self.prefix.as_str())
            .map(|rest| rest.trim().to_lowercase())
            .filter(|key| !key.is_empty())
            .and_then(|key| self.dictionary.get(&key))
            .filter(|value| !value.is_empty());

        let confirmation = self
            .confirmations
            .resolve(user_id, content, &self.dictionary)
            .map(|outcome| self.confirmation_reply(user_id, outcome));

        MessageResponse {
            lookup,
            confirmation,
        }
    }

    fn log_invocation(
        &self,
        user_id: u64,
        command: &Command,
        _now: DateTime<Utc>,
    ) -> Result<(), BotError> {
        self.log.log_command(user_id, &command.summary());
        Ok(())
    }

    fn enforce_rate_limit(
        &self,
        user_id: u64,
        _command: &Command,
        now: DateTime<Utc>,
    ) -> Result<(), BotError> {
        match self.limiter.check_and_record(user_id, now) {
            Verdict::Allowed => Ok(()),
            Verdict::Denied { retry_after } => Err(BotError::RateLimited { retry_after }),
        }
    }

    fn require_admin(&self, user_id: u64) -> Result<(), BotError> {
        if self.admins.is_admin(user_id) {
            Ok(())
        } else {
            Err(BotError::PermissionDenied)
        }
    }

    fn list(&self) -> Reply {
        let keys = self.dictionary.list_keys();
        if keys.is_empty() {
            return Reply::public(patois::EMPTY_DICTIONARY);
        }

        let pages: Vec<_> = keys.chunks(KEYS_PER_PAGE).collect();
        let fields = pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let name = if pages.len() > 1 {
                    format!("Page {}", i + 1)
                } else {
                    "Keys".to_string()
                };
                let value = page
                    .iter()
                    .map(|key| format!("`{key}`"))
                    .collect::<Vec<_>>()
                    .join(", ");
                (name, value)
            })
            .collect();

        Reply {
            body: Body::Listing(Listing {
                title: "📚 All Di Keys Dem".to_string(),
                description: format!("Total: {} tings inna di book", keys.len()),
                fields,
                accent: Accent::Blue,
            }),
            visibility: Visibility::Public,
        }
    }

    fn roulette(&self) -> Reply {
        match self.dictionary.random_entry() {
            Some((_, value)) => Reply::public(value),
            None => Reply::public(patois::EMPTY_DICTIONARY),
        }
    }

    fn help(&self, user_id: u64) -> Reply {
        let field = |name: &str, value: &str| (name.to_string(), value.to_string());

        let mut fields = vec![
            (
                format!("{}[key]", self.prefix),
                format!(
                    "Get di text fi any key from di dictionary\nExample: `{}bomboclat`",
                    self.prefix
                ),
            ),
            field("/list", "Show all keys inna di dictionary (alphabetical order)"),
            field("/roulette", "Get a random ting from di dictionary"),
            field("/talk [prompt]", "Talk to the AI assistant"),
            field("/translate [text]", "Translate text to Jamaican Patois using AI"),
            field("/help", "Show dis message"),
        ];

        if self.admins.is_admin(user_id) {
            fields.extend([
                field("👑 Admin Commands", "Dese commands only fi di admins, star!"),
                field("/add [key] [value]", "Add a new entry to di dictionary"),
                field(
                    "/update [key] [new_value]",
                    "Update an existing entry inna di dictionary",
                ),
                field("/remove [key]", "Delete an entry from di dictionary"),
            ]);
        }

        Reply {
            body: Body::Listing(Listing {
                title: "🇯🇲 Bombocord Commands".to_string(),
                description: "All di commands yuh can use, seen?".to_string(),
                fields,
                accent: Accent::Gold,
            }),
            visibility: Visibility::Public,
        }
    }

    fn add(&self, user_id: u64, key: &str, value: &str) -> Result<Reply, BotError> {
        self.require_admin(user_id)?;
        self.dictionary.add(key, value)?;
        info!("User {} added '{}'", user_id, key);
        Ok(Reply::public(patois::added(key)))
    }

    fn stage_remove(&self, user_id: u64, key: &str) -> Result<Reply, BotError> {
        self.require_admin(user_id)?;
        let current = self
            .dictionary
            .get(key)
            .ok_or_else(|| BotError::NotFound(key.to_string()))?;

        self.stage(
            user_id,
            PendingConfirmation {
                action: PendingAction::Remove,
                key: key.to_string(),
            },
        );
        Ok(Reply::public(patois::confirm_remove(key, &current)))
    }

    fn stage_update(&self, user_id: u64, key: &str, new_value: &str) -> Result<Reply, BotError> {
        self.require_admin(user_id)?;
        let old_value = self
            .dictionary
            .get(key)
            .ok_or_else(|| BotError::NotFound(key.to_string()))?;

        self.stage(
            user_id,
            PendingConfirmation {
                action: PendingAction::Update {
                    new_value: new_value.to_string(),
                },
                key: key.to_string(),
            },
        );
        Ok(Reply::public(patois::confirm_update(
            key, &old_value, new_value,
        )))
    }

    /// The user is not told when an earlier staged edit gets replaced.
    fn stage(&self, user_id: u64, confirmation: PendingConfirmation) {
        if let Some(previous) = self.confirmations.propose(user_id, confirmation) {
            debug!(
                "User {} replaced pending {:?} on '{}'",
                user_id, previous.action, previous.key
            );
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<Vec<Reply>, BotError> {
        let text = self.llm.generate(prompt, system_prompt).await?;
        let text = scrub_output(&text);

        Ok(split_message(&text, MAX_MESSAGE_CHARS)
            .into_iter()
            .map(Reply::public)
            .collect())
    }

    fn confirmation_reply(&self, user_id: u64, outcome: Outcome) -> String {
        match outcome {
            Outcome::Removed { key } => {
                self.log.log_confirmation(user_id, &format!("removed key={key}"));
                patois::removed(&key)
            }
            Outcome::Updated { key } => {
                self.log.log_confirmation(user_id, &format!("updated key={key}"));
                patois::updated(&key)
            }
            Outcome::Cancelled { key } => {
                self.log.log_confirmation(user_id, &format!("cancelled key={key}"));
                patois::CANCELLED.to_string()
            }
            Outcome::Failed { key, error } => {
                self.log
                    .log_error(&format!("confirmation for key={key} by user={user_id}: {error}"));
                patois::CONFIRMATION_FAILED.to_string()
            }
        }
    }

    fn failure(&self, user_id: u64, command: &Command, err: BotError) -> Reply {
        let text = match &err {
            BotError::NotFound(key) => patois::not_found(key),
            BotError::AlreadyExists(key) => patois::already_exists(key),
            BotError::PermissionDenied => {
                self.log
                    .log_denied(user_id, &format!("/{} permission denied", command.name()));
                patois::NO_PERMISSION.to_string()
            }
            BotError::RateLimited { retry_after } => {
                self.log.log_denied(
                    user_id,
                    &format!("/{} rate limited for {:?}", command.name(), retry_after),
                );
                patois::rate_limited(*retry_after)
            }
            BotError::Backend(e) => {
                self.log.log_error(&format!(
                    "/{} via {} for user={}: {}",
                    command.name(),
                    self.llm.name(),
                    user_id,
                    e
                ));
                patois::backend_failure(e)
            }
            BotError::Persistence(detail) => {
                self.log
                    .log_error(&format!("/{} for user={}: {}", command.name(), user_id, detail));
                patois::SAVE_FAILED.to_string()
            }
        };

        if err.is_private() {
            Reply::private(text)
        } else {
            Reply::public(text)
        }
    }
}

/// Splits `text` into ordered chunks of at most `max_chars` characters.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
