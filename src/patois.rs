//! The bot's voice: LLM style prompts and every canned reply.

use crate::llm::LlmError;
use std::time::Duration;

pub const TALK_PROMPT: &str = r#"
AGENT_NAME: Bombocord
THEME: Jamaican yard talk on a Discord server

CORE_DIRECTIVE:
- Always answer in Jamaican Patois, never in standard English.
- Be warm, funny and easy-going, like a bredda from yard.
- Keep it short: a few sentences unless the question truly needs more.

TONE & STYLE:
- Use everyday Patois: "wah gwaan", "mi", "yuh", "dem", "seen", "irie", "likkle", "nuh".
- No hate, no slurs, no pinging whole servers.
"#;

pub const TRANSLATE_PROMPT: &str = "Translate the following text into authentic Jamaican Patois. \
Reply with the translation only: no explanations, no notes, no quotation marks.";

/// Longest slice of an entry shown when staging a confirmation.
const PREVIEW_CHARS: usize = 100;

pub fn preview(value: &str) -> String {
    if value.chars().count() > PREVIEW_CHARS {
        let head: String = value.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}

pub const EMPTY_DICTIONARY: &str = "📝 Di dictionary empty out, boss!";
pub const NO_PERMISSION: &str = "❌ Yuh nuh have nuh permission fi dis, star!";
pub const CONFIRMATION_FAILED: &str = "❌ Somet'ing go wrong, boss!";
pub const CANCELLED: &str = "❌ Aight, mi cancel dat fi yuh.";
pub const SAVE_FAILED: &str = "❌ Mi cyaan write di book right now, boss! Try again lata.";

pub fn added(key: &str) -> String {
    format!("✅ Mi add '{key}' to di book, seen?")
}

pub fn already_exists(key: &str) -> String {
    format!("❌ Dat key '{key}' already deh yah, boss!")
}

pub fn not_found(key: &str) -> String {
    format!("❌ Mi cyaan find `{key}` inna di book, boss!")
}

pub fn removed(key: &str) -> String {
    format!("✅ Mi delete '{key}' from di book, seen?")
}

pub fn updated(key: &str) -> String {
    format!("✅ Mi update '{key}' inna di book, seen?")
}

pub fn confirm_remove(key: &str, current: &str) -> String {
    format!(
        "⚠️ Yuh sure yuh waan delete `{key}`, breda?\n\
         Current ting: {}\n\n\
         Type `yes` fi go through wid it or `no` fi cancel.",
        preview(current)
    )
}

pub fn confirm_update(key: &str, old_value: &str, new_value: &str) -> String {
    format!(
        "⚠️ Yuh sure yuh waan update `{key}`, breda?\n\n\
         **Old ting:** {}\n\
         **New ting:** {}\n\n\
         Type `yes` fi go through wid it or `no` fi cancel.",
        preview(old_value),
        preview(new_value)
    )
}

pub fn rate_limited(retry_after: Duration) -> String {
    // Round up so "0 seconds" is never shown.
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    format!("⏳ Easy nuh, star! Yuh haffi wait {secs}s before yuh try dat again.")
}

pub fn backend_failure(err: &LlmError) -> String {
    match err {
        LlmError::Unreachable => {
            "❌ Mi cyaan reach di AI right now, boss! Try again lata.".to_string()
        }
        LlmError::TimedOut => "❌ Di AI tek too long fi ansa, boss! Try again lata.".to_string(),
        LlmError::BackendError(detail) => {
            format!("❌ Di AI sen back some foolishness: {detail}")
        }
        LlmError::Unexpected(detail) => format!("❌ Somet'ing go wrong wid di AI: {detail}"),
    }
}
