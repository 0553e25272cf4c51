use crate::rate_limiter::RateLimitConfig;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub enum LlmBackendConfig {
    Ollama {
        endpoint: String,
        model: String,
    },
    Gemini {
        endpoint: String,
        api_key: String,
        model: String,
    },
    OpenRouter {
        endpoint: String,
        api_key: String,
        model: String,
    },
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackendConfig,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub discord_guild_id: Option<u64>,
    pub command_prefix: String,
    pub dictionary_file: PathBuf,
    pub admins_file: PathBuf,
    pub command_log_file: PathBuf,
    pub llm: LlmConfig,
    pub rate_limit: RateLimitConfig,
    /// Zero disables the periodic rate-limit sweep.
    pub rate_limit_sweep: Duration,
}

impl Config {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let discord_token = var("DISCORD_TOKEN").ok_or("DISCORD_TOKEN must be set")?;
        let discord_guild_id = var("DISCORD_GUILD_ID")
            .map(|id| parse::<u64>("DISCORD_GUILD_ID", &id))
            .transpose()?;

        let command_prefix = or("COMMAND_PREFIX", "*");

        let backend = match or("LLM_BACKEND", "ollama").to_lowercase().as_str() {
            "ollama" => LlmBackendConfig::Ollama {
                endpoint: or("OLLAMA_ENDPOINT", "http://localhost:11434"),
                model: or("OLLAMA_MODEL", "llama3.2"),
            },
            "gemini" => LlmBackendConfig::Gemini {
                endpoint: or("GEMINI_ENDPOINT", "https://generativelanguage.googleapis.com"),
                api_key: var("GOOGLE_API_KEY")
                    .ok_or("GOOGLE_API_KEY must be set for the gemini backend")?,
                model: or("GEMINI_MODEL", "gemini-2.0-flash"),
            },
            "openrouter" => LlmBackendConfig::OpenRouter {
                endpoint: or(
                    "OPENROUTER_ENDPOINT",
                    "https://openrouter.ai/api/v1/chat/completions",
                ),
                api_key: var("OPENROUTER_API_KEY")
                    .ok_or("OPENROUTER_API_KEY must be set for the openrouter backend")?,
                model: or("OPENROUTER_MODEL", "meta-llama/llama-3.3-70b-instruct"),
            },
            other => return Err(format!("Unknown LLM_BACKEND '{other}'").into()),
        };

        let timeout_secs: u64 = parse("LLM_TIMEOUT_SECS", &or("LLM_TIMEOUT_SECS", "60"))?;
        if timeout_secs == 0 {
            return Err("LLM_TIMEOUT_SECS must be greater than 0".into());
        }

        let max_calls: usize = parse("RATE_LIMIT_MAX_CALLS", &or("RATE_LIMIT_MAX_CALLS", "5"))?;
        if max_calls == 0 {
            return Err("RATE_LIMIT_MAX_CALLS must be greater than 0".into());
        }

        let period_secs: f64 = parse(
            "RATE_LIMIT_PERIOD_SECS",
            &or("RATE_LIMIT_PERIOD_SECS", "60"),
        )?;
        let period = Duration::try_from_secs_f64(period_secs)
            .ok()
            .filter(|p| !p.is_zero())
            .ok_or("RATE_LIMIT_PERIOD_SECS must be a positive number of seconds")?;

        let rate_limit = RateLimitConfig {
            enabled: parse_bool("RATE_LIMIT_ENABLED", &or("RATE_LIMIT_ENABLED", "true"))?,
            max_calls,
            period,
        };

        let sweep_secs: u64 = parse("RATE_LIMIT_SWEEP_SECS", &or("RATE_LIMIT_SWEEP_SECS", "0"))?;

        Ok(Self {
            discord_token,
            discord_guild_id,
            command_prefix,
            dictionary_file: or("DICTIONARY_FILE", "jamaican_dict.json").into(),
            admins_file: or("ADMINS_FILE", "admins.json").into(),
            command_log_file: or("COMMAND_LOG_FILE", "commands.log").into(),
            llm: LlmConfig {
                backend,
                timeout: Duration::from_secs(timeout_secs),
            },
            rate_limit,
            rate_limit_sweep: Duration::from_secs(sweep_secs),
        })
    }
}

fn parse<T>(key: &str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("{key} is invalid ('{raw}'): {e}").into())
}

fn parse_bool(key: &str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("{key} must be a boolean, got '{raw}'").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ConfigResult<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DISCORD_TOKEN", "t")]).unwrap();

        assert_eq!(config.command_prefix, "*");
        assert_eq!(config.dictionary_file, PathBuf::from("jamaican_dict.json"));
        assert_eq!(config.admins_file, PathBuf::from("admins.json"));
        assert_eq!(config.discord_guild_id, None);
        assert_eq!(config.llm.timeout, Duration::from_secs(60));
        assert!(matches!(
            config.llm.backend,
            LlmBackendConfig::Ollama { ref endpoint, .. } if endpoint == "http://localhost:11434"
        ));
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.max_calls, 5);
        assert_eq!(config.rate_limit.period, Duration::from_secs(60));
        assert!(config.rate_limit_sweep.is_zero());
    }

    #[test]
    fn test_token_is_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn test_hosted_backends_need_keys() {
        assert!(load(&[("DISCORD_TOKEN", "t"), ("LLM_BACKEND", "gemini")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "t"), ("LLM_BACKEND", "openrouter")]).is_err());

        let config = load(&[
            ("DISCORD_TOKEN", "t"),
            ("LLM_BACKEND", "Gemini"),
            ("GOOGLE_API_KEY", "g"),
        ])
        .unwrap();
        assert!(matches!(
            config.llm.backend,
            LlmBackendConfig::Gemini { ref api_key, ref model, .. }
                if api_key == "g" && model == "gemini-2.0-flash"
        ));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(load(&[("DISCORD_TOKEN", "t"), ("LLM_BACKEND", "skynet")]).is_err());
    }

    #[test]
    fn test_rate_limit_settings_are_validated() {
        let config = load(&[
            ("DISCORD_TOKEN", "t"),
            ("RATE_LIMIT_ENABLED", "off"),
            ("RATE_LIMIT_MAX_CALLS", "3"),
            ("RATE_LIMIT_PERIOD_SECS", "2.5"),
        ])
        .unwrap();
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.rate_limit.max_calls, 3);
        assert_eq!(config.rate_limit.period, Duration::from_millis(2500));

        assert!(load(&[("DISCORD_TOKEN", "t"), ("RATE_LIMIT_MAX_CALLS", "0")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "t"), ("RATE_LIMIT_PERIOD_SECS", "0")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "t"), ("RATE_LIMIT_PERIOD_SECS", "-1")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "t"), ("RATE_LIMIT_ENABLED", "maybe")]).is_err());
    }

    #[test]
    fn test_guild_id_must_be_numeric() {
        let config = load(&[("DISCORD_TOKEN", "t"), ("DISCORD_GUILD_ID", "123")]).unwrap();
        assert_eq!(config.discord_guild_id, Some(123));
        assert!(load(&[("DISCORD_TOKEN", "t"), ("DISCORD_GUILD_ID", "abc")]).is_err());
    }
}
