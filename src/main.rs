use bombocord::admins::AdminRegistry;
use bombocord::command_log::CommandLog;
use bombocord::config::Config;
use bombocord::dictionary::DictionaryStore;
use bombocord::rate_limiter::RateLimiter;
use bombocord::service::CommandService;
use bombocord::{discord_bot, llm};
use chrono::Utc;
use dotenv::dotenv;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn StdError + Send + Sync>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let command_log = match CommandLog::open(&config.command_log_file) {
        Ok(log) => log,
        Err(e) => {
            warn!(
                "Cannot open command log {}, logging to stdout only: {}",
                config.command_log_file.display(),
                e
            );
            CommandLog::disabled()
        }
    };

    let llm = llm::from_config(&config.llm)?;
    info!("Using {} backend for /talk and /translate", llm.name());

    let service = Arc::new(CommandService::new(
        DictionaryStore::open(&config.dictionary_file),
        AdminRegistry::open(&config.admins_file),
        llm,
        RateLimiter::new(config.rate_limit),
        command_log,
        config.command_prefix.clone(),
    ));

    if !config.rate_limit_sweep.is_zero() {
        spawn_rate_limit_sweep(Arc::clone(&service), config.rate_limit_sweep);
    }

    info!(
        "Serving '{}' lookups from {}",
        service.prefix(),
        config.dictionary_file.display()
    );
    discord_bot::run(&config.discord_token, config.discord_guild_id, service).await?;

    Ok(())
}

fn spawn_rate_limit_sweep(service: Arc<CommandService>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let dropped = service.limiter().sweep(Utc::now());
            if dropped > 0 {
                debug!("Rate limiter sweep dropped {} idle users", dropped);
            }
        }
    });
}
