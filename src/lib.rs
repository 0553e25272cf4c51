pub mod admins;
pub mod command_log;
pub mod config;
pub mod confirmation;
pub mod dictionary;
pub mod discord_bot;
pub mod error;
pub mod llm;
pub mod models;
pub mod patois;
pub mod rate_limiter;
pub mod security;
pub mod service;
pub mod storage;
