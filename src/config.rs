use serenity::all::{GuildId, RoleId};
use std::{env, num::NonZeroU64, str::FromStr};

use crate::error::{AppError, ConfigError};

const DEFAULT_REPO: &str = "CuriousWonder1/Discord-bot";
const DEFAULT_PATH: &str = "events.json";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub guild_id: GuildId,
    pub staff_role_ids: Vec<RoleId>,
    pub participant_role_id: RoleId,
    pub announce_role_id: RoleId,
    pub store: StoreConfig,
    pub port: u16,
}

/// Location of the events document in the hosted repository.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Without a token every store operation is a logged no-op.
    pub token: Option<String>,
    pub api_url: String,
    /// `owner/name` of the repository.
    pub repo: String,
    pub path: String,
    pub branch: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            discord_token: required("DISCORD_TOKEN")?,
            guild_id: parse_id("GUILD_ID")?,
            staff_role_ids: parse_role_ids("STAFF_ROLE_IDS", &required("STAFF_ROLE_IDS")?)?,
            participant_role_id: parse_id("PARTICIPANT_ROLE_ID")?,
            announce_role_id: parse_id("ANNOUNCE_ROLE_ID")?,
            store: StoreConfig {
                token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
                api_url: optional("GITHUB_API_URL", DEFAULT_API_URL),
                repo: optional("EVENTS_REPO", DEFAULT_REPO),
                path: optional("EVENTS_PATH", DEFAULT_PATH),
                branch: optional("EVENTS_BRANCH", DEFAULT_BRANCH),
            },
            port: env::var("PORT")
                .ok()
                .map(|p| parse("PORT", &p))
                .transpose()?
                .unwrap_or(DEFAULT_PORT),
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Discord ids are never zero.
fn parse_id<T: From<NonZeroU64>>(name: &str) -> Result<T, ConfigError> {
    parse::<NonZeroU64>(name, &required(name)?).map(T::from)
}

fn parse_role_ids(name: &str, value: &str) -> Result<Vec<RoleId>, ConfigError> {
    value
        .split(',')
        .filter(|id| !id.trim().is_empty())
        .map(|id| parse::<NonZeroU64>(name, id).map(RoleId::from))
        .collect()
}
