//! Deployment configuration
//!
//! Everything is read from the environment; nothing about the backend is
//! hardcoded in the turn logic.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PORT: u16 = 3002;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_SYSTEM_DIRECTIVE: &str = "Du är ORDNING, en smart svensk AI-assistent som hjälper med produktivitet och organisation.

Din roll:
- Hjälp användaren organisera sitt liv
- Hantera tasks, kalenderhändelser och påminnelser
- Var effektiv, koncis och handlingsorienterad
- Svara på svenska om inte annat anges
- Var vänlig men professionell

När användaren frågar \"hur mår du?\", svara kort och återgå till att hjälpa dem.
Du är här för att göra deras liv enklare, inte filosofera.";

pub const DEFAULT_GREETING_DIRECTIVE: &str =
    "Hälsa användaren välkommen till ORDNING och fråga hur du kan hjälpa dem idag.";

pub const DEFAULT_FALLBACK_REPLY: &str = "Mina tankar verkar vara lite grumliga just nu.";

pub const DEFAULT_GREETING_FALLBACK: &str = "Hej! Hur kan jag hjälpa dig idag?";

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("Unknown backend {0:?} (expected \"relay\" or \"direct\")")]
    UnknownBackend(String),
}

/// Which completion strategy this deployment talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Relay {
        url: String,
    },
    Direct {
        url: String,
        api_key: String,
        model: String,
    },
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Relay { .. } => "relay",
            Backend::Direct { .. } => "direct",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: Backend,
    pub system_directive: String,
    /// Internal request sent for the opening greeting; never shown
    pub greeting_directive: String,
    /// Shown when a user turn fails or its reply carries no text
    pub fallback_reply: String,
    /// Shown when the greeting fails or its reply carries no text
    pub greeting_fallback: String,
    /// Floating-bubble ephemeral view
    pub bubbles: bool,
    pub request_timeout: Duration,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_name = get("ORDNING_BACKEND").unwrap_or_else(|| "relay".to_string());
        let backend = match backend_name.to_lowercase().as_str() {
            "relay" => Backend::Relay {
                url: get("ORDNING_RELAY_URL").ok_or(ConfigError::Missing("ORDNING_RELAY_URL"))?,
            },
            "direct" => Backend::Direct {
                url: get("ORDNING_COMPLETION_URL")
                    .unwrap_or_else(|| DEFAULT_COMPLETION_URL.to_string()),
                api_key: get("ORDNING_API_KEY")
                    .or_else(|| get("OPENAI_API_KEY"))
                    .ok_or(ConfigError::Missing("ORDNING_API_KEY"))?,
                model: get("ORDNING_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
            _ => return Err(ConfigError::UnknownBackend(backend_name)),
        };

        let bubbles = match get("ORDNING_BUBBLES") {
            None => true,
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                var: "ORDNING_BUBBLES",
                value: v,
            })?,
        };

        let timeout_secs = parse_or(
            "ORDNING_REQUEST_TIMEOUT_SECS",
            get("ORDNING_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let port = parse_or("ORDNING_PORT", get("ORDNING_PORT"), DEFAULT_PORT)?;

        Ok(Self {
            backend,
            system_directive: get("ORDNING_SYSTEM_DIRECTIVE")
                .unwrap_or_else(|| DEFAULT_SYSTEM_DIRECTIVE.to_string()),
            greeting_directive: get("ORDNING_GREETING_DIRECTIVE")
                .unwrap_or_else(|| DEFAULT_GREETING_DIRECTIVE.to_string()),
            fallback_reply: get("ORDNING_FALLBACK_REPLY")
                .unwrap_or_else(|| DEFAULT_FALLBACK_REPLY.to_string()),
            greeting_fallback: get("ORDNING_GREETING_FALLBACK")
                .unwrap_or_else(|| DEFAULT_GREETING_FALLBACK.to_string()),
            bubbles,
            request_timeout: Duration::from_secs(timeout_secs),
            port,
        })
    }

    /// Defaults around an explicit backend
    #[cfg(test)]
    pub fn for_tests(backend: Backend) -> Self {
        Self {
            backend,
            system_directive: DEFAULT_SYSTEM_DIRECTIVE.to_string(),
            greeting_directive: DEFAULT_GREETING_DIRECTIVE.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            greeting_fallback: DEFAULT_GREETING_FALLBACK.to_string(),
            bubbles: true,
            request_timeout: Duration::from_secs(5),
            port: 0,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: v }),
    }
}
