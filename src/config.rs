use std::fmt;
use std::path::PathBuf;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required environment variable is not set.
    MissingVar(&'static str),
    /// A variable is set but its value is invalid.
    InvalidVar { name: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(name) => {
                write!(f, "required environment variable {name} is not set")
            }
            Self::InvalidVar { name, reason } => {
                write!(f, "invalid value for {name}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TEMPERATURE: f32 = 0.7;

pub struct Config {
    pub telegram_bot_token: String,
    pub openai_api_key: String,
    /// Completion model identifier.
    pub model: String,
    /// Sampling temperature; `None` defers to the API default.
    pub temperature: Option<f32>,
    /// Rewrite `**`/`__` emphasis to the single-delimiter dialect before replying.
    pub soften_markdown: bool,
    /// Directory for the log file; stdout-only logging when unset.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build config from an arbitrary variable source. Tests inject a map
    /// here instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_bot_token =
            lookup("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::MissingVar("TELEGRAM_BOT_TOKEN"))?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2
            || token_parts[0].parse::<u64>().is_err()
            || token_parts[1].is_empty()
        {
            return Err(ConfigError::InvalidVar {
                name: "TELEGRAM_BOT_TOKEN",
                reason: "expected format: 123456789:ABCdefGHI...".to_string(),
            });
        }

        let openai_api_key =
            lookup("OPENAI_API_KEY").ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;
        if openai_api_key.trim().is_empty() {
            return Err(ConfigError::InvalidVar {
                name: "OPENAI_API_KEY",
                reason: "must not be empty".to_string(),
            });
        }

        let model = lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        // Unset means our default; an empty value opts into the API default.
        let temperature = match lookup("OPENAI_TEMPERATURE") {
            None => Some(DEFAULT_TEMPERATURE),
            Some(v) if v.trim().is_empty() => None,
            Some(v) => {
                let t: f32 = v.trim().parse().map_err(|_| ConfigError::InvalidVar {
                    name: "OPENAI_TEMPERATURE",
                    reason: format!("not a number: '{v}'"),
                })?;
                if !(0.0..=2.0).contains(&t) {
                    return Err(ConfigError::InvalidVar {
                        name: "OPENAI_TEMPERATURE",
                        reason: format!("{t} is outside 0.0..=2.0"),
                    });
                }
                Some(t)
            }
        };

        let soften_markdown = match lookup("SOFTEN_MARKDOWN") {
            None => true,
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::InvalidVar {
                        name: "SOFTEN_MARKDOWN",
                        reason: format!("expected true/false, got '{other}'"),
                    });
                }
            },
        };

        let log_dir = lookup("LOG_DIR").map(PathBuf::from);

        Ok(Self {
            telegram_bot_token,
            openai_api_key,
            model,
            temperature,
            soften_markdown,
            log_dir,
        })
    }
}
