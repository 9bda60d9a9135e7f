use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// Default user agent presented to the watched stores.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:84.0) Gecko/20100101 Firefox/84.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub poller: PollerConfig,
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub admin_chat_id: String,
    pub group_chat_id: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Lower bound of the success-path jitter, in seconds.
    pub jitter_min_secs: u64,
    /// Upper bound of the success-path jitter, in seconds.
    pub jitter_max_secs: u64,
    /// Fixed backoff applied after a non-200 response, in seconds.
    pub penalty_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Interval between "still waiting" summaries to the group.
    pub reminder_interval_secs: u64,
    /// Interval between health snapshots sent to the admin.
    pub health_interval_secs: u64,
}

impl AppConfig {
    /// Build the configuration from the environment. The Telegram credentials
    /// are required and missing values fail startup; tunables default in code
    /// and can be overridden with `SENTINEL_`-prefixed variables
    /// (e.g. `SENTINEL__POLLER__JITTER_MIN_SECS=30`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("telegram.api_base", "https://api.telegram.org")?
            .set_default("poller.jitter_min_secs", 5_i64)?
            .set_default("poller.jitter_max_secs", 20_i64)?
            .set_default("poller.penalty_secs", 3600_i64)?
            .set_default("poller.request_timeout_secs", 30_i64)?
            .set_default("poller.user_agent", DEFAULT_USER_AGENT)?
            .set_default("reporting.reminder_interval_secs", 86_400_i64)?
            .set_default("reporting.health_interval_secs", 300_i64)?
            .add_source(
                Environment::with_prefix("SENTINEL")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override("telegram.bot_token", require_env("TELEGRAM_BOT_TOKEN")?)?
            .set_override("telegram.admin_chat_id", require_env("ADMIN_CHAT_ID")?)?
            .set_override("telegram.group_chat_id", require_env("GROUP_CHAT_ID")?)?
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.is_empty() {
            return Err(ConfigError::Message("Telegram bot_token must not be empty".into()));
        }

        if self.telegram.admin_chat_id.is_empty() {
            return Err(ConfigError::Message("Telegram admin_chat_id must not be empty".into()));
        }

        if self.telegram.group_chat_id.is_empty() {
            return Err(ConfigError::Message("Telegram group_chat_id must not be empty".into()));
        }

        if Url::parse(&self.telegram.api_base).is_err() {
            return Err(ConfigError::Message("Invalid Telegram api_base URL".into()));
        }

        if self.poller.jitter_min_secs == 0 {
            return Err(ConfigError::Message("jitter_min_secs must be greater than 0".into()));
        }

        if self.poller.jitter_max_secs < self.poller.jitter_min_secs {
            return Err(ConfigError::Message(
                "jitter_max_secs cannot be less than jitter_min_secs".into(),
            ));
        }

        if self.poller.penalty_secs == 0 {
            return Err(ConfigError::Message("penalty_secs must be greater than 0".into()));
        }

        if self.poller.request_timeout_secs == 0 {
            return Err(ConfigError::Message("request_timeout_secs must be greater than 0".into()));
        }

        if self.poller.user_agent.is_empty() {
            return Err(ConfigError::Message("user_agent must not be empty".into()));
        }

        if self.reporting.reminder_interval_secs == 0 {
            return Err(ConfigError::Message("reminder_interval_secs must be greater than 0".into()));
        }

        if self.reporting.health_interval_secs == 0 {
            return Err(ConfigError::Message("health_interval_secs must be greater than 0".into()));
        }

        Ok(())
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .map_err(|_| ConfigError::Message(format!("FATAL! {} not present in environment", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            telegram: TelegramConfig {
                bot_token: "123456:test-token".to_string(),
                admin_chat_id: "111".to_string(),
                group_chat_id: "-100222".to_string(),
                api_base: "https://api.telegram.org".to_string(),
            },
            poller: PollerConfig {
                jitter_min_secs: 5,
                jitter_max_secs: 20,
                penalty_secs: 3600,
                request_timeout_secs: 30,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            reporting: ReportingConfig {
                reminder_interval_secs: 86_400,
                health_interval_secs: 300,
            },
        }
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_token() {
        let mut config = valid_config();
        config.telegram.bot_token = String::new();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("bot_token"));
    }

    #[test]
    fn test_config_validation_empty_chat_ids() {
        let mut config = valid_config();
        config.telegram.admin_chat_id = String::new();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.telegram.group_chat_id = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_api_base() {
        let mut config = valid_config();
        config.telegram.api_base = "not-a-valid-url".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("api_base"));
    }

    #[test]
    fn test_config_validation_inverted_jitter_range() {
        let mut config = valid_config();
        config.poller.jitter_min_secs = 45;
        config.poller.jitter_max_secs = 30;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("jitter_max_secs cannot be less than jitter_min_secs"));
    }

    #[test]
    fn test_config_validation_zero_delays() {
        let mut config = valid_config();
        config.poller.jitter_min_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.poller.penalty_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.reporting.health_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_require_env_missing() {
        let result = require_env("RESTOCK_SENTINEL_TEST_UNSET_VARIABLE");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not present"));
    }

    #[test]
    fn test_require_env_present() {
        std::env::set_var("RESTOCK_SENTINEL_TEST_SET_VARIABLE", "value");
        let result = require_env("RESTOCK_SENTINEL_TEST_SET_VARIABLE");
        assert_eq!(result.unwrap(), "value");
        std::env::remove_var("RESTOCK_SENTINEL_TEST_SET_VARIABLE");
    }
}
