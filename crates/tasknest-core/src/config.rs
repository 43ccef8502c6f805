//! Tracker configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Delay before a calendar refresh runs; 0 refreshes synchronously.
    pub reaction_delay_ms: u64,
    /// Deepest reply level accepted by the validator (roots are level 0).
    pub max_reply_depth: usize,
    pub min_comment_length: usize,
    pub min_title_length: usize,
    /// Upper bound for deadlines, in days from today. `None` means unbounded.
    pub max_future_days: Option<u32>,
    /// Characters kept from a description in calendar entries.
    pub calendar_description_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            reaction_delay_ms: 100,
            max_reply_depth: 4,
            min_comment_length: 1,
            min_title_length: 3,
            max_future_days: None,
            calendar_description_limit: 100,
        }
    }
}

impl TrackerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_comment_length == 0 {
            return Err(ConfigError::Invalid {
                field: "min_comment_length",
                reason: "must be at least 1".into(),
            });
        }
        if self.calendar_description_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "calendar_description_limit",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_future_days == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_future_days",
                reason: "use a positive number of days or omit the field".into(),
            });
        }
        Ok(())
    }

    pub fn reaction_delay(&self) -> Option<Duration> {
        match self.reaction_delay_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
