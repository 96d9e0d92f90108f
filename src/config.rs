// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup by the
//! embedding service and handed to the core as a [`Settings`] value.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CARD_DATA_DIR` | Directory holding the card store database | `./data` |
//! | `CARD_NUMBER_KEY` | Secret the card-number cipher key is derived from | Required |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Environment variable naming the data directory for the card store.
pub const DATA_DIR_ENV: &str = "CARD_DATA_DIR";

/// Environment variable holding the card-number cipher secret.
///
/// The secret never appears in logs. Rotating it makes every stored
/// ciphertext undecryptable, so rotation requires re-encrypting the card
/// table offline.
pub const CARD_KEY_ENV: &str = "CARD_NUMBER_KEY";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for development.
    #[default]
    Pretty,
    /// Structured JSON lines for log shipping.
    Json,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory the redb database file lives in.
    pub data_dir: PathBuf,
    /// Secret the AES key for card numbers is derived from.
    pub card_number_secret: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// The cipher secret is mandatory: without it stored card numbers cannot
    /// be read, so startup must fail loudly rather than limp along.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let card_number_secret =
            env::var(CARD_KEY_ENV).map_err(|_| ConfigError::MissingVar(CARD_KEY_ENV))?;

        let log_format = match env::var(LOG_FORMAT_ENV).as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            data_dir,
            card_number_secret,
            log_format,
        })
    }

    /// Path of the database file inside the data directory.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("cardledger.redb")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_path_is_under_data_dir() {
        let settings = Settings {
            data_dir: PathBuf::from("/var/lib/cards"),
            card_number_secret: "secret".into(),
            log_format: LogFormat::Pretty,
        };
        assert_eq!(
            settings.store_path(),
            PathBuf::from("/var/lib/cards/cardledger.redb")
        );
    }

    #[test]
    fn default_log_format_is_pretty() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }
}
