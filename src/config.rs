use crate::remote::{DEFAULT_TIMEOUT, WriteEncoding};
use std::{env, time::Duration};
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Web-app URL of the spreadsheet macro. Unset means results stay empty.
    pub endpoint: Option<String>,
    pub timeout: Duration,
    pub write_encoding: WriteEncoding,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match value("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|err| ConfigError {
                key: "PORT",
                reason: err.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let endpoint = value("SURVEY_ENDPOINT").map(|raw| raw.trim().to_string());
        if let Some(url) = &endpoint {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError {
                    key: "SURVEY_ENDPOINT",
                    reason: format!("'{url}' is not an http(s) URL"),
                });
            }
        }

        let timeout = match value("SURVEY_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError {
                        key: "SURVEY_TIMEOUT_SECS",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Err(err) => {
                    return Err(ConfigError {
                        key: "SURVEY_TIMEOUT_SECS",
                        reason: err.to_string(),
                    });
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        let write_encoding = match value("SURVEY_WRITE_ENCODING") {
            Some(raw) => raw.parse::<WriteEncoding>().map_err(|reason| ConfigError {
                key: "SURVEY_WRITE_ENCODING",
                reason,
            })?,
            None => WriteEncoding::default(),
        };

        Ok(Self {
            port,
            endpoint,
            timeout,
            write_encoding,
        })
    }
}
