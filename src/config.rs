// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Period of the background refresh for the active owner
    pub refresh_interval: Duration,
    /// Where to keep the on-disk workout mirror (disabled when unset)
    pub local_mirror_path: Option<PathBuf>,
    /// Use in-memory gateways instead of Firestore
    pub offline_mode: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let offline_mode = match env::var("OFFLINE_MODE") {
            Ok(v) => parse_bool("OFFLINE_MODE", &v)?,
            Err(_) => false,
        };

        let gcp_project_id = match env::var("GCP_PROJECT_ID") {
            Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ if offline_mode => "local-dev".to_string(),
            _ => return Err(ConfigError::Missing("GCP_PROJECT_ID")),
        };

        let port = match env::var("PORT") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: v,
            })?,
            Err(_) => 8080,
        };

        let refresh_interval = match env::var("REFRESH_INTERVAL_SECS") {
            Ok(v) => parse_interval(&v)?,
            Err(_) => Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
        };

        Ok(Self {
            gcp_project_id,
            port,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            refresh_interval,
            local_mirror_path: env::var("LOCAL_MIRROR_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            offline_mode,
        })
    }

    /// Config for tests: offline, no mirror.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            local_mirror_path: None,
            offline_mode: true,
        }
    }
}

fn parse_interval(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Invalid {
            name: "REFRESH_INTERVAL_SECS",
            value: value.to_string(),
        }),
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("45").unwrap(), Duration::from_secs(45));
        assert!(matches!(
            parse_interval("0"),
            Err(ConfigError::Invalid {
                name: "REFRESH_INTERVAL_SECS",
                ..
            })
        ));
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("OFFLINE_MODE", "TRUE").unwrap());
        assert!(!parse_bool("OFFLINE_MODE", "0").unwrap());
        assert!(parse_bool("OFFLINE_MODE", "maybe").is_err());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("GCP_PROJECT_ID", "lift-test");
        env::set_var("REFRESH_INTERVAL_SECS", "12");
        env::set_var("LOCAL_MIRROR_PATH", "/tmp/lift-tracker/workouts.json");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.gcp_project_id, "lift-test");
        assert_eq!(config.refresh_interval, Duration::from_secs(12));
        assert_eq!(
            config.local_mirror_path.as_deref(),
            Some(std::path::Path::new("/tmp/lift-tracker/workouts.json"))
        );
    }
}
