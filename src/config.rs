use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::scoring::{MatchThresholds, ThresholdPolicy};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub thresholds: MatchThresholds,
    pub data_dir: PathBuf,
    pub timeout: Duration,
}

impl Config {
    pub fn new(
        api_url: &str,
        policy: ThresholdPolicy,
        data_dir: Option<PathBuf>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            bail!("API URL must start with http:// or https://, got '{}'", api_url);
        }
        if timeout_secs == 0 {
            bail!("Request timeout must be at least one second");
        }

        Ok(Self {
            api_url,
            thresholds: policy.thresholds(),
            data_dir: data_dir.unwrap_or_else(default_data_dir),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("jobtrack.db")
    }
}

fn default_data_dir() -> PathBuf {
    // XDG data directory, or the working directory as a fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_stripped() {
        let config = Config::new("http://api.local:8000/", ThresholdPolicy::Standard, None, 30).unwrap();
        assert_eq!(config.api_url, "http://api.local:8000");
        assert_eq!(config.thresholds, MatchThresholds::STANDARD);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::new("localhost:8000", ThresholdPolicy::Standard, None, 30).is_err());
        assert!(Config::new(DEFAULT_API_URL, ThresholdPolicy::Standard, None, 0).is_err());
    }

    #[test]
    fn test_explicit_data_dir() {
        let config = Config::new(
            DEFAULT_API_URL,
            ThresholdPolicy::Lenient,
            Some(PathBuf::from("/tmp/jt")),
            DEFAULT_TIMEOUT_SECS,
        )
        .unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/jt/jobtrack.db"));
        assert_eq!(config.thresholds.high_floor, 75);
    }
}
