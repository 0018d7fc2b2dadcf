use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use url::Url;

pub const DEFAULT_CLIPDROP_API_URL: &str = "https://clipdrop-api.co/text-to-image/v1";
pub const DEFAULT_DEMO_IMAGE_BASE: &str = "https://source.unsplash.com";
pub const PLACEHOLDER_API_KEY: &str = "your_clipdrop_api_key_here";
pub const DEFAULT_DATA_DIR: &str = ".artloom";

const API_KEY_VARS: &[&str] = &["CLIPDROP_API_KEY", "VITE_CLIPDROP_API_KEY"];

/// Random wait range for the demo path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoDelay {
    pub min: Duration,
    pub max: Duration,
}

impl Default for DemoDelay {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(2000),
            max: Duration::from_millis(4000),
        }
    }
}

impl DemoDelay {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Accepts `"1500"` or `"2000-4000"` (milliseconds).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (low, high) = match raw.split_once('-') {
            Some((low, high)) => (low.trim(), high.trim()),
            None => (raw, raw),
        };
        let low = low.parse::<u64>().ok()?;
        let high = high.parse::<u64>().ok()?;
        Some(Self {
            min: Duration::from_millis(low.min(high)),
            max: Duration::from_millis(low.max(high)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Missing,
    Placeholder,
    Usable,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub demo_image_base: String,
    pub demo_delay: DemoDelay,
    pub data_dir: PathBuf,
    pub warnings: Vec<String>,
}

impl EngineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_CLIPDROP_API_URL.to_string(),
            demo_image_base: DEFAULT_DEMO_IMAGE_BASE.to_string(),
            demo_delay: DemoDelay::default(),
            data_dir: data_dir.into(),
            warnings: Vec::new(),
        }
    }

    /// Reads the environment. `data_dir` wins over `ARTLOOM_HOME`.
    pub fn from_env(data_dir: Option<PathBuf>) -> Self {
        let data_dir = data_dir
            .or_else(|| non_empty_env("ARTLOOM_HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let mut config = Self::new(data_dir);

        config.api_key = API_KEY_VARS.iter().find_map(|key| non_empty_env(key));

        if let Some(raw) = non_empty_env("CLIPDROP_API_URL") {
            match Url::parse(&raw) {
                Ok(_) => config = config.with_api_url(raw),
                Err(err) => config
                    .warnings
                    .push(format!("CLIPDROP_API_URL ignored ({err}): {raw}")),
            }
        }
        if let Some(raw) = non_empty_env("ARTLOOM_DEMO_IMAGE_BASE") {
            match Url::parse(&raw) {
                Ok(_) => config = config.with_demo_image_base(raw),
                Err(err) => config
                    .warnings
                    .push(format!("ARTLOOM_DEMO_IMAGE_BASE ignored ({err}): {raw}")),
            }
        }
        if let Some(raw) = non_empty_env("ARTLOOM_DEMO_DELAY_MS") {
            match DemoDelay::parse(&raw) {
                Some(delay) => config.demo_delay = delay,
                None => config
                    .warnings
                    .push(format!("ARTLOOM_DEMO_DELAY_MS ignored: {raw}")),
            }
        }
        config
    }

    pub fn with_api_key(mut self, api_key: Option<&str>) -> Self {
        self.api_key = api_key.map(str::to_string);
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_demo_image_base(mut self, base: impl Into<String>) -> Self {
        self.demo_image_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_demo_delay(mut self, delay: DemoDelay) -> Self {
        self.demo_delay = delay;
        self
    }

    pub fn credential_status(&self) -> CredentialStatus {
        match self.api_key.as_deref().map(str::trim) {
            None | Some("") => CredentialStatus::Missing,
            Some(PLACEHOLDER_API_KEY) => CredentialStatus::Placeholder,
            Some(_) => CredentialStatus::Usable,
        }
    }

    pub fn is_demo_mode(&self) -> bool {
        self.credential_status() != CredentialStatus::Usable
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join("events.jsonl")
    }
}

/// Loads `path` (or `./.env` when `None`) into the process environment.
/// A missing file is not an error; returns whether a file was read.
pub fn load_env_file(path: Option<&Path>) -> Result<bool> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|_| true),
        None => dotenvy::dotenv().map(|_| true),
    };
    match loaded {
        Ok(found) => Ok(found),
        Err(dotenvy::Error::Io(_)) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{load_env_file, CredentialStatus, DemoDelay, EngineConfig, PLACEHOLDER_API_KEY};

    #[test]
    fn credential_status_classifies_keys() {
        let config = EngineConfig::new("data");
        assert_eq!(config.credential_status(), CredentialStatus::Missing);
        assert!(config.is_demo_mode());

        let config = config.with_api_key(Some("  "));
        assert_eq!(config.credential_status(), CredentialStatus::Missing);

        let config = config.with_api_key(Some(PLACEHOLDER_API_KEY));
        assert_eq!(config.credential_status(), CredentialStatus::Placeholder);
        assert!(config.is_demo_mode());

        let config = config.with_api_key(Some("sk-live"));
        assert_eq!(config.credential_status(), CredentialStatus::Usable);
        assert!(!config.is_demo_mode());
    }

    #[test]
    fn demo_delay_parses_single_value_and_range() {
        assert_eq!(
            DemoDelay::parse("1500"),
            Some(DemoDelay {
                min: Duration::from_millis(1500),
                max: Duration::from_millis(1500),
            })
        );
        assert_eq!(
            DemoDelay::parse(" 4000 - 2000 "),
            Some(DemoDelay {
                min: Duration::from_millis(2000),
                max: Duration::from_millis(4000),
            })
        );
        assert_eq!(DemoDelay::parse("soon"), None);
        assert_eq!(DemoDelay::default().min, Duration::from_millis(2000));
        assert_eq!(DemoDelay::default().max, Duration::from_millis(4000));
    }

    #[test]
    fn paths_live_under_data_dir() {
        let config = EngineConfig::new("/tmp/artloom");
        assert_eq!(config.images_dir(), std::path::Path::new("/tmp/artloom/images"));
        assert_eq!(
            config.events_path(),
            std::path::Path::new("/tmp/artloom/events.jsonl")
        );
    }

    #[test]
    fn demo_base_trailing_slash_is_trimmed() {
        let config = EngineConfig::new("d").with_demo_image_base("http://127.0.0.1:9/");
        assert_eq!(config.demo_image_base, "http://127.0.0.1:9");
    }

    #[test]
    fn missing_env_file_is_not_an_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        assert!(!load_env_file(Some(&temp.path().join("absent.env")))?);
        Ok(())
    }
}
