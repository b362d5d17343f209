use std::{fs::File, io::BufReader, path::Path, time::Duration};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize, de};
use url::Url;

use crate::models::RunStatus;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const API_URL_ENV: &str = "GITHUB_API_URL";
pub const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

/// Upper bound for poll interval and timeout, in seconds (one day).
pub const MAX_POLL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub poll: PollConfig,
    /// `owner/name` or a repository URL.
    #[serde(default)]
    pub repo: Option<String>,
    /// Accepts the same spellings as the command line (`in_progress`, `in-progress`).
    #[serde(default, deserialize_with = "deserialize_statuses")]
    pub statuses: Vec<RunStatus>,
}

fn deserialize_statuses<'de, D>(deserializer: D) -> Result<Vec<RunStatus>, D::Error>
where D: Deserializer<'de> {
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|s| {
            s.parse::<RunStatus>()
                .map_err(|_| de::Error::custom(format!("unrecognized run status '{s}'")))
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: Url,
    #[serde(default, skip_serializing)]
    pub token: String,
}

impl Default for GitHubConfig {
    fn default() -> Self { Self { api_url: default_api_url(), token: String::new() } }
}

fn default_api_url() -> Url {
    Url::parse("https://api.github.com").expect("static URL is valid")
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: default_interval_secs(), timeout_secs: default_timeout_secs() }
    }
}

fn default_interval_secs() -> u64 { 5 }

fn default_timeout_secs() -> u64 { 60 }

impl PollConfig {
    pub fn interval(&self) -> Duration { Duration::from_secs(self.interval_secs) }

    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

impl Config {
    /// Load from a YAML file, or start from defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let file = BufReader::new(
            File::open(path)
                .with_context(|| format!("Failed to open config file {}", path.display()))?,
        );
        let config: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Fill in values from the environment. The token is required.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where F: Fn(&str) -> Option<String> {
        let token = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty());
        let Some(token) = token else {
            bail!("{TOKEN_ENV} must be set to a token with actions:write access");
        };
        self.github.token = token.trim().to_string();
        if let Some(api_url) = lookup(API_URL_ENV).filter(|v| !v.is_empty()) {
            self.github.api_url = Url::parse(&api_url)
                .with_context(|| format!("Invalid {API_URL_ENV} '{api_url}'"))?;
        }
        if self.repo.is_none() {
            self.repo = lookup(REPOSITORY_ENV).filter(|v| !v.is_empty());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll.interval_secs == 0 {
            bail!("Poll interval must be at least one second");
        }
        if self.poll.interval_secs > MAX_POLL_SECS || self.poll.timeout_secs > MAX_POLL_SECS {
            bail!("Poll interval and timeout must be at most {MAX_POLL_SECS} seconds");
        }
        if self.statuses.contains(&RunStatus::Unknown) {
            bail!("Unrecognized run status in config");
        }
        Ok(())
    }

    /// Configured statuses, or the default set when empty.
    pub fn statuses(&self) -> Vec<RunStatus> {
        if self.statuses.is_empty() {
            RunStatus::defaults().to_vec()
        } else {
            let mut out = Vec::with_capacity(self.statuses.len());
            for status in &self.statuses {
                if !out.contains(status) {
                    out.push(*status);
                }
            }
            out
        }
    }
}
