use std::{fmt, str::FromStr, sync::OnceLock};

use anyhow::{Error, Result, anyhow};
use regex::Regex;

/// A repository on the code-hosting platform, identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self { owner: owner.into(), name: name.into() }
    }

    /// API path prefix, e.g. `/repos/octo-org/octo-repo`.
    pub fn api_path(&self) -> String { format!("/repos/{}/{}", self.owner, self.name) }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (owner, name) = match extract_github_url(s) {
            Some(parts) => parts,
            None => {
                static REGEX: OnceLock<Regex> = OnceLock::new();
                let caps = REGEX
                    .get_or_init(|| {
                        Regex::new(r"^(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?$").unwrap()
                    })
                    .captures(s)
                    .ok_or_else(|| invalid(s))?;
                let owner = caps.name("owner").map(|m| m.as_str()).unwrap_or_default();
                let repo = caps.name("repo").map(|m| m.as_str()).unwrap_or_default();
                (owner, repo)
            }
        };
        if !is_valid_name(owner) || !is_valid_name(name) {
            return Err(invalid(s));
        }
        Ok(Self::new(owner, name))
    }
}

fn invalid(s: &str) -> Error { anyhow!("Invalid repository '{s}', expected owner/name or a URL") }

/// Owner and repository names are limited to ASCII alphanumerics, `-`, `_` and `.`.
fn is_valid_name(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

pub fn extract_github_url(url: &str) -> Option<(&str, &str)> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let caps = REGEX
        .get_or_init(|| {
            Regex::new(
                r"^https?://github\.com/(?P<owner>[^/?#]+)/(?P<repo>[^/?#]+?)(?:\.git)?(?:[/?#]|$)",
            )
            .unwrap()
        })
        .captures(url)?;
    let owner = caps.name("owner").map(|m| m.as_str()).unwrap_or_default();
    let repo = caps.name("repo").map(|m| m.as_str()).unwrap_or_default();
    Some((owner, repo))
}
