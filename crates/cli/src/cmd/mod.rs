pub mod cancel;
pub mod list;

use std::path::Path;

use anyhow::{Context, Result};
use runsweep_core::{config::Config, models::RunStatus};
use runsweep_github::{RunFilter, repo::RepoRef};
use typed_path::Utf8NativePathBuf;

/// Options shared by every subcommand that targets a repository.
pub struct Target<'a> {
    pub config: Option<&'a Utf8NativePathBuf>,
    pub repo: Option<&'a RepoRef>,
    pub statuses: &'a [RunStatus],
    pub branch: Option<&'a str>,
    pub event: Option<&'a str>,
    pub workflow: Option<&'a str>,
    pub poll_interval: Option<u64>,
    pub poll_timeout: Option<u64>,
}

pub struct Resolved {
    pub config: Config,
    pub repo: RepoRef,
    pub statuses: Vec<RunStatus>,
    pub filter: RunFilter,
}

impl Target<'_> {
    /// Merge the config file, the environment and command-line flags. Flags
    /// win; `GITHUB_REPOSITORY` only fills a repository the file leaves unset.
    pub fn resolve<F>(&self, lookup: F) -> Result<Resolved>
    where F: Fn(&str) -> Option<String> {
        let config = Config::load(self.config.map(|p| Path::new(p.as_str())))?;
        self.merge(config, lookup)
    }

    fn merge<F>(&self, mut config: Config, lookup: F) -> Result<Resolved>
    where F: Fn(&str) -> Option<String> {
        config.apply_env(lookup)?;
        if !self.statuses.is_empty() {
            config.statuses = self.statuses.to_vec();
        }
        if let Some(secs) = self.poll_interval {
            config.poll.interval_secs = secs;
        }
        if let Some(secs) = self.poll_timeout {
            config.poll.timeout_secs = secs;
        }
        let repo = match self.repo {
            Some(repo) => repo.clone(),
            None => config
                .repo
                .as_deref()
                .context("No repository given; pass --repo or set GITHUB_REPOSITORY")?
                .parse()?,
        };
        let filter = RunFilter {
            branch: self.branch.map(str::to_string),
            event: self.event.map(str::to_string),
            workflow: self.workflow.map(str::to_string),
        };
        filter.validate()?;
        config.validate()?;
        let statuses = config.statuses();
        Ok(Resolved { config, repo, statuses, filter })
    }
}
