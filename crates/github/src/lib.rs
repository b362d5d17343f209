pub mod poll;
pub mod repo;
pub mod sweep;

use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use http::{HeaderName, StatusCode};
use octocrab::{GitHubError, Octocrab};
use runsweep_core::{
    config::GitHubConfig,
    models::{RunList, RunRecord, RunStatus},
};
use serde::Serialize;

use crate::repo::RepoRef;

/// Largest page size the list endpoints accept.
pub const PER_PAGE: u8 = 100;

const API_VERSION: &str = "2022-11-28";

/// Narrowing applied when listing runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub branch: Option<String>,
    pub event: Option<String>,
    /// Workflow file name (`ci.yml`) or numeric workflow ID.
    pub workflow: Option<String>,
}

impl RunFilter {
    pub fn validate(&self) -> Result<()> {
        if let Some(workflow) = &self.workflow {
            let workflow = workflow.strip_prefix(".github/workflows/").unwrap_or(workflow);
            if workflow.is_empty() || workflow.contains('/') {
                bail!("Invalid workflow '{workflow}', expected a file name or ID");
            }
        }
        Ok(())
    }

    fn workflow(&self) -> Option<&str> {
        self.workflow.as_deref().map(|w| w.strip_prefix(".github/workflows/").unwrap_or(w))
    }
}

/// The subset of the Actions REST API needed to sweep runs.
#[allow(async_fn_in_trait)]
pub trait RunsApi {
    /// One page (1-based) of runs in `status`.
    async fn list_runs(
        &self,
        repo: &RepoRef,
        filter: &RunFilter,
        status: RunStatus,
        page: u32,
    ) -> Result<RunList>;

    /// Fetch a single run. `None` if it no longer exists.
    async fn get_run(&self, repo: &RepoRef, run_id: u64) -> Result<Option<RunRecord>>;

    /// Request cancellation. 202 when accepted, 409 when the run can't be cancelled.
    async fn cancel_run(&self, repo: &RepoRef, run_id: u64) -> Result<StatusCode>;

    /// Delete the run and its logs. 204 when deleted.
    async fn delete_run(&self, repo: &RepoRef, run_id: u64) -> Result<StatusCode>;
}

#[derive(Clone)]
pub struct GitHub {
    pub client: Octocrab,
}

#[derive(Serialize)]
struct ListParams<'a> {
    status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<&'a str>,
    per_page: u8,
    page: u32,
}

impl GitHub {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let client = Octocrab::builder()
            .base_uri(config.api_url.as_str())
            .context("Invalid GitHub API URL")?
            .personal_token(config.token.clone())
            .add_header(HeaderName::from_static("x-github-api-version"), API_VERSION.to_string())
            .build()
            .context("Failed to create GitHub client")?;
        tracing::debug!("Using GitHub API at {}", config.api_url);
        Ok(Self { client })
    }
}

impl RunsApi for GitHub {
    async fn list_runs(
        &self,
        repo: &RepoRef,
        filter: &RunFilter,
        status: RunStatus,
        page: u32,
    ) -> Result<RunList> {
        let route = match filter.workflow() {
            Some(workflow) => format!("{}/actions/workflows/{}/runs", repo.api_path(), workflow),
            None => format!("{}/actions/runs", repo.api_path()),
        };
        let params = ListParams {
            status,
            branch: filter.branch.as_deref(),
            event: filter.event.as_deref(),
            per_page: PER_PAGE,
            page,
        };
        self.client
            .get(route, Some(&params))
            .await
            .with_context(|| format!("Failed to list {status} runs for {repo} (page {page})"))
    }

    async fn get_run(&self, repo: &RepoRef, run_id: u64) -> Result<Option<RunRecord>> {
        let route = format!("{}/actions/runs/{}", repo.api_path(), run_id);
        match self.client.get::<RunRecord, _, ()>(route, None).await {
            Ok(run) => Ok(Some(run)),
            Err(octocrab::Error::GitHub { source, .. })
                if matches!(*source, GitHubError { status_code: StatusCode::NOT_FOUND, .. }) =>
            {
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to fetch run {run_id}")),
        }
    }

    async fn cancel_run(&self, repo: &RepoRef, run_id: u64) -> Result<StatusCode> {
        let route = format!("{}/actions/runs/{}/cancel", repo.api_path(), run_id);
        let response = self
            .client
            ._post(route, None::<&()>)
            .await
            .with_context(|| format!("Failed to send cancel request for run {run_id}"))?;
        Ok(response.status())
    }

    async fn delete_run(&self, repo: &RepoRef, run_id: u64) -> Result<StatusCode> {
        let route = format!("{}/actions/runs/{}", repo.api_path(), run_id);
        let response = self
            .client
            ._delete(route, None::<&()>)
            .await
            .with_context(|| format!("Failed to send delete request for run {run_id}"))?;
        Ok(response.status())
    }
}

/// List runs in each of `statuses`, following pagination.
///
/// Runs are deduplicated by ID, since a run may move between statuses while
/// the pages are fetched, and kept in first-seen order. Stops early once
/// `limit` runs have been collected.
pub async fn collect_runs<A: RunsApi>(
    api: &A,
    repo: &RepoRef,
    statuses: &[RunStatus],
    filter: &RunFilter,
    limit: Option<usize>,
) -> Result<Vec<RunRecord>> {
    let mut seen = HashSet::new();
    let mut runs = Vec::new();
    if limit == Some(0) {
        return Ok(runs);
    }
    'outer: for &status in statuses {
        let mut page = 1u32;
        loop {
            let list = api.list_runs(repo, filter, status, page).await?;
            let count = list.workflow_runs.len();
            tracing::debug!("Fetched {} {} runs (page {})", count, status, page);
            for run in list.workflow_runs {
                if !seen.insert(run.id) {
                    continue;
                }
                runs.push(run);
                if limit.is_some_and(|limit| runs.len() >= limit) {
                    break 'outer;
                }
            }
            if count < PER_PAGE as usize {
                break;
            }
            page += 1;
        }
    }
    tracing::info!("Found {} runs in {}", runs.len(), repo);
    Ok(runs)
}
