use std::{cell::Cell, fmt, time::Duration};

use anyhow::{Context, Result};
use http::StatusCode;
use runsweep_core::models::{Disposition, RunRecord, RunStatus};

use crate::{RunsApi, poll::poll_until, repo::RepoRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    /// Report what would happen without sending cancel or delete requests.
    pub dry_run: bool,
    /// Delete runs that refuse cancellation or never become cancelable.
    pub force_delete: bool,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Cancel,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cancel => "cancel",
            Self::Delete => "delete",
        })
    }
}

/// What happened to a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    WouldCancel,
    WouldPoll,
    Skipped(RunStatus),
    /// Finished or disappeared while waiting for it to become cancelable.
    Finished,
    Cancelled,
    /// Cancellation was refused (409) and deletion was not requested.
    Conflict,
    Deleted,
    /// Still transitional when the poll ceiling passed.
    TimedOut(RunStatus),
    Failed { action: Action, status: StatusCode },
    Errored(String),
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Conflict | Self::TimedOut(_) | Self::Failed { .. } | Self::Errored(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WouldCancel => f.write_str("would cancel"),
            Self::WouldPoll => f.write_str("would poll, then cancel"),
            Self::Skipped(status) => write!(f, "skipped ({status})"),
            Self::Finished => f.write_str("finished before it could be cancelled"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Conflict => f.write_str("cannot be cancelled (409)"),
            Self::Deleted => f.write_str("deleted"),
            Self::TimedOut(status) => write!(f, "still {status} after polling"),
            Self::Failed { action, status } => write!(f, "{action} failed ({})", status.as_u16()),
            Self::Errored(e) => write!(f, "error: {e}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub total: usize,
    pub cancelled: usize,
    pub deleted: usize,
    pub would_cancel: usize,
    pub would_poll: usize,
    pub skipped: usize,
    pub finished: usize,
    pub conflicts: usize,
    pub timed_out: usize,
    pub failed: usize,
}

impl SweepSummary {
    fn record(&mut self, outcome: &RunOutcome) {
        self.total += 1;
        let counter = match outcome {
            RunOutcome::WouldCancel => &mut self.would_cancel,
            RunOutcome::WouldPoll => &mut self.would_poll,
            RunOutcome::Skipped(_) => &mut self.skipped,
            RunOutcome::Finished => &mut self.finished,
            RunOutcome::Cancelled => &mut self.cancelled,
            RunOutcome::Conflict => &mut self.conflicts,
            RunOutcome::Deleted => &mut self.deleted,
            RunOutcome::TimedOut(_) => &mut self.timed_out,
            RunOutcome::Failed { .. } | RunOutcome::Errored(_) => &mut self.failed,
        };
        *counter += 1;
    }

    /// True when any run was left neither cancelled, deleted nor finished.
    pub fn has_failures(&self) -> bool { self.conflicts + self.timed_out + self.failed > 0 }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} runs", self.total)?;
        let parts = [
            (self.cancelled, "cancelled"),
            (self.deleted, "deleted"),
            (self.would_cancel, "would cancel"),
            (self.would_poll, "would poll"),
            (self.skipped, "skipped"),
            (self.finished, "finished"),
            (self.conflicts, "conflicts"),
            (self.timed_out, "timed out"),
            (self.failed, "failed"),
        ];
        for (count, label) in parts {
            if count > 0 {
                write!(f, ", {count} {label}")?;
            }
        }
        Ok(())
    }
}

enum Waited {
    Cancelable,
    Finished,
    TimedOut(RunStatus),
}

async fn wait_for_cancelable<A: RunsApi>(
    api: &A,
    repo: &RepoRef,
    run: &RunRecord,
    options: &SweepOptions,
) -> Result<Waited> {
    let run_id = run.id;
    let last = Cell::new(run.status);
    let last_ref = &last;
    tracing::info!(
        "Run {} is {}, polling every {}s for up to {}s",
        run_id,
        run.status,
        options.poll_interval.as_secs(),
        options.poll_timeout.as_secs()
    );
    let check = move || async move {
        let Some(current) = api.get_run(repo, run_id).await? else {
            tracing::debug!("Run {} no longer exists", run_id);
            return Ok(Some(Waited::Finished));
        };
        last_ref.set(current.status);
        Ok::<_, anyhow::Error>(match current.status.disposition() {
            Disposition::Cancel => Some(Waited::Cancelable),
            Disposition::Skip => Some(Waited::Finished),
            Disposition::Poll => None,
        })
    };
    let result = poll_until(options.poll_interval, options.poll_timeout, check).await?;
    Ok(result.unwrap_or(Waited::TimedOut(last.get())))
}

async fn delete<A: RunsApi>(api: &A, repo: &RepoRef, run_id: u64) -> Result<RunOutcome> {
    let status = api.delete_run(repo, run_id).await?;
    if status.is_success() {
        tracing::info!("Deleted run {}", run_id);
        Ok(RunOutcome::Deleted)
    } else {
        tracing::warn!("Failed to delete run {}: {}", run_id, status);
        Ok(RunOutcome::Failed { action: Action::Delete, status })
    }
}

/// Classify one run and act on it.
pub async fn sweep_run<A: RunsApi>(
    api: &A,
    repo: &RepoRef,
    run: &RunRecord,
    options: &SweepOptions,
) -> Result<RunOutcome> {
    match run.status.disposition() {
        Disposition::Skip => return Ok(RunOutcome::Skipped(run.status)),
        Disposition::Poll if options.dry_run => return Ok(RunOutcome::WouldPoll),
        Disposition::Poll => match wait_for_cancelable(api, repo, run, options).await? {
            Waited::Cancelable => {}
            Waited::Finished => return Ok(RunOutcome::Finished),
            Waited::TimedOut(status) if options.force_delete => {
                tracing::warn!("Run {} still {} after polling, deleting", run.id, status);
                return delete(api, repo, run.id).await;
            }
            Waited::TimedOut(status) => return Ok(RunOutcome::TimedOut(status)),
        },
        Disposition::Cancel => {}
    }
    if options.dry_run {
        return Ok(RunOutcome::WouldCancel);
    }
    let status = api.cancel_run(repo, run.id).await?;
    match status {
        status if status.is_success() => {
            tracing::info!("Cancelled run {}", run.id);
            Ok(RunOutcome::Cancelled)
        }
        StatusCode::CONFLICT if options.force_delete => {
            tracing::warn!("Run {} cannot be cancelled, deleting", run.id);
            delete(api, repo, run.id).await
        }
        StatusCode::CONFLICT => Ok(RunOutcome::Conflict),
        status => {
            tracing::warn!("Failed to cancel run {}: {}", run.id, status);
            Ok(RunOutcome::Failed { action: Action::Cancel, status })
        }
    }
}

/// Sweep `runs` one at a time, reporting each outcome through `on_outcome`.
///
/// A transport error on one run is recorded as [`RunOutcome::Errored`] and
/// the sweep moves on to the next run.
pub async fn sweep<A, F>(
    api: &A,
    repo: &RepoRef,
    runs: &[RunRecord],
    options: &SweepOptions,
    mut on_outcome: F,
) -> SweepSummary
where
    A: RunsApi,
    F: FnMut(&RunRecord, &RunOutcome),
{
    let mut summary = SweepSummary::default();
    for run in runs {
        let outcome = match sweep_run(api, repo, run, options)
            .await
            .with_context(|| format!("Failed to process run {}", run.id))
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("{:?}", e);
                RunOutcome::Errored(format!("{e:#}"))
            }
        };
        summary.record(&outcome);
        on_outcome(run, &outcome);
    }
    summary
}
