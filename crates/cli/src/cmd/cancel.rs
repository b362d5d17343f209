use std::process::ExitCode;

use anyhow::Result;
use argp::FromArgs;
use runsweep_core::models::RunStatus;
use runsweep_github::{
    GitHub, collect_runs,
    repo::RepoRef,
    sweep::{SweepOptions, sweep},
};
use typed_path::Utf8NativePathBuf;

use crate::{
    cmd::Target,
    util::{native_path, repo_ref, report_line, run_status},
};

#[derive(FromArgs, PartialEq, Debug)]
/// Cancel queued and in-progress workflow runs.
#[argp(subcommand, name = "cancel")]
pub struct Args {
    #[argp(option, short = 'r', from_str_fn(repo_ref))]
    /// repository as owner/name or URL (default: $GITHUB_REPOSITORY)
    repo: Option<RepoRef>,
    #[argp(switch, short = 'n')]
    /// print what would be done without cancelling anything
    dry_run: bool,
    #[argp(switch, short = 'f')]
    /// delete runs that cannot be cancelled
    force_delete: bool,
    #[argp(option, short = 's', from_str_fn(run_status))]
    /// run status to sweep; repeatable (default: queued, in_progress, waiting, requested, pending)
    status: Vec<RunStatus>,
    #[argp(option, short = 'b')]
    /// only runs on this branch
    branch: Option<String>,
    #[argp(option, short = 'e')]
    /// only runs triggered by this event
    event: Option<String>,
    #[argp(option, short = 'w')]
    /// only runs of this workflow file name or ID
    workflow: Option<String>,
    #[argp(option, short = 'l')]
    /// stop after this many runs
    limit: Option<usize>,
    #[argp(option)]
    /// seconds between polls of a transitional run (default: 5)
    poll_interval: Option<u64>,
    #[argp(option)]
    /// give up polling a run after this many seconds (default: 60)
    poll_timeout: Option<u64>,
    #[argp(option, short = 'c', from_str_fn(native_path))]
    /// YAML config file
    config: Option<Utf8NativePathBuf>,
}

pub async fn run(args: Args) -> Result<ExitCode> {
    let resolved = Target {
        config: args.config.as_ref(),
        repo: args.repo.as_ref(),
        statuses: &args.status,
        branch: args.branch.as_deref(),
        event: args.event.as_deref(),
        workflow: args.workflow.as_deref(),
        poll_interval: args.poll_interval,
        poll_timeout: args.poll_timeout,
    }
    .resolve(|key| std::env::var(key).ok())?;
    let options = SweepOptions {
        dry_run: args.dry_run,
        force_delete: args.force_delete,
        poll_interval: resolved.config.poll.interval(),
        poll_timeout: resolved.config.poll.timeout(),
    };

    let github = GitHub::new(&resolved.config.github)?;
    let runs =
        collect_runs(&github, &resolved.repo, &resolved.statuses, &resolved.filter, args.limit)
            .await?;
    if runs.is_empty() {
        println!("No matching runs in {}", resolved.repo);
        return Ok(ExitCode::SUCCESS);
    }
    if options.dry_run {
        tracing::info!("Dry run: no runs will be cancelled or deleted");
    }
    let summary = sweep(&github, &resolved.repo, &runs, &options, |run, outcome| {
        println!("{}", report_line(run, format_args!("-> {outcome}")));
    })
    .await;
    println!("{}: {}", resolved.repo, summary);
    if summary.has_failures() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
