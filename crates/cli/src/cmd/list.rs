use std::process::ExitCode;

use anyhow::Result;
use argp::FromArgs;
use runsweep_core::models::RunStatus;
use runsweep_github::{GitHub, collect_runs, repo::RepoRef};
use typed_path::Utf8NativePathBuf;

use crate::{
    cmd::Target,
    util::{native_path, repo_ref, report_line, run_status},
};

#[derive(FromArgs, PartialEq, Debug)]
/// List runs that a cancel sweep would act on, without changing anything.
#[argp(subcommand, name = "list")]
pub struct Args {
    #[argp(option, short = 'r', from_str_fn(repo_ref))]
    /// repository as owner/name or URL (default: $GITHUB_REPOSITORY)
    repo: Option<RepoRef>,
    #[argp(option, short = 's', from_str_fn(run_status))]
    /// run status to include; repeatable
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
        poll_interval: None,
        poll_timeout: None,
    }
    .resolve(|key| std::env::var(key).ok())?;
    let github = GitHub::new(&resolved.config.github)?;
    let runs =
        collect_runs(&github, &resolved.repo, &resolved.statuses, &resolved.filter, args.limit)
            .await?;
    for run in &runs {
        println!("{}", report_line(run, format_args!("[{}]", run.status.disposition())));
    }
    println!("{} runs in {}", runs.len(), resolved.repo);
    Ok(ExitCode::SUCCESS)
}
