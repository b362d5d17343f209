mod cmd;
mod util;

use std::process::ExitCode;

use argp::FromArgs;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(FromArgs, PartialEq, Debug)]
/// Cancel queued and in-progress GitHub Actions runs.
///
/// Requires GITHUB_TOKEN to be set to a token with actions:write access.
struct TopLevel {
    #[argp(subcommand)]
    command: SubCommand,
    #[argp(switch, short = 'v')]
    /// enable debug logging
    verbose: bool,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand)]
enum SubCommand {
    Cancel(cmd::cancel::Args),
    List(cmd::list::Args),
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: TopLevel = argp::parse_args_or_exit(argp::DEFAULT);
    let default_level = if args.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let env_filter =
        EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    let result = match args.command {
        SubCommand::Cancel(c_args) => cmd::cancel::run(c_args).await,
        SubCommand::List(c_args) => cmd::list::run(c_args).await,
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}
