use std::fmt;

use runsweep_core::models::{RunRecord, RunStatus};
use runsweep_github::repo::RepoRef;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use typed_path::Utf8NativePathBuf;

// For argp::FromArgs
pub fn native_path(value: &str) -> Result<Utf8NativePathBuf, String> {
    Ok(Utf8NativePathBuf::from(value))
}

pub fn run_status(value: &str) -> Result<RunStatus, String> {
    value.parse().map_err(|_| {
        let expected =
            RunStatus::variants().iter().map(RunStatus::as_str).collect::<Vec<_>>().join(", ");
        format!("invalid status '{value}', expected one of: {expected}")
    })
}

pub fn repo_ref(value: &str) -> Result<RepoRef, String> {
    value.parse().map_err(|e: anyhow::Error| e.to_string())
}

const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]Z");

pub fn format_time(value: OffsetDateTime) -> String {
    value.to_offset(time::UtcOffset::UTC).format(TIME_FORMAT).unwrap_or_else(|_| value.to_string())
}

/// One-line summary of a run, shared by the list and cancel reports.
pub fn describe_run(run: &RunRecord) -> String {
    format!(
        "#{} {:<15} {:<24} {}  {}",
        run.id,
        run.status.as_str(),
        run.branch.as_deref().unwrap_or("-"),
        format_time(run.created_at),
        run.label()
    )
}

/// Report line for one run: its description, `note` and the run URL.
pub fn report_line(run: &RunRecord, note: impl fmt::Display) -> String {
    format!("{}  {}  {}", describe_run(run), note, run.url)
}
