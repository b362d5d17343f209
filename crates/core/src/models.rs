use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Lifecycle status of a workflow run, as reported by the Actions API.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Requested,
    Queued,
    InProgress,
    Waiting,
    Pending,
    ActionRequired,
    Completed,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub const fn variants() -> &'static [Self] {
        &[
            Self::Requested,
            Self::Queued,
            Self::InProgress,
            Self::Waiting,
            Self::Pending,
            Self::ActionRequired,
            Self::Completed,
        ]
    }

    /// Statuses swept when none are configured.
    pub const fn defaults() -> &'static [Self] {
        &[Self::Queued, Self::InProgress, Self::Waiting, Self::Requested, Self::Pending]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Waiting => "waiting",
            Self::Pending => "pending",
            Self::ActionRequired => "action_required",
            Self::Completed => "completed",
            Self::Unknown => "unknown",
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Queued | Self::InProgress | Self::Waiting => Disposition::Cancel,
            Self::Requested | Self::Pending | Self::ActionRequired => Disposition::Poll,
            Self::Completed | Self::Unknown => Disposition::Skip,
        }
    }
}

impl FromStr for RunStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::variants().iter().copied().find(|v| v.as_str() == normalized).ok_or(())
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// What the sweep should do with a run in a given status.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Disposition {
    /// Cancelable right away.
    Cancel,
    /// Transitional; wait for it to become cancelable.
    Poll,
    /// Finished or unrecognized; leave alone.
    Skip,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cancel => "cancel",
            Self::Poll => "poll",
            Self::Skip => "skip",
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_title: Option<String>,
    #[serde(default, rename = "head_branch")]
    pub branch: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "html_url")]
    pub url: String,
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<String>,
}

impl RunRecord {
    pub fn label(&self) -> String {
        [&self.name, &self.display_title]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("run {}", self.id))
    }
}

/// One page of the list-runs endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunList {
    pub total_count: u64,
    pub workflow_runs: Vec<RunRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        let cases: &[(&str, Option<RunStatus>)] = &[
            ("queued", Some(RunStatus::Queued)),
            ("in_progress", Some(RunStatus::InProgress)),
            ("in-progress", Some(RunStatus::InProgress)),
            ("IN_PROGRESS", Some(RunStatus::InProgress)),
            ("action_required", Some(RunStatus::ActionRequired)),
            ("unknown", None),
            ("done", None),
        ];
        for &(s, expected) in cases {
            assert_eq!(s.parse::<RunStatus>().ok(), expected, "{s}");
        }
    }

    #[test]
    fn test_disposition() {
        assert_eq!(RunStatus::Queued.disposition(), Disposition::Cancel);
        assert_eq!(RunStatus::InProgress.disposition(), Disposition::Cancel);
        assert_eq!(RunStatus::Waiting.disposition(), Disposition::Cancel);
        assert_eq!(RunStatus::Requested.disposition(), Disposition::Poll);
        assert_eq!(RunStatus::Pending.disposition(), Disposition::Poll);
        assert_eq!(RunStatus::Completed.disposition(), Disposition::Skip);
        assert_eq!(RunStatus::Unknown.disposition(), Disposition::Skip);
    }

    #[test]
    fn test_parse_run_list() {
        let json = r#"{
            "total_count": 2,
            "workflow_runs": [
                {
                    "id": 30433642,
                    "name": "Build",
                    "head_branch": "main",
                    "event": "push",
                    "status": "queued",
                    "conclusion": null,
                    "created_at": "2020-01-22T19:33:08Z",
                    "html_url": "https://github.com/octo-org/octo-repo/actions/runs/30433642",
                    "run_attempt": 1
                },
                {
                    "id": 30433643,
                    "display_title": "Nightly",
                    "status": "stale",
                    "created_at": "2020-01-23T01:00:00Z",
                    "html_url": "https://github.com/octo-org/octo-repo/actions/runs/30433643"
                }
            ]
        }"#;
        let list: RunList = serde_json::from_str(json).unwrap();
        assert_eq!(list.total_count, 2);
        let first = &list.workflow_runs[0];
        assert_eq!(first.id, 30433642);
        assert_eq!(first.branch.as_deref(), Some("main"));
        assert_eq!(first.status, RunStatus::Queued);
        assert_eq!(first.conclusion, None);
        assert_eq!(first.created_at.unix_timestamp(), 1579721588);
        assert_eq!(first.label(), "Build");
        let second = &list.workflow_runs[1];
        assert_eq!(second.status, RunStatus::Unknown);
        assert_eq!(second.branch, None);
        assert_eq!(second.label(), "Nightly");
    }

    #[test]
    fn test_label_fallback() {
        let json = r#"{
            "id": 7,
            "name": "",
            "status": "completed",
            "created_at": "2024-05-01T12:00:00Z",
            "html_url": "https://github.com/o/r/actions/runs/7"
        }"#;
        let run: RunRecord = serde_json::from_str(json).unwrap();
        assert_eq!(run.label(), "run 7");
    }
}
