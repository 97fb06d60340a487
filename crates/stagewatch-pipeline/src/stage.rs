//! Deployment pipeline stage definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagewatch_core::LogEntry;

/// Number of stages in every timeline.
pub const STAGE_COUNT: usize = 6;

/// The fixed, ordered set of deployment stages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Prepare,
    Clone,
    Build,
    Push,
    Deploy,
    Healthcheck,
}

impl StageId {
    /// All stages in pipeline order.
    pub const ALL: [StageId; STAGE_COUNT] = [
        StageId::Prepare,
        StageId::Clone,
        StageId::Build,
        StageId::Push,
        StageId::Deploy,
        StageId::Healthcheck,
    ];

    /// Position in pipeline order.
    pub fn index(&self) -> usize {
        match self {
            StageId::Prepare => 0,
            StageId::Clone => 1,
            StageId::Build => 2,
            StageId::Push => 3,
            StageId::Deploy => 4,
            StageId::Healthcheck => 5,
        }
    }

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Prepare => "prepare",
            StageId::Clone => "clone",
            StageId::Build => "build",
            StageId::Push => "push",
            StageId::Deploy => "deploy",
            StageId::Healthcheck => "healthcheck",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            StageId::Prepare => "Prepare",
            StageId::Clone => "Clone repository",
            StageId::Build => "Build image",
            StageId::Push => "Push image",
            StageId::Deploy => "Deploy",
            StageId::Healthcheck => "Health check",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// Stage lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        }
    }

    /// Whether no further automated transition may leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageStatus::Completed | StageStatus::Failed | StageStatus::Skipped
        )
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One stage of a reconstructed pipeline timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stage {
    pub id: StageId,

    pub status: StageStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Rounded seconds between start and completion, when both are known
    /// and in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,

    /// Lines received while this stage was running.
    #[serde(default)]
    pub collected_lines: Vec<LogEntry>,

    /// First 200 characters of the line that failed this stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Stage {
    /// A fresh stage in `Pending` state.
    pub fn pending(id: StageId) -> Self {
        Self {
            id,
            status: StageStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_seconds: None,
            collected_lines: Vec::new(),
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// The six stages of an empty timeline, all pending.
pub fn pending_timeline() -> Vec<Stage> {
    StageId::ALL.iter().copied().map(Stage::pending).collect()
}

/// Aggregate view of a timeline for renderers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineSummary {
    /// Stage currently running, if any.
    pub current: Option<StageId>,

    /// First stage in pipeline order that failed.
    pub first_failure: Option<StageId>,

    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,

    /// Sum of known stage durations.
    pub total_duration_seconds: u64,
}

impl TimelineSummary {
    /// Whether every stage completed.
    pub fn succeeded(&self) -> bool {
        self.completed == STAGE_COUNT
    }
}

/// Summarize a timeline.
pub fn timeline_summary(stages: &[Stage]) -> TimelineSummary {
    let mut summary = TimelineSummary::default();

    for stage in stages {
        match stage.status {
            StageStatus::Pending => summary.pending += 1,
            StageStatus::Running => {
                summary.running += 1;
                summary.current = Some(stage.id);
            }
            StageStatus::Completed => summary.completed += 1,
            StageStatus::Failed => {
                summary.failed += 1;
                summary.first_failure.get_or_insert(stage.id);
            }
            StageStatus::Skipped => summary.skipped += 1,
        }
        summary.total_duration_seconds += stage.duration_seconds.unwrap_or(0);
    }

    summary
}
