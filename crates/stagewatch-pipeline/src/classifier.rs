//! Stage timeline reconstruction from free-text log history.
//!
//! [`classify`] replays the full retained history against a rule table and
//! rebuilds all six stages from scratch. It keeps no state between calls,
//! so classifying a prefix-extended history reproduces the earlier result
//! for the unchanged prefix.
//!
//! Per entry, in order:
//! 1. Forward start: the first stage after the current one whose start
//!    pattern matches becomes current. A running stage it leaves behind
//!    completes; a pending target starts running.
//! 2. End: if the current stage is running and its end pattern matches, it
//!    completes.
//! 3. Fail: every stage whose fail pattern matches fails, pending ones
//!    included. A fail overrides a completion from steps 1-2 on the same
//!    entry. A stage that completed or failed on an earlier entry is
//!    terminal and is never failed again.
//! 4. Collect: the entry is stored on the current stage only if that stage
//!    is still running after steps 1-3. Lines that complete or fail a stage
//!    are not collected.

use stagewatch_core::LogEntry;

use crate::rules::StageRuleSet;
use crate::stage::{pending_timeline, Stage, StageStatus, STAGE_COUNT};

/// Maximum length, in characters, of a stage error message.
pub const ERROR_MESSAGE_LIMIT: usize = 200;

/// Reconstruct the stage timeline for `entries` (arrival order).
pub fn classify<'a, I>(rules: &StageRuleSet, entries: I) -> Vec<Stage>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut stages = pending_timeline();
    let mut current: Option<usize> = None;

    for entry in entries {
        let line = entry.content.as_str();
        let mut closed_now = [false; STAGE_COUNT];

        let first_candidate = current.map_or(0, |c| c + 1);
        let started = (first_candidate..STAGE_COUNT).find(|&i| rules.rule(stages[i].id).starts(line));

        if let Some(target) = started {
            for (offset, stage) in stages[current.unwrap_or(0)..target].iter_mut().enumerate() {
                if stage.status == StageStatus::Running {
                    stage.status = StageStatus::Completed;
                    stage.completed_at = entry.timestamp;
                    closed_now[current.unwrap_or(0) + offset] = true;
                }
            }

            let stage = &mut stages[target];
            if stage.status == StageStatus::Pending {
                stage.status = StageStatus::Running;
                stage.started_at = entry.timestamp;
            }
            current = Some(target);
        }

        if let Some(c) = current {
            let stage = &mut stages[c];
            if stage.status == StageStatus::Running && rules.rule(stage.id).ends(line) {
                stage.status = StageStatus::Completed;
                stage.completed_at = entry.timestamp;
                closed_now[c] = true;
            }
        }

        for (i, stage) in stages.iter_mut().enumerate() {
            let open = !stage.is_terminal() || closed_now[i];
            if open && rules.rule(stage.id).fails(line) {
                stage.status = StageStatus::Failed;
                stage.error_message = Some(truncate_chars(line, ERROR_MESSAGE_LIMIT));
                closed_now[i] = true;
            }
        }

        if let Some(c) = current {
            let stage = &mut stages[c];
            if stage.status == StageStatus::Running {
                stage.collected_lines.push(entry.clone());
            }
        }
    }

    for stage in &mut stages {
        stage.duration_seconds = duration_seconds(stage);
    }

    stages
}

/// Rounded whole seconds between start and completion. Missing or
/// out-of-order timestamps leave the duration unset.
fn duration_seconds(stage: &Stage) -> Option<u64> {
    let (started, completed) = (stage.started_at?, stage.completed_at?);
    let millis = (completed - started).num_milliseconds();
    if millis < 0 {
        return None;
    }
    Some(((millis as f64) / 1000.0).round() as u64)
}

fn truncate_chars(line: &str, limit: usize) -> String {
    match line.char_indices().nth(limit) {
        Some((byte_idx, _)) => line[..byte_idx].to_string(),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageId;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn at(content: &str, secs: i64) -> LogEntry {
        LogEntry::new(content).with_timestamp(t(secs))
    }

    fn status(stages: &[Stage], id: StageId) -> StageStatus {
        stages[id.index()].status
    }

    #[test]
    fn test_empty_history_is_all_pending() {
        let entries: Vec<LogEntry> = Vec::new();
        let stages = classify(&StageRuleSet::builtin(), &entries);
        assert_eq!(stages.len(), STAGE_COUNT);
        assert!(stages.iter().all(|s| s.status == StageStatus::Pending));
    }

    #[test]
    fn test_lines_before_any_start_are_not_collected() {
        let entries = vec![at("pulling metadata", 0), at("Starting deployment", 1)];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        let prepare = &stages[StageId::Prepare.index()];
        assert_eq!(prepare.status, StageStatus::Running);
        assert_eq!(prepare.collected_lines.len(), 1);
        assert_eq!(prepare.collected_lines[0].content, "Starting deployment");
    }

    #[test]
    fn test_forward_start_completes_running_stage() {
        let entries = vec![at("Starting deployment", 0), at("Cloning repository", 3)];
        let stages = classify(&StageRuleSet::builtin(), &entries);

        let prepare = &stages[0];
        assert_eq!(prepare.status, StageStatus::Completed);
        assert_eq!(prepare.completed_at, Some(t(3)));
        assert_eq!(prepare.duration_seconds, Some(3));
        assert_eq!(status(&stages, StageId::Clone), StageStatus::Running);
    }

    #[test]
    fn test_backward_start_is_ignored() {
        let entries = vec![
            at("Starting deployment", 0),
            at("docker build .", 1),
            at("Cloning submodule", 2),
        ];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        assert_eq!(status(&stages, StageId::Clone), StageStatus::Pending);
        assert_eq!(status(&stages, StageId::Build), StageStatus::Running);
        assert_eq!(stages[StageId::Build.index()].collected_lines.len(), 2);
    }

    #[test]
    fn test_jumped_stages_stay_pending() {
        let entries = vec![at("Starting deployment", 0), at("Deploying to cluster", 1)];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        assert_eq!(status(&stages, StageId::Prepare), StageStatus::Completed);
        assert_eq!(status(&stages, StageId::Clone), StageStatus::Pending);
        assert_eq!(status(&stages, StageId::Build), StageStatus::Pending);
        assert_eq!(status(&stages, StageId::Push), StageStatus::Pending);
        assert_eq!(status(&stages, StageId::Deploy), StageStatus::Running);
    }

    #[test]
    fn test_end_pattern_completes_and_stops_collection() {
        let entries = vec![
            at("Cloning repository", 0),
            at("Clone complete", 2),
            at("resolving dependencies", 3),
        ];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        let clone = &stages[StageId::Clone.index()];
        assert_eq!(clone.status, StageStatus::Completed);
        assert_eq!(clone.duration_seconds, Some(2));
        let collected: Vec<_> = clone.collected_lines.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(collected, vec!["Cloning repository"]);
    }

    #[test]
    fn test_failing_line_is_not_collected() {
        let entries = vec![
            at("docker build started", 0),
            at("Step 1/4 : FROM rust:1.75", 1),
            at("Build failed: out of memory", 2),
        ];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        let build = &stages[StageId::Build.index()];
        assert_eq!(build.status, StageStatus::Failed);
        let collected: Vec<_> = build.collected_lines.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(collected, vec!["docker build started", "Step 1/4 : FROM rust:1.75"]);
    }

    #[test]
    fn test_first_forward_start_wins_on_shared_line() {
        let entries = vec![at("Cloning repository then docker build", 0)];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        assert_eq!(status(&stages, StageId::Clone), StageStatus::Running);
        assert_eq!(status(&stages, StageId::Build), StageStatus::Pending);
    }

    #[test]
    fn test_backward_match_on_shared_line_defers_to_forward_match() {
        let entries = vec![
            at("Starting deployment", 0),
            at("docker build started", 1),
            at("Cloning layer cache before pushing image", 2),
        ];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        assert_eq!(status(&stages, StageId::Clone), StageStatus::Pending);
        assert_eq!(status(&stages, StageId::Build), StageStatus::Completed);
        assert_eq!(status(&stages, StageId::Push), StageStatus::Running);
        assert_eq!(stages[StageId::Push.index()].started_at, Some(t(2)));
    }

    #[test]
    fn test_fail_on_pending_stage() {
        let entries = vec![at("Starting deployment", 0), at("container unhealthy: 503", 1)];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        let hc = &stages[StageId::Healthcheck.index()];
        assert_eq!(hc.status, StageStatus::Failed);
        assert!(hc.started_at.is_none());
    }

    #[test]
    fn test_fail_overrides_same_line_completion() {
        let entries = vec![
            at("docker build started", 0),
            at("Build complete but build failed integrity check", 1),
        ];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        let build = &stages[StageId::Build.index()];
        assert_eq!(build.status, StageStatus::Failed);
        assert!(build.error_message.is_some());
    }

    #[test]
    fn test_completed_stage_is_not_failed_later() {
        let entries = vec![
            at("docker build started", 0),
            at("Successfully built 3f2a", 1),
            at("Build failed: retry log from previous attempt", 2),
        ];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        assert_eq!(status(&stages, StageId::Build), StageStatus::Completed);
    }

    #[test]
    fn test_failed_stage_is_not_restarted() {
        let entries = vec![
            at("push failed: registry timeout", 0),
            at("Pushing image", 1),
        ];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        let push = &stages[StageId::Push.index()];
        assert_eq!(push.status, StageStatus::Failed);
        assert!(push.started_at.is_none());
    }

    #[test]
    fn test_error_message_truncated() {
        let long = format!("Build failed: {}", "x".repeat(400));
        let entries = vec![at("docker build started", 0), at(&long, 1)];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        let message = stages[StageId::Build.index()].error_message.clone().unwrap();
        assert_eq!(message.chars().count(), ERROR_MESSAGE_LIMIT);
        assert!(message.starts_with("Build failed: "));
    }

    #[test]
    fn test_missing_timestamps_leave_duration_unset() {
        let entries = vec![
            LogEntry::new("Cloning repository"),
            at("Clone complete", 4),
        ];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        let clone = &stages[StageId::Clone.index()];
        assert_eq!(clone.status, StageStatus::Completed);
        assert!(clone.started_at.is_none());
        assert!(clone.duration_seconds.is_none());
    }

    #[test]
    fn test_out_of_order_timestamps_leave_duration_unset() {
        let entries = vec![at("Cloning repository", 10), at("Clone complete", 4)];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        let clone = &stages[StageId::Clone.index()];
        assert_eq!(clone.status, StageStatus::Completed);
        assert!(clone.duration_seconds.is_none());
    }

    #[test]
    fn test_duration_rounds() {
        let start = t(0);
        let entries = vec![
            LogEntry::new("Cloning repository").with_timestamp(start),
            LogEntry::new("Clone complete").with_timestamp(start + Duration::milliseconds(2600)),
        ];
        let stages = classify(&StageRuleSet::builtin(), &entries);
        assert_eq!(stages[StageId::Clone.index()].duration_seconds, Some(3));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ok", 10), "ok");
    }
}
