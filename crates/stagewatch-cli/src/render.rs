//! Plain-text rendering of timelines and log views.

use stagewatch_core::LogEntry;
use stagewatch_pipeline::{timeline_summary, Stage, StageStatus, StageTransition};

fn status_icon(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Pending => "·",
        StageStatus::Running => "▶",
        StageStatus::Completed => "✓",
        StageStatus::Failed => "✗",
        StageStatus::Skipped => "-",
    }
}

/// Render a timeline as one row per stage plus a summary line.
pub fn timeline(stages: &[Stage]) -> String {
    let mut out = String::new();

    for stage in stages {
        let duration = stage
            .duration_seconds
            .map(|d| format!("{d}s"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{} {:<18} {:<10} {:>6}  {} lines",
            status_icon(stage.status),
            stage.id.label(),
            stage.status,
            duration,
            stage.collected_lines.len(),
        ));
        if let Some(message) = &stage.error_message {
            out.push_str(&format!("\n    error: {message}"));
        }
        out.push('\n');
    }

    let summary = timeline_summary(stages);
    let verdict = if summary.succeeded() {
        "succeeded".to_string()
    } else if let Some(stage) = summary.first_failure {
        format!("failed at {stage}")
    } else if let Some(stage) = summary.current {
        format!("in progress ({stage})")
    } else {
        "waiting".to_string()
    };
    out.push_str(&format!(
        "Pipeline {verdict}: {} completed, {} failed, {} pending, {}s total\n",
        summary.completed, summary.failed, summary.pending, summary.total_duration_seconds
    ));
    out
}

/// Render one stage transition.
pub fn transition(t: &StageTransition) -> String {
    format!("[{}] {} -> {}", t.stage, t.from, t.to)
}

/// Render a log line with its resolved level.
pub fn entry(e: &LogEntry) -> String {
    match e.timestamp {
        Some(ts) => format!(
            "{:>5} {} {:<5} {}",
            e.id,
            ts.format("%H:%M:%S"),
            e.resolved_level(),
            e.content
        ),
        None => format!("{:>5} {:<8} {:<5} {}", e.id, "", e.resolved_level(), e.content),
    }
}
