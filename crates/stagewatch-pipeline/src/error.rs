//! Errors raised while building a stage rule table.

use crate::stage::StageId;

/// Errors from compiling or loading a stage rule table.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("stage {stage}: invalid {kind} pattern {pattern:?}: {source}")]
    InvalidPattern {
        stage: StageId,
        kind: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule table has no entry for stage {0}")]
    MissingStage(StageId),

    #[error("rule table lists stage {0} more than once")]
    DuplicateStage(StageId),

    #[error("rule table could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rule table could not be read: {0}")]
    Io(#[from] std::io::Error),
}
