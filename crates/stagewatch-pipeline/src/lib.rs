//! Stagewatch Pipeline - deployment stage reconstruction
//!
//! Provides the interpretation half of Stagewatch:
//! - Rebuilds a six-stage deployment timeline from unstructured log lines
//! - Keeps stage rules as injectable, immutable tables
//! - Drives a live session that wires buffering, autoscroll and classification

pub mod classifier;
pub mod error;
pub mod rules;
pub mod session;
pub mod stage;

// Re-export key types
pub use classifier::{classify, ERROR_MESSAGE_LIMIT};
pub use error::RuleError;
pub use rules::{LinePattern, RuleSetConfig, StageRule, StageRuleConfig, StageRuleSet};
pub use session::{diff_timelines, LogSession, SessionUpdate, StageTransition, ViewerEvent};
pub use stage::{
    pending_timeline, timeline_summary, Stage, StageId, StageStatus, TimelineSummary, STAGE_COUNT,
};
