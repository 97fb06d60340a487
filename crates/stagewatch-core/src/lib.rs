//! Stagewatch Core - live deployment log viewing
//!
//! Provides the viewing half of Stagewatch:
//! - `LogBuffer`: bounded FIFO store with level inference and filtering
//! - `AutoscrollController`: follow/detach state machine for the viewport
//! - `PreferenceStore`: durable per-stream autoscroll preference

pub mod autoscroll;
pub mod buffer;
pub mod config;
pub mod entry;
pub mod error;
pub mod obs;
pub mod preferences;
pub mod telemetry;

pub use autoscroll::{AutoscrollController, FollowState, ScrollEffect, DEFAULT_SCROLL_THRESHOLD};
pub use buffer::{AppendDelta, LogBuffer, DEFAULT_CAPACITY};
pub use config::ViewerConfig;
pub use entry::{LevelFilter, LogEntry, LogLevel, TransportRecord};
pub use error::{ConfigError, Result, StagewatchError};
pub use obs::{
    emit_buffer_cleared, emit_entries_appended, emit_follow_changed, emit_preference_read_error,
    emit_preference_write_error, emit_rule_set_loaded, emit_stage_transition, SessionSpan,
};
pub use preferences::fs::FsPreferenceStore;
pub use preferences::{MemoryPreferenceStore, PreferenceError, PreferenceStore};
pub use telemetry::init_tracing;

/// Create a new session identifier for tracing spans.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
