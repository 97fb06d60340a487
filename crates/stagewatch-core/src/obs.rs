//! Structured observability hooks for live log sessions.
//!
//! This module provides:
//! - Session-scoped tracing spans via `SessionSpan` RAII guard
//! - Emission functions for buffer growth, follow-state changes, stage
//!   transitions and preference storage failures
//!
//! Events are emitted at `info!` (lifecycle) or `debug!` (per batch) level.
//! Set `STAGEWATCH_LOG` (or `RUST_LOG`) to tune verbosity.

use tracing::{debug, info, warn};

/// RAII guard that enters a session-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = SessionSpan::enter("deploy-42", &session_id);
/// // All tracing calls now carry stream_key = "deploy-42"
/// ```
pub struct SessionSpan {
    _span: tracing::span::EnteredSpan,
}

impl SessionSpan {
    /// Create and enter a span tagged with the stream key and session id.
    pub fn enter(stream_key: &str, session_id: &str) -> Self {
        let span = tracing::info_span!(
            "stagewatch.session",
            stream_key = %stream_key,
            session_id = %session_id
        );
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a batch was appended to the buffer.
pub fn emit_entries_appended(added: usize, evicted: usize, retained: usize) {
    debug!(
        event = "buffer.appended",
        added = added,
        evicted = evicted,
        retained = retained,
    );
}

/// Emit event: the buffer was cleared.
pub fn emit_buffer_cleared(dropped: usize) {
    info!(event = "buffer.cleared", dropped = dropped);
}

/// Emit event: autoscroll moved between following and detached.
pub fn emit_follow_changed(stream_key: &str, following: bool, cause: &str) {
    debug!(
        event = "autoscroll.changed",
        stream_key = %stream_key,
        following = following,
        cause = %cause,
    );
}

/// Emit event: a pipeline stage changed status.
pub fn emit_stage_transition(stage: &str, from: &str, to: &str) {
    info!(event = "stage.transition", stage = %stage, from = %from, to = %to);
}

/// Emit event: a stage rule table became active.
pub fn emit_rule_set_loaded(fingerprint: &str, source: &str) {
    info!(event = "rules.loaded", fingerprint = %fingerprint, source = %source);
}

/// Emit event: reading a persisted preference failed (warning level).
pub fn emit_preference_read_error(key: &str, error: &dyn std::fmt::Display) {
    warn!(event = "preference.read_error", key = %key, error = %error);
}

/// Emit event: writing a persisted preference failed (warning level).
pub fn emit_preference_write_error(key: &str, error: &dyn std::fmt::Display) {
    warn!(event = "preference.write_error", key = %key, error = %error);
}
