//! Live log session: one serialized event stream per viewed log.
//!
//! A `LogSession` owns the buffer, the autoscroll controller and the last
//! classified timeline. Every input (content arrival, viewport updates,
//! user commands) goes through [`LogSession::apply`] one event at a time,
//! so no two inputs ever mutate session state concurrently.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stagewatch_core::{
    obs, AppendDelta, AutoscrollController, LevelFilter, LogBuffer, LogEntry, PreferenceStore,
    ScrollEffect, SessionSpan, TransportRecord, ViewerConfig,
};

use crate::classifier::classify;
use crate::rules::StageRuleSet;
use crate::stage::{pending_timeline, timeline_summary, Stage, StageId, StageStatus, TimelineSummary};

/// Input to a live log session.
#[derive(Debug, Clone)]
pub enum ViewerEvent {
    /// Records delivered by the transport.
    ContentArrived(Vec<TransportRecord>),

    /// Already-built entries (e.g. with explicit level or source).
    EntriesArrived(Vec<LogEntry>),

    /// Viewport distance from the bottom; `None` if it could not be measured.
    Scrolled(Option<f64>),

    Toggle,

    ScrollToBottom,

    ScrollToTop,

    Clear,
}

/// A stage status change between two consecutive timelines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageTransition {
    pub stage: StageId,
    pub from: StageStatus,
    pub to: StageStatus,
}

/// Result of applying one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    /// Scroll side effect for the host view.
    pub scroll: ScrollEffect,

    /// Buffer delta, for content events.
    pub appended: Option<AppendDelta>,

    /// Stage status changes caused by this event.
    pub transitions: Vec<StageTransition>,
}

/// Compare two timelines stage by stage.
pub fn diff_timelines(before: &[Stage], after: &[Stage]) -> Vec<StageTransition> {
    before
        .iter()
        .zip(after)
        .filter(|(old, new)| old.status != new.status)
        .map(|(old, new)| StageTransition {
            stage: new.id,
            from: old.status,
            to: new.status,
        })
        .collect()
}

/// Live view state for one log stream.
pub struct LogSession {
    session_id: String,
    rules: StageRuleSet,
    buffer: LogBuffer,
    autoscroll: AutoscrollController,
    stages: Vec<Stage>,
}

impl LogSession {
    /// Open a session for `stream_key`.
    pub fn new(
        stream_key: impl Into<String>,
        config: &ViewerConfig,
        rules: StageRuleSet,
        store: Arc<dyn PreferenceStore>,
    ) -> Self {
        let session_id = stagewatch_core::new_session_id();
        let autoscroll = AutoscrollController::new(stream_key, store, config.scroll_threshold);

        let _span = SessionSpan::enter(autoscroll.stream_key(), &session_id);
        obs::emit_rule_set_loaded(&rules.fingerprint(), "session");

        Self {
            session_id,
            rules,
            buffer: LogBuffer::new(config.capacity),
            autoscroll,
            stages: pending_timeline(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn stream_key(&self) -> &str {
        self.autoscroll.stream_key()
    }

    pub fn rules(&self) -> &StageRuleSet {
        &self.rules
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn autoscroll(&self) -> &AutoscrollController {
        &self.autoscroll
    }

    /// Timeline as of the last content event.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn summary(&self) -> TimelineSummary {
        timeline_summary(&self.stages)
    }

    /// Filtered view of the buffer.
    pub fn filtered(&self, level: LevelFilter, query: &str) -> Vec<&LogEntry> {
        self.buffer.filter(level, query)
    }

    /// Apply one event.
    pub fn apply(&mut self, event: ViewerEvent) -> SessionUpdate {
        let _span = SessionSpan::enter(self.autoscroll.stream_key(), &self.session_id);

        match event {
            ViewerEvent::ContentArrived(records) => {
                self.ingest(records.into_iter().map(LogEntry::from_record).collect())
            }
            ViewerEvent::EntriesArrived(entries) => self.ingest(entries),
            ViewerEvent::Scrolled(distance) => {
                self.autoscroll.on_scroll(distance);
                SessionUpdate::default()
            }
            ViewerEvent::Toggle => SessionUpdate {
                scroll: self.autoscroll.toggle(),
                ..SessionUpdate::default()
            },
            ViewerEvent::ScrollToBottom => SessionUpdate {
                scroll: self.autoscroll.scroll_to_bottom(),
                ..SessionUpdate::default()
            },
            ViewerEvent::ScrollToTop => SessionUpdate {
                scroll: self.autoscroll.scroll_to_top(),
                ..SessionUpdate::default()
            },
            ViewerEvent::Clear => self.clear(),
        }
    }

    fn ingest(&mut self, entries: Vec<LogEntry>) -> SessionUpdate {
        if entries.is_empty() {
            return SessionUpdate::default();
        }

        let delta = self.buffer.append(entries);
        obs::emit_entries_appended(delta.added, delta.evicted, self.buffer.len());

        let scroll = self.autoscroll.on_content_added(delta.added);
        let transitions = self.reclassify();

        SessionUpdate {
            scroll,
            appended: Some(delta),
            transitions,
        }
    }

    fn clear(&mut self) -> SessionUpdate {
        let dropped = self.buffer.len();
        self.buffer.clear();
        obs::emit_buffer_cleared(dropped);

        SessionUpdate {
            transitions: self.reclassify(),
            ..SessionUpdate::default()
        }
    }

    fn reclassify(&mut self) -> Vec<StageTransition> {
        let next = classify(&self.rules, self.buffer.entries());
        let transitions = diff_timelines(&self.stages, &next);

        for t in &transitions {
            obs::emit_stage_transition(t.stage.name(), t.from.as_str(), t.to.as_str());
        }

        self.stages = next;
        transitions
    }
}
