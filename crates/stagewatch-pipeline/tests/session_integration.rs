//! Integration tests for live log sessions with persisted preferences.

use std::sync::Arc;

use stagewatch_core::{
    FsPreferenceStore, LevelFilter, LogEntry, LogLevel, MemoryPreferenceStore, PreferenceStore,
    ScrollEffect, TransportRecord, ViewerConfig,
};
use stagewatch_pipeline::{LogSession, StageId, StageRuleSet, StageStatus, ViewerEvent};

fn records(lines: &[&str]) -> ViewerEvent {
    ViewerEvent::ContentArrived(lines.iter().map(|l| TransportRecord::new(*l)).collect())
}

fn open(stream_key: &str, capacity: usize, store: Arc<dyn PreferenceStore>) -> LogSession {
    let config = ViewerConfig {
        capacity,
        ..ViewerConfig::default()
    };
    LogSession::new(stream_key, &config, StageRuleSet::builtin(), store)
}

/// Test: following sessions request scrolls and never accumulate pending lines
#[test]
fn test_following_session_scrolls_on_content() {
    let mut session = open("deploy-1", 500, Arc::new(MemoryPreferenceStore::new()));
    assert!(session.autoscroll().is_following());

    let update = session.apply(records(&["a", "b", "c", "d", "e"]));
    assert_eq!(update.scroll, ScrollEffect::ScrollToBottom);
    assert_eq!(session.autoscroll().pending_count(), 0);
}

/// Test: detached sessions count new lines and request no scroll
#[test]
fn test_detached_session_counts_pending() {
    let mut session = open("deploy-1", 500, Arc::new(MemoryPreferenceStore::new()));
    session.apply(ViewerEvent::Scrolled(Some(250.0)));

    let update = session.apply(records(&["a", "b", "c", "d", "e"]));
    assert_eq!(update.scroll, ScrollEffect::None);
    assert_eq!(session.autoscroll().pending_count(), 5);

    session.apply(ViewerEvent::Scrolled(Some(12.0)));
    assert!(session.autoscroll().is_following());
    assert_eq!(session.autoscroll().pending_count(), 0);
}

/// Test: capacity eviction keeps the newest lines and reclassifies the retained suffix
#[test]
fn test_eviction_bounds_history() {
    let mut session = open("deploy-2", 3, Arc::new(MemoryPreferenceStore::new()));
    session.apply(records(&["Starting deployment", "Cloning repository"]));
    assert_eq!(session.stages()[StageId::Clone.index()].status, StageStatus::Running);

    let update = session.apply(records(&["remote: counting objects", "docker build started"]));
    let delta = update.appended.expect("content delta");
    assert_eq!(delta.added, 2);
    assert_eq!(delta.evicted, 1);

    let kept: Vec<_> = session.buffer().entries().map(|e| e.content.as_str()).collect();
    assert_eq!(
        kept,
        vec!["Cloning repository", "remote: counting objects", "docker build started"]
    );

    assert_eq!(session.stages()[StageId::Prepare.index()].status, StageStatus::Pending);
    assert_eq!(session.stages()[StageId::Clone.index()].status, StageStatus::Completed);
    assert_eq!(session.stages()[StageId::Build.index()].status, StageStatus::Running);
}

/// Test: stage transitions are reported per batch
#[test]
fn test_transitions_reported_per_batch() {
    let mut session = open("deploy-3", 500, Arc::new(MemoryPreferenceStore::new()));
    session.apply(records(&["Starting deployment", "docker build started"]));

    let update = session.apply(records(&["Build failed: out of memory"]));
    assert_eq!(update.transitions.len(), 1);
    assert_eq!(update.transitions[0].stage, StageId::Build);
    assert_eq!(update.transitions[0].from, StageStatus::Running);
    assert_eq!(update.transitions[0].to, StageStatus::Failed);
    assert_eq!(session.summary().first_failure, Some(StageId::Build));
}

/// Test: level and query filtering over session contents
#[test]
fn test_session_filtering() {
    let mut session = open("deploy-4", 500, Arc::new(MemoryPreferenceStore::new()));
    session.apply(ViewerEvent::EntriesArrived(vec![
        LogEntry::new("WARNING: disk usage high"),
        LogEntry::new("connection failed: timeout"),
        LogEntry::new("retrying upstream").with_level(LogLevel::Warn),
        LogEntry::new("listening on :8080"),
    ]));

    let warns = session.filtered(LevelFilter::Only(LogLevel::Warn), "");
    assert_eq!(warns.len(), 2);

    let errors = session.filtered(LevelFilter::Only(LogLevel::Error), "timeout");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].content, "connection failed: timeout");

    assert_eq!(session.filtered(LevelFilter::All, "").len(), 4);
}

/// Test: toggle persists the preference, which seeds the next session
#[test]
fn test_toggle_preference_survives_sessions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("prefs.json");

    {
        let store = Arc::new(FsPreferenceStore::new(&path).expect("store"));
        let mut session = open("deploy-5", 500, store);
        assert!(session.autoscroll().is_following());
        session.apply(ViewerEvent::Toggle);
        assert!(!session.autoscroll().is_following());
    }

    let store = Arc::new(FsPreferenceStore::new(&path).expect("store"));
    let mut session = open("deploy-5", 500, store.clone());
    assert!(!session.autoscroll().is_following());
    assert_eq!(session.autoscroll().persisted_seed(), Some(false));

    // Runtime transitions leave the stored value alone.
    session.apply(ViewerEvent::Scrolled(Some(0.0)));
    assert!(session.autoscroll().is_following());
    assert_eq!(store.get_bool("deploy-5").expect("read"), Some(false));

    let other = open("deploy-6", 500, store);
    assert!(other.autoscroll().is_following());
}

/// Test: measurement failure while detached fails open to following
#[test]
fn test_measurement_failure_fails_open() {
    let store = Arc::new(MemoryPreferenceStore::with_value("deploy-7", false));
    let mut session = open("deploy-7", 500, store);
    assert!(!session.autoscroll().is_following());

    session.apply(records(&["a", "b"]));
    session.apply(ViewerEvent::Scrolled(None));
    assert!(session.autoscroll().is_following());
    assert_eq!(session.autoscroll().pending_count(), 0);
}

/// Test: clear drops buffered lines but keeps the session usable
#[test]
fn test_clear_then_resume() {
    let mut session = open("deploy-8", 500, Arc::new(MemoryPreferenceStore::new()));
    session.apply(records(&["Starting deployment", "Cloning repository"]));
    session.apply(ViewerEvent::Clear);
    assert!(session.buffer().is_empty());

    session.apply(records(&["Pushing image"]));
    assert_eq!(session.stages()[StageId::Push.index()].status, StageStatus::Running);
    assert_eq!(session.buffer().last().map(|e| e.id), Some(3));
}
