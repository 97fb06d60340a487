//! Viewport-following state machine for a live log view.
//!
//! Two layers of state are kept apart:
//! - `persisted_seed`: the stored preference, read once at construction
//! - `state`: the live follow state, driven only by scroll, content and
//!   command input after construction
//!
//! The stored preference is written back only on [`AutoscrollController::toggle`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::obs;
use crate::preferences::PreferenceStore;

/// Default distance from the bottom under which the view counts as "at the bottom".
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 100.0;

/// Whether the viewer tracks new content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FollowState {
    Following,
    Detached,
}

impl FollowState {
    fn from_enabled(enabled: bool) -> Self {
        if enabled {
            FollowState::Following
        } else {
            FollowState::Detached
        }
    }
}

/// Scroll side effect requested from the host view.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScrollEffect {
    #[default]
    None,
    ScrollToBottom,
    ScrollToTop,
}

/// Autoscroll controller for one viewed stream.
pub struct AutoscrollController {
    stream_key: String,
    store: Arc<dyn PreferenceStore>,
    threshold: f64,
    persisted_seed: Option<bool>,
    state: FollowState,
    pending: usize,
}

impl std::fmt::Debug for AutoscrollController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoscrollController")
            .field("stream_key", &self.stream_key)
            .field("threshold", &self.threshold)
            .field("persisted_seed", &self.persisted_seed)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .finish()
    }
}

impl AutoscrollController {
    /// Create a controller seeded from the stored preference for `stream_key`.
    ///
    /// A missing or unreadable preference seeds `Following`. A threshold
    /// that is negative or not finite falls back to the default.
    pub fn new(
        stream_key: impl Into<String>,
        store: Arc<dyn PreferenceStore>,
        threshold: f64,
    ) -> Self {
        let stream_key = stream_key.into();

        let persisted_seed = match store.get_bool(&stream_key) {
            Ok(value) => value,
            Err(e) => {
                obs::emit_preference_read_error(&stream_key, &e);
                None
            }
        };

        let threshold = if threshold.is_finite() && threshold >= 0.0 {
            threshold
        } else {
            DEFAULT_SCROLL_THRESHOLD
        };

        Self {
            state: FollowState::from_enabled(persisted_seed.unwrap_or(true)),
            stream_key,
            store,
            threshold,
            persisted_seed,
            pending: 0,
        }
    }

    /// Create a controller with the default threshold.
    pub fn with_default_threshold(
        stream_key: impl Into<String>,
        store: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self::new(stream_key, store, DEFAULT_SCROLL_THRESHOLD)
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The stored preference as read at construction, `None` if absent.
    pub fn persisted_seed(&self) -> Option<bool> {
        self.persisted_seed
    }

    pub fn state(&self) -> FollowState {
        self.state
    }

    pub fn is_following(&self) -> bool {
        self.state == FollowState::Following
    }

    /// Lines that arrived while detached and have not been seen yet.
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Handle a viewport position update.
    ///
    /// `None` (or a non-finite distance) means the position could not be
    /// measured; the controller then fails open to `Following`.
    pub fn on_scroll(&mut self, distance_from_bottom: Option<f64>) {
        let distance = match distance_from_bottom.filter(|d| d.is_finite()) {
            Some(d) => d,
            None => {
                if !self.is_following() {
                    self.follow("measurement_unavailable");
                }
                return;
            }
        };

        match self.state {
            FollowState::Following if distance > self.threshold => {
                self.state = FollowState::Detached;
                obs::emit_follow_changed(&self.stream_key, false, "scrolled_away");
            }
            FollowState::Detached if distance <= self.threshold => {
                self.follow("reached_bottom");
            }
            _ => {}
        }
    }

    /// Handle `count` newly appended lines.
    pub fn on_content_added(&mut self, count: usize) -> ScrollEffect {
        if count == 0 {
            return ScrollEffect::None;
        }

        match self.state {
            FollowState::Following => {
                self.pending = 0;
                ScrollEffect::ScrollToBottom
            }
            FollowState::Detached => {
                self.pending = self.pending.saturating_add(count);
                ScrollEffect::None
            }
        }
    }

    /// Flip the follow state regardless of scroll position and persist it.
    ///
    /// A failed write is logged; the live state still flips.
    pub fn toggle(&mut self) -> ScrollEffect {
        let effect = match self.state {
            FollowState::Following => {
                self.state = FollowState::Detached;
                obs::emit_follow_changed(&self.stream_key, false, "toggle");
                ScrollEffect::None
            }
            FollowState::Detached => {
                self.follow("toggle");
                ScrollEffect::ScrollToBottom
            }
        };

        if let Err(e) = self.store.set_bool(&self.stream_key, self.is_following()) {
            obs::emit_preference_write_error(&self.stream_key, &e);
        }

        effect
    }

    /// Jump to the newest line and resume following.
    pub fn scroll_to_bottom(&mut self) -> ScrollEffect {
        if !self.is_following() {
            self.follow("scroll_to_bottom");
        }
        self.pending = 0;
        ScrollEffect::ScrollToBottom
    }

    /// Jump to the oldest retained line. Follow state is left to the
    /// scroll update that follows.
    pub fn scroll_to_top(&mut self) -> ScrollEffect {
        ScrollEffect::ScrollToTop
    }

    fn follow(&mut self, cause: &str) {
        self.state = FollowState::Following;
        self.pending = 0;
        obs::emit_follow_changed(&self.stream_key, true, cause);
    }
}
