//! Event types for the moodlens event system
//!
//! Provides the shared `AnalysisEvent` enum and the `EventBus` used to fan
//! events out to SSE clients.

use crate::platform::Platform;
use crate::profile::AxisProfile;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Terminal (or pending) status of one analyzed playlist item
///
/// `Unavailable` is distinct from `Failed`: the upstream declined to analyze
/// the item (capability restriction), so the save path may substitute the
/// neutral default profile. A `Failed` item produced an error and is never
/// saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Pending,
    Succeeded,
    Failed,
    Unavailable,
}

impl OutcomeStatus {
    /// True once the status can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OutcomeStatus::Pending)
    }
}

/// Events broadcast during authentication and batch analysis
///
/// Events are serialized for SSE transmission; all carry the platform they
/// belong to, and batch events carry the epoch of the run that emitted them
/// so clients can discard stragglers from a superseded run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    /// Platform connected (OAuth callback consumed successfully)
    Connected { platform: Platform },

    /// Platform disconnected (explicit, or forced by refresh failure)
    Disconnected { platform: Platform },

    /// Batch run started for a playlist
    BatchStarted {
        platform: Platform,
        epoch: u64,
        playlist_id: String,
        total: usize,
    },

    /// Item entered analysis (outcome appended as pending)
    ItemStarted {
        platform: Platform,
        epoch: u64,
        index: usize,
        total: usize,
        item_id: String,
        title: String,
    },

    /// Item reached a terminal status
    ItemFinished {
        platform: Platform,
        epoch: u64,
        index: usize,
        item_id: String,
        status: OutcomeStatus,
        profile: Option<AxisProfile>,
    },

    /// Batch run completed; aggregate is absent when zero items succeeded
    BatchCompleted {
        platform: Platform,
        epoch: u64,
        succeeded: usize,
        failed: usize,
        unavailable: usize,
        aggregate: Option<AxisProfile>,
    },

    /// Batch run cancelled before completion
    BatchCancelled { platform: Platform, epoch: u64 },

    /// Records persisted from the current selection
    RecordsSaved {
        platform: Platform,
        saved: usize,
        defaulted: usize,
    },
}

impl AnalysisEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            AnalysisEvent::Connected { .. } => "connected",
            AnalysisEvent::Disconnected { .. } => "disconnected",
            AnalysisEvent::BatchStarted { .. } => "batch_started",
            AnalysisEvent::ItemStarted { .. } => "item_started",
            AnalysisEvent::ItemFinished { .. } => "item_finished",
            AnalysisEvent::BatchCompleted { .. } => "batch_completed",
            AnalysisEvent::BatchCancelled { .. } => "batch_cancelled",
            AnalysisEvent::RecordsSaved { .. } => "records_saved",
        }
    }

    /// Platform this event belongs to
    pub fn platform(&self) -> Platform {
        match self {
            AnalysisEvent::Connected { platform }
            | AnalysisEvent::Disconnected { platform }
            | AnalysisEvent::BatchStarted { platform, .. }
            | AnalysisEvent::ItemStarted { platform, .. }
            | AnalysisEvent::ItemFinished { platform, .. }
            | AnalysisEvent::BatchCompleted { platform, .. }
            | AnalysisEvent::BatchCancelled { platform, .. }
            | AnalysisEvent::RecordsSaved { platform, .. } => *platform,
        }
    }
}

/// Central event distribution bus
///
/// Wraps tokio::broadcast, providing non-blocking publish, multiple
/// concurrent subscribers, and automatic cleanup when subscribers drop.
/// Slow subscribers observe lag rather than blocking producers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AnalysisEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers
    ///
    /// Returns the receiver count. An event with no receivers is not an
    /// error; it is simply dropped.
    pub fn emit(&self, event: AnalysisEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => 0,
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
