//! Batch analysis state types

use moodlens_common::events::OutcomeStatus;
use moodlens_common::AxisProfile;
use serde::Serialize;

/// Lifecycle phase of one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Fetching,
    Analyzing,
    Complete,
}

/// Live position within a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Progress {
    /// 1-based index of the item currently in flight; 0 before the first
    pub current: usize,
    pub total: usize,
    pub current_label: Option<String>,
}

/// Terminal record of one item's trip through the analyzer
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub item_id: String,
    pub title: String,
    pub status: OutcomeStatus,
    pub profile: Option<AxisProfile>,
}

/// Observable state of the current (or last) batch run for one platform
///
/// Replaced wholesale when a new playlist is chosen; the epoch identifies
/// which run produced the state, so snapshots from a superseded run are
/// recognizable.
#[derive(Debug, Clone, Serialize)]
pub struct BatchState {
    pub epoch: u64,
    pub playlist_id: Option<String>,
    pub phase: Phase,
    pub progress: Progress,
    pub outcomes: Vec<AnalysisOutcome>,
    /// Per-axis mean over succeeded outcomes; absent while running and when
    /// zero items succeeded
    pub aggregate: Option<AxisProfile>,
    /// Advisory: the upstream declined analysis for this account/app
    pub restricted: bool,
}

impl BatchState {
    pub fn idle() -> Self {
        Self {
            epoch: 0,
            playlist_id: None,
            phase: Phase::Idle,
            progress: Progress::default(),
            outcomes: Vec::new(),
            aggregate: None,
            restricted: false,
        }
    }

    /// Begin a fresh run, discarding everything from the previous one
    pub fn reset_for(&mut self, epoch: u64, playlist_id: &str) {
        *self = Self {
            epoch,
            playlist_id: Some(playlist_id.to_string()),
            phase: Phase::Fetching,
            progress: Progress::default(),
            outcomes: Vec::new(),
            aggregate: None,
            restricted: false,
        };
    }

    pub fn count_with(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Profiles of succeeded outcomes, for aggregation
    pub fn succeeded_profiles(&self) -> Vec<AxisProfile> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Succeeded)
            .filter_map(|o| o.profile)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_discards_previous_run() {
        let mut state = BatchState::idle();
        state.outcomes.push(AnalysisOutcome {
            item_id: "old".into(),
            title: "Old".into(),
            status: OutcomeStatus::Succeeded,
            profile: Some(AxisProfile::NEUTRAL),
        });
        state.restricted = true;

        state.reset_for(7, "playlist-b");

        assert_eq!(state.epoch, 7);
        assert_eq!(state.playlist_id.as_deref(), Some("playlist-b"));
        assert_eq!(state.phase, Phase::Fetching);
        assert!(state.outcomes.is_empty());
        assert!(state.aggregate.is_none());
        assert!(!state.restricted);
    }

    #[test]
    fn succeeded_profiles_ignores_other_statuses() {
        let mut state = BatchState::idle();
        for (status, profile) in [
            (OutcomeStatus::Succeeded, Some(AxisProfile::NEUTRAL)),
            (OutcomeStatus::Failed, None),
            (OutcomeStatus::Unavailable, None),
        ] {
            state.outcomes.push(AnalysisOutcome {
                item_id: "x".into(),
                title: "X".into(),
                status,
                profile,
            });
        }

        assert_eq!(state.succeeded_profiles().len(), 1);
        assert_eq!(state.count_with(OutcomeStatus::Failed), 1);
    }
}
