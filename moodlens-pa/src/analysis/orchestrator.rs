//! Batch analysis orchestration
//!
//! One orchestrator per platform drives a strictly sequential run over the
//! chosen playlist's items, mutating a shared BatchState that the status
//! endpoint snapshots and the event bus mirrors. Failures are isolated per
//! item; nothing short of cancellation or supersession stops the loop.
//!
//! Supersession: every run captures an epoch from a per-platform counter.
//! Starting a new run bumps the counter and cancels the old run's token; a
//! run re-verifies its epoch before every observable mutation and exits
//! silently once stale, so a superseded run can never write into the state
//! of its successor.

use crate::analysis::transport::{AnalysisTransport, ItemResult};
use crate::analysis::types::{AnalysisOutcome, BatchState, Phase};
use crate::models::PlaylistItem;
use moodlens_common::events::{AnalysisEvent, EventBus, OutcomeStatus};
use moodlens_common::{AxisProfile, Platform};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Delay between outcome reveals when one upstream call resolved a whole
/// chunk, so observers still see item-by-item progress
const CHUNK_REVEAL_DELAY: Duration = Duration::from_millis(120);

pub struct BatchAnalysisOrchestrator {
    platform: Platform,
    state: Arc<RwLock<BatchState>>,
    epoch: AtomicU64,
    cancel: Mutex<Option<CancellationToken>>,
    events: EventBus,
    transport: Arc<dyn AnalysisTransport>,
    reveal_delay: Duration,
}

impl BatchAnalysisOrchestrator {
    pub fn new(
        platform: Platform,
        events: EventBus,
        transport: Arc<dyn AnalysisTransport>,
    ) -> Self {
        Self {
            platform,
            state: Arc::new(RwLock::new(BatchState::idle())),
            epoch: AtomicU64::new(0),
            cancel: Mutex::new(None),
            events,
            transport,
            reveal_delay: CHUNK_REVEAL_DELAY,
        }
    }

    #[cfg(test)]
    fn without_reveal_delay(mut self) -> Self {
        self.reveal_delay = Duration::ZERO;
        self
    }

    /// Claim a new run: bump the epoch, cancel any previous run, and reset
    /// the observable state to Fetching for the chosen playlist.
    pub async fn begin(&self, playlist_id: &str) -> (u64, CancellationToken) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let token = CancellationToken::new();
        {
            let mut cancel = self.cancel.lock().await;
            if let Some(previous) = cancel.replace(token.clone()) {
                previous.cancel();
            }
        }

        self.state.write().await.reset_for(epoch, playlist_id);
        tracing::info!(
            platform = %self.platform,
            epoch = epoch,
            playlist_id = %playlist_id,
            "Batch run claimed"
        );
        (epoch, token)
    }

    /// Revert to Idle when the item fetch for a claimed run failed
    pub async fn abort_fetch(&self, epoch: u64) {
        let mut state = self.state.write().await;
        if state.epoch == epoch {
            state.phase = Phase::Idle;
            tracing::warn!(platform = %self.platform, epoch = epoch, "Run aborted before analysis");
        }
    }

    /// Cancel the current run, if any
    pub async fn cancel(&self) {
        if let Some(token) = self.cancel.lock().await.as_ref() {
            token.cancel();
        }
    }

    /// Snapshot of the observable state
    pub async fn snapshot(&self) -> BatchState {
        self.state.read().await.clone()
    }

    /// Run the analysis loop for a previously claimed epoch
    ///
    /// Items are processed strictly in input order. Exactly one terminal
    /// outcome is recorded per item; no per-item failure aborts the batch.
    pub async fn run(&self, epoch: u64, token: CancellationToken, items: Vec<PlaylistItem>) {
        if self.is_stale(epoch) {
            return;
        }
        if token.is_cancelled() {
            self.finish_cancelled(epoch).await;
            return;
        }

        let playlist_id = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return;
            }
            state.phase = Phase::Analyzing;
            state.progress.total = items.len();
            state.playlist_id.clone().unwrap_or_default()
        };

        self.events.emit(AnalysisEvent::BatchStarted {
            platform: self.platform,
            epoch,
            playlist_id,
            total: items.len(),
        });

        let chunk_size = self.transport.chunk_size().max(1);
        let total = items.len();
        let mut index = 0usize;

        for chunk in items.chunks(chunk_size) {
            if self.is_stale(epoch) {
                return;
            }
            if token.is_cancelled() {
                self.finish_cancelled(epoch).await;
                return;
            }

            if chunk_size == 1 {
                // Per-item transport: the Pending outcome is visible for the
                // full duration of the upstream call
                let item = &chunk[0];
                if !self.mark_started(epoch, index, total, item).await {
                    return;
                }
                let outcome = self.transport.analyze_chunk(chunk).await;
                let result = outcome
                    .results
                    .into_iter()
                    .next()
                    .unwrap_or(ItemResult::Failed);
                if !self.finish_item(epoch, index, result).await {
                    return;
                }
                index += 1;
            } else {
                // Batched transport: one call resolves the chunk, reveals
                // are staggered per item
                let outcome = self.transport.analyze_chunk(chunk).await;
                if outcome.restricted {
                    let mut state = self.state.write().await;
                    if state.epoch != epoch {
                        return;
                    }
                    state.restricted = true;
                }

                for (item, result) in chunk.iter().zip(outcome.results) {
                    if token.is_cancelled() {
                        self.finish_cancelled(epoch).await;
                        return;
                    }
                    if !self.mark_started(epoch, index, total, item).await {
                        return;
                    }
                    if !self.reveal_delay.is_zero() {
                        tokio::time::sleep(self.reveal_delay).await;
                    }
                    if !self.finish_item(epoch, index, result).await {
                        return;
                    }
                    index += 1;
                }
            }
        }

        self.finish_complete(epoch).await;
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch
    }

    async fn mark_started(
        &self,
        epoch: u64,
        index: usize,
        total: usize,
        item: &PlaylistItem,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return false;
        }

        state.progress.current = index + 1;
        state.progress.current_label = Some(item.title.clone());
        state.outcomes.push(AnalysisOutcome {
            item_id: item.id.clone(),
            title: item.title.clone(),
            status: OutcomeStatus::Pending,
            profile: None,
        });
        drop(state);

        self.events.emit(AnalysisEvent::ItemStarted {
            platform: self.platform,
            epoch,
            index,
            total,
            item_id: item.id.clone(),
            title: item.title.clone(),
        });
        true
    }

    async fn finish_item(&self, epoch: u64, index: usize, result: ItemResult) -> bool {
        let (status, profile) = match result {
            ItemResult::Profile(profile) => (OutcomeStatus::Succeeded, Some(profile)),
            ItemResult::Failed => (OutcomeStatus::Failed, None),
            ItemResult::Unavailable => (OutcomeStatus::Unavailable, None),
        };

        let item_id = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return false;
            }
            let outcome = &mut state.outcomes[index];
            outcome.status = status;
            outcome.profile = profile;
            outcome.item_id.clone()
        };

        self.events.emit(AnalysisEvent::ItemFinished {
            platform: self.platform,
            epoch,
            index,
            item_id,
            status,
            profile,
        });
        true
    }

    async fn finish_complete(&self, epoch: u64) {
        let (succeeded, failed, unavailable, aggregate) = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return;
            }
            state.aggregate = AxisProfile::mean_of(&state.succeeded_profiles());
            state.phase = Phase::Complete;
            state.progress.current_label = None;
            (
                state.count_with(OutcomeStatus::Succeeded),
                state.count_with(OutcomeStatus::Failed),
                state.count_with(OutcomeStatus::Unavailable),
                state.aggregate,
            )
        };

        tracing::info!(
            platform = %self.platform,
            epoch = epoch,
            succeeded = succeeded,
            failed = failed,
            unavailable = unavailable,
            "Batch run complete"
        );

        self.events.emit(AnalysisEvent::BatchCompleted {
            platform: self.platform,
            epoch,
            succeeded,
            failed,
            unavailable,
            aggregate,
        });
    }

    async fn finish_cancelled(&self, epoch: u64) {
        {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return;
            }
            state.aggregate = AxisProfile::mean_of(&state.succeeded_profiles());
            state.phase = Phase::Complete;
            state.progress.current_label = None;
        }

        tracing::info!(platform = %self.platform, epoch = epoch, "Batch run cancelled");
        self.events.emit(AnalysisEvent::BatchCancelled {
            platform: self.platform,
            epoch,
        });
    }
}
