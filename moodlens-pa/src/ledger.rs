//! Selection ledger
//!
//! Tracks which analyzed items the user has marked for saving, and which have
//! already been saved. The saved set only grows within a playlist's lifetime,
//! and a saved id can never re-enter the selection, so one save action cannot
//! persist an item twice.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct SelectionLedger {
    selected: HashSet<String>,
    saved: HashSet<String>,
}

impl SelectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; called when a new playlist's batch begins
    pub fn reset(&mut self) {
        self.selected.clear();
        self.saved.clear();
    }

    /// Flip selection for an id; no-op for saved or ineligible ids
    pub fn toggle(&mut self, id: &str, eligible: bool) {
        if self.saved.contains(id) || !eligible {
            return;
        }
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Select every eligible id not already saved
    pub fn select_all<I>(&mut self, eligible: I)
    where
        I: IntoIterator<Item = String>,
    {
        for id in eligible {
            if !self.saved.contains(&id) {
                self.selected.insert(id);
            }
        }
    }

    pub fn select_none(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn is_saved(&self, id: &str) -> bool {
        self.saved.contains(id)
    }

    pub fn selected(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn saved_count(&self) -> usize {
        self.saved.len()
    }

    /// Move ids into the saved set; they leave the selection and can never
    /// be selected again. Idempotent.
    pub fn mark_saved<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        for id in ids {
            self.selected.remove(&id);
            self.saved.insert(id);
        }
    }
}
