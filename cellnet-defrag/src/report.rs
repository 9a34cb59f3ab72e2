//! Reconciliation Report
//!
//! Before/after diff of two network snapshots, keyed by entry identity
//! (never by quantity). Computed once at task completion; pure.

use cellnet_core::{Entry, EntryId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Classification of one entry identity across a reshuffle run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Gained,
    Lost,
    Unchanged,
}

/// Per-identity before/after figures.
#[derive(Debug, Clone, Serialize)]
pub struct EntryChange {
    pub id: EntryId,
    pub before: u64,
    pub after: u64,
    pub change: ChangeKind,
}

impl EntryChange {
    /// Signed quantity delta.
    pub fn delta(&self) -> i64 {
        self.after as i64 - self.before as i64
    }
}

/// Before/after reconciliation of a completed reshuffle run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReshuffleReport {
    /// One change per identity seen in either snapshot, in identity order
    pub changes: Vec<EntryChange>,
    /// Identity counts per classification
    pub gained: usize,
    pub lost: usize,
    pub unchanged: usize,
    /// Summed quantity gained / lost
    pub total_gained: u64,
    pub total_lost: u64,
}

impl ReshuffleReport {
    /// Compare two snapshots over the union of their entry identities.
    pub fn compare(before: &[Entry], after: &[Entry]) -> Self {
        let mut totals: BTreeMap<EntryId, (u64, u64)> = BTreeMap::new();
        for entry in before {
            totals.entry(entry.id.clone()).or_default().0 += entry.amount;
        }
        for entry in after {
            totals.entry(entry.id.clone()).or_default().1 += entry.amount;
        }

        let mut report = Self::default();
        for (id, (before, after)) in totals {
            let change = match after.cmp(&before) {
                std::cmp::Ordering::Greater => {
                    report.gained += 1;
                    report.total_gained += after - before;
                    ChangeKind::Gained
                }
                std::cmp::Ordering::Less => {
                    report.lost += 1;
                    report.total_lost += before - after;
                    ChangeKind::Lost
                }
                std::cmp::Ordering::Equal => {
                    report.unchanged += 1;
                    ChangeKind::Unchanged
                }
            };
            report.changes.push(EntryChange {
                id,
                before,
                after,
                change,
            });
        }
        report
    }

    /// Net quantity change across the whole run. Non-zero means something
    /// besides the reshuffle moved inventory while it ran.
    pub fn net_change(&self) -> i64 {
        self.total_gained as i64 - self.total_lost as i64
    }

    pub fn is_balanced(&self) -> bool {
        self.net_change() == 0
    }

    /// Top entries by absolute quantity change, for display.
    pub fn top_changes(&self, limit: usize) -> Vec<&EntryChange> {
        let mut changed: Vec<&EntryChange> = self
            .changes
            .iter()
            .filter(|c| c.change != ChangeKind::Unchanged)
            .collect();
        changed.sort_by(|a, b| b.delta().abs().cmp(&a.delta().abs()));
        changed.truncate(limit);
        changed
    }

    /// Human one-liner for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} identities compared: {} gained (+{}), {} lost (-{}), {} unchanged, net {:+}",
            self.changes.len(),
            self.gained,
            self.total_gained,
            self.lost,
            self.total_lost,
            self.unchanged,
            self.net_change()
        )
    }

    /// Rendered report lines for display.
    pub fn lines(&self, top: usize) -> Vec<String> {
        let mut out = Vec::new();
        out.push("=== Reshuffle Reconciliation ===".to_string());
        out.push(self.summary());
        if !self.is_balanced() {
            out.push(format!(
                "WARNING: net inventory change {:+}; external activity occurred during the run",
                self.net_change()
            ));
        }
        let changed = self.top_changes(top);
        if !changed.is_empty() {
            out.push(format!("Top {} changes:", changed.len()));
            for change in changed {
                out.push(format!(
                    "  {}: {} -> {} ({:+})",
                    change.id,
                    change.before,
                    change.after,
                    change.delta()
                ));
            }
        }
        out
    }
}
