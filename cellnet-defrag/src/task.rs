//! Reshuffle Task
//!
//! The stateful, resumable redistribution job. The host drives it by
//! calling `process_next_batch()` once per scheduling tick; each call
//! handles a bounded slice of the entry list captured at initialization,
//! so the host is never blocked on a long synchronous operation.
//!
//! Safety model:
//! - Void protection simulates extract-then-reinject before committing;
//!   an entry the network could not fully reabsorb is skipped untouched.
//! - A commit-time injection remainder (race with concurrent consumers, or
//!   a backend simulate/commit discrepancy) is force-reinjected on the
//!   spot and the entry counted as skipped.
//! - Nothing raised while processing one entry may abort the batch; the
//!   cursor always advances.

use std::sync::mpsc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use cellnet_core::{ActionMode, CellNetError, Entry, StorageNetwork, ValueKind};

use crate::config::DefragConfig;
use crate::report::ReshuffleReport;

/// Task errors. All of these occur at initialization time, before any
/// mutation; batch processing never returns an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Another reshuffle already holds the maintenance lock")]
    LockHeld,

    #[error("Network holds no entries for the selected value kinds")]
    NoEntries,

    #[error("Task was already initialized")]
    AlreadyInitialized,
}

pub type Result<T> = std::result::Result<T, TaskError>;

/// Task lifecycle. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Initialized,
    Running,
    Completed,
    Cancelled,
}

/// Progress notification, emitted at 10%-of-total crossings.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub processed: usize,
    pub skipped: usize,
    pub total: usize,
    pub percent: f64,
}

/// Resumable reshuffle task. At most one may be active per network; the
/// maintenance lock enforces this from `initialize()` until completion,
/// cancellation, or drop.
pub struct ReshuffleTask {
    task_id: Uuid,
    network: Arc<dyn StorageNetwork>,
    kinds: Vec<ValueKind>,
    config: DefragConfig,
    state: TaskState,
    confirmed: bool,
    entries: Vec<Entry>,
    before: Vec<Entry>,
    cursor: usize,
    processed: usize,
    skipped: usize,
    last_decile: u8,
    progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
    report: Option<ReshuffleReport>,
    lock_held: bool,
}

impl ReshuffleTask {
    /// Create a task targeting the given value kinds.
    pub fn new(network: Arc<dyn StorageNetwork>, kinds: Vec<ValueKind>, config: DefragConfig) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            network,
            kinds,
            config,
            state: TaskState::Created,
            confirmed: false,
            entries: Vec::new(),
            before: Vec::new(),
            cursor: 0,
            processed: 0,
            skipped: 0,
            last_decile: 0,
            progress_tx: None,
            report: None,
            lock_held: false,
        }
    }

    /// Create a task with a progress channel.
    pub fn with_progress(
        network: Arc<dyn StorageNetwork>,
        kinds: Vec<ValueKind>,
        config: DefragConfig,
    ) -> (Self, mpsc::Receiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::channel();
        let mut task = Self::new(network, kinds, config);
        task.progress_tx = Some(tx);
        (task, rx)
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// Acquire the maintenance lock, snapshot the current holdings of every
    /// selected kind's monitor, and build the entry list to process.
    ///
    /// Returns the total entry count. Touches nothing in the backend.
    #[instrument(skip(self), fields(task_id = %self.task_id))]
    pub fn initialize(&mut self) -> Result<usize> {
        if self.state != TaskState::Created {
            return Err(TaskError::AlreadyInitialized);
        }

        let owner = self.task_id.to_string();
        if !self.network.try_acquire_maintenance(&owner) {
            return Err(TaskError::LockHeld);
        }
        self.lock_held = true;

        let mut entries = self.snapshot_holdings();
        entries.retain(|e| !e.is_empty());

        if entries.is_empty() {
            self.release_lock();
            self.state = TaskState::Cancelled;
            return Err(TaskError::NoEntries);
        }

        self.before = entries.clone();
        self.entries = entries;
        self.state = TaskState::Initialized;

        info!(total = self.entries.len(), "Reshuffle initialized");
        Ok(self.entries.len())
    }

    /// True when the entry total is at or above the large-network threshold
    /// and the caller has not yet confirmed. An unconfirmed task issues no
    /// extract or inject calls.
    pub fn needs_confirmation(&self) -> bool {
        !self.confirmed && self.entries.len() >= self.config.confirm_threshold
    }

    /// Confirm a large run.
    pub fn confirm(&mut self) {
        self.confirmed = true;
    }

    /// Process up to `batch_size` entries from the current cursor.
    ///
    /// Returns `true` while more batches remain, `false` once completed or
    /// when called on a cancelled, completed, or unconfirmed task.
    #[instrument(skip(self), fields(task_id = %self.task_id, cursor = self.cursor))]
    pub fn process_next_batch(&mut self) -> bool {
        match self.state {
            TaskState::Completed | TaskState::Cancelled => return false,
            TaskState::Created => {
                warn!("Batch requested before initialization");
                return false;
            }
            TaskState::Initialized | TaskState::Running => {}
        }

        if self.needs_confirmation() {
            warn!(
                total = self.entries.len(),
                threshold = self.config.confirm_threshold,
                "Large network requires confirmation before processing"
            );
            return false;
        }

        self.state = TaskState::Running;

        let end = (self.cursor + self.config.batch_size).min(self.entries.len());
        while self.cursor < end {
            let entry = self.entries[self.cursor].clone();
            match self.process_entry(&entry) {
                Ok(true) => self.processed += 1,
                Ok(false) => {
                    self.skipped += 1;
                    debug!(entry = %entry, "Entry skipped");
                }
                Err(e) => {
                    self.skipped += 1;
                    warn!(entry = %entry, error = %e, "Entry processing failed, skipping");
                }
            }
            self.cursor += 1;
        }

        self.emit_progress();

        if self.cursor >= self.entries.len() {
            self.complete();
            return false;
        }
        true
    }

    /// Move one entry through the network router.
    ///
    /// Returns `Ok(true)` when the entry was handled cleanly and `Ok(false)`
    /// when it was skipped for safety.
    fn process_entry(&self, entry: &Entry) -> cellnet_core::Result<bool> {
        let monitor = self
            .network
            .monitor(entry.id.kind)
            .ok_or(CellNetError::MonitorUnavailable(entry.id.kind))?;

        if self.config.void_protection {
            // Dry run: only extract for real if the network can prove it
            // would take the whole stack back.
            let Some(simulated) = monitor
                .extract(entry, ActionMode::Simulate)?
                .filter(|e| !e.is_empty())
            else {
                return Ok(true);
            };
            if let Some(remainder) = monitor.inject(&simulated, ActionMode::Simulate)? {
                if !remainder.is_empty() {
                    debug!(
                        entry = %entry,
                        remainder = remainder.amount,
                        "Void protection predicted loss"
                    );
                    return Ok(false);
                }
            }
        }

        // Overwrite protection is defined but currently has no effect.

        let Some(extracted) = monitor
            .extract(entry, ActionMode::Modulate)?
            .filter(|e| !e.is_empty())
        else {
            return Ok(true);
        };

        match monitor.inject(&extracted, ActionMode::Modulate)? {
            None => Ok(true),
            Some(remainder) if remainder.is_empty() => Ok(true),
            Some(remainder) => {
                // Last line of defense against inventory loss: the commit
                // disagreed with the simulation, put the remainder straight
                // back where it came from.
                error!(
                    entry = %entry,
                    remainder = remainder.amount,
                    "Commit injection left a remainder, force-reinjecting"
                );
                if let Some(lost) = monitor.inject(&remainder, ActionMode::Modulate)? {
                    if !lost.is_empty() {
                        error!(
                            entry = %entry,
                            amount = lost.amount,
                            "Force-reinject could not place remainder"
                        );
                    }
                }
                Ok(false)
            }
        }
    }

    fn emit_progress(&mut self) {
        let total = self.entries.len();
        if total == 0 {
            return;
        }
        let decile = (self.cursor * 10 / total) as u8;
        if decile > self.last_decile {
            self.last_decile = decile;
            let update = ProgressUpdate {
                processed: self.processed,
                skipped: self.skipped,
                total,
                percent: self.progress_percent(),
            };
            info!(
                percent = update.percent,
                processed = update.processed,
                skipped = update.skipped,
                "Reshuffle progress"
            );
            if let Some(tx) = &self.progress_tx {
                let _ = tx.send(update);
            }
        }
    }

    fn complete(&mut self) {
        let after = self.snapshot_holdings();
        let report = ReshuffleReport::compare(&self.before, &after);
        if !report.is_balanced() {
            warn!(
                net = report.net_change(),
                "Net inventory change detected; something else moved inventory during the run"
            );
        }
        info!(
            processed = self.processed,
            skipped = self.skipped,
            summary = %report.summary(),
            "Reshuffle complete"
        );
        self.report = Some(report);
        self.state = TaskState::Completed;
        self.release_lock();
    }

    /// Cancel the run. Already-committed extract/inject pairs are left in
    /// place; each pair is self-contained, so no rollback is needed.
    pub fn cancel(&mut self) {
        match self.state {
            TaskState::Completed | TaskState::Cancelled => return,
            _ => {}
        }
        info!(
            task_id = %self.task_id,
            processed = self.processed,
            skipped = self.skipped,
            "Reshuffle cancelled"
        );
        self.state = TaskState::Cancelled;
        self.release_lock();
    }

    fn snapshot_holdings(&self) -> Vec<Entry> {
        let mut out = Vec::new();
        for kind in &self.kinds {
            match self.network.monitor(*kind) {
                Some(monitor) => out.extend(monitor.entries()),
                None => warn!(kind = %kind, "No monitor for value kind"),
            }
        }
        out
    }

    fn release_lock(&mut self) {
        if self.lock_held {
            self.network.release_maintenance(&self.task_id.to_string());
            self.lock_held = false;
        }
    }

    // ===== Read accessors =====

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn total_items(&self) -> usize {
        self.entries.len()
    }

    pub fn processed_items(&self) -> usize {
        self.processed
    }

    pub fn skipped_items(&self) -> usize {
        self.skipped
    }

    pub fn current_index(&self) -> usize {
        self.cursor
    }

    pub fn progress_percent(&self) -> f64 {
        if self.entries.is_empty() {
            0.0
        } else {
            self.cursor as f64 / self.entries.len() as f64 * 100.0
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TaskState::Initialized | TaskState::Running)
    }

    pub fn is_completed(&self) -> bool {
        self.state == TaskState::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == TaskState::Cancelled
    }

    /// Reconciliation report, available once completed.
    pub fn report(&self) -> Option<&ReshuffleReport> {
        self.report.as_ref()
    }
}

impl Drop for ReshuffleTask {
    fn drop(&mut self) {
        // The lock must be released even on abnormal termination paths.
        self.release_lock();
    }
}
