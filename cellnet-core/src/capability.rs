//! Capability traits at the network boundary
//!
//! The engine never owns the storage backend. It consumes these narrow
//! capabilities: a per-kind monitor for extract/inject, read-only cell
//! enumeration for scanning, and a single-writer maintenance lock.
//! Implementations are expected to be synchronous and non-blocking.

use crate::cell::{CellStatus, DeviceKind};
use crate::entry::{Entry, ValueKind};
use crate::error::Result;
use std::sync::Arc;

/// Whether a backend call commits or only predicts.
///
/// `Simulate` must have no observable side effect and must predict what
/// `Modulate` would do against the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    Simulate,
    Modulate,
}

/// Aggregate extract/inject view over one value class of a network.
///
/// Monitors are shared, externally-owned resources. The engine only ever
/// issues simulate-then-commit pairs per entry and never holds a
/// cross-entry transaction open.
pub trait StorageMonitor: Send + Sync {
    /// Snapshot of everything this monitor currently holds.
    fn entries(&self) -> Vec<Entry>;

    /// Extract up to `request.amount` of `request.id` from the network.
    ///
    /// Returns the extracted stack, or `None` when nothing was available.
    fn extract(&self, request: &Entry, mode: ActionMode) -> Result<Option<Entry>>;

    /// Inject `stack` into the network through the backend router.
    ///
    /// Returns the remainder that could not be placed, or `None` when the
    /// stack was fully absorbed.
    fn inject(&self, stack: &Entry, mode: ActionMode) -> Result<Option<Entry>>;
}

/// One cell-hosting device attached to a network.
pub trait CellHost: Send + Sync {
    fn device_kind(&self) -> DeviceKind;

    /// Location identifier, stable for the duration of a scan.
    fn location(&self) -> String;

    fn slot_count(&self) -> usize;

    /// Probe one slot for a usage view of the given value class.
    ///
    /// `Ok(None)` means the slot is empty or stores a different class;
    /// `Err` means the probe itself failed and the slot should be skipped.
    fn cell_status(&self, slot: usize, kind: ValueKind) -> Result<Option<CellStatus>>;
}

/// Read-only enumeration of all cell-hosting devices on a network.
pub trait CellInventory: Send + Sync {
    fn hosts(&self) -> Vec<Arc<dyn CellHost>>;
}

/// Full network handle: cell enumeration, per-kind monitors, and the
/// maintenance lock gating reshuffle runs.
pub trait StorageNetwork: CellInventory {
    /// Monitor for one value class, if the network carries that class.
    fn monitor(&self, kind: ValueKind) -> Option<Arc<dyn StorageMonitor>>;

    /// Try to take the single-writer maintenance lock.
    ///
    /// Returns false without side effects when another owner holds it.
    fn try_acquire_maintenance(&self, owner: &str) -> bool;

    /// Release the maintenance lock if `owner` holds it.
    fn release_maintenance(&self, owner: &str);
}
