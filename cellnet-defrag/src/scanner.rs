//! Cell Scanner
//!
//! Point-in-time, read-only traversal of every cell reachable from a
//! network. Each occupied slot is probed once per value kind, in probe
//! order; the first kind that yields a usage view wins (a cell accounts
//! for exactly one value class). Probe failures are logged and swallowed:
//! a device that cannot be scanned contributes zero records, never an
//! aborted scan.

use cellnet_core::{CellInventory, CellRecord, ValueKind};
use tracing::{debug, instrument, warn};

/// Read-only cell scanner
pub struct CellScanner {
    kinds: Vec<ValueKind>,
}

impl CellScanner {
    /// Scanner probing all known value kinds.
    pub fn new() -> Self {
        Self {
            kinds: ValueKind::ALL.to_vec(),
        }
    }

    /// Scanner restricted to specific value kinds.
    pub fn with_kinds(kinds: Vec<ValueKind>) -> Self {
        Self { kinds }
    }

    /// Produce the best-effort list of cell records for a network.
    #[instrument(skip(self, inventory))]
    pub fn scan(&self, inventory: &dyn CellInventory) -> Vec<CellRecord> {
        let mut records = Vec::new();
        let hosts = inventory.hosts();

        for host in &hosts {
            let location = host.location();
            let device_kind = host.device_kind();

            for slot in 0..host.slot_count() {
                for kind in &self.kinds {
                    match host.cell_status(slot, *kind) {
                        Ok(Some(status)) => {
                            records.push(CellRecord::from_status(
                                device_kind,
                                location.clone(),
                                slot,
                                *kind,
                                status,
                            ));
                            break;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(
                                location = %location,
                                slot,
                                kind = %kind,
                                error = %e,
                                "Cell probe failed, skipping"
                            );
                        }
                    }
                }
            }
        }

        debug!(
            hosts = hosts.len(),
            cells = records.len(),
            "Cell scan complete"
        );

        records
    }
}

impl Default for CellScanner {
    fn default() -> Self {
        Self::new()
    }
}
