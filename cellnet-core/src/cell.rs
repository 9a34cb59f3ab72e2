//! Cell snapshot records
//!
//! A `CellRecord` is an immutable point-in-time snapshot of one storage
//! cell: where it lives, what class of value it stores, and its byte and
//! distinct-type budgets. All derived figures (free space, utilization,
//! lock states) are computed, never stored.

use crate::entry::ValueKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of device hosting storage cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Multi-slot cell drive
    Drive,
    /// Single-slot cell chest
    Chest,
}

impl DeviceKind {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Drive => "drive",
            DeviceKind::Chest => "chest",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw per-cell counters and partition config as reported by a host.
///
/// The scanner turns this into a [`CellRecord`]; hosts never hand out
/// anything longer-lived than this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStatus {
    /// Item identity of the cell itself (e.g. "64k Storage Cell")
    pub cell_item: String,
    /// Metadata / variant of the cell item
    pub variant: u32,
    pub bytes_total: u64,
    pub bytes_used: u64,
    pub types_total: u32,
    pub types_used: u32,
    /// Partition filter entry names; empty means unpartitioned
    pub partition_names: Vec<String>,
}

/// Immutable snapshot of one storage cell at scan time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub device_kind: DeviceKind,
    /// Location identifier of the hosting device
    pub location: String,
    /// Slot index within the hosting device
    pub slot: usize,
    /// Item identity of the cell itself
    pub cell_item: String,
    /// Metadata / variant of the cell item
    pub variant: u32,
    /// Value class this cell accounts for
    pub kind: ValueKind,
    pub bytes_total: u64,
    pub bytes_used: u64,
    pub types_total: u32,
    pub types_used: u32,
    pub partitioned: bool,
    pub partition_names: Vec<String>,
}

impl CellRecord {
    /// Build a record from a raw host status.
    ///
    /// Usage counters are clamped to their totals so the `used <= total`
    /// invariant holds even against a misbehaving host.
    pub fn from_status(
        device_kind: DeviceKind,
        location: impl Into<String>,
        slot: usize,
        kind: ValueKind,
        status: CellStatus,
    ) -> Self {
        let partitioned = !status.partition_names.is_empty();
        Self {
            device_kind,
            location: location.into(),
            slot,
            cell_item: status.cell_item,
            variant: status.variant,
            kind,
            bytes_total: status.bytes_total,
            bytes_used: status.bytes_used.min(status.bytes_total),
            types_total: status.types_total,
            types_used: status.types_used.min(status.types_total),
            partitioned,
            partition_names: status.partition_names,
        }
    }

    pub fn bytes_free(&self) -> u64 {
        self.bytes_total - self.bytes_used
    }

    pub fn types_free(&self) -> u32 {
        self.types_total - self.types_used
    }

    /// Byte usage ratio in [0, 1]; zero-capacity cells report 0.
    pub fn byte_utilization(&self) -> f64 {
        if self.bytes_total == 0 {
            0.0
        } else {
            self.bytes_used as f64 / self.bytes_total as f64
        }
    }

    /// Type-slot usage ratio in [0, 1]; zero-capacity cells report 0.
    pub fn type_utilization(&self) -> f64 {
        if self.types_total == 0 {
            0.0
        } else {
            self.types_used as f64 / self.types_total as f64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_used == 0 && self.types_used == 0
    }

    /// All distinct-type slots used while byte space remains: the cell can
    /// no longer accept new kinds of entries, so the free bytes are wasted.
    pub fn is_type_locked(&self) -> bool {
        self.types_total > 0 && self.types_used == self.types_total && self.bytes_free() > 0
    }

    /// All byte space used while type slots remain.
    pub fn is_byte_locked(&self) -> bool {
        self.bytes_total > 0 && self.bytes_used == self.bytes_total && self.types_free() > 0
    }

    /// A cell whose type budget is exactly one.
    pub fn is_singularity(&self) -> bool {
        self.types_total == 1
    }

    /// Bytes stranded by type lock; zero for any other cell state.
    pub fn wasted_bytes(&self) -> u64 {
        if self.is_type_locked() {
            self.bytes_free()
        } else {
            0
        }
    }

    /// Grouping identity for "same kind of cell".
    pub fn key(&self) -> CellKey {
        CellKey {
            cell_item: self.cell_item.clone(),
            variant: self.variant,
            kind: self.kind,
        }
    }

    /// Short "location[slot]" label for report lines.
    pub fn position(&self) -> String {
        format!("{}[{}]", self.location, self.slot)
    }
}

/// Grouping identity for cells of the same item, variant, and value class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub cell_item: String,
    pub variant: u32,
    pub kind: ValueKind,
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variant == 0 {
            write!(f, "{} ({})", self.cell_item, self.kind)
        } else {
            write!(f, "{}:{} ({})", self.cell_item, self.variant, self.kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bytes: (u64, u64), types: (u32, u32)) -> CellRecord {
        CellRecord {
            device_kind: DeviceKind::Drive,
            location: "drive-0".to_string(),
            slot: 0,
            cell_item: "4k Storage Cell".to_string(),
            variant: 0,
            kind: ValueKind::Item,
            bytes_total: bytes.0,
            bytes_used: bytes.1,
            types_total: types.0,
            types_used: types.1,
            partitioned: false,
            partition_names: Vec::new(),
        }
    }

    #[test]
    fn test_from_status_clamps_overflowing_counters() {
        let status = CellStatus {
            cell_item: "1k Storage Cell".to_string(),
            variant: 0,
            bytes_total: 1024,
            bytes_used: 2048,
            types_total: 63,
            types_used: 99,
            partition_names: Vec::new(),
        };
        let rec = CellRecord::from_status(DeviceKind::Drive, "drive-0", 3, ValueKind::Item, status);
        assert_eq!(rec.bytes_used, 1024);
        assert_eq!(rec.types_used, 63);
        assert_eq!(rec.bytes_free(), 0);
    }

    #[test]
    fn test_type_locked() {
        let rec = record((1024, 512), (63, 63));
        assert!(rec.is_type_locked());
        assert!(!rec.is_byte_locked());
        assert_eq!(rec.wasted_bytes(), 512);
    }

    #[test]
    fn test_byte_locked() {
        let rec = record((1024, 1024), (63, 10));
        assert!(rec.is_byte_locked());
        assert!(!rec.is_type_locked());
        assert_eq!(rec.wasted_bytes(), 0);
    }

    #[test]
    fn test_full_cell_is_neither_locked() {
        let rec = record((1024, 1024), (63, 63));
        assert!(!rec.is_type_locked());
        assert!(!rec.is_byte_locked());
    }

    #[test]
    fn test_singularity_and_empty() {
        let rec = record((1024, 0), (1, 0));
        assert!(rec.is_singularity());
        assert!(rec.is_empty());
        assert_eq!(rec.byte_utilization(), 0.0);
    }

    #[test]
    fn test_utilization_ratios() {
        let rec = record((1000, 250), (10, 5));
        assert_eq!(rec.byte_utilization(), 0.25);
        assert_eq!(rec.type_utilization(), 0.5);
    }

    #[test]
    fn test_position_label() {
        let rec = record((1, 0), (1, 0));
        assert_eq!(rec.position(), "drive-0[0]");
    }
}
