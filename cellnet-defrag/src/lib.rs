//! Cellnet Defragmentation Engine
//!
//! This crate provides background storage-cell defragmentation for a
//! cellnet storage network.
//!
//! The engine performs:
//! - Cell scanning (point-in-time inventory of every cell's budgets)
//! - Statistics (utilization, fragmentation, duplicate-partition detection)
//! - Reshuffling (batched extract/reinject across scheduling ticks, with a
//!   simulate-before-commit safety gate)
//! - Reconciliation reporting (before/after inventory diff)

pub mod config;
pub mod report;
pub mod scan_report;
pub mod scanner;
pub mod stats;
pub mod task;

// Re-export main types
pub use config::DefragConfig;
pub use report::{ChangeKind, EntryChange, ReshuffleReport};
pub use scan_report::ScanReport;
pub use scanner::CellScanner;
pub use stats::{
    filter_by_kind, filter_non_singularity, filter_singularity, find_duplicate_partitioned_cells,
    get_top_fragmented, group_by_type, percentile, summarize, Summary,
};
pub use task::{ProgressUpdate, ReshuffleTask, TaskError, TaskState};

use cellnet_core::{CellInventory, CellRecord};

/// Scan a network and return the cell records. Read-only, callable anytime.
pub fn scan(inventory: &dyn CellInventory) -> Vec<CellRecord> {
    CellScanner::new().scan(inventory)
}

/// Scan a network and render the structured diagnostic report.
pub fn report(inventory: &dyn CellInventory, top: usize) -> Vec<String> {
    ScanReport::build(&scan(inventory), top).lines()
}
