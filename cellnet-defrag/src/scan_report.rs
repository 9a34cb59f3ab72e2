//! Cell Scan Report
//!
//! Assembles scanner and statistics output into a structured, human
//! oriented diagnostic report. Non-mutating; can be produced at any time,
//! whether or not a reshuffle is running.

use cellnet_core::{CellKey, CellRecord, ValueKind};
use serde::Serialize;

use crate::stats::{
    self, filter_by_kind, filter_non_singularity, find_duplicate_partitioned_cells,
    get_top_fragmented, group_by_type, Summary,
};

/// Per-value-kind slice of the overall summary.
#[derive(Debug, Clone, Serialize)]
pub struct KindBreakdown {
    pub kind: ValueKind,
    pub summary: Summary,
}

/// Fragmentation figures over type-locked, non-singularity cells.
///
/// Singularity cells are excluded: a full one-type cell is working as
/// designed, not fragmented.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FragmentationSection {
    pub cells: usize,
    pub wasted_bytes: u64,
}

/// Per-cell-type aggregate row.
#[derive(Debug, Clone, Serialize)]
pub struct CellTypeBreakdown {
    pub key: CellKey,
    pub count: usize,
    pub byte_utilization: f64,
}

/// One group of identically-partitioned cells.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub partition_names: Vec<String>,
    pub kind: ValueKind,
    pub members: Vec<String>,
}

/// Top-fragmented row for display.
#[derive(Debug, Clone, Serialize)]
pub struct FragmentedCell {
    pub position: String,
    pub cell_item: String,
    pub wasted_bytes: u64,
}

/// Structured diagnostic report over one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub overall: Summary,
    pub per_kind: Vec<KindBreakdown>,
    pub fragmentation: FragmentationSection,
    pub cell_types: Vec<CellTypeBreakdown>,
    pub duplicates: Vec<DuplicateGroup>,
    pub top_fragmented: Vec<FragmentedCell>,
}

impl ScanReport {
    /// Assemble the report from scan records.
    pub fn build(cells: &[CellRecord], top: usize) -> Self {
        let overall = stats::summarize(cells);

        let per_kind = ValueKind::ALL
            .iter()
            .filter_map(|kind| {
                let owned: Vec<CellRecord> = filter_by_kind(cells, *kind)
                    .into_iter()
                    .cloned()
                    .collect();
                if owned.is_empty() {
                    None
                } else {
                    Some(KindBreakdown {
                        kind: *kind,
                        summary: stats::summarize(&owned),
                    })
                }
            })
            .collect();

        let fragmented: Vec<&CellRecord> = filter_non_singularity(cells)
            .into_iter()
            .filter(|c| c.is_type_locked())
            .collect();
        let fragmentation = FragmentationSection {
            cells: fragmented.len(),
            wasted_bytes: fragmented.iter().map(|c| c.wasted_bytes()).sum(),
        };

        let cell_types = group_by_type(cells)
            .into_iter()
            .map(|(key, members)| {
                let bytes_total: u64 = members.iter().map(|c| c.bytes_total).sum();
                let bytes_used: u64 = members.iter().map(|c| c.bytes_used).sum();
                CellTypeBreakdown {
                    key,
                    count: members.len(),
                    byte_utilization: if bytes_total == 0 {
                        0.0
                    } else {
                        bytes_used as f64 / bytes_total as f64
                    },
                }
            })
            .collect();

        let duplicates = find_duplicate_partitioned_cells(cells)
            .into_iter()
            .map(|members| {
                let mut names = members[0].partition_names.clone();
                names.sort();
                DuplicateGroup {
                    partition_names: names,
                    kind: members[0].kind,
                    members: members.iter().map(|c| c.position()).collect(),
                }
            })
            .collect();

        let top_fragmented = get_top_fragmented(cells, top)
            .into_iter()
            .map(|c| FragmentedCell {
                position: c.position(),
                cell_item: c.cell_item.clone(),
                wasted_bytes: c.wasted_bytes(),
            })
            .collect();

        Self {
            overall,
            per_kind,
            fragmentation,
            cell_types,
            duplicates,
            top_fragmented,
        }
    }

    /// Rendered report lines for display.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();

        out.push("=== Storage Cell Report ===".to_string());
        out.push(self.overall.summary());

        if !self.per_kind.is_empty() {
            out.push("--- By value kind ---".to_string());
            for breakdown in &self.per_kind {
                out.push(format!("{}: {}", breakdown.kind, breakdown.summary.summary()));
            }
        }

        out.push("--- Fragmentation ---".to_string());
        out.push(format!(
            "{} type-locked cells stranding {} bytes",
            self.fragmentation.cells, self.fragmentation.wasted_bytes
        ));

        if !self.cell_types.is_empty() {
            out.push("--- Cell types ---".to_string());
            for row in &self.cell_types {
                out.push(format!(
                    "{}: {} cells, {:.1}% bytes used",
                    row.key,
                    row.count,
                    row.byte_utilization * 100.0
                ));
            }
        }

        if !self.duplicates.is_empty() {
            out.push("--- Duplicate partitions ---".to_string());
            for group in &self.duplicates {
                out.push(format!(
                    "{} cells partitioned to [{}] ({}): {}",
                    group.members.len(),
                    group.partition_names.join(", "),
                    group.kind,
                    group.members.join(", ")
                ));
            }
        }

        if !self.top_fragmented.is_empty() {
            out.push("--- Most fragmented cells ---".to_string());
            for row in &self.top_fragmented {
                out.push(format!(
                    "{} ({}): {} bytes wasted",
                    row.position, row.cell_item, row.wasted_bytes
                ));
            }
        }

        out
    }
}
