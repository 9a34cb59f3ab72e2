//! Statistics Engine
//!
//! Pure, deterministic functions over a list of cell records: aggregate
//! summaries, grouping, percentiles, fragmentation ranking, and
//! duplicate-partition detection. Sort ties keep input order.

use cellnet_core::{CellKey, CellRecord, ValueKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate over a collection of cell records.
///
/// Utilization figures are weighted (summed used over summed total), not
/// averages of per-cell ratios.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub cells: usize,
    pub empty_cells: usize,
    pub type_locked: usize,
    pub byte_locked: usize,
    pub bytes_total: u64,
    pub bytes_used: u64,
    pub bytes_free: u64,
    pub types_total: u64,
    pub types_used: u64,
    pub types_free: u64,
    /// Bytes stranded in type-locked cells
    pub wasted_bytes: u64,
    pub byte_utilization: f64,
    pub type_utilization: f64,
    pub median_byte_utilization: f64,
}

impl Summary {
    /// Human one-liner for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} cells ({} empty, {} type-locked, {} byte-locked): {}/{} bytes ({:.1}% used, median {:.1}%), {} bytes wasted",
            self.cells,
            self.empty_cells,
            self.type_locked,
            self.byte_locked,
            self.bytes_used,
            self.bytes_total,
            self.byte_utilization * 100.0,
            self.median_byte_utilization * 100.0,
            self.wasted_bytes
        )
    }
}

/// Produce a [`Summary`] for a set of records. Empty input yields a
/// zero-valued summary.
pub fn summarize(cells: &[CellRecord]) -> Summary {
    let mut summary = Summary {
        cells: cells.len(),
        ..Summary::default()
    };

    for cell in cells {
        if cell.is_empty() {
            summary.empty_cells += 1;
        }
        if cell.is_type_locked() {
            summary.type_locked += 1;
        }
        if cell.is_byte_locked() {
            summary.byte_locked += 1;
        }
        summary.bytes_total += cell.bytes_total;
        summary.bytes_used += cell.bytes_used;
        summary.bytes_free += cell.bytes_free();
        summary.types_total += cell.types_total as u64;
        summary.types_used += cell.types_used as u64;
        summary.types_free += cell.types_free() as u64;
        summary.wasted_bytes += cell.wasted_bytes();
    }

    summary.byte_utilization = ratio(summary.bytes_used, summary.bytes_total);
    summary.type_utilization = ratio(summary.types_used, summary.types_total);

    let utilizations: Vec<f64> = cells.iter().map(|c| c.byte_utilization()).collect();
    summary.median_byte_utilization = percentile(&utilizations, 0.5);

    summary
}

fn ratio(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64
    }
}

/// Percentile with linear interpolation between the two nearest ranks.
///
/// For rank `p` over the sorted values of length `n`, interpolates between
/// positions `floor(p*(n-1))` and `ceil(p*(n-1))`. Empty input yields 0.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let p = p.clamp(0.0, 1.0);
    let idx = p * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let weight = idx - lo as f64;
        sorted[lo] * (1.0 - weight) + sorted[hi] * weight
    }
}

/// Bucket records by "same kind of cell". Deterministic iteration order.
pub fn group_by_type<'a>(cells: &'a [CellRecord]) -> BTreeMap<CellKey, Vec<&'a CellRecord>> {
    let mut groups: BTreeMap<CellKey, Vec<&CellRecord>> = BTreeMap::new();
    for cell in cells {
        groups.entry(cell.key()).or_default().push(cell);
    }
    groups
}

/// Records storing one value class.
pub fn filter_by_kind(cells: &[CellRecord], kind: ValueKind) -> Vec<&CellRecord> {
    cells.iter().filter(|c| c.kind == kind).collect()
}

/// Cells whose type budget is exactly one.
pub fn filter_singularity(cells: &[CellRecord]) -> Vec<&CellRecord> {
    cells.iter().filter(|c| c.is_singularity()).collect()
}

/// Cells whose type budget is more than one.
pub fn filter_non_singularity(cells: &[CellRecord]) -> Vec<&CellRecord> {
    cells.iter().filter(|c| !c.is_singularity()).collect()
}

/// Groups of two or more partitioned cells configured to accept the exact
/// same restricted set of entries for the same value class — a likely
/// misconfiguration worth flagging.
pub fn find_duplicate_partitioned_cells(cells: &[CellRecord]) -> Vec<Vec<&CellRecord>> {
    let mut groups: BTreeMap<String, Vec<&CellRecord>> = BTreeMap::new();

    for cell in cells.iter().filter(|c| c.partitioned) {
        let mut names = cell.partition_names.clone();
        names.sort();
        let signature = format!("{}|{}", names.join(","), cell.kind);
        groups.entry(signature).or_default().push(cell);
    }

    groups
        .into_values()
        .filter(|members| members.len() >= 2)
        .collect()
}

/// Type-locked cells ranked by stranded bytes, most wasteful first.
pub fn get_top_fragmented(cells: &[CellRecord], limit: usize) -> Vec<&CellRecord> {
    let mut fragmented: Vec<&CellRecord> =
        cells.iter().filter(|c| c.is_type_locked()).collect();
    fragmented.sort_by(|a, b| b.wasted_bytes().cmp(&a.wasted_bytes()));
    fragmented.truncate(limit);
    fragmented
}
