//! In-memory storage network
//!
//! Used for testing and development. Not persistent.
//!
//! The router is deliberately simple: partitioned cells that accept an
//! entry are filled before unpartitioned ones, in device order, honoring
//! each cell's byte and distinct-type budgets. Simulated calls compute the
//! same routing without mutating anything, so simulate-then-commit pairs
//! agree unless state changed in between.

use cellnet_core::{
    ActionMode, CellHost, CellInventory, CellNetError, CellStatus, DeviceKind, Entry, EntryId,
    Result, StorageMonitor, StorageNetwork, ValueKind,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// One storage cell with byte and distinct-type budgets.
#[derive(Debug, Clone)]
pub struct MemoryCell {
    kind: ValueKind,
    cell_item: String,
    variant: u32,
    bytes_total: u64,
    types_total: u32,
    partition_names: Vec<String>,
    contents: BTreeMap<EntryId, u64>,
}

impl MemoryCell {
    /// Create an empty cell.
    pub fn new(
        kind: ValueKind,
        cell_item: impl Into<String>,
        bytes_total: u64,
        types_total: u32,
    ) -> Self {
        Self {
            kind,
            cell_item: cell_item.into(),
            variant: 0,
            bytes_total,
            types_total,
            partition_names: Vec::new(),
            contents: BTreeMap::new(),
        }
    }

    /// Restrict the cell to a fixed set of entry names.
    pub fn with_partition(mut self, names: &[&str]) -> Self {
        self.partition_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Set the cell item variant.
    pub fn with_variant(mut self, variant: u32) -> Self {
        self.variant = variant;
        self
    }

    fn bytes_used(&self) -> u64 {
        self.contents
            .iter()
            .map(|(id, amount)| amount * id.kind.bytes_per_unit())
            .sum()
    }

    fn types_used(&self) -> u32 {
        self.contents.len() as u32
    }

    fn bytes_free(&self) -> u64 {
        self.bytes_total.saturating_sub(self.bytes_used())
    }

    fn is_partitioned(&self) -> bool {
        !self.partition_names.is_empty()
    }

    fn accepts(&self, id: &EntryId) -> bool {
        if id.kind != self.kind {
            return false;
        }
        self.partition_names.is_empty() || self.partition_names.iter().any(|n| *n == id.name)
    }

    /// Units of `id` this cell could still take.
    fn capacity_for(&self, id: &EntryId) -> u64 {
        if !self.accepts(id) {
            return 0;
        }
        if !self.contents.contains_key(id) && self.types_used() >= self.types_total {
            return 0;
        }
        self.bytes_free() / id.kind.bytes_per_unit()
    }

    fn insert(&mut self, id: &EntryId, amount: u64) {
        if amount > 0 {
            *self.contents.entry(id.clone()).or_insert(0) += amount;
        }
    }

    fn remove(&mut self, id: &EntryId, amount: u64) -> u64 {
        let Some(held) = self.contents.get_mut(id) else {
            return 0;
        };
        let taken = amount.min(*held);
        *held -= taken;
        if *held == 0 {
            self.contents.remove(id);
        }
        taken
    }

    fn status(&self) -> CellStatus {
        CellStatus {
            cell_item: self.cell_item.clone(),
            variant: self.variant,
            bytes_total: self.bytes_total,
            bytes_used: self.bytes_used(),
            types_total: self.types_total,
            types_used: self.types_used(),
            partition_names: self.partition_names.clone(),
        }
    }
}

#[derive(Debug)]
struct MemoryDevice {
    kind: DeviceKind,
    location: String,
    cells: Vec<Option<MemoryCell>>,
}

#[derive(Debug, Default)]
struct NetworkState {
    devices: Vec<MemoryDevice>,
    maintenance_owner: Option<String>,
}

impl NetworkState {
    fn cells(&self) -> impl Iterator<Item = &MemoryCell> {
        self.devices
            .iter()
            .flat_map(|d| d.cells.iter())
            .filter_map(|c| c.as_ref())
    }

    fn cells_mut(&mut self) -> impl Iterator<Item = &mut MemoryCell> {
        self.devices
            .iter_mut()
            .flat_map(|d| d.cells.iter_mut())
            .filter_map(|c| c.as_mut())
    }

    /// Route an injection; returns the remainder that found no home.
    fn inject(&mut self, stack: &Entry, commit: bool) -> u64 {
        let mut remaining = stack.amount;
        // Partitioned cells get first refusal, then general-purpose ones.
        for partitioned_pass in [true, false] {
            if remaining == 0 {
                break;
            }
            for cell in self.cells_mut() {
                if cell.is_partitioned() != partitioned_pass {
                    continue;
                }
                let take = remaining.min(cell.capacity_for(&stack.id));
                if take > 0 {
                    if commit {
                        cell.insert(&stack.id, take);
                    }
                    remaining -= take;
                }
                if remaining == 0 {
                    break;
                }
            }
        }
        remaining
    }

    /// Pull up to `request.amount` of one identity; returns the amount taken.
    fn extract(&mut self, request: &Entry, commit: bool) -> u64 {
        let mut taken = 0;
        for cell in self.cells_mut() {
            if taken == request.amount {
                break;
            }
            let want = request.amount - taken;
            if commit {
                taken += cell.remove(&request.id, want);
            } else {
                taken += want.min(cell.contents.get(&request.id).copied().unwrap_or(0));
            }
        }
        taken
    }

    fn holdings(&self, kind: ValueKind) -> Vec<Entry> {
        let mut totals: BTreeMap<EntryId, u64> = BTreeMap::new();
        for cell in self.cells().filter(|c| c.kind == kind) {
            for (id, amount) in &cell.contents {
                *totals.entry(id.clone()).or_insert(0) += amount;
            }
        }
        totals
            .into_iter()
            .map(|(id, amount)| Entry::new(id, amount))
            .collect()
    }

    fn device_index(&self, location: &str) -> Result<usize> {
        self.devices
            .iter()
            .position(|d| d.location == location)
            .ok_or_else(|| CellNetError::DeviceUnreachable(location.to_string()))
    }
}

/// In-memory storage network
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<RwLock<NetworkState>>,
}

impl MemoryNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a cell-hosting device with the given number of slots.
    pub fn add_device(&self, kind: DeviceKind, location: &str, slots: usize) {
        let mut state = self.state.write();
        state.devices.push(MemoryDevice {
            kind,
            location: location.to_string(),
            cells: (0..slots).map(|_| None).collect(),
        });
    }

    /// Install a cell into a device slot.
    pub fn install_cell(&self, location: &str, slot: usize, cell: MemoryCell) -> Result<()> {
        let mut state = self.state.write();
        let device = state.device_index(location)?;
        let slots = &mut state.devices[device].cells;
        match slots.get_mut(slot) {
            Some(opening) => {
                if opening.is_some() {
                    return Err(CellNetError::Internal(format!(
                        "slot {slot} of {location} already holds a cell"
                    )));
                }
                *opening = Some(cell);
                Ok(())
            }
            None => Err(CellNetError::Internal(format!(
                "{location} has no slot {slot}"
            ))),
        }
    }

    /// Fill a specific cell directly, bypassing the router. Test setup only.
    ///
    /// Returns the amount actually placed, bounded by the cell's budgets.
    pub fn seed(&self, location: &str, slot: usize, entry: &Entry) -> Result<u64> {
        let mut state = self.state.write();
        let device = state.device_index(location)?;
        let cell = state.devices[device]
            .cells
            .get_mut(slot)
            .and_then(|c| c.as_mut())
            .ok_or_else(|| CellNetError::Internal(format!("{location} slot {slot} is empty")))?;
        let placed = entry.amount.min(cell.capacity_for(&entry.id));
        cell.insert(&entry.id, placed);
        Ok(placed)
    }

    /// Network-wide total of one identity. Test helper.
    pub fn total_of(&self, id: &EntryId) -> u64 {
        let state = self.state.read();
        state
            .cells()
            .map(|c| c.contents.get(id).copied().unwrap_or(0))
            .sum()
    }

    /// Current holder of the maintenance lock, if any. Test helper.
    pub fn maintenance_owner(&self) -> Option<String> {
        self.state.read().maintenance_owner.clone()
    }
}

impl CellInventory for MemoryNetwork {
    fn hosts(&self) -> Vec<Arc<dyn CellHost>> {
        let state = self.state.read();
        (0..state.devices.len())
            .map(|device| {
                Arc::new(MemoryHost {
                    state: self.state.clone(),
                    device,
                }) as Arc<dyn CellHost>
            })
            .collect()
    }
}

impl StorageNetwork for MemoryNetwork {
    fn monitor(&self, kind: ValueKind) -> Option<Arc<dyn StorageMonitor>> {
        Some(Arc::new(MemoryMonitor {
            state: self.state.clone(),
            kind,
        }))
    }

    fn try_acquire_maintenance(&self, owner: &str) -> bool {
        let mut state = self.state.write();
        match &state.maintenance_owner {
            None => {
                state.maintenance_owner = Some(owner.to_string());
                true
            }
            Some(current) => current == owner,
        }
    }

    fn release_maintenance(&self, owner: &str) {
        let mut state = self.state.write();
        if state.maintenance_owner.as_deref() == Some(owner) {
            state.maintenance_owner = None;
        }
    }
}

struct MemoryHost {
    state: Arc<RwLock<NetworkState>>,
    device: usize,
}

impl CellHost for MemoryHost {
    fn device_kind(&self) -> DeviceKind {
        self.state.read().devices[self.device].kind
    }

    fn location(&self) -> String {
        self.state.read().devices[self.device].location.clone()
    }

    fn slot_count(&self) -> usize {
        self.state.read().devices[self.device].cells.len()
    }

    fn cell_status(&self, slot: usize, kind: ValueKind) -> Result<Option<CellStatus>> {
        let state = self.state.read();
        let cell = state.devices[self.device].cells.get(slot).and_then(|c| c.as_ref());
        match cell {
            Some(c) if c.kind == kind => Ok(Some(c.status())),
            _ => Ok(None),
        }
    }
}

struct MemoryMonitor {
    state: Arc<RwLock<NetworkState>>,
    kind: ValueKind,
}

impl StorageMonitor for MemoryMonitor {
    fn entries(&self) -> Vec<Entry> {
        self.state.read().holdings(self.kind)
    }

    fn extract(&self, request: &Entry, mode: ActionMode) -> Result<Option<Entry>> {
        if request.id.kind != self.kind || request.amount == 0 {
            return Ok(None);
        }
        let commit = mode == ActionMode::Modulate;
        let taken = self.state.write().extract(request, commit);
        if commit && taken > 0 {
            debug!(entry = %request.id, amount = taken, "extracted");
        }
        if taken == 0 {
            Ok(None)
        } else {
            Ok(Some(request.with_amount(taken)))
        }
    }

    fn inject(&self, stack: &Entry, mode: ActionMode) -> Result<Option<Entry>> {
        if stack.id.kind != self.kind || stack.amount == 0 {
            return Ok(None);
        }
        let commit = mode == ActionMode::Modulate;
        let remainder = self.state.write().inject(stack, commit);
        if commit {
            debug!(entry = %stack.id, amount = stack.amount - remainder, "injected");
        }
        if remainder == 0 {
            Ok(None)
        } else {
            Ok(Some(stack.with_amount(remainder)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> EntryId {
        EntryId::new(name, ValueKind::Item)
    }

    fn network_with_cell(bytes: u64, types: u32) -> MemoryNetwork {
        let network = MemoryNetwork::new();
        network.add_device(DeviceKind::Drive, "drive-0", 10);
        network
            .install_cell(
                "drive-0",
                0,
                MemoryCell::new(ValueKind::Item, "4k Storage Cell", bytes, types),
            )
            .unwrap();
        network
    }

    #[test]
    fn test_inject_extract_roundtrip() {
        let network = network_with_cell(4096, 63);
        let monitor = network.monitor(ValueKind::Item).unwrap();
        let stack = Entry::new(item("Iron Ingot"), 64);

        assert!(monitor.inject(&stack, ActionMode::Modulate).unwrap().is_none());
        assert_eq!(network.total_of(&stack.id), 64);

        let out = monitor
            .extract(&stack, ActionMode::Modulate)
            .unwrap()
            .unwrap();
        assert_eq!(out.amount, 64);
        assert_eq!(network.total_of(&stack.id), 0);
    }

    #[test]
    fn test_simulate_has_no_side_effect() {
        let network = network_with_cell(4096, 63);
        let monitor = network.monitor(ValueKind::Item).unwrap();
        let stack = Entry::new(item("Gold Ingot"), 10);
        network.seed("drive-0", 0, &stack).unwrap();

        let sim = monitor
            .extract(&stack, ActionMode::Simulate)
            .unwrap()
            .unwrap();
        assert_eq!(sim.amount, 10);
        assert_eq!(network.total_of(&stack.id), 10);

        assert!(monitor.inject(&stack, ActionMode::Simulate).unwrap().is_none());
        assert_eq!(network.total_of(&stack.id), 10);
    }

    #[test]
    fn test_byte_budget_produces_remainder() {
        let network = network_with_cell(100, 63);
        let monitor = network.monitor(ValueKind::Item).unwrap();
        let stack = Entry::new(item("Cobblestone"), 150);

        let remainder = monitor
            .inject(&stack, ActionMode::Modulate)
            .unwrap()
            .unwrap();
        assert_eq!(remainder.amount, 50);
        assert_eq!(network.total_of(&stack.id), 100);
    }

    #[test]
    fn test_type_budget_refuses_new_identity() {
        let network = network_with_cell(4096, 1);
        let monitor = network.monitor(ValueKind::Item).unwrap();

        assert!(monitor
            .inject(&Entry::new(item("Iron Ingot"), 1), ActionMode::Modulate)
            .unwrap()
            .is_none());
        // Second distinct identity has no free type slot.
        let remainder = monitor
            .inject(&Entry::new(item("Gold Ingot"), 1), ActionMode::Modulate)
            .unwrap()
            .unwrap();
        assert_eq!(remainder.amount, 1);
    }

    #[test]
    fn test_partitioned_cells_fill_first() {
        let network = MemoryNetwork::new();
        network.add_device(DeviceKind::Drive, "drive-0", 2);
        network
            .install_cell(
                "drive-0",
                0,
                MemoryCell::new(ValueKind::Item, "1k Storage Cell", 1024, 63),
            )
            .unwrap();
        network
            .install_cell(
                "drive-0",
                1,
                MemoryCell::new(ValueKind::Item, "1k Storage Cell", 1024, 63)
                    .with_partition(&["Iron Ingot"]),
            )
            .unwrap();

        let monitor = network.monitor(ValueKind::Item).unwrap();
        monitor
            .inject(&Entry::new(item("Iron Ingot"), 100), ActionMode::Modulate)
            .unwrap();

        // The partitioned cell in slot 1 takes the stack even though slot 0
        // comes first in device order.
        let scanner_view = network.hosts();
        let status = scanner_view[0]
            .cell_status(1, ValueKind::Item)
            .unwrap()
            .unwrap();
        assert_eq!(status.bytes_used, 100);
    }

    #[test]
    fn test_partition_filter_rejects_other_names() {
        let network = MemoryNetwork::new();
        network.add_device(DeviceKind::Chest, "chest-0", 1);
        network
            .install_cell(
                "chest-0",
                0,
                MemoryCell::new(ValueKind::Item, "1k Storage Cell", 1024, 63)
                    .with_partition(&["Iron Ingot"]),
            )
            .unwrap();

        let monitor = network.monitor(ValueKind::Item).unwrap();
        let remainder = monitor
            .inject(&Entry::new(item("Gold Ingot"), 5), ActionMode::Modulate)
            .unwrap()
            .unwrap();
        assert_eq!(remainder.amount, 5);
    }

    #[test]
    fn test_maintenance_lock_single_owner() {
        let network = MemoryNetwork::new();
        assert!(network.try_acquire_maintenance("task-a"));
        assert!(!network.try_acquire_maintenance("task-b"));
        // Reentrant for the same owner.
        assert!(network.try_acquire_maintenance("task-a"));

        network.release_maintenance("task-b");
        assert_eq!(network.maintenance_owner().as_deref(), Some("task-a"));

        network.release_maintenance("task-a");
        assert!(network.try_acquire_maintenance("task-b"));
    }

    #[test]
    fn test_holdings_aggregate_across_cells() {
        let network = MemoryNetwork::new();
        network.add_device(DeviceKind::Drive, "drive-0", 2);
        for slot in 0..2 {
            network
                .install_cell(
                    "drive-0",
                    slot,
                    MemoryCell::new(ValueKind::Item, "1k Storage Cell", 1024, 63),
                )
                .unwrap();
            network
                .seed("drive-0", slot, &Entry::new(item("Iron Ingot"), 30))
                .unwrap();
        }

        let monitor = network.monitor(ValueKind::Item).unwrap();
        let holdings = monitor.entries();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].amount, 60);
    }
}
