//! Cellnet Core Library
//!
//! Core abstractions for the cellnet storage defragmentation engine.
//! This crate provides:
//! - Stored value entries (`Entry`, `EntryId`) and the closed set of
//!   storable value classes (`ValueKind`)
//! - Point-in-time cell snapshots (`CellRecord`, `CellKey`)
//! - Capability traits at the network boundary (`StorageMonitor`,
//!   `CellHost`, `CellInventory`, `StorageNetwork`)
//! - Common error handling

pub mod capability;
pub mod cell;
pub mod entry;
pub mod error;

pub use capability::{ActionMode, CellHost, CellInventory, StorageMonitor, StorageNetwork};
pub use cell::{CellKey, CellRecord, CellStatus, DeviceKind};
pub use entry::{Entry, EntryId, ValueKind};
pub use error::{CellNetError, Result};
