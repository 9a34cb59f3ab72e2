//! Cellnet in-memory storage network
//!
//! A self-contained [`cellnet_core::StorageNetwork`] implementation backed
//! by plain data structures. Used for testing and the demo driver. Not
//! persistent.

pub mod memory;

pub use memory::{MemoryCell, MemoryNetwork};
