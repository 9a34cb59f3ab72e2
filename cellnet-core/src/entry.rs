//! Stored value entries
//!
//! An `Entry` is one kind-and-quantity of stored value (an item stack, a
//! fluid volume). `EntryId` is the identity half of an entry: grouping and
//! report keys compare identities, never quantities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of value classes a network can store.
///
/// Each variant carries its own accounting behavior; the engine probes and
/// snapshots per kind rather than dispatching over an open registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Item,
    Fluid,
}

impl ValueKind {
    /// All known value kinds, in probe order.
    pub const ALL: [ValueKind; 2] = [ValueKind::Item, ValueKind::Fluid];

    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            ValueKind::Item => "item",
            ValueKind::Fluid => "fluid",
        }
    }

    /// Bytes consumed per stored unit of this kind.
    pub fn bytes_per_unit(&self) -> u64 {
        match self {
            ValueKind::Item => 1,
            ValueKind::Fluid => 1,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of a stored value, excluding quantity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId {
    /// Registered name of the value (e.g. "Iron Ingot")
    pub name: String,
    /// Metadata / variant discriminator
    pub variant: u32,
    /// Value class this entry belongs to
    pub kind: ValueKind,
}

impl EntryId {
    /// Create an identity with variant 0.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            variant: 0,
            kind,
        }
    }

    /// Create an identity with an explicit variant.
    pub fn with_variant(name: impl Into<String>, variant: u32, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            variant,
            kind,
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variant == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.name, self.variant)
        }
    }
}

/// One kind-and-quantity of stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub amount: u64,
}

impl Entry {
    /// Create a new entry.
    pub fn new(id: EntryId, amount: u64) -> Self {
        Self { id, amount }
    }

    /// Copy of this entry with a different amount.
    pub fn with_amount(&self, amount: u64) -> Self {
        Self {
            id: self.id.clone(),
            amount,
        }
    }

    /// True when the entry carries no quantity.
    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    /// Bytes this entry occupies in a cell.
    pub fn byte_size(&self) -> u64 {
        self.amount * self.id.kind.bytes_per_unit()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.id, self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_identity_excludes_amount() {
        let a = Entry::new(EntryId::new("Iron Ingot", ValueKind::Item), 64);
        let b = a.with_amount(1);
        assert_eq!(a.id, b.id);
        assert_ne!(a, b);
    }

    #[test]
    fn test_entry_id_variant_distinguishes() {
        let plain = EntryId::new("Log", ValueKind::Item);
        let birch = EntryId::with_variant("Log", 2, ValueKind::Item);
        assert_ne!(plain, birch);
        assert_eq!(birch.to_string(), "Log:2");
    }

    #[test]
    fn test_entry_display() {
        let e = Entry::new(EntryId::new("Water", ValueKind::Fluid), 4000);
        assert_eq!(e.to_string(), "Water x4000");
    }

    #[test]
    fn test_value_kind_probe_order() {
        assert_eq!(ValueKind::ALL[0], ValueKind::Item);
        assert_eq!(ValueKind::ALL.len(), 2);
    }
}
