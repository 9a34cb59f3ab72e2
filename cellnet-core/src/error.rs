//! Error types for cellnet
//!
//! Provides a unified error type for all cellnet operations.

use crate::entry::ValueKind;
use thiserror::Error;

/// Result type alias for cellnet operations
pub type Result<T> = std::result::Result<T, CellNetError>;

/// Unified error type for cellnet
#[derive(Error, Debug)]
pub enum CellNetError {
    // ===== Scan Errors =====
    #[error("Cell probe failed: {0}")]
    CellProbe(String),

    #[error("Device unreachable: {0}")]
    DeviceUnreachable(String),

    // ===== Monitor Errors =====
    #[error("No monitor for value kind: {0}")]
    MonitorUnavailable(ValueKind),

    #[error("Storage backend error: {0}")]
    Storage(String),

    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ===== Generic Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CellNetError::MonitorUnavailable(ValueKind::Fluid);
        assert_eq!(err.to_string(), "No monitor for value kind: fluid");
    }

    #[test]
    fn test_probe_error_carries_context() {
        let err = CellNetError::CellProbe("drive-3 slot 2".to_string());
        assert!(err.to_string().contains("drive-3"));
    }
}
