//! Device registry and lifecycle error types.

use crate::Severity;

/// Errors raised by the device registry and per-device lifecycle machinery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// Every slot in the fixed device pool is occupied.
    #[error("Device pool exhausted")]
    PoolExhausted,

    /// Virtual (child) devices are disabled by configuration.
    #[error("Virtual devices are disabled")]
    VirtualDisabled,

    /// A handle referred to a slot that has since been recycled.
    #[error("Stale device handle: slot {index} is at generation {current}, handle carried {held}")]
    StaleHandle {
        /// Slot index the handle pointed at
        index: u8,
        /// Generation currently stored in the slot
        current: u32,
        /// Generation the handle carried
        held: u32,
    },

    /// No device matched the lookup key.
    #[error("Device not found: {0}")]
    NotFound(String),

    /// The application vetoed the device during the ready callback.
    #[error("Application vetoed device at slot {0}")]
    ApplicationVeto(u8),

    /// A lifecycle transition was requested twice.
    #[error("Duplicate lifecycle transition: {0}")]
    DoubleStateTransition(&'static str),

    /// A device was asked to re-bind its controller family.
    #[error("Device already bound to family {0}")]
    AlreadyBound(&'static str),

    /// The device never reached the ready state before the guard timer fired.
    #[error("Device at slot {index} timed out after {timeout_ms}ms before becoming ready")]
    ConnectionTimeout {
        /// Slot index of the device
        index: u8,
        /// Guard timeout in milliseconds
        timeout_ms: u64,
    },
}

impl DeviceError {
    /// Get the error severity.
    pub fn severity(&self) -> Severity {
        match self {
            DeviceError::PoolExhausted => Severity::Error,
            DeviceError::VirtualDisabled => Severity::Info,
            DeviceError::StaleHandle { .. } => Severity::Warning,
            DeviceError::NotFound(_) => Severity::Error,
            DeviceError::ApplicationVeto(_) => Severity::Info,
            DeviceError::DoubleStateTransition(_) => Severity::Error,
            DeviceError::AlreadyBound(_) => Severity::Error,
            DeviceError::ConnectionTimeout { .. } => Severity::Warning,
        }
    }

    /// Create a not-found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        DeviceError::NotFound(key.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn veto_is_expected_condition() {
        assert_eq!(DeviceError::ApplicationVeto(3).severity(), Severity::Info);
    }

    #[test]
    fn stale_handle_is_self_healing() {
        let e = DeviceError::StaleHandle {
            index: 1,
            current: 4,
            held: 3,
        };
        assert_eq!(e.severity(), Severity::Warning);
        assert!(e.to_string().contains("generation 4"));
    }
}
