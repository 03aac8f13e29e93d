//! Centralized error types for the padhost Bluetooth HID host.
//!
//! The failure unit of the host is a single device: no error defined here is
//! ever fatal to the process. Registry and lifecycle errors live in
//! [`device`], wire-level codec errors in [`report`].

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod device;
pub mod report;

pub use device::DeviceError;
pub use report::ReportError;

/// Top-level error type wrapping all padhost sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum PadHostError {
    /// Device registry and lifecycle errors
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Report codec errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PadHostError {
    /// Get the error severity level.
    pub fn severity(&self) -> Severity {
        match self {
            PadHostError::Device(e) => e.severity(),
            PadHostError::Report(e) => e.severity(),
            PadHostError::Config(_) => Severity::Error,
        }
    }

    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        PadHostError::Config(msg.into())
    }
}

/// Error severity for logging and triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Expected condition, logged for visibility only
    Info,
    /// Degraded but self-healing (dropped report, forced FSM advance)
    Warning,
    /// Operation failed; the device involved may be torn down
    Error,
}

/// A specialized `Result` type for padhost operations.
pub type PadHostResult<T> = std::result::Result<T, PadHostError>;
