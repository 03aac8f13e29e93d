//! Wire-level report codec error types.
//!
//! These are all best-effort conditions: a malformed report is logged and
//! dropped, and the device keeps running with its previous snapshot.

use crate::Severity;

/// Errors raised while decoding or encoding HID reports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    /// Input report shorter than the family's wire format requires.
    #[error("Malformed {family} report: got {actual} bytes, want {expected}")]
    Malformed {
        /// Family name for logging
        family: &'static str,
        /// Bytes received
        actual: usize,
        /// Bytes the format requires
        expected: usize,
    },

    /// Input report carried an id the family codec does not know.
    #[error("Unexpected {family} report id: {id:#04x}")]
    UnexpectedReportId {
        /// Family name for logging
        family: &'static str,
        /// Report id byte
        id: u8,
    },

    /// Feature report size did not match the requested report.
    #[error("{family} feature report {id:#04x} size mismatch: got {actual}, want {expected}")]
    FeatureSizeMismatch {
        /// Family name for logging
        family: &'static str,
        /// Feature report id
        id: u8,
        /// Bytes received
        actual: usize,
        /// Bytes the format requires
        expected: usize,
    },

    /// A usage-page/usage pair the codec does not map.
    #[error("Unknown usage: page {page:#06x}, usage {usage:#06x}")]
    UnknownUsage {
        /// HID usage page
        page: u16,
        /// HID usage within the page
        usage: u16,
    },

    /// Reader ran past the end of the report buffer.
    #[error("Report truncated at offset {offset}, len {len}")]
    Truncated {
        /// Offset of the failed read
        offset: usize,
        /// Total buffer length
        len: usize,
    },
}

impl ReportError {
    /// Get the error severity.
    pub fn severity(&self) -> Severity {
        match self {
            ReportError::Malformed { .. } => Severity::Warning,
            ReportError::UnexpectedReportId { .. } => Severity::Warning,
            ReportError::FeatureSizeMismatch { .. } => Severity::Warning,
            ReportError::UnknownUsage { .. } => Severity::Info,
            ReportError::Truncated { .. } => Severity::Warning,
        }
    }

    /// Create a malformed-report error.
    pub fn malformed(family: &'static str, actual: usize, expected: usize) -> Self {
        ReportError::Malformed {
            family,
            actual,
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_usage_is_informational() {
        let e = ReportError::UnknownUsage {
            page: 0x0c,
            usage: 0x0224,
        };
        assert_eq!(e.severity(), Severity::Info);
    }

    #[test]
    fn malformed_message_names_family() {
        let e = ReportError::malformed("switch", 11, 12);
        assert!(e.to_string().contains("switch"));
    }
}
