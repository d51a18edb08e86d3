//! Error types for the lockhint workspace.
//!
//! The hint layer is advisory: most degraded conditions (unavailable tables,
//! stale or torn hints, malformed tunables) are handled in place by falling
//! back to passthrough behavior and are deliberately *not* represented here.
//! `HintError` covers the few operations that can genuinely fail, all of
//! them at initialization time.

use thiserror::Error;

/// Errors surfaced by lockhint initialization paths.
#[derive(Error, Debug)]
pub enum HintError {
    /// The process-wide hint context was initialized twice.
    #[error("hint context already initialized")]
    AlreadyInitialized,

    /// A policy or shim operation required tables that were never configured.
    #[error("hint tables not configured")]
    TablesUnavailable,

    /// The scheduling policy was constructed for a nonsensical CPU count.
    #[error("invalid CPU count: {nr_cpus}")]
    InvalidCpuCount {
        /// The rejected CPU count.
        nr_cpus: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            HintError::AlreadyInitialized.to_string(),
            "hint context already initialized"
        );
        assert_eq!(
            HintError::TablesUnavailable.to_string(),
            "hint tables not configured"
        );
        assert_eq!(
            HintError::InvalidCpuCount { nr_cpus: 0 }.to_string(),
            "invalid CPU count: 0"
        );
    }
}
