//! Logging facilities for Horizon Collection.
//!
//! This module provides:
//! - Integration with the `tracing` crate for structured logging
//! - Target and span names for filtering each subsystem
//! - Performance tracing hooks for profiling layout and update batches
//!
//! # Tracing Integration
//!
//! Horizon Collection uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_collection::layout=debug")
//!         .init();
//! }
//! ```

/// Span names used throughout Horizon Collection for tracing.
pub mod span_names {
    /// A full grid layout pass.
    pub const LAYOUT_PASS: &str = "horizon_collection::layout_pass";
    /// Sticky header repositioning.
    pub const PINNING: &str = "horizon_collection::pinning";
    /// Flushing an update batch to the host view.
    pub const BATCH_FLUSH: &str = "horizon_collection::batch_flush";
    /// Building the per-section metrics snapshot.
    pub const SNAPSHOT: &str = "horizon_collection::snapshot";
    /// Signal emission span.
    pub const SIGNAL: &str = "horizon_collection::signal";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_collection_core";
    /// Generic state machine transitions.
    pub const STATE: &str = "horizon_collection::state";
    /// Content loading and load tokens.
    pub const LOAD: &str = "horizon_collection::load";
    /// Data-source tree mutation and notification routing.
    pub const DATA_SOURCE: &str = "horizon_collection::data_source";
    /// Section mapping between local and global space.
    pub const MAPPING: &str = "horizon_collection::mapping";
    /// Placeholder resolution.
    pub const PLACEHOLDER: &str = "horizon_collection::placeholder";
    /// Grid layout.
    pub const LAYOUT: &str = "horizon_collection::layout";
    /// Signal/slot system.
    pub const SIGNAL: &str = "horizon_collection_core::signal";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_collection::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns.
///
/// These are thin wrappers around the `tracing` macros with consistent target naming.
#[macro_export]
macro_rules! collection_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_collection", $($arg)*)
    };
}

#[macro_export]
macro_rules! collection_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_collection", $($arg)*)
    };
}

#[macro_export]
macro_rules! collection_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_collection", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let _span = PerfSpan::new("test_operation");
        collection_trace!(value = 1, "inside perf span");
        collection_warn!(value = 2, "warning inside perf span");
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [
            targets::STATE,
            targets::LOAD,
            targets::DATA_SOURCE,
            targets::MAPPING,
            targets::PLACEHOLDER,
            targets::LAYOUT,
        ] {
            assert!(target.starts_with("horizon_collection::"));
        }
    }
}
