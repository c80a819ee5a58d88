//! Error types for Horizon Collection.

use std::fmt;
use std::sync::Arc;

/// Result type alias for collection operations.
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Errors that can occur in the data-source tree, the load state machine, or the
/// grid layout.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollectionError {
    /// A state machine rejected a transition and no substitute state was offered.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// A notification arrived from a node that is no longer attached to the
    /// tree presented to the host view.
    #[error("Stale notification from detached data source {node}")]
    StaleNotification { node: String },

    /// An index was outside the current bounds.
    #[error("{context}: index {index} out of range (len {len})")]
    IndexOutOfRange {
        context: &'static str,
        index: usize,
        len: usize,
    },

    /// Items were mutated outside an update batch.
    #[error("{operation} called outside of a perform_update batch")]
    ConcurrentMutation { operation: &'static str },

    /// A measurement callback returned an unusable size.
    #[error("Measurement of {element} returned unusable height {height}, using {fallback}")]
    MeasurementFailure {
        element: String,
        height: f32,
        fallback: f32,
    },

    /// A content load finished with an error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// The data source handle does not refer to a live node.
    #[error("Unknown data source {0}")]
    UnknownDataSource(String),

    /// A composition change would break the tree (cycles, double parents).
    #[error("Invalid composition: {0}")]
    InvalidComposition(String),

    /// The layout no longer matches the data source; the host must reload.
    #[error("Layout is inconsistent with the data source: {0}")]
    InconsistentLayout(String),
}

impl CollectionError {
    /// Create an invalid transition error from any two debuggable states.
    pub fn invalid_transition(from: impl fmt::Debug, to: impl fmt::Debug) -> Self {
        Self::InvalidTransition {
            from: format!("{from:?}"),
            to: format!("{to:?}"),
        }
    }

    /// Create a stale notification error.
    pub fn stale_notification(node: impl fmt::Debug) -> Self {
        Self::StaleNotification {
            node: format!("{node:?}"),
        }
    }

    /// Create an index out of range error.
    pub fn index_out_of_range(context: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            context,
            index,
            len,
        }
    }

    /// Create a concurrent mutation error.
    pub fn concurrent_mutation(operation: &'static str) -> Self {
        Self::ConcurrentMutation { operation }
    }

    /// Create a measurement failure record.
    pub fn measurement_failure(element: impl Into<String>, height: f32, fallback: f32) -> Self {
        Self::MeasurementFailure {
            element: element.into(),
            height,
            fallback,
        }
    }

    /// Create an unknown data source error.
    pub fn unknown_data_source(node: impl fmt::Debug) -> Self {
        Self::UnknownDataSource(format!("{node:?}"))
    }

    /// Create an invalid composition error.
    pub fn invalid_composition(message: impl Into<String>) -> Self {
        Self::InvalidComposition(message.into())
    }

    /// Create an inconsistent layout error.
    pub fn inconsistent_layout(message: impl Into<String>) -> Self {
        Self::InconsistentLayout(message.into())
    }

    /// Whether this error indicates a programming mistake in the caller rather
    /// than a runtime condition.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfRange { .. } | Self::ConcurrentMutation { .. }
        )
    }

    /// Report a programming error.
    ///
    /// Panics in debug builds. In release builds the error is logged and
    /// handed back so the caller can drop the offending operation.
    #[track_caller]
    pub fn debug_fatal(self) -> Self {
        tracing::warn!(target: "horizon_collection_core", error = %self, "dropping invalid operation");
        debug_assert!(false, "{self}");
        self
    }
}

/// A user-supplied error recorded when a content load fails.
///
/// Cheap to clone; the underlying source is shared.
#[derive(Clone)]
pub struct LoadError {
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl LoadError {
    /// Create a load error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a load error wrapping an underlying error.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// The human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadError")
            .field("message", &self.message)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for LoadError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Offline;

    impl fmt::Display for Offline {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "network offline")
        }
    }

    impl std::error::Error for Offline {}

    #[test]
    fn test_invalid_transition_message() {
        let err = CollectionError::invalid_transition("Loaded", "Initial");
        assert_eq!(
            err.to_string(),
            "Invalid state transition from \"Loaded\" to \"Initial\""
        );
    }

    #[test]
    fn test_load_error_source_chain() {
        let err = LoadError::with_source("could not fetch", Offline);
        assert_eq!(err.to_string(), "could not fetch: network offline");
        assert!(std::error::Error::source(&err).is_some());

        let wrapped: CollectionError = err.clone().into();
        assert!(matches!(wrapped, CollectionError::Load(ref e) if *e == err));
    }

    #[test]
    fn test_programming_error_classification() {
        assert!(CollectionError::index_out_of_range("items", 5, 2).is_programming_error());
        assert!(CollectionError::concurrent_mutation("set_items").is_programming_error());
        assert!(!CollectionError::stale_notification("node").is_programming_error());
    }
}
