//! Crate-wide error taxonomy and result alias.

use thiserror::Error;

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, AxialError>;

/// Structured errors surfaced by the builder and cursor layers.
///
/// Variants group into four families, reported by [`AxialError::code`]:
/// usage errors (programmer misuse of the fluent API), addressing errors
/// (out-of-range cell coordinates), engine errors (propagated from the
/// execution collaborator), and resource errors (failures while releasing
/// a row stream or cellset handle).
#[derive(Debug, Error)]
pub enum AxialError {
    /// The fluent API was called outside its contract.
    #[error("usage error: {0}")]
    Usage(String),
    /// An axis index referenced an axis the cellset does not have.
    #[error("axis {axis} out of range: cellset has {count} axes")]
    AxisOutOfRange {
        /// Requested axis index.
        axis: usize,
        /// Number of axes in the cellset.
        count: usize,
    },
    /// An ordinal referenced a position outside an axis.
    #[error("position {index} out of range on axis {axis} (0..{len})")]
    PositionOutOfRange {
        /// Axis the ordinal was applied to.
        axis: usize,
        /// Requested zero-based ordinal.
        index: usize,
        /// Number of positions on the axis.
        len: usize,
    },
    /// A coordinate tuple did not supply one ordinal per axis.
    #[error("coordinate arity mismatch: got {got} ordinals, cellset has {expected} axes")]
    ArityMismatch {
        /// Number of ordinals supplied.
        got: usize,
        /// Number of axes in the cellset.
        expected: usize,
    },
    /// Failure reported by the query-execution collaborator.
    #[error("engine error: {message}")]
    Engine {
        /// The collaborator's own message.
        message: String,
        /// Messages of nested causes, outermost first.
        cause_chain: Vec<String>,
    },
    /// Failure while releasing an acquired stream or handle.
    #[error("resource error: {0}")]
    Resource(String),
}

impl AxialError {
    /// Builds a usage error from any message-like value.
    pub fn usage(message: impl Into<String>) -> Self {
        AxialError::Usage(message.into())
    }

    /// Builds an engine error carrying an unwrapped cause chain.
    pub fn engine(message: impl Into<String>, cause_chain: Vec<String>) -> Self {
        AxialError::Engine {
            message: message.into(),
            cause_chain,
        }
    }

    /// Returns the innermost cause reported by the engine, when present.
    ///
    /// Falls back to the top-level message for engine errors without a
    /// cause chain and returns `None` for every other variant.
    pub fn root_cause(&self) -> Option<&str> {
        match self {
            AxialError::Engine {
                message,
                cause_chain,
            } => Some(
                cause_chain
                    .last()
                    .map(String::as_str)
                    .unwrap_or(message.as_str()),
            ),
            _ => None,
        }
    }

    /// Returns a machine-readable code for the error family.
    pub fn code(&self) -> &'static str {
        match self {
            AxialError::Usage(_) => "Usage",
            AxialError::AxisOutOfRange { .. }
            | AxialError::PositionOutOfRange { .. }
            | AxialError::ArityMismatch { .. } => "Addressing",
            AxialError::Engine { .. } => "Engine",
            AxialError::Resource(_) => "Resource",
        }
    }
}
