// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Two kinds of failure exist in a deterministic forward pass:
//
//   Configuration  — detected while building the model
//                    (d_model not divisible by n_heads,
//                    resampling geometry with no output, ...)
//   ShapeMismatch  — detected at the top of a forward call
//                    (input or mask disagrees with the shape
//                    fixed at construction)
//
// Neither is retried. Callers above the library wrap these
// into anyhow errors with context.

use thiserror::Error;

/// Errors surfaced by model construction and forward calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TstError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what:     &'static str,
        expected: Vec<usize>,
        actual:   Vec<usize>,
    },
}

impl TstError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn shape(what: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual:   actual.to_vec(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, TstError>;
