use crate::buffer::store::BufferRef;

/// Convenience result type used across layerval.
pub type LayervalResult<T> = Result<T, LayervalError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Validation *mismatches* between expected and actual transforms are not errors: they are
/// reported as [`crate::Discrepancy`] records. Errors here mean the algebra was fed corrupt
/// input or the caller supplied an invalid configuration.
#[derive(thiserror::Error, Debug)]
pub enum LayervalError {
    /// Invalid user-provided configuration or scenario data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A raw discrete transform value outside the 8-element group.
    #[error("invalid discrete transform value {0}")]
    InvalidTransform(u32),

    /// Z-order key would need more 8-bit fields than a `u64` provides.
    #[error("maximum Z-order nesting exceeded ({inner}+{outer}={total} levels)")]
    ZOrderOverflow {
        /// Levels used by the inner (earlier) transform.
        inner: u8,
        /// Levels used by the outer (later) transform.
        outer: u8,
        /// Requested total.
        total: u32,
    },

    /// A single Z-order field cannot hold the requested index.
    #[error("Z-order index {0} does not fit in an 8-bit field")]
    ZOrderFieldOverflow(u32),

    /// Two flattened transforms landed on the same Z-order key.
    #[error("identical Z-order key {key:#018x} in expanded transform set")]
    DuplicateZOrder {
        /// The colliding key.
        key: u64,
    },

    /// Buffer ancestry is deeper than a Z-order key can encode (or cyclic).
    #[error("buffer ancestry deeper than {0} levels")]
    AncestryTooDeep(usize),

    /// A buffer handle whose slot was freed or reused.
    #[error("stale buffer handle {0:?}")]
    StaleBuffer(BufferRef),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LayervalError {
    /// Build a [`LayervalError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LayervalError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// True for errors that indicate corrupt algebra input rather than bad user data.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransform(_)
                | Self::ZOrderOverflow { .. }
                | Self::ZOrderFieldOverflow(_)
                | Self::DuplicateZOrder { .. }
                | Self::AncestryTooDeep(_)
                | Self::StaleBuffer(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
