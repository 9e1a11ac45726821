use crate::foundation::error::{LayervalError, LayervalResult};

/// Bits per composition level.
pub const FIELD_BITS: u32 = 8;
/// Levels a 64-bit key can hold.
pub const MAX_LEVELS: u8 = 8;

/// Composition-depth-aware ordering key.
///
/// Each level claims an 8-bit field, starting from the most significant byte. A layer at the
/// top level occupies the highest field; layers that were pre-combined into a buffer fill the
/// fields below the index of the plane that shows that buffer. Keys order by `key` alone, so a
/// plain `u64` comparison yields back-to-front order across every depth.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ZOrderKey {
    key: u64,
    levels: u8,
}

impl ZOrderKey {
    /// Single-level key for layer (or plane) index `index`.
    pub fn for_index(index: u32) -> LayervalResult<Self> {
        let field = u8::try_from(index).map_err(|_| {
            tracing::error!(index, "z-order index exceeds one field");
            LayervalError::ZOrderFieldOverflow(index)
        })?;
        Ok(Self {
            key: u64::from(field) << (64 - FIELD_BITS),
            levels: 1,
        })
    }

    /// Build a key from raw parts, e.g. one read back from a report.
    pub fn from_parts(key: u64, levels: u8) -> LayervalResult<Self> {
        if levels > MAX_LEVELS {
            return Err(LayervalError::ZOrderOverflow {
                inner: levels,
                outer: 0,
                total: u32::from(levels),
            });
        }
        Ok(Self { key, levels })
    }

    pub const fn key(self) -> u64 {
        self.key
    }

    pub const fn levels(self) -> u8 {
        self.levels
    }

    /// Place `inner` beneath `outer`: the outer fields stay on top and the inner key is shifted
    /// down past them.
    pub fn nest(inner: Self, outer: Self) -> LayervalResult<Self> {
        let total = u32::from(inner.levels) + u32::from(outer.levels);
        if total > u32::from(MAX_LEVELS) {
            tracing::error!(
                inner = inner.levels,
                outer = outer.levels,
                "maximum z-order nesting exceeded"
            );
            return Err(LayervalError::ZOrderOverflow {
                inner: inner.levels,
                outer: outer.levels,
                total,
            });
        }
        let shifted = inner
            .key
            .checked_shr(u32::from(outer.levels) * FIELD_BITS)
            .unwrap_or(0);
        Ok(Self {
            key: outer.key | shifted,
            levels: inner.levels + outer.levels,
        })
    }

    /// Field value at `level` (0 is the most significant).
    pub fn field(self, level: u8) -> u8 {
        let shift = 64 - FIELD_BITS * (u32::from(level) + 1);
        let byte = self.key.checked_shr(shift).unwrap_or(0) & 0xff;
        u8::try_from(byte).unwrap_or(u8::MAX)
    }
}

impl PartialOrd for ZOrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ZOrderKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key
            .cmp(&other.key)
            .then(self.levels.cmp(&other.levels))
    }
}

impl std::fmt::Display for ZOrderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}/{}", self.key, self.levels)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/zorder.rs"]
mod tests;
