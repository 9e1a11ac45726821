//! The 8-element symmetry group of a rectangle (rotations by multiples of 90° and flips).

use crate::foundation::error::{LayervalError, LayervalResult};

/// Rotation/flip component of a placement.
///
/// Raw values follow the display HAL encoding: bit 0 reflects X, bit 1 reflects Y and bit 2
/// rotates by 90° clockwise. An element rotates first, then reflects in the rotated frame, so
/// `Rotate270 = Rotate90 | ReflectX | ReflectY`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(u8)]
pub enum DiscreteTransform {
    #[default]
    Identity = 0,
    ReflectX = 1,
    ReflectY = 2,
    Rotate180 = 3,
    Rotate90 = 4,
    Rotate90ReflectX = 5,
    Rotate90ReflectY = 6,
    Rotate270 = 7,
}

use DiscreteTransform as D;

/// `COMPOSE[a][b]` is the single element equivalent to applying `a`, then `b`.
#[rustfmt::skip]
const COMPOSE: [[DiscreteTransform; 8]; 8] = [
    [D::Identity, D::ReflectX, D::ReflectY, D::Rotate180, D::Rotate90, D::Rotate90ReflectX, D::Rotate90ReflectY, D::Rotate270],
    [D::ReflectX, D::Identity, D::Rotate180, D::ReflectY, D::Rotate90ReflectY, D::Rotate270, D::Rotate90, D::Rotate90ReflectX],
    [D::ReflectY, D::Rotate180, D::Identity, D::ReflectX, D::Rotate90ReflectX, D::Rotate90, D::Rotate270, D::Rotate90ReflectY],
    [D::Rotate180, D::ReflectY, D::ReflectX, D::Identity, D::Rotate270, D::Rotate90ReflectY, D::Rotate90ReflectX, D::Rotate90],
    [D::Rotate90, D::Rotate90ReflectX, D::Rotate90ReflectY, D::Rotate270, D::Rotate180, D::ReflectY, D::ReflectX, D::Identity],
    [D::Rotate90ReflectX, D::Rotate90, D::Rotate270, D::Rotate90ReflectY, D::ReflectX, D::Identity, D::Rotate180, D::ReflectY],
    [D::Rotate90ReflectY, D::Rotate270, D::Rotate90, D::Rotate90ReflectX, D::ReflectY, D::Rotate180, D::Identity, D::ReflectX],
    [D::Rotate270, D::Rotate90ReflectY, D::Rotate90ReflectX, D::Rotate90, D::Identity, D::ReflectX, D::ReflectY, D::Rotate180],
];

const NAMES: [&str; 8] = [
    "None", "FlipH", "FlipV", "Rot180", "Rot90", "Flip135", "Flip45", "Rot270",
];

impl DiscreteTransform {
    /// All elements in raw-value order.
    pub const ALL: [Self; 8] = [
        Self::Identity,
        Self::ReflectX,
        Self::ReflectY,
        Self::Rotate180,
        Self::Rotate90,
        Self::Rotate90ReflectX,
        Self::Rotate90ReflectY,
        Self::Rotate270,
    ];

    /// Decode a raw HAL value. Anything outside `0..8` means the encoding was corrupted
    /// upstream and is rejected rather than clamped.
    pub fn from_raw(raw: u32) -> LayervalResult<Self> {
        usize::try_from(raw)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| {
                tracing::error!(raw, "invalid discrete transform value");
                LayervalError::InvalidTransform(raw)
            })
    }

    pub const fn raw(self) -> u8 {
        self as u8
    }

    pub const fn has_rotate90(self) -> bool {
        self.raw() & 4 != 0
    }

    pub const fn has_reflect_x(self) -> bool {
        self.raw() & 1 != 0
    }

    pub const fn has_reflect_y(self) -> bool {
        self.raw() & 2 != 0
    }

    /// The element equivalent to applying `self`, then `next`.
    pub const fn then(self, next: Self) -> Self {
        COMPOSE[self as usize][next as usize]
    }

    /// Rotate90 and Rotate270 swap; every other element is an involution.
    pub const fn inverse(self) -> Self {
        match self {
            Self::Rotate90 => Self::Rotate270,
            Self::Rotate270 => Self::Rotate90,
            other => other,
        }
    }

    pub const fn name(self) -> &'static str {
        NAMES[self as usize]
    }
}

impl std::fmt::Display for DiscreteTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a discrete transform routes source axes onto destination axes.
///
/// `swap` means destination X is driven by source Y (and vice versa). `reflect_x` means the
/// destination X coordinate decreases as its driving source coordinate increases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisMap {
    pub swap: bool,
    pub reflect_x: bool,
    pub reflect_y: bool,
}

impl AxisMap {
    /// Reorder a per-source-axis pair into destination-axis order.
    #[inline]
    pub fn to_dest<T>(self, x: T, y: T) -> (T, T) {
        if self.swap { (y, x) } else { (x, y) }
    }
}

/// The one place the 90° axis-swap rule is defined.
///
/// Rotating 90° clockwise sends source Y onto destination X running backwards, so a later
/// reflection in X cancels that reversal.
pub const fn effective_axes(d: DiscreteTransform) -> AxisMap {
    if d.has_rotate90() {
        AxisMap {
            swap: true,
            reflect_x: !d.has_reflect_x(),
            reflect_y: d.has_reflect_y(),
        }
    } else {
        AxisMap {
            swap: false,
            reflect_x: d.has_reflect_x(),
            reflect_y: d.has_reflect_y(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/discrete.rs"]
mod tests;
