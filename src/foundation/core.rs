use crate::foundation::error::{LayervalError, LayervalResult};

pub use kurbo::{Rect, Vec2};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct DisplayId(pub u32);

impl std::fmt::Display for DisplayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "D{}", self.0)
    }
}

/// Integer rectangle in display pixels (`right`/`bottom` exclusive).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_size(width: u32, height: u32) -> LayervalResult<Self> {
        let w = i32::try_from(width)
            .map_err(|_| LayervalError::validation("rect width does not fit in i32"))?;
        let h = i32::try_from(height)
            .map_err(|_| LayervalError::validation("rect height does not fit in i32"))?;
        Ok(Self::new(0, 0, w, h))
    }

    pub fn width(self) -> i32 {
        self.right - self.left
    }

    pub fn height(self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// True when `other` lies entirely within `self`.
    pub fn contains_rect(self, other: Self) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    /// Largest absolute difference between corresponding edges.
    pub fn max_edge_delta(self, other: Self) -> i32 {
        (self.left - other.left)
            .abs()
            .max((self.top - other.top).abs())
            .max((self.right - other.right).abs())
            .max((self.bottom - other.bottom).abs())
    }
}

impl From<[i32; 4]> for PixelRect {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl std::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:6},{:6},{:6},{:6})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Largest absolute difference between corresponding edges of two float rects.
pub fn max_rect_edge_delta(a: Rect, b: Rect) -> f64 {
    (a.x0 - b.x0)
        .abs()
        .max((a.y0 - b.y0).abs())
        .max((a.x1 - b.x1).abs())
        .max((a.y1 - b.y1).abs())
}

/// Per-axis intersection. Disjoint inputs collapse to a zero-extent rect on the violated axis
/// instead of producing negative extents.
pub fn clamped_intersection(a: Rect, b: Rect) -> Rect {
    let x0 = a.x0.max(b.x0);
    let y0 = a.y0.max(b.y0);
    let x1 = a.x1.min(b.x1).max(x0);
    let y1 = a.y1.min(b.y1).max(y0);
    Rect::new(x0, y0, x1, y1)
}
