use crate::buffer::source::SourceMask;
use crate::buffer::store::BufferRef;
use crate::foundation::core::{PixelRect, Rect, Vec2};
use crate::foundation::math::{round_extent, safe_ratio, trunc_coord};
use crate::transform::discrete::{DiscreteTransform, effective_axes};
use crate::transform::zorder::ZOrderKey;

/// How a layer's pixels combine with whatever lies beneath it.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Opaque; pixel alpha is ignored.
    #[default]
    None,
    /// Source colour is already multiplied by its alpha.
    Premultiplied,
    /// Source colour is multiplied by alpha while blending.
    Coverage,
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::None => "None",
            Self::Premultiplied => "Premult",
            Self::Coverage => "Coverage",
        })
    }
}

/// Where a layer or plane description puts a crop of its buffer.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    pub source_crop: Rect,
    pub display_frame: PixelRect,
    #[serde(default)]
    pub transform: DiscreteTransform,
}

/// Affine placement of a source crop onto a destination surface.
///
/// The mapping takes a point in the crop, moves it to crop-local coordinates, routes and
/// reflects the axes as [`effective_axes`] prescribes, scales per destination axis and
/// finally translates by `offset`. `offset` is therefore always the top-left corner of the
/// destination rectangle, whatever the discrete transform.
///
/// Values are immutable; composition and the `with_*` builders return new transforms.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LayerTransform {
    source: Option<BufferRef>,
    z_order: ZOrderKey,
    source_crop: Rect,
    offset: Vec2,
    scale: Vec2,
    discrete: DiscreteTransform,
    layer_index: Option<u32>,
    decrypt: bool,
    blend_mode: BlendMode,
    has_pixel_alpha: bool,
    plane_alpha: f32,
    composed_from: SourceMask,
}

impl LayerTransform {
    pub(crate) fn base(
        source: Option<BufferRef>,
        source_crop: Rect,
        offset: Vec2,
        scale: Vec2,
    ) -> Self {
        Self {
            source,
            z_order: ZOrderKey::default(),
            source_crop,
            offset,
            scale,
            discrete: DiscreteTransform::Identity,
            layer_index: None,
            decrypt: false,
            blend_mode: BlendMode::None,
            has_pixel_alpha: false,
            plane_alpha: 1.0,
            composed_from: SourceMask::EMPTY,
        }
    }

    /// Full-buffer crop shown unscaled at the origin (a plain overlay).
    pub fn identity(source: Option<BufferRef>, width: f64, height: f64) -> Self {
        Self::base(
            source,
            Rect::new(0.0, 0.0, width, height),
            Vec2::ZERO,
            Vec2::new(1.0, 1.0),
        )
    }

    /// Stretch a `src_w`×`src_h` surface onto a `dst_w`×`dst_h` one (panel fitter).
    pub fn scaling(src_w: f64, src_h: f64, dst_w: f64, dst_h: f64) -> Self {
        Self::base(
            None,
            Rect::new(0.0, 0.0, src_w, src_h),
            Vec2::ZERO,
            Vec2::new(safe_ratio(dst_w, src_w), safe_ratio(dst_h, src_h)),
        )
    }

    /// Maps `rect` onto itself. Composing with it trims a transform to the rectangle.
    pub fn clip(rect: Rect) -> Self {
        Self::base(None, rect, rect.origin().to_vec2(), Vec2::new(1.0, 1.0))
    }

    /// Derive the transform that shows `placement.source_crop` in `placement.display_frame`.
    ///
    /// Under a 90° rotation the crop's height drives the frame's width, so the scale is taken
    /// against the swapped extents.
    pub fn from_placement(source: Option<BufferRef>, placement: &Placement) -> Self {
        let crop = placement.source_crop;
        let df = placement.display_frame;
        let axes = effective_axes(placement.transform);
        let (ex, ey) = axes.to_dest(crop.width(), crop.height());
        let mut t = Self::base(
            source,
            crop,
            Vec2::new(f64::from(df.left), f64::from(df.top)),
            Vec2::new(
                safe_ratio(f64::from(df.width()), ex),
                safe_ratio(f64::from(df.height()), ey),
            ),
        );
        t.discrete = placement.transform;
        t
    }

    /// Raw constructor used by composition and inversion.
    pub(crate) fn with_geometry(
        mut self,
        source_crop: Rect,
        offset: Vec2,
        scale: Vec2,
        discrete: DiscreteTransform,
    ) -> Self {
        self.source_crop = source_crop;
        self.offset = offset;
        self.scale = scale;
        self.discrete = discrete;
        self
    }

    pub fn with_source(mut self, source: Option<BufferRef>) -> Self {
        self.source = source;
        self
    }

    pub fn with_z_order(mut self, z_order: ZOrderKey) -> Self {
        self.z_order = z_order;
        self
    }

    pub fn with_layer_index(mut self, index: u32) -> Self {
        self.layer_index = Some(index);
        self
    }

    pub fn with_decrypt(mut self, decrypt: bool) -> Self {
        self.decrypt = decrypt;
        self
    }

    pub fn with_blend(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_pixel_alpha(mut self, has_pixel_alpha: bool) -> Self {
        self.has_pixel_alpha = has_pixel_alpha;
        self
    }

    /// Plane alpha is clamped to `[0, 1]`; NaN becomes opaque.
    pub fn with_plane_alpha(mut self, alpha: f32) -> Self {
        self.plane_alpha = if alpha.is_nan() {
            1.0
        } else {
            alpha.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_composed_from(mut self, mask: SourceMask) -> Self {
        self.composed_from = mask;
        self
    }

    pub fn source(&self) -> Option<BufferRef> {
        self.source
    }

    pub fn z_order(&self) -> ZOrderKey {
        self.z_order
    }

    pub fn source_crop(&self) -> Rect {
        self.source_crop
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn discrete(&self) -> DiscreteTransform {
        self.discrete
    }

    pub fn layer_index(&self) -> Option<u32> {
        self.layer_index
    }

    pub fn decrypt(&self) -> bool {
        self.decrypt
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn has_pixel_alpha(&self) -> bool {
        self.has_pixel_alpha
    }

    pub fn plane_alpha(&self) -> f32 {
        self.plane_alpha
    }

    pub fn composed_from(&self) -> SourceMask {
        self.composed_from
    }

    /// Crop extents in destination-axis order.
    fn dest_extents(&self) -> (f64, f64) {
        effective_axes(self.discrete).to_dest(self.source_crop.width(), self.source_crop.height())
    }

    /// Map a rectangle in source coordinates to destination coordinates (no clipping).
    pub fn map_rect(&self, r: Rect) -> Rect {
        let axes = effective_axes(self.discrete);
        let c = self.source_crop;
        let (ew, eh) = self.dest_extents();
        let u = (r.x0 - c.x0, r.x1 - c.x0);
        let v = (r.y0 - c.y0, r.y1 - c.y0);
        let (dx, dy) = axes.to_dest(u, v);
        let dx = if axes.reflect_x {
            (ew - dx.1, ew - dx.0)
        } else {
            dx
        };
        let dy = if axes.reflect_y {
            (eh - dy.1, eh - dy.0)
        } else {
            dy
        };
        Rect::new(
            self.offset.x + self.scale.x * dx.0,
            self.offset.y + self.scale.y * dy.0,
            self.offset.x + self.scale.x * dx.1,
            self.offset.y + self.scale.y * dy.1,
        )
    }

    /// Exact destination rectangle.
    pub fn display_rect(&self) -> Rect {
        let (ew, eh) = self.dest_extents();
        Rect::new(
            self.offset.x,
            self.offset.y,
            self.offset.x + ew * self.scale.x,
            self.offset.y + eh * self.scale.y,
        )
    }

    pub fn display_right(&self) -> f64 {
        self.display_rect().x1
    }

    pub fn display_bottom(&self) -> f64 {
        self.display_rect().y1
    }

    /// Integer destination frame as the display hardware would program it: left/top are
    /// truncated, extents rounded half up.
    pub fn effective_display_frame(&self) -> PixelRect {
        let (ew, eh) = self.dest_extents();
        let left = trunc_coord(self.offset.x);
        let top = trunc_coord(self.offset.y);
        PixelRect::new(
            left,
            top,
            left.saturating_add(round_extent(ew * self.scale.x)),
            top.saturating_add(round_extent(eh * self.scale.y)),
        )
    }

    /// True when the destination frame overlaps a `width`×`height` screen. A frame with no
    /// area never does.
    pub fn is_df_intersecting(&self, width: i32, height: i32) -> bool {
        let df = self.effective_display_frame();
        if df.left == df.right || df.top == df.bottom {
            return false;
        }
        df.right > 0 && df.bottom > 0 && df.left < width && df.top < height
    }

    /// Geometric equality within `tol` on crop, offset and scale.
    pub fn geometry_eq(&self, other: &Self, tol: f64) -> bool {
        use crate::foundation::core::max_rect_edge_delta;
        self.discrete == other.discrete
            && max_rect_edge_delta(self.source_crop, other.source_crop) <= tol
            && (self.offset - other.offset).hypot() <= tol
            && (self.scale - other.scale).hypot() <= tol
    }
}

impl std::fmt::Display for LayerTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.layer_index {
            Some(i) => write!(f, "L{i:<3}")?,
            None => f.write_str("L-  ")?,
        }
        let c = self.source_crop;
        write!(
            f,
            " crop ({:7.1},{:7.1},{:7.1},{:7.1}) df {} {:<7} z {} {} alpha {:.3}",
            c.x0,
            c.y0,
            c.x1,
            c.y1,
            self.effective_display_frame(),
            self.discrete,
            self.z_order,
            self.blend_mode,
            self.plane_alpha,
        )?;
        if self.decrypt {
            f.write_str(" decrypt")?;
        }
        if !self.composed_from.is_empty() {
            write!(f, " from{}", self.composed_from)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/layer.rs"]
mod tests;
