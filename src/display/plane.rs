use crate::buffer::format::PixelFormat;
use crate::buffer::store::BufferRef;
use crate::foundation::error::LayervalResult;
use crate::transform::layer::{BlendMode, LayerTransform, Placement};
use crate::transform::zorder::ZOrderKey;

/// What the composer programmed onto one plane for the next flip.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PlaneUpdate {
    pub buffer: BufferRef,
    pub placement: Placement,
    pub format: PixelFormat,
    pub blend: BlendMode,
    pub plane_alpha: f32,
}

#[derive(Clone, Debug, Default)]
enum Pending {
    #[default]
    Keep,
    Show(LayerTransform, PixelFormat),
    Clear,
}

/// One hardware plane: the state bound for the next flip and the state on screen.
#[derive(Clone, Debug)]
pub struct PlaneBinding {
    plane_id: u32,
    z_order: u32,
    pending: Pending,
    current: Option<LayerTransform>,
    pixel_format: Option<PixelFormat>,
    set_display_failed: bool,
}

impl PlaneBinding {
    pub fn new(plane_id: u32, z_order: u32) -> Self {
        Self {
            plane_id,
            z_order,
            pending: Pending::Keep,
            current: None,
            pixel_format: None,
            set_display_failed: false,
        }
    }

    pub fn plane_id(&self) -> u32 {
        self.plane_id
    }

    pub fn z_order(&self) -> u32 {
        self.z_order
    }

    /// Bind `update` for the next flip. The plane's transform takes its Z position as a
    /// single-level key and its pixel alpha from the plane format.
    pub fn bind(&mut self, update: &PlaneUpdate) -> LayervalResult<()> {
        let t = LayerTransform::from_placement(Some(update.buffer), &update.placement)
            .with_z_order(ZOrderKey::for_index(self.z_order)?)
            .with_blend(update.blend)
            .with_plane_alpha(update.plane_alpha)
            .with_pixel_alpha(update.format.has_pixel_alpha());
        self.pending = Pending::Show(t, update.format);
        Ok(())
    }

    /// Turn the plane off at the next flip.
    pub fn clear(&mut self) {
        self.pending = Pending::Clear;
    }

    /// Latch the bound state onto the screen.
    pub fn flip(&mut self) {
        match std::mem::take(&mut self.pending) {
            Pending::Keep => {}
            Pending::Show(t, format) => {
                self.current = Some(t);
                self.pixel_format = Some(format);
            }
            Pending::Clear => {
                self.current = None;
                self.pixel_format = None;
            }
        }
        self.set_display_failed = false;
    }

    pub fn mark_set_display_failed(&mut self) {
        self.set_display_failed = true;
    }

    pub fn did_set_display_fail(&self) -> bool {
        self.set_display_failed
    }

    /// Transform of the content currently on screen.
    pub fn transform(&self) -> Option<&LayerTransform> {
        self.current.as_ref()
    }

    pub fn flipped_buffer(&self) -> Option<BufferRef> {
        self.current.as_ref().and_then(LayerTransform::source)
    }

    pub fn is_using(&self, buf: BufferRef) -> bool {
        self.flipped_buffer() == Some(buf)
    }

    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.pixel_format
    }

    /// The plane at the back of the stack must not carry pixel alpha: nothing lies beneath
    /// it to blend with.
    pub fn has_back_plane_alpha(&self) -> bool {
        self.z_order == 0
            && self.current.is_some()
            && self.pixel_format.is_some_and(PixelFormat::has_pixel_alpha)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/display/plane.rs"]
mod tests;
