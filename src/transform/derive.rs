//! Transforms derived from screen and panel geometry.

use crate::foundation::core::{Rect, Vec2, clamped_intersection};
use crate::foundation::error::LayervalResult;
use crate::foundation::math::EXTENT_EPSILON;
use crate::transform::compose::{Composed, compose, inverse};
use crate::transform::layer::LayerTransform;

/// How the panel fitter maps the composed frame onto the panel.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PanelFitterMode {
    /// Frame is shown 1:1.
    #[default]
    Off,
    /// Stretch independently on both axes.
    Scale,
    /// Uniform scale, centred, letter/pillar-boxed.
    FixedAspectRatio,
}

/// Uniform scale that fits `src` inside `dst`, centred.
pub fn fixed_aspect_ratio(src_w: f64, src_h: f64, dst_w: f64, dst_h: f64) -> LayerTransform {
    let s = if src_w.abs() <= EXTENT_EPSILON || src_h.abs() <= EXTENT_EPSILON {
        1.0
    } else {
        (dst_w / src_w).min(dst_h / src_h)
    };
    LayerTransform::base(
        None,
        Rect::new(0.0, 0.0, src_w, src_h),
        Vec2::new((dst_w - src_w * s) / 2.0, (dst_h - src_h * s) / 2.0),
        Vec2::new(s, s),
    )
}

/// Panel-fitter transform for `mode`, or `None` when the frame is shown unscaled.
pub fn panel_fitter(
    mode: PanelFitterMode,
    src_w: f64,
    src_h: f64,
    dst_w: f64,
    dst_h: f64,
) -> Option<LayerTransform> {
    match mode {
        PanelFitterMode::Off => None,
        PanelFitterMode::Scale => Some(LayerTransform::scaling(src_w, src_h, dst_w, dst_h)),
        PanelFitterMode::FixedAspectRatio => Some(fixed_aspect_ratio(src_w, src_h, dst_w, dst_h)),
    }
}

/// `t` trimmed to the part that lands on a `width`×`height` screen.
pub fn visible_region(t: &LayerTransform, width: f64, height: f64) -> LayervalResult<Composed> {
    compose(t, &LayerTransform::clip(Rect::new(0.0, 0.0, width, height)))
}

/// Source-space rectangle that `t` shows inside destination rectangle `dest`.
pub fn source_rect_for(t: &LayerTransform, dest: Rect) -> Rect {
    inverse(t).map_rect(clamped_intersection(dest, t.display_rect()))
}

#[cfg(test)]
#[path = "../../tests/unit/transform/derive.rs"]
mod tests;
