//! Composition and inversion of [`LayerTransform`]s.

use crate::buffer::store::BufferRef;
use crate::foundation::core::{Vec2, clamped_intersection};
use crate::foundation::error::LayervalResult;
use crate::foundation::math::safe_ratio;
use crate::transform::discrete::effective_axes;
use crate::transform::layer::{BlendMode, LayerTransform};
use crate::transform::zorder::ZOrderKey;

/// A composition that was carried out but combined states the display pipeline cannot
/// honour faithfully.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PolicyViolation {
    pub layer_index: Option<u32>,
    pub buffer: Option<BufferRef>,
    pub message: String,
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.layer_index {
            Some(i) => write!(f, "layer {i}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Result of [`compose`].
#[derive(Clone, Debug)]
pub struct Composed {
    pub transform: LayerTransform,
    pub violation: Option<PolicyViolation>,
}

impl Composed {
    pub fn into_parts(self) -> (LayerTransform, Option<PolicyViolation>) {
        (self.transform, self.violation)
    }
}

/// Apply `a`, then `b`: `a`'s destination space is `b`'s source space.
///
/// The part of `a`'s destination that falls outside `b`'s crop is trimmed from `a`'s crop,
/// so the result only covers what `b` actually shows.
pub fn compose(a: &LayerTransform, b: &LayerTransform) -> LayervalResult<Composed> {
    let z_order = ZOrderKey::nest(a.z_order(), b.z_order())?;

    let shown_by_a = a.display_rect();
    let surviving = clamped_intersection(shown_by_a, b.source_crop());
    let crop = if surviving == shown_by_a {
        a.source_crop()
    } else {
        inverse(a).map_rect(surviving)
    };

    let (sax, say) = effective_axes(b.discrete()).to_dest(a.scale().x, a.scale().y);
    let scale = Vec2::new(b.scale().x * sax, b.scale().y * say);
    let offset = b.map_rect(surviving).origin().to_vec2();
    let discrete = a.discrete().then(b.discrete());

    let mut violation = None;
    let plane_alpha = match b.blend_mode() {
        BlendMode::None => a.plane_alpha(),
        BlendMode::Premultiplied => a.plane_alpha() * b.plane_alpha(),
        BlendMode::Coverage => {
            if let Some(buf) = b.source().filter(|r| r.is_composition_target()) {
                tracing::error!(
                    layer = ?a.layer_index(),
                    ?buf,
                    "coverage blending applied to an already-composed buffer"
                );
                violation = Some(PolicyViolation {
                    layer_index: a.layer_index(),
                    buffer: Some(buf),
                    message: "coverage blending applied to an already-composed buffer".into(),
                });
            }
            a.plane_alpha() * b.plane_alpha()
        }
    };

    let transform = a
        .clone()
        .with_geometry(crop, offset, scale, discrete)
        .with_z_order(z_order)
        .with_decrypt(a.decrypt() || b.decrypt())
        .with_plane_alpha(plane_alpha)
        .with_composed_from(a.composed_from().union(b.composed_from()));

    Ok(Composed {
        transform,
        violation,
    })
}

/// The transform mapping `t`'s destination rectangle back onto its source crop.
///
/// Every non-geometric attribute is carried over from `t` unchanged.
pub fn inverse(t: &LayerTransform) -> LayerTransform {
    let (sx, sy) = effective_axes(t.discrete()).to_dest(t.scale().x, t.scale().y);
    t.clone().with_geometry(
        t.display_rect(),
        t.source_crop().origin().to_vec2(),
        Vec2::new(safe_ratio(1.0, sx), safe_ratio(1.0, sy)),
        t.discrete().inverse(),
    )
}

impl LayerTransform {
    /// `self` then `next`. See [`compose`].
    pub fn then(&self, next: &Self) -> LayervalResult<Composed> {
        compose(self, next)
    }

    /// See [`inverse`].
    pub fn inverse(&self) -> Self {
        inverse(self)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/compose.rs"]
mod tests;
