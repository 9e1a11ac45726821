//! Flattening of a plane's buffer ancestry into screen-relative transforms.

use std::collections::BTreeMap;

use crate::buffer::source::SourceMask;
use crate::buffer::store::{BufferRef, BufferStore};
use crate::display::plane::PlaneBinding;
use crate::foundation::error::{LayervalError, LayervalResult};
use crate::transform::compose::{PolicyViolation, compose};
use crate::transform::layer::LayerTransform;
use crate::transform::zorder::{MAX_LEVELS, ZOrderKey};

/// Flattened transforms of everything on screen, back to front.
#[derive(Clone, Debug, Default)]
pub struct ExpandedSet {
    transforms: BTreeMap<ZOrderKey, LayerTransform>,
    violations: Vec<PolicyViolation>,
}

impl ExpandedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Transforms in ascending Z order.
    pub fn iter(&self) -> impl Iterator<Item = &LayerTransform> {
        self.transforms.values()
    }

    pub fn violations(&self) -> &[PolicyViolation] {
        &self.violations
    }

    pub fn insert(&mut self, t: LayerTransform) -> LayervalResult<()> {
        let key = t.z_order();
        if self.transforms.contains_key(&key) {
            tracing::error!(%key, "identical z-order in expanded transform set");
            return Err(LayervalError::DuplicateZOrder { key: key.key() });
        }
        self.transforms.insert(key, t);
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<LayerTransform>, Vec<PolicyViolation>) {
        (self.transforms.into_values().collect(), self.violations)
    }
}

/// Expand what `plane` shows into `set`.
///
/// The plane's transform is first composed with the panel fitter, if any. Each buffer that
/// was itself composed from other placements is replaced by those placements, composed
/// with the transform that shows it, recursively. After expansion the plane's buffer is
/// marked used unless its last display set failed or the display is off.
#[tracing::instrument(skip_all, fields(plane = plane.plane_id()))]
pub fn expand_plane(
    plane: &PlaneBinding,
    panel_fitter: Option<&LayerTransform>,
    display_enabled: bool,
    store: &mut BufferStore,
    set: &mut ExpandedSet,
) -> LayervalResult<()> {
    let Some(shown) = plane.transform() else {
        return Ok(());
    };
    let Some(buf) = shown.source() else {
        return Ok(());
    };

    let top = match panel_fitter {
        Some(pf) => {
            let (t, violation) = compose(shown, pf)?.into_parts();
            set.violations.extend(violation);
            t
        }
        None => shown.clone(),
    };
    add_sources(store, buf, top, SourceMask::EMPTY, set, 0)?;

    if !plane.did_set_display_fail() && display_enabled {
        store.mark_used(buf)?;
    }
    Ok(())
}

fn add_sources(
    store: &BufferStore,
    buf: BufferRef,
    this: LayerTransform,
    sources: SourceMask,
    set: &mut ExpandedSet,
    depth: usize,
) -> LayervalResult<()> {
    if depth >= usize::from(MAX_LEVELS) {
        tracing::error!(?buf, depth, "buffer ancestry too deep to expand");
        return Err(LayervalError::AncestryTooDeep(usize::from(MAX_LEVELS)));
    }
    let sources = sources.with(buf.origin());
    let ancestry = store.combined_from(buf)?;
    if ancestry.is_empty() {
        let mask = this.composed_from().union(sources);
        return set.insert(this.with_composed_from(mask));
    }

    tracing::trace!(?buf, count = ancestry.len(), %sources, "expanding composed buffer");
    for s in ancestry {
        let (combined, violation) = compose(s, &this)?.into_parts();
        set.violations.extend(violation);
        match s.source() {
            Some(src) => add_sources(store, src, combined, sources, set, depth + 1)?,
            None => {
                let mask = combined.composed_from().union(sources);
                set.insert(combined.with_composed_from(mask))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/display/expand.rs"]
mod tests;
