//! Per-display frame validation: expand every plane, match requested layers against what
//! reached the screen, and compare each matched pair.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rayon::prelude::*;

use crate::buffer::store::{BufferRef, BufferStore};
use crate::config::ValidationConfig;
use crate::display::budget::ErrorBudget;
use crate::display::expand::{ExpandedSet, expand_plane};
use crate::display::plane::{PlaneBinding, PlaneUpdate};
use crate::foundation::core::{DisplayId, FrameIndex};
use crate::foundation::error::{LayervalError, LayervalResult};
use crate::transform::compose::compose;
use crate::transform::derive::{PanelFitterMode, panel_fitter, visible_region};
use crate::transform::layer::{BlendMode, LayerTransform, Placement};
use crate::validate::check::CheckKind;
use crate::validate::compare::{ComparisonValidator, Tolerances};
use crate::validate::report::{DiagnosticsSink, Detail, FrameReport};

/// One layer the composer asked to show, back to front.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FrameLayer {
    /// `None` for layers with no buffer content (solid colour, dim).
    pub buffer: Option<BufferRef>,
    pub placement: Placement,
    pub blend: BlendMode,
    pub plane_alpha: f32,
    /// Layers the composer handles itself and never puts on a plane.
    pub skip: bool,
}

impl FrameLayer {
    pub fn new(buffer: BufferRef, placement: Placement) -> Self {
        Self {
            buffer: Some(buffer),
            placement,
            blend: BlendMode::None,
            plane_alpha: 1.0,
            skip: false,
        }
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_plane_alpha(mut self, alpha: f32) -> Self {
        self.plane_alpha = alpha;
        self
    }
}

struct DisplayState {
    width: u32,
    height: u32,
    enabled: bool,
    planes: BTreeMap<u32, PlaneBinding>,
    panel_fitter: Option<LayerTransform>,
    /// Maps the composer's logical display space onto the screen.
    scale: LayerTransform,
    tolerances: Tolerances,
    grace_frames: u64,
    validated_frames: u64,
    budget: Box<dyn ErrorBudget>,
    sink: Box<dyn DiagnosticsSink>,
}

/// Validation state for one display.
///
/// Binding, flipping and validating all happen under the display's lock. The buffer store
/// is locked separately and only while it is read or one plane is expanded.
pub struct DisplayValidator {
    id: DisplayId,
    state: Mutex<DisplayState>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DisplayValidator {
    pub fn new(
        id: DisplayId,
        width: u32,
        height: u32,
        config: &ValidationConfig,
        sink: Box<dyn DiagnosticsSink>,
    ) -> Self {
        let (w, h) = (f64::from(width), f64::from(height));
        Self {
            id,
            state: Mutex::new(DisplayState {
                width,
                height,
                enabled: true,
                planes: BTreeMap::new(),
                panel_fitter: None,
                scale: LayerTransform::scaling(w, h, w, h),
                tolerances: config.tolerances(),
                grace_frames: config.grace_frames,
                validated_frames: 0,
                budget: config.budget(),
                sink,
            }),
        }
    }

    pub fn id(&self) -> DisplayId {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        let st = lock(&self.state);
        (st.width, st.height)
    }

    pub fn validated_frames(&self) -> u64 {
        lock(&self.state).validated_frames
    }

    /// Size of the space layer display frames are expressed in, when it differs from the
    /// screen.
    pub fn set_logical_size(&self, width: f64, height: f64) {
        let mut st = lock(&self.state);
        st.scale = LayerTransform::scaling(
            width,
            height,
            f64::from(st.width),
            f64::from(st.height),
        );
    }

    /// Planes are composed at `src_w`×`src_h` and fitted to the screen by `mode`.
    pub fn set_panel_fitter(&self, mode: PanelFitterMode, src_w: f64, src_h: f64) {
        let mut st = lock(&self.state);
        let (dw, dh) = (f64::from(st.width), f64::from(st.height));
        st.panel_fitter = panel_fitter(mode, src_w, src_h, dw, dh);
        tracing::debug!(display = %self.id, ?mode, src_w, src_h, "panel fitter set");
    }

    pub fn set_enabled(&self, enabled: bool) {
        lock(&self.state).enabled = enabled;
    }

    pub fn add_plane(&self, plane_id: u32, z_order: u32) -> LayervalResult<()> {
        let mut st = lock(&self.state);
        if st.planes.contains_key(&plane_id) {
            return Err(LayervalError::validation(format!(
                "plane {plane_id} already exists on {}",
                self.id
            )));
        }
        st.planes.insert(plane_id, PlaneBinding::new(plane_id, z_order));
        Ok(())
    }

    fn with_plane<R>(
        &self,
        plane_id: u32,
        f: impl FnOnce(&mut PlaneBinding) -> LayervalResult<R>,
    ) -> LayervalResult<R> {
        let mut st = lock(&self.state);
        let plane = st.planes.get_mut(&plane_id).ok_or_else(|| {
            LayervalError::validation(format!("unknown plane {plane_id} on {}", self.id))
        })?;
        f(plane)
    }

    pub fn bind_plane(&self, plane_id: u32, update: &PlaneUpdate) -> LayervalResult<()> {
        self.with_plane(plane_id, |p| p.bind(update))
    }

    pub fn clear_plane(&self, plane_id: u32) -> LayervalResult<()> {
        self.with_plane(plane_id, |p| {
            p.clear();
            Ok(())
        })
    }

    pub fn mark_set_display_failed(&self, plane_id: u32) -> LayervalResult<()> {
        self.with_plane(plane_id, |p| {
            p.mark_set_display_failed();
            Ok(())
        })
    }

    /// Latch every plane's bound state onto the screen.
    pub fn flip(&self) {
        let mut st = lock(&self.state);
        for plane in st.planes.values_mut() {
            plane.flip();
        }
    }

    /// Check what is on screen against the layers requested for `frame`.
    #[tracing::instrument(skip_all, fields(display = %self.id, frame = frame.0, layers = layers.len()))]
    pub fn validate_frame(
        &self,
        frame: FrameIndex,
        layers: &[FrameLayer],
        store: &Mutex<BufferStore>,
    ) -> LayervalResult<FrameReport> {
        let mut guard = lock(&self.state);
        let st = &mut *guard;
        let (w, h) = (f64::from(st.width), f64::from(st.height));
        let (wi, hi) = (screen_coord(st.width)?, screen_coord(st.height)?);
        let in_grace = st.validated_frames < st.grace_frames;
        st.budget.begin_frame(frame);

        let requested = {
            let store = lock(store);
            let mut out = Vec::with_capacity(layers.len());
            for (idx, layer) in layers.iter().enumerate() {
                if layer.skip {
                    continue;
                }
                let Some(buf) = layer.buffer else {
                    continue;
                };
                let index = u32::try_from(idx)
                    .map_err(|_| LayervalError::validation("layer index does not fit in u32"))?;
                let t = LayerTransform::from_placement(Some(buf), &layer.placement)
                    .with_layer_index(index)
                    .with_blend(layer.blend)
                    .with_plane_alpha(layer.plane_alpha)
                    .with_pixel_alpha(store.has_pixel_alpha(buf)?);
                out.push(t);
            }
            out
        };

        let mut set = ExpandedSet::new();
        let mut internal = Vec::new();
        for plane in st.planes.values() {
            let mut store = lock(store);
            let expanded =
                expand_plane(plane, st.panel_fitter.as_ref(), st.enabled, &mut store, &mut set);
            match expanded {
                Ok(()) => {}
                Err(e) if e.is_invariant_violation() => internal.push((plane.plane_id(), e)),
                Err(e) => return Err(e),
            }
        }
        let back_plane_alpha = st.planes.values().any(PlaneBinding::has_back_plane_alpha);
        let (actual, violations) = set.into_parts();

        let mut v = ComparisonValidator::new(
            self.id,
            frame,
            st.tolerances,
            st.budget.as_mut(),
            st.sink.as_mut(),
        );
        for violation in &violations {
            v.note_violation(violation);
        }
        for (plane, e) in &internal {
            let check = match e {
                LayervalError::DuplicateZOrder { .. }
                | LayervalError::ZOrderOverflow { .. }
                | LayervalError::ZOrderFieldOverflow(_) => CheckKind::InternalZOrder,
                _ => CheckKind::InternalError,
            };
            v.note(check, None, format!("plane {plane} not expanded: {e}"), Detail::None);
        }
        if back_plane_alpha {
            v.note(
                CheckKind::BackPlanePixelFormat,
                None,
                "back plane uses a pixel format with alpha",
                Detail::None,
            );
        }

        let mut matched = vec![false; actual.len()];
        let mut cursor = 0usize;
        let mut checked = 0usize;
        for original in &requested {
            if v.is_short_circuited() {
                break;
            }
            while cursor < actual.len() && matched[cursor] {
                cursor += 1;
            }
            let buf = original.source();
            let layer = original.layer_index();

            let at_cursor = actual.get(cursor).is_some_and(|a| a.source() == buf);
            let found = if at_cursor {
                Some(cursor)
            } else {
                (0..actual.len()).find(|&i| !matched[i] && actual[i].source() == buf)
            };

            let scaled = compose(original, &st.scale)?.transform;
            let expected = visible_region(&scaled, w, h)?.transform;
            let Some(i) = found else {
                if in_grace {
                    continue;
                }
                if expected.is_df_intersecting(wi, hi) {
                    v.fail(
                        CheckKind::LayerDisplay,
                        layer,
                        "layer NOT MAPPED to screen",
                        Detail::Buffer { buffer: buf },
                    );
                }
                continue;
            };

            if i < cursor {
                if !v.fail(
                    CheckKind::LayerOrder,
                    layer,
                    "layer is TOO FAR BACK in the plane stack",
                    Detail::Buffer { buffer: buf },
                ) {
                    break;
                }
            } else {
                if i > cursor {
                    tracing::warn!(?buf, ?layer, skipped = i - cursor, "layer is too far forward");
                }
                cursor = i + 1;
            }

            matched[i] = true;
            checked += 1;
            let shown = visible_region(&actual[i], w, h)?.transform;
            v.compare(&expected, &shown, original);
        }

        if !in_grace {
            for (t, _) in actual.iter().zip(&matched).filter(|(_, m)| !**m) {
                if !t.is_df_intersecting(wi, hi) {
                    continue;
                }
                if !v.fail(
                    CheckKind::LayerDisplay,
                    t.layer_index(),
                    "buffer mapped to screen when not requested",
                    Detail::Buffer { buffer: t.source() },
                ) {
                    break;
                }
            }
        }

        let (state, discrepancies) = v.finish();
        let report = FrameReport {
            display: self.id,
            frame,
            state,
            layers_checked: checked,
            discrepancies,
        };
        st.sink.frame_done(&report);
        st.validated_frames += 1;
        Ok(report)
    }
}

fn screen_coord(v: u32) -> LayervalResult<i32> {
    i32::try_from(v).map_err(|_| LayervalError::validation("screen size does not fit in i32"))
}

/// One display's frame to validate.
#[derive(Clone, Copy)]
pub struct FrameJob<'a> {
    pub display: &'a DisplayValidator,
    pub frame: FrameIndex,
    pub layers: &'a [FrameLayer],
}

/// Validate several displays concurrently. Buffer usage marks are reset first, so after
/// this returns [`BufferStore::unused_composition_targets`] reflects exactly these frames.
/// Reports come back in job order.
pub fn validate_displays(
    jobs: &[FrameJob<'_>],
    store: &Mutex<BufferStore>,
    threads: Option<usize>,
) -> LayervalResult<Vec<FrameReport>> {
    let pool = build_thread_pool(threads)?;
    lock(store).reset_usage();

    let results = pool.install(|| {
        jobs.par_iter()
            .map(|job| job.display.validate_frame(job.frame, job.layers, store))
            .collect::<Vec<_>>()
    });
    results.into_iter().collect()
}

fn build_thread_pool(threads: Option<usize>) -> LayervalResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(LayervalError::validation(
            "validation 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| LayervalError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/validate/frame.rs"]
mod tests;
