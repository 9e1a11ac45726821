//! Expected-versus-actual comparison of flattened transforms.

use crate::display::budget::ErrorBudget;
use crate::foundation::core::{DisplayId, FrameIndex, Rect, max_rect_edge_delta};
use crate::transform::compose::PolicyViolation;
use crate::transform::layer::{BlendMode, LayerTransform};
use crate::validate::check::CheckKind;
use crate::validate::report::{DiagnosticsSink, Detail, Discrepancy};

/// Progress of one display's checks within a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Checking,
    /// The error budget stopped checking this display for the rest of the frame.
    ShortCircuited,
    Passed,
}

/// Margins within which expected and actual values are considered equal.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tolerances {
    pub crop_margin: f64,
    pub display_frame_margin: i32,
    pub plane_alpha: f32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            crop_margin: 2.0,
            display_frame_margin: 2,
            plane_alpha: 1e-3,
        }
    }
}

/// Runs the per-layer checks for one display and frame.
///
/// Failures go to the sink as they happen and are also kept for the frame report. Crop
/// and display-frame failures are additionally totalled into one summary record each by
/// [`ComparisonValidator::finish`].
pub struct ComparisonValidator<'a> {
    display: DisplayId,
    frame: FrameIndex,
    tolerances: Tolerances,
    budget: &'a mut dyn ErrorBudget,
    sink: &'a mut dyn DiagnosticsSink,
    state: CheckState,
    crop_errors: u32,
    scale_errors: u32,
    discrepancies: Vec<Discrepancy>,
}

impl<'a> ComparisonValidator<'a> {
    pub fn new(
        display: DisplayId,
        frame: FrameIndex,
        tolerances: Tolerances,
        budget: &'a mut dyn ErrorBudget,
        sink: &'a mut dyn DiagnosticsSink,
    ) -> Self {
        Self {
            display,
            frame,
            tolerances,
            budget,
            sink,
            state: CheckState::Checking,
            crop_errors: 0,
            scale_errors: 0,
            discrepancies: Vec::new(),
        }
    }

    pub fn state(&self) -> CheckState {
        self.state
    }

    pub fn is_short_circuited(&self) -> bool {
        self.state == CheckState::ShortCircuited
    }

    fn emit(&mut self, d: Discrepancy) {
        self.sink.report(&d);
        self.discrepancies.push(d);
    }

    /// Record a budgeted failure. Returns `false`, without recording anything, once the
    /// budget refuses and the display is short-circuited.
    pub fn fail(
        &mut self,
        check: CheckKind,
        layer_index: Option<u32>,
        message: impl Into<String>,
        detail: Detail,
    ) -> bool {
        if self.is_short_circuited() {
            return false;
        }
        if !self.budget.classify_error(self.display, check) {
            tracing::debug!(
                display = %self.display,
                frame = self.frame.0,
                %check,
                "short-circuiting display"
            );
            self.state = CheckState::ShortCircuited;
            return false;
        }
        let d = Discrepancy::new(self.display, self.frame, check, layer_index, message, detail);
        self.emit(d);
        true
    }

    /// Record a policy or internal finding. These bypass the budget.
    pub fn note(
        &mut self,
        check: CheckKind,
        layer_index: Option<u32>,
        message: impl Into<String>,
        detail: Detail,
    ) {
        let d = Discrepancy::new(self.display, self.frame, check, layer_index, message, detail);
        self.emit(d);
    }

    pub fn note_violation(&mut self, v: &PolicyViolation) {
        self.note(
            CheckKind::CompositionBlend,
            v.layer_index,
            v.message.clone(),
            Detail::Buffer { buffer: v.buffer },
        );
    }

    /// Compare one matched pair. `original` is the requested transform before it was
    /// scaled and trimmed to the screen, kept for reporting.
    pub fn compare(
        &mut self,
        expected: &LayerTransform,
        actual: &LayerTransform,
        original: &LayerTransform,
    ) -> CheckState {
        if self.is_short_circuited() {
            return self.state;
        }
        let tol = self.tolerances;
        let layer = expected.layer_index();

        let ec = expected.source_crop();
        let ac = actual.source_crop();
        if is_degenerate(ec, tol.crop_margin) && is_degenerate(ac, tol.crop_margin) {
            return self.state;
        }

        if max_rect_edge_delta(ec, ac) > tol.crop_margin {
            let detail = Detail::Crop {
                original: original.source_crop(),
                expected: ec,
                actual: ac,
            };
            if !self.fail(CheckKind::PlaneCrop, layer, "source crop mismatch", detail) {
                return self.state;
            }
            self.crop_errors += 1;
        }

        let edf = expected.effective_display_frame();
        let adf = actual.effective_display_frame();
        if edf.max_edge_delta(adf) > tol.display_frame_margin {
            let detail = Detail::DisplayFrame {
                original: original.effective_display_frame(),
                expected: edf,
                actual: adf,
            };
            if !self.fail(CheckKind::PlaneScale, layer, "display frame mismatch", detail) {
                return self.state;
            }
            self.scale_errors += 1;
        }

        if expected.discrete() != actual.discrete() {
            let detail = Detail::Transform {
                expected: expected.discrete(),
                actual: actual.discrete(),
            };
            let msg = format!(
                "transform expected={} actual={}",
                expected.discrete(),
                actual.discrete()
            );
            if !self.fail(CheckKind::PlaneTransform, layer, msg, detail) {
                return self.state;
            }
        }

        if !blend_compatible(expected, actual) {
            let detail = Detail::Blend {
                expected: expected.blend_mode(),
                actual: actual.blend_mode(),
            };
            let msg = format!(
                "incompatible blending: expected {} actual {}",
                expected.blend_mode(),
                actual.blend_mode()
            );
            self.fail(CheckKind::PlaneBlending, layer, msg, detail);
            return self.state;
        }

        let alpha_lost = expected.has_pixel_alpha()
            && !actual.has_pixel_alpha()
            && layer.is_some_and(|i| i > 0)
            && expected.blend_mode() != BlendMode::None;
        if alpha_lost {
            let detail = Detail::PixelAlpha {
                expected: true,
                actual: false,
            };
            if !self.fail(
                CheckKind::PixelAlpha,
                layer,
                "per-pixel alpha is not being rendered",
                detail,
            ) {
                return self.state;
            }
        }

        if (expected.plane_alpha() - actual.plane_alpha()).abs() > tol.plane_alpha {
            let detail = Detail::PlaneAlpha {
                expected: expected.plane_alpha(),
                actual: actual.plane_alpha(),
            };
            let msg = format!(
                "plane alpha rendered incorrectly: expected {:.3} actual {:.3}",
                expected.plane_alpha(),
                actual.plane_alpha()
            );
            self.fail(CheckKind::PlaneAlpha, layer, msg, detail);
        }
        self.state
    }

    /// Emit crop/scale summaries and settle the final state.
    pub fn finish(mut self) -> (CheckState, Vec<Discrepancy>) {
        if self.crop_errors > 0 {
            let count = self.crop_errors;
            self.note(
                CheckKind::PlaneCrop,
                None,
                format!("{count} cropping inconsistencies on {}", self.display),
                Detail::Summary { count },
            );
        }
        if self.scale_errors > 0 {
            let count = self.scale_errors;
            self.note(
                CheckKind::PlaneScale,
                None,
                format!("{count} scaling inconsistencies on {}", self.display),
                Detail::Summary { count },
            );
        }
        if self.state == CheckState::Checking {
            self.state = CheckState::Passed;
        }
        (self.state, self.discrepancies)
    }
}

/// Nothing should be on screen for a crop this thin.
fn is_degenerate(c: Rect, margin: f64) -> bool {
    c.width().abs() < margin || c.height().abs() < margin
}

/// None and Premultiplied are interchangeable for an opaque request and at the back of the
/// stack. Otherwise modes must match, unless the actual content has no alpha to blend.
fn blend_compatible(expected: &LayerTransform, actual: &LayerTransform) -> bool {
    let e = expected.blend_mode();
    let a = actual.blend_mode();
    let opaque_like = |m: BlendMode| matches!(m, BlendMode::None | BlendMode::Premultiplied);
    if e == a || !actual.has_pixel_alpha() {
        return true;
    }
    if e == BlendMode::None && opaque_like(a) {
        return true;
    }
    expected.layer_index() == Some(0) && opaque_like(e) && opaque_like(a)
}

#[cfg(test)]
#[path = "../../tests/unit/validate/compare.rs"]
mod tests;
