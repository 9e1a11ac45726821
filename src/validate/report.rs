use std::sync::{Arc, Mutex, PoisonError};

use crate::buffer::store::BufferRef;
use crate::foundation::core::{DisplayId, FrameIndex, PixelRect, Rect};
use crate::transform::discrete::DiscreteTransform;
use crate::transform::layer::BlendMode;
use crate::validate::check::{CheckKind, ErrorClass};
use crate::validate::compare::CheckState;

/// Values behind a discrepancy. Geometric variants carry the requested (pre-scaling) value
/// alongside the expected and actual ones.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Detail {
    Crop {
        original: Rect,
        expected: Rect,
        actual: Rect,
    },
    DisplayFrame {
        original: PixelRect,
        expected: PixelRect,
        actual: PixelRect,
    },
    Transform {
        expected: DiscreteTransform,
        actual: DiscreteTransform,
    },
    Blend {
        expected: BlendMode,
        actual: BlendMode,
    },
    PixelAlpha {
        expected: bool,
        actual: bool,
    },
    PlaneAlpha {
        expected: f32,
        actual: f32,
    },
    Buffer {
        buffer: Option<BufferRef>,
    },
    Summary {
        count: u32,
    },
    None,
}

/// One failed check.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Discrepancy {
    pub display: DisplayId,
    pub frame: FrameIndex,
    pub check: CheckKind,
    pub class: ErrorClass,
    pub layer_index: Option<u32>,
    pub message: String,
    pub detail: Detail,
}

impl Discrepancy {
    pub fn new(
        display: DisplayId,
        frame: FrameIndex,
        check: CheckKind,
        layer_index: Option<u32>,
        message: impl Into<String>,
        detail: Detail,
    ) -> Self {
        Self {
            display,
            frame,
            check,
            class: check.class(),
            layer_index,
            message: message.into(),
            detail,
        }
    }
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} frame {} [{}]", self.display, self.frame.0, self.check)?;
        if let Some(i) = self.layer_index {
            write!(f, " layer {i}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Outcome of validating one frame on one display.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FrameReport {
    pub display: DisplayId,
    pub frame: FrameIndex,
    pub state: CheckState,
    pub layers_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl FrameReport {
    /// No discrepancies, and the budget never cut the frame short.
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty() && self.state != CheckState::ShortCircuited
    }

    pub fn count(&self, check: CheckKind) -> usize {
        self.discrepancies
            .iter()
            .filter(|d| d.check == check)
            .count()
    }
}

/// Destination for discrepancy records.
pub trait DiagnosticsSink: Send {
    fn report(&mut self, discrepancy: &Discrepancy);

    fn frame_done(&mut self, _report: &FrameReport) {}
}

/// Emits every discrepancy as a structured `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&mut self, d: &Discrepancy) {
        match d.class {
            ErrorClass::Mismatch | ErrorClass::Internal => tracing::error!(
                display = %d.display,
                frame = d.frame.0,
                check = %d.check,
                layer = ?d.layer_index,
                detail = ?d.detail,
                "{}",
                d.message
            ),
            ErrorClass::Policy => tracing::warn!(
                display = %d.display,
                frame = d.frame.0,
                check = %d.check,
                layer = ?d.layer_index,
                "{}",
                d.message
            ),
        }
    }

    fn frame_done(&mut self, report: &FrameReport) {
        tracing::debug!(
            display = %report.display,
            frame = report.frame.0,
            state = ?report.state,
            layers = report.layers_checked,
            discrepancies = report.discrepancies.len(),
            "frame validated"
        );
    }
}

/// Keeps discrepancies in memory. Clones share the same buffer, so one clone can be handed
/// to a validator and another kept for inspection.
#[derive(Clone, Debug, Default)]
pub struct CollectingSink {
    inner: Arc<Mutex<Vec<Discrepancy>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discrepancies(&self) -> Vec<Discrepancy> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<Discrepancy> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for CollectingSink {
    fn report(&mut self, discrepancy: &Discrepancy) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(discrepancy.clone());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/validate/report.rs"]
mod tests;
