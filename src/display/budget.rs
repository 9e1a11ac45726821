use std::collections::BTreeMap;

use crate::foundation::core::{DisplayId, FrameIndex};
use crate::validate::check::CheckKind;

/// Decides, per failed check, whether errors of that kind are still reported this frame.
///
/// Returning `false` from [`ErrorBudget::classify_error`] drops the failure unreported and
/// short-circuits the rest of the display's frame.
pub trait ErrorBudget: Send {
    fn begin_frame(&mut self, _frame: FrameIndex) {}

    fn classify_error(&mut self, id: DisplayId, kind: CheckKind) -> bool;
}

/// Never stops checking.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unlimited;

impl ErrorBudget for Unlimited {
    fn classify_error(&mut self, _id: DisplayId, _kind: CheckKind) -> bool {
        true
    }
}

/// Per-frame, per-kind failure limits.
///
/// A kind with limit `n` has its first `n` failures within a frame reported; the next one
/// stops the display. Kinds with no limit never stop it.
#[derive(Clone, Debug, Default)]
pub struct FrameBudget {
    limits: BTreeMap<CheckKind, u32>,
    counts: BTreeMap<CheckKind, u32>,
}

impl FrameBudget {
    pub fn new(limits: BTreeMap<CheckKind, u32>) -> Self {
        Self {
            limits,
            counts: BTreeMap::new(),
        }
    }

    /// Stop on the first failure of `kind` without reporting it.
    pub fn stop_on(mut self, kind: CheckKind) -> Self {
        self.limits.insert(kind, 0);
        self
    }

    pub fn failures(&self, kind: CheckKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

impl ErrorBudget for FrameBudget {
    fn begin_frame(&mut self, _frame: FrameIndex) {
        self.counts.clear();
    }

    fn classify_error(&mut self, id: DisplayId, kind: CheckKind) -> bool {
        let count = self.counts.entry(kind).or_insert(0);
        *count = count.saturating_add(1);
        match self.limits.get(&kind) {
            Some(&limit) if *count > limit => {
                tracing::debug!(display = %id, %kind, limit, "error budget exhausted");
                false
            }
            _ => true,
        }
    }
}
