use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::display::budget::{ErrorBudget, FrameBudget, Unlimited};
use crate::foundation::error::{LayervalError, LayervalResult};
use crate::validate::check::CheckKind;
use crate::validate::compare::Tolerances;

/// Validator settings, loadable from JSON. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Allowed per-edge difference between source crops, in buffer pixels.
    pub crop_margin: f64,
    /// Allowed per-edge difference between display frames, in screen pixels.
    pub display_frame_margin: i32,
    pub plane_alpha_tolerance: f32,
    /// Report at most n failures of a kind per frame; the next one stops checking the display.
    pub error_limits: BTreeMap<CheckKind, u32>,
    /// Stop checking a display, without reporting, on the first failure of any of these kinds.
    pub short_circuit_on: Vec<CheckKind>,
    /// Worker threads for multi-display validation (`None` = rayon default).
    pub threads: Option<usize>,
    /// Frames after start-up during which missing layers are not reported.
    pub grace_frames: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let t = Tolerances::default();
        Self {
            crop_margin: t.crop_margin,
            display_frame_margin: t.display_frame_margin,
            plane_alpha_tolerance: t.plane_alpha,
            error_limits: BTreeMap::new(),
            short_circuit_on: Vec::new(),
            threads: None,
            grace_frames: 2,
        }
    }
}

impl ValidationConfig {
    pub fn from_json_str(s: &str) -> LayervalResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| LayervalError::serde(format!("parse validation config JSON: {e}")))
    }

    pub fn from_reader<R: std::io::Read>(r: R) -> LayervalResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| LayervalError::serde(format!("parse validation config JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> LayervalResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            LayervalError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        let cfg = Self::from_reader(BufReader::new(f))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> LayervalResult<()> {
        if !self.crop_margin.is_finite() || self.crop_margin < 0.0 {
            return Err(LayervalError::validation(
                "crop_margin must be finite and >= 0",
            ));
        }
        if self.display_frame_margin < 0 {
            return Err(LayervalError::validation("display_frame_margin must be >= 0"));
        }
        if !self.plane_alpha_tolerance.is_finite() || self.plane_alpha_tolerance < 0.0 {
            return Err(LayervalError::validation(
                "plane_alpha_tolerance must be finite and >= 0",
            ));
        }
        if let Some((kind, _)) = self.error_limits.iter().find(|(_, n)| **n == 0) {
            return Err(LayervalError::validation(format!(
                "error_limits.{kind} must be > 0"
            )));
        }
        if self.threads == Some(0) {
            return Err(LayervalError::validation("threads must be > 0 when set"));
        }
        Ok(())
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            crop_margin: self.crop_margin,
            display_frame_margin: self.display_frame_margin,
            plane_alpha: self.plane_alpha_tolerance,
        }
    }

    /// A fresh error budget for one display.
    pub fn budget(&self) -> Box<dyn ErrorBudget> {
        if self.error_limits.is_empty() && self.short_circuit_on.is_empty() {
            return Box::new(Unlimited);
        }
        let budget = self
            .short_circuit_on
            .iter()
            .fold(FrameBudget::new(self.error_limits.clone()), |b, kind| {
                b.stop_on(*kind)
            });
        Box::new(budget)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
