//! JSON description of one frame on one or more displays.
//!
//! Buffers are declared by name. A composition target lists the placements it was combined
//! from; displays list their planes (what the hardware was programmed with) and the layers
//! the composer requested, back to front.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::buffer::format::PixelFormat;
use crate::buffer::source::BufferSource;
use crate::buffer::store::{BufferDesc, BufferRef, BufferStore};
use crate::config::ValidationConfig;
use crate::display::plane::PlaneUpdate;
use crate::foundation::core::{DisplayId, FrameIndex};
use crate::foundation::error::{LayervalError, LayervalResult};
use crate::transform::derive::PanelFitterMode;
use crate::transform::layer::{BlendMode, LayerTransform, Placement};
use crate::transform::zorder::ZOrderKey;
use crate::validate::frame::{DisplayValidator, FrameJob, FrameLayer, validate_displays};
use crate::validate::report::{Discrepancy, FrameReport, TracingSink};

fn default_alpha() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub frame: u64,
    pub buffers: BTreeMap<String, BufferSpec>,
    pub displays: Vec<DisplaySpec>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferSpec {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    #[serde(default)]
    pub source: BufferSource,
    /// Placements combined into this buffer, back to front.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub combined_from: Vec<ContributorSpec>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContributorSpec {
    pub buffer: String,
    /// Index of the composer layer this placement came from.
    #[serde(default)]
    pub layer: Option<u32>,
    pub placement: Placement,
    #[serde(default)]
    pub blend: BlendMode,
    #[serde(default = "default_alpha")]
    pub plane_alpha: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanelFitterSpec {
    pub mode: PanelFitterMode,
    pub source_width: f64,
    pub source_height: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplaySpec {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    /// Size of the space layer display frames use, when it differs from the screen.
    #[serde(default)]
    pub logical_size: Option<[f64; 2]>,
    #[serde(default)]
    pub panel_fitter: Option<PanelFitterSpec>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub planes: Vec<PlaneSpec>,
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaneSpec {
    pub id: u32,
    pub z_order: u32,
    pub buffer: String,
    pub placement: Placement,
    /// Plane format; defaults to the buffer's.
    #[serde(default)]
    pub format: Option<PixelFormat>,
    #[serde(default)]
    pub blend: BlendMode,
    #[serde(default = "default_alpha")]
    pub plane_alpha: f32,
    #[serde(default)]
    pub set_display_failed: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerSpec {
    /// `None` for layers without buffer content.
    #[serde(default)]
    pub buffer: Option<String>,
    pub placement: Placement,
    #[serde(default)]
    pub blend: BlendMode,
    #[serde(default = "default_alpha")]
    pub plane_alpha: f32,
    #[serde(default)]
    pub skip: bool,
}

/// Result of checking a scenario.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ScenarioReport {
    pub reports: Vec<FrameReport>,
    /// Composition targets that no plane showed.
    pub unused_composition_targets: Vec<String>,
}

impl ScenarioReport {
    pub fn discrepancies(&self) -> impl Iterator<Item = &Discrepancy> {
        self.reports.iter().flat_map(|r| r.discrepancies.iter())
    }

    pub fn is_clean(&self) -> bool {
        self.reports.iter().all(FrameReport::is_clean)
    }
}

impl Scenario {
    pub fn from_json_str(s: &str) -> LayervalResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| LayervalError::serde(format!("parse scenario JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> LayervalResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            LayervalError::validation(format!("open scenario JSON '{}': {e}", path.display()))
        })?;
        let scenario: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| LayervalError::serde(format!("parse scenario JSON: {e}")))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> LayervalResult<()> {
        let missing = |what: &str, name: &str| {
            LayervalError::validation(format!("{what} references missing buffer '{name}'"))
        };
        for (name, b) in &self.buffers {
            if b.width == 0 || b.height == 0 {
                return Err(LayervalError::validation(format!(
                    "buffer '{name}' width/height must be > 0"
                )));
            }
            for c in &b.combined_from {
                if !self.buffers.contains_key(&c.buffer) {
                    return Err(missing(&format!("buffer '{name}'"), &c.buffer));
                }
            }
        }

        let mut ids = std::collections::BTreeSet::new();
        for d in &self.displays {
            if !ids.insert(d.id) {
                return Err(LayervalError::validation(format!(
                    "display {} is declared twice",
                    d.id
                )));
            }
            if d.width == 0 || d.height == 0 {
                return Err(LayervalError::validation(format!(
                    "display {} width/height must be > 0",
                    d.id
                )));
            }
            let mut planes = std::collections::BTreeSet::new();
            for p in &d.planes {
                if !planes.insert(p.id) {
                    return Err(LayervalError::validation(format!(
                        "display {} declares plane {} twice",
                        d.id, p.id
                    )));
                }
                if !self.buffers.contains_key(&p.buffer) {
                    return Err(missing(&format!("plane {}", p.id), &p.buffer));
                }
            }
            for (i, l) in d.layers.iter().enumerate() {
                if let Some(name) = &l.buffer
                    && !self.buffers.contains_key(name)
                {
                    return Err(missing(&format!("layer {i}"), name));
                }
            }
        }
        Ok(())
    }

    /// Build the buffer store: every buffer first, then the ancestry that refers to them.
    fn build_store(&self) -> LayervalResult<(BufferStore, BTreeMap<&str, BufferRef>)> {
        let mut store = BufferStore::new();
        let mut refs = BTreeMap::new();
        for (name, b) in &self.buffers {
            let r = store.insert(BufferDesc {
                width: b.width,
                height: b.height,
                format: b.format,
                source: b.source,
            });
            refs.insert(name.as_str(), r);
        }

        for (name, b) in &self.buffers {
            if b.combined_from.is_empty() {
                continue;
            }
            let mut ancestry = Vec::with_capacity(b.combined_from.len());
            for (z, c) in b.combined_from.iter().enumerate() {
                let src = resolve(&refs, &c.buffer)?;
                let z = u32::try_from(z)
                    .map_err(|_| LayervalError::validation("too many contributors"))?;
                let mut t = LayerTransform::from_placement(Some(src), &c.placement)
                    .with_z_order(ZOrderKey::for_index(z)?)
                    .with_blend(c.blend)
                    .with_plane_alpha(c.plane_alpha)
                    .with_pixel_alpha(store.has_pixel_alpha(src)?);
                if let Some(layer) = c.layer {
                    t = t.with_layer_index(layer);
                }
                ancestry.push(t);
            }
            store.set_combined_from(resolve(&refs, name)?, ancestry)?;
        }
        Ok((store, refs))
    }

    /// Check every display.
    ///
    /// A scenario is a snapshot with no start-up phase, so the grace period is ignored.
    #[tracing::instrument(skip_all, fields(frame = self.frame, displays = self.displays.len()))]
    pub fn run(&self, config: &ValidationConfig) -> LayervalResult<ScenarioReport> {
        self.validate()?;
        config.validate()?;
        let config = ValidationConfig {
            grace_frames: 0,
            ..config.clone()
        };
        let (store, refs) = self.build_store()?;

        let mut validators = Vec::with_capacity(self.displays.len());
        let mut layer_lists = Vec::with_capacity(self.displays.len());
        for d in &self.displays {
            let (v, layers) = setup_display(d, &config, &refs, &store)?;
            validators.push(v);
            layer_lists.push(layers);
        }

        let jobs: Vec<FrameJob<'_>> = validators
            .iter()
            .zip(&layer_lists)
            .map(|(display, layers)| FrameJob {
                display,
                frame: FrameIndex(self.frame),
                layers: layers.as_slice(),
            })
            .collect();
        let store = Mutex::new(store);
        let reports = validate_displays(&jobs, &store, config.threads)?;

        let store = store.into_inner().unwrap_or_else(PoisonError::into_inner);
        let unused = store.unused_composition_targets();
        let unused_composition_targets = refs
            .iter()
            .filter(|(_, r)| unused.contains(*r))
            .map(|(name, _)| (*name).to_owned())
            .collect();
        Ok(ScenarioReport {
            reports,
            unused_composition_targets,
        })
    }
}

fn setup_display(
    d: &DisplaySpec,
    config: &ValidationConfig,
    refs: &BTreeMap<&str, BufferRef>,
    store: &BufferStore,
) -> LayervalResult<(DisplayValidator, Vec<FrameLayer>)> {
    let v = DisplayValidator::new(
        DisplayId(d.id),
        d.width,
        d.height,
        config,
        Box::new(TracingSink),
    );
    if let Some([w, h]) = d.logical_size {
        v.set_logical_size(w, h);
    }
    if let Some(pf) = d.panel_fitter {
        v.set_panel_fitter(pf.mode, pf.source_width, pf.source_height);
    }
    v.set_enabled(d.enabled);

    for p in &d.planes {
        let buffer = resolve(refs, &p.buffer)?;
        let format = match p.format {
            Some(f) => f,
            None => store.desc(buffer)?.format,
        };
        v.add_plane(p.id, p.z_order)?;
        v.bind_plane(
            p.id,
            &PlaneUpdate {
                buffer,
                placement: p.placement,
                format,
                blend: p.blend,
                plane_alpha: p.plane_alpha,
            },
        )?;
    }
    v.flip();
    for p in d.planes.iter().filter(|p| p.set_display_failed) {
        v.mark_set_display_failed(p.id)?;
    }

    let mut layers = Vec::with_capacity(d.layers.len());
    for l in &d.layers {
        let buffer = l.buffer.as_deref().map(|n| resolve(refs, n)).transpose()?;
        layers.push(FrameLayer {
            buffer,
            placement: l.placement,
            blend: l.blend,
            plane_alpha: l.plane_alpha,
            skip: l.skip,
        });
    }
    Ok((v, layers))
}

fn resolve(refs: &BTreeMap<&str, BufferRef>, name: &str) -> LayervalResult<BufferRef> {
    refs.get(name)
        .copied()
        .ok_or_else(|| LayervalError::validation(format!("unknown buffer '{name}'")))
}

#[cfg(test)]
#[path = "../tests/unit/scenario.rs"]
mod tests;
