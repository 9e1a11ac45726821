//! layerval checks that what hardware display planes show matches what the compositor asked
//! for.
//!
//! The crate is built around one value type, [`LayerTransform`], and an algebra over it:
//!
//! - [`compose`] and [`inverse`] chain crop/scale/offset/rotation placements
//! - [`ZOrderKey`] nests stacking positions of composed buffers into one sortable key
//! - [`expand_plane`] flattens a plane's buffer ancestry into screen-relative transforms
//! - [`ComparisonValidator`] compares expected against actual transforms and reports
//!   [`Discrepancy`] records, gated by an [`ErrorBudget`]
//!
//! [`DisplayValidator`] ties these together per display, and [`Scenario`] describes a whole
//! frame in JSON for the `layerval` command line tool.
#![forbid(unsafe_code)]

mod foundation;

pub mod buffer;
pub mod config;
pub mod display;
pub mod scenario;
pub mod transform;
pub mod validate;

pub use crate::foundation::core::{DisplayId, FrameIndex, PixelRect, Rect, Vec2};
pub use crate::foundation::error::{LayervalError, LayervalResult};

pub use crate::buffer::format::PixelFormat;
pub use crate::buffer::source::{BufferSource, SourceMask};
pub use crate::buffer::store::{BufferDesc, BufferRef, BufferStore};
pub use crate::config::ValidationConfig;
pub use crate::display::budget::{ErrorBudget, FrameBudget, Unlimited};
pub use crate::display::expand::{ExpandedSet, expand_plane};
pub use crate::display::plane::{PlaneBinding, PlaneUpdate};
pub use crate::scenario::{Scenario, ScenarioReport};
pub use crate::transform::compose::{Composed, PolicyViolation, compose, inverse};
pub use crate::transform::derive::{
    PanelFitterMode, fixed_aspect_ratio, panel_fitter, source_rect_for, visible_region,
};
pub use crate::transform::discrete::{AxisMap, DiscreteTransform, effective_axes};
pub use crate::transform::layer::{BlendMode, LayerTransform, Placement};
pub use crate::transform::zorder::ZOrderKey;
pub use crate::validate::check::{CheckKind, ErrorClass};
pub use crate::validate::compare::{CheckState, ComparisonValidator, Tolerances};
pub use crate::validate::frame::{DisplayValidator, FrameJob, FrameLayer, validate_displays};
pub use crate::validate::report::{
    CollectingSink, Detail, DiagnosticsSink, Discrepancy, FrameReport, TracingSink,
};
