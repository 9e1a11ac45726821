/// How a failed check should be treated.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Expected and actual state disagree. Budgeted per display.
    Mismatch,
    /// State was combined in a way the pipeline cannot honour. Always reported.
    Policy,
    /// The validator itself hit an inconsistency.
    Internal,
}

/// Every check the validator can fail.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    PlaneCrop,
    PlaneScale,
    PlaneTransform,
    PlaneBlending,
    PixelAlpha,
    PlaneAlpha,
    CompositionBlend,
    InternalZOrder,
    InternalError,
    LayerDisplay,
    LayerOrder,
    BackPlanePixelFormat,
}

impl CheckKind {
    pub const ALL: [Self; 12] = [
        Self::PlaneCrop,
        Self::PlaneScale,
        Self::PlaneTransform,
        Self::PlaneBlending,
        Self::PixelAlpha,
        Self::PlaneAlpha,
        Self::CompositionBlend,
        Self::InternalZOrder,
        Self::InternalError,
        Self::LayerDisplay,
        Self::LayerOrder,
        Self::BackPlanePixelFormat,
    ];

    pub const fn class(self) -> ErrorClass {
        match self {
            Self::CompositionBlend | Self::BackPlanePixelFormat => ErrorClass::Policy,
            Self::InternalZOrder | Self::InternalError => ErrorClass::Internal,
            Self::PlaneCrop
            | Self::PlaneScale
            | Self::PlaneTransform
            | Self::PlaneBlending
            | Self::PixelAlpha
            | Self::PlaneAlpha
            | Self::LayerDisplay
            | Self::LayerOrder => ErrorClass::Mismatch,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlaneCrop => "plane_crop",
            Self::PlaneScale => "plane_scale",
            Self::PlaneTransform => "plane_transform",
            Self::PlaneBlending => "plane_blending",
            Self::PixelAlpha => "pixel_alpha",
            Self::PlaneAlpha => "plane_alpha",
            Self::CompositionBlend => "composition_blend",
            Self::InternalZOrder => "internal_z_order",
            Self::InternalError => "internal_error",
            Self::LayerDisplay => "layer_display",
            Self::LayerOrder => "layer_order",
            Self::BackPlanePixelFormat => "back_plane_pixel_format",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
