/// Pixel formats a display plane or buffer may carry.
///
/// Only what the validator needs is modelled: whether the format has a per-pixel alpha
/// channel, and its name for diagnostics.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Argb8888,
    Abgr8888,
    Rgba8888,
    Bgra8888,
    Argb2101010,
    Abgr2101010,
    Xrgb8888,
    Xbgr8888,
    Rgbx8888,
    Bgrx8888,
    Rgb888,
    Rgb565,
    Nv12,
    Nv21,
    Yuyv,
    Uyvy,
    Yuv420,
    P010,
}

impl PixelFormat {
    pub const fn has_pixel_alpha(self) -> bool {
        match self {
            Self::Argb8888
            | Self::Abgr8888
            | Self::Rgba8888
            | Self::Bgra8888
            | Self::Argb2101010
            | Self::Abgr2101010 => true,
            Self::Xrgb8888
            | Self::Xbgr8888
            | Self::Rgbx8888
            | Self::Bgrx8888
            | Self::Rgb888
            | Self::Rgb565
            | Self::Nv12
            | Self::Nv21
            | Self::Yuyv
            | Self::Uyvy
            | Self::Yuv420
            | Self::P010 => false,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Argb8888 => "ARGB8888",
            Self::Abgr8888 => "ABGR8888",
            Self::Rgba8888 => "RGBA8888",
            Self::Bgra8888 => "BGRA8888",
            Self::Argb2101010 => "ARGB2101010",
            Self::Abgr2101010 => "ABGR2101010",
            Self::Xrgb8888 => "XRGB8888",
            Self::Xbgr8888 => "XBGR8888",
            Self::Rgbx8888 => "RGBX8888",
            Self::Bgrx8888 => "BGRX8888",
            Self::Rgb888 => "RGB888",
            Self::Rgb565 => "RGB565",
            Self::Nv12 => "NV12",
            Self::Nv21 => "NV21",
            Self::Yuyv => "YUYV",
            Self::Uyvy => "UYVY",
            Self::Yuv420 => "YUV420",
            Self::P010 => "P010",
        };
        f.write_str(name)
    }
}
