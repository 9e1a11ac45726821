/// Where a buffer's content came from.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BufferSource {
    /// Submitted directly by an application.
    #[default]
    Input,
    /// Client-side (GPU) composition target.
    ClientComposition,
    /// Partitioned composer output.
    PartitionedComposer,
    /// Writeback connector output.
    Writeback,
    /// Allocated by the composer itself for its own use.
    Hwc,
    /// Produced by the validator's reference composer.
    Validation,
}

impl BufferSource {
    /// True for buffers that are the output of a composition stage.
    pub const fn is_composition_target(self) -> bool {
        !matches!(self, Self::Input | Self::Hwc)
    }

    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Input => "In",
            Self::ClientComposition => "Sf",
            Self::PartitionedComposer => "PC",
            Self::Writeback => "WB",
            Self::Hwc => "Hwc",
            Self::Validation => "Val",
        }
    }

    const ALL: [Self; 6] = [
        Self::Input,
        Self::ClientComposition,
        Self::PartitionedComposer,
        Self::Writeback,
        Self::Hwc,
        Self::Validation,
    ];
}

/// Set of [`BufferSource`]s that contributed to a flattened transform.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SourceMask(pub u32);

impl SourceMask {
    pub const EMPTY: Self = Self(0);

    pub const fn with(self, source: BufferSource) -> Self {
        Self(self.0 | source.bit())
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, source: BufferSource) -> bool {
        self.0 & source.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when any composition-target source contributed.
    pub fn is_composed(self) -> bool {
        BufferSource::ALL
            .iter()
            .any(|s| s.is_composition_target() && self.contains(*s))
    }
}

impl From<BufferSource> for SourceMask {
    fn from(source: BufferSource) -> Self {
        Self(source.bit())
    }
}

impl std::fmt::Display for SourceMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for s in BufferSource::ALL {
            if self.contains(s) {
                write!(f, " {}", s.label())?;
            }
        }
        Ok(())
    }
}
