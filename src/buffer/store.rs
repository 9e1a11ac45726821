//! Generational arena of tracked buffers and their composition ancestry.

use std::fmt;

use crate::buffer::format::PixelFormat;
use crate::buffer::source::BufferSource;
use crate::foundation::error::{LayervalError, LayervalResult};
use crate::transform::layer::LayerTransform;
use crate::transform::zorder::MAX_LEVELS;

/// A handle to a buffer in a [`BufferStore`].
///
/// Carries a slot index and a generation counter so that handles to a released buffer are
/// detected after the slot is reused. The buffer's provenance is stamped into the handle
/// because it never changes over the buffer's life.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRef {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
    origin: BufferSource,
}

impl BufferRef {
    /// Raw slot index (diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    #[inline]
    #[must_use]
    pub const fn origin(self) -> BufferSource {
        self.origin
    }

    #[inline]
    #[must_use]
    pub const fn is_composition_target(self) -> bool {
        self.origin.is_composition_target()
    }
}

impl fmt::Debug for BufferRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BufferRef({}@gen{} {})",
            self.idx,
            self.generation,
            self.origin.label()
        )
    }
}

impl serde::Serialize for BufferRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{self:?}"))
    }
}

/// Static description of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BufferDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    #[serde(default)]
    pub source: BufferSource,
}

#[derive(Debug)]
struct Entry {
    desc: BufferDesc,
    combined_from: Vec<LayerTransform>,
    used: bool,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Tracks every buffer the validator has seen.
///
/// Each buffer records the placements that were combined to produce it (its ancestry) and
/// whether any plane has shown it since the last [`BufferStore::reset_usage`].
#[derive(Debug, Default)]
pub struct BufferStore {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn insert(&mut self, desc: BufferDesc) -> BufferRef {
        let entry = Entry {
            desc,
            combined_from: Vec::new(),
            used: false,
        };
        self.live += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.entry = Some(entry);
            return BufferRef {
                idx,
                generation: slot.generation,
                origin: desc.source,
            };
        }
        let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        BufferRef {
            idx,
            generation: 0,
            origin: desc.source,
        }
    }

    /// Release a buffer. Existing handles to it become stale.
    pub fn remove(&mut self, buf: BufferRef) -> LayervalResult<BufferDesc> {
        self.entry(buf)?;
        let slot = &mut self.slots[buf.idx as usize];
        slot.generation = slot.generation.wrapping_add(1);
        let entry = slot.entry.take().ok_or(LayervalError::StaleBuffer(buf))?;
        self.free_list.push(buf.idx);
        self.live -= 1;
        Ok(entry.desc)
    }

    pub fn is_alive(&self, buf: BufferRef) -> bool {
        self.entry(buf).is_ok()
    }

    pub fn desc(&self, buf: BufferRef) -> LayervalResult<BufferDesc> {
        Ok(self.entry(buf)?.desc)
    }

    pub fn has_pixel_alpha(&self, buf: BufferRef) -> LayervalResult<bool> {
        Ok(self.entry(buf)?.desc.format.has_pixel_alpha())
    }

    /// Replace the list of placements that were combined into `buf`.
    pub fn set_combined_from(
        &mut self,
        buf: BufferRef,
        ancestry: Vec<LayerTransform>,
    ) -> LayervalResult<()> {
        self.entry_mut(buf)?.combined_from = ancestry;
        Ok(())
    }

    pub fn add_combined_from(&mut self, buf: BufferRef, t: LayerTransform) -> LayervalResult<()> {
        self.entry_mut(buf)?.combined_from.push(t);
        Ok(())
    }

    pub fn combined_from(&self, buf: BufferRef) -> LayervalResult<&[LayerTransform]> {
        Ok(&self.entry(buf)?.combined_from)
    }

    /// True when `ancestor` contributed to `buf`, directly or through intermediate buffers.
    pub fn is_combined_from(&self, buf: BufferRef, ancestor: BufferRef) -> LayervalResult<bool> {
        self.is_combined_from_at(buf, ancestor, 0)
    }

    fn is_combined_from_at(
        &self,
        buf: BufferRef,
        ancestor: BufferRef,
        depth: usize,
    ) -> LayervalResult<bool> {
        if depth >= usize::from(MAX_LEVELS) {
            tracing::error!(?buf, depth, "buffer ancestry too deep");
            return Err(LayervalError::AncestryTooDeep(usize::from(MAX_LEVELS)));
        }
        for t in self.combined_from(buf)? {
            let Some(src) = t.source() else { continue };
            if src == ancestor || self.is_combined_from_at(src, ancestor, depth + 1)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn mark_used(&mut self, buf: BufferRef) -> LayervalResult<()> {
        self.entry_mut(buf)?.used = true;
        Ok(())
    }

    pub fn is_used(&self, buf: BufferRef) -> LayervalResult<bool> {
        Ok(self.entry(buf)?.used)
    }

    pub fn reset_usage(&mut self) {
        for entry in self.slots.iter_mut().filter_map(|s| s.entry.as_mut()) {
            entry.used = false;
        }
    }

    /// Live composition targets that no plane has shown since the last usage reset.
    pub fn unused_composition_targets(&self) -> Vec<BufferRef> {
        self.refs()
            .filter(|r| r.is_composition_target())
            .filter(|r| self.is_used(*r).is_ok_and(|used| !used))
            .collect()
    }

    fn refs(&self) -> impl Iterator<Item = BufferRef> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            let entry = slot.entry.as_ref()?;
            Some(BufferRef {
                idx: u32::try_from(i).ok()?,
                generation: slot.generation,
                origin: entry.desc.source,
            })
        })
    }

    fn entry(&self, buf: BufferRef) -> LayervalResult<&Entry> {
        self.slots
            .get(buf.idx as usize)
            .filter(|s| s.generation == buf.generation)
            .and_then(|s| s.entry.as_ref())
            .ok_or(LayervalError::StaleBuffer(buf))
    }

    fn entry_mut(&mut self, buf: BufferRef) -> LayervalResult<&mut Entry> {
        self.slots
            .get_mut(buf.idx as usize)
            .filter(|s| s.generation == buf.generation)
            .and_then(|s| s.entry.as_mut())
            .ok_or(LayervalError::StaleBuffer(buf))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/store.rs"]
mod tests;
