use std::collections::HashMap;

use crate::foundation::error::{RestoreError, RestoreResult};

/// Pool configuration for recycled texture storage.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TexturePoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained pixmaps per (w,h) bucket.
    pub max_textures_per_bucket: usize,
}

impl Default for TexturePoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 64 * 1024 * 1024,
            max_textures_per_bucket: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TextureKey {
    w: u16,
    h: u16,
}

impl TextureKey {
    fn new(width: u32, height: u32) -> RestoreResult<Self> {
        let w = u16::try_from(width)
            .map_err(|_| RestoreError::backend(format!("texture width exceeds u16: {width}")))?;
        let h = u16::try_from(height)
            .map_err(|_| RestoreError::backend(format!("texture height exceeds u16: {height}")))?;
        Ok(Self { w, h })
    }

    fn byte_len(self) -> usize {
        (self.w as usize).saturating_mul(self.h as usize).saturating_mul(4)
    }
}

/// Allocation counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TexturePoolStats {
    /// Pixmaps currently parked in the pool.
    pub retained_textures: usize,
    /// Bytes currently parked in the pool.
    pub retained_bytes: usize,
    /// Fresh pixmap allocations.
    pub alloc_textures: u64,
    /// Bytes of fresh pixmap allocations.
    pub alloc_bytes: u64,
    /// Releases that were dropped instead of pooled.
    pub dropped_on_release: u64,
}

/// Bounded pool of CPU pixmaps backing [`crate::CpuBackend`] textures, keyed by size.
pub(crate) struct TexturePool {
    opts: TexturePoolOpts,
    stats: TexturePoolStats,
    buckets: HashMap<TextureKey, Vec<vello_cpu::Pixmap>>,
}

impl TexturePool {
    pub(crate) fn new(opts: TexturePoolOpts) -> Self {
        Self {
            opts,
            stats: TexturePoolStats::default(),
            buckets: HashMap::new(),
        }
    }

    pub(crate) fn stats(&self) -> TexturePoolStats {
        self.stats
    }

    /// Take a pixmap of the given size. Contents are unspecified.
    pub(crate) fn borrow(&mut self, width: u32, height: u32) -> RestoreResult<vello_cpu::Pixmap> {
        let key = TextureKey::new(width, height)?;
        if let Some(p) = self.buckets.get_mut(&key).and_then(Vec::pop) {
            self.stats.retained_textures = self.stats.retained_textures.saturating_sub(1);
            self.stats.retained_bytes = self.stats.retained_bytes.saturating_sub(key.byte_len());
            return Ok(p);
        }

        self.stats.alloc_textures = self.stats.alloc_textures.saturating_add(1);
        self.stats.alloc_bytes = self.stats.alloc_bytes.saturating_add(key.byte_len() as u64);
        Ok(vello_cpu::Pixmap::new(key.w, key.h))
    }

    pub(crate) fn release(&mut self, pixmap: vello_cpu::Pixmap) {
        let key = TextureKey {
            w: pixmap.width(),
            h: pixmap.height(),
        };
        let bytes = key.byte_len();
        if self.opts.max_pool_bytes == 0
            || self.opts.max_textures_per_bucket == 0
            || self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes
        {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bucket = self.buckets.entry(key).or_default();
        if bucket.len() >= self.opts.max_textures_per_bucket {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        bucket.push(pixmap);
        self.stats.retained_textures = self.stats.retained_textures.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
    }

    /// Drop every retained pixmap, as a device reset does.
    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
        self.stats.retained_textures = 0;
        self.stats.retained_bytes = 0;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graphics/texture_pool.rs"]
mod tests;
