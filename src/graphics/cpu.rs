use std::collections::HashMap;

use smallvec::SmallVec;

use crate::foundation::core::{Pixels, Region, TextureId};
use crate::foundation::error::{RestoreError, RestoreResult};
use crate::graphics::backend::{DrawSubmission, GraphicsBackend};
use crate::graphics::draw::{Address, Filter, MAX_SOURCES};
use crate::graphics::program::{BoundUniform, Fragment, TexelSource};
use crate::graphics::raster::{TexelView, draw_triangles};
use crate::graphics::texture_pool::{TexturePool, TexturePoolOpts, TexturePoolStats};

/// Options for [`CpuBackend`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CpuBackendOpts {
    /// Texture storage recycling limits.
    pub pool: TexturePoolOpts,
    /// Whether programmable draws are accepted.
    pub shaders_available: bool,
}

impl Default for CpuBackendOpts {
    fn default() -> Self {
        Self {
            pool: TexturePoolOpts::default(),
            shaders_available: true,
        }
    }
}

/// Backend operations that can be made to fail on purpose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendOp {
    /// [`GraphicsBackend::allocate_texture`]
    Allocate,
    /// [`GraphicsBackend::upload_pixels`]
    Upload,
    /// [`GraphicsBackend::read_pixels`]
    Read,
    /// [`GraphicsBackend::submit_draw`]
    Draw,
    /// [`GraphicsBackend::recover_context`]
    Recover,
}

/// Operation counters of a [`CpuBackend`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuBackendStats {
    /// Successful texture allocations.
    pub allocations: u64,
    /// Successful uploads.
    pub uploads: u64,
    /// Successful readbacks.
    pub reads: u64,
    /// Successful draw submissions.
    pub draws: u64,
    /// Context recoveries.
    pub recoveries: u64,
    /// Textures currently alive.
    pub live_textures: usize,
    /// Storage pool counters.
    pub pool: TexturePoolStats,
}

struct Texture {
    width: u32,
    height: u32,
    pixmap: vello_cpu::Pixmap,
}

impl Texture {
    fn view(&self) -> TexelView<'_> {
        TexelView::new(self.width, self.height, self.pixmap.data_as_u8_slice())
    }
}

/// Deterministic software implementation of [`GraphicsBackend`].
///
/// Besides rendering it can simulate context loss ([`CpuBackend::lose_context`]) and inject
/// failures into individual operations ([`CpuBackend::fail_next`]).
pub struct CpuBackend {
    opts: CpuBackendOpts,
    textures: HashMap<TextureId, Texture>,
    next_texture: u64,
    pool: TexturePool,
    lost: bool,
    faults: HashMap<BackendOp, u32>,
    stats: CpuBackendStats,
}

impl CpuBackend {
    /// Create a backend with a live context.
    pub fn new(opts: CpuBackendOpts) -> Self {
        Self {
            pool: TexturePool::new(opts.pool),
            opts,
            textures: HashMap::new(),
            next_texture: 1,
            lost: false,
            faults: HashMap::new(),
            stats: CpuBackendStats::default(),
        }
    }

    /// Operation counters.
    pub fn stats(&self) -> CpuBackendStats {
        CpuBackendStats {
            live_textures: self.textures.len(),
            pool: self.pool.stats(),
            ..self.stats
        }
    }

    /// Drop every texture and report the context as lost until recovered.
    pub fn lose_context(&mut self) {
        tracing::debug!(textures = self.textures.len(), "simulating context loss");
        self.textures.clear();
        self.pool.clear();
        self.lost = true;
    }

    /// Make the next call of `op` fail.
    pub fn fail_next(&mut self, op: BackendOp) {
        self.fail_next_n(op, 1);
    }

    /// Make the next `n` calls of `op` fail.
    pub fn fail_next_n(&mut self, op: BackendOp, n: u32) {
        *self.faults.entry(op).or_default() += n;
    }

    /// Toggle programmable draw support.
    pub fn set_shaders_available(&mut self, available: bool) {
        self.opts.shaders_available = available;
    }

    fn check(&mut self, op: BackendOp) -> RestoreResult<()> {
        if let Some(n) = self.faults.get_mut(&op)
            && *n > 0
        {
            *n -= 1;
            return Err(RestoreError::backend(format!("injected {op:?} failure")));
        }
        if self.lost && op != BackendOp::Recover {
            return Err(RestoreError::backend(format!("{op:?} on lost context")));
        }
        Ok(())
    }

    fn texture(&self, id: TextureId) -> RestoreResult<&Texture> {
        self.textures
            .get(&id)
            .ok_or_else(|| RestoreError::backend(format!("unknown texture {id:?}")))
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new(CpuBackendOpts::default())
    }
}

struct DrawTexels<'a> {
    sources: SmallVec<[Option<TexelView<'a>>; MAX_SOURCES]>,
    uniforms: Vec<Option<TexelView<'a>>>,
    filter: Filter,
    address: Address,
    src_region: Option<Region>,
}

impl TexelSource for DrawTexels<'_> {
    fn sample_uniform(&self, slot: usize, texcoord: [f32; 2]) -> [f32; 4] {
        match self.uniforms.get(slot).copied().flatten() {
            Some(view) => view.sample(texcoord, self.filter, self.address, None),
            None => [0.0; 4],
        }
    }

    fn sample_source(&self, index: usize, texcoord: [f32; 2]) -> [f32; 4] {
        match self.sources.get(index).copied().flatten() {
            Some(view) => view.sample(texcoord, self.filter, self.address, self.src_region),
            None => [0.0; 4],
        }
    }
}

impl GraphicsBackend for CpuBackend {
    fn allocate_texture(&mut self, width: u32, height: u32) -> RestoreResult<TextureId> {
        self.check(BackendOp::Allocate)?;
        let mut pixmap = self.pool.borrow(width, height)?;
        pixmap.data_as_u8_slice_mut().fill(0);

        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(
            id,
            Texture {
                width,
                height,
                pixmap,
            },
        );
        self.stats.allocations += 1;
        Ok(id)
    }

    fn release_texture(&mut self, texture: TextureId) {
        if let Some(t) = self.textures.remove(&texture) {
            self.pool.release(t.pixmap);
        }
    }

    fn upload_pixels(
        &mut self,
        texture: TextureId,
        region: Region,
        data: Option<&[u8]>,
    ) -> RestoreResult<()> {
        self.check(BackendOp::Upload)?;
        let t = self
            .textures
            .get_mut(&texture)
            .ok_or_else(|| RestoreError::backend(format!("unknown texture {texture:?}")))?;
        if !region.fits_within(t.width, t.height) {
            return Err(RestoreError::geometry(format!(
                "upload region {region:?} exceeds {}x{} texture",
                t.width, t.height
            )));
        }
        if let Some(data) = data
            && data.len() != Pixels::byte_len(region.width, region.height)?
        {
            return Err(RestoreError::geometry("upload data does not match region"));
        }

        let stride = (t.width as usize) * 4;
        let row_bytes = (region.width as usize) * 4;
        let dst = t.pixmap.data_as_u8_slice_mut();
        for row in 0..region.height as usize {
            let off = (region.y as usize + row) * stride + (region.x as usize) * 4;
            let out = &mut dst[off..off + row_bytes];
            match data {
                Some(src) => out.copy_from_slice(&src[row * row_bytes..(row + 1) * row_bytes]),
                None => out.fill(0),
            }
        }
        self.stats.uploads += 1;
        Ok(())
    }

    fn read_pixels(&mut self, texture: TextureId) -> RestoreResult<Pixels> {
        self.check(BackendOp::Read)?;
        let t = self.texture(texture)?;
        let pixels = Pixels::from_vec(t.width, t.height, t.pixmap.data_as_u8_slice().to_vec())?;
        self.stats.reads += 1;
        Ok(pixels)
    }

    fn submit_draw(&mut self, target: TextureId, draw: &DrawSubmission<'_>) -> RestoreResult<()> {
        self.check(BackendOp::Draw)?;
        if draw.program.is_some() && !self.opts.shaders_available {
            return Err(RestoreError::unsupported("shaders are not available"));
        }
        let reads_target = draw.sources.contains(&target)
            || draw
                .uniforms
                .iter()
                .any(|u| matches!(u, BoundUniform::Texture(t) if *t == target));
        if reads_target {
            return Err(RestoreError::geometry("a texture cannot be drawn from itself"));
        }

        // Detach the target so sources can be borrowed from the map alongside it.
        let mut dst = self
            .textures
            .remove(&target)
            .ok_or_else(|| RestoreError::backend(format!("unknown texture {target:?}")))?;

        let result = (|| -> RestoreResult<()> {
            let sources = draw
                .sources
                .iter()
                .map(|id| self.texture(*id).map(|t| Some(t.view())))
                .collect::<RestoreResult<SmallVec<[_; MAX_SOURCES]>>>()?;
            let uniforms = draw
                .uniforms
                .iter()
                .map(|u| match u {
                    BoundUniform::Texture(id) => self.texture(*id).map(|t| Some(t.view())),
                    BoundUniform::Floats(_) => Ok(None),
                })
                .collect::<RestoreResult<Vec<_>>>()?;
            let texels = DrawTexels {
                sources,
                uniforms,
                filter: draw.filter,
                address: draw.address,
                src_region: draw.geometry.src_region,
            };

            let (w, h) = (dst.width, dst.height);
            draw_triangles(
                dst.pixmap.data_as_u8_slice_mut(),
                w,
                h,
                draw.geometry,
                draw.mode,
                |frag| match draw.program {
                    Some(program) => program.kernel().shade(&Fragment::new(
                        frag.position,
                        frag.texcoord,
                        frag.color,
                        draw.uniforms,
                        &texels,
                    )),
                    None if !draw.sources.is_empty() => {
                        let s = texels.sample_source(0, frag.texcoord);
                        [
                            s[0] * frag.color[0],
                            s[1] * frag.color[1],
                            s[2] * frag.color[2],
                            s[3] * frag.color[3],
                        ]
                    }
                    None => frag.color.map(|c| c.clamp(0.0, 1.0)),
                },
            );
            Ok(())
        })();

        self.textures.insert(target, dst);
        if result.is_ok() {
            self.stats.draws += 1;
        }
        result
    }

    fn is_context_lost(&self) -> bool {
        self.lost
    }

    fn recover_context(&mut self) -> RestoreResult<()> {
        self.check(BackendOp::Recover)?;
        self.textures.clear();
        self.pool.clear();
        self.lost = false;
        self.stats.recoveries += 1;
        tracing::debug!("context recovered");
        Ok(())
    }

    fn is_shader_available(&self) -> bool {
        self.opts.shaders_available
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graphics/cpu.rs"]
mod tests;
