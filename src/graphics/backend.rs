use crate::foundation::core::{Pixels, Region, TextureId};
use crate::foundation::error::RestoreResult;
use crate::graphics::draw::{Address, CompositeMode, Filter, Geometry};
use crate::graphics::program::{BoundUniform, CompiledProgram};

/// One draw call as seen by the backend: every image reference already resolved to a texture.
#[derive(Clone, Copy, Debug)]
pub struct DrawSubmission<'a> {
    /// Textures of the direct sources, in order.
    pub sources: &'a [TextureId],
    /// Triangles and clip regions.
    pub geometry: &'a Geometry,
    /// Blend operator.
    pub mode: CompositeMode,
    /// Source filter.
    pub filter: Filter,
    /// Source addressing.
    pub address: Address,
    /// Program to run per fragment; `None` selects the fixed textured-triangle path.
    pub program: Option<&'a CompiledProgram>,
    /// Uniform values indexed by slot.
    pub uniforms: &'a [BoundUniform],
}

/// Graphics command layer the restorable images sit on.
///
/// Commands submitted against one texture are applied in submission order. Every handle becomes
/// invalid once the context is lost; [`GraphicsBackend::recover_context`] re-establishes a
/// usable device with no textures.
pub trait GraphicsBackend {
    /// Allocate a transparent `width x height` texture.
    fn allocate_texture(&mut self, width: u32, height: u32) -> RestoreResult<TextureId>;

    /// Release a texture. Unknown handles (e.g. from before a context loss) are ignored.
    fn release_texture(&mut self, texture: TextureId);

    /// Overwrite `region` with tightly packed premultiplied RGBA8, or clear it when `data` is
    /// `None`.
    fn upload_pixels(
        &mut self,
        texture: TextureId,
        region: Region,
        data: Option<&[u8]>,
    ) -> RestoreResult<()>;

    /// Read back the full contents of a texture.
    fn read_pixels(&mut self, texture: TextureId) -> RestoreResult<Pixels>;

    /// Rasterize `draw` into `target`.
    fn submit_draw(&mut self, target: TextureId, draw: &DrawSubmission<'_>) -> RestoreResult<()>;

    /// `true` once the device has dropped its resources and until it is recovered.
    fn is_context_lost(&self) -> bool;

    /// Re-establish the device after a loss.
    fn recover_context(&mut self) -> RestoreResult<()>;

    /// `true` when programmable draws are supported.
    fn is_shader_available(&self) -> bool;
}
