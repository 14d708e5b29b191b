use std::sync::Arc;

use smallvec::SmallVec;

use crate::foundation::core::{ImageId, Pixels, Region, ShaderId, TextureId};
use crate::foundation::error::{RestoreError, RestoreResult};
use crate::graphics::backend::{DrawSubmission, GraphicsBackend};
use crate::graphics::draw::{Address, CompositeMode, Filter, Geometry, MAX_SOURCES};
use crate::graphics::program::BoundUniform;
use crate::restorable::image::ImageTable;
use crate::restorable::shader::{Shader, UniformValue, Uniforms};

/// Parameters of a triangle draw onto an image.
#[derive(Clone, Debug)]
pub struct DrawTriangles {
    /// Images sampled directly, in order.
    pub sources: SmallVec<[ImageId; MAX_SOURCES]>,
    /// Triangles and clip regions.
    pub geometry: Geometry,
    /// Blend operator.
    pub mode: CompositeMode,
    /// Source filter.
    pub filter: Filter,
    /// Source addressing.
    pub address: Address,
    /// Optional program; `None` selects the fixed textured-triangle path.
    pub shader: Option<Shader>,
    /// Uniform values for `shader`, keyed by slot.
    pub uniforms: Uniforms,
}

impl DrawTriangles {
    /// Untextured draw with default blending and sampling.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            sources: SmallVec::new(),
            geometry,
            mode: CompositeMode::default(),
            filter: Filter::default(),
            address: Address::default(),
            shader: None,
            uniforms: Uniforms::new(),
        }
    }

    /// Append a direct source.
    pub fn source(mut self, image: ImageId) -> Self {
        self.sources.push(image);
        self
    }

    /// Set the blend operator.
    pub fn mode(mut self, mode: CompositeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the source filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the source addressing.
    pub fn address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Run `shader` with `uniforms`.
    pub fn shader(mut self, shader: &Shader, uniforms: Uniforms) -> Self {
        self.shader = Some(shader.clone());
        self.uniforms = uniforms;
        self
    }

    /// Every image read by this draw: direct sources first, then image uniforms by slot.
    pub fn dependencies(&self) -> SmallVec<[ImageId; MAX_SOURCES]> {
        let mut deps = SmallVec::<[ImageId; MAX_SOURCES]>::new();
        let uniform_images = self.uniforms.values().filter_map(|v| match v {
            UniformValue::Image(id) => Some(*id),
            UniformValue::Floats(_) => None,
        });
        for id in self.sources.iter().copied().chain(uniform_images) {
            if !deps.contains(&id) {
                deps.push(id);
            }
        }
        deps
    }
}

/// What a recorded command does.
#[derive(Clone, Debug)]
pub enum CommandKind {
    /// Rasterize triangles, sampling other images.
    Triangles(DrawTriangles),
    /// Overwrite a region from CPU data; `None` clears it.
    ReplacePixels {
        /// Target region.
        region: Region,
        /// Tightly packed premultiplied RGBA8 for `region`.
        pixels: Option<Arc<[u8]>>,
    },
}

/// Immutable record of one operation in an image's history.
#[derive(Clone, Debug)]
pub struct DrawCommand {
    kind: CommandKind,
    dependencies: SmallVec<[ImageId; MAX_SOURCES]>,
    frozen: SmallVec<[(ImageId, Arc<Pixels>); 1]>,
}

impl DrawCommand {
    pub(crate) fn triangles(draw: DrawTriangles) -> Self {
        let dependencies = draw.dependencies();
        Self {
            kind: CommandKind::Triangles(draw),
            dependencies,
            frozen: SmallVec::new(),
        }
    }

    pub(crate) fn replace_pixels(region: Region, pixels: Option<Arc<[u8]>>) -> Self {
        Self {
            kind: CommandKind::ReplacePixels { region, pixels },
            dependencies: SmallVec::new(),
            frozen: SmallVec::new(),
        }
    }

    /// Sample `pixels` in place of the live texture of `image`, now and on every replay.
    /// `image` stops counting as a dependency.
    pub(crate) fn freeze_source(&mut self, image: ImageId, pixels: Pixels) {
        self.dependencies.retain(|d| *d != image);
        self.frozen.push((image, Arc::new(pixels)));
    }

    /// The recorded operation.
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Images whose current pixels this command reads.
    pub fn dependencies(&self) -> &[ImageId] {
        &self.dependencies
    }

    /// Sources sampled from a snapshot taken when the command was recorded.
    pub fn frozen_sources(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.frozen.iter().map(|(id, _)| *id)
    }

    /// `true` when this command samples the live pixels of `image`.
    pub fn reads(&self, image: ImageId) -> bool {
        self.dependencies.contains(&image)
    }

    /// `true` when this command runs `shader`.
    pub fn uses_shader(&self, shader: ShaderId) -> bool {
        match &self.kind {
            CommandKind::Triangles(d) => d.shader.as_ref().is_some_and(|s| s.id() == shader),
            CommandKind::ReplacePixels { .. } => false,
        }
    }
}

fn bind_uniforms(
    draw: &DrawTriangles,
    texture: impl Fn(ImageId) -> RestoreResult<TextureId>,
) -> RestoreResult<Vec<BoundUniform>> {
    let Some(shader) = &draw.shader else {
        return Ok(Vec::new());
    };
    (0..shader.program().uniforms().len())
        .map(|slot| match draw.uniforms.get(&slot) {
            Some(UniformValue::Floats(v)) => Ok(BoundUniform::Floats(v.clone())),
            Some(UniformValue::Image(id)) => texture(*id).map(BoundUniform::Texture),
            None => Err(RestoreError::uniform(format!(
                "{}: slot {slot} has no value",
                shader.program().label()
            ))),
        })
        .collect()
}

/// Submit `cmd` against `target`, resolving every image reference to its live texture.
/// Frozen sources are uploaded to scratch textures for the duration of the draw.
pub(crate) fn apply_command<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    images: &ImageTable,
    target: TextureId,
    cmd: &DrawCommand,
) -> RestoreResult<()> {
    let draw = match &cmd.kind {
        CommandKind::ReplacePixels { region, pixels } => {
            return backend.upload_pixels(target, *region, pixels.as_deref());
        }
        CommandKind::Triangles(draw) => draw,
    };
    if let Some(shader) = &draw.shader
        && !backend.is_shader_available()
    {
        return Err(RestoreError::unsupported(format!(
            "shader {} needs programmable draws",
            shader.program().label()
        )));
    }

    let mut scratch = SmallVec::<[(ImageId, TextureId); 1]>::new();
    let result = (|| -> RestoreResult<()> {
        for (id, pixels) in &cmd.frozen {
            let texture = backend.allocate_texture(pixels.width(), pixels.height())?;
            scratch.push((*id, texture));
            backend.upload_pixels(
                texture,
                Region::full(pixels.width(), pixels.height()),
                Some(pixels.as_bytes()),
            )?;
        }
        let texture = |id: ImageId| match scratch.iter().find(|(frozen, _)| *frozen == id) {
            Some((_, t)) => Ok(*t),
            None => images.texture(id),
        };
        let sources = draw
            .sources
            .iter()
            .map(|id| texture(*id))
            .collect::<RestoreResult<SmallVec<[TextureId; MAX_SOURCES]>>>()?;
        let uniforms = bind_uniforms(draw, texture)?;
        backend.submit_draw(
            target,
            &DrawSubmission {
                sources: &sources,
                geometry: &draw.geometry,
                mode: draw.mode,
                filter: draw.filter,
                address: draw.address,
                program: draw.shader.as_ref().map(Shader::program),
                uniforms: &uniforms,
            },
        )
    })();

    for (_, texture) in scratch {
        backend.release_texture(texture);
    }
    result
}

#[cfg(test)]
#[path = "../../tests/unit/restorable/command.rs"]
mod tests;
