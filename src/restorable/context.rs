use std::collections::HashSet;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::foundation::core::{ImageId, Pixels, Region, ShaderId};
use crate::foundation::error::{RestoreError, RestoreResult};
use crate::graphics::backend::GraphicsBackend;
use crate::graphics::draw::MAX_SOURCES;
use crate::graphics::program::CompiledProgram;
use crate::restorable::command::{DrawCommand, DrawTriangles, apply_command};
use crate::restorable::config::{ContextOpts, ResolvePolicy};
use crate::restorable::image::{Image, ImageInfo, ImageTable};
use crate::restorable::shader::{Shader, check_uniforms};

/// Registry of every live restorable image on one graphics device.
///
/// Create it when the device is created and [`shutdown`](Self::shutdown) it before the device
/// goes away. All calls happen on the submission thread; resolve and restore passes must not
/// interleave with drawing.
pub struct RestorableContext<B: GraphicsBackend> {
    pub(crate) backend: B,
    pub(crate) opts: ContextOpts,
    pub(crate) images: ImageTable,
    shaders: HashSet<ShaderId>,
    next_shader: u32,
    pub(crate) restore_pending: bool,
}

impl<B: GraphicsBackend> RestorableContext<B> {
    /// Take ownership of `backend`.
    pub fn new(backend: B, opts: ContextOpts) -> Self {
        Self {
            backend,
            opts,
            images: ImageTable::default(),
            shaders: HashSet::new(),
            next_shader: 0,
            restore_pending: false,
        }
    }

    /// Options in effect.
    pub fn opts(&self) -> &ContextOpts {
        &self.opts
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the underlying backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// `true` while textures lost with the context still await [`Self::restore_if_needed`].
    pub fn is_restore_pending(&self) -> bool {
        self.restore_pending || self.backend.is_context_lost()
    }

    /// Release every texture and hand the backend back.
    pub fn shutdown(mut self) -> B {
        for img in self.images.drain() {
            if let Some(t) = img.texture {
                self.backend.release_texture(t);
            }
        }
        tracing::debug!("restorable context shut down");
        self.backend
    }

    /// Create a transparent image. Root images are screen targets and keep no history.
    pub fn new_image(&mut self, width: u32, height: u32, is_root: bool) -> RestoreResult<ImageId> {
        if width == 0 || height == 0 {
            return Err(RestoreError::geometry(format!(
                "image size must be non-zero, got {width}x{height}"
            )));
        }
        self.ensure_ready()?;
        let texture = self.backend.allocate_texture(width, height)?;
        let image = match Image::new(width, height, is_root, texture) {
            Ok(img) => img,
            Err(e) => {
                self.backend.release_texture(texture);
                return Err(e);
            }
        };
        self.images.insert(image)
    }

    /// Bookkeeping snapshot of `id`.
    pub fn image(&self, id: ImageId) -> RestoreResult<ImageInfo> {
        let img = self.images.get(id)?;
        Ok(ImageInfo {
            id,
            width: img.width,
            height: img.height,
            is_root: img.is_root,
            history_len: img.history.len(),
            stale: img.stale,
            texture_valid: img.texture.is_some(),
        })
    }

    /// Live images in ascending id order.
    pub fn image_ids(&self) -> Vec<ImageId> {
        self.images.iter().map(|(id, _)| id).collect()
    }

    /// Unresolved commands summed over all images.
    pub fn total_history_len(&self) -> usize {
        self.images.iter().map(|(_, img)| img.history.len()).sum()
    }

    /// Register a compiled program.
    pub fn new_shader(&mut self, program: CompiledProgram) -> Shader {
        let id = ShaderId(self.next_shader);
        self.next_shader += 1;
        self.shaders.insert(id);
        Shader::new(id, program)
    }

    /// Retire `shader`. Images whose history runs it are read back first.
    pub fn dispose_shader(&mut self, shader: &Shader) -> RestoreResult<()> {
        if !self.shaders.contains(&shader.id()) {
            return Err(RestoreError::disposed(format!("shader {:?}", shader.id())));
        }
        let users = self
            .images
            .iter()
            .filter(|(_, img)| img.history.iter().any(|c| c.uses_shader(shader.id())))
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        if !users.is_empty() {
            self.ensure_ready()?;
            for id in users {
                self.flatten(id)?;
            }
        }
        self.shaders.remove(&shader.id());
        Ok(())
    }

    /// Draw triangles onto `target`, recording the command in its history.
    pub fn draw_triangles(&mut self, target: ImageId, draw: DrawTriangles) -> RestoreResult<()> {
        self.ensure_ready()?;
        let (width, height, is_root) = {
            let img = self.images.get(target)?;
            (img.width, img.height, img.is_root)
        };
        draw.geometry.validate(width, height)?;
        if draw.sources.len() > MAX_SOURCES {
            return Err(RestoreError::geometry(format!(
                "at most {MAX_SOURCES} sources per draw, got {}",
                draw.sources.len()
            )));
        }
        match &draw.shader {
            Some(shader) => {
                if !self.shaders.contains(&shader.id()) {
                    return Err(RestoreError::disposed(format!("shader {:?}", shader.id())));
                }
                if !self.backend.is_shader_available() {
                    return Err(RestoreError::unsupported(format!(
                        "shader {} needs programmable draws",
                        shader.program().label()
                    )));
                }
                check_uniforms(shader.program(), &draw.uniforms)?;
            }
            None if !draw.uniforms.is_empty() => {
                return Err(RestoreError::uniform("uniforms given without a shader"));
            }
            None => {}
        }

        let mut cmd = DrawCommand::triangles(draw);
        let mut roots = SmallVec::<[ImageId; MAX_SOURCES]>::new();
        for &dep in cmd.dependencies() {
            if dep == target {
                return Err(RestoreError::geometry(format!(
                    "image {target:?} cannot be drawn from itself"
                )));
            }
            if self.images.get(dep)?.is_root {
                roots.push(dep);
            }
        }

        self.flatten_readers_of(target)?;
        if !is_root {
            self.make_room(target)?;
            // Roots keep no history, so the draw samples a copy taken now.
            for root in roots {
                let pixels = self.backend.read_pixels(self.images.texture(root)?)?;
                tracing::debug!(image = ?target, source = ?root, "froze root source");
                cmd.freeze_source(root, pixels);
            }
        }
        let texture = self.images.texture(target)?;
        apply_command(&mut self.backend, &self.images, texture, &cmd)?;

        if !is_root {
            self.images.get_mut(target)?.append(cmd);
        }
        Ok(())
    }

    /// Overwrite `region` of `target` with tightly packed premultiplied RGBA8.
    pub fn replace_pixels(
        &mut self,
        target: ImageId,
        data: &[u8],
        region: Region,
    ) -> RestoreResult<()> {
        self.replace_region(target, Some(data), region)
    }

    /// Make `region` of `target` transparent.
    pub fn clear(&mut self, target: ImageId, region: Region) -> RestoreResult<()> {
        self.replace_region(target, None, region)
    }

    fn replace_region(
        &mut self,
        target: ImageId,
        data: Option<&[u8]>,
        region: Region,
    ) -> RestoreResult<()> {
        self.ensure_ready()?;
        let img = self.images.get(target)?;
        if !region.fits_within(img.width, img.height) {
            return Err(RestoreError::geometry(format!(
                "region {region:?} exceeds {}x{} image",
                img.width, img.height
            )));
        }
        if let Some(data) = data
            && data.len() != Pixels::byte_len(region.width, region.height)?
        {
            return Err(RestoreError::geometry(format!(
                "expected {} bytes for region {region:?}, got {}",
                Pixels::byte_len(region.width, region.height)?,
                data.len()
            )));
        }

        self.flatten_readers_of(target)?;
        if !self.images.get(target)?.is_root {
            self.make_room(target)?;
        }
        let texture = self.images.texture(target)?;
        self.backend.upload_pixels(texture, region, data)?;

        let img = self.images.get_mut(target)?;
        if img.is_root {
            return Ok(());
        }
        if img.history.is_empty() {
            return img.base_pixels.replace_region(region, data);
        }
        img.append(DrawCommand::replace_pixels(region, data.map(Arc::from)));
        Ok(())
    }

    /// Release the texture and history of `id`. Later use of `id` fails with
    /// [`RestoreError::Disposed`].
    pub fn dispose_image(&mut self, id: ImageId) -> RestoreResult<()> {
        self.images.get(id)?;
        if !self.images.readers_of(id).is_empty() {
            self.ensure_ready()?;
            self.flatten_readers_of(id)?;
        }
        let img = self.images.remove(id)?;
        if let Some(t) = img.texture {
            self.backend.release_texture(t);
        }
        Ok(())
    }

    /// Baseline pixels as of the last resolution, for diagnostics and tests.
    pub fn base_pixels_for_testing(&self, id: ImageId) -> RestoreResult<&Pixels> {
        Ok(&self.images.get(id)?.base_pixels)
    }

    /// Current contents of `id`: read back from the texture when stale, else the baseline.
    pub fn read_pixels(&mut self, id: ImageId) -> RestoreResult<Pixels> {
        let img = self.images.get(id)?;
        if !img.stale && !img.is_root {
            return Ok(img.base_pixels.clone());
        }
        self.ensure_ready()?;
        let texture = self.images.texture(id)?;
        self.backend.read_pixels(texture)
    }

    /// Frame boundary hook: resolve stale images according to the configured policy.
    pub fn end_frame(&mut self) -> RestoreResult<()> {
        match self.opts.resolve_policy {
            ResolvePolicy::EveryFrame => self.resolve_stale_images(),
            ResolvePolicy::HistoryBudget { max_commands } => {
                if self.total_history_len() > max_commands {
                    self.resolve_stale_images()
                } else {
                    Ok(())
                }
            }
            ResolvePolicy::Manual => Ok(()),
        }
    }

    pub(crate) fn ensure_ready(&self) -> RestoreResult<()> {
        if self.is_restore_pending() {
            return Err(RestoreError::backend(
                "graphics context lost; call restore_if_needed first",
            ));
        }
        Ok(())
    }

    /// Fold the texture of `id` into its baseline.
    pub(crate) fn flatten(&mut self, id: ImageId) -> RestoreResult<()> {
        let texture = self.images.texture(id)?;
        let pixels = self.backend.read_pixels(texture)?;
        self.images.get_mut(id)?.resolve_to(pixels);
        Ok(())
    }

    /// Read back every image whose history samples `id`, before `id` changes.
    fn flatten_readers_of(&mut self, id: ImageId) -> RestoreResult<()> {
        for reader in self.images.readers_of(id) {
            tracing::debug!(image = ?reader, source = ?id, "source about to change; reading back");
            self.flatten(reader)?;
        }
        Ok(())
    }

    /// Read `id` back when one more command would exceed the history limit.
    fn make_room(&mut self, id: ImageId) -> RestoreResult<()> {
        let len = self.images.get(id)?.history.len();
        if len >= self.opts.max_image_history {
            tracing::debug!(image = ?id, len, "history limit reached; reading back");
            self.flatten(id)?;
        }
        Ok(())
    }

    /// Append a command without validation or hazard handling.
    #[cfg(test)]
    pub(crate) fn record_unchecked(&mut self, target: ImageId, cmd: DrawCommand) {
        if let Ok(img) = self.images.get_mut(target) {
            img.append(cmd);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/restorable/context.rs"]
mod tests;
