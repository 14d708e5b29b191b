use crate::foundation::core::{ImageId, Region};
use crate::foundation::error::RestoreResult;
use crate::graphics::backend::GraphicsBackend;
use crate::restorable::command::apply_command;
use crate::restorable::context::RestorableContext;
use crate::restorable::tracker::DependencyTracker;

impl<B: GraphicsBackend> RestorableContext<B> {
    /// Rebuild every texture invalidated by a context loss. A no-op when nothing was lost.
    ///
    /// Images are rebuilt sources first: allocate, upload the baseline, replay the history.
    /// Images restored before a failure stay valid; the next call picks up the rest.
    #[tracing::instrument(skip(self))]
    pub fn restore_if_needed(&mut self) -> RestoreResult<()> {
        if self.backend.is_context_lost() {
            self.backend.recover_context()?;
            let mut invalidated = 0usize;
            for (_, img) in self.images.iter_mut() {
                invalidated += usize::from(img.texture.take().is_some());
            }
            self.restore_pending = true;
            tracing::warn!(invalidated, "graphics context lost; textures invalidated");
        }
        if !self.restore_pending {
            return Ok(());
        }

        let mut tracker = DependencyTracker::new();
        for (id, img) in self.images.iter().filter(|(_, img)| img.texture.is_none()) {
            tracker.add_image(id);
            for cmd in &img.history {
                for &dep in cmd.dependencies() {
                    tracker.add_dependency(id, dep);
                }
            }
        }
        let order = tracker.order()?;
        tracing::debug!(images = order.len(), "restoring images");

        for id in order {
            if let Err(e) = self.restore_image(id) {
                tracing::warn!(image = ?id, error = %e, "restore pass stopped");
                return Err(e);
            }
        }
        self.restore_pending = false;
        Ok(())
    }

    fn restore_image(&mut self, id: ImageId) -> RestoreResult<()> {
        let img = self.images.get(id)?;
        let texture = self.backend.allocate_texture(img.width, img.height)?;

        let replayed = (|| -> RestoreResult<()> {
            // Roots are redrawn by the application; a cleared texture is enough.
            if img.is_root {
                return Ok(());
            }
            self.backend.upload_pixels(
                texture,
                Region::full(img.width, img.height),
                Some(img.base_pixels.as_bytes()),
            )?;
            for cmd in &img.history {
                apply_command(&mut self.backend, &self.images, texture, cmd)?;
            }
            Ok(())
        })();

        match replayed {
            Ok(()) => {
                tracing::debug!(image = ?id, commands = img.history.len(), "restored");
                self.images.get_mut(id)?.texture = Some(texture);
                Ok(())
            }
            Err(e) => {
                self.backend.release_texture(texture);
                Err(e)
            }
        }
    }
}
