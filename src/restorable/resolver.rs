use crate::foundation::core::ImageId;
use crate::foundation::error::RestoreResult;
use crate::graphics::backend::GraphicsBackend;
use crate::restorable::context::RestorableContext;
use crate::restorable::tracker::DependencyTracker;

impl<B: GraphicsBackend> RestorableContext<B> {
    /// Collapse every stale image's history into a fresh baseline read back from its texture.
    ///
    /// Dependents are resolved before the images they sample. On a readback failure the pass
    /// stops; images already resolved stay resolved and the failing image keeps its history.
    #[tracing::instrument(skip(self))]
    pub fn resolve_stale_images(&mut self) -> RestoreResult<()> {
        self.ensure_ready()?;
        let order = self.resolve_order();
        if order.is_empty() {
            return Ok(());
        }
        tracing::debug!(images = order.len(), "resolving stale images");

        for id in order {
            if let Err(e) = self.flatten(id) {
                tracing::warn!(image = ?id, error = %e, "resolve pass stopped");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Stale images, dependents first.
    fn resolve_order(&self) -> Vec<ImageId> {
        let mut tracker = DependencyTracker::new();
        for (id, img) in self.images.iter().filter(|(_, img)| img.stale) {
            tracker.add_image(id);
            for cmd in &img.history {
                for &dep in cmd.dependencies() {
                    tracker.add_dependency(id, dep);
                }
            }
        }

        match tracker.order() {
            Ok(mut order) => {
                order.reverse();
                order
            }
            Err(e) => {
                // Readback does not replay anything, so any order is still correct.
                tracing::warn!(error = %e, "cyclic history; resolving in id order");
                self.images
                    .iter()
                    .filter(|(_, img)| img.stale)
                    .map(|(id, _)| id)
                    .collect()
            }
        }
    }
}
