use crate::foundation::core::{ImageId, Pixels, TextureId};
use crate::foundation::error::{RestoreError, RestoreResult};
use crate::restorable::command::DrawCommand;

/// A drawable surface: CPU baseline, optional live texture and the commands applied since the
/// baseline was taken.
///
/// `base_pixels` followed by `history` always reproduces the texture contents.
#[derive(Debug)]
pub(crate) struct Image {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) is_root: bool,
    pub(crate) base_pixels: Pixels,
    pub(crate) texture: Option<TextureId>,
    pub(crate) history: Vec<DrawCommand>,
    pub(crate) stale: bool,
}

impl Image {
    pub(crate) fn new(
        width: u32,
        height: u32,
        is_root: bool,
        texture: TextureId,
    ) -> RestoreResult<Self> {
        Ok(Self {
            width,
            height,
            is_root,
            base_pixels: Pixels::transparent(width, height)?,
            texture: Some(texture),
            history: Vec::new(),
            stale: false,
        })
    }

    /// `true` when some unresolved command samples `other`.
    pub(crate) fn reads(&self, other: ImageId) -> bool {
        self.history.iter().any(|c| c.reads(other))
    }

    pub(crate) fn append(&mut self, cmd: DrawCommand) {
        self.history.push(cmd);
        self.stale = true;
    }

    /// Collapse history into a new baseline.
    pub(crate) fn resolve_to(&mut self, pixels: Pixels) {
        self.base_pixels = pixels;
        self.history.clear();
        self.stale = false;
    }
}

/// Read-only snapshot of an image's bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    /// Handle.
    pub id: ImageId,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Screen target: content is redrawn by the application every frame.
    pub is_root: bool,
    /// Unresolved commands.
    pub history_len: usize,
    /// Texture holds writes not yet folded into the baseline.
    pub stale: bool,
    /// Texture is allocated and current.
    pub texture_valid: bool,
}

/// Arena of images indexed by [`ImageId`]. Slots are never reused.
#[derive(Debug, Default)]
pub(crate) struct ImageTable {
    slots: Vec<Option<Image>>,
}

impl ImageTable {
    pub(crate) fn insert(&mut self, image: Image) -> RestoreResult<ImageId> {
        let id = u32::try_from(self.slots.len())
            .map_err(|_| RestoreError::Other(anyhow::anyhow!("image id space exhausted")))?;
        self.slots.push(Some(image));
        Ok(ImageId(id))
    }

    pub(crate) fn get(&self, id: ImageId) -> RestoreResult<&Image> {
        self.slots
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| RestoreError::disposed(format!("image {id:?}")))
    }

    pub(crate) fn get_mut(&mut self, id: ImageId) -> RestoreResult<&mut Image> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| RestoreError::disposed(format!("image {id:?}")))
    }

    pub(crate) fn remove(&mut self, id: ImageId) -> RestoreResult<Image> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or_else(|| RestoreError::disposed(format!("image {id:?}")))
    }

    /// Live texture of `id`.
    pub(crate) fn texture(&self, id: ImageId) -> RestoreResult<TextureId> {
        self.get(id)?
            .texture
            .ok_or_else(|| RestoreError::backend(format!("texture of {id:?} is not restored")))
    }

    /// Live images in ascending id order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (ImageId, &Image)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|img| (ImageId(i as u32), img)))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (ImageId, &mut Image)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|img| (ImageId(i as u32), img)))
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Image> + '_ {
        self.slots.drain(..).flatten()
    }

    /// Images other than `id` whose unresolved history samples `id`.
    pub(crate) fn readers_of(&self, id: ImageId) -> Vec<ImageId> {
        self.iter()
            .filter(|(other, img)| *other != id && img.reads(id))
            .map(|(other, _)| other)
            .collect()
    }
}
