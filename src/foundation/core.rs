use crate::foundation::error::{RestoreError, RestoreResult};
use crate::foundation::math::{premul_u8, unpremul_u8};

/// Stable handle of an image inside a [`crate::RestorableContext`].
///
/// Handles are never reused, so a handle outliving its image is detected as use-after-dispose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u32);

/// Stable handle of a registered shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Backend-issued texture handle. Only meaningful until the next context loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Integer pixel rectangle `[x, x + width) x [y, y + height)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Region {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Build a region from its origin and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole `width x height` surface.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Return `true` when the region covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    pub fn area(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Return `true` when the region lies inside a `width x height` surface.
    pub fn fits_within(self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }

    /// Return `true` when `(x, y)` is inside the region.
    pub fn contains(self, x: u32, y: u32) -> bool {
        x >= self.x
            && y >= self.y
            && u64::from(x) < u64::from(self.x) + u64::from(self.width)
            && u64::from(y) < u64::from(self.y) + u64::from(self.height)
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Build from already-premultiplied channels.
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self::default()
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: premul_u8(r, a),
            g: premul_u8(g, a),
            b: premul_u8(b, a),
            a,
        }
    }

    /// Channels as a byte array in RGBA order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Per-channel comparison with an absolute tolerance.
    pub fn approx_eq(self, other: Self, tolerance: u8) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| a.abs_diff(*b) <= tolerance)
    }
}

impl From<[u8; 4]> for Rgba8Premul {
    fn from(v: [u8; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// CPU-resident premultiplied RGBA8 pixels, tightly packed, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Pixels {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for Pixels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pixels")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("digest", &format_args!("{:016x}", self.digest()))
            .finish()
    }
}

impl Pixels {
    /// Byte length of a tightly packed `width x height` RGBA8 buffer.
    pub fn byte_len(width: u32, height: u32) -> RestoreResult<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| RestoreError::geometry("pixel buffer size overflow"))
    }

    /// Fully transparent pixels.
    pub fn transparent(width: u32, height: u32) -> RestoreResult<Self> {
        Ok(Self {
            width,
            height,
            data: vec![0; Self::byte_len(width, height)?],
        })
    }

    /// Wrap an existing buffer, checking its length.
    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> RestoreResult<Self> {
        let expected = Self::byte_len(width, height)?;
        if data.len() != expected {
            return Err(RestoreError::geometry(format!(
                "expected {expected} bytes for {width}x{height} pixels, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume into raw bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8Premul> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(idx..idx + 4)?;
        Some(Rgba8Premul::new(px[0], px[1], px[2], px[3]))
    }

    /// Overwrite `region` with `src` (tightly packed for the region), or with transparent
    /// pixels when `src` is `None`.
    pub fn replace_region(&mut self, region: Region, src: Option<&[u8]>) -> RestoreResult<()> {
        if !region.fits_within(self.width, self.height) {
            return Err(RestoreError::geometry(format!(
                "region {region:?} exceeds {}x{} surface",
                self.width, self.height
            )));
        }
        let row_bytes = (region.width as usize) * 4;
        if let Some(src) = src
            && src.len() != Self::byte_len(region.width, region.height)?
        {
            return Err(RestoreError::geometry(format!(
                "expected {} bytes for region {region:?}, got {}",
                row_bytes * region.height as usize,
                src.len()
            )));
        }

        let stride = (self.width as usize) * 4;
        for row in 0..region.height as usize {
            let dst_off = (region.y as usize + row) * stride + (region.x as usize) * 4;
            let dst = &mut self.data[dst_off..dst_off + row_bytes];
            match src {
                Some(src) => dst.copy_from_slice(&src[row * row_bytes..(row + 1) * row_bytes]),
                None => dst.fill(0),
            }
        }
        Ok(())
    }

    /// Import straight-alpha pixels from the `image` crate, premultiplying them.
    pub fn from_rgba_image(img: &image::RgbaImage) -> Self {
        let mut data = img.as_raw().clone();
        for px in data.chunks_exact_mut(4) {
            let a = px[3];
            px[0] = premul_u8(px[0], a);
            px[1] = premul_u8(px[1], a);
            px[2] = premul_u8(px[2], a);
        }
        Self {
            width: img.width(),
            height: img.height(),
            data,
        }
    }

    /// Export as straight-alpha pixels, e.g. for dumping a PNG while debugging.
    pub fn to_rgba_image(&self) -> RestoreResult<image::RgbaImage> {
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(4) {
            let a = px[3];
            px[0] = unpremul_u8(px[0], a);
            px[1] = unpremul_u8(px[1], a);
            px[2] = unpremul_u8(px[2], a);
        }
        image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| RestoreError::geometry("pixel buffer does not match its dimensions"))
    }

    /// Content fingerprint, stable across runs.
    pub fn digest(&self) -> u64 {
        xxhash_rust::xxh3::xxh3_64(&self.data)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
