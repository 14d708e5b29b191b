use crate::foundation::core::Region;
use crate::foundation::error::{RestoreError, RestoreResult};

/// Maximum number of source images a single draw may sample directly.
pub const MAX_SOURCES: usize = 4;

/// One vertex of a triangle list.
///
/// `dst` is in target pixel space, `src` in source pixel space. `color` scales the sampled,
/// premultiplied color channel-wise.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vertex {
    /// Destination position in pixels.
    pub dst: [f32; 2],
    /// Source texel position in pixels.
    pub src: [f32; 2],
    /// Premultiplied color scale.
    pub color: [f32; 4],
}

impl Vertex {
    /// Vertex with a neutral (white, opaque) color scale.
    pub fn new(dst: [f32; 2], src: [f32; 2]) -> Self {
        Self {
            dst,
            src,
            color: [1.0; 4],
        }
    }
}

/// Indexed triangle list plus the target/source clip regions.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Geometry {
    /// Vertex buffer.
    pub vertices: Vec<Vertex>,
    /// Index buffer; every three indices form a triangle.
    pub indices: Vec<u16>,
    /// Target clip region. `None` means the whole target.
    pub dst_region: Option<Region>,
    /// Source region used by [`Address`] modes. `None` means the whole first source.
    pub src_region: Option<Region>,
}

impl Geometry {
    /// Two triangles mapping `src` onto `dst`.
    pub fn quad(dst: kurbo::Rect, src: kurbo::Rect) -> Self {
        let v = |dx: f64, dy: f64, sx: f64, sy: f64| {
            Vertex::new([dx as f32, dy as f32], [sx as f32, sy as f32])
        };
        Self {
            vertices: vec![
                v(dst.x0, dst.y0, src.x0, src.y0),
                v(dst.x1, dst.y0, src.x1, src.y0),
                v(dst.x0, dst.y1, src.x0, src.y1),
                v(dst.x1, dst.y1, src.x1, src.y1),
            ],
            indices: vec![0, 1, 2, 1, 2, 3],
            dst_region: None,
            src_region: None,
        }
    }

    /// Quad covering a `width x height` target, sampling the same extent of the source.
    pub fn full_quad(width: u32, height: u32) -> Self {
        let r = kurbo::Rect::new(0.0, 0.0, f64::from(width), f64::from(height));
        Self::quad(r, r)
    }

    /// Restrict rasterization to `region` of the target.
    pub fn with_dst_region(mut self, region: Region) -> Self {
        self.dst_region = Some(region);
        self
    }

    /// Restrict source addressing to `region`.
    pub fn with_src_region(mut self, region: Region) -> Self {
        self.src_region = Some(region);
        self
    }

    /// Scale every vertex color.
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        for v in &mut self.vertices {
            v.color = color;
        }
        self
    }

    /// Apply `affine` to every destination position.
    pub fn transform(&mut self, affine: kurbo::Affine) {
        for v in &mut self.vertices {
            let p = affine * kurbo::Point::new(f64::from(v.dst[0]), f64::from(v.dst[1]));
            v.dst = [p.x as f32, p.y as f32];
        }
    }

    /// Number of triangles in the index buffer.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Effective target clip region for a `width x height` target.
    pub fn dst_region_or_full(&self, width: u32, height: u32) -> Region {
        self.dst_region.unwrap_or(Region::full(width, height))
    }

    /// Check index/vertex consistency and that the target region lies inside the target.
    pub fn validate(&self, target_width: u32, target_height: u32) -> RestoreResult<()> {
        if !self.indices.len().is_multiple_of(3) {
            return Err(RestoreError::geometry(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(&bad) = self
            .indices
            .iter()
            .find(|&&i| usize::from(i) >= self.vertices.len())
        {
            return Err(RestoreError::geometry(format!(
                "index {bad} out of range for {} vertices",
                self.vertices.len()
            )));
        }
        let non_finite = self.vertices.iter().any(|v| {
            v.dst
                .iter()
                .chain(v.src.iter())
                .chain(v.color.iter())
                .any(|c| !c.is_finite())
        });
        if non_finite {
            return Err(RestoreError::geometry("vertex data must be finite"));
        }
        if let Some(r) = self.dst_region
            && !r.fits_within(target_width, target_height)
        {
            return Err(RestoreError::geometry(format!(
                "dst region {r:?} exceeds {target_width}x{target_height} target"
            )));
        }
        Ok(())
    }
}

/// Porter-Duff composite operator on premultiplied color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// `0`
    Clear,
    /// `src`
    Copy,
    /// `src + dst * (1 - sa)`
    #[default]
    SourceOver,
    /// `src * (1 - da) + dst`
    DestinationOver,
    /// `src * da`
    SourceIn,
    /// `dst * sa`
    DestinationIn,
    /// `src * (1 - da)`
    SourceOut,
    /// `dst * (1 - sa)`
    DestinationOut,
    /// `src * da + dst * (1 - sa)`
    SourceAtop,
    /// `src * (1 - da) + dst * sa`
    DestinationAtop,
    /// `src * (1 - da) + dst * (1 - sa)`
    Xor,
    /// `src + dst`
    Lighter,
}

#[derive(Clone, Copy, Debug)]
enum Factor {
    Zero,
    One,
    SrcAlpha,
    DstAlpha,
    OneMinusSrcAlpha,
    OneMinusDstAlpha,
}

impl Factor {
    fn eval(self, sa: f32, da: f32) -> f32 {
        match self {
            Factor::Zero => 0.0,
            Factor::One => 1.0,
            Factor::SrcAlpha => sa,
            Factor::DstAlpha => da,
            Factor::OneMinusSrcAlpha => 1.0 - sa,
            Factor::OneMinusDstAlpha => 1.0 - da,
        }
    }
}

impl CompositeMode {
    fn factors(self) -> (Factor, Factor) {
        use Factor::*;
        match self {
            CompositeMode::Clear => (Zero, Zero),
            CompositeMode::Copy => (One, Zero),
            CompositeMode::SourceOver => (One, OneMinusSrcAlpha),
            CompositeMode::DestinationOver => (OneMinusDstAlpha, One),
            CompositeMode::SourceIn => (DstAlpha, Zero),
            CompositeMode::DestinationIn => (Zero, SrcAlpha),
            CompositeMode::SourceOut => (OneMinusDstAlpha, Zero),
            CompositeMode::DestinationOut => (Zero, OneMinusSrcAlpha),
            CompositeMode::SourceAtop => (DstAlpha, OneMinusSrcAlpha),
            CompositeMode::DestinationAtop => (OneMinusDstAlpha, SrcAlpha),
            CompositeMode::Xor => (OneMinusDstAlpha, OneMinusSrcAlpha),
            CompositeMode::Lighter => (One, One),
        }
    }

    /// Blend premultiplied `src` onto premultiplied `dst`; channels in `[0, 1]`.
    pub fn blend(self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let (fs, fd) = self.factors();
        let fs = fs.eval(src[3], dst[3]);
        let fd = fd.eval(src[3], dst[3]);
        std::array::from_fn(|i| (src[i] * fs + dst[i] * fd).clamp(0.0, 1.0))
    }
}

/// Texel filter used when sampling sources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Nearest texel.
    #[default]
    Nearest,
    /// Bilinear interpolation between the four nearest texels.
    Linear,
}

/// Behavior for texel coordinates outside the source region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Address {
    /// No guarantee beyond memory safety; clamps to the edge texel.
    #[default]
    Unsafe,
    /// Transparent outside the region.
    ClampToZero,
    /// Wrap around the region.
    Repeat,
}

#[cfg(test)]
#[path = "../../tests/unit/graphics/draw.rs"]
mod tests;
