//! Scalar triangle rasterizer used by the CPU backend.
//!
//! Pixels are sampled at their centers and triangle edges follow a top-left fill rule, so two
//! triangles sharing an edge never both cover the same pixel.

use crate::foundation::core::Region;
use crate::foundation::math::{unorm_from_u8, unorm_to_u8};
use crate::graphics::draw::{Address, CompositeMode, Filter, Geometry, Vertex};

/// Texel coordinates are clamped to this magnitude before sampling. `f32` has no fractional
/// bits left past it, and the integer texel math stays far from overflow.
const TEXCOORD_LIMIT: f32 = (1u32 << 24) as f32;

/// Read-only view over premultiplied RGBA8 texels.
#[derive(Clone, Copy)]
pub(crate) struct TexelView<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) data: &'a [u8],
}

impl<'a> TexelView<'a> {
    pub(crate) fn new(width: u32, height: u32, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    fn full(self) -> Region {
        Region::full(self.width, self.height)
    }

    fn fetch(self, x: u32, y: u32) -> [f32; 4] {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        match self.data.get(idx..idx + 4) {
            Some(px) => [
                unorm_from_u8(px[0]),
                unorm_from_u8(px[1]),
                unorm_from_u8(px[2]),
                unorm_from_u8(px[3]),
            ],
            None => [0.0; 4],
        }
    }

    fn texel(self, x: i64, y: i64, address: Address, region: Region) -> [f32; 4] {
        if region.is_empty() {
            return [0.0; 4];
        }
        let (rx, ry) = (i64::from(region.x), i64::from(region.y));
        let (rw, rh) = (i64::from(region.width), i64::from(region.height));
        let (x, y) = match address {
            Address::Unsafe => (x.clamp(rx, rx + rw - 1), y.clamp(ry, ry + rh - 1)),
            Address::ClampToZero => {
                if x < rx || y < ry || x >= rx + rw || y >= ry + rh {
                    return [0.0; 4];
                }
                (x, y)
            }
            Address::Repeat => (rx + (x - rx).rem_euclid(rw), ry + (y - ry).rem_euclid(rh)),
        };
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return [0.0; 4];
        }
        self.fetch(x as u32, y as u32)
    }

    /// Sample at texel-space position `uv`, restricted to `region` (whole texture if `None`).
    pub(crate) fn sample(
        self,
        uv: [f32; 2],
        filter: Filter,
        address: Address,
        region: Option<Region>,
    ) -> [f32; 4] {
        let region = clip_region(region.unwrap_or(self.full()), self.full());
        let uv = uv.map(|c| c.clamp(-TEXCOORD_LIMIT, TEXCOORD_LIMIT));
        match filter {
            Filter::Nearest => self.texel(
                uv[0].floor() as i64,
                uv[1].floor() as i64,
                address,
                region,
            ),
            Filter::Linear => {
                let u = uv[0] - 0.5;
                let v = uv[1] - 0.5;
                let (x0, y0) = (u.floor(), v.floor());
                let (fx, fy) = (u - x0, v - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);
                let t00 = self.texel(x0, y0, address, region);
                let t10 = self.texel(x0 + 1, y0, address, region);
                let t01 = self.texel(x0, y0 + 1, address, region);
                let t11 = self.texel(x0 + 1, y0 + 1, address, region);
                std::array::from_fn(|i| {
                    let top = t00[i] + (t10[i] - t00[i]) * fx;
                    let bottom = t01[i] + (t11[i] - t01[i]) * fx;
                    top + (bottom - top) * fy
                })
            }
        }
    }
}

fn clip_region(r: Region, bounds: Region) -> Region {
    let x0 = r.x.min(bounds.width);
    let y0 = r.y.min(bounds.height);
    let x1 = r.x.saturating_add(r.width).min(bounds.width);
    let y1 = r.y.saturating_add(r.height).min(bounds.height);
    Region::new(x0, y0, x1 - x0, y1 - y0)
}

/// Per-fragment inputs produced by the rasterizer.
pub(crate) struct Interpolated {
    pub(crate) position: [f32; 2],
    pub(crate) texcoord: [f32; 2],
    pub(crate) color: [f32; 4],
}

fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn is_top_left(from: [f32; 2], to: [f32; 2]) -> bool {
    let dx = to[0] - from[0];
    let dy = to[1] - from[1];
    (dy == 0.0 && dx > 0.0) || dy < 0.0
}

fn covers(w: f32, from: [f32; 2], to: [f32; 2]) -> bool {
    w > 0.0 || (w == 0.0 && is_top_left(from, to))
}

fn lerp3<const N: usize>(a: [f32; N], b: [f32; N], c: [f32; N], l: [f32; 3]) -> [f32; N] {
    std::array::from_fn(|i| a[i] * l[0] + b[i] * l[1] + c[i] * l[2])
}

/// Rasterize `geometry` into the `width x height` RGBA8 buffer `dst`, blending each shaded
/// fragment with `mode`.
pub(crate) fn draw_triangles(
    dst: &mut [u8],
    width: u32,
    height: u32,
    geometry: &Geometry,
    mode: CompositeMode,
    mut shade: impl FnMut(&Interpolated) -> [f32; 4],
) {
    let clip = clip_region(
        geometry.dst_region_or_full(width, height),
        Region::full(width, height),
    );
    if clip.is_empty() {
        return;
    }

    for tri in geometry.indices.chunks_exact(3) {
        let fetch = |i: u16| geometry.vertices.get(usize::from(i)).copied();
        let (Some(a), Some(mut b), Some(mut c)) = (fetch(tri[0]), fetch(tri[1]), fetch(tri[2]))
        else {
            continue;
        };
        let mut area = edge(a.dst, b.dst, c.dst);
        if area == 0.0 {
            continue;
        }
        if area < 0.0 {
            std::mem::swap(&mut b, &mut c);
            area = -area;
        }
        raster_triangle(dst, width, clip, [a, b, c], area, mode, &mut shade);
    }
}

fn raster_triangle(
    dst: &mut [u8],
    width: u32,
    clip: Region,
    [a, b, c]: [Vertex; 3],
    area: f32,
    mode: CompositeMode,
    shade: &mut impl FnMut(&Interpolated) -> [f32; 4],
) {
    let min_x = a.dst[0].min(b.dst[0]).min(c.dst[0]).floor().max(clip.x as f32) as u32;
    let min_y = a.dst[1].min(b.dst[1]).min(c.dst[1]).floor().max(clip.y as f32) as u32;
    let max_x = a.dst[0]
        .max(b.dst[0])
        .max(c.dst[0])
        .ceil()
        .min((clip.x + clip.width) as f32) as u32;
    let max_y = a.dst[1]
        .max(b.dst[1])
        .max(c.dst[1])
        .ceil()
        .min((clip.y + clip.height) as f32) as u32;

    for y in min_y..max_y {
        for x in min_x..max_x {
            let p = [x as f32 + 0.5, y as f32 + 0.5];
            let w0 = edge(b.dst, c.dst, p);
            let w1 = edge(c.dst, a.dst, p);
            let w2 = edge(a.dst, b.dst, p);
            if !(covers(w0, b.dst, c.dst) && covers(w1, c.dst, a.dst) && covers(w2, a.dst, b.dst))
            {
                continue;
            }
            let l = [w0 / area, w1 / area, w2 / area];
            let frag = Interpolated {
                position: p,
                texcoord: lerp3(a.src, b.src, c.src, l),
                color: lerp3(a.color, b.color, c.color, l),
            };
            let src = shade(&frag);

            let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
            let Some(px) = dst.get_mut(idx..idx + 4) else {
                continue;
            };
            let cur = [
                unorm_from_u8(px[0]),
                unorm_from_u8(px[1]),
                unorm_from_u8(px[2]),
                unorm_from_u8(px[3]),
            ];
            let out = mode.blend(src, cur);
            for (d, v) in px.iter_mut().zip(out) {
                *d = unorm_to_u8(v);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graphics/raster.rs"]
mod tests;
