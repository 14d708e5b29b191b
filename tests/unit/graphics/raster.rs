use super::*;

fn solid(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    px.repeat((w * h) as usize)
}

#[test]
fn full_quad_covers_every_pixel_once() {
    let (w, h) = (5, 3);
    let mut dst = vec![0u8; (w * h * 4) as usize];
    let mut hits = vec![0u32; (w * h) as usize];
    draw_triangles(
        &mut dst,
        w,
        h,
        &Geometry::full_quad(w, h),
        CompositeMode::Lighter,
        |frag| {
            let idx = (frag.position[1] as u32 * w + frag.position[0] as u32) as usize;
            hits[idx] += 1;
            [0.25, 0.0, 0.0, 0.25]
        },
    );
    assert!(hits.iter().all(|&n| n == 1), "{hits:?}");
    assert!(dst.chunks_exact(4).all(|p| p == [64, 0, 0, 64]));
}

#[test]
fn winding_does_not_matter() {
    let mut g = Geometry::full_quad(2, 2);
    g.indices = vec![0, 2, 1, 1, 3, 2];
    let mut dst = vec![0u8; 16];
    draw_triangles(&mut dst, 2, 2, &g, CompositeMode::Copy, |_| [1.0; 4]);
    assert!(dst.iter().all(|&b| b == 255));
}

#[test]
fn dst_region_clips_coverage() {
    let g = Geometry::full_quad(4, 4).with_dst_region(Region::new(1, 1, 2, 2));
    let mut dst = vec![0u8; 64];
    draw_triangles(&mut dst, 4, 4, &g, CompositeMode::Copy, |_| [1.0; 4]);
    for y in 0..4u32 {
        for x in 0..4u32 {
            let inside = (1..3).contains(&x) && (1..3).contains(&y);
            let a = dst[((y * 4 + x) * 4 + 3) as usize];
            assert_eq!(a == 255, inside, "pixel ({x},{y})");
        }
    }
}

#[test]
fn texcoords_interpolate_to_pixel_centers() {
    let mut seen = Vec::new();
    let mut dst = vec![0u8; 16];
    draw_triangles(
        &mut dst,
        2,
        2,
        &Geometry::full_quad(2, 2),
        CompositeMode::Copy,
        |frag| {
            seen.push(frag.texcoord);
            [0.0; 4]
        },
    );
    seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(seen, vec![[0.5, 0.5], [0.5, 1.5], [1.5, 0.5], [1.5, 1.5]]);
}

#[test]
fn nearest_sampling_and_address_modes() {
    let mut data = solid(2, 1, [0, 0, 0, 0]);
    data[0..4].copy_from_slice(&[255, 0, 0, 255]);
    data[4..8].copy_from_slice(&[0, 0, 255, 255]);
    let view = TexelView::new(2, 1, &data);

    let red = [1.0, 0.0, 0.0, 1.0];
    let blue = [0.0, 0.0, 1.0, 1.0];
    assert_eq!(view.sample([0.5, 0.5], Filter::Nearest, Address::Unsafe, None), red);
    assert_eq!(view.sample([5.5, 0.5], Filter::Nearest, Address::Unsafe, None), blue);
    assert_eq!(
        view.sample([5.5, 0.5], Filter::Nearest, Address::ClampToZero, None),
        [0.0; 4]
    );
    assert_eq!(view.sample([2.5, 0.5], Filter::Nearest, Address::Repeat, None), red);
    assert_eq!(view.sample([-0.5, 0.5], Filter::Nearest, Address::Repeat, None), blue);
}

#[test]
fn address_modes_respect_source_region() {
    let mut data = solid(3, 1, [0, 0, 0, 0]);
    data[4..8].copy_from_slice(&[0, 255, 0, 255]);
    let view = TexelView::new(3, 1, &data);
    let region = Some(Region::new(1, 0, 1, 1));

    let green = [0.0, 1.0, 0.0, 1.0];
    assert_eq!(view.sample([0.5, 0.5], Filter::Nearest, Address::Unsafe, region), green);
    assert_eq!(view.sample([2.5, 0.5], Filter::Nearest, Address::Repeat, region), green);
    assert_eq!(
        view.sample([0.5, 0.5], Filter::Nearest, Address::ClampToZero, region),
        [0.0; 4]
    );
}

#[test]
fn linear_sampling_blends_neighbours() {
    let mut data = solid(2, 1, [0, 0, 0, 0]);
    data[0..4].copy_from_slice(&[255, 255, 255, 255]);
    let view = TexelView::new(2, 1, &data);

    let mid = view.sample([1.0, 0.5], Filter::Linear, Address::Unsafe, None);
    assert!(mid.iter().all(|c| (c - 0.5).abs() < 1e-6), "{mid:?}");
    let center = view.sample([0.5, 0.5], Filter::Linear, Address::Unsafe, None);
    assert_eq!(center, [1.0; 4]);
}

#[test]
fn far_out_texcoords_stay_in_range() {
    let data = solid(2, 2, [0, 255, 0, 255]);
    let view = TexelView::new(2, 2, &data);
    let (green, zero) = ([0.0, 1.0, 0.0, 1.0], [0.0; 4]);

    for uv in [[1e30, 1e30], [-1e30, 1e30], [f32::MAX, f32::MIN]] {
        for filter in [Filter::Nearest, Filter::Linear] {
            assert_eq!(view.sample(uv, filter, Address::Unsafe, None), green);
            assert_eq!(view.sample(uv, filter, Address::Repeat, None), green);
            assert_eq!(view.sample(uv, filter, Address::ClampToZero, None), zero);
        }
    }
}
