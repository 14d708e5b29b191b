use super::*;
use crate::foundation::core::Rgba8Premul;
use crate::graphics::draw::{CompositeMode, Geometry};
use crate::graphics::program::{CompiledProgram, programs};

const RED: [u8; 4] = [255, 0, 0, 255];

fn submission<'a>(
    sources: &'a [TextureId],
    geometry: &'a Geometry,
    program: Option<&'a CompiledProgram>,
    uniforms: &'a [BoundUniform],
) -> DrawSubmission<'a> {
    DrawSubmission {
        sources,
        geometry,
        mode: CompositeMode::Copy,
        filter: Filter::Nearest,
        address: Address::Unsafe,
        program,
        uniforms,
    }
}

fn red_texture(b: &mut CpuBackend, w: u32, h: u32) -> TextureId {
    let t = b.allocate_texture(w, h).unwrap();
    b.upload_pixels(t, Region::full(w, h), Some(&RED.repeat((w * h) as usize)))
        .unwrap();
    t
}

#[test]
fn allocation_starts_transparent_even_from_a_recycled_pixmap() {
    let mut b = CpuBackend::default();
    let t = red_texture(&mut b, 2, 2);
    b.release_texture(t);

    let t = b.allocate_texture(2, 2).unwrap();
    let px = b.read_pixels(t).unwrap();
    assert!(px.as_bytes().iter().all(|&v| v == 0));
    assert_eq!(b.stats().pool.alloc_textures, 1);
}

#[test]
fn upload_then_read_roundtrips_a_region() {
    let mut b = CpuBackend::default();
    let t = b.allocate_texture(3, 2).unwrap();
    b.upload_pixels(t, Region::new(1, 1, 2, 1), Some(&[7u8; 8]))
        .unwrap();

    let px = b.read_pixels(t).unwrap();
    assert_eq!(px.pixel(0, 1), Some(Rgba8Premul::transparent()));
    assert_eq!(px.pixel(2, 1), Some(Rgba8Premul::new(7, 7, 7, 7)));

    b.upload_pixels(t, Region::new(2, 1, 1, 1), None).unwrap();
    let px = b.read_pixels(t).unwrap();
    assert_eq!(px.pixel(2, 1), Some(Rgba8Premul::transparent()));
}

#[test]
fn upload_rejects_mismatched_data() {
    let mut b = CpuBackend::default();
    let t = b.allocate_texture(2, 2).unwrap();
    let err = b
        .upload_pixels(t, Region::full(2, 2), Some(&[0u8; 4]))
        .unwrap_err();
    assert!(matches!(err, RestoreError::InvalidGeometry(_)));
    let err = b.upload_pixels(t, Region::new(0, 0, 3, 1), None).unwrap_err();
    assert!(matches!(err, RestoreError::InvalidGeometry(_)));
}

#[test]
fn textured_draw_copies_the_source() {
    let mut b = CpuBackend::default();
    let src = red_texture(&mut b, 2, 2);
    let dst = b.allocate_texture(2, 2).unwrap();
    let g = Geometry::full_quad(2, 2);

    b.submit_draw(dst, &submission(&[src], &g, None, &[])).unwrap();
    let px = b.read_pixels(dst).unwrap();
    assert!(px.as_bytes().chunks_exact(4).all(|p| p == RED));
}

#[test]
fn linear_draw_with_far_out_texcoords_repeats_the_source() {
    let mut b = CpuBackend::default();
    let src = red_texture(&mut b, 2, 2);
    let dst = b.allocate_texture(2, 2).unwrap();
    let mut g = Geometry::full_quad(2, 2);
    for v in &mut g.vertices {
        v.src = [1e30, 1e30];
    }

    let srcs = [src];
    let draw = DrawSubmission {
        filter: Filter::Linear,
        address: Address::Repeat,
        ..submission(&srcs, &g, None, &[])
    };
    b.submit_draw(dst, &draw).unwrap();
    let px = b.read_pixels(dst).unwrap();
    assert!(px.as_bytes().chunks_exact(4).all(|p| p == RED));
}

#[test]
fn untextured_draw_uses_vertex_color() {
    let mut b = CpuBackend::default();
    let dst = b.allocate_texture(1, 1).unwrap();
    let g = Geometry::full_quad(1, 1).with_color([0.0, 0.0, 1.0, 1.0]);

    b.submit_draw(dst, &submission(&[], &g, None, &[])).unwrap();
    assert_eq!(
        b.read_pixels(dst).unwrap().pixel(0, 0),
        Some(Rgba8Premul::new(0, 0, 255, 255))
    );
}

#[test]
fn program_draw_samples_image_uniforms() {
    let mut b = CpuBackend::default();
    let src = red_texture(&mut b, 1, 1);
    let dst = b.allocate_texture(1, 1).unwrap();
    let g = Geometry::full_quad(1, 1);
    let program = programs::sum_images(1);
    let uniforms = [BoundUniform::Floats(vec![1.0, 1.0]), BoundUniform::Texture(src)];

    b.submit_draw(dst, &submission(&[], &g, Some(&program), &uniforms))
        .unwrap();
    assert_eq!(
        b.read_pixels(dst).unwrap().pixel(0, 0),
        Some(Rgba8Premul::from(RED))
    );
}

#[test]
fn draw_rejects_self_sampling() {
    let mut b = CpuBackend::default();
    let t = b.allocate_texture(1, 1).unwrap();
    let g = Geometry::full_quad(1, 1);
    let err = b.submit_draw(t, &submission(&[t], &g, None, &[])).unwrap_err();
    assert!(matches!(err, RestoreError::InvalidGeometry(_)));
    assert_eq!(b.stats().live_textures, 1);
}

#[test]
fn programs_fail_when_shaders_are_unavailable() {
    let mut b = CpuBackend::new(CpuBackendOpts {
        shaders_available: false,
        ..CpuBackendOpts::default()
    });
    assert!(!b.is_shader_available());
    let t = b.allocate_texture(1, 1).unwrap();
    let g = Geometry::full_quad(1, 1);
    let program = programs::fill(Rgba8Premul::from(RED));
    let uniforms = [BoundUniform::Floats(vec![1.0, 1.0])];

    let err = b
        .submit_draw(t, &submission(&[], &g, Some(&program), &uniforms))
        .unwrap_err();
    assert!(matches!(err, RestoreError::UnsupportedFeature(_)));

    b.set_shaders_available(true);
    b.submit_draw(t, &submission(&[], &g, Some(&program), &uniforms))
        .unwrap();
}

#[test]
fn injected_faults_fire_once_each() {
    let mut b = CpuBackend::default();
    b.fail_next_n(BackendOp::Allocate, 2);
    assert!(b.allocate_texture(1, 1).unwrap_err().is_retryable());
    assert!(b.allocate_texture(1, 1).is_err());
    let t = b.allocate_texture(1, 1).unwrap();

    b.fail_next(BackendOp::Read);
    assert!(b.read_pixels(t).is_err());
    assert!(b.read_pixels(t).is_ok());
    assert_eq!(b.stats().allocations, 1);
    assert_eq!(b.stats().reads, 1);
}

#[test]
fn context_loss_invalidates_everything_until_recovered() {
    let mut b = CpuBackend::default();
    let t = red_texture(&mut b, 1, 1);
    b.lose_context();

    assert!(b.is_context_lost());
    assert!(b.read_pixels(t).is_err());
    assert!(b.allocate_texture(1, 1).is_err());

    b.recover_context().unwrap();
    assert!(!b.is_context_lost());
    assert!(b.read_pixels(t).is_err());
    assert_eq!(b.stats().live_textures, 0);
    assert_eq!(b.stats().recoveries, 1);
    assert!(b.allocate_texture(1, 1).is_ok());
}
