use super::*;
use crate::graphics::program::programs;

#[test]
fn dependencies_merge_sources_and_image_uniforms_in_order() {
    let shader = Shader::new(ShaderId(0), programs::sum_images(2));
    let uniforms: Uniforms = [
        (0, UniformValue::Floats(vec![1.0, 1.0])),
        (1, UniformValue::Image(ImageId(7))),
        (2, UniformValue::Image(ImageId(2))),
    ]
    .into_iter()
    .collect();
    let draw = DrawTriangles::new(Geometry::full_quad(1, 1))
        .source(ImageId(2))
        .source(ImageId(5))
        .shader(&shader, uniforms);

    let cmd = DrawCommand::triangles(draw);
    assert_eq!(cmd.dependencies(), &[ImageId(2), ImageId(5), ImageId(7)]);
    assert!(cmd.reads(ImageId(7)));
    assert!(!cmd.reads(ImageId(1)));
    assert!(cmd.uses_shader(ShaderId(0)));
    assert!(!cmd.uses_shader(ShaderId(1)));
}

#[test]
fn replace_pixels_has_no_dependencies() {
    let cmd = DrawCommand::replace_pixels(Region::full(1, 1), Some(Arc::from(vec![0u8; 4])));
    assert!(cmd.dependencies().is_empty());
    assert!(matches!(cmd.kind(), CommandKind::ReplacePixels { .. }));
}

#[test]
fn builder_sets_sampling_parameters() {
    let draw = DrawTriangles::new(Geometry::full_quad(2, 2))
        .mode(CompositeMode::Copy)
        .filter(Filter::Linear)
        .address(Address::Repeat);
    assert_eq!(draw.mode, CompositeMode::Copy);
    assert_eq!(draw.filter, Filter::Linear);
    assert_eq!(draw.address, Address::Repeat);
    assert!(draw.dependencies().is_empty());
}

#[test]
fn frozen_sources_replay_from_scratch_textures() {
    use crate::foundation::core::Pixels;
    use crate::graphics::cpu::CpuBackend;

    let draw = DrawTriangles::new(Geometry::full_quad(1, 1))
        .source(ImageId(3))
        .mode(CompositeMode::Copy);
    let mut cmd = DrawCommand::triangles(draw);
    let green = Pixels::from_vec(1, 1, vec![0, 255, 0, 255]).unwrap();
    cmd.freeze_source(ImageId(3), green);
    assert!(cmd.dependencies().is_empty());
    assert!(!cmd.reads(ImageId(3)));

    let mut backend = CpuBackend::default();
    let target = backend.allocate_texture(1, 1).unwrap();
    for _ in 0..2 {
        apply_command(&mut backend, &ImageTable::default(), target, &cmd).unwrap();
    }
    let px = backend.read_pixels(target).unwrap();
    assert_eq!(px.as_bytes(), &[0, 255, 0, 255]);
    assert_eq!(backend.stats().live_textures, 1);
}
