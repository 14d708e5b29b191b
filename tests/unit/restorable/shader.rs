use super::*;
use crate::foundation::core::Rgba8Premul;
use crate::graphics::program::programs;

fn floats(v: &[f32]) -> UniformValue {
    UniformValue::Floats(v.to_vec())
}

fn uniforms(pairs: Vec<(usize, UniformValue)>) -> Uniforms {
    pairs.into_iter().collect()
}

#[test]
fn fill_program_accepts_size_uniform() {
    let p = programs::fill(Rgba8Premul::new(255, 0, 0, 255));
    let u = uniforms(vec![(0, floats(&[1.0, 1.0]))]);
    assert!(check_uniforms(&p, &u).is_ok());
}

#[test]
fn missing_slot_is_rejected() {
    let p = programs::sum_images(1);
    let u = uniforms(vec![(0, floats(&[1.0, 1.0]))]);
    let err = check_uniforms(&p, &u).unwrap_err();
    assert!(matches!(err, RestoreError::InvalidUniform(_)));
    assert!(err.to_string().contains("slot 1"));
}

#[test]
fn image_where_floats_expected_is_rejected() {
    let p = programs::fill(Rgba8Premul::transparent());
    let u = uniforms(vec![(0, UniformValue::Image(ImageId(3)))]);
    assert!(matches!(
        check_uniforms(&p, &u),
        Err(RestoreError::InvalidUniform(_))
    ));
}

#[test]
fn floats_where_image_expected_is_rejected() {
    let p = programs::sum_images(1);
    let u = uniforms(vec![(0, floats(&[1.0, 1.0])), (1, floats(&[0.0]))]);
    assert!(matches!(
        check_uniforms(&p, &u),
        Err(RestoreError::InvalidUniform(_))
    ));
}

#[test]
fn float_arity_is_checked() {
    let p = programs::fill(Rgba8Premul::transparent());
    let u = uniforms(vec![(0, floats(&[1.0]))]);
    assert!(check_uniforms(&p, &u).is_err());
}

#[test]
fn undeclared_slot_is_rejected() {
    let p = programs::fill(Rgba8Premul::transparent());
    let u = uniforms(vec![(0, floats(&[1.0, 1.0])), (5, floats(&[]))]);
    let err = check_uniforms(&p, &u).unwrap_err();
    assert!(err.to_string().contains("slot 5"));
}
