use super::*;

#[test]
fn mul_div255_is_exact_at_extremes() {
    assert_eq!(mul_div255_u8(255, 255), 255);
    assert_eq!(mul_div255_u8(0, 255), 0);
    assert_eq!(mul_div255_u8(255, 0), 0);
}

#[test]
fn premul_unpremul_roundtrip_for_opaque() {
    for c in [0u8, 1, 127, 128, 254, 255] {
        assert_eq!(unpremul_u8(premul_u8(c, 255), 255), c);
    }
    assert_eq!(unpremul_u8(10, 0), 0);
}

#[test]
fn unorm_roundtrip_is_exact() {
    for v in 0..=255u8 {
        assert_eq!(unorm_to_u8(unorm_from_u8(v)), v);
    }
    assert_eq!(unorm_to_u8(1.5), 255);
    assert_eq!(unorm_to_u8(-0.5), 0);
}
