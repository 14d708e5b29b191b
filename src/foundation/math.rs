pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

pub(crate) fn premul_u8(c: u8, a: u8) -> u8 {
    mul_div255_u8(u16::from(c), u16::from(a))
}

pub(crate) fn unpremul_u8(c: u8, a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    let v = (u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a);
    v.min(255) as u8
}

/// Normalize a byte channel into `[0, 1]`.
pub(crate) fn unorm_from_u8(v: u8) -> f32 {
    f32::from(v) / 255.0
}

/// Quantize a `[0, 1]` channel back to a byte, rounding to nearest.
pub(crate) fn unorm_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
