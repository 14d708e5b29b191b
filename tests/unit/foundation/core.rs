use super::*;

#[test]
fn region_fits_within_boundaries() {
    assert!(Region::full(4, 4).fits_within(4, 4));
    assert!(Region::new(2, 2, 2, 2).fits_within(4, 4));
    assert!(!Region::new(3, 0, 2, 1).fits_within(4, 4));
    assert!(!Region::new(u32::MAX, 0, 2, 1).fits_within(4, 4));
}

#[test]
fn region_contains_is_half_open() {
    let r = Region::new(1, 1, 2, 2);
    assert!(r.contains(1, 1));
    assert!(r.contains(2, 2));
    assert!(!r.contains(3, 2));
    assert!(!r.contains(0, 1));
}

#[test]
fn from_vec_rejects_wrong_length() {
    assert!(Pixels::from_vec(2, 2, vec![0; 15]).is_err());
    assert!(Pixels::from_vec(2, 2, vec![0; 16]).is_ok());
}

#[test]
fn replace_region_writes_rows_and_clears() {
    let mut p = Pixels::transparent(3, 2).unwrap();
    p.replace_region(Region::new(1, 0, 2, 2), Some(&[9u8; 16]))
        .unwrap();
    assert_eq!(p.pixel(0, 0), Some(Rgba8Premul::transparent()));
    assert_eq!(p.pixel(1, 0), Some(Rgba8Premul::new(9, 9, 9, 9)));
    assert_eq!(p.pixel(2, 1), Some(Rgba8Premul::new(9, 9, 9, 9)));

    p.replace_region(Region::new(2, 1, 1, 1), None).unwrap();
    assert_eq!(p.pixel(2, 1), Some(Rgba8Premul::transparent()));
    assert_eq!(p.pixel(1, 1), Some(Rgba8Premul::new(9, 9, 9, 9)));
}

#[test]
fn replace_region_rejects_out_of_bounds() {
    let mut p = Pixels::transparent(2, 2).unwrap();
    let err = p
        .replace_region(Region::new(1, 1, 2, 2), Some(&[0u8; 16]))
        .unwrap_err();
    assert!(matches!(err, RestoreError::InvalidGeometry(_)));
}

#[test]
fn rgba_image_roundtrip_premultiplies() {
    let img = image::RgbaImage::from_raw(1, 1, vec![255, 0, 0, 128]).unwrap();
    let p = Pixels::from_rgba_image(&img);
    assert_eq!(p.pixel(0, 0), Some(Rgba8Premul::new(128, 0, 0, 128)));
    let back = p.to_rgba_image().unwrap();
    assert_eq!(back.as_raw().as_slice(), &[255, 0, 0, 128]);
}

#[test]
fn digest_tracks_content() {
    let a = Pixels::transparent(2, 2).unwrap();
    let mut b = a.clone();
    assert_eq!(a.digest(), b.digest());
    b.replace_region(Region::new(0, 0, 1, 1), Some(&[1, 2, 3, 4]))
        .unwrap();
    assert_ne!(a.digest(), b.digest());
}

#[test]
fn approx_eq_honors_tolerance() {
    let a = Rgba8Premul::new(255, 0, 0, 255);
    assert!(a.approx_eq(Rgba8Premul::new(254, 1, 0, 255), 1));
    assert!(!a.approx_eq(Rgba8Premul::new(253, 0, 0, 255), 1));
}
