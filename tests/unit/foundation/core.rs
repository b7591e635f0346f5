use super::*;

#[test]
fn canvas_raises_degenerate_sizes_to_one_pixel() {
    let c = Canvas::for_frame(0, 0).unwrap();
    assert_eq!(
        c,
        Canvas {
            width: 1,
            height: 1
        }
    );
    assert_eq!(c.pixel_count(), 1);
}

#[test]
fn canvas_rejects_sizes_beyond_u16() {
    assert!(Canvas::for_frame(70_000, 10).is_err());
    assert!(Canvas::for_frame(10, 65_536).is_err());
    assert!(Canvas::for_frame(65_535, 1).is_ok());
}

#[test]
fn disposal_codes_roundtrip_and_reject_reserved() {
    for code in 0..4 {
        assert_eq!(DisposalMethod::from_code(code).unwrap().code(), code);
    }
    assert_eq!(DisposalMethod::from_code(4), None);
    assert_eq!(
        "background".parse::<DisposalMethod>().unwrap(),
        DisposalMethod::Background
    );
    assert_eq!(
        "none".parse::<DisposalMethod>().unwrap(),
        DisposalMethod::Unspecified
    );
    assert!("sideways".parse::<DisposalMethod>().is_err());
}

#[test]
fn rgb_parses_hex_with_optional_hash() {
    assert_eq!("ff8000".parse::<Rgb>().unwrap(), Rgb::new(255, 128, 0));
    assert_eq!("#0A0b0C".parse::<Rgb>().unwrap(), Rgb::new(10, 11, 12));
    assert!("fff".parse::<Rgb>().is_err());
    assert!("zz0000".parse::<Rgb>().is_err());
    assert_eq!(Rgb::new(1, 2, 255).to_string(), "0102ff");
}

#[test]
fn delay_conversions_round_to_hundredths() {
    assert_eq!(delay_from_millis(500), 50);
    assert_eq!(delay_from_millis(104), 10);
    assert_eq!(delay_from_millis(105), 11);
    assert_eq!(delay_from_millis(u32::MAX), u16::MAX);
    assert_eq!(delay_from_fps(25.0), Some(4));
    assert_eq!(delay_from_fps(3.0), Some(33));
    assert_eq!(delay_from_fps(0.0), None);
    assert_eq!(delay_from_fps(f32::NAN), None);
}
