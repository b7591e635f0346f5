use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        GifError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(GifError::state("x").to_string().contains("invalid state:"));
    assert!(
        GifError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    let io = GifError::from(std::io::Error::other("disk full"));
    assert!(io.to_string().contains("io error:"));
}

#[test]
fn io_errors_are_classified() {
    let err: GifError = std::io::Error::other("broken pipe").into();
    assert!(err.is_io());
    assert!(!GifError::validation("x").is_io());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = GifError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
