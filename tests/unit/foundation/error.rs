use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CamtrackError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        CamtrackError::animation("x")
            .to_string()
            .contains("animation error:")
    );
    assert!(CamtrackError::edit("x").to_string().contains("edit error:"));
    assert!(
        CamtrackError::capture("x")
            .to_string()
            .contains("capture error:")
    );
    assert!(
        CamtrackError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("disk full");
    let err = CamtrackError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("disk full"));
}
