use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        RestoreError::geometry("x")
            .to_string()
            .contains("invalid geometry:")
    );
    assert!(
        RestoreError::backend("x")
            .to_string()
            .contains("backend failure:")
    );
    assert!(
        RestoreError::unsupported("x")
            .to_string()
            .contains("unsupported feature:")
    );
    assert!(
        RestoreError::uniform("x")
            .to_string()
            .contains("invalid uniform:")
    );
    assert!(
        RestoreError::disposed("x")
            .to_string()
            .contains("use after dispose:")
    );
}

#[test]
fn cyclic_dependency_lists_images() {
    let err = RestoreError::CyclicDependency {
        images: vec![ImageId(1), ImageId(4)],
    };
    let msg = err.to_string();
    assert!(msg.contains("ImageId(1)"));
    assert!(msg.contains("ImageId(4)"));
}

#[test]
fn only_backend_failures_are_retryable() {
    assert!(RestoreError::backend("readback").is_retryable());
    assert!(!RestoreError::geometry("oob").is_retryable());
    assert!(!RestoreError::CyclicDependency { images: vec![] }.is_retryable());
    assert!(!RestoreError::unsupported("shader").is_retryable());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = RestoreError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
