use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        RigError::structural("arm", "x")
            .to_string()
            .contains("structural error in 'arm':")
    );
    assert!(
        RigError::registration("arm", "x")
            .to_string()
            .contains("registration error in 'arm':")
    );
    assert!(
        RigError::encapsulation("arm", "x")
            .to_string()
            .contains("encapsulation error in 'arm':")
    );
    assert!(
        RigError::validation("arm", "x")
            .to_string()
            .contains("validation error in 'arm':")
    );
    assert!(
        RigError::configuration("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(RigError::graph("x").to_string().contains("graph error:"));
}

#[test]
fn graph_errors_are_attributed_to_modules() {
    let err = RigError::graph("no attribute 'foo' on 'bar'").in_module("L_arm");
    assert!(matches!(err, RigError::Structural { .. }));
    assert!(err.to_string().contains("L_arm"));
    assert!(err.to_string().contains("foo"));

    let kept = RigError::validation("neck", "needs 3 joints").in_module("other");
    assert!(kept.is_validation());
    assert!(kept.to_string().contains("neck"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = RigError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn build_failures_keep_their_cause() {
    let cause = RigError::structural("neck", "missing plug");
    let err = RigError::build_failed("neck", "build", cause);
    let text = err.to_string();
    assert!(text.starts_with("build failed at build of 'neck':"));
    assert!(text.contains("missing plug"));
    let source = std::error::Error::source(&err).unwrap();
    assert!(source.to_string().contains("structural error"));
}
