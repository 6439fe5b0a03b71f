use super::*;

#[test]
fn known_colours_resolve() {
    assert_eq!(colour_rgb("red").unwrap(), [1.0, 0.0, 0.0]);
    assert_eq!(colour_rgb("grey-blue").unwrap(), [0.03, 0.03, 0.06]);
    assert!(colour_names().any(|n| n == "pale-orange"));
}

#[test]
fn unknown_colour_is_a_configuration_error() {
    let err = colour_rgb("mauve").unwrap_err();
    assert!(err.to_string().starts_with("configuration error:"));
    assert!(colour_linear("mauve").is_err());
}

#[test]
fn linear_conversion_is_clamped() {
    for c in colour_linear("white").unwrap() {
        assert!(c > 0.999 && c <= 1.0);
    }
    assert_eq!(colour_linear("red").unwrap()[1], 0.0);

    let g = colour_linear("grey").unwrap()[0];
    assert!(g > 0.038 && g < 1.0);
}
