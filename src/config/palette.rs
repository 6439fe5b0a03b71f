//! Named display colours.

use crate::foundation::error::{RigError, RigResult};

const COLOURS: &[(&str, [f64; 3])] = &[
    ("yellow", [1.0, 1.0, 0.0]),
    ("green", [0.0, 1.0, 0.0]),
    ("blue", [0.0, 0.0, 1.0]),
    ("dark-blue", [0.0, 0.001, 0.117]),
    ("red", [1.0, 0.0, 0.0]),
    ("orange", [1.0, 0.17, 0.0]),
    ("pale-orange", [1.0, 0.25, 0.1]),
    ("light-orange", [1.0, 0.4, 0.15]),
    ("pink", [1.0, 0.3, 0.55]),
    ("grey-blue", [0.03, 0.03, 0.06]),
    ("grey", [0.038, 0.038, 0.038]),
    ("white", [1.0, 1.0, 1.0]),
    ("purple", [0.25, 0.0, 0.8]),
];

/// RGB (0..1) of a named colour.
pub fn colour_rgb(name: &str) -> RigResult<[f64; 3]> {
    COLOURS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, rgb)| *rgb)
        .ok_or_else(|| RigError::configuration(format!("'{name}' is not an available colour")))
}

/// Named colour shifted with the sRGB transfer curve, clamped to `[0, 1]`.
///
/// Used for outliner colours, which are displayed without view transform.
pub fn colour_linear(name: &str) -> RigResult<[f64; 3]> {
    let rgb = colour_rgb(name)?;
    let linear = rgb.map(|c| (1.055 * c.powf(1.0 / 2.4) - 0.055).clamp(0.0, 1.0));
    Ok(linear)
}

/// All colour names in table order.
pub fn colour_names() -> impl Iterator<Item = &'static str> {
    COLOURS.iter().map(|(n, _)| *n)
}

#[cfg(test)]
#[path = "../../tests/unit/config/palette.rs"]
mod tests;
