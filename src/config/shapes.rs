//! Controller shape point tables.
//!
//! Points are authored at unit size; the controller factory scales them.

use std::f64::consts::TAU;

use crate::foundation::error::{RigError, RigResult};
use crate::foundation::math::Vec3;

/// Names accepted by [`shape_points`].
pub const SHAPE_NAMES: &[&str] = &[
    "locator",
    "square",
    "cube",
    "circle",
    "omni-circle",
    "winged-arrow",
    "cog",
];

const LOCATOR: &[[f64; 3]] = &[
    [0.0, 0.0, 10.0],
    [0.0, 0.0, -10.0],
    [0.0, 0.0, 0.0],
    [10.0, 0.0, 0.0],
    [-10.0, 0.0, 0.0],
    [0.0, 0.0, 0.0],
    [0.0, 10.0, 0.0],
    [0.0, -10.0, 0.0],
];

const SQUARE: &[[f64; 3]] = &[
    [0.0, -5.0, 5.0],
    [0.0, -5.0, -5.0],
    [0.0, 5.0, -5.0],
    [0.0, 5.0, 5.0],
    [0.0, -5.0, 5.0],
];

const CUBE: &[[f64; 3]] = &[
    [-5.0, 5.0, 5.0],
    [-5.0, 5.0, -5.0],
    [5.0, 5.0, -5.0],
    [5.0, 5.0, 5.0],
    [-5.0, 5.0, 5.0],
    [-5.0, -5.0, 5.0],
    [-5.0, -5.0, -5.0],
    [-5.0, 5.0, -5.0],
    [-5.0, 5.0, 5.0],
    [-5.0, -5.0, 5.0],
    [5.0, -5.0, 5.0],
    [5.0, 5.0, 5.0],
    [5.0, 5.0, -5.0],
    [5.0, -5.0, -5.0],
    [5.0, -5.0, 5.0],
    [5.0, -5.0, -5.0],
    [-5.0, -5.0, -5.0],
];

const WING: f64 = 2.298144716588758;
const WING_BACK: f64 = -7.614220773648639;
const ARROW_TAIL: f64 = -10.148376747329095;

const WINGED_ARROW: &[[f64; 3]] = &[
    [0.0, 0.0, 0.0],
    [WING_BACK, WING, -WING],
    [ARROW_TAIL, 0.0, 0.0],
    [WING_BACK, WING, WING],
    [0.0, 0.0, 0.0],
    [WING_BACK, -WING, -WING],
    [WING_BACK, WING, -WING],
    [WING_BACK, -WING, -WING],
    [ARROW_TAIL, 0.0, 0.0],
    [WING_BACK, -WING, WING],
    [WING_BACK, WING, WING],
    [WING_BACK, -WING, WING],
    [0.0, 0.0, 0.0],
];

const CIRCLE_SEGMENTS: usize = 32;
const CIRCLE_RADIUS: f64 = 5.0;
const COG_TEETH: usize = 8;

/// Point list of a named controller shape.
pub fn shape_points(name: &str) -> RigResult<Vec<Vec3>> {
    let points = match name {
        "locator" => from_table(LOCATOR),
        "square" => from_table(SQUARE),
        "cube" => from_table(CUBE),
        "winged-arrow" => from_table(WINGED_ARROW),
        // facing +X
        "circle" => ring(CIRCLE_SEGMENTS, |a| {
            Vec3::new(0.0, CIRCLE_RADIUS * a.cos(), CIRCLE_RADIUS * a.sin())
        }),
        // facing +Y
        "omni-circle" => ring(CIRCLE_SEGMENTS, |a| {
            Vec3::new(CIRCLE_RADIUS * a.cos(), 0.0, CIRCLE_RADIUS * a.sin())
        }),
        "cog" => cog(),
        other => {
            return Err(RigError::configuration(format!(
                "'{other}' is not an available controller shape"
            )));
        }
    };
    Ok(points)
}

fn from_table(table: &[[f64; 3]]) -> Vec<Vec3> {
    table.iter().map(|p| Vec3::new(p[0], p[1], p[2])).collect()
}

/// Closed loop: the first point is repeated at the end.
fn ring(segments: usize, point: impl Fn(f64) -> Vec3) -> Vec<Vec3> {
    (0..=segments)
        .map(|i| point(TAU * (i % segments) as f64 / segments as f64))
        .collect()
}

fn cog() -> Vec<Vec3> {
    let inner = CIRCLE_RADIUS;
    let outer = CIRCLE_RADIUS * 1.25;
    let steps = COG_TEETH * 4;
    ring(steps, |a| {
        let step = (a / TAU * steps as f64).round() as usize % 4;
        let r = if step < 2 { outer } else { inner };
        Vec3::new(r * a.cos(), 0.0, r * a.sin())
    })
}

#[cfg(test)]
#[path = "../../tests/unit/config/shapes.rs"]
mod tests;
