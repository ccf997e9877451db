//! Orientations: rotations and reflections applied to placed geometry.

use serde::{Deserialize, Serialize};

/// Wraps an angle in degrees to the range `[0, 360)`.
pub fn wrap_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.);
    // `rem_euclid` may round up to exactly 360 for tiny negative inputs.
    if a >= 360. {
        0.
    } else {
        a
    }
}

/// Signed difference `to - from` in degrees, normalized to `(-180, 180]`.
pub fn angle_diff(from: f64, to: f64) -> f64 {
    let d = wrap_angle(to - from);
    if d > 180. {
        d - 360.
    } else {
        d
    }
}

/// Returns `true` if two angles describe the same direction within `tol` degrees.
pub fn angles_match(a: f64, b: f64, tol: f64) -> bool {
    angle_diff(a, b).abs() <= tol
}

/// An orientation of a placed object.
///
/// Reflection about the x-axis is applied before the counter-clockwise rotation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Reflect vertically, i.e. about the x-axis.
    pub reflect_vert: bool,
    /// Counter-clockwise rotation in degrees.
    pub angle: f64,
}

impl Orientation {
    pub fn new(reflect_vert: bool, angle: f64) -> Self {
        Self {
            reflect_vert,
            angle: wrap_angle(angle),
        }
    }

    /// A pure rotation by `angle` degrees.
    pub fn rotation(angle: f64) -> Self {
        Self::new(false, angle)
    }

    /// Reflects vertically in place, i.e. about the x-axis.
    pub fn reflect_vert(&mut self) {
        self.reflect_vert = !self.reflect_vert;
        self.angle = wrap_angle(-self.angle);
    }

    /// Reflects horizontally in place, i.e. about the y-axis.
    pub fn reflect_horiz(&mut self) {
        self.reflect_vert = !self.reflect_vert;
        self.angle = wrap_angle(180. - self.angle);
    }

    /// Rotates counter-clockwise by `angle` degrees in place.
    pub fn rotate(&mut self, angle: f64) {
        self.angle = wrap_angle(self.angle + angle);
    }

    /// Maps a direction angle in the local frame to the placed frame.
    pub fn apply_to_angle(&self, angle: f64) -> f64 {
        let a = if self.reflect_vert { -angle } else { angle };
        wrap_angle(a + self.angle)
    }
}

/// Named orientations for the eight rectilinear cases.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Named {
    Default,
    R90,
    R180,
    R270,
    ReflectVert,
    ReflectHoriz,
    FlipYx,
    FlipMinusYx,
}

impl Named {
    pub fn all_rectilinear() -> impl Iterator<Item = Named> {
        use Named::*;
        [
            Default,
            R90,
            R180,
            R270,
            ReflectVert,
            ReflectHoriz,
            FlipYx,
            FlipMinusYx,
        ]
        .into_iter()
    }

    pub fn into_orientation(self) -> Orientation {
        use Named::*;
        match self {
            Default => Orientation::new(false, 0.),
            R90 => Orientation::new(false, 90.),
            R180 => Orientation::new(false, 180.),
            R270 => Orientation::new(false, 270.),
            ReflectVert => Orientation::new(true, 0.),
            ReflectHoriz => Orientation::new(true, 180.),
            FlipYx => Orientation::new(true, 90.),
            FlipMinusYx => Orientation::new(true, 270.),
        }
    }
}

impl From<Named> for Orientation {
    fn from(value: Named) -> Self {
        value.into_orientation()
    }
}
