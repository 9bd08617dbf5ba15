//! Headings and Coarse Facing
//!
//! The simulator works with a continuous heading in radians. The wire
//! protocol only carries one of four cardinal directions, always derived
//! from the heading via [`Direction::from_angle`].

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};

/// Normalize an angle into `[0, 2π)`.
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Cardinal facing carried by the wire protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Towards -Y (screen top)
    Up,
    /// Towards +Y (screen bottom)
    Down,
    /// Towards -X
    Left,
    /// Towards +X
    Right,
}

impl Direction {
    /// Quadrant order used by [`Direction::from_angle`].
    const QUADRANTS: [Direction; 4] = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];

    /// Nearest quadrant: `round(heading / (π/2)) mod 4`.
    pub fn from_angle(angle: f64) -> Self {
        let sector = (normalize_angle(angle) / FRAC_PI_2).round() as usize % 4;
        Self::QUADRANTS[sector]
    }

    /// Heading for this facing, already normalized into `[0, 2π)`.
    pub fn to_angle(self) -> f64 {
        match self {
            Direction::Right => 0.0,
            Direction::Down => FRAC_PI_2,
            Direction::Left => PI,
            Direction::Up => normalize_angle(-FRAC_PI_2),
        }
    }

    /// Wire name (`"UP"`, `"DOWN"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UP" => Ok(Direction::Up),
            "DOWN" => Ok(Direction::Down),
            "LEFT" => Ok(Direction::Left),
            "RIGHT" => Ok(Direction::Right),
            _ => Err(()),
        }
    }
}

/// Deserialize an optional direction, mapping unknown names to `None`
/// instead of failing the enclosing record.
pub fn deserialize_lenient_direction<'de, D>(deserializer: D) -> Result<Option<Direction>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}
