use crate::error::GridError;
use std::str::FromStr;

/// Sign convention of user supplied vertical coordinates
///
/// Meshes are always built in a positive-up frame (elevation). Depth values given
/// positive-down are negated on the way in, and limit pairs are mirrored so they stay ordered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalConvention {
    /// z increases upwards (elevation); values pass through unchanged
    #[default]
    PositiveUp,
    /// z increases downwards (depth)
    PositiveDown,
}

impl VerticalConvention {
    /// Map a single vertical coordinate into the positive-up frame
    pub fn to_elevation(&self, z: f64) -> f64 {
        match self {
            Self::PositiveUp => z,
            Self::PositiveDown => -z,
        }
    }

    /// Map a `[min, max]` pair into the positive-up frame, keeping it ordered
    pub fn bounds_to_elevation(&self, [a, b]: [f64; 2]) -> [f64; 2] {
        match self {
            Self::PositiveUp => [a, b],
            Self::PositiveDown => [-b, -a],
        }
    }
}

impl FromStr for VerticalConvention {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive_up" | "elevation" => Ok(Self::PositiveUp),
            "positive_down" | "depth" => Ok(Self::PositiveDown),
            other => Err(GridError::invalid(format!(
                "unknown vertical convention '{}'; expected 'positive_up' or 'positive_down'",
                other
            ))),
        }
    }
}
