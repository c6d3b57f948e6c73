use crate::mesh::GridLocation;
use thiserror::Error;

/// Errors produced while sizing domains, building meshes, or interpolating fields
#[derive(Error, Debug)]
pub enum GridError {
    /// Malformed physical input (non-positive resistivity, zero frequency, inverted bounds, ...)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The cell budget cannot hold the uniform block plus one stretched cell per non-empty flank
    #[error("Insufficient cells: {required} are required but only {available} were given; cannot build axis!")]
    InsufficientCells { required: usize, available: usize },

    /// A stretching-ratio search exceeded its iteration budget
    #[error("Stretching ratio search did not converge after {iterations} iterations (residual: {residual:e})")]
    NonConvergent { iterations: usize, residual: f64 },

    /// A field array does not match the staggered shape expected by the mesh
    #[error("{location} component has shape {found:?}, but the mesh expects {expected:?}")]
    ShapeMismatch {
        location: GridLocation,
        expected: [usize; 3],
        found: [usize; 3],
    },

    /// Malformed mesh configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<json::Error> for GridError {
    fn from(err: json::Error) -> Self {
        Self::Config(format!("unable to parse mesh configuration as JSON ({})", err))
    }
}
