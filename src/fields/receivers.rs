use crate::error::GridError;

use nalgebra::Point3;

/// An ordered set of receiver coordinates
///
/// `shape` records how the receivers were laid out when they were created (`[n]` for point
/// lists and broadcast arrays, `[nx, ny, nz]` for grids), so that interpolated values can be
/// reshaped by the caller. Grid receivers are stored in row-major order (z varies fastest).
#[derive(Clone, Debug, PartialEq)]
pub struct Receivers {
    points: Vec<Point3<f64>>,
    shape: Vec<usize>,
}

impl Receivers {
    pub fn from_points(points: Vec<Point3<f64>>) -> Self {
        let shape = vec![points.len()];
        Self { points, shape }
    }

    /// Pair up coordinate arrays of length `n`; arrays of length one are repeated `n` times
    pub fn broadcast(x: &[f64], y: &[f64], z: &[f64]) -> Result<Self, GridError> {
        let lengths = [x.len(), y.len(), z.len()];
        let n = lengths.iter().copied().max().unwrap_or(0);

        if lengths.iter().any(|len| *len != n && *len != 1) {
            return Err(GridError::invalid(format!(
                "receiver coordinate arrays of lengths {:?} cannot be broadcast together",
                lengths
            )));
        }

        let at = |values: &[f64], i: usize| if values.len() == 1 { values[0] } else { values[i] };
        let points = (0..n)
            .map(|i| Point3::new(at(x, i), at(y, i), at(z, i)))
            .collect();

        Ok(Self::from_points(points))
    }

    /// Every combination of the given x, y and z coordinates
    pub fn grid(x: &[f64], y: &[f64], z: &[f64]) -> Self {
        let mut points = Vec::with_capacity(x.len() * y.len() * z.len());
        for px in x.iter() {
            for py in y.iter() {
                for pz in z.iter() {
                    points.push(Point3::new(*px, *py, *pz));
                }
            }
        }

        Self {
            points,
            shape: vec![x.len(), y.len(), z.len()],
        }
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
