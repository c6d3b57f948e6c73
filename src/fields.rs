/// Linear interpolation of staggered field components to receiver locations
pub mod interpolate;
/// Sets of receiver coordinates
pub mod receivers;

use crate::error::GridError;
use crate::mesh::{Axis, GridLocation, Staggering, TensorMesh};
use interpolate::interpolate;
use receivers::Receivers;

use ndarray::{Array3, ArrayView3, ShapeBuilder};
use num_complex::Complex64;
use std::fmt::Debug;
use std::ops::{Add, Mul};

/// Scalar types which can be stored on a staggered grid and interpolated
pub trait FieldValue:
    Copy + Send + Sync + Debug + Add<Output = Self> + Mul<f64, Output = Self>
{
    fn zero() -> Self;
}

impl FieldValue for f64 {
    fn zero() -> Self {
        0.0
    }
}

impl FieldValue for Complex64 {
    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }
}

/// A borrowed 3D array of field values together with its declared location on the grid
#[derive(Clone, Debug)]
pub struct StaggeredComponent<'a, T> {
    pub location: GridLocation,
    pub values: ArrayView3<'a, T>,
}

impl<'a, T> StaggeredComponent<'a, T> {
    pub fn new(location: GridLocation, values: ArrayView3<'a, T>) -> Self {
        Self { location, values }
    }

    /// Shape of the value array as `[nx, ny, nz]`
    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.values.dim();
        [nx, ny, nz]
    }

    /// Ensure that the value array matches the staggered shape expected by `mesh`
    pub fn check_shape(&self, mesh: &TensorMesh) -> Result<(), GridError> {
        check_shape(mesh, self.location, self.shape())
    }
}

/// All three components of a field living on the faces or edges of a [TensorMesh]
#[derive(Clone, Debug, PartialEq)]
pub struct VectorField<T> {
    staggering: Staggering,
    components: [Array3<T>; 3],
}

impl<T: FieldValue> VectorField<T> {
    /// Bundle three component arrays (x, y, z); each must match its staggered shape on `mesh`
    pub fn new(
        mesh: &TensorMesh,
        staggering: Staggering,
        components: [Array3<T>; 3],
    ) -> Result<Self, GridError> {
        for (axis, values) in Axis::ALL.iter().zip(components.iter()) {
            let (nx, ny, nz) = values.dim();
            check_shape(mesh, GridLocation::new(staggering, *axis), [nx, ny, nz])?;
        }

        Ok(Self {
            staggering,
            components,
        })
    }

    /// Split a flat vector holding the x, y and z components one after another
    ///
    /// Each component is stored in column-major (Fortran) order, the storage order of the solver.
    pub fn from_flat(
        mesh: &TensorMesh,
        staggering: Staggering,
        values: &[T],
    ) -> Result<Self, GridError> {
        let expected = mesh.n_staggered(staggering);
        if values.len() != expected {
            return Err(GridError::invalid(format!(
                "flat {:?} field has {} values, but the mesh has {}; cannot split into components!",
                staggering,
                values.len(),
                expected
            )));
        }

        let mut offset = 0;
        let mut components = Vec::with_capacity(3);
        for axis in Axis::ALL {
            let [nx, ny, nz] = mesh.staggered_shape(GridLocation::new(staggering, axis));
            let len = nx * ny * nz;
            let component =
                Array3::from_shape_vec((nx, ny, nz).f(), values[offset..offset + len].to_vec())
                    .map_err(|err| GridError::invalid(err.to_string()))?;
            components.push(component);
            offset += len;
        }

        let [x, y, z]: [Array3<T>; 3] = components
            .try_into()
            .map_err(|_| GridError::invalid("expected exactly three components"))?;

        Ok(Self {
            staggering,
            components: [x, y, z],
        })
    }

    pub fn staggering(&self) -> Staggering {
        self.staggering
    }

    pub fn component(&self, axis: Axis) -> StaggeredComponent<'_, T> {
        StaggeredComponent::new(
            GridLocation::new(self.staggering, axis),
            self.components[axis.index()].view(),
        )
    }

    /// Interpolate the x, y and z components to the receivers
    pub fn interpolate_all(
        &self,
        mesh: &TensorMesh,
        receivers: &Receivers,
    ) -> Result<[Vec<Option<T>>; 3], GridError> {
        Ok([
            interpolate(mesh, &self.component(Axis::X), receivers)?,
            interpolate(mesh, &self.component(Axis::Y), receivers)?,
            interpolate(mesh, &self.component(Axis::Z), receivers)?,
        ])
    }
}

fn check_shape(
    mesh: &TensorMesh,
    location: GridLocation,
    found: [usize; 3],
) -> Result<(), GridError> {
    let expected = mesh.staggered_shape(location);
    if found == expected {
        Ok(())
    } else {
        Err(GridError::ShapeMismatch {
            location,
            expected,
            found,
        })
    }
}
