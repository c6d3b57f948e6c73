use super::receivers::Receivers;
use super::{FieldValue, StaggeredComponent};
use crate::error::GridError;
use crate::mesh::{Axis, TensorMesh};

use rayon::prelude::*;
use smallvec::{smallvec, SmallVec};
use tracing::debug;

/// Sample indices and weights along one axis (only non-zero weights are kept)
type Stencil = SmallVec<[(usize, f64); 2]>;

/// Trilinearly interpolate a staggered field component to every receiver
///
/// The component is sampled at the node or cell-centre coordinates its location implies along each axis.
/// Receivers outside of that staggered span along any axis are `None`; receivers on a sample point
/// reproduce the stored value exactly.
///
/// Receivers are evaluated in parallel; the returned values follow the receiver order.
pub fn interpolate<T: FieldValue>(
    mesh: &TensorMesh,
    component: &StaggeredComponent<T>,
    receivers: &Receivers,
) -> Result<Vec<Option<T>>, GridError> {
    component.check_shape(mesh)?;

    let coords = mesh.staggered_coords(component.location);
    let values = &component.values;

    let interpolated: Vec<Option<T>> = receivers
        .points()
        .par_iter()
        .map(|point| {
            let [sx, sy, sz] = [
                stencil(&coords[Axis::X.index()], point.x)?,
                stencil(&coords[Axis::Y.index()], point.y)?,
                stencil(&coords[Axis::Z.index()], point.z)?,
            ];

            let mut value = T::zero();
            for (i, wx) in sx.iter() {
                for (j, wy) in sy.iter() {
                    for (k, wz) in sz.iter() {
                        value = value + values[[*i, *j, *k]] * (wx * wy * wz);
                    }
                }
            }
            Some(value)
        })
        .collect();

    let missing = interpolated.iter().filter(|v| v.is_none()).count();
    if missing > 0 {
        debug!(
            location = %component.location,
            missing,
            total = interpolated.len(),
            "receivers outside of the staggered grid"
        );
    }

    Ok(interpolated)
}

// linear weights of the samples surrounding `p` (None outside of [coords[0], coords[n-1]])
fn stencil(coords: &[f64], p: f64) -> Option<Stencil> {
    let (first, last) = (*coords.first()?, *coords.last()?);
    if !(p >= first && p <= last) {
        return None;
    }

    let upper = coords.partition_point(|c| *c <= p);
    if upper >= coords.len() {
        return Some(smallvec![(coords.len() - 1, 1.0)]);
    }

    let lower = upper - 1;
    let t = (p - coords[lower]) / (coords[upper] - coords[lower]);
    if t == 0.0 {
        Some(smallvec![(lower, 1.0)])
    } else {
        Some(smallvec![(lower, 1.0 - t), (upper, t)])
    }
}
