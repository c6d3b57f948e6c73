//! Stretched tensor meshes for 3D frequency- and Laplace-domain EM modelling
//!
//! * [mesh::domain] sizes the computational domain along an axis from the skin depth
//! * [mesh::stretch] builds an axis with uniform cells around the source and geometrically growing cells outside
//! * [fields] interpolates staggered (face or edge) field components to receiver locations
//!
//! Meshes can also be described in JSON and built through [mesh::config::MeshConfig].

/// Error type shared by every module
pub mod error;
/// Staggered fields on a [TensorMesh] and their interpolation to receivers
pub mod fields;
/// Tensor meshes and the axis builders which produce them
pub mod mesh;

pub use error::GridError;
pub use fields::interpolate::interpolate;
pub use fields::receivers::Receivers;
pub use fields::{FieldValue, StaggeredComponent, VectorField};
pub use mesh::config::MeshConfig;
pub use mesh::domain::{
    compute_domain, skin_depth, wavelength, AxisDomain, DomainRequest, Frequency, MinWidth,
    Resistivity,
};
pub use mesh::stretch::{build_stretched_axis, StretchedAxis};
pub use mesh::{Axis, GridLocation, Staggering, TensorMesh};
