/// JSON description of a mesh, built through the domain sizer and stretched axis builder
pub mod config;
/// Sign conventions for vertical coordinates
pub mod convention;
/// Skin-depth based sizing of the computational domain along one axis
pub mod domain;
/// Cell numbers which can be coarsened repeatedly by a multigrid solver
pub mod multigrid;
/// Locally refined, geometrically stretched axes
pub mod stretch;

use crate::error::GridError;
use stretch::StretchedAxis;

use json::{object, JsonValue};
use std::fmt;
#[cfg(feature = "json_export")]
use std::fs::File;
#[cfg(feature = "json_export")]
use std::io::BufWriter;

/// Cartesian axis (or field component) of a [TensorMesh]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    pub fn index(&self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }
}

/// Where a field component lives within a cell of the staggered (Yee) grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Staggering {
    /// face centres (flux-type fields, e.g. the magnetic field)
    Face,
    /// edge midpoints (circulation-type fields, e.g. the electric field)
    Edge,
}

/// The declared location of one field component on the staggered grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridLocation {
    pub staggering: Staggering,
    pub component: Axis,
}

impl GridLocation {
    pub const fn new(staggering: Staggering, component: Axis) -> Self {
        Self {
            staggering,
            component,
        }
    }

    pub const fn face(component: Axis) -> Self {
        Self::new(Staggering::Face, component)
    }

    pub const fn edge(component: Axis) -> Self {
        Self::new(Staggering::Edge, component)
    }

    /// Does this component sit on the nodes (rather than the cell centres) along `axis`?
    ///
    /// * Face components sit on nodes along their own axis and on centres along the other two
    /// * Edge components sit on centres along their own axis and on nodes along the other two
    pub fn on_nodes(&self, axis: Axis) -> bool {
        match self.staggering {
            Staggering::Face => axis == self.component,
            Staggering::Edge => axis != self.component,
        }
    }
}

impl fmt::Display for GridLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.staggering {
            Staggering::Face => "Face",
            Staggering::Edge => "Edge",
        };
        write!(f, "{}-{}", kind, self.component.name().to_uppercase())
    }
}

/// A rectilinear 3D grid defined by independent cell widths along each axis and an origin
#[derive(Debug, Clone, PartialEq)]
pub struct TensorMesh {
    h: [Vec<f64>; 3],
    origin: [f64; 3],
}

impl TensorMesh {
    /// Construct a mesh from cell widths along x, y and z, starting at `origin`
    ///
    /// Every axis needs at least one cell, and every width must be positive and finite
    pub fn new(h: [Vec<f64>; 3], origin: [f64; 3]) -> Result<Self, GridError> {
        for axis in Axis::ALL {
            let widths = &h[axis.index()];
            if widths.is_empty() {
                return Err(GridError::invalid(format!(
                    "{}-axis has no cells; cannot construct TensorMesh!",
                    axis.name()
                )));
            }
            if let Some(bad) = widths.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
                return Err(GridError::invalid(format!(
                    "{}-axis has a cell of width {}; widths must be positive and finite!",
                    axis.name(),
                    bad
                )));
            }
            if !origin[axis.index()].is_finite() {
                return Err(GridError::invalid(format!(
                    "{}-origin must be finite!",
                    axis.name()
                )));
            }
        }

        Ok(Self { h, origin })
    }

    /// Assemble a mesh from three stretched axes; each axis keeps its own origin
    pub fn from_axes([x, y, z]: [StretchedAxis; 3]) -> Result<Self, GridError> {
        let origin = [x.origin, y.origin, z.origin];
        Self::new([x.widths, y.widths, z.widths], origin)
    }

    /// Construct a mesh whose extent is centred on zero along every axis
    pub fn centered(h: [Vec<f64>; 3]) -> Result<Self, GridError> {
        let origin = [
            -h[0].iter().sum::<f64>() / 2.0,
            -h[1].iter().sum::<f64>() / 2.0,
            -h[2].iter().sum::<f64>() / 2.0,
        ];
        Self::new(h, origin)
    }

    // ----------------------------------------------------------------------------------------------------
    // Geometry
    // ----------------------------------------------------------------------------------------------------

    pub fn widths(&self, axis: Axis) -> &[f64] {
        &self.h[axis.index()]
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// Number of cells along x, y and z
    pub fn shape_cells(&self) -> [usize; 3] {
        [self.h[0].len(), self.h[1].len(), self.h[2].len()]
    }

    /// Number of nodes along x, y and z
    pub fn shape_nodes(&self) -> [usize; 3] {
        self.shape_cells().map(|n| n + 1)
    }

    /// Total number of cells
    pub fn n_cells(&self) -> usize {
        self.shape_cells().iter().product()
    }

    /// Physical extent `[min, max]` of the mesh along `axis`
    pub fn extent(&self, axis: Axis) -> [f64; 2] {
        let min = self.origin[axis.index()];
        [min, min + self.h[axis.index()].iter().sum::<f64>()]
    }

    /// Node coordinates along an axis (cell boundaries, `n_cells + 1` values)
    pub fn nodes(&self, axis: Axis) -> Vec<f64> {
        let mut position = self.origin[axis.index()];
        let mut nodes = Vec::with_capacity(self.h[axis.index()].len() + 1);
        nodes.push(position);
        for width in self.h[axis.index()].iter() {
            position += width;
            nodes.push(position);
        }
        nodes
    }

    /// Cell centre coordinates along an axis
    pub fn cell_centers(&self, axis: Axis) -> Vec<f64> {
        self.nodes(axis)
            .windows(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect()
    }

    // ----------------------------------------------------------------------------------------------------
    // Staggered grid
    // ----------------------------------------------------------------------------------------------------

    /// Array shape that a field component at `location` must have on this mesh
    pub fn staggered_shape(&self, location: GridLocation) -> [usize; 3] {
        let cells = self.shape_cells();
        Axis::ALL.map(|axis| {
            if location.on_nodes(axis) {
                cells[axis.index()] + 1
            } else {
                cells[axis.index()]
            }
        })
    }

    /// Coordinates of the staggered sample points of a component, per axis
    pub fn staggered_coords(&self, location: GridLocation) -> [Vec<f64>; 3] {
        Axis::ALL.map(|axis| {
            if location.on_nodes(axis) {
                self.nodes(axis)
            } else {
                self.cell_centers(axis)
            }
        })
    }

    /// Total number of faces or edges (summed over the three components)
    pub fn n_staggered(&self, staggering: Staggering) -> usize {
        Axis::ALL
            .iter()
            .map(|axis| {
                self.staggered_shape(GridLocation::new(staggering, *axis))
                    .iter()
                    .product::<usize>()
            })
            .sum()
    }

    // ----------------------------------------------------------------------------------------------------
    // Export
    // ----------------------------------------------------------------------------------------------------

    pub fn to_json(&self) -> JsonValue {
        object! {
            "Widths": object! {
                "x": JsonValue::from(self.h[0].clone()),
                "y": JsonValue::from(self.h[1].clone()),
                "z": JsonValue::from(self.h[2].clone()),
            },
            "Origin": JsonValue::from(self.origin.to_vec()),
            "Cells": JsonValue::from(self.shape_cells().to_vec()),
            "Edges": self.n_staggered(Staggering::Edge),
            "Faces": self.n_staggered(Staggering::Face),
        }
    }

    /// Print the mesh to a JSON file specified by path.
    #[cfg(feature = "json_export")]
    pub fn export_to_json(&self, path: impl AsRef<str>) -> Result<(), GridError> {
        let f = File::create(path.as_ref())?;
        let mut w = BufWriter::new(&f);

        self.to_json().write_pretty(&mut w, 4)?;

        Ok(())
    }
}
