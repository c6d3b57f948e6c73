use super::convention::VerticalConvention;
use super::domain::{compute_domain, AxisDomain, DomainRequest, Frequency, MinWidth, Resistivity};
use super::multigrid::{largest_good_cell_number, DEFAULT_MAX_PRIME, DEFAULT_MIN_DIV};
use super::stretch::{build_stretched_axis, StretchedAxis};
use super::{Axis, TensorMesh};
use crate::error::GridError;

use json::JsonValue;
use std::fs::read_to_string;
use tracing::debug;

/// Round cell budgets down to multigrid-friendly numbers
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MultigridRounding {
    pub max_prime: usize,
    pub min_div: u32,
}

impl Default for MultigridRounding {
    fn default() -> Self {
        Self {
            max_prime: DEFAULT_MAX_PRIME,
            min_div: DEFAULT_MIN_DIV,
        }
    }
}

/// How the extent of an axis is determined
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AxisExtent {
    /// An explicit domain
    Fixed(AxisDomain),
    /// Skin-depth based sizing around the anchor
    Sized {
        resistivity: Resistivity,
        limits: Option<AxisDomain>,
        fact_neg: Option<f64>,
        fact_pos: Option<f64>,
        fact_min: Option<f64>,
    },
}

/// Description of one mesh axis (all coordinates in the positive-up frame)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisConfig {
    pub anchor: f64,
    pub second_anchor: Option<f64>,
    pub n_cells: usize,
    pub min_width: MinWidth,
    pub extent: AxisExtent,
}

/// Description of a complete tensor mesh
///
/// Read from a JSON file with the following format (`frequency` is negative for Laplace-domain
/// values; z-coordinates are interpreted according to `vertical_convention`):
///
/// ```JSON
/// {
///     "frequency": 0.5,
///     "vertical_convention": "positive_down",
///     "multigrid": { "max_prime": 5, "min_div": 3 },
///     "x": {
///         "anchor": 0.0,
///         "n_cells": 64,
///         "min_width": 20.0,
///         "resistivity": [0.3, 100.0],
///         "limits": [-10000.0, 10000.0],
///         "fact_neg": 5.0,
///         "fact_pos": 5.0
///     },
///     "y": { "anchor": 0.0, "n_cells": 48, "min_width": [10.0, 50.0], "resistivity": 1.0 },
///     "z": { "anchor": 250.0, "second_anchor": 0.0, "n_cells": 48, "min_width": 20.0, "domain": [-500.0, 4200.0] }
/// }
/// ```
///
/// `multigrid` may also be given as `true` (default rounding) or omitted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshConfig {
    pub frequency: Option<Frequency>,
    pub convention: VerticalConvention,
    pub multigrid: Option<MultigridRounding>,
    pub axes: [AxisConfig; 3],
}

impl MeshConfig {
    pub fn from_file(path: impl AsRef<str>) -> Result<Self, GridError> {
        let contents = read_to_string(path.as_ref())?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, GridError> {
        let config_json = json::parse(contents)?;
        if !config_json.is_object() {
            return Err(GridError::config("mesh configuration must be a JSON object"));
        }

        let frequency = optional_f64(&config_json["frequency"], "frequency")?
            .map(Frequency::from_signed)
            .transpose()?;

        let convention = match config_json["vertical_convention"].as_str() {
            Some(name) => name.parse::<VerticalConvention>()?,
            None if config_json["vertical_convention"].is_null() => VerticalConvention::default(),
            None => return Err(GridError::config("vertical_convention must be a string")),
        };

        let multigrid = parse_multigrid(&config_json["multigrid"])?;

        let axes = [
            parse_axis(&config_json["x"], Axis::X, VerticalConvention::PositiveUp)?,
            parse_axis(&config_json["y"], Axis::Y, VerticalConvention::PositiveUp)?,
            parse_axis(&config_json["z"], Axis::Z, convention)?,
        ];

        Ok(Self {
            frequency,
            convention,
            multigrid,
            axes,
        })
    }

    /// Size and stretch each axis
    pub fn build_axes(&self) -> Result<[StretchedAxis; 3], GridError> {
        let [x, y, z] = Axis::ALL.map(|axis| self.build_axis(axis));
        Ok([x?, y?, z?])
    }

    /// Size and stretch each axis, then assemble the tensor mesh
    pub fn build(&self) -> Result<TensorMesh, GridError> {
        TensorMesh::from_axes(self.build_axes()?)
    }

    fn build_axis(&self, axis: Axis) -> Result<StretchedAxis, GridError> {
        let axis_config = &self.axes[axis.index()];

        let (min_width, domain) = match axis_config.extent {
            AxisExtent::Fixed(domain) => match axis_config.min_width {
                MinWidth::Fixed(width) => (width, domain),
                MinWidth::Clipped { .. } => {
                    return Err(GridError::config(format!(
                        "{}-axis: a min_width range needs a resistivity to be estimated from",
                        axis.name()
                    )))
                }
            },
            AxisExtent::Sized {
                resistivity,
                limits,
                fact_neg,
                fact_pos,
                fact_min,
            } => {
                let frequency = self.frequency.ok_or_else(|| {
                    GridError::config(format!(
                        "{}-axis is sized by resistivity, but no frequency was given",
                        axis.name()
                    ))
                })?;

                let mut request = DomainRequest::new(frequency, resistivity, axis_config.min_width);
                if let Some(limits) = limits {
                    request = request.with_limits(limits);
                }
                if let Some(fact_neg) = fact_neg {
                    request = request.with_factors(fact_neg, fact_pos);
                } else if fact_pos.is_some() {
                    request = request.with_factors(request.fact_neg, fact_pos);
                }
                if let Some(fact_min) = fact_min {
                    request = request.with_min_factor(fact_min);
                }

                compute_domain(axis_config.anchor, &request)?
            }
        };

        let rounding = match self.multigrid {
            Some(rounding) => rounding,
            None => {
                return build_stretched_axis(
                    min_width,
                    domain,
                    axis_config.n_cells,
                    axis_config.anchor,
                    axis_config.second_anchor,
                )
            }
        };

        // the builder may leave part of the budget unused, so the number of cells it actually
        // used is rounded down again until it is multigrid-friendly
        let mut n_cells = axis_config.n_cells;
        loop {
            let good = largest_good_cell_number(n_cells, rounding.max_prime, rounding.min_div)?
                .ok_or_else(|| {
                    GridError::config(format!(
                        "{}-axis: no multigrid-friendly cell number fits within {} cells",
                        axis.name(),
                        n_cells
                    ))
                })?;

            debug!(
                axis = axis.name(),
                min_width,
                lower = domain.min(),
                upper = domain.max(),
                n_cells = good,
                "building axis"
            );

            let stretched = build_stretched_axis(
                min_width,
                domain,
                good,
                axis_config.anchor,
                axis_config.second_anchor,
            )?;
            if stretched.n_cells() == good {
                return Ok(stretched);
            }
            n_cells = stretched.n_cells();
        }
    }
}

fn parse_multigrid(value: &JsonValue) -> Result<Option<MultigridRounding>, GridError> {
    if value.is_null() {
        return Ok(None);
    }
    if let Some(enabled) = value.as_bool() {
        return Ok(enabled.then(MultigridRounding::default));
    }
    if !value.is_object() {
        return Err(GridError::config(
            "multigrid must be a boolean or an object with max_prime and min_div",
        ));
    }

    let mut rounding = MultigridRounding::default();
    if let Some(max_prime) = optional_usize(&value["max_prime"], "multigrid.max_prime")? {
        rounding.max_prime = max_prime;
    }
    if let Some(min_div) = optional_usize(&value["min_div"], "multigrid.min_div")? {
        rounding.min_div = u32::try_from(min_div)
            .map_err(|_| GridError::config("multigrid.min_div is too large"))?;
    }
    Ok(Some(rounding))
}

fn parse_axis(
    value: &JsonValue,
    axis: Axis,
    convention: VerticalConvention,
) -> Result<AxisConfig, GridError> {
    let name = axis.name();
    if !value.is_object() {
        return Err(GridError::config(format!(
            "axis '{}' must be described by an object",
            name
        )));
    }

    let anchor = convention.to_elevation(required_f64(&value["anchor"], &format!("{}.anchor", name))?);
    let second_anchor = optional_f64(&value["second_anchor"], &format!("{}.second_anchor", name))?
        .map(|z| convention.to_elevation(z));

    let n_cells = optional_usize(&value["n_cells"], &format!("{}.n_cells", name))?.ok_or_else(
        || GridError::config(format!("{}.n_cells is required", name)),
    )?;

    let min_width = match pair_or_number(&value["min_width"], &format!("{}.min_width", name))? {
        Some(PairOrNumber::Number(width)) => MinWidth::Fixed(width),
        Some(PairOrNumber::Pair([min, max])) => MinWidth::Clipped { min, max },
        None => return Err(GridError::config(format!("{}.min_width is required", name))),
    };

    let domain = optional_pair(&value["domain"], &format!("{}.domain", name))?;
    let resistivity = pair_or_number(&value["resistivity"], &format!("{}.resistivity", name))?;

    let extent = match (domain, resistivity) {
        (Some(domain), None) => {
            AxisExtent::Fixed(AxisDomain::from_array(convention.bounds_to_elevation(domain))?)
        }
        (None, Some(resistivity)) => AxisExtent::Sized {
            resistivity: match resistivity {
                PairOrNumber::Number(rho) => Resistivity::Uniform(rho),
                PairOrNumber::Pair([a, b]) => Resistivity::Range {
                    min: a.min(b),
                    max: a.max(b),
                },
            },
            limits: optional_pair(&value["limits"], &format!("{}.limits", name))?
                .map(|limits| AxisDomain::from_array(convention.bounds_to_elevation(limits)))
                .transpose()?,
            fact_neg: optional_f64(&value["fact_neg"], &format!("{}.fact_neg", name))?,
            fact_pos: optional_f64(&value["fact_pos"], &format!("{}.fact_pos", name))?,
            fact_min: optional_f64(&value["fact_min"], &format!("{}.fact_min", name))?,
        },
        (Some(_), Some(_)) => {
            return Err(GridError::config(format!(
                "axis '{}' has both a domain and a resistivity; choose one",
                name
            )))
        }
        (None, None) => {
            return Err(GridError::config(format!(
                "axis '{}' needs either a domain or a resistivity",
                name
            )))
        }
    };

    Ok(AxisConfig {
        anchor,
        second_anchor,
        n_cells,
        min_width,
        extent,
    })
}

enum PairOrNumber {
    Number(f64),
    Pair([f64; 2]),
}

fn required_f64(value: &JsonValue, key: &str) -> Result<f64, GridError> {
    optional_f64(value, key)?.ok_or_else(|| GridError::config(format!("{} is required", key)))
}

fn optional_f64(value: &JsonValue, key: &str) -> Result<Option<f64>, GridError> {
    if value.is_null() {
        Ok(None)
    } else {
        value
            .as_f64()
            .map(Some)
            .ok_or_else(|| GridError::config(format!("{} must be a number", key)))
    }
}

fn optional_usize(value: &JsonValue, key: &str) -> Result<Option<usize>, GridError> {
    if value.is_null() {
        Ok(None)
    } else {
        value
            .as_usize()
            .map(Some)
            .ok_or_else(|| GridError::config(format!("{} must be a non-negative integer", key)))
    }
}

fn optional_pair(value: &JsonValue, key: &str) -> Result<Option<[f64; 2]>, GridError> {
    match pair_or_number(value, key)? {
        None => Ok(None),
        Some(PairOrNumber::Pair(pair)) => Ok(Some(pair)),
        Some(PairOrNumber::Number(_)) => Err(GridError::config(format!(
            "{} must be an array of two numbers",
            key
        ))),
    }
}

fn pair_or_number(value: &JsonValue, key: &str) -> Result<Option<PairOrNumber>, GridError> {
    if value.is_null() {
        return Ok(None);
    }
    if let Some(number) = value.as_f64() {
        return Ok(Some(PairOrNumber::Number(number)));
    }
    if value.is_array() && value.len() == 2 {
        if let (Some(a), Some(b)) = (value[0].as_f64(), value[1].as_f64()) {
            return Ok(Some(PairOrNumber::Pair([a, b])));
        }
    }
    Err(GridError::config(format!(
        "{} must be a number or an array of two numbers",
        key
    )))
}
