use crate::error::GridError;

use std::f64::consts::PI;
use tracing::debug;

/// Magnetic permeability of free space (H/m)
pub const MU_0: f64 = 4.0e-7 * PI;

/// Default ratio between the minimum cell width and the skin depth
pub const DEFAULT_FACT_MIN: f64 = 0.2;

/// Default number of skin depths to include on each side of the anchor
pub const DEFAULT_FACT_DOMAIN: f64 = 5.0;

/// Frequency at which the field is resolved
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Frequency {
    /// Oscillatory frequency in Hz
    Oscillatory(f64),
    /// Real Laplace-domain decay rate `s` (magnitude)
    Laplace(f64),
}

impl Frequency {
    /// Interpret a signed value: positive values are frequencies in Hz, negative values are Laplace-domain `s`
    pub fn from_signed(value: f64) -> Result<Self, GridError> {
        if !value.is_finite() || value == 0.0 {
            Err(GridError::invalid(format!(
                "frequency must be finite and non-zero (got {})",
                value
            )))
        } else if value > 0.0 {
            Ok(Self::Oscillatory(value))
        } else {
            Ok(Self::Laplace(-value))
        }
    }

    pub fn magnitude(&self) -> f64 {
        match self {
            Self::Oscillatory(f) | Self::Laplace(f) => f.abs(),
        }
    }

    fn validated_magnitude(&self) -> Result<f64, GridError> {
        let m = self.magnitude();
        if !m.is_finite() || m == 0.0 {
            Err(GridError::invalid(format!(
                "frequency must be finite and non-zero (got {})",
                m
            )))
        } else {
            Ok(m)
        }
    }
}

/// Representative resistivity of the medium around an axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resistivity {
    /// One resistivity (Ohm.m) drives both the minimum cell width and the domain extent
    Uniform(f64),
    /// The smallest resistivity drives the minimum cell width, the largest drives the domain extent
    Range { min: f64, max: f64 },
}

impl Resistivity {
    fn bounds(&self) -> Result<[f64; 2], GridError> {
        let [min, max] = match *self {
            Self::Uniform(rho) => [rho, rho],
            Self::Range { min, max } => [min, max],
        };

        for rho in [min, max] {
            if !(rho.is_finite() && rho > 0.0) {
                return Err(GridError::invalid(format!(
                    "resistivity must be positive and finite (got {})",
                    rho
                )));
            }
        }
        if min > max {
            return Err(GridError::invalid(format!(
                "resistivity range is inverted ({} > {})",
                min, max
            )));
        }

        Ok([min, max])
    }
}

/// Minimum cell width policy
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MinWidth {
    /// Use exactly this width
    Fixed(f64),
    /// Estimate the width from the skin depth and clip it into `[min, max]`
    Clipped { min: f64, max: f64 },
}

/// The physical extent `[min, max]` of one axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisDomain {
    min: f64,
    max: f64,
}

impl AxisDomain {
    pub fn new(min: f64, max: f64) -> Result<Self, GridError> {
        if !(min.is_finite() && max.is_finite()) {
            Err(GridError::invalid(format!(
                "domain bounds must be finite (got [{}, {}])",
                min, max
            )))
        } else if min >= max {
            Err(GridError::invalid(format!(
                "domain bounds are inverted or empty ([{}, {}])",
                min, max
            )))
        } else {
            Ok(Self { min, max })
        }
    }

    pub fn from_array([min, max]: [f64; 2]) -> Result<Self, GridError> {
        Self::new(min, max)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }

    /// The domain reflected about zero
    pub fn mirrored(&self) -> Self {
        Self {
            min: -self.max,
            max: -self.min,
        }
    }
}

/// Electromagnetic skin depth (m) for a frequency and resistivity
///
/// `δ = sqrt(ρ / (π f μ0))`. For Laplace-domain values the result is further divided by `sqrt(2π)`.
pub fn skin_depth(frequency: Frequency, resistivity: f64) -> Result<f64, GridError> {
    let f = frequency.validated_magnitude()?;
    let [rho, _] = Resistivity::Uniform(resistivity).bounds()?;

    let depth = (rho / (PI * f * MU_0)).sqrt();
    Ok(match frequency {
        Frequency::Oscillatory(_) => depth,
        Frequency::Laplace(_) => depth / (2.0 * PI).sqrt(),
    })
}

/// Electromagnetic wavelength (m): `2π` skin depths
pub fn wavelength(frequency: Frequency, resistivity: f64) -> Result<f64, GridError> {
    Ok(2.0 * PI * skin_depth(frequency, resistivity)?)
}

/// Inputs of the domain sizer
///
/// The safety factors are empirical; the defaults include five skin depths on either side
/// of the anchor and estimate the minimum width as a fifth of a skin depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DomainRequest {
    pub frequency: Frequency,
    pub resistivity: Resistivity,
    pub min_width: MinWidth,
    /// Hard limits; the computed domain is clipped to them
    pub limits: Option<AxisDomain>,
    /// Skin depths to include below the anchor
    pub fact_neg: f64,
    /// Skin depths to include above the anchor (`fact_neg` when `None`)
    pub fact_pos: Option<f64>,
    /// Minimum width in skin depths, used with [MinWidth::Clipped]
    pub fact_min: f64,
}

impl DomainRequest {
    pub fn new(frequency: Frequency, resistivity: Resistivity, min_width: MinWidth) -> Self {
        Self {
            frequency,
            resistivity,
            min_width,
            limits: None,
            fact_neg: DEFAULT_FACT_DOMAIN,
            fact_pos: None,
            fact_min: DEFAULT_FACT_MIN,
        }
    }

    pub fn with_limits(mut self, limits: AxisDomain) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn with_factors(mut self, fact_neg: f64, fact_pos: Option<f64>) -> Self {
        self.fact_neg = fact_neg;
        self.fact_pos = fact_pos;
        self
    }

    pub fn with_min_factor(mut self, fact_min: f64) -> Self {
        self.fact_min = fact_min;
        self
    }
}

/// Compute the minimum cell width and the domain over which the field has to be resolved
///
/// The domain spans `fact_neg` skin depths below and `fact_pos` skin depths above the `anchor`,
/// clipped to the request's hard limits (if any). An anchor lying exactly on a limit collapses
/// that side of the domain onto the limit.
pub fn compute_domain(
    anchor: f64,
    request: &DomainRequest,
) -> Result<(f64, AxisDomain), GridError> {
    if !anchor.is_finite() {
        return Err(GridError::invalid(format!(
            "anchor must be finite (got {})",
            anchor
        )));
    }

    let fact_pos = request.fact_pos.unwrap_or(request.fact_neg);
    for (name, factor) in [
        ("fact_neg", request.fact_neg),
        ("fact_pos", fact_pos),
        ("fact_min", request.fact_min),
    ] {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(GridError::invalid(format!(
                "{} must be positive and finite (got {})",
                name, factor
            )));
        }
    }

    let [rho_min, rho_max] = request.resistivity.bounds()?;
    let min_width = match request.min_width {
        MinWidth::Fixed(width) => {
            check_width(width)?;
            width
        }
        MinWidth::Clipped { min, max } => {
            check_width(min)?;
            check_width(max)?;
            if min > max {
                return Err(GridError::invalid(format!(
                    "minimum width range is inverted ({} > {})",
                    min, max
                )));
            }
            let estimate = request.fact_min * skin_depth(request.frequency, rho_min)?;
            let width = estimate.clamp(min, max);
            if width != estimate {
                debug!(estimate, width, "minimum cell width clipped into range");
            }
            width
        }
    };

    let depth = skin_depth(request.frequency, rho_max)?;
    let mut lower = anchor - request.fact_neg * depth;
    let mut upper = anchor + fact_pos * depth;

    if let Some(limits) = request.limits {
        if !limits.contains(anchor) {
            return Err(GridError::invalid(format!(
                "anchor {} lies outside the domain limits [{}, {}]",
                anchor, limits.min(), limits.max()
            )));
        }
        lower = lower.max(limits.min());
        upper = upper.min(limits.max());
    }

    debug!(anchor, skin_depth = depth, lower, upper, min_width, "computed domain");

    Ok((min_width, AxisDomain::new(lower, upper)?))
}

fn check_width(width: f64) -> Result<(), GridError> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(GridError::invalid(format!(
            "minimum cell width must be positive and finite (got {})",
            width
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn request(freq: f64, rho: f64, width: f64) -> DomainRequest {
        DomainRequest::new(
            Frequency::from_signed(freq).unwrap(),
            Resistivity::Uniform(rho),
            MinWidth::Fixed(width),
        )
    }

    #[test]
    fn skin_depth_at_one_hertz() {
        // the classic 503 m rule of thumb
        let depth = skin_depth(Frequency::Oscillatory(1.0), 1.0).unwrap();
        assert_relative_eq!(depth, 503.292, epsilon = 1e-3);

        let lambda = wavelength(Frequency::Oscillatory(1.0), 1.0).unwrap();
        assert_relative_eq!(lambda, 2.0 * PI * depth, epsilon = 1e-9);
    }

    #[test]
    fn laplace_skin_depth() {
        let osc = skin_depth(Frequency::Oscillatory(2.0), 3.0).unwrap();
        let lap = skin_depth(Frequency::from_signed(-2.0).unwrap(), 3.0).unwrap();
        assert_relative_eq!(lap * (2.0 * PI).sqrt(), osc, epsilon = 1e-9);
    }

    #[test]
    fn domain_scales_with_skin_depth() {
        let (width, domain) = compute_domain(0.0, &request(1.0, 1.0, 20.0)).unwrap();
        let expected = DEFAULT_FACT_DOMAIN * (1.0 / (PI * MU_0)).sqrt();

        assert_eq!(width, 20.0);
        assert_relative_eq!(domain.max(), expected, epsilon = 1e-9);
        assert_relative_eq!(domain.min(), -expected, epsilon = 1e-9);

        // quadrupling rho/f doubles the half width
        let (_, wider) = compute_domain(0.0, &request(0.25, 1.0, 20.0)).unwrap();
        assert_relative_eq!(wider.max(), 2.0 * expected, epsilon = 1e-9);
    }

    #[test]
    fn asymmetric_factors() {
        let req = request(1.0, 1.0, 20.0).with_factors(2.0, Some(10.0));
        let (_, domain) = compute_domain(100.0, &req).unwrap();
        let depth = skin_depth(Frequency::Oscillatory(1.0), 1.0).unwrap();
        assert_relative_eq!(domain.min(), 100.0 - 2.0 * depth, epsilon = 1e-9);
        assert_relative_eq!(domain.max(), 100.0 + 10.0 * depth, epsilon = 1e-9);
    }

    #[test]
    fn limits_clip_domain() {
        let req = request(1.0, 1.0, 20.0).with_limits(AxisDomain::new(-1000.0, 500.0).unwrap());
        let (_, domain) = compute_domain(0.0, &req).unwrap();
        assert_eq!(domain.min(), -1000.0);
        assert_eq!(domain.max(), 500.0);
    }

    #[test]
    fn wide_limits_do_not_clip() {
        let free = compute_domain(0.0, &request(1.0, 1.0, 20.0)).unwrap().1;
        let req = request(1.0, 1.0, 20.0).with_limits(AxisDomain::new(-1e6, 1e6).unwrap());
        let (_, domain) = compute_domain(0.0, &req).unwrap();
        assert_eq!(domain, free);
    }

    #[test]
    fn anchor_on_limit_collapses_side() {
        let req = request(1.0, 1.0, 20.0).with_limits(AxisDomain::new(-4200.0, 0.0).unwrap());
        let (_, domain) = compute_domain(0.0, &req).unwrap();
        let depth = skin_depth(Frequency::Oscillatory(1.0), 1.0).unwrap();
        assert_eq!(domain.max(), 0.0);
        assert_relative_eq!(domain.min(), -DEFAULT_FACT_DOMAIN * depth, epsilon = 1e-9);
    }

    #[test]
    fn reflection_invariance() {
        let limits = AxisDomain::new(-800.0, 1e5).unwrap();
        let (_, domain) =
            compute_domain(250.0, &request(0.5, 2.0, 10.0).with_limits(limits)).unwrap();
        let (_, reflected) =
            compute_domain(-250.0, &request(0.5, 2.0, 10.0).with_limits(limits.mirrored()))
                .unwrap();
        assert_eq!(reflected, domain.mirrored());
    }

    #[test]
    fn clipped_min_width() {
        let depth = skin_depth(Frequency::Oscillatory(1.0), 0.3).unwrap();
        let req = DomainRequest::new(
            Frequency::Oscillatory(1.0),
            Resistivity::Range { min: 0.3, max: 100.0 },
            MinWidth::Clipped { min: 10.0, max: 500.0 },
        );
        let (width, domain) = compute_domain(0.0, &req).unwrap();
        assert_relative_eq!(width, DEFAULT_FACT_MIN * depth, epsilon = 1e-9);

        // the domain follows the most resistive value
        let resistive = skin_depth(Frequency::Oscillatory(1.0), 100.0).unwrap();
        assert_relative_eq!(domain.max(), DEFAULT_FACT_DOMAIN * resistive, epsilon = 1e-6);

        let req = DomainRequest::new(
            Frequency::Oscillatory(1.0),
            Resistivity::Uniform(0.3),
            MinWidth::Clipped { min: 100.0, max: 500.0 },
        );
        assert_eq!(compute_domain(0.0, &req).unwrap().0, 100.0);
    }

    #[test]
    fn zero_frequency() {
        assert!(matches!(
            Frequency::from_signed(0.0),
            Err(GridError::InvalidParameter(_))
        ));
        let req = DomainRequest::new(
            Frequency::Oscillatory(0.0),
            Resistivity::Uniform(1.0),
            MinWidth::Fixed(1.0),
        );
        assert!(matches!(
            compute_domain(0.0, &req),
            Err(GridError::InvalidParameter(_))
        ));
    }

    #[test]
    fn non_positive_resistivity() {
        assert!(matches!(
            compute_domain(0.0, &request(1.0, 0.0, 20.0)),
            Err(GridError::InvalidParameter(_))
        ));
        assert!(matches!(
            compute_domain(0.0, &request(1.0, -3.0, 20.0)),
            Err(GridError::InvalidParameter(_))
        ));
    }

    #[test]
    fn inverted_limits() {
        assert!(matches!(
            AxisDomain::new(10.0, -10.0),
            Err(GridError::InvalidParameter(_))
        ));
        assert!(matches!(
            AxisDomain::new(5.0, 5.0),
            Err(GridError::InvalidParameter(_))
        ));
    }

    #[test]
    fn degenerate_domains_cannot_be_built() {
        assert!(matches!(
            AxisDomain::new(0.0, 0.0),
            Err(GridError::InvalidParameter(_))
        ));
        assert!(matches!(
            AxisDomain::from_array([0.0, f64::NAN]),
            Err(GridError::InvalidParameter(_))
        ));

        let domain = AxisDomain::new(-30.0, 40.0).unwrap();
        assert_eq!((domain.min(), domain.max()), (-30.0, 40.0));
        assert_eq!(domain.mirrored(), AxisDomain::new(-40.0, 30.0).unwrap());
    }

    #[test]
    fn anchor_outside_limits() {
        let req = request(1.0, 1.0, 20.0).with_limits(AxisDomain::new(0.0, 100.0).unwrap());
        assert!(matches!(
            compute_domain(-10.0, &req),
            Err(GridError::InvalidParameter(_))
        ));
    }
}
