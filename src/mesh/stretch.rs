use super::domain::AxisDomain;
use crate::error::GridError;

use std::ops::Range;
use tracing::{debug, warn};

/// Iteration budget of every stretching-ratio bisection
pub const MAX_RATIO_ITERATIONS: usize = 200;

// relative slack used when comparing accumulated widths against a target distance
const SPAN_SLACK: f64 = 1e-12;

/// One axis of a tensor mesh: fine near the anchor(s), geometrically stretched towards the domain edges
#[derive(Debug, Clone, PartialEq)]
pub struct StretchedAxis {
    /// Cell widths from the lower domain edge upwards
    pub widths: Vec<f64>,
    /// Position of the lower domain edge
    pub origin: f64,
    /// Largest growth ratio of the two flanks (1.0 when no stretching was needed)
    pub ratio: f64,
    /// Indices of the uniform `min_width` cells
    pub uniform: Range<usize>,
}

impl StretchedAxis {
    pub fn n_cells(&self) -> usize {
        self.widths.len()
    }

    pub fn span(&self) -> f64 {
        self.widths.iter().sum()
    }

    /// Node coordinates (`n_cells + 1` values)
    pub fn nodes(&self) -> Vec<f64> {
        let mut position = self.origin;
        let mut nodes = Vec::with_capacity(self.widths.len() + 1);
        nodes.push(position);
        for width in self.widths.iter() {
            position += width;
            nodes.push(position);
        }
        nodes
    }
}

/// Build a locally refined axis over `domain`
///
/// A block of `min_width` cells is centred on `anchor` (two cells with the anchor on the central node).
/// With a `second_anchor` the block covers the whole anchor-to-anchor span, centred on its midpoint,
/// so that e.g. the region between a source and an interface stays unstretched.
/// A block overhanging a domain edge is shifted inside; one ending less than one cell short of an edge
/// is shifted onto that edge. When neither side has room for a full cell, the leftovers are added to
/// the block's outer cells instead, so the anchor stays on its node.
///
/// Outside the block the widths grow geometrically on both flanks until the domain edges are reached:
/// * the smallest shared ratio for which both flanks fit into the remaining cell budget is found by bisection
/// * each flank's ratio is then refined so that its cells end exactly on the domain edge
/// * flank cells are never narrower than `min_width`; a surplus budget is left unused
///
/// If the block alone covers the domain, it is clipped to the domain and no stretching takes place.
pub fn build_stretched_axis(
    min_width: f64,
    domain: AxisDomain,
    n_cells: usize,
    anchor: f64,
    second_anchor: Option<f64>,
) -> Result<StretchedAxis, GridError> {
    if !(min_width.is_finite() && min_width > 0.0) {
        return Err(GridError::invalid(format!(
            "minimum cell width must be positive and finite (got {})",
            min_width
        )));
    }
    for a in std::iter::once(anchor).chain(second_anchor) {
        if !domain.contains(a) {
            return Err(GridError::invalid(format!(
                "anchor {} lies outside of the domain [{}, {}]; cannot build axis!",
                a, domain.min(), domain.max()
            )));
        }
    }

    let (lo, hi) = match second_anchor {
        Some(second) => (anchor.min(second), anchor.max(second)),
        None => (anchor, anchor),
    };

    let block_cells = uniform_block_cells((hi - lo) / min_width);
    let block_len = block_cells as f64 * min_width;
    let slack = min_width * 1e-9;

    if block_len >= domain.span() - slack {
        return clipped_block(min_width, domain, n_cells, (lo + hi) / 2.0, block_cells);
    }

    let mut start =
        ((lo + hi) / 2.0 - block_len / 2.0).clamp(domain.min(), domain.max() - block_len);
    let gaps = [start - domain.min(), domain.max() - (start + block_len)];
    if gaps.iter().all(|gap| *gap < min_width) {
        return snug_block(min_width, domain, n_cells, start, block_cells);
    }

    // a leftover narrower than one cell joins the flank on the other side
    let sliver = |gap: f64| gap > slack && gap < min_width;
    if sliver(gaps[0]) {
        start = domain.min();
    } else if sliver(gaps[1]) {
        start = domain.max() - block_len;
    }

    let flanks = [start - domain.min(), domain.max() - (start + block_len)]
        .map(|d| if d > slack { d } else { 0.0 });
    let non_empty = flanks.iter().filter(|d| **d > 0.0).count();

    if n_cells < block_cells + non_empty {
        return Err(GridError::InsufficientCells {
            required: block_cells + non_empty,
            available: n_cells,
        });
    }
    let budget = n_cells - block_cells;

    let shared_ratio = shared_ratio(min_width, flanks, budget)?;
    let [lower, upper] = [flanks[0], flanks[1]].map(|distance| {
        let allowed = cells_needed(min_width, distance, shared_ratio, budget);
        flank_widths(min_width, distance, allowed)
    });
    let (lower, lower_ratio) = lower?;
    let (upper, upper_ratio) = upper?;

    let used = lower.len() + block_cells + upper.len();
    if used < n_cells {
        warn!(
            requested = n_cells,
            used, "cell budget exceeds what the domain needs at min_width; surplus cells unused"
        );
    }

    let mut widths = Vec::with_capacity(used);
    widths.extend(lower.iter().rev());
    widths.extend(std::iter::repeat(min_width).take(block_cells));
    widths.extend(upper.iter());

    let ratio = lower_ratio.max(upper_ratio);
    debug!(
        n_cells = used,
        block_cells,
        shared_ratio,
        lower_ratio,
        upper_ratio,
        "built stretched axis"
    );

    Ok(StretchedAxis {
        widths,
        origin: domain.min(),
        ratio,
        uniform: lower.len()..lower.len() + block_cells,
    })
}

// number of uniform cells needed to cover an anchor-to-anchor span (in units of min_width)
fn uniform_block_cells(span_in_cells: f64) -> usize {
    ((span_in_cells - 1e-9).ceil().max(2.0)) as usize
}

// the uniform block covers the whole domain: clip its cells to the domain edges
fn clipped_block(
    min_width: f64,
    domain: AxisDomain,
    n_cells: usize,
    center: f64,
    block_cells: usize,
) -> Result<StretchedAxis, GridError> {
    let block_len = block_cells as f64 * min_width;
    let start = (center - block_len / 2.0)
        .min(domain.min())
        .max(domain.max() - block_len);
    let slack = min_width * 1e-9;

    let mut nodes = vec![domain.min()];
    nodes.extend(
        (1..block_cells)
            .map(|i| start + i as f64 * min_width)
            .filter(|p| *p > domain.min() + slack && *p < domain.max() - slack),
    );
    nodes.push(domain.max());

    let widths: Vec<f64> = nodes.windows(2).map(|pair| pair[1] - pair[0]).collect();
    if widths.len() > n_cells {
        return Err(GridError::InsufficientCells {
            required: widths.len(),
            available: n_cells,
        });
    }

    debug!(n_cells = widths.len(), "uniform block covers the domain; no stretching");

    Ok(StretchedAxis {
        uniform: 0..widths.len(),
        widths,
        origin: domain.min(),
        ratio: 1.0,
    })
}

// the block nearly fills the domain: widen its outer cells up to the domain edges
fn snug_block(
    min_width: f64,
    domain: AxisDomain,
    n_cells: usize,
    start: f64,
    block_cells: usize,
) -> Result<StretchedAxis, GridError> {
    if block_cells > n_cells {
        return Err(GridError::InsufficientCells {
            required: block_cells,
            available: n_cells,
        });
    }

    let slack = min_width * 1e-9;
    let lower_gap = start - domain.min();
    let upper_gap = domain.max() - (start + block_cells as f64 * min_width);

    let mut widths = vec![min_width; block_cells];
    widths[0] += lower_gap;
    widths[block_cells - 1] += upper_gap;

    let first = usize::from(lower_gap > slack);
    let last = block_cells - usize::from(upper_gap > slack);

    debug!(
        n_cells = block_cells,
        lower_gap, upper_gap, "block widened onto both domain edges; no stretching"
    );

    Ok(StretchedAxis {
        widths,
        origin: domain.min(),
        ratio: 1.0,
        uniform: first..last.max(first),
    })
}

// the number of cells growing by `ratio` (first cell: min_width * ratio) needed to cover `distance`
// counting stops once `cap` is exceeded
fn cells_needed(min_width: f64, distance: f64, ratio: f64, cap: usize) -> usize {
    if distance <= 0.0 {
        return 0;
    }

    let target = distance * (1.0 - SPAN_SLACK);
    let mut width = min_width;
    let mut covered = 0.0;
    let mut count = 0;
    while covered < target && count <= cap {
        width *= ratio;
        covered += width;
        count += 1;
    }
    count
}

// smallest ratio >= 1 for which both flanks fit into the cell budget
fn shared_ratio(min_width: f64, flanks: [f64; 2], budget: usize) -> Result<f64, GridError> {
    let fits = |ratio: f64| {
        flanks
            .iter()
            .map(|d| cells_needed(min_width, *d, ratio, budget))
            .sum::<usize>()
            <= budget
    };

    if fits(1.0) {
        return Ok(1.0);
    }

    // one cell of width `distance` always fits
    let upper = flanks.iter().cloned().fold(0.0, f64::max) / min_width + 1.0;
    bisect(1.0, upper, fits)
}

// cells of one flank (ordered outwards from the block) and their growth ratio
fn flank_widths(
    min_width: f64,
    distance: f64,
    allowed: usize,
) -> Result<(Vec<f64>, f64), GridError> {
    if distance <= 0.0 {
        return Ok((Vec::new(), 1.0));
    }

    let in_cells = distance / min_width;
    let (count, ratio) = if allowed as f64 >= in_cells - 1e-9 {
        if (in_cells - in_cells.round()).abs() <= 1e-9 * in_cells.max(1.0) {
            // whole number of uniform cells
            (in_cells.round() as usize, 1.0)
        } else {
            // avoid a sliver: one cell less, gently stretched
            let count = (in_cells.floor() as usize).max(1);
            (count, flank_ratio(min_width, distance, count)?)
        }
    } else {
        (allowed, flank_ratio(min_width, distance, allowed)?)
    };

    let mut widths = Vec::with_capacity(count);
    let mut width = min_width;
    for _ in 0..count {
        width *= ratio;
        widths.push(width);
    }

    // the outermost cell absorbs the rounding residue
    let residue = distance - widths.iter().sum::<f64>();
    if let Some(last) = widths.last_mut() {
        *last += residue;
    }

    Ok((widths, ratio))
}

// ratio r for which `count` cells (min_width * r^i, i = 1..=count) sum to `distance`
fn flank_ratio(min_width: f64, distance: f64, count: usize) -> Result<f64, GridError> {
    if count as f64 * min_width >= distance {
        return Ok(1.0);
    }

    let reaches = |ratio: f64| {
        let mut width = min_width;
        let mut covered = 0.0;
        for _ in 0..count {
            width *= ratio;
            covered += width;
        }
        covered >= distance
    };

    bisect(1.0, distance / min_width + 1.0, reaches)
}

// bisection for the threshold of a monotone predicate (false at `lo`, true at `hi`)
//
// Runs until the midpoint is no longer representable between the bracket ends; the result only
// depends on the bracket and the predicate.
fn bisect<F>(mut lo: f64, mut hi: f64, predicate: F) -> Result<f64, GridError>
where
    F: Fn(f64) -> bool,
{
    for _ in 0..MAX_RATIO_ITERATIONS {
        let mid = lo + (hi - lo) / 2.0;
        if mid <= lo || mid >= hi {
            return Ok(hi);
        }
        if predicate(mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    Err(GridError::NonConvergent {
        iterations: MAX_RATIO_ITERATIONS,
        residual: (hi - lo) / hi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn domain(min: f64, max: f64) -> AxisDomain {
        AxisDomain::new(min, max).unwrap()
    }

    fn assert_uniform_block(axis: &StretchedAxis, min_width: f64) {
        assert!(!axis.uniform.is_empty());
        for width in axis.widths[axis.uniform.clone()].iter() {
            assert_eq!(*width, min_width);
        }
    }

    #[test]
    fn surplus_budget_stays_uniform() {
        let axis = build_stretched_axis(25.0, domain(-500.0, 500.0), 48, 0.0, None).unwrap();

        assert_relative_eq!(axis.span(), 1000.0, epsilon = 1e-9);
        assert_eq!(axis.origin, -500.0);
        assert_eq!(axis.ratio, 1.0);
        assert_eq!(axis.n_cells(), 40);
        assert_uniform_block(&axis, 25.0);

        let nodes = axis.nodes();
        let center =
            (nodes[axis.uniform.start] + nodes[axis.uniform.end]) / 2.0;
        assert_relative_eq!(center, 0.0, epsilon = 1e-9);

        for (a, b) in axis.widths.iter().zip(axis.widths.iter().rev()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn symmetric_geometric_flanks() {
        let axis = build_stretched_axis(25.0, domain(-500.0, 500.0), 30, 0.0, None).unwrap();

        assert_eq!(axis.n_cells(), 30);
        assert_relative_eq!(axis.span(), 1000.0, epsilon = 1e-9);
        assert_uniform_block(&axis, 25.0);
        assert_eq!(axis.uniform, 14..16);
        assert!(axis.ratio > 1.0);

        // growth on the upper flank (the outermost cell carries the residue)
        let upper = &axis.widths[axis.uniform.end..];
        for pair in upper[..upper.len() - 1].windows(2) {
            assert_relative_eq!(pair[1] / pair[0], axis.ratio, epsilon = 1e-9);
        }
        assert_relative_eq!(upper[0], 25.0 * axis.ratio, epsilon = 1e-9);

        for (a, b) in axis.widths.iter().zip(axis.widths.iter().rev()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn asymmetric_domain() {
        let axis = build_stretched_axis(20.0, domain(-3000.0, 800.0), 40, 100.0, None).unwrap();

        assert_relative_eq!(axis.span(), 3800.0, epsilon = 1e-9);
        assert_uniform_block(&axis, 20.0);
        assert!(axis.widths.iter().all(|w| *w >= 20.0 * (1.0 - 1e-12)));

        let nodes = axis.nodes();
        assert_relative_eq!(nodes[axis.uniform.start], 80.0, epsilon = 1e-9);
        assert_relative_eq!(nodes[axis.uniform.end], 120.0, epsilon = 1e-9);
        assert_relative_eq!(*nodes.last().unwrap(), 800.0, epsilon = 1e-9);
    }

    #[test]
    fn second_anchor_stays_unstretched() {
        let axis =
            build_stretched_axis(10.0, domain(-1000.0, 200.0), 90, -500.0, Some(0.0)).unwrap();

        assert_relative_eq!(axis.span(), 1200.0, epsilon = 1e-9);
        assert_uniform_block(&axis, 10.0);
        assert_eq!(axis.uniform.len(), 50);

        let nodes = axis.nodes();
        assert_relative_eq!(nodes[axis.uniform.start], -500.0, epsilon = 1e-9);
        assert_relative_eq!(nodes[axis.uniform.end], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn anchor_near_edge_shifts_block() {
        let axis = build_stretched_axis(25.0, domain(-500.0, 500.0), 20, 490.0, None).unwrap();

        assert_relative_eq!(axis.span(), 1000.0, epsilon = 1e-9);
        assert_eq!(axis.uniform.end, axis.n_cells());
        assert_uniform_block(&axis, 25.0);
    }

    #[test]
    fn block_covering_domain_is_clipped() {
        let axis = build_stretched_axis(100.0, domain(0.0, 150.0), 10, 75.0, None).unwrap();

        assert_eq!(axis.widths, vec![75.0, 75.0]);
        assert_eq!(axis.ratio, 1.0);
        assert_eq!(axis.uniform, 0..2);
    }

    #[test]
    fn narrow_domain_widens_block() {
        let axis = build_stretched_axis(25.0, domain(-30.0, 40.0), 10, 0.0, None).unwrap();

        assert_eq!(axis.n_cells(), 2);
        assert_relative_eq!(axis.widths[0], 30.0, epsilon = 1e-9);
        assert_relative_eq!(axis.widths[1], 40.0, epsilon = 1e-9);
        assert!(axis.widths.iter().all(|w| *w >= 25.0));
        assert_eq!(axis.ratio, 1.0);
        assert!(axis.uniform.is_empty());

        // the anchor stays on the central node
        assert_relative_eq!(axis.nodes()[1], 0.0, epsilon = 1e-9);

        let mirrored = build_stretched_axis(25.0, domain(-40.0, 30.0), 10, 0.0, None).unwrap();
        assert_relative_eq!(mirrored.widths[0], 40.0, epsilon = 1e-9);
        assert_relative_eq!(mirrored.widths[1], 30.0, epsilon = 1e-9);
    }

    #[test]
    fn no_room_for_a_cell_beside_edge() {
        // the block is pulled inside onto the lower edge, leaving 20 m above it
        let axis = build_stretched_axis(25.0, domain(-10.0, 60.0), 10, 0.0, None).unwrap();

        assert_eq!(axis.n_cells(), 2);
        assert_relative_eq!(axis.widths[0], 25.0, epsilon = 1e-9);
        assert_relative_eq!(axis.widths[1], 45.0, epsilon = 1e-9);
        assert_eq!(axis.uniform, 0..1);
    }

    #[test]
    fn sliver_joins_opposite_flank() {
        let axis = build_stretched_axis(25.0, domain(-40.0, 500.0), 20, 0.0, None).unwrap();

        assert_relative_eq!(axis.span(), 540.0, epsilon = 1e-9);
        assert_eq!(axis.uniform.start, 0);
        assert_uniform_block(&axis, 25.0);
        assert!(axis.widths.iter().all(|w| *w >= 25.0 * (1.0 - 1e-12)));
    }

    #[test]
    fn too_few_cells() {
        match build_stretched_axis(25.0, domain(-500.0, 500.0), 3, 0.0, None) {
            Err(GridError::InsufficientCells {
                required,
                available,
            }) => {
                assert_eq!(required, 4);
                assert_eq!(available, 3);
            }
            other => panic!("expected InsufficientCells, got {:?}", other),
        }
    }

    #[test]
    fn minimal_budget_reaches_edges() {
        let axis = build_stretched_axis(25.0, domain(-500.0, 500.0), 4, 0.0, None).unwrap();
        assert_eq!(axis.n_cells(), 4);
        assert_relative_eq!(axis.widths[0], 475.0, epsilon = 1e-9);
        assert_relative_eq!(axis.span(), 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn anchor_outside_domain() {
        assert!(matches!(
            build_stretched_axis(25.0, domain(-500.0, 500.0), 40, 600.0, None),
            Err(GridError::InvalidParameter(_))
        ));
        assert!(matches!(
            build_stretched_axis(25.0, domain(-500.0, 500.0), 40, 0.0, Some(-501.0)),
            Err(GridError::InvalidParameter(_))
        ));
        assert!(matches!(
            build_stretched_axis(0.0, domain(-500.0, 500.0), 40, 0.0, None),
            Err(GridError::InvalidParameter(_))
        ));
    }

    #[test]
    fn absurd_scale_does_not_converge() {
        assert!(matches!(
            build_stretched_axis(1e-60, domain(-1e4, 1e4), 10, 0.0, None),
            Err(GridError::NonConvergent { .. })
        ));
    }

    #[test]
    fn deterministic() {
        let a = build_stretched_axis(12.5, domain(-7000.0, 2500.0), 64, -300.0, Some(0.0)).unwrap();
        let b = build_stretched_axis(12.5, domain(-7000.0, 2500.0), 64, -300.0, Some(0.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn more_cells_never_steepen() {
        let mut previous = f64::INFINITY;
        for n_cells in 8..80 {
            let axis =
                build_stretched_axis(20.0, domain(-2000.0, 5000.0), n_cells, 300.0, None).unwrap();
            assert!(axis.ratio <= previous);
            previous = axis.ratio;
        }
    }
}
