//! Page geometry: reading order and nearest-label search

use form_types::BoundingBox;
use std::cmp::Ordering;

use crate::text::TextRun;

/// Tolerance when deciding that a run sits left of or above a field
const EDGE_SLACK: f64 = 1.0;

/// Indices of `positions` in reading order: top edge descending (PDF y grows
/// upward), then left edge ascending. Unpositioned entries follow, in
/// their original order. The sort is stable so equal keys keep input order.
pub fn reading_order(positions: &[Option<BoundingBox>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..positions.len()).collect();
    order.sort_by(|&a, &b| match (&positions[a], &positions[b]) {
        (Some(pa), Some(pb)) => pb.y1.total_cmp(&pa.y1).then(pa.x0.total_cmp(&pb.x0)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    order
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Above,
}

struct Candidate<'r> {
    run: &'r TextRun,
    side: Side,
    distance: f64,
    vertical: f64,
}

impl Candidate<'_> {
    fn rank(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.vertical.total_cmp(&other.vertical))
            .then(self.run.bbox.x0.total_cmp(&other.run.bbox.x0))
    }
}

fn side_of(field: &BoundingBox, run: &BoundingBox) -> Option<Side> {
    if run.x1 <= field.x0 + EDGE_SLACK && run.overlaps_vertically(field) {
        Some(Side::Left)
    } else if run.y0 >= field.y1 - EDGE_SLACK && run.overlaps_horizontally(field) {
        Some(Side::Above)
    } else {
        None
    }
}

/// Closest label for a field among the runs of its page.
///
/// Runs left of the field in the same horizontal band take priority; runs
/// directly above are considered only when no left run is within
/// `max_distance`. Ties go to the smaller vertical offset, then the
/// leftmost run.
pub fn nearest_label<'r>(
    field: &BoundingBox,
    runs: &'r [TextRun],
    max_distance: f64,
) -> Option<&'r TextRun> {
    let candidates: Vec<Candidate<'r>> = runs
        .iter()
        .filter_map(|run| {
            let side = side_of(field, &run.bbox)?;
            let distance = field.distance_to(&run.bbox);
            (distance <= max_distance).then(|| Candidate {
                run,
                side,
                distance,
                vertical: (field.center_y() - run.bbox.center_y()).abs(),
            })
        })
        .collect();

    let best_on = |side: Side| {
        candidates
            .iter()
            .filter(|c| c.side == side)
            .min_by(|a, b| a.rank(b))
            .map(|c| c.run)
    };

    best_on(Side::Left).or_else(|| best_on(Side::Above))
}
