// Ring packing of sibling circles.
//
// Siblings are laid out on a ring around their parent's local origin:
// 1. Start from the smallest ring that could hold the largest child
// 2. Grow the ring until every neighbouring pair gets enough arc
// 3. Re-center the placed circles on their bounding box
//
// Deterministic: same radii in, same points out.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::entities::Point;

use super::{ceil_to_precision, round_to_precision};

/// How much the ring grows per failed attempt.
pub const RADIUS_STEP: f64 = 1.0;

/// Slack for comparisons against rounded coordinates.
const EPSILON: f64 = 1e-9;

/// Result of packing one parent's children.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedRing {
    /// Local centers, in the same order as the input radii.
    pub centers: Vec<Point>,
    /// Radius of the enclosing parent circle.
    pub parent_radius: f64,
}

/// Pack child circles inside a parent.
///
/// `radii` must be sorted largest first. An empty slice yields an empty ring
/// with a zero radius; callers give leaves their base radius instead.
pub fn pack_children(radii: &[f64], padding: f64, angle_padding: f64) -> PackedRing {
    match radii.len() {
        0 => PackedRing {
            centers: Vec::new(),
            parent_radius: 0.0,
        },
        1 => PackedRing {
            centers: vec![Point::ORIGIN],
            parent_radius: ceil_to_precision(radii[0] + padding),
        },
        n => {
            // Capped so the padding alone can never eat the whole circle.
            let per_gap = (angle_padding.max(0.0) / (n as f64).sqrt()).min(PI / n as f64);
            // Zero-sized children still need a ring to spread along.
            let mut ring = (radii[0] + padding).max(RADIUS_STEP);

            loop {
                if let Some(centers) = try_ring(radii, ring, padding, per_gap) {
                    let parent_radius = enclosing_radius(&centers, radii, padding);
                    return PackedRing {
                        centers,
                        parent_radius,
                    };
                }
                ring += RADIUS_STEP;
            }
        }
    }
}

/// Try to place every child on a ring of radius `ring`.
fn try_ring(radii: &[f64], ring: f64, padding: f64, per_gap: f64) -> Option<Vec<Point>> {
    let n = radii.len();
    let mut gaps = Vec::with_capacity(n);
    let mut total = 0.0;

    // Each neighbouring pair, including last -> first.
    for i in 0..n {
        let half_chord = (radii[i] + radii[(i + 1) % n] + padding) / (2.0 * ring);
        if half_chord.is_nan() || half_chord > 1.0 {
            return None;
        }
        let gap = 2.0 * half_chord.asin() + per_gap;
        total += gap;
        gaps.push(gap);
    }
    if total.is_nan() || total > TAU {
        return None;
    }

    // Center the run of children about the top of the ring.
    let span: f64 = gaps[..n - 1].iter().sum();
    let mut angle = -FRAC_PI_2 - span / 2.0;
    let mut centers = Vec::with_capacity(n);
    for gap in &gaps {
        centers.push(Point::new(ring * angle.cos(), ring * angle.sin()));
        angle += gap;
    }

    recenter(&mut centers, radii);
    for center in centers.iter_mut() {
        center.x = round_to_precision(center.x);
        center.y = round_to_precision(center.y);
    }

    if has_clearance(&centers, radii, padding) {
        Some(centers)
    } else {
        None
    }
}

/// Shift circles so their bounding box is centered on the origin.
fn recenter(centers: &mut [Point], radii: &[f64]) {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for (center, r) in centers.iter().zip(radii) {
        min_x = min_x.min(center.x - r);
        min_y = min_y.min(center.y - r);
        max_x = max_x.max(center.x + r);
        max_y = max_y.max(center.y + r);
    }

    let cx = (min_x + max_x) / 2.0;
    let cy = (min_y + max_y) / 2.0;
    for center in centers.iter_mut() {
        center.x -= cx;
        center.y -= cy;
    }
}

/// Every pair of siblings keeps at least `padding` between their rims.
fn has_clearance(centers: &[Point], radii: &[f64], padding: f64) -> bool {
    for i in 0..centers.len() {
        for j in (i + 1)..centers.len() {
            let needed = radii[i] + radii[j] + padding;
            if centers[i].distance(&centers[j]) + EPSILON < needed {
                return false;
            }
        }
    }
    true
}

fn enclosing_radius(centers: &[Point], radii: &[f64], padding: f64) -> f64 {
    let farthest = centers
        .iter()
        .zip(radii)
        .map(|(center, r)| center.distance(&Point::ORIGIN) + r)
        .fold(0.0, f64::max);
    ceil_to_precision(farthest + padding)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_no_overlap(ring: &PackedRing, radii: &[f64]) {
        for i in 0..radii.len() {
            for j in (i + 1)..radii.len() {
                let d = ring.centers[i].distance(&ring.centers[j]);
                assert!(d + 1e-6 >= radii[i] + radii[j], "children {i} and {j} overlap");
            }
        }
    }

    fn assert_contained(ring: &PackedRing, radii: &[f64]) {
        for (center, r) in ring.centers.iter().zip(radii) {
            assert!(center.distance(&Point::ORIGIN) + r <= ring.parent_radius + 1e-6);
        }
    }

    #[test]
    fn test_single_child_sits_at_origin() {
        let ring = pack_children(&[10.0], 4.0, 0.3);
        assert_eq!(ring.centers, vec![Point::ORIGIN]);
        assert_eq!(ring.parent_radius, 14.0);
    }

    #[test]
    fn test_two_equal_children() {
        let radii = [10.0, 10.0];
        let ring = pack_children(&radii, 4.0, 0.3);
        assert_no_overlap(&ring, &radii);
        assert_contained(&ring, &radii);
        // Re-centering keeps the pair symmetric about the origin.
        let mid_x = (ring.centers[0].x + ring.centers[1].x) / 2.0;
        let mid_y = (ring.centers[0].y + ring.centers[1].y) / 2.0;
        assert!(mid_x.abs() < 0.02 && mid_y.abs() < 0.02);
    }

    #[test]
    fn test_one_large_many_small() {
        let radii = [40.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let ring = pack_children(&radii, 2.0, 0.3);
        assert_no_overlap(&ring, &radii);
        assert_contained(&ring, &radii);
    }

    #[test]
    fn test_zero_padding() {
        let radii = [10.0, 10.0, 10.0];
        let ring = pack_children(&radii, 0.0, 0.0);
        assert_no_overlap(&ring, &radii);
        assert_contained(&ring, &radii);
    }

    #[test]
    fn test_zero_radii_stay_finite() {
        let radii = [0.0, 0.0, 0.0];
        let ring = pack_children(&radii, 0.0, 0.3);
        assert!(ring.centers.iter().all(|c| c.x.is_finite() && c.y.is_finite()));
        assert_ne!(ring.centers[0], ring.centers[1]);
        assert_no_overlap(&ring, &radii);
        assert_contained(&ring, &radii);
    }

    #[test]
    fn test_many_children_terminate() {
        let radii = vec![10.0; 200];
        let ring = pack_children(&radii, 4.0, 5.0);
        assert_eq!(ring.centers.len(), 200);
        assert_no_overlap(&ring, &radii);
    }

    #[test]
    fn test_deterministic() {
        let radii = [22.5, 14.0, 10.0, 10.0];
        assert_eq!(pack_children(&radii, 4.0, 0.3), pack_children(&radii, 4.0, 0.3));
    }
}
