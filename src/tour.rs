/// Visit ordering.
///
/// Greedy nearest-neighbour over rectangle centroids, starting at the
/// machine origin. O(n²), which is fine for a board's worth of pads; the
/// goal is less travel, not an optimal tour.
use crate::geometry::{Rect, Vec2};

/// Order `rects` to reduce travel between consecutive cuts.
///
/// Returns a permutation of `0..rects.len()`. Equal distances resolve to
/// the rectangle that came first in the input, so identical input always
/// gives an identical order.
pub fn plan_tour(rects: &[Rect]) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..rects.len()).collect();
    let mut order = Vec::with_capacity(rects.len());
    let mut current = Vec2::ORIGIN;

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (slot, &idx) in remaining.iter().enumerate() {
            let d = Vec2::dist_sq(current, rects[idx].centroid());
            // strict: the earliest candidate keeps a tie
            if d < best_dist {
                best = slot;
                best_dist = d;
            }
        }
        // `remove` keeps the survivors in input order for the tie rule
        let idx = remaining.remove(best);
        current = rects[idx].centroid();
        order.push(idx);
    }
    order
}

/// Total centroid-to-centroid travel for `order`, starting at the origin.
pub fn travel_distance(rects: &[Rect], order: &[usize]) -> f64 {
    order
        .iter()
        .scan(Vec2::ORIGIN, |pos, &idx| {
            let next = rects[idx].centroid();
            let d = Vec2::dist(*pos, next);
            *pos = next;
            Some(d)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit(x: f64, y: f64) -> Rect {
        Rect::new(x, y, 1.0, 1.0)
    }

    #[test]
    fn test_empty() {
        assert!(plan_tour(&[]).is_empty());
        assert_eq!(travel_distance(&[], &[]), 0.0);
    }

    #[test]
    fn test_single() {
        assert_eq!(plan_tour(&[unit(5.0, 5.0)]), vec![0]);
    }

    #[test]
    fn test_nearest_first() {
        // listed far to near; visited near to far
        let rects = [unit(20.0, 0.0), unit(10.0, 0.0), unit(0.0, 0.0)];
        assert_eq!(plan_tour(&rects), vec![2, 1, 0]);
    }

    #[test]
    fn test_tie_keeps_input_order() {
        // both centroids are equidistant from the origin
        let rects = [unit(-3.5, -0.5), unit(2.5, -0.5)];
        assert_eq!(plan_tour(&rects), vec![0, 1]);
        let swapped = [rects[1], rects[0]];
        assert_eq!(plan_tour(&swapped), vec![0, 1]);
    }

    #[test]
    fn test_greedy_beats_input_order() {
        let rects = [
            unit(0.0, 0.0),
            unit(50.0, 0.0),
            unit(1.0, 0.0),
            unit(51.0, 0.0),
        ];
        let order = plan_tour(&rects);
        assert_eq!(order, vec![0, 2, 1, 3]);
        let identity = [0, 1, 2, 3];
        assert!(travel_distance(&rects, &order) < travel_distance(&rects, &identity));
    }

    #[test]
    fn test_travel_distance() {
        let rects = [unit(2.5, 3.5)];
        // centroid (3, 4) is 5 from the origin
        assert!((travel_distance(&rects, &[0]) - 5.0).abs() < 1e-12);
    }

    /// Unit squares on a small integer grid, so equal distances are common.
    fn grid_rects() -> impl Strategy<Value = Vec<Rect>> {
        prop::collection::vec(
            (-3i32..3, -3i32..3).prop_map(|(x, y)| unit(f64::from(x), f64::from(y))),
            0..16,
        )
    }

    fn scattered_rects() -> impl Strategy<Value = Vec<Rect>> {
        prop::collection::vec(
            (-10.0f64..10.0, -10.0f64..10.0, 0.1f64..2.0, 0.1f64..2.0)
                .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h)),
            0..24,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_tour_is_permutation(rects in scattered_rects()) {
            let mut order = plan_tour(&rects);
            order.sort_unstable();
            prop_assert_eq!(order, (0..rects.len()).collect::<Vec<_>>());
        }

        #[test]
        fn prop_tour_is_deterministic(rects in grid_rects()) {
            prop_assert_eq!(plan_tour(&rects), plan_tour(&rects));
        }

        #[test]
        fn prop_each_stop_is_nearest_remaining(rects in grid_rects()) {
            let order = plan_tour(&rects);
            let mut remaining: Vec<usize> = (0..rects.len()).collect();
            let mut current = Vec2::ORIGIN;
            for &idx in &order {
                let d = Vec2::dist_sq(current, rects[idx].centroid());
                for &other in &remaining {
                    let d_other = Vec2::dist_sq(current, rects[other].centroid());
                    // strictly nearer, or as near and extracted no later
                    prop_assert!(d < d_other || (d == d_other && idx <= other));
                }
                remaining.retain(|&i| i != idx);
                current = rects[idx].centroid();
            }
            prop_assert!(remaining.is_empty());
        }
    }
}
