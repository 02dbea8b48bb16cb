//! Single-point and batch online updates.
//!
//! Updates are inherently sequential: each point's assignment depends on the
//! centroid positions left behind by the previous point, so a batch is a
//! randomized permutation replayed one point at a time.

use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::exec::ExecContext;
use crate::geometry::{Geometry, PointsView};
use crate::kmeans::{diameters, ClusterState};

#[derive(Debug, Clone, Copy)]
pub(crate) struct UpdateParams {
    pub learning_rate: f32,
    pub balancing_strength: f32,
    pub homeostasis: bool,
    pub clip_weighted_distance: bool,
}

/// Reusable buffers for the per-point hot loop.
#[derive(Debug, Default)]
pub(crate) struct Workspace {
    pub distances: Vec<f32>,
    pub position: Vec<f32>,
}

/// Which maintenance path a batch runs after centroid moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DiameterMode {
    /// Incremental update after every point.
    Sparse,
    /// One full recomputation at the end of each pass.
    Pairwise,
}

/// Distance from `point` to every centroid, plus the homeostasis penalty
/// `balancing_strength * (size_i - mean_size)` when enabled. The penalty is
/// omitted entirely when homeostasis is off, so `balancing_strength = 0`
/// reproduces the unweighted assignment bit for bit.
pub(crate) fn weighted_distances<G: Geometry>(
    state: &ClusterState,
    geometry: &G,
    point: &[f32],
    params: &UpdateParams,
    out: &mut [f32],
) {
    geometry.distance(point, state.centroids(), out);
    if params.homeostasis {
        let mean = state.cluster_sizes.iter().sum::<u32>() as f32 / state.k() as f32;
        for (d, &n) in out.iter_mut().zip(&state.cluster_sizes) {
            *d += params.balancing_strength * (n as f32 - mean);
        }
        if params.clip_weighted_distance {
            for d in out.iter_mut() {
                *d = d.max(0.0);
            }
        }
    }
}

/// Stable argmin: ties go to the lowest index.
pub(crate) fn nearest(distances: &[f32]) -> (usize, f32) {
    let mut best = 0;
    for j in 1..distances.len() {
        if distances[j] < distances[best] {
            best = j;
        }
    }
    (best, distances[best])
}

/// Applies one observed point: weighted assignment, centroid interpolation
/// with the decaying step `learning_rate / (n_i + 1)`, size increment.
/// Returns the assigned slot so the caller can drive diameter maintenance.
pub(crate) fn apply_one<G: Geometry>(
    state: &mut ClusterState,
    geometry: &G,
    point: &[f32],
    params: &UpdateParams,
    ws: &mut Workspace,
) -> usize {
    let k = state.k();
    let dim = state.dim();
    ws.distances.resize(k, 0.0);
    weighted_distances(state, geometry, point, params, &mut ws.distances);
    let (closest, _) = nearest(&ws.distances);

    let eta = params.learning_rate / (state.cluster_sizes[closest] as f32 + 1.0);
    ws.position.resize(dim, 0.0);
    geometry.interpolate(state.centroid(closest), point, eta, &mut ws.position);
    state.centroids[closest * dim..(closest + 1) * dim].copy_from_slice(&ws.position);
    state.cluster_sizes[closest] += 1;
    closest
}

/// Replays `points` against the state, `passes` times. The permutation is
/// drawn once and reused across passes. Returns the total number of
/// pathological diameter recomputations (zero on the pairwise path).
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_batch<G: Geometry>(
    state: &mut ClusterState,
    geometry: &G,
    points: PointsView<'_>,
    params: &UpdateParams,
    mode: DiameterMode,
    exec: &ExecContext,
    rng: &mut Xoshiro256PlusPlus,
    shuffle: bool,
    passes: usize,
) -> usize {
    let mut order: Vec<usize> = (0..points.len()).collect();
    if shuffle {
        order.shuffle(rng);
    }

    let mut ws = Workspace::default();
    let mut n_pathological = 0;
    for _ in 0..passes {
        match mode {
            DiameterMode::Sparse => {
                for &i in &order {
                    let moved = apply_one(state, geometry, points.row(i), params, &mut ws);
                    n_pathological +=
                        diameters::update_sparse(state, geometry, moved, &mut ws.distances);
                }
            }
            DiameterMode::Pairwise => {
                for &i in &order {
                    apply_one(state, geometry, points.row(i), params, &mut ws);
                }
                diameters::update_pairwise(state, geometry, exec);
            }
        }
    }
    n_pathological
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EuclideanGeometry;
    use pretty_assertions::assert_eq;

    const PARAMS: UpdateParams = UpdateParams {
        learning_rate: 0.5,
        balancing_strength: 0.1,
        homeostasis: false,
        clip_weighted_distance: false,
    };

    fn three_clusters() -> ClusterState {
        ClusterState::from_parts(vec![0.0, 5.0, 10.0], 1, &EuclideanGeometry).unwrap()
    }

    #[test]
    fn nearest_breaks_ties_low() {
        assert_eq!(nearest(&[1.0, 0.5, 0.5, 2.0]), (1, 0.5));
        assert_eq!(nearest(&[0.5, 0.5]), (0, 0.5));
    }

    #[test]
    fn homeostasis_penalizes_large_clusters() {
        let mut state = three_clusters();
        state.cluster_sizes = vec![30, 0, 0]; // mean 10
        let params = UpdateParams {
            homeostasis: true,
            ..PARAMS
        };
        let mut out = vec![0.0; 3];
        // Equidistant from centroids 0 and 1; the loaded cluster loses.
        weighted_distances(&state, &EuclideanGeometry, &[2.5], &params, &mut out);
        assert!((out[0] - (2.5 + 0.1 * 20.0)).abs() < 1e-6);
        assert!((out[1] - (2.5 - 0.1 * 10.0)).abs() < 1e-6);
        assert_eq!(nearest(&out).0, 1);
    }

    #[test]
    fn weighted_distance_is_unclamped_by_default() {
        let mut state = three_clusters();
        state.cluster_sizes = vec![0, 0, 300]; // mean 100
        let params = UpdateParams {
            homeostasis: true,
            ..PARAMS
        };
        let mut out = vec![0.0; 3];
        weighted_distances(&state, &EuclideanGeometry, &[0.0], &params, &mut out);
        // Underloaded cluster 1: 5.0 + 0.1 * (0 - 100) = -5.0
        assert!((out[1] + 5.0).abs() < 1e-5);

        let clipped = UpdateParams {
            clip_weighted_distance: true,
            ..params
        };
        weighted_distances(&state, &EuclideanGeometry, &[0.0], &clipped, &mut out);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn apply_one_moves_by_decaying_step() {
        let mut state = three_clusters();
        let mut ws = Workspace::default();

        // First point: size 0, step = 0.5 / 1.
        let idx = apply_one(&mut state, &EuclideanGeometry, &[1.0], &PARAMS, &mut ws);
        assert_eq!(idx, 0);
        assert!((state.centroid(0)[0] - 0.5).abs() < 1e-6);
        assert_eq!(state.cluster_sizes[0], 1);

        // Second point to the same cluster: step = 0.5 / 2.
        apply_one(&mut state, &EuclideanGeometry, &[1.0], &PARAMS, &mut ws);
        let expected = 0.5 + 0.25 * (1.0 - 0.5);
        assert!((state.centroid(0)[0] - expected).abs() < 1e-6);
        assert_eq!(state.cluster_sizes[0], 2);
    }

    #[test]
    fn batch_counts_every_point_once() {
        let mut state = three_clusters();
        let points = [0.1f32, 0.2, 4.9, 5.1, 9.9, 10.1];
        let view = PointsView::new(&points, 1).unwrap();
        let mut rng = crate::rng::new();
        apply_batch(
            &mut state,
            &EuclideanGeometry,
            view,
            &PARAMS,
            DiameterMode::Sparse,
            &ExecContext::sequential(),
            &mut rng,
            true,
            1,
        );
        assert_eq!(state.cluster_sizes.iter().sum::<u32>(), 6);
        assert_eq!(state.cluster_sizes, vec![2, 2, 2]);
    }

    #[test]
    fn passes_replay_the_batch() {
        let mut state = three_clusters();
        let points = [0.1f32, 5.1];
        let view = PointsView::new(&points, 1).unwrap();
        let mut rng = crate::rng::new();
        apply_batch(
            &mut state,
            &EuclideanGeometry,
            view,
            &PARAMS,
            DiameterMode::Sparse,
            &ExecContext::sequential(),
            &mut rng,
            false,
            3,
        );
        assert_eq!(state.cluster_sizes.iter().sum::<u32>(), 6);
    }
}
