//! Diameter cache maintenance.
//!
//! After a centroid moves, its own nearest-neighbor entry and the entries of
//! centroids that referenced it may be stale. The sparse path repairs exactly
//! those entries in O(k) typical cost; the pairwise path rebuilds the whole
//! cache from the k x k distance matrix and is preferred when a large batch
//! amortizes it.

use rayon::prelude::*;
use tracing::trace;

use crate::exec::ExecContext;
use crate::geometry::{Geometry, PointsView};
use crate::kmeans::ClusterState;

/// Result of a simulated sparse update; the live state is untouched.
#[derive(Debug)]
pub(crate) struct DiameterPreview {
    pub diameters: Vec<f32>,
    pub closest_idx: Vec<usize>,
    #[allow(dead_code)]
    pub n_pathological: usize,
}

/// In-place sparse repair after centroid `moved` changed position.
/// Returns the number of pathological recomputations.
pub(crate) fn update_sparse<G: Geometry>(
    state: &mut ClusterState,
    geometry: &G,
    moved: usize,
    scratch: &mut Vec<f32>,
) -> usize {
    let ClusterState {
        dim,
        centroids,
        diameters,
        closest_idx,
        ..
    } = state;
    let view = PointsView::new_unchecked(centroids, *dim);
    sparse_core(geometry, view, moved, diameters, closest_idx, scratch)
}

/// Sparse repair against a caller-provided centroid buffer, writing to a
/// private copy of the caches. Runs the exact code path of [`update_sparse`],
/// so both modes are observably equivalent.
pub(crate) fn simulate_sparse<G: Geometry>(
    state: &ClusterState,
    geometry: &G,
    moved: usize,
    centroids: PointsView<'_>,
) -> DiameterPreview {
    let mut diameters = state.diameters.clone();
    let mut closest_idx = state.closest_idx.clone();
    let mut scratch = Vec::new();
    let n_pathological = sparse_core(
        geometry,
        centroids,
        moved,
        &mut diameters,
        &mut closest_idx,
        &mut scratch,
    );
    DiameterPreview {
        diameters,
        closest_idx,
        n_pathological,
    }
}

fn sparse_core<G: Geometry>(
    geometry: &G,
    centroids: PointsView<'_>,
    moved: usize,
    diameters: &mut [f32],
    closest_idx: &mut [usize],
    scratch: &mut Vec<f32>,
) -> usize {
    let k = centroids.len();
    if k < 2 {
        diameters[0] = f32::INFINITY;
        closest_idx[0] = 0;
        return 0;
    }

    scratch.resize(k, 0.0);
    geometry.distance(centroids.row(moved), centroids, scratch);
    scratch[moved] = f32::INFINITY;

    // The moved centroid's own cache entry.
    let (idx, min) = argmin(scratch);
    diameters[moved] = min;
    closest_idx[moved] = idx;

    // Centroids the move brought closer than their cached neighbor are
    // tightened onto it; centroids whose cached neighbor *was* the moved one
    // but are not tightened now hold an invalid entry.
    let mut pathological = Vec::new();
    for j in 0..k {
        if j == moved {
            continue;
        }
        if scratch[j] < diameters[j] {
            diameters[j] = scratch[j];
            closest_idx[j] = moved;
        } else if closest_idx[j] == moved {
            pathological.push(j);
        }
    }

    // Full recomputation per invalidated entry. Kept sequential: these are a
    // couple percent of k at worst, below the cost of spawning tasks.
    let n_pathological = pathological.len();
    for j in pathological {
        geometry.distance(centroids.row(j), centroids, scratch);
        scratch[j] = f32::INFINITY;
        let (idx, min) = argmin(scratch);
        diameters[j] = min;
        closest_idx[j] = idx;
    }
    if n_pathological > 0 {
        trace!(n_pathological, moved, "recomputed invalidated diameter entries");
    }
    n_pathological
}

/// Full rebuild: k x k distance matrix, self-distances at +inf, row-wise
/// min/argmin. Row computations fan out through the execution context.
pub(crate) fn update_pairwise<G: Geometry>(
    state: &mut ClusterState,
    geometry: &G,
    exec: &ExecContext,
) {
    let ClusterState {
        dim,
        centroids,
        diameters,
        closest_idx,
        ..
    } = state;
    let view = PointsView::new_unchecked(centroids, *dim);
    let k = view.len();
    if k < 2 {
        diameters[0] = f32::INFINITY;
        closest_idx[0] = 0;
        return;
    }

    if exec.is_parallel() {
        let rows: Vec<(usize, f32)> = exec.install(|| {
            (0..k)
                .into_par_iter()
                .map(|i| {
                    let mut row = vec![0.0f32; k];
                    geometry.distance(view.row(i), view, &mut row);
                    row[i] = f32::INFINITY;
                    argmin(&row)
                })
                .collect()
        });
        for (i, (idx, min)) in rows.into_iter().enumerate() {
            diameters[i] = min;
            closest_idx[i] = idx;
        }
    } else {
        let mut row = vec![0.0f32; k];
        for i in 0..k {
            geometry.distance(view.row(i), view, &mut row);
            row[i] = f32::INFINITY;
            let (idx, min) = argmin(&row);
            diameters[i] = min;
            closest_idx[i] = idx;
        }
    }
}

/// Stable argmin: ties go to the lowest index.
fn argmin(values: &[f32]) -> (usize, f32) {
    let mut best = 0;
    for j in 1..values.len() {
        if values[j] < values[best] {
            best = j;
        }
    }
    (best, values[best])
}
