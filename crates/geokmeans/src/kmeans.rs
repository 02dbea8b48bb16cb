//! Online k-means cluster state.
//!
// References:
// - k-Means Maximum Entropy Exploration (A. Nedergaard, M. Cook)
//   https://arxiv.org/abs/2205.15623
// - Web-Scale K-Means Clustering (D. Sculley)
//   https://dl.acm.org/doi/epdf/10.1145/1772690.1772862

use rand::Rng;
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;
use snafu::ensure;

use crate::exec::ExecContext;
use crate::geometry::{Geometry, PointsView, Sampler};
use crate::{
    CentroidShapeSnafu, ConfigError, EstimatorConfig, GaussianSamplerSnafu, InitMethod,
    NoCentroidsSnafu, SamplerShapeSnafu, StateError,
};

pub mod diameters;
pub mod online;

/// The mutable clustering state: an arena of `k` centroid slots plus the
/// per-slot caches that make single-point updates cheap.
///
/// Slots are identified by index for their entire lifetime; `closest_idx`
/// entries are plain indices into the same arena, so re-targeting a stale
/// neighbor reference is an index rewrite and nothing else.
///
/// Invariant: `diameters[i]` is the minimum distance from centroid `i` to any
/// other centroid, and `closest_idx[i]` names the centroid achieving it. With
/// a single centroid the cache degenerates to `(+inf, i)`.
#[derive(Debug, Clone)]
pub struct ClusterState {
    pub(crate) dim: usize,
    pub(crate) centroids: Vec<f32>,
    pub(crate) cluster_sizes: Vec<u32>,
    pub(crate) diameters: Vec<f32>,
    pub(crate) closest_idx: Vec<usize>,
    pub(crate) n_pathological: usize,
}

impl ClusterState {
    /// Builds a state around caller-provided centroid positions (row-major
    /// `k x dim`), with zeroed sizes and a freshly computed diameter cache.
    pub fn from_parts<G: Geometry>(
        centroids: Vec<f32>,
        dim: usize,
        geometry: &G,
    ) -> Result<Self, StateError> {
        ensure!(!centroids.is_empty(), NoCentroidsSnafu);
        ensure!(
            dim > 0 && centroids.len() % dim == 0,
            CentroidShapeSnafu {
                len: centroids.len(),
                dim
            }
        );
        let k = centroids.len() / dim;
        let mut state = Self {
            dim,
            centroids,
            cluster_sizes: vec![0; k],
            diameters: vec![0.0; k],
            closest_idx: vec![0; k],
            n_pathological: 0,
        };
        diameters::update_pairwise(&mut state, geometry, &ExecContext::sequential());
        Ok(state)
    }

    pub(crate) fn init<G: Geometry>(
        config: &EstimatorConfig,
        geometry: &G,
        exec: &ExecContext,
        rng: &mut Xoshiro256PlusPlus,
        sampler: Option<&mut dyn Sampler>,
    ) -> Result<Self, ConfigError> {
        let (k, dim) = (config.k, config.dim);

        let centroids = match config.init_method {
            InitMethod::Uniform => match sampler {
                Some(s) => {
                    let pts = s.sample(k);
                    ensure!(
                        pts.len() == k * dim,
                        SamplerShapeSnafu {
                            expected: k * dim,
                            len: pts.len()
                        }
                    );
                    pts
                }
                None => (0..k * dim).map(|_| 2.0 * rng.random::<f32>() - 1.0).collect(),
            },
            InitMethod::Zeros => {
                let origin = match (&config.origin, sampler) {
                    (Some(origin), _) => origin.clone(),
                    (None, Some(s)) => {
                        let origin = s.starting_state();
                        ensure!(
                            origin.len() == dim,
                            SamplerShapeSnafu {
                                expected: dim,
                                len: origin.len()
                            }
                        );
                        origin
                    }
                    (None, None) => vec![0.0; dim],
                };
                let mut centroids = Vec::with_capacity(k * dim);
                for _ in 0..k {
                    centroids.extend_from_slice(&origin);
                }
                centroids
            }
            InitMethod::Gaussian => {
                ensure!(sampler.is_none(), GaussianSamplerSnafu);
                let origin = config.origin.clone().unwrap_or_else(|| vec![0.0; dim]);
                let mut centroids = Vec::with_capacity(k * dim);
                for _ in 0..k {
                    for &o in &origin {
                        let z: f32 = rng.sample(StandardNormal);
                        centroids.push((o + z).clamp(-1.0, 1.0));
                    }
                }
                centroids
            }
        };

        let mut state = Self {
            dim,
            centroids,
            cluster_sizes: vec![0; k],
            diameters: vec![0.0; k],
            closest_idx: vec![0; k],
            n_pathological: 0,
        };
        diameters::update_pairwise(&mut state, geometry, exec);
        Ok(state)
    }

    pub fn k(&self) -> usize {
        self.cluster_sizes.len()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn centroids(&self) -> PointsView<'_> {
        PointsView::new_unchecked(&self.centroids, self.dim)
    }

    pub fn centroid(&self, i: usize) -> &[f32] {
        &self.centroids[i * self.dim..(i + 1) * self.dim]
    }

    pub fn cluster_sizes(&self) -> &[u32] {
        &self.cluster_sizes
    }

    pub fn diameters(&self) -> &[f32] {
        &self.diameters
    }

    pub fn closest_idx(&self) -> &[usize] {
        &self.closest_idx
    }

    /// Index-invalidation events seen during the most recent `learn` call.
    pub fn n_pathological(&self) -> usize {
        self.n_pathological
    }
}
