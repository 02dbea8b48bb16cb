//! The estimator facade: batch learning plus the density and entropy queries
//! derived from the diameter cache.

use rand_xoshiro::Xoshiro256PlusPlus;
use snafu::ensure;
use tracing::debug;

use crate::entropic::EntropicTransform;
use crate::exec::ExecContext;
use crate::geometry::{Geometry, PointsView, Sampler};
use crate::kmeans::online::{self, DiameterMode, UpdateParams, Workspace};
use crate::kmeans::{diameters, ClusterState};
use crate::{
    rng, ConfigError, DiameterLenSnafu, EmptyBatchSnafu, EstimatorConfig, PointDimSnafu,
    ShapeError,
};

/// Numerical floor keeping the density proxy finite on zero-diameter clusters.
const PDF_EPS: f32 = 1e-6;

/// Online k-means density estimator over a pluggable geometry.
///
/// Owns its [`ClusterState`] exclusively; concurrent estimators each hold an
/// independent clone. `learn` mutates, every query borrows immutably, and
/// [`simulate_step`](Self::simulate_step) previews an update without
/// committing it.
#[derive(Debug, Clone)]
pub struct OnlineKmeansEstimator<G> {
    geometry: G,
    exec: ExecContext,
    params: UpdateParams,
    force_sparse: bool,
    entropic: EntropicTransform,
    buffer_size: usize,
    state: ClusterState,
    rng: Xoshiro256PlusPlus,
}

impl<G: Geometry> OnlineKmeansEstimator<G> {
    pub fn new(config: EstimatorConfig, geometry: G, exec: ExecContext) -> Result<Self, ConfigError> {
        Self::build(config, geometry, exec, None)
    }

    /// Like [`new`](Self::new), drawing initial centroids through the ambient
    /// space's own sampler.
    pub fn with_sampler(
        config: EstimatorConfig,
        geometry: G,
        exec: ExecContext,
        sampler: &mut dyn Sampler,
    ) -> Result<Self, ConfigError> {
        Self::build(config, geometry, exec, Some(sampler))
    }

    fn build(
        config: EstimatorConfig,
        geometry: G,
        exec: ExecContext,
        sampler: Option<&mut dyn Sampler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => rng::with_seed(seed),
            None => rng::new(),
        };
        let state = ClusterState::init(&config, &geometry, &exec, &mut rng, sampler)?;
        Ok(Self {
            geometry,
            exec,
            params: UpdateParams {
                learning_rate: config.learning_rate,
                balancing_strength: config.balancing_strength,
                homeostasis: config.homeostasis,
                clip_weighted_distance: config.clip_weighted_distance,
            },
            force_sparse: config.force_sparse,
            entropic: config.entropic,
            buffer_size: config.buffer_size,
            state,
            rng,
        })
    }

    /// Learns from a row-major batch: one shuffled pass, per-point updates.
    pub fn learn(&mut self, states: &[f32]) -> Result<(), ShapeError> {
        self.learn_extra(states, 1, true)
    }

    /// [`learn`](Self::learn) with explicit pass count and shuffling control.
    /// The batch is validated before any centroid is touched; a failed
    /// validation leaves the state unchanged.
    pub fn learn_extra(
        &mut self,
        states: &[f32],
        passes: usize,
        shuffle: bool,
    ) -> Result<(), ShapeError> {
        let points = self.batch_view(states)?;
        let batch = points.len();

        // One pairwise rebuild per pass beats per-point repair once the
        // batch outgrows k, unless the sparse path is forced.
        let mode = if batch <= self.state.k() || self.force_sparse {
            DiameterMode::Sparse
        } else {
            DiameterMode::Pairwise
        };

        let n_pathological = online::apply_batch(
            &mut self.state,
            &self.geometry,
            points,
            &self.params,
            mode,
            &self.exec,
            &mut self.rng,
            shuffle,
            passes,
        );
        self.state.n_pathological = n_pathological;
        let sparse = mode == DiameterMode::Sparse;
        debug!(batch, passes, sparse, n_pathological, "batch learned");
        Ok(())
    }

    /// Weighted nearest-cluster probe: `(index, weighted distance)` under the
    /// same homeostasis-adjusted metric that drives assignment.
    pub fn assign(&self, x: &[f32]) -> Result<(usize, f32), ShapeError> {
        self.check_point(x)?;
        let mut distances = vec![0.0; self.state.k()];
        online::weighted_distances(&self.state, &self.geometry, x, &self.params, &mut distances);
        Ok(online::nearest(&distances))
    }

    /// Voronoi-cell-volume density proxy at `x`: the reciprocal diameter of
    /// the nearest cluster under the raw, unweighted geometry distance.
    pub fn pdf_approx(&self, x: &[f32]) -> Result<f32, ShapeError> {
        self.pdf_against(x, &self.state.diameters)
    }

    /// [`pdf_approx`](Self::pdf_approx) against a caller-provided diameter
    /// vector, e.g. the output of [`simulate_step`](Self::simulate_step).
    pub fn pdf_approx_with(&self, x: &[f32], diameters: &[f32]) -> Result<f32, ShapeError> {
        ensure!(
            diameters.len() == self.state.k(),
            DiameterLenSnafu {
                k: self.state.k(),
                len: diameters.len()
            }
        );
        self.pdf_against(x, diameters)
    }

    fn pdf_against(&self, x: &[f32], diameters: &[f32]) -> Result<f32, ShapeError> {
        self.check_point(x)?;
        let mut distances = vec![0.0; self.state.k()];
        self.geometry.distance(x, self.state.centroids(), &mut distances);
        let (closest, _) = online::nearest(&distances);
        Ok(1.0 / (diameters[closest] + PDF_EPS))
    }

    /// Information content of `x`: the entropic transform of its density.
    pub fn information(&self, x: &[f32]) -> Result<f32, ShapeError> {
        Ok(self.entropic.apply_scalar(self.pdf_approx(x)?))
    }

    /// Lower bound on the state entropy: transformed diameters, summed.
    pub fn entropy_lower_bound(&self) -> f32 {
        self.state
            .diameters
            .iter()
            .map(|&d| self.entropic.apply_scalar(d))
            .sum()
    }

    /// [`entropy_lower_bound`](Self::entropy_lower_bound) against a
    /// caller-provided diameter vector.
    pub fn entropy_lower_bound_with(&self, diameters: &[f32]) -> Result<f32, ShapeError> {
        ensure!(
            diameters.len() == self.state.k(),
            DiameterLenSnafu {
                k: self.state.k(),
                len: diameters.len()
            }
        );
        Ok(diameters.iter().map(|&d| self.entropic.apply_scalar(d)).sum())
    }

    /// Classical k-means cost over precomputed distances. Exposed for
    /// monitoring; never drives the online updates.
    pub fn objective(&self, distances: &[f32]) -> f32 {
        distances.iter().map(|&d| d * d).sum()
    }

    /// Previews the diameter vector that would result from assigning `x`,
    /// without committing anything: only the centroid buffer is copied, and
    /// the sparse path runs in simulation mode.
    pub fn simulate_step(&self, x: &[f32]) -> Result<Vec<f32>, ShapeError> {
        self.check_point(x)?;
        let mut distances = vec![0.0; self.state.k()];
        online::weighted_distances(&self.state, &self.geometry, x, &self.params, &mut distances);
        let (closest, _) = online::nearest(&distances);

        let dim = self.state.dim();
        let eta = self.params.learning_rate / (self.state.cluster_sizes[closest] as f32 + 1.0);
        let mut centroids = self.state.centroids.clone();
        self.geometry.interpolate(
            self.state.centroid(closest),
            x,
            eta,
            &mut centroids[closest * dim..(closest + 1) * dim],
        );

        let preview = diameters::simulate_sparse(
            &self.state,
            &self.geometry,
            closest,
            PointsView::new_unchecked(&centroids, dim),
        );
        Ok(preview.diameters)
    }

    pub fn state(&self) -> &ClusterState {
        &self.state
    }

    pub fn centroids(&self) -> PointsView<'_> {
        self.state.centroids()
    }

    pub fn diameters(&self) -> &[f32] {
        self.state.diameters()
    }

    pub fn cluster_sizes(&self) -> &[u32] {
        self.state.cluster_sizes()
    }

    pub fn n_pathological(&self) -> usize {
        self.state.n_pathological()
    }

    /// Replay-buffer capacity hint carried for the surrounding learner; the
    /// estimator itself never buffers.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn check_point(&self, x: &[f32]) -> Result<(), ShapeError> {
        ensure!(
            x.len() == self.state.dim(),
            PointDimSnafu {
                dim: self.state.dim(),
                len: x.len()
            }
        );
        Ok(())
    }

    fn batch_view<'a>(&self, states: &'a [f32]) -> Result<PointsView<'a>, ShapeError> {
        ensure!(!states.is_empty(), EmptyBatchSnafu);
        PointsView::new(states, self.state.dim())
    }
}
