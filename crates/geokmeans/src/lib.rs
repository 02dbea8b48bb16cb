//! Online k-means density estimation over pluggable geometries.
//!
//! Centroids track the observed state distribution one point at a time; the
//! distance from each centroid to its nearest neighbor (its "diameter") is
//! maintained incrementally and doubles as a local density proxy, from which
//! pdf and entropy bounds are derived.

use std::str::FromStr;

use snafu::{ensure, Snafu};

pub mod density;
pub mod entropic;
pub mod exec;
pub mod geometry;
pub mod kmeans;
pub mod rng;

pub use density::OnlineKmeansEstimator;
pub use entropic::{EntropicKind, EntropicTransform};
pub use exec::ExecContext;
pub use geometry::{EuclideanGeometry, Geometry, PointsView, Sampler};
pub use kmeans::ClusterState;

pub const DEFAULT_LEARNING_RATE: f32 = 0.1;
pub const DEFAULT_BALANCING_STRENGTH: f32 = 0.1;
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ConfigError {
    #[snafu(display("number of clusters k must be greater than 0"))]
    ZeroClusters,

    #[snafu(display("ambient dimension must be greater than 0"))]
    ZeroDim,

    #[snafu(display("learning rate must be in (0, 1], got {rate}"))]
    LearningRateOutOfRange { rate: f32 },

    #[snafu(display("balancing strength must be non-negative, got {strength}"))]
    NegativeBalancingStrength { strength: f32 },

    #[snafu(display("origin must have length {dim}, got {len}"))]
    OriginShape { dim: usize, len: usize },

    #[snafu(display("buffer size must be greater than 0"))]
    ZeroBufferSize,

    #[snafu(display("unknown initialization method {name:?}"))]
    UnknownInitMethod { name: String },

    #[snafu(display("unknown entropic kind {name:?}"))]
    UnknownEntropicKind { name: String },

    #[snafu(display("sampler returned {len} values, expected {expected}"))]
    SamplerShape { expected: usize, len: usize },

    #[snafu(display("gaussian initialization cannot draw from a sampler"))]
    GaussianSampler,

    #[snafu(display("failed to build worker pool: {source}"))]
    ThreadPool { source: rayon::ThreadPoolBuildError },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ShapeError {
    #[snafu(display("point must have length {dim}, got {len}"))]
    PointDim { dim: usize, len: usize },

    #[snafu(display("batch length {len} is not a multiple of dimension {dim}"))]
    RaggedBatch { len: usize, dim: usize },

    #[snafu(display("batch is empty"))]
    EmptyBatch,

    #[snafu(display("diameter vector must have length {k}, got {len}"))]
    DiameterLen { k: usize, len: usize },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum StateError {
    #[snafu(display("centroid set is empty"))]
    NoCentroids,

    #[snafu(display("centroid buffer length {len} is not a multiple of dimension {dim}"))]
    CentroidShape { len: usize, dim: usize },
}

/// How the initial centroid positions are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum InitMethod {
    /// Uniform in `[-1, 1]^dim`, or drawn from the ambient sampler when one
    /// is supplied.
    #[default]
    Uniform,
    /// Every centroid at the origin (the configured origin, the sampler's
    /// starting state, or zero, in that order of precedence).
    Zeros,
    /// Unit gaussian around the origin, clamped to `[-1, 1]^dim`.
    Gaussian,
}

impl FromStr for InitMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(Self::Uniform),
            "zeros" => Ok(Self::Zeros),
            "gaussian" => Ok(Self::Gaussian),
            _ => Err(UnknownInitMethodSnafu { name: s }.build()),
        }
    }
}

/// Estimator construction parameters. Validated once, at construction; a
/// failed validation leaves no estimator behind.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EstimatorConfig {
    pub k: usize,
    pub dim: usize,
    pub learning_rate: f32,
    pub balancing_strength: f32,
    pub homeostasis: bool,
    pub force_sparse: bool,
    pub init_method: InitMethod,
    pub origin: Option<Vec<f32>>,
    /// Capacity hint for the caller's replay buffer; not consumed here.
    pub buffer_size: usize,
    /// Floor the homeostasis-weighted distances at zero. Off by default:
    /// clamping shifts assignment decisions.
    pub clip_weighted_distance: bool,
    pub seed: Option<u64>,
    pub entropic: EntropicTransform,
}

impl EstimatorConfig {
    pub fn new(k: usize, dim: usize) -> Self {
        Self {
            k,
            dim,
            learning_rate: DEFAULT_LEARNING_RATE,
            balancing_strength: DEFAULT_BALANCING_STRENGTH,
            homeostasis: true,
            force_sparse: true,
            init_method: InitMethod::default(),
            origin: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            clip_weighted_distance: false,
            seed: None,
            entropic: EntropicTransform::default(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        ensure!(self.k > 0, ZeroClustersSnafu);
        ensure!(self.dim > 0, ZeroDimSnafu);
        ensure!(
            self.learning_rate > 0.0 && self.learning_rate <= 1.0,
            LearningRateOutOfRangeSnafu {
                rate: self.learning_rate
            }
        );
        ensure!(
            self.balancing_strength >= 0.0,
            NegativeBalancingStrengthSnafu {
                strength: self.balancing_strength
            }
        );
        if let Some(origin) = &self.origin {
            ensure!(
                origin.len() == self.dim,
                OriginShapeSnafu {
                    dim: self.dim,
                    len: origin.len()
                }
            );
        }
        ensure!(self.buffer_size > 0, ZeroBufferSizeSnafu);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        assert!(EstimatorConfig::new(4, 3).validate().is_ok());
    }

    #[test]
    fn rejects_zero_clusters() {
        let cfg = EstimatorConfig::new(0, 3);
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroClusters)));
    }

    #[test]
    fn rejects_zero_dim() {
        let cfg = EstimatorConfig::new(4, 0);
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroDim)));
    }

    #[test]
    fn rejects_bad_learning_rate() {
        for rate in [0.0, -0.1, 1.5, f32::NAN] {
            let mut cfg = EstimatorConfig::new(4, 3);
            cfg.learning_rate = rate;
            assert!(
                matches!(
                    cfg.validate(),
                    Err(ConfigError::LearningRateOutOfRange { .. })
                ),
                "rate {rate} should be rejected",
            );
        }
    }

    #[test]
    fn rejects_negative_balancing_strength() {
        let mut cfg = EstimatorConfig::new(4, 3);
        cfg.balancing_strength = -0.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NegativeBalancingStrength { .. })
        ));
    }

    #[test]
    fn rejects_misshapen_origin() {
        let mut cfg = EstimatorConfig::new(4, 3);
        cfg.origin = Some(vec![0.0, 0.0]);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OriginShape { dim: 3, len: 2 })
        ));
    }

    #[test]
    fn rejects_zero_buffer() {
        let mut cfg = EstimatorConfig::new(4, 3);
        cfg.buffer_size = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroBufferSize)));
    }

    #[test]
    fn init_method_names_parse() {
        assert_eq!("uniform".parse::<InitMethod>().unwrap(), InitMethod::Uniform);
        assert_eq!("zeros".parse::<InitMethod>().unwrap(), InitMethod::Zeros);
        assert_eq!(
            "gaussian".parse::<InitMethod>().unwrap(),
            InitMethod::Gaussian
        );
        assert!(matches!(
            "kmeans++".parse::<InitMethod>(),
            Err(ConfigError::UnknownInitMethod { .. })
        ));
    }
}
