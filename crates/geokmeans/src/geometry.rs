//! Distance and interpolation primitives for the ambient space.
//!
//! The clustering core never assumes Euclidean structure: every distance and
//! every centroid move goes through a [`Geometry`]. Implementations must be
//! pure and accept batched distance queries, which keeps the hot loop free of
//! per-pair call overhead.

use snafu::ensure;

use crate::{RaggedBatchSnafu, ShapeError};

/// Borrowed row-major view over a set of points, `len x dim`.
#[derive(Debug, Clone, Copy)]
pub struct PointsView<'a> {
    data: &'a [f32],
    dim: usize,
}

impl<'a> PointsView<'a> {
    pub fn new(data: &'a [f32], dim: usize) -> Result<Self, ShapeError> {
        ensure!(
            dim > 0 && data.len() % dim == 0,
            RaggedBatchSnafu {
                len: data.len(),
                dim
            }
        );
        Ok(Self { data, dim })
    }

    pub(crate) fn new_unchecked(data: &'a [f32], dim: usize) -> Self {
        debug_assert!(dim > 0 && data.len() % dim == 0);
        Self { data, dim }
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, i: usize) -> &'a [f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn rows(&self) -> std::slice::ChunksExact<'a, f32> {
        self.data.chunks_exact(self.dim)
    }
}

/// Proper distance and geodesic interpolation for one ambient space.
///
/// `Sync` is a supertrait so a geometry can be shared across the pairwise
/// fan-out without extra bounds at every call site.
pub trait Geometry: Sync {
    /// Distance from `x` to each point of `set`, written into `out`
    /// (`out.len() == set.len()`).
    fn distance(&self, x: &[f32], set: PointsView<'_>, out: &mut [f32]);

    /// Move `a` toward `b` by fraction `t` in `[0, 1]` along the geometry's
    /// path, writing the result into `out`.
    fn interpolate(&self, a: &[f32], b: &[f32], t: f32, out: &mut [f32]);
}

/// Flat ambient space, straight-line paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanGeometry;

impl Geometry for EuclideanGeometry {
    fn distance(&self, x: &[f32], set: PointsView<'_>, out: &mut [f32]) {
        debug_assert_eq!(out.len(), set.len());
        for (o, row) in out.iter_mut().zip(set.rows()) {
            let mut acc = 0.0f32;
            for (&a, &b) in x.iter().zip(row) {
                let d = a - b;
                acc = d.mul_add(d, acc);
            }
            *o = acc.sqrt();
        }
    }

    fn interpolate(&self, a: &[f32], b: &[f32], t: f32, out: &mut [f32]) {
        debug_assert_eq!(a.len(), b.len());
        for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
            *o = x + t * (y - x);
        }
    }
}

/// Initialization-time collaborator: draws points from the ambient space's
/// own distribution. Only consulted when constructing an estimator.
pub trait Sampler {
    /// Row-major `n x dim` draw.
    fn sample(&mut self, n: usize) -> Vec<f32>;

    /// Canonical starting point of the space.
    fn starting_state(&self) -> Vec<f32>;
}
