//! Monotone scalar transforms turning diameters into entropy contributions.

use std::str::FromStr;

use crate::{ConfigError, UnknownEntropicKindSnafu};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EntropicKind {
    /// Shifted logarithm `ln(x + eps)`.
    Log,
    /// `-exp(-x)`, bounded above by zero.
    NegExp,
}

impl FromStr for EntropicKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(Self::Log),
            "neg_exp" => Ok(Self::NegExp),
            _ => Err(UnknownEntropicKindSnafu { name: s }.build()),
        }
    }
}

/// A named monotone transform with an epsilon floor guarding the singularity
/// at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntropicTransform {
    kind: EntropicKind,
    eps: f32,
}

impl EntropicTransform {
    pub const DEFAULT_EPS: f32 = 1e-9;

    pub fn new(kind: EntropicKind, eps: f32) -> Self {
        Self { kind, eps }
    }

    pub fn log(eps: f32) -> Self {
        Self::new(EntropicKind::Log, eps)
    }

    pub fn neg_exp() -> Self {
        Self::new(EntropicKind::NegExp, 0.0)
    }

    pub fn kind(&self) -> EntropicKind {
        self.kind
    }

    pub fn apply_scalar(&self, x: f32) -> f32 {
        match self.kind {
            EntropicKind::Log => (x + self.eps).ln(),
            EntropicKind::NegExp => -(-x).exp(),
        }
    }

    pub fn apply(&self, xs: &[f32]) -> Vec<f32> {
        xs.iter().map(|&x| self.apply_scalar(x)).collect()
    }
}

impl Default for EntropicTransform {
    fn default() -> Self {
        Self::log(Self::DEFAULT_EPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_finite_at_zero() {
        let t = EntropicTransform::default();
        let y = t.apply_scalar(0.0);
        assert!(y.is_finite());
        assert!(y < -10.0);
    }

    #[test]
    fn log_known_value() {
        let t = EntropicTransform::log(0.0);
        assert!((t.apply_scalar(1.0) - 0.0).abs() < 1e-6);
        assert!((t.apply_scalar(std::f32::consts::E) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn transforms_are_monotone() {
        for t in [EntropicTransform::default(), EntropicTransform::neg_exp()] {
            let mut prev = t.apply_scalar(0.0);
            for i in 1..100 {
                let next = t.apply_scalar(i as f32 * 0.1);
                assert!(next > prev, "{t:?} not monotone at step {i}");
                prev = next;
            }
        }
    }

    #[test]
    fn apply_maps_elementwise() {
        let t = EntropicTransform::log(0.0);
        let out = t.apply(&[1.0, std::f32::consts::E]);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn kind_names_parse() {
        assert_eq!("log".parse::<EntropicKind>().unwrap(), EntropicKind::Log);
        assert_eq!(
            "neg_exp".parse::<EntropicKind>().unwrap(),
            EntropicKind::NegExp
        );
        assert!("entropy".parse::<EntropicKind>().is_err());
    }
}
