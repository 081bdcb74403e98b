use nalgebra::{convert, RealField, Scalar};

use crate::error::{Error, Result};

/// Parameters of a [`CylinderFittingPipeline`](crate::CylinderFittingPipeline).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FittingConfig<T: Scalar> {
    /// Weight of the normal deviation in the consensus score, in `[0, 1]`.
    pub normal_distance_weight: T,
    pub max_iterations: usize,
    /// Consensus score below which a point supports a candidate.
    pub distance_threshold: T,
    pub min_radius: T,
    pub max_radius: T,
    /// Whether to polish the consensus model by nonlinear least squares.
    pub refine: bool,
    /// Neighborhood size for normal estimation.
    pub k: usize,
    /// Surface distance below which a point counts toward the final inliers.
    pub consistency_tolerance: T,
    pub refine_iterations: usize,
    /// Seed of the per-call random source; fresh entropy if `None`.
    pub seed: Option<u64>,
}

impl<T: RealField> Default for FittingConfig<T> {
    fn default() -> Self {
        FittingConfig {
            normal_distance_weight: convert(0.1),
            max_iterations: 10000,
            distance_threshold: convert(0.05),
            min_radius: T::zero(),
            max_radius: convert(0.1),
            refine: true,
            k: 50,
            consistency_tolerance: convert(0.01),
            refine_iterations: 50,
            seed: None,
        }
    }
}

impl<T: RealField> FittingConfig<T> {
    pub fn with_normal_distance_weight(mut self, weight: T) -> Self {
        self.normal_distance_weight = weight;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_distance_threshold(mut self, threshold: T) -> Self {
        self.distance_threshold = threshold;
        self
    }

    pub fn with_radius_limits(mut self, min_radius: T, max_radius: T) -> Self {
        self.min_radius = min_radius;
        self.max_radius = max_radius;
        self
    }

    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_consistency_tolerance(mut self, tolerance: T) -> Self {
        self.consistency_tolerance = tolerance;
        self
    }

    pub fn with_refine_iterations(mut self, iterations: usize) -> Self {
        self.refine_iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(Error::InvalidConfig(message));

        if self.k < 3 {
            return fail(format!("k = {} is too small to estimate normals", self.k));
        }
        if !(self.min_radius >= T::zero()) || !(self.min_radius <= self.max_radius) {
            return fail(format!(
                "radius limits [{:?}, {:?}] are empty",
                self.min_radius, self.max_radius
            ));
        }
        if !(self.distance_threshold > T::zero()) || !(self.consistency_tolerance > T::zero()) {
            return fail("thresholds must be positive".into());
        }
        if !(self.normal_distance_weight >= T::zero() && self.normal_distance_weight <= T::one()) {
            return fail(format!(
                "normal distance weight {:?} is outside [0, 1]",
                self.normal_distance_weight
            ));
        }
        Ok(())
    }
}
