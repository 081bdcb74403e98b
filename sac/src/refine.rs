use nalgebra::{convert, Const, DVector, Dyn, OMatrix, RealField, SMatrix, SVector, Scalar, Vector3};
use thiserror::Error;

use crate::cylinder::{Cylinder, CylinderEstimator, NormalCylinder, Oriented};

/// `[point.xyz, direction.xyz, radius]`
const NUM_PARAMS: usize = 7;

type Params<T> = SVector<T, NUM_PARAMS>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum RefinementError {
    #[error("{0} inliers cannot constrain a cylinder")]
    TooFewInliers(usize),
    #[error("cost or parameters became non-finite")]
    NonFinite,
    #[error("damping exceeded its bound before the cost improved")]
    Stalled,
    #[error("refined radius left its bounds")]
    RadiusOutOfBounds,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Refined<T: Scalar> {
    pub cylinder: Cylinder<T>,
    pub iterations: usize,
    /// Sum of squared residuals at `cylinder`.
    pub cost: T,
}

/// Damped least squares over the consensus scores of [`NormalCylinder::score`].
///
/// The Jacobian is taken by forward differences. The direction is
/// renormalized after every accepted step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LevenbergMarquardt<T> {
    pub max_iterations: usize,
    pub initial_lambda: T,
    /// λ is divided by this on an accepted step and multiplied on a rejected one.
    pub lambda_factor: T,
    pub min_lambda: T,
    /// Giving up once λ grows past this.
    pub max_lambda: T,
    /// Stops once the cost, the gradient norm or the relative cost decrease
    /// falls below this.
    pub convergence_threshold: T,
}

impl<T: RealField + Copy> Default for LevenbergMarquardt<T> {
    fn default() -> Self {
        LevenbergMarquardt {
            max_iterations: 50,
            initial_lambda: convert(1e-3),
            lambda_factor: convert(10.),
            min_lambda: convert(1e-7),
            max_lambda: convert(1e7),
            convergence_threshold: convert(1e-10),
        }
    }
}

enum Step<T> {
    Accepted {
        params: Params<T>,
        residuals: Vec<T>,
        cost: T,
    },
    Exhausted,
}

impl<T: RealField + Copy> LevenbergMarquardt<T> {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Refines `initial` against `data`, scoring with the weight of
    /// `estimator` and checking the result against its radius bounds.
    pub fn refine(
        &self,
        estimator: &CylinderEstimator<T>,
        initial: &Cylinder<T>,
        data: &[Oriented<T>],
    ) -> Result<Refined<T>, RefinementError> {
        if data.len() < NUM_PARAMS {
            return Err(RefinementError::TooFewInliers(data.len()));
        }
        let weight = estimator.normal_distance_weight;

        let mut params = initial.coefficients();
        let mut residuals = residuals(&params, weight, data).ok_or(RefinementError::NonFinite)?;
        let mut cost = squared_sum(&residuals);
        let mut lambda = self.initial_lambda;
        let mut accepted = 0;
        let mut iterations = 0;

        while iterations < self.max_iterations && cost > self.convergence_threshold {
            iterations += 1;
            let (jtj, jtr) =
                normal_equations(&params, &residuals, weight, data).ok_or(RefinementError::NonFinite)?;
            if jtr.norm() <= self.convergence_threshold {
                break;
            }

            match self.damped_step(&jtj, &jtr, &params, cost, &mut lambda, weight, data) {
                Step::Exhausted if accepted == 0 => return Err(RefinementError::Stalled),
                Step::Exhausted => break,
                Step::Accepted {
                    params: next,
                    residuals: next_residuals,
                    cost: next_cost,
                } => {
                    accepted += 1;
                    let decrease = cost - next_cost;
                    params = next;
                    residuals = next_residuals;
                    cost = next_cost;
                    if decrease <= self.convergence_threshold * cost {
                        break;
                    }
                }
            }
        }

        let cylinder = cylinder(&params);
        if !cylinder.is_finite() || !cost.is_finite() {
            return Err(RefinementError::NonFinite);
        }
        if !estimator.accepts_radius(&cylinder.radius) {
            return Err(RefinementError::RadiusOutOfBounds);
        }
        Ok(Refined {
            cylinder,
            iterations,
            cost,
        })
    }

    /// Raises λ until a step lowers the cost, or until λ passes its bound.
    #[allow(clippy::too_many_arguments)]
    fn damped_step(
        &self,
        jtj: &SMatrix<T, NUM_PARAMS, NUM_PARAMS>,
        jtr: &Params<T>,
        params: &Params<T>,
        cost: T,
        lambda: &mut T,
        weight: T,
        data: &[Oriented<T>],
    ) -> Step<T> {
        while *lambda <= self.max_lambda {
            let mut damped = *jtj;
            for i in 0..NUM_PARAMS {
                damped[(i, i)] += *lambda * (T::one() + jtj[(i, i)]);
            }

            let candidate = { damped.cholesky() }
                .map(|cholesky| normalized(params + cholesky.solve(&(-*jtr))))
                .and_then(|candidate| Some((candidate, residuals(&candidate, weight, data)?)));
            if let Some((candidate, residuals)) = candidate {
                let next_cost = squared_sum(&residuals);
                if next_cost < cost {
                    *lambda = (*lambda / self.lambda_factor).max(self.min_lambda);
                    return Step::Accepted {
                        params: candidate,
                        residuals,
                        cost: next_cost,
                    };
                }
            }
            *lambda *= self.lambda_factor;
        }
        Step::Exhausted
    }
}

fn cylinder<T: RealField + Copy>(params: &Params<T>) -> Cylinder<T> {
    Cylinder::new(
        Vector3::new(params[0], params[1], params[2]),
        Vector3::new(params[3], params[4], params[5]),
        params[6],
    )
}

fn normalized<T: RealField + Copy>(mut params: Params<T>) -> Params<T> {
    let direction = params.fixed_rows::<3>(3).normalize();
    params.fixed_rows_mut::<3>(3).copy_from(&direction);
    params
}

fn residuals<T: RealField + Copy>(params: &Params<T>, weight: T, data: &[Oriented<T>]) -> Option<Vec<T>> {
    let model = NormalCylinder {
        cylinder: cylinder(params),
        normal_distance_weight: weight,
    };
    let residuals = data.iter().map(|item| model.score(item)).collect::<Vec<_>>();
    residuals.iter().all(|r| r.is_finite()).then_some(residuals)
}

fn squared_sum<T: RealField + Copy>(residuals: &[T]) -> T {
    residuals.iter().fold(T::zero(), |acc, &r| acc + r * r)
}

/// `JᵀJ` and `Jᵀr` at `params`, with `J` by forward differences.
fn normal_equations<T: RealField + Copy>(
    params: &Params<T>,
    residuals: &[T],
    weight: T,
    data: &[Oriented<T>],
) -> Option<(SMatrix<T, NUM_PARAMS, NUM_PARAMS>, Params<T>)> {
    let epsilon = T::default_epsilon().sqrt();
    let mut jacobian =
        OMatrix::<T, Dyn, Const<NUM_PARAMS>>::zeros_generic(Dyn(data.len()), Const::<NUM_PARAMS>);

    for j in 0..NUM_PARAMS {
        let step = epsilon * params[j].abs().max(T::one());
        let mut shifted = *params;
        shifted[j] += step;

        let shifted = self::residuals(&shifted, weight, data)?;
        for (i, (&a, &b)) in shifted.iter().zip(residuals).enumerate() {
            jacobian[(i, j)] = (a - b) / step;
        }
    }

    let residuals = DVector::from_column_slice(residuals);
    Some((jacobian.tr_mul(&jacobian), jacobian.tr_mul(&residuals)))
}
