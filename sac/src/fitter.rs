use cylfit_common::{
    point::{Normal, Point},
    point_cloud::PointCloud,
};
use log::{debug, warn};
use nalgebra::{RealField, Scalar};
use num::ToPrimitive;
use rand::RngCore;

use crate::{
    base::{PcSac, Ransac, SacModel},
    cylinder::{Cylinder, CylinderEstimator, NormalCylinder, Oriented},
    error::{Error, Result},
    refine::LevenbergMarquardt,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CylinderFit<T: Scalar> {
    /// The fitted cylinder, its direction canonicalized.
    pub cylinder: Cylinder<T>,
    /// Indices of the points supporting `cylinder` by the consensus score.
    pub inliers: Vec<usize>,
    /// Whether `cylinder` came out of a successful refinement.
    pub refined: bool,
}

/// RANSAC over oriented points, optionally followed by a
/// Levenberg-Marquardt polish over the consensus inliers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CylinderFitter<T: Scalar> {
    pub estimator: CylinderEstimator<T>,
    pub max_iterations: usize,
    pub distance_threshold: T,
    pub refine: Option<LevenbergMarquardt<T>>,
}

impl<T: RealField + Copy + ToPrimitive> CylinderFitter<T> {
    pub fn fit<P, N, R>(
        &self,
        point_cloud: &PointCloud<P>,
        normals: &PointCloud<N>,
        rng: &mut R,
    ) -> Result<CylinderFit<T>>
    where
        P: Point<Data = T>,
        N: Normal<Data = T>,
        R: RngCore,
    {
        if point_cloud.len() != normals.len() {
            return Err(Error::InvalidInput(format!(
                "{} points but {} normals",
                point_cloud.len(),
                normals.len()
            )));
        }
        if point_cloud.is_empty() {
            return Err(Error::InvalidInput("empty point cloud".into()));
        }

        let threshold = self.distance_threshold.to_f64().unwrap_or(f64::NAN);
        let ransac = Ransac::new(self.max_iterations, threshold, rng);
        let mut sac = PcSac::new(point_cloud, normals, ransac);
        let (model, inliers) = sac.compute(&self.estimator).ok_or(Error::NoModelFound {
            iterations: self.max_iterations,
        })?;
        debug!(
            "fit: consensus radius {:?} with {}/{} inliers",
            model.cylinder.radius,
            inliers.len(),
            point_cloud.len()
        );

        let fallback = CylinderFit {
            cylinder: model.cylinder.canonicalize(),
            inliers,
            refined: false,
        };
        let lm = match &self.refine {
            Some(lm) => lm,
            None => return Ok(fallback),
        };

        let data = sac.data().collect::<Vec<_>>();
        let support = fallback.inliers.iter().map(|&i| data[i]).collect::<Vec<_>>();
        match lm.refine(&self.estimator, &model.cylinder, &support) {
            Ok(refined) => {
                debug!(
                    "fit: refined radius {:?} in {} iterations",
                    refined.cylinder.radius, refined.iterations
                );
                let refined_model = NormalCylinder {
                    cylinder: refined.cylinder.canonicalize(),
                    normal_distance_weight: self.estimator.normal_distance_weight,
                };
                Ok(self.rescore(refined_model, fallback, &data, threshold))
            }
            Err(err) => {
                warn!("fit: refinement failed ({}), keeping the consensus model", err);
                Ok(fallback)
            }
        }
    }

    /// Re-scores every point against the refined model, keeping the
    /// consensus inliers if none survive.
    fn rescore(
        &self,
        model: NormalCylinder<T>,
        fallback: CylinderFit<T>,
        data: &[Oriented<T>],
        threshold: f64,
    ) -> CylinderFit<T> {
        let inliers = model.select_within_distance(data.iter().copied(), threshold);
        let inliers = if inliers.is_empty() {
            warn!("fit: no point supports the refined cylinder, keeping the consensus inliers");
            fallback.inliers
        } else {
            inliers
        };
        CylinderFit {
            cylinder: model.cylinder,
            inliers,
            refined: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;

    use approx::assert_relative_eq;
    use cylfit_common::point::{Normal3, Point3};
    use nalgebra::{vector, Vector3};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    /// A vertical cylinder of radius 0.5 with exact normals and radial
    /// `noise`, plus scattered points without normals.
    fn scene(outliers: usize, noise: f64) -> (PointCloud<Point3<f64>>, PointCloud<Normal3<f64>>) {
        let mut rng = StdRng::seed_from_u64(1);
        let mut points = Vec::new();
        let mut normals = Vec::new();
        for _ in 0..300 {
            let (sin, cos) = rng.gen_range(0.0..TAU).sin_cos();
            let radius = 0.5 + noise * rng.gen_range(-1.0..1.0);
            points.push(Point3::new(radius * cos + 1., radius * sin, rng.gen_range(-1.0..1.0)));
            normals.push(Normal3::new(vector![cos, sin, 0.], 0.));
        }
        for _ in 0..outliers {
            let coords: Vector3<f64> = Vector3::from_fn(|_, _| rng.gen_range(-1.0..1.0));
            points.push(Point3::from(coords * 2.));
            normals.push(Normal3::invalid());
        }
        (PointCloud::from_points(points), PointCloud::from_points(normals))
    }

    fn fitter(refine: bool) -> CylinderFitter<f64> {
        CylinderFitter {
            estimator: CylinderEstimator {
                normal_distance_weight: 0.1,
                min_radius: 0.,
                max_radius: 1.,
            },
            max_iterations: 200,
            distance_threshold: 0.01,
            refine: refine.then(LevenbergMarquardt::default),
        }
    }

    #[test]
    fn test_fit() {
        let (cloud, normals) = scene(50, 0.);
        for refine in [false, true] {
            let mut rng = StdRng::seed_from_u64(5);
            let fit = fitter(refine).fit(&cloud, &normals, &mut rng).unwrap();

            assert_eq!(fit.refined, refine);
            let cylinder = &fit.cylinder;
            assert_relative_eq!(cylinder.radius, 0.5, epsilon = 1e-3);
            assert_relative_eq!(cylinder.direction(), vector![0., 0., 1.], epsilon = 1e-3);
            assert_relative_eq!(cylinder.axis.distance(&vector![1., 0., 0., 1.]), 0., epsilon = 1e-3);
            assert!((0..300).all(|i| fit.inliers.contains(&i)));
        }
    }

    #[test]
    fn test_fit_keeps_consensus_when_refinement_fails() {
        let (cloud, normals) = scene(20, 2e-3);
        let mut stalling = fitter(true);
        stalling.refine = Some(LevenbergMarquardt {
            initial_lambda: 1.,
            max_lambda: 1e-9,
            ..LevenbergMarquardt::default()
        });

        let fit = stalling.fit(&cloud, &normals, &mut StdRng::seed_from_u64(5)).unwrap();
        let consensus = fitter(false).fit(&cloud, &normals, &mut StdRng::seed_from_u64(5)).unwrap();

        assert!(!fit.refined);
        assert_eq!(fit, consensus);
        assert_relative_eq!(fit.cylinder.radius, 0.5, epsilon = 1e-2);
        assert!((0..300).all(|i| fit.inliers.contains(&i)));
    }

    #[test]
    fn test_fit_invalid_input() {
        let (cloud, normals) = scene(0, 0.);
        let mut rng = StdRng::seed_from_u64(0);
        let short = normals.create_sub(&[0, 1]);
        assert!(matches!(
            fitter(false).fit(&cloud, &short, &mut rng),
            Err(Error::InvalidInput(_))
        ));

        let empty = PointCloud::<Point3<f64>>::new();
        let no_normals = PointCloud::<Normal3<f64>>::new();
        assert!(matches!(
            fitter(false).fit(&empty, &no_normals, &mut rng),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fit_out_of_range() {
        let (cloud, normals) = scene(0, 0.);
        let mut rng = StdRng::seed_from_u64(0);
        let mut narrow = fitter(true);
        narrow.estimator.max_radius = 0.2;
        assert_eq!(
            narrow.fit(&cloud, &normals, &mut rng),
            Err(Error::NoModelFound { iterations: 200 })
        );
    }
}
