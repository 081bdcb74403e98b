use cylfit_common::{
    feature::Feature,
    point::Point,
    point_cloud::PointCloud,
    search::SearchType,
};
use cylfit_features::NormalEstimation;
use cylfit_kdtree::KdTree;
use log::{debug, warn};
use nalgebra::{convert, RealField, Rotation3, SVector, Scalar};
use num::ToPrimitive;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use rayon::prelude::*;

use crate::{
    align::CoordinateAligner,
    config::FittingConfig,
    cylinder::{Cylinder, CylinderEstimator},
    error::{Error, Result},
    fitter::CylinderFitter,
    inliers::{HeightEstimator, InlierRefiner},
    refine::LevenbergMarquardt,
};

#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Cylinder,
}

/// The outcome of fitting one shape to one cloud.
#[derive(Debug, Clone)]
pub struct FittingResult<P: Point> {
    coefficients: SVector<P::Data, 8>,
    inlier_ratio: P::Data,
    kind: ShapeKind,
    inliers: PointCloud<P>,
    cylinder: Cylinder<P::Data>,
    rotation: Rotation3<P::Data>,
    remainder: PointCloud<P>,
    candidate_inliers: Vec<usize>,
    refined: bool,
}

impl<P: Point> FittingResult<P> {
    /// `[axis_point.xyz, axis_direction.xyz, radius, height]`.
    ///
    /// The axis point is in the aligned frame, the direction in the frame of
    /// the input cloud.
    #[inline]
    pub fn coefficients(&self) -> &SVector<P::Data, 8> {
        &self.coefficients
    }

    /// The share of the input points lying on the final surface, in `[0, 1]`.
    #[inline]
    pub fn inlier_ratio(&self) -> P::Data {
        self.inlier_ratio.clone()
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// The input points lying on the final surface, in the input frame.
    #[inline]
    pub fn inliers(&self) -> &PointCloud<P> {
        &self.inliers
    }

    pub fn into_inliers(self) -> PointCloud<P> {
        self.inliers
    }

    /// The fitted cylinder in the input frame.
    #[inline]
    pub fn cylinder(&self) -> &Cylinder<P::Data> {
        &self.cylinder
    }

    /// Takes the axis direction onto `+Z`.
    #[inline]
    pub fn rotation(&self) -> &Rotation3<P::Data> {
        &self.rotation
    }

    /// The points outside the consensus set, in the aligned frame.
    #[inline]
    pub fn remainder(&self) -> &PointCloud<P> {
        &self.remainder
    }

    #[inline]
    pub fn candidate_inliers(&self) -> &[usize] {
        &self.candidate_inliers
    }

    #[inline]
    pub fn is_refined(&self) -> bool {
        self.refined
    }

    #[inline]
    pub fn height(&self) -> P::Data {
        self.coefficients[7].clone()
    }
}

pub trait ShapeFitter<P: Point> {
    fn kind(&self) -> ShapeKind;

    fn fit(&self, point_cloud: &PointCloud<P>) -> Result<FittingResult<P>>;
}

/// Normal estimation, RANSAC with optional refinement, alignment of the
/// axis with `+Z` and the final inlier and height estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct CylinderFittingPipeline<T: Scalar> {
    config: FittingConfig<T>,
}

impl<T: RealField + Copy + ToPrimitive> CylinderFittingPipeline<T> {
    pub fn new(config: FittingConfig<T>) -> Result<Self> {
        config.validate()?;
        Ok(CylinderFittingPipeline { config })
    }

    #[inline]
    pub fn config(&self) -> &FittingConfig<T> {
        &self.config
    }

    fn fitter(&self) -> CylinderFitter<T> {
        let config = &self.config;
        CylinderFitter {
            estimator: CylinderEstimator {
                normal_distance_weight: config.normal_distance_weight,
                min_radius: config.min_radius,
                max_radius: config.max_radius,
            },
            max_iterations: config.max_iterations,
            distance_threshold: config.distance_threshold,
            refine: { config.refine }
                .then(|| LevenbergMarquardt::default().with_max_iterations(config.refine_iterations)),
        }
    }

    fn rng(&self, offset: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(offset)),
            None => StdRng::from_entropy(),
        }
    }

    pub fn fit_with_rng<P, R>(&self, point_cloud: &PointCloud<P>, rng: &mut R) -> Result<FittingResult<P>>
    where
        P: Point<Data = T>,
        R: RngCore,
    {
        if point_cloud.is_empty() {
            return Err(Error::InvalidInput("empty point cloud".into()));
        }
        if !point_cloud.iter().any(|point| point.is_finite()) {
            return Err(Error::InvalidInput("no finite point in the cloud".into()));
        }

        let tree = KdTree::new(point_cloud);
        let normals = NormalEstimation::<T>::default().compute(
            point_cloud,
            &tree,
            SearchType::Knn(self.config.k),
        );
        debug!(
            "pipeline: {}/{} valid normals",
            normals.iter().filter(|normal| normal.is_valid()).count(),
            normals.len()
        );

        let fit = self.fitter().fit(point_cloud, &normals, rng)?;
        let cylinder = fit.cylinder;

        let aligner = CoordinateAligner::new(&cylinder.direction());
        let remainder = aligner.remainder(point_cloud, &fit.inliers);
        let axis_point = aligner.rotate_point(&cylinder.point());
        debug!("pipeline: aligned axis point {:?}", axis_point);

        let selected = InlierRefiner::new(self.config.consistency_tolerance).select(point_cloud, &cylinder);
        if selected.is_empty() {
            warn!("pipeline: no point lies on the final cylinder");
        }
        let inliers = point_cloud.create_sub(&selected);
        let inlier_ratio = convert::<f64, T>(selected.len() as f64 / point_cloud.len() as f64);
        let height = HeightEstimator::height(&aligner.align_cloud(&inliers));

        let direction = cylinder.direction();
        let coefficients = SVector::<T, 8>::from([
            axis_point.x,
            axis_point.y,
            axis_point.z,
            direction.x,
            direction.y,
            direction.z,
            cylinder.radius,
            height,
        ]);

        Ok(FittingResult {
            coefficients,
            inlier_ratio,
            kind: ShapeKind::Cylinder,
            inliers,
            cylinder,
            rotation: *aligner.rotation(),
            remainder,
            candidate_inliers: fit.inliers,
            refined: fit.refined,
        })
    }

    /// Fits every cloud independently and in parallel. Cloud `i` draws from
    /// a generator seeded with `seed + i`.
    pub fn fit_batch<P>(&self, point_clouds: &[PointCloud<P>]) -> Vec<Result<FittingResult<P>>>
    where
        T: Send + Sync,
        P: Point<Data = T> + Send + Sync,
    {
        { point_clouds.par_iter().enumerate() }
            .map(|(index, point_cloud)| self.fit_with_rng(point_cloud, &mut self.rng(index as u64)))
            .collect()
    }
}

impl<T, P> ShapeFitter<P> for CylinderFittingPipeline<T>
where
    T: RealField + Copy + ToPrimitive,
    P: Point<Data = T>,
{
    fn kind(&self) -> ShapeKind {
        ShapeKind::Cylinder
    }

    fn fit(&self, point_cloud: &PointCloud<P>) -> Result<FittingResult<P>> {
        self.fit_with_rng(point_cloud, &mut self.rng(0))
    }
}
