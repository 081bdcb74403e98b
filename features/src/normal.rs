use cylfit_common::{
    feature::Feature,
    point::{Normal3, Point},
    point_cloud::{PointCloud, PointCloudRef},
    search::{SearchType, Searcher},
};
use nalgebra::{convert, RealField, Scalar, Vector3, Vector4};

/// Smallest ratio between the middle and the largest eigenvalue of a
/// neighborhood covariance for the neighborhood to count as a surface.
const PLANARITY_EPSILON: f64 = 1e-6;

/// Surface normals from the covariance of each point's neighborhood.
///
/// The neighborhood of a point is what the searcher returns for it, which
/// includes the point itself. Normals are left unoriented unless a
/// `viewpoint` is set, in which case each one is flipped to face it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NormalEstimation<T: Scalar> {
    pub viewpoint: Option<Vector4<T>>,
}

impl<T: Scalar> Default for NormalEstimation<T> {
    fn default() -> Self {
        NormalEstimation { viewpoint: None }
    }
}

impl<T: Scalar> NormalEstimation<T> {
    pub fn new(viewpoint: Option<Vector4<T>>) -> Self {
        NormalEstimation { viewpoint }
    }
}

impl<T: RealField> NormalEstimation<T> {
    /// The normal and curvature of one neighborhood, or `None` if it has
    /// fewer than 3 finite points or they do not span a plane.
    pub fn estimate<P>(&self, neighborhood: &PointCloudRef<'_, P>) -> Option<(Vector3<T>, T)>
    where
        P: Point<Data = T>,
    {
        let (centroid, cov) = match neighborhood.centroid_and_cov_matrix() {
            (Some(ret), num) if num >= 3 => ret,
            _ => return None,
        };
        let eigen = cov.symmetric_eigen();

        let mut order = [0, 1, 2];
        order.sort_by(|&a, &b| {
            { eigen.eigenvalues[a].partial_cmp(&eigen.eigenvalues[b]) }
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let [min, mid, max] = order.map(|i| eigen.eigenvalues[i].clone());

        if !(max > T::zero())
            || mid <= max.clone() * convert::<f64, T>(PLANARITY_EPSILON)
        {
            return None;
        }

        let normal = eigen.eigenvectors.column(order[0]).normalize();
        let curvature = min.clone() / (min + mid + max);
        let normal = match &self.viewpoint {
            Some(viewpoint) if (viewpoint.xyz() - &centroid).dot(&normal) < T::zero() => -normal,
            _ => normal,
        };
        (normal.iter().all(|x| x.is_finite()) && curvature.is_finite())
            .then_some((normal, curvature))
    }
}

impl<'a, T, I, S> Feature<PointCloud<I>, PointCloud<Normal3<T>>, S, SearchType<T>>
    for NormalEstimation<T>
where
    T: RealField,
    I: Point<Data = T>,
    S: Searcher<'a, T>,
{
    fn compute(
        &self,
        input: &PointCloud<I>,
        search: &S,
        search_param: SearchType<T>,
    ) -> PointCloud<Normal3<T>> {
        let mut result = Vec::new();
        input.map(|point| {
            if !point.is_finite() {
                return Normal3::invalid();
            }
            search.search_exact(point.coords(), search_param.clone(), &mut result);
            match self.estimate(&input.select(&result)) {
                Some((normal, curvature)) => Normal3::new(normal, curvature),
                None => Normal3::invalid(),
            }
        })
    }
}
