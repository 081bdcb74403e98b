use cylfit_common::{point::Point, point_cloud::PointCloud};
use log::{debug, warn};
use nalgebra::{convert, RealField, Rotation3, Scalar, Unit, Vector3};

/// Below this `‖direction × up‖` the axis already counts as aligned.
const PARALLEL_EPSILON: f64 = 1e-6;

/// The rotation taking a cylinder axis onto the up direction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CoordinateAligner<T: Scalar> {
    rotation: Rotation3<T>,
}

impl<T: RealField> CoordinateAligner<T> {
    /// Aligns `direction` with `+Z`.
    pub fn new(direction: &Vector3<T>) -> Self {
        Self::with_up(direction, &Vector3::z())
    }

    /// Rotates about `direction × up` by the angle between the two. Parallel,
    /// antiparallel or degenerate inputs give the identity.
    pub fn with_up(direction: &Vector3<T>, up: &Vector3<T>) -> Self {
        let (direction, up) = (direction.normalize(), up.normalize());
        let axis = direction.cross(&up);
        let norm = axis.norm();

        if !(norm >= convert::<f64, T>(PARALLEL_EPSILON)) {
            debug!("align: axis is parallel to up, using the identity");
            return CoordinateAligner {
                rotation: Rotation3::identity(),
            };
        }

        let angle = direction.dot(&up).clamp(-T::one(), T::one()).acos();
        let rotation = Rotation3::from_axis_angle(&Unit::new_unchecked(axis / norm), angle);
        CoordinateAligner { rotation }
    }

    #[inline]
    pub fn rotation(&self) -> &Rotation3<T> {
        &self.rotation
    }

    /// Rotates `point` as a vector; no translation is involved.
    #[inline]
    pub fn rotate_point(&self, point: &Vector3<T>) -> Vector3<T> {
        &self.rotation * point
    }

    pub fn align_cloud<P>(&self, point_cloud: &PointCloud<P>) -> PointCloud<P>
    where
        P: Point<Data = T>,
    {
        point_cloud.transformed(&self.rotation)
    }

    /// The points not in `inliers`, in the aligned frame.
    pub fn remainder<P>(&self, point_cloud: &PointCloud<P>, inliers: &[usize]) -> PointCloud<P>
    where
        P: Point<Data = T>,
    {
        let remainder = point_cloud.extract(inliers, true);
        if remainder.is_empty() {
            warn!("align: every point supports the cylinder, the remainder is empty");
        }
        self.align_cloud(&remainder)
    }
}
