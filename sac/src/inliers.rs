use cylfit_common::{point::Point, point_cloud::PointCloud};
use nalgebra::{convert, RealField, Scalar};

use crate::cylinder::Cylinder;

/// Re-tests a whole cloud against a final cylinder by surface distance
/// alone.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InlierRefiner<T: Scalar> {
    pub tolerance: T,
}

impl<T: RealField> Default for InlierRefiner<T> {
    fn default() -> Self {
        InlierRefiner {
            tolerance: convert(0.01),
        }
    }
}

impl<T: RealField> InlierRefiner<T> {
    pub fn new(tolerance: T) -> Self {
        InlierRefiner { tolerance }
    }

    /// Indices of the finite points within `tolerance` of the surface.
    pub fn select<P>(&self, point_cloud: &PointCloud<P>, cylinder: &Cylinder<T>) -> Vec<usize>
    where
        P: Point<Data = T>,
    {
        { point_cloud.iter().enumerate() }
            .filter(|(_, point)| {
                point.is_finite() && cylinder.distance(point.coords()) < self.tolerance
            })
            .map(|(index, _)| index)
            .collect()
    }
}

pub struct HeightEstimator;

impl HeightEstimator {
    /// The `z` extent of the finite points of an axis-aligned cloud, 0 if
    /// there are none.
    pub fn height<T, P>(aligned: &PointCloud<P>) -> T
    where
        T: RealField,
        P: Point<Data = T>,
    {
        let extent = { aligned.iter().filter(|point| point.is_finite()) }
            .map(|point| point.coords().z.clone())
            .fold(None, |acc: Option<(T, T)>, z| match acc {
                Some((min, max)) => Some((min.min(z.clone()), max.max(z))),
                None => Some((z.clone(), z)),
            });
        extent.map_or_else(T::zero, |(min, max)| max - min)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cylfit_common::point::Point3;
    use nalgebra::vector;

    use super::*;

    #[test]
    fn test_select() {
        let cylinder = Cylinder::new(vector![0., 0., 0.], vector![0., 0., 1.], 1.);
        let cloud: PointCloud<_> = [
            Point3::new(1., 0., 5.),
            Point3::new(0., 1.02, 0.),
            Point3::new(0., -0.995, -3.),
            Point3::new(f64::NAN, 1., 0.),
            Point3::new(0., 0., 0.),
        ]
        .into_iter()
        .collect();

        assert_eq!(InlierRefiner::default().select(&cloud, &cylinder), vec![0, 2]);
        assert_eq!(InlierRefiner::new(0.05).select(&cloud, &cylinder), vec![0, 1, 2]);
    }

    #[test]
    fn test_height() {
        let cloud: PointCloud<_> = [
            Point3::new(1., 0., -0.1),
            Point3::new(0., f64::INFINITY, 9.),
            Point3::new(0., 1., 0.2),
            Point3::new(0., 0., 0.05),
        ]
        .into_iter()
        .collect();
        assert_relative_eq!(HeightEstimator::height(&cloud), 0.3, epsilon = 1e-12);

        let empty = PointCloud::<Point3<f64>>::new();
        assert_eq!(HeightEstimator::height(&empty), 0.);
    }
}
