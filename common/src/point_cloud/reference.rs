use std::ops::Index;

use nalgebra::{Matrix3, RealField, Vector3};

use super::PointCloud;
use crate::point::Point;

/// A borrowed view of a cloud, optionally restricted to some indices.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudRef<'a, P> {
    inner: &'a PointCloud<P>,
    indices: Option<&'a [usize]>,
}

impl<'a, P> PointCloudRef<'a, P> {
    #[inline]
    pub fn new(inner: &'a PointCloud<P>, indices: Option<&'a [usize]>) -> Self {
        PointCloudRef { inner, indices }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self.indices {
            Some(indices) => indices.len(),
            None => self.inner.len(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a P> + Clone + 'a {
        let inner = self.inner;
        let indices = self.indices;
        let len = self.len();
        (0..len).map(move |i| match indices {
            Some(indices) => &inner[indices[i]],
            None => &inner[i],
        })
    }
}

impl<'a, P: Point> PointCloudRef<'a, P>
where
    P::Data: RealField,
{
    /// The mean of the finite points and how many there were.
    pub fn centroid_coords(&self) -> (Option<Vector3<P::Data>>, usize) {
        let (acc, num) = { self.iter() }
            .filter(|point| point.is_finite())
            .fold((Vector3::zeros(), 0usize), |(acc, num), point| {
                (acc + point.coords().xyz(), num + 1)
            });

        let ret = (num > 0).then(|| acc / nalgebra::convert::<f64, P::Data>(num as f64));
        (ret, num)
    }

    /// The covariance of the finite points about `centroid`, normalized by
    /// their count.
    pub fn cov_matrix(&self, centroid: &Vector3<P::Data>) -> (Option<Matrix3<P::Data>>, usize) {
        let (acc, num) = { self.iter() }
            .filter(|point| point.is_finite())
            .fold((Matrix3::zeros(), 0usize), |(mut acc, num), point| {
                let d = point.coords().xyz() - centroid;
                acc.ger(nalgebra::one(), &d, &d, nalgebra::one());
                (acc, num + 1)
            });

        let ret = (num > 0).then(|| acc / nalgebra::convert::<f64, P::Data>(num as f64));
        (ret, num)
    }

    #[allow(clippy::type_complexity)]
    pub fn centroid_and_cov_matrix(&self) -> (Option<(Vector3<P::Data>, Matrix3<P::Data>)>, usize) {
        match self.centroid_coords() {
            (Some(centroid), _) => match self.cov_matrix(&centroid) {
                (Some(cov), num) => (Some((centroid, cov)), num),
                (None, num) => (None, num),
            },
            (None, num) => (None, num),
        }
    }
}

impl<'a, P> Index<usize> for PointCloudRef<'a, P> {
    type Output = P;

    fn index(&self, index: usize) -> &Self::Output {
        match self.indices {
            Some(indices) => &self.inner[indices[index]],
            None => &self.inner[index],
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{matrix, vector};

    use super::*;
    use crate::point::Point3;

    #[test]
    fn test_centroid_and_cov() {
        let cloud: PointCloud<_> = [
            Point3::new(1., 0., 0.),
            Point3::new(-1., 0., 0.),
            Point3::new(0., 2., 0.),
            Point3::new(0., -2., 0.),
            Point3::new(f64::NAN, 0., 0.),
            Point3::new(100., 100., 100.),
        ]
        .into_iter()
        .collect();

        let view = cloud.select(&[0, 1, 2, 3, 4]);
        assert_eq!(view.len(), 5);
        assert_eq!(view[2], Point3::new(0., 2., 0.));

        let (ret, num) = view.centroid_and_cov_matrix();
        let (centroid, cov) = ret.unwrap();
        assert_eq!(num, 4);
        assert_relative_eq!(centroid, vector![0., 0., 0.]);
        assert_relative_eq!(
            cov,
            matrix![0.5, 0., 0.; 0., 2., 0.; 0., 0., 0.],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_empty_view() {
        let cloud: PointCloud<Point3<f64>> = PointCloud::new();
        let (ret, num) = cloud.as_ref().centroid_and_cov_matrix();
        assert!(ret.is_none());
        assert_eq!(num, 0);
    }
}
