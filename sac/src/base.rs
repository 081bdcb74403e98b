mod ransac;

use cylfit_common::{
    point::{Normal, Point},
    point_cloud::PointCloud,
};
use nalgebra::RealField;
use sample_consensus::{Consensus, Estimator, Model};

pub use self::ransac::Ransac;
use crate::cylinder::Oriented;

/// Runs a consensus method over a cloud and its per-point normals.
pub struct PcSac<'a, P, N, C> {
    point_cloud: &'a PointCloud<P>,
    normals: &'a PointCloud<N>,
    inner: C,
}

impl<'a, P, N, C> PcSac<'a, P, N, C> {
    /// `normals` must be parallel to `point_cloud`.
    pub fn new(point_cloud: &'a PointCloud<P>, normals: &'a PointCloud<N>, inner: C) -> Self {
        PcSac {
            point_cloud,
            normals,
            inner,
        }
    }
}

impl<'a, T, P, N, C> PcSac<'a, P, N, C>
where
    T: RealField,
    P: Point<Data = T>,
    N: Normal<Data = T>,
{
    pub fn data(&self) -> impl Iterator<Item = Oriented<T>> + Clone + '_ {
        { self.point_cloud.iter().zip(self.normals.iter()) }.map(oriented)
    }

    pub fn compute<E: Estimator<Oriented<T>>>(
        &mut self,
        estimator: &E,
    ) -> Option<(E::Model, C::Inliers)>
    where
        C: Consensus<E, Oriented<T>>,
    {
        let data = { self.point_cloud.iter().zip(self.normals.iter()) }.map(oriented);
        self.inner.model_inliers(estimator, data)
    }
}

fn oriented<T, P, N>((point, normal): (&P, &N)) -> Oriented<T>
where
    T: RealField,
    P: Point<Data = T>,
    N: Normal<Data = T>,
{
    Oriented {
        coords: point.coords().clone(),
        normal: normal.direction(),
    }
}

pub trait SacModel<Data>: Model<Data> {
    /// Indices of the items whose residual is below `threshold`.
    fn select_within_distance<I>(&self, data: I, threshold: f64) -> Vec<usize>
    where
        I: Iterator<Item = Data>,
    {
        { data.enumerate() }
            .filter(|(_, item)| self.residual(item) < threshold)
            .map(|(index, _)| index)
            .collect()
    }
}
