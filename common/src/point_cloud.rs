mod reference;
mod transforms;

use std::ops::{Deref, Index};

use bitvec::{bitvec, vec::BitVec};
use nalgebra::RealField;

pub use self::{reference::PointCloudRef, transforms::Transform};
use crate::point::{Data, Point};

/// An ordered collection of points.
///
/// Organized clouds keep their row-major `width`; clouds made from a subset
/// of another are unorganized (a single row). `bounded` records whether every
/// entry is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud<P> {
    storage: Vec<P>,
    width: usize,
    bounded: bool,
}

impl<P> PointCloud<P> {
    #[inline]
    pub fn new() -> Self {
        PointCloud {
            storage: Vec::new(),
            width: 0,
            bounded: true,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.storage.len() / self.width
        }
    }

    /// The `[column, row]` of the `index`-th point, or `None` for a cloud
    /// without columns.
    #[inline]
    pub fn index(&self, index: usize) -> Option<[usize; 2]> {
        Some([index.checked_rem(self.width)?, index / self.width])
    }

    #[inline]
    pub fn is_bounded(&self) -> bool {
        self.bounded
    }

    #[inline]
    pub fn into_vec(self) -> Vec<P> {
        self.storage
    }

    #[inline]
    pub fn select<'a>(&'a self, indices: &'a [usize]) -> PointCloudRef<'a, P> {
        PointCloudRef::new(self, Some(indices))
    }

    #[inline]
    pub fn as_ref(&self) -> PointCloudRef<'_, P> {
        PointCloudRef::new(self, None)
    }
}

impl<P: Data> PointCloud<P> {
    pub fn try_from_vec(storage: Vec<P>, width: usize) -> Result<Self, Vec<P>> {
        if (width > 0 && storage.len() % width == 0) || (width == 0 && storage.is_empty()) {
            let bounded = storage.iter().all(|p| p.is_finite());
            Ok(PointCloud {
                storage,
                width,
                bounded,
            })
        } else {
            Err(storage)
        }
    }

    /// Builds an unorganized cloud.
    #[inline]
    pub fn from_points(storage: Vec<P>) -> Self {
        let width = storage.len();
        let bounded = storage.iter().all(|p| p.is_finite());
        PointCloud {
            storage,
            width,
            bounded,
        }
    }

    /// Copies the points at `indices`, in that order, into an unorganized
    /// cloud.
    pub fn create_sub(&self, indices: &[usize]) -> Self {
        PointCloud::from_points(
            { indices.iter() }
                .map(|&index| self.storage[index].clone())
                .collect(),
        )
    }

    /// Copies the points at `indices`, or with `negative` every point that is
    /// *not* listed, preserving the original order.
    pub fn extract(&self, indices: &[usize], negative: bool) -> Self {
        let mut mask: BitVec = bitvec![0; self.storage.len()];
        for &index in indices {
            mask.set(index, true);
        }
        let storage = { self.storage.iter().zip(mask.iter().by_vals()) }
            .filter(|(_, selected)| *selected != negative)
            .map(|(point, _)| point.clone())
            .collect();
        PointCloud::from_points(storage)
    }

    pub fn map<F, R>(&self, f: F) -> PointCloud<R>
    where
        F: FnMut(&P) -> R,
        R: Data,
    {
        let storage = self.storage.iter().map(f).collect::<Vec<_>>();
        let bounded = storage.iter().all(|p| p.is_finite());
        PointCloud {
            storage,
            width: self.width,
            bounded,
        }
    }
}

impl<P: Point> PointCloud<P>
where
    P::Data: RealField,
{
    /// Applies `z` to every finite point. Non-finite points are copied as is.
    pub fn transform<Z: Transform<P::Data>>(&self, z: &Z, out: &mut Self) {
        out.storage.clone_from(&self.storage);
        out.width = self.width;
        out.bounded = self.bounded;

        for (from, to) in self.storage.iter().zip(out.storage.iter_mut()) {
            if self.bounded || from.is_finite() {
                z.se3(from.coords(), to.coords_mut())
            }
        }
    }

    #[inline]
    pub fn transformed<Z: Transform<P::Data>>(&self, z: &Z) -> Self {
        let mut out = Self::new();
        self.transform(z, &mut out);
        out
    }
}

impl<P> Default for PointCloud<P> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Deref for PointCloud<P> {
    type Target = [P];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}

impl<P> Index<usize> for PointCloud<P> {
    type Output = P;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.storage[index]
    }
}

impl<P> Index<(usize, usize)> for PointCloud<P> {
    type Output = P;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.storage[y * self.width + x]
    }
}

impl<P: Data> FromIterator<P> for PointCloud<P> {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        PointCloud::from_points(iter.into_iter().collect())
    }
}
