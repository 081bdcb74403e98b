use core::fmt::Debug;

use nalgebra::{RealField, Scalar, Vector3, Vector4};
use num::{One, Zero};

pub trait Data: Debug + Clone + PartialEq + Default {
    type Data: Scalar;

    fn is_finite(&self) -> bool;
}

pub trait Point: Data {
    fn coords(&self) -> &Vector4<Self::Data>;

    fn coords_mut(&mut self) -> &mut Vector4<Self::Data>;
    #[inline]
    fn with_coords(mut self, coords: Vector4<Self::Data>) -> Self {
        *self.coords_mut() = coords;
        self
    }

    #[inline]
    fn na_point(&self) -> nalgebra::Point3<Self::Data> {
        let coords = self.coords();
        nalgebra::Point3::new(coords.x.clone(), coords.y.clone(), coords.z.clone())
    }
}

/// A surface normal with its curvature.
///
/// Normals are not oriented: `n` and `-n` describe the same surface unless an
/// orientation convention (e.g. towards a viewpoint) was applied when they
/// were computed.
pub trait Normal: Data {
    fn normal(&self) -> &Vector4<Self::Data>;

    fn normal_mut(&mut self) -> &mut Vector4<Self::Data>;
    #[inline]
    fn with_normal(mut self, normal: Vector4<Self::Data>) -> Self {
        *self.normal_mut() = normal;
        self
    }

    fn curvature(&self) -> Self::Data;

    fn curvature_mut(&mut self) -> &mut Self::Data;
    #[inline]
    fn with_curvature(mut self, curvature: Self::Data) -> Self {
        *self.curvature_mut() = curvature;
        self
    }

    /// The unit direction of the normal, or `None` if the estimation failed
    /// for this entry.
    #[inline]
    fn direction(&self) -> Option<Vector3<Self::Data>>
    where
        Self::Data: RealField,
    {
        self.is_finite().then(|| self.normal().xyz())
    }
}

/// Homogeneous 3D point, `w` is always 1.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Point3<T: Scalar>(pub Vector4<T>);

impl<T: Scalar + Zero + One> Point3<T> {
    #[inline]
    pub fn new(x: T, y: T, z: T) -> Self {
        Point3(Vector4::new(x, y, z, T::one()))
    }
}

impl<T: Scalar + Zero + One> Default for Point3<T> {
    #[inline]
    fn default() -> Self {
        Point3(Vector4::new(T::zero(), T::zero(), T::zero(), T::one()))
    }
}

impl<T: Scalar + Zero + One> From<Vector3<T>> for Point3<T> {
    #[inline]
    fn from(v: Vector3<T>) -> Self {
        Point3(v.insert_row(3, T::one()))
    }
}

impl<T: Scalar + Zero + One> From<nalgebra::Point3<T>> for Point3<T> {
    #[inline]
    fn from(p: nalgebra::Point3<T>) -> Self {
        Point3::from(p.coords)
    }
}

impl<T: RealField> Data for Point3<T> {
    type Data = T;

    #[inline]
    fn is_finite(&self) -> bool {
        self.0.xyz().iter().all(|x| x.is_finite())
    }
}

impl<T: RealField> Point for Point3<T> {
    #[inline]
    fn coords(&self) -> &Vector4<T> {
        &self.0
    }

    #[inline]
    fn coords_mut(&mut self) -> &mut Vector4<T> {
        &mut self.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Normal3<T: Scalar> {
    pub normal: Vector4<T>,
    pub curvature: T,
}

impl<T: RealField> Normal3<T> {
    #[inline]
    pub fn new(normal: Vector3<T>, curvature: T) -> Self {
        Normal3 {
            normal: normal.insert_row(3, T::zero()),
            curvature,
        }
    }

    /// The sentinel for a point whose neighborhood could not define a
    /// surface. It never passes [`Data::is_finite`].
    #[inline]
    pub fn invalid() -> Self {
        let nan = T::zero() / T::zero();
        Normal3 {
            normal: Vector4::new(nan.clone(), nan.clone(), nan.clone(), T::zero()),
            curvature: nan,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

impl<T: RealField> Default for Normal3<T> {
    #[inline]
    fn default() -> Self {
        Self::invalid()
    }
}

impl<T: RealField> Data for Normal3<T> {
    type Data = T;

    #[inline]
    fn is_finite(&self) -> bool {
        self.normal.xyz().iter().all(|x| x.is_finite()) && self.curvature.is_finite()
    }
}

impl<T: RealField> Normal for Normal3<T> {
    #[inline]
    fn normal(&self) -> &Vector4<T> {
        &self.normal
    }

    #[inline]
    fn normal_mut(&mut self) -> &mut Vector4<T> {
        &mut self.normal
    }

    #[inline]
    fn curvature(&self) -> T {
        self.curvature.clone()
    }

    #[inline]
    fn curvature_mut(&mut self) -> &mut T {
        &mut self.curvature
    }
}
