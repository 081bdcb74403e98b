use nalgebra::{Matrix4, RealField, Rotation3, Scalar, Vector4};

/// A rigid motion of homogeneous coordinates.
///
/// `so3` moves directions (`w = 0`), `se3` moves positions (`w = 1`).
pub trait Transform<T: Scalar> {
    fn so3(&self, from: &Vector4<T>, to: &mut Vector4<T>);

    fn se3(&self, from: &Vector4<T>, to: &mut Vector4<T>);
}

impl<T: RealField> Transform<T> for Matrix4<T> {
    fn so3(&self, from: &Vector4<T>, to: &mut Vector4<T>) {
        *to = self * Vector4::new(from.x.clone(), from.y.clone(), from.z.clone(), T::zero());
    }

    fn se3(&self, from: &Vector4<T>, to: &mut Vector4<T>) {
        *to = self * Vector4::new(from.x.clone(), from.y.clone(), from.z.clone(), T::one());
    }
}

impl<T: RealField> Transform<T> for Rotation3<T> {
    fn so3(&self, from: &Vector4<T>, to: &mut Vector4<T>) {
        *to = (self * from.xyz()).insert_row(3, T::zero());
    }

    fn se3(&self, from: &Vector4<T>, to: &mut Vector4<T>) {
        *to = (self * from.xyz()).insert_row(3, T::one());
    }
}
