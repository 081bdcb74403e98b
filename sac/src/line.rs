use nalgebra::{RealField, Scalar, Vector3, Vector4};

/// An infinite line through `coords` along `direction` (`w = 0`).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Line<T: Scalar> {
    pub coords: Vector4<T>,
    pub direction: Vector4<T>,
}

impl<T: RealField> Line<T> {
    /// The signed position of the foot of `point` along the line, in units of
    /// `direction`'s length.
    pub fn parameter(&self, point: &Vector4<T>) -> T {
        let side = (point - &self.coords).xyz();
        side.dot(&self.direction.xyz()) / self.direction.xyz().norm_squared()
    }

    /// The vector from the foot of the perpendicular to `point`.
    pub fn perpendicular(&self, point: &Vector4<T>) -> Vector3<T> {
        let side = (point - &self.coords).xyz();
        side - self.direction.xyz().scale(self.parameter(point))
    }

    pub fn distance(&self, point: &Vector4<T>) -> T {
        self.perpendicular(point).norm()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::vector;

    use super::*;

    #[test]
    fn test_line() {
        let line = Line {
            coords: vector![1., 0., 0., 1.],
            direction: vector![0., 0., 2., 0.],
        };
        let point = vector![4., 4., 3., 1.];

        assert_relative_eq!(line.distance(&point), 5.);
        assert_relative_eq!(line.parameter(&point), 1.5);
        assert_relative_eq!(line.perpendicular(&point), vector![3., 4., 0.]);
    }
}
