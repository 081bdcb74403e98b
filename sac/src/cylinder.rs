use nalgebra::{convert, RealField, SVector, Scalar, Vector3, Vector4};
use num::ToPrimitive;
use sample_consensus::{Estimator, Model};

use crate::{base::SacModel, line::Line};

/// Below this `a·c - b²`, the normal lines of a sample count as parallel.
const PARALLEL_EPSILON: f64 = 1e-8;
const COINCIDENT_EPSILON: f64 = 1e-12;
const CANONICAL_EPSILON: f64 = 1e-6;

/// A point together with its unit surface normal, if one could be estimated.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Oriented<T: Scalar> {
    pub coords: Vector4<T>,
    pub normal: Option<Vector3<T>>,
}

/// An infinite cylinder: an axis with unit direction and a radius.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Cylinder<T: Scalar> {
    pub axis: Line<T>,
    pub radius: T,
}

impl<T: RealField> Cylinder<T> {
    /// `direction` is normalized here and must not be zero.
    pub fn new(point: Vector3<T>, direction: Vector3<T>, radius: T) -> Self {
        Cylinder {
            axis: Line {
                coords: point.insert_row(3, T::one()),
                direction: direction.normalize().insert_row(3, T::zero()),
            },
            radius,
        }
    }

    #[inline]
    pub fn point(&self) -> Vector3<T> {
        self.axis.coords.xyz()
    }

    #[inline]
    pub fn direction(&self) -> Vector3<T> {
        self.axis.direction.xyz()
    }

    /// Distance from the axis minus the radius; negative inside.
    pub fn signed_distance(&self, point: &Vector4<T>) -> T {
        self.axis.distance(point) - self.radius.clone()
    }

    /// Distance from `point` to the cylindrical surface.
    pub fn distance(&self, point: &Vector4<T>) -> T {
        self.signed_distance(point).abs()
    }

    /// The outward surface normal at the radial projection of `point`, or
    /// `None` for points on the axis.
    pub fn surface_normal(&self, point: &Vector4<T>) -> Option<Vector3<T>> {
        let perpendicular = self.axis.perpendicular(point);
        let norm = perpendicular.norm();
        (norm > T::zero()).then(|| perpendicular / norm)
    }

    /// The angle between the unit `normal` and the surface normal, ignoring
    /// orientation, i.e. in `[0, π/2]`.
    pub fn normal_deviation(&self, point: &Vector4<T>, normal: &Vector3<T>) -> T {
        match self.surface_normal(point) {
            Some(surface) => surface.dot(normal).abs().min(T::one()).acos(),
            None => T::frac_pi_2(),
        }
    }

    pub fn is_finite(&self) -> bool {
        { self.axis.coords.iter().chain(self.axis.direction.iter()) }.all(|x| x.is_finite())
            && self.radius.is_finite()
    }

    /// `[point.xyz, direction.xyz, radius]`.
    pub fn coefficients(&self) -> SVector<T, 7> {
        let (p, d) = (self.point(), self.direction());
        SVector::<T, 7>::from([
            p.x.clone(),
            p.y.clone(),
            p.z.clone(),
            d.x.clone(),
            d.y.clone(),
            d.z.clone(),
            self.radius.clone(),
        ])
    }

    /// Flips the direction so that it points up (`+Z`). For a horizontal
    /// axis, its first non-zero component is made positive instead.
    pub fn canonicalize(mut self) -> Self {
        let epsilon = convert::<f64, T>(CANONICAL_EPSILON);
        let direction = self.direction();
        let flip = if direction.z.clone().abs() >= epsilon {
            direction.z < T::zero()
        } else {
            { direction.iter() }
                .find(|x| (**x).clone().abs() >= epsilon)
                .map_or(false, |x| *x < T::zero())
        };
        if flip {
            self.axis.direction = -self.axis.direction;
        }
        self
    }
}

impl<T: RealField + ToPrimitive> Model<Vector4<T>> for Cylinder<T> {
    fn residual(&self, data: &Vector4<T>) -> f64 {
        self.distance(data).to_f64().unwrap_or(f64::INFINITY)
    }
}

impl<T: RealField + ToPrimitive> SacModel<Vector4<T>> for Cylinder<T> {}

/// A cylinder scored against oriented points: the surface distance blended
/// with how far the point normal deviates from the surface normal.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NormalCylinder<T: Scalar> {
    pub cylinder: Cylinder<T>,
    pub normal_distance_weight: T,
}

impl<T: RealField> NormalCylinder<T> {
    /// `|w·deviation + (1 - w)·distance|`. Points without a normal only
    /// contribute their distance term.
    pub fn score(&self, data: &Oriented<T>) -> T {
        let weight = self.normal_distance_weight.clone();
        let distance = (T::one() - weight.clone()) * self.cylinder.distance(&data.coords);
        match &data.normal {
            Some(normal) => {
                (weight * self.cylinder.normal_deviation(&data.coords, normal) + distance).abs()
            }
            None => distance.abs(),
        }
    }
}

impl<T: RealField + ToPrimitive> Model<Oriented<T>> for NormalCylinder<T> {
    fn residual(&self, data: &Oriented<T>) -> f64 {
        self.score(data).to_f64().unwrap_or(f64::INFINITY)
    }
}

impl<T: RealField + ToPrimitive> SacModel<Oriented<T>> for NormalCylinder<T> {}

/// Builds cylinders from two oriented points, rejecting any whose radius
/// falls outside `[min_radius, max_radius]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CylinderEstimator<T: Scalar> {
    pub normal_distance_weight: T,
    pub min_radius: T,
    pub max_radius: T,
}

impl<T: RealField> CylinderEstimator<T> {
    pub fn accepts_radius(&self, radius: &T) -> bool {
        *radius >= self.min_radius && *radius <= self.max_radius
    }

    /// The axis is the common perpendicular of the two normal lines, the
    /// radius the distance of the first point to it.
    pub fn try_make(&self, first: &Oriented<T>, second: &Oriented<T>) -> Option<Cylinder<T>> {
        let (n1, n2) = (first.normal.as_ref()?, second.normal.as_ref()?);
        let (p1, p2) = (first.coords.xyz(), second.coords.xyz());
        if (&p1 - &p2).norm_squared() <= convert::<f64, T>(COINCIDENT_EPSILON) {
            return None;
        }

        let w = n1 + &p1 - &p2;
        let a = n1.dot(n1);
        let b = n1.dot(n2);
        let c = n2.dot(n2);
        let d = n1.dot(&w);
        let e = n2.dot(&w);
        let denominator = a.clone() * c.clone() - b.clone() * b.clone();

        let (sc, tc) = if denominator < convert::<f64, T>(PARALLEL_EPSILON) {
            let tc = if b > c { d / b } else { e / c };
            (T::zero(), tc)
        } else {
            (
                (b.clone() * e.clone() - c * d.clone()) / denominator.clone(),
                (a * e - b * d) / denominator,
            )
        };

        let line_pt = &p1 + n1 + n1.scale(sc);
        let line_dir = &p2 + n2.scale(tc) - &line_pt;
        if !(line_dir.norm() > T::zero()) {
            return None;
        }

        let mut cylinder = Cylinder::new(line_pt, line_dir, T::zero());
        cylinder.radius = cylinder.axis.distance(&first.coords);

        (cylinder.is_finite() && self.accepts_radius(&cylinder.radius)).then_some(cylinder)
    }
}

impl<T: RealField + ToPrimitive> Estimator<Oriented<T>> for CylinderEstimator<T> {
    type Model = NormalCylinder<T>;

    type ModelIter = Option<NormalCylinder<T>>;

    const MIN_SAMPLES: usize = 2;

    fn estimate<I>(&self, mut data: I) -> Self::ModelIter
    where
        I: Iterator<Item = Oriented<T>> + Clone,
    {
        match (data.next(), data.next()) {
            (Some(a), Some(b)) => self.try_make(&a, &b).map(|cylinder| NormalCylinder {
                cylinder,
                normal_distance_weight: self.normal_distance_weight.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::vector;

    use super::*;

    fn oriented(coords: [f64; 3], normal: [f64; 3]) -> Oriented<f64> {
        Oriented {
            coords: vector![coords[0], coords[1], coords[2], 1.],
            normal: Some(Vector3::from(normal).normalize()),
        }
    }

    fn estimator() -> CylinderEstimator<f64> {
        CylinderEstimator {
            normal_distance_weight: 0.1,
            min_radius: 0.,
            max_radius: 2.,
        }
    }

    #[test]
    fn test_try_make() {
        let a = oriented([1., 0., 0.], [1., 0., 0.]);
        let b = oriented([0., 1., 0.5], [0., -1., 0.]);
        let cylinder = estimator().try_make(&a, &b).unwrap().canonicalize();

        assert_relative_eq!(cylinder.radius, 1., epsilon = 1e-12);
        assert_relative_eq!(cylinder.direction(), vector![0., 0., 1.], epsilon = 1e-12);
        assert_relative_eq!(cylinder.axis.distance(&vector![0., 0., 7., 1.]), 0., epsilon = 1e-12);
    }

    #[test]
    fn test_try_make_rejects() {
        let a = oriented([1., 0., 0.], [1., 0., 0.]);
        let b = oriented([0., 1., 0.5], [0., 1., 0.]);

        let narrow = CylinderEstimator {
            max_radius: 0.5,
            ..estimator()
        };
        assert!(narrow.try_make(&a, &b).is_none());

        let unoriented = Oriented { normal: None, ..b };
        assert!(estimator().try_make(&a, &unoriented).is_none());
        assert!(estimator().try_make(&a, &a).is_none());

        // Both normal lines cross the axis at the same spot.
        let c = oriented([0., 1., 0.], [0., 1., 0.]);
        assert!(estimator().try_make(&a, &c).is_none());
    }

    #[test]
    fn test_estimate() {
        let data = [
            oriented([0., -1., 0.], [0., -1., 0.]),
            oriented([-1., 0., 2.], [-1., 0., 0.]),
        ];
        let models = estimator().estimate(data.into_iter());
        let model = models.unwrap();
        assert_relative_eq!(model.cylinder.radius, 1., epsilon = 1e-12);
        assert_eq!(model.normal_distance_weight, 0.1);
        assert!(estimator().estimate(data.into_iter().take(1)).is_none());
    }

    #[test]
    fn test_scores() {
        let model = NormalCylinder {
            cylinder: Cylinder::new(vector![0., 0., 0.], vector![0., 0., 3.], 1.),
            normal_distance_weight: 0.5,
        };

        let on_surface = oriented([0., 1., 4.], [0., -1., 0.]);
        assert_relative_eq!(model.score(&on_surface), 0., epsilon = 1e-12);

        let tilted = oriented([1.5, 0., 0.], [1., 1., 0.]);
        let expected = 0.5 * std::f64::consts::FRAC_PI_4 + 0.5 * 0.5;
        assert_relative_eq!(model.score(&tilted), expected, epsilon = 1e-12);

        let inside = Oriented {
            normal: None,
            ..oriented([0.5, 0., 0.], [1., 0., 0.])
        };
        assert_relative_eq!(model.score(&inside), 0.25, epsilon = 1e-12);
        assert_relative_eq!(model.residual(&inside), 0.25, epsilon = 1e-12);

        let points = [vector![0., 1.05, 0., 1.], vector![0., 2., 0., 1.], vector![0.3, 0., 0., 1.]];
        assert_relative_eq!(model.cylinder.residual(&points[0]), 0.05, epsilon = 1e-12);
        assert_eq!(model.cylinder.select_within_distance(points.into_iter(), 0.1), vec![0]);

        let axis = oriented([0., 0., 1.], [1., 0., 0.]);
        let deviation = model.cylinder.normal_deviation(&axis.coords, &axis.normal.unwrap());
        assert_relative_eq!(deviation, std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_canonicalize() {
        let down = Cylinder::new(vector![0., 0., 0.], vector![0., 0.2, -1.], 1.).canonicalize();
        assert!(down.direction().z > 0.);

        let horizontal = Cylinder::new(vector![0., 0., 0.], vector![0., -1., 0.], 1.);
        let horizontal = horizontal.canonicalize();
        assert_relative_eq!(horizontal.direction(), vector![0., 1., 0.]);
        assert_eq!(horizontal.canonicalize(), horizontal);

        let coefficients = horizontal.coefficients();
        assert_eq!(coefficients.len(), 7);
        assert_eq!(coefficients[4], 1.);
        assert_eq!(coefficients[6], 1.);
    }
}
