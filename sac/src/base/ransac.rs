use log::debug;
use rand::{seq::index, RngCore};
use sample_consensus::{Consensus, Estimator, Model};

/// Random sample consensus with a fixed iteration budget.
///
/// Each round draws `E::MIN_SAMPLES` distinct items, and a candidate replaces
/// the best model only if it has strictly more inliers. Items are inliers of
/// a model if their residual is below `threshold`.
#[derive(Debug, Clone)]
pub struct Ransac<R> {
    pub max_iterations: usize,
    pub threshold: f64,
    rng: R,
}

impl<R: RngCore> Ransac<R> {
    pub fn new(max_iterations: usize, threshold: f64, rng: R) -> Self {
        Ransac {
            max_iterations,
            threshold,
            rng,
        }
    }

    fn inliers<M: Model<Data>, Data>(&self, model: &M, data: &[Data]) -> Vec<usize> {
        { data.iter().enumerate() }
            .filter(|(_, item)| model.residual(item) < self.threshold)
            .map(|(index, _)| index)
            .collect()
    }
}

impl<E, Data, R> Consensus<E, Data> for Ransac<R>
where
    E: Estimator<Data>,
    Data: Clone,
    R: RngCore,
{
    type Inliers = Vec<usize>;

    fn model<I>(&mut self, estimator: &E, data: I) -> Option<E::Model>
    where
        I: Iterator<Item = Data> + Clone,
    {
        self.model_inliers(estimator, data).map(|(model, _)| model)
    }

    fn model_inliers<I>(&mut self, estimator: &E, data: I) -> Option<(E::Model, Self::Inliers)>
    where
        I: Iterator<Item = Data> + Clone,
    {
        let data = data.collect::<Vec<_>>();
        if data.len() < E::MIN_SAMPLES {
            return None;
        }

        let mut best: Option<(E::Model, Vec<usize>)> = None;
        let mut candidates = 0;
        for _ in 0..self.max_iterations {
            let sample = index::sample(&mut self.rng, data.len(), E::MIN_SAMPLES).into_vec();
            let models = estimator.estimate(sample.iter().map(|&index| data[index].clone()));

            for model in models {
                candidates += 1;
                let inliers = self.inliers(&model, &data);
                let best_len = best.as_ref().map_or(0, |(_, inliers)| inliers.len());
                if inliers.len() > best_len {
                    best = Some((model, inliers));
                }
            }
        }

        debug!(
            "ransac: {} candidates in {} iterations, best support {}/{}",
            candidates,
            self.max_iterations,
            best.as_ref().map_or(0, |(_, inliers)| inliers.len()),
            data.len(),
        );
        best
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{vector, Vector2};
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    /// Lines `y = a·x + b` through two samples.
    struct LineEstimator;

    #[derive(Debug, PartialEq)]
    struct Line2 {
        a: f64,
        b: f64,
    }

    impl Model<Vector2<f64>> for Line2 {
        fn residual(&self, data: &Vector2<f64>) -> f64 {
            (self.a * data.x + self.b - data.y).abs()
        }
    }

    impl Estimator<Vector2<f64>> for LineEstimator {
        type Model = Line2;
        type ModelIter = Option<Line2>;
        const MIN_SAMPLES: usize = 2;

        fn estimate<I>(&self, mut data: I) -> Self::ModelIter
        where
            I: Iterator<Item = Vector2<f64>> + Clone,
        {
            let (p, q) = (data.next()?, data.next()?);
            let a = (q.y - p.y) / (q.x - p.x);
            a.is_finite().then(|| Line2 { a, b: p.y - a * p.x })
        }
    }

    /// Proposes the same horizontal lines for every sample.
    struct Horizontal(Vec<f64>);

    impl Estimator<Vector2<f64>> for Horizontal {
        type Model = Line2;
        type ModelIter = Vec<Line2>;
        const MIN_SAMPLES: usize = 2;

        fn estimate<I>(&self, _: I) -> Self::ModelIter
        where
            I: Iterator<Item = Vector2<f64>> + Clone,
        {
            self.0.iter().map(|&b| Line2 { a: 0., b }).collect()
        }
    }

    fn points() -> Vec<Vector2<f64>> {
        let mut points = (0..20).map(|i| vector![i as f64, 2. * i as f64 + 1.]).collect::<Vec<_>>();
        points.extend([vector![3., -10.], vector![7., 40.], vector![-5., 3.]]);
        points
    }

    #[test]
    fn test_ransac_line() {
        let mut ransac = Ransac::new(200, 0.1, StdRng::seed_from_u64(3));
        let (model, inliers) = ransac.model_inliers(&LineEstimator, points().into_iter()).unwrap();

        assert!((model.a - 2.).abs() < 1e-9);
        assert!((model.b - 1.).abs() < 1e-9);
        assert_eq!(inliers, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_ransac_seeded() {
        let run = |seed| {
            let mut ransac = Ransac::new(5, 0.1, StdRng::seed_from_u64(seed));
            ransac.model_inliers(&LineEstimator, points().into_iter())
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn test_ransac_ties_keep_first() {
        let square = vec![vector![0., 0.], vector![1., 0.], vector![0., 1.], vector![1., 1.]];
        for (levels, first) in [(vec![0., 1.], 0.), (vec![1., 0.], 1.)] {
            let mut ransac = Ransac::new(3, 0.1, StdRng::seed_from_u64(0));
            let (model, inliers) = ransac
                .model_inliers(&Horizontal(levels), square.clone().into_iter())
                .unwrap();
            assert_eq!(model, Line2 { a: 0., b: first });
            assert_eq!(inliers.len(), 2);
        }
    }

    #[test]
    fn test_ransac_too_few() {
        let mut ransac = Ransac::new(10, 0.1, StdRng::seed_from_u64(0));
        let one = vec![vector![0., 1.]];
        assert!(ransac.model(&LineEstimator, one.into_iter()).is_none());

        let mut ransac = Ransac::new(0, 0.1, StdRng::seed_from_u64(0));
        assert!(ransac.model(&LineEstimator, points().into_iter()).is_none());
    }
}
