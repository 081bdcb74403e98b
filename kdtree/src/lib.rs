mod node;
mod result;

use cylfit_common::{
    point::Point,
    point_cloud::PointCloud,
    search::{SearchType, Searcher},
};
use nalgebra::{RealField, Scalar, Vector4};
use node::Node;

pub use self::result::*;

/// A static k-d tree over the finite points of a cloud.
pub struct KdTree<'a, T: Scalar> {
    root: Option<Node<'a, T>>,
    len: usize,
}

impl<'a, T: Scalar> Default for KdTree<'a, T> {
    fn default() -> Self {
        KdTree { root: None, len: 0 }
    }
}

impl<'a, T: RealField> KdTree<'a, T> {
    pub fn new<P>(point_cloud: &'a PointCloud<P>) -> Self
    where
        P: Point<Data = T>,
    {
        let coords: &'a [P] = point_cloud;
        let mut indices = { coords.iter().enumerate() }
            .filter(|(_, point)| point.is_finite())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        if indices.is_empty() {
            return Default::default();
        }
        let len = indices.len();
        let root = Node::build(coords, &mut indices, None);
        KdTree {
            root: Some(root),
            len,
        }
    }

    /// The number of indexed points.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn search(&self, pivot: &Vector4<T>, result: &mut impl ResultSet<Key = T, Value = usize>) {
        if let Some(root) = &self.root {
            root.search(pivot, result)
        }
    }

    pub fn search_exact(
        &self,
        pivot: &Vector4<T>,
        result: &mut impl ResultSet<Key = T, Value = usize>,
    ) {
        if let Some(root) = &self.root {
            root.search_exact(pivot, result)
        }
    }
}

impl<'a, T: RealField> Searcher<'a, T> for KdTree<'a, T> {
    fn search(&self, pivot: &Vector4<T>, ty: SearchType<T>, result: &mut Vec<usize>) {
        result.clear();
        match ty {
            SearchType::Knn(num) => {
                let mut rs = KnnResultSet::new(num);
                self.search(pivot, &mut rs);
                result.extend(rs.into_sorted_vec().into_iter().map(|(_, v)| v));
            }
            SearchType::Radius(radius) => {
                let mut rs = RadiusResultSet::new(radius);
                self.search(pivot, &mut rs);
                result.extend(rs.into_sorted_vec().into_iter().map(|(_, v)| v));
            }
        }
    }

    fn search_exact(&self, pivot: &Vector4<T>, ty: SearchType<T>, result: &mut Vec<usize>) {
        result.clear();
        match ty {
            SearchType::Knn(num) => {
                let mut rs = KnnResultSet::new(num);
                self.search_exact(pivot, &mut rs);
                result.extend(rs.into_sorted_vec().into_iter().map(|(_, v)| v));
            }
            SearchType::Radius(radius) => {
                let mut rs = RadiusResultSet::new(radius);
                self.search_exact(pivot, &mut rs);
                result.extend(rs.into_sorted_vec().into_iter().map(|(_, v)| v));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cylfit_common::point::Point3;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    fn brute_force(cloud: &PointCloud<Point3<f64>>, pivot: &Vector4<f64>, k: usize) -> Vec<usize> {
        let mut all = { cloud.iter().enumerate() }
            .map(|(i, p)| ((p.0.xyz() - pivot.xyz()).norm(), i))
            .collect::<Vec<_>>();
        all.sort_by(|a, b| a.partial_cmp(b).unwrap());
        all.into_iter().take(k).map(|(_, i)| i).collect()
    }

    fn random_cloud(num: usize, seed: u64) -> PointCloud<Point3<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..num)
            .map(|_| Point3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen()))
            .collect()
    }

    #[test]
    fn test_knn_matches_brute_force() {
        let cloud = random_cloud(500, 7);
        let tree = KdTree::new(&cloud);
        assert_eq!(tree.len(), 500);

        let mut result = Vec::new();
        for pivot in [Point3::new(0., 0., 0.5), Point3::new(0.9, -0.9, 0.), cloud[42]] {
            let expected = brute_force(&cloud, &pivot.0, 10);
            Searcher::search(&tree, &pivot.0, SearchType::Knn(10), &mut result);
            assert_eq!(result, expected);
            Searcher::search_exact(&tree, &pivot.0, SearchType::Knn(10), &mut result);
            assert_eq!(result, expected);
        }
    }

    #[test]
    fn test_radius() {
        let cloud = random_cloud(300, 11);
        let tree = KdTree::new(&cloud);
        let pivot = Point3::new(0.1, 0.2, 0.5).0;

        let mut result = Vec::new();
        Searcher::search(&tree, &pivot, SearchType::Radius(0.3), &mut result);
        let mut expected = { cloud.iter().enumerate() }
            .filter(|(_, p)| (p.0.xyz() - pivot.xyz()).norm() < 0.3)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        expected.sort_unstable();
        result.sort_unstable();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_duplicates_and_non_finite() {
        let cloud: PointCloud<_> = (0..9)
            .map(|i| {
                if i == 4 {
                    Point3::new(f64::NAN, 0., 0.)
                } else {
                    Point3::new(0.1, 0.1, 0.1)
                }
            })
            .collect();
        let tree = KdTree::new(&cloud);
        assert_eq!(tree.len(), 8);

        let mut result = Vec::new();
        Searcher::search_exact(&tree, &cloud[0].0, SearchType::Knn(20), &mut result);
        assert_eq!(result.len(), 8);
        assert!(!result.contains(&4));
    }

    #[test]
    fn test_empty() {
        let cloud = PointCloud::<Point3<f32>>::new();
        let tree = KdTree::new(&cloud);
        assert!(tree.is_empty());

        let mut result = vec![1, 2];
        Searcher::search(&tree, &Vector4::zeros(), SearchType::Knn(3), &mut result);
        assert!(result.is_empty());
    }
}
