use std::cmp::Ordering;

use cylfit_common::point::Point;
use nalgebra::{RealField, Scalar, Vector3, Vector4};

use crate::ResultSet;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node<'a, T: Scalar> {
    Leaf {
        index: usize,
        coord: &'a Vector4<T>,
    },
    Branch {
        children: Box<[Node<'a, T>; 2]>,
        dim: usize,
        value: T,
    },
}

impl<'a, T: Scalar> Node<'a, T> {
    pub(crate) fn new_leaf(index: usize, coord: &'a Vector4<T>) -> Self {
        Node::Leaf { index, coord }
    }
}

/// Picks the dimension of highest variance, avoiding `last` when another
/// dimension still spreads.
fn split_dim<T: RealField, P: Point<Data = T>>(
    coords: &[P],
    indices: &[usize],
    last: Option<usize>,
) -> usize {
    let num = nalgebra::convert::<f64, T>(indices.len() as f64);
    let sum = { indices.iter() }
        .map(|&i| coords[i].coords().xyz())
        .fold(Vector3::zeros(), |acc, coord| acc + coord);
    let mean = sum / num;

    let var = { indices.iter() }.map(|&i| coords[i].coords().xyz()).fold(
        Vector3::zeros(),
        |acc, coord| {
            let diff = coord - &mean;
            acc + diff.component_mul(&diff)
        },
    );

    let dim = var.imax();
    if Some(dim) == last {
        { var.iter().enumerate() }
            .filter(|(i, v)| *i != dim && **v > T::zero())
            .fold(None, |acc: Option<usize>, (i, v)| match acc {
                Some(d) if var[d] >= *v => acc,
                _ => Some(i),
            })
            .unwrap_or(dim)
    } else {
        dim
    }
}

impl<'a, T: RealField> Node<'a, T> {
    /// Builds the subtree over `indices`, which must not be empty.
    ///
    /// Points left of the split have `coord[dim] <= value`, points right of
    /// it have `coord[dim] >= value`.
    pub fn build<P>(coords: &'a [P], indices: &mut [usize], last_dim: Option<usize>) -> Self
    where
        P: Point<Data = T>,
    {
        if indices.len() == 1 {
            return Node::new_leaf(indices[0], coords[indices[0]].coords());
        }

        let dim = split_dim(coords, indices, last_dim);
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            { coords[a].coords()[dim].partial_cmp(&coords[b].coords()[dim]) }
                .unwrap_or(Ordering::Equal)
        });
        let value = coords[indices[mid]].coords()[dim].clone();

        let (left, right) = indices.split_at_mut(mid);
        let left = Node::build(coords, left, Some(dim));
        let right = Node::build(coords, right, Some(dim));

        Node::Branch {
            children: Box::new([left, right]),
            dim,
            value,
        }
    }
}

impl<'a, T: RealField> Node<'a, T> {
    #[inline]
    fn should_visit(result: &impl ResultSet<Key = T, Value = usize>, min_distance: &T) -> bool {
        !result.is_full() || result.max_key() > Some(min_distance)
    }

    pub fn search_exact(
        &self,
        pivot: &Vector4<T>,
        result: &mut impl ResultSet<Key = T, Value = usize>,
    ) {
        match self {
            Node::Leaf { coord, index } => {
                let distance = (coord.xyz() - pivot.xyz()).norm();
                result.push(distance, *index);
            }
            Node::Branch {
                children,
                dim,
                value,
            } => {
                let [left, right] = &**children;
                let (next, other) = if pivot[*dim] < *value {
                    (left, right)
                } else {
                    (right, left)
                };

                next.search_exact(pivot, result);

                let min_distance = (pivot[*dim].clone() - value.clone()).abs();
                if Self::should_visit(result, &min_distance) {
                    other.search_exact(pivot, result)
                }
            }
        }
    }

    /// Same results as [`Node::search_exact`], walking the tree with an
    /// explicit stack of deferred branches instead of recursion.
    pub fn search(&self, pivot: &Vector4<T>, result: &mut impl ResultSet<Key = T, Value = usize>) {
        let mut other_branches = vec![(self, T::zero())];

        while let Some((mut node, min_distance)) = other_branches.pop() {
            if !Self::should_visit(result, &min_distance) {
                continue;
            }
            loop {
                match node {
                    Node::Leaf { index, coord } => {
                        let distance = (coord.xyz() - pivot.xyz()).norm();
                        result.push(distance, *index);
                        break;
                    }
                    Node::Branch {
                        children,
                        dim,
                        value,
                    } => {
                        let [left, right] = &**children;
                        let (next, other) = if pivot[*dim] < *value {
                            (left, right)
                        } else {
                            (right, left)
                        };

                        let min_distance = (pivot[*dim].clone() - value.clone()).abs();
                        if Self::should_visit(result, &min_distance) {
                            other_branches.push((other, min_distance))
                        }

                        node = next
                    }
                }
            }
        }
    }
}
