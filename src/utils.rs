use ndarray::prelude::*;
use ndarray::Data;

use std::cmp::Ordering;

// argsort_by function from: https://github.com/rust-ndarray/ndarray/issues/1145
pub fn argsort_by<S, F>(arr: &ArrayBase<S, Ix1>, mut compare: F) -> Vec<usize>
where
    S: Data,
    F: FnMut(&S::Elem, &S::Elem) -> Ordering,
{
    let mut indices: Vec<usize> = (0..arr.len()).collect();
    indices.sort_by(move |&i, &j| compare(&arr[i], &arr[j]));
    indices
}

/// Index and value of the first maximum in `row`, `None` if empty.
pub(crate) fn first_max<'a>(row: impl IntoIterator<Item = &'a f32>) -> Option<(usize, f32)> {
    row.into_iter()
        .copied()
        .enumerate()
        .fold(None, |acc, (i, e)| match acc {
            Some((_, max)) if e <= max => acc,
            _ => Some((i, e)),
        })
}
