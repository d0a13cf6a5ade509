//! Dense distance kernels and sparse-aware term alignment.
//!
//! The dense kernels unroll by eight lanes so the compiler can auto-vectorize
//! them. [`align`] walks two value sets of any storage kind and feeds every
//! index in the union of their supports to a callback.

use crate::types::VectorValues;
use std::cmp::Ordering;
use std::collections::BTreeMap;

const LANES: usize = 8;

/// Squared L2 distance between two dense slices of equal length.
#[inline]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let mut acc = [0.0f32; LANES];
    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let a_tail = a_chunks.remainder();
    let b_tail = b_chunks.remainder();

    for (x, y) in a_chunks.zip(b_chunks) {
        for lane in 0..LANES {
            let d = x[lane] - y[lane];
            acc[lane] += d * d;
        }
    }

    let tail: f32 = a_tail
        .iter()
        .zip(b_tail)
        .map(|(x, y)| (x - y) * (x - y))
        .sum();

    acc.iter().sum::<f32>() + tail
}

/// L2 distance between two dense slices.
#[inline]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    l2_distance_squared(a, b).sqrt()
}

/// Dot product of two dense slices.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let mut acc = [0.0f32; LANES];
    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let a_tail = a_chunks.remainder();
    let b_tail = b_chunks.remainder();

    for (x, y) in a_chunks.zip(b_chunks) {
        for lane in 0..LANES {
            acc[lane] += x[lane] * y[lane];
        }
    }

    let tail: f32 = a_tail.iter().zip(b_tail).map(|(x, y)| x * y).sum();

    acc.iter().sum::<f32>() + tail
}

/// Dot product of sparse entries with a dense slice.
///
/// Products are accumulated in the lanes [`dot_product`] would use for the
/// same indices, so a sparse and a dense copy of one vector project to the
/// bit-identical value. Entries past the slice contribute nothing.
pub fn sparse_dot_product(entries: &BTreeMap<usize, f32>, dense: &[f32]) -> f32 {
    let body = dense.len() / LANES * LANES;

    let mut acc = [0.0f32; LANES];
    for (&i, &v) in entries.range(..body) {
        acc[i % LANES] += v * dense[i];
    }

    let tail: f32 = entries
        .range(body..)
        .filter_map(|(&i, &v)| dense.get(i).map(|d| v * d))
        .sum();

    acc.iter().sum::<f32>() + tail
}

/// L2 norm of a dense slice.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    dot_product(v, v).sqrt()
}

/// Visit every index in the union of both supports as `(left, right)`.
///
/// A side that does not store the index contributes `0.0`. Returns the number
/// of indices stored by *both* sides.
pub fn align<F>(left: &VectorValues, right: &VectorValues, mut visit: F) -> usize
where
    F: FnMut(f32, f32),
{
    match (left, right) {
        (VectorValues::Dense(l), VectorValues::Dense(r)) => {
            let overlap = l.len().min(r.len());
            for (x, y) in l.iter().zip(r) {
                visit(*x, *y);
            }
            // Lengths only differ when called without validation.
            for x in l.iter().skip(overlap) {
                visit(*x, 0.0);
            }
            for y in r.iter().skip(overlap) {
                visit(0.0, *y);
            }
            overlap
        }
        (VectorValues::Dense(dense), VectorValues::Sparse(sparse)) => {
            align_dense_sparse(dense, sparse, |d, s| visit(d, s))
        }
        (VectorValues::Sparse(sparse), VectorValues::Dense(dense)) => {
            align_dense_sparse(dense, sparse, |d, s| visit(s, d))
        }
        (VectorValues::Sparse(l), VectorValues::Sparse(r)) => {
            let mut overlap = 0;
            let mut li = l.iter().peekable();
            let mut ri = r.iter().peekable();
            loop {
                match (li.peek(), ri.peek()) {
                    (Some((lk, lv)), Some((rk, rv))) => match lk.cmp(rk) {
                        Ordering::Less => {
                            visit(**lv, 0.0);
                            li.next();
                        }
                        Ordering::Greater => {
                            visit(0.0, **rv);
                            ri.next();
                        }
                        Ordering::Equal => {
                            visit(**lv, **rv);
                            overlap += 1;
                            li.next();
                            ri.next();
                        }
                    },
                    (Some((_, lv)), None) => {
                        visit(**lv, 0.0);
                        li.next();
                    }
                    (None, Some((_, rv))) => {
                        visit(0.0, **rv);
                        ri.next();
                    }
                    (None, None) => break,
                }
            }
            overlap
        }
    }
}

fn align_dense_sparse<F>(
    dense: &[f32],
    sparse: &BTreeMap<usize, f32>,
    mut visit: F,
) -> usize
where
    F: FnMut(f32, f32),
{
    let mut overlap = 0;
    for (i, &d) in dense.iter().enumerate() {
        match sparse.get(&i) {
            Some(&s) => {
                overlap += 1;
                visit(d, s);
            }
            None => visit(d, 0.0),
        }
    }
    for (_, &s) in sparse.range(dense.len()..) {
        visit(0.0, s);
    }
    overlap
}
