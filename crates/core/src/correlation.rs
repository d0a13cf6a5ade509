//! Correlation metrics: distances and similarities between two vectors.
//!
//! Every metric is computed over the *aligned terms* of both vectors (the
//! union of their supports, missing entries read as zero). When the two
//! supports share no index the vectors are incomparable and the metric
//! returns `f32::NAN`; callers filter such scores with [`is_incomparable`].

use crate::distance::{self, align};
use crate::error::{CoreError, CoreResult};
use crate::types::{Vector, VectorValues};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Whether smaller or larger scores mean "closer".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationKind {
    /// Lower is more similar, identity scores 0.
    Distance,
    /// Higher is more similar, identity scores 1.
    Similarity,
}

/// Supported correlation metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Correlation {
    /// Root of the summed squared differences.
    Euclidean,
    /// Root of the summed absolute differences.
    Manhattan,
    /// Summed squared differences divided by the overlap count.
    Mse,
    /// Largest absolute difference.
    Chebyshev,
    /// Cosine of the angle between the vectors.
    ///
    /// A side with zero norm scores `0.0`, so an all-zero vector is not
    /// similar to itself.
    Cosine,
    /// Dice coefficient of the non-zero index sets.
    ///
    /// Incomparable (`NaN`) when neither side has a non-zero value,
    /// including an all-zero vector compared with itself.
    Dice,
    /// Jaccard coefficient of the non-zero index sets.
    ///
    /// Incomparable (`NaN`) when neither side has a non-zero value,
    /// including an all-zero vector compared with itself.
    Jaccard,
    /// Extended Jaccard over the values.
    Tanimoto,
    /// Pearson correlation of the aligned terms.
    Pearson,
}

/// Whether a score is the "incomparable" sentinel.
#[inline]
pub fn is_incomparable(score: f32) -> bool {
    score.is_nan()
}

impl Correlation {
    pub const ALL: [Correlation; 9] = [
        Correlation::Euclidean,
        Correlation::Manhattan,
        Correlation::Mse,
        Correlation::Chebyshev,
        Correlation::Cosine,
        Correlation::Dice,
        Correlation::Jaccard,
        Correlation::Tanimoto,
        Correlation::Pearson,
    ];

    pub fn kind(self) -> CorrelationKind {
        match self {
            Correlation::Euclidean
            | Correlation::Manhattan
            | Correlation::Mse
            | Correlation::Chebyshev => CorrelationKind::Distance,
            Correlation::Cosine
            | Correlation::Dice
            | Correlation::Jaccard
            | Correlation::Tanimoto
            | Correlation::Pearson => CorrelationKind::Similarity,
        }
    }

    pub fn is_distance(self) -> bool {
        self.kind() == CorrelationKind::Distance
    }

    /// Score two vectors of equal dimension.
    pub fn score(self, left: &Vector, right: &Vector) -> CoreResult<f32> {
        if left.dimension() != right.dimension() {
            return Err(CoreError::DimensionMismatch {
                expected: left.dimension(),
                got: right.dimension(),
            });
        }
        Ok(self.coefficient(left.values(), right.values()))
    }

    /// Score two value sets without checking their dimensions.
    pub fn coefficient(self, left: &VectorValues, right: &VectorValues) -> f32 {
        match self {
            Correlation::Euclidean => euclidean(left, right),
            Correlation::Manhattan => manhattan(left, right),
            Correlation::Mse => mse(left, right),
            Correlation::Chebyshev => chebyshev(left, right),
            Correlation::Cosine => cosine(left, right),
            Correlation::Dice => dice(left, right),
            Correlation::Jaccard => jaccard(left, right),
            Correlation::Tanimoto => tanimoto(left, right),
            Correlation::Pearson => pearson(left, right),
        }
    }

    /// Order two scores best-first for this metric's kind.
    ///
    /// Incomparable scores sort after every comparable one.
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self.kind() {
                CorrelationKind::Distance => a.total_cmp(&b),
                CorrelationKind::Similarity => b.total_cmp(&a),
            },
        }
    }

    /// Score of a vector against itself.
    ///
    /// Similarities only reach it for vectors with a non-zero value, and
    /// `Pearson` also needs non-zero variance.
    pub fn identity(self) -> f32 {
        match self.kind() {
            CorrelationKind::Distance => 0.0,
            CorrelationKind::Similarity => 1.0,
        }
    }
}

impl Default for Correlation {
    fn default() -> Self {
        Correlation::Euclidean
    }
}

impl std::fmt::Display for Correlation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Correlation::Euclidean => "euclidean",
            Correlation::Manhattan => "manhattan",
            Correlation::Mse => "mse",
            Correlation::Chebyshev => "chebyshev",
            Correlation::Cosine => "cosine",
            Correlation::Dice => "dice",
            Correlation::Jaccard => "jaccard",
            Correlation::Tanimoto => "tanimoto",
            Correlation::Pearson => "pearson",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Correlation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Correlation::Euclidean),
            "manhattan" | "l1" => Ok(Correlation::Manhattan),
            "mse" | "msd" => Ok(Correlation::Mse),
            "chebyshev" | "linf" => Ok(Correlation::Chebyshev),
            "cosine" => Ok(Correlation::Cosine),
            "dice" => Ok(Correlation::Dice),
            "jaccard" => Ok(Correlation::Jaccard),
            "tanimoto" => Ok(Correlation::Tanimoto),
            "pearson" => Ok(Correlation::Pearson),
            _ => Err(format!("Unknown correlation: {}", s)),
        }
    }
}

/// Root of a non-negative accumulator; exact zero stays zero.
#[inline]
fn root(sum: f32) -> f32 {
    if sum == 0.0 {
        0.0
    } else {
        sum.sqrt()
    }
}

fn euclidean(left: &VectorValues, right: &VectorValues) -> f32 {
    if let (Some(l), Some(r)) = (left.as_dense(), right.as_dense()) {
        if l.len() == r.len() && !l.is_empty() {
            return root(distance::l2_distance_squared(l, r));
        }
    }
    let mut sum = 0.0f32;
    let overlap = align(left, right, |l, r| sum += (l - r) * (l - r));
    if overlap == 0 {
        return f32::NAN;
    }
    root(sum)
}

fn manhattan(left: &VectorValues, right: &VectorValues) -> f32 {
    let mut sum = 0.0f32;
    let overlap = align(left, right, |l, r| sum += (l - r).abs());
    if overlap == 0 {
        return f32::NAN;
    }
    root(sum)
}

fn mse(left: &VectorValues, right: &VectorValues) -> f32 {
    let mut sum = 0.0f32;
    let overlap = align(left, right, |l, r| sum += (l - r) * (l - r));
    if overlap == 0 {
        return f32::NAN;
    }
    if sum == 0.0 {
        return 0.0;
    }
    sum / overlap as f32
}

fn chebyshev(left: &VectorValues, right: &VectorValues) -> f32 {
    let mut max = 0.0f32;
    let overlap = align(left, right, |l, r| max = max.max((l - r).abs()));
    if overlap == 0 {
        return f32::NAN;
    }
    max
}

fn cosine(left: &VectorValues, right: &VectorValues) -> f32 {
    let (dot, left_sq, right_sq, overlap) = products(left, right);
    if overlap == 0 {
        return f32::NAN;
    }
    if left_sq == 0.0 || right_sq == 0.0 {
        return 0.0;
    }
    (dot / (left_sq.sqrt() * right_sq.sqrt())).clamp(-1.0, 1.0)
}

fn tanimoto(left: &VectorValues, right: &VectorValues) -> f32 {
    let (dot, left_sq, right_sq, overlap) = products(left, right);
    if overlap == 0 {
        return f32::NAN;
    }
    let denominator = left_sq + right_sq - dot;
    if denominator == 0.0 {
        return 0.0;
    }
    dot / denominator
}

/// `(l·r, ‖l‖², ‖r‖², overlap)`.
fn products(left: &VectorValues, right: &VectorValues) -> (f32, f32, f32, usize) {
    if let (Some(l), Some(r)) = (left.as_dense(), right.as_dense()) {
        if l.len() == r.len() {
            return (
                distance::dot_product(l, r),
                distance::dot_product(l, l),
                distance::dot_product(r, r),
                l.len(),
            );
        }
    }
    let (mut dot, mut left_sq, mut right_sq) = (0.0f32, 0.0f32, 0.0f32);
    let overlap = align(left, right, |l, r| {
        dot += l * r;
        left_sq += l * l;
        right_sq += r * r;
    });
    (dot, left_sq, right_sq, overlap)
}

/// Cardinalities of the non-zero index sets: `(|A∩B|, |A|, |B|)`.
fn set_counts(left: &VectorValues, right: &VectorValues) -> (usize, usize, usize, usize) {
    let (mut both, mut only_left, mut only_right) = (0usize, 0usize, 0usize);
    let overlap = align(left, right, |l, r| {
        let (in_left, in_right) = (l != 0.0, r != 0.0);
        both += (in_left && in_right) as usize;
        only_left += in_left as usize;
        only_right += in_right as usize;
    });
    (both, only_left, only_right, overlap)
}

fn dice(left: &VectorValues, right: &VectorValues) -> f32 {
    let (intersection, left_count, right_count, overlap) = set_counts(left, right);
    if overlap == 0 || left_count + right_count == 0 {
        return f32::NAN;
    }
    2.0 * intersection as f32 / (left_count + right_count) as f32
}

fn jaccard(left: &VectorValues, right: &VectorValues) -> f32 {
    let (intersection, left_count, right_count, overlap) = set_counts(left, right);
    let union = left_count + right_count - intersection;
    if overlap == 0 || union == 0 {
        return f32::NAN;
    }
    intersection as f32 / union as f32
}

fn pearson(left: &VectorValues, right: &VectorValues) -> f32 {
    let mut terms = 0usize;
    let (mut sum_l, mut sum_r) = (0.0f64, 0.0f64);
    let (mut sum_ll, mut sum_rr, mut sum_lr) = (0.0f64, 0.0f64, 0.0f64);
    let overlap = align(left, right, |l, r| {
        let (l, r) = (l as f64, r as f64);
        terms += 1;
        sum_l += l;
        sum_r += r;
        sum_ll += l * l;
        sum_rr += r * r;
        sum_lr += l * r;
    });
    if overlap == 0 {
        return f32::NAN;
    }
    let n = terms as f64;
    let covariance = sum_lr - sum_l * sum_r / n;
    let left_var = sum_ll - sum_l * sum_l / n;
    let right_var = sum_rr - sum_r * sum_r / n;
    if left_var <= 0.0 || right_var <= 0.0 {
        return f32::NAN;
    }
    (covariance / (left_var.sqrt() * right_var.sqrt())).clamp(-1.0, 1.0) as f32
}
