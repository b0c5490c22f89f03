//! Per class-pair weights and margins.
//!
//! These are the only places the margin and weight formulas live; both the
//! forward and the backward pass go through them.

use ndarray::ArrayView1;

use super::WeightType;

/// How classes are compared within one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formulation {
    /// Each competitor `j ≠ y` against the true class:
    /// `margin = 1 + s_j − s_y`. The true-class column carries no term.
    Pairwise,
    /// Each class against a fixed unit margin:
    /// `margin = 1 + s_j` for competitors, `1 − s_y` for the true class.
    LabelWise,
}

impl Formulation {
    /// Whether the true-class column has its own term in the loss.
    #[inline]
    pub fn includes_true_class(self) -> bool {
        matches!(self, Formulation::LabelWise)
    }
}

impl WeightType {
    /// Formulation used by this weighting scheme.
    #[inline]
    pub fn formulation(self) -> Formulation {
        match self {
            WeightType::Uniform | WeightType::Quadratic => Formulation::Pairwise,
            WeightType::ExponentialDistance => Formulation::LabelWise,
        }
    }
}

/// Weight of the `(label, class)` pair.
///
/// Requires `n_classes >= 2`, which config validation guarantees.
#[inline]
pub fn pair_weight(weight_type: WeightType, label: usize, class: usize, n_classes: usize) -> f64 {
    debug_assert!(n_classes >= 2);
    match weight_type {
        WeightType::Uniform => 1.0,
        WeightType::Quadratic => normalized_sq_distance(label, class, n_classes),
        WeightType::ExponentialDistance => normalized_sq_distance(label, class, n_classes).exp(),
    }
}

/// `(label − class)² / (n_classes − 1)²`, in `[0, 1]`.
#[inline]
fn normalized_sq_distance(label: usize, class: usize, n_classes: usize) -> f64 {
    let distance = label as f64 - class as f64;
    let span = (n_classes - 1) as f64;
    (distance * distance) / (span * span)
}

/// Sign of a class score inside its label-wise margin.
#[inline]
pub fn class_sign(label: usize, class: usize) -> f64 {
    if class == label { -1.0 } else { 1.0 }
}

/// Raw (unclamped) margin of `class` for one sample.
///
/// Pairwise margins of the true class are defined as zero.
#[inline]
pub fn pair_margin(
    formulation: Formulation,
    scores: ArrayView1<'_, f32>,
    label: usize,
    class: usize,
) -> f64 {
    match formulation {
        Formulation::Pairwise => {
            if class == label {
                0.0
            } else {
                1.0 + scores[class] as f64 - scores[label] as f64
            }
        }
        Formulation::LabelWise => 1.0 + class_sign(label, class) * scores[class] as f64,
    }
}
