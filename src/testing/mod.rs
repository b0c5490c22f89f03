//! Testing utilities for rankloss.
//!
//! Shared by unit tests, integration tests and benchmarks:
//!
//! - seeded synthetic batches ([`ranking_batch`], [`gaussian_scores`], [`random_labels`])
//! - finite-difference gradient checking ([`GradientChecker`])
//! - array assertions
//!
//! ```
//! use rankloss::testing::{ranking_batch, GradientChecker};
//! use rankloss::data::LabelsView;
//! use rankloss::training::{Norm, RankingLossConfig, RankingLossKernel};
//!
//! let kernel = RankingLossKernel::new(RankingLossConfig::multiclass_hinge(Norm::L2, 5).unwrap()).unwrap();
//! let (scores, labels) = ranking_batch(10, 5, 10.0, 1701);
//! let labels = labels.to_vec();
//! let report = GradientChecker::default()
//!     .check(&kernel, scores.view(), LabelsView::from_slice(&labels))
//!     .unwrap();
//! assert!(report.passed());
//! ```

mod data;
mod gradient_check;

pub use data::{gaussian_scores, random_labels, ranking_batch};
pub use gradient_check::{GradientCheckReport, GradientChecker, GradientMismatch};

use ndarray::ArrayView2;

/// Default tolerance for comparing f32 gradients.
pub const DEFAULT_TOLERANCE: f32 = 1e-5;

/// Assert that two arrays have the same shape and are element-wise within
/// `tolerance`.
///
/// # Panics
///
/// Panics on a shape mismatch or on the first element outside tolerance.
pub fn assert_array_approx_eq(
    actual: ArrayView2<'_, f32>,
    expected: ArrayView2<'_, f32>,
    tolerance: f32,
    context: &str,
) {
    assert_eq!(
        actual.dim(),
        expected.dim(),
        "{context}: shape mismatch - got {:?}, expected {:?}",
        actual.dim(),
        expected.dim()
    );

    for ((i, j), a) in actual.indexed_iter() {
        let e = expected[[i, j]];
        let diff = (a - e).abs();
        assert!(
            diff <= tolerance,
            "{context}[{i}, {j}]: {a} ≠ {e} (diff={diff}, tolerance={tolerance})"
        );
    }
}

/// Assert that every row of `grads` sums to zero within `tolerance`.
///
/// Pairwise hinge gradients move the true class against its competitors, so
/// each row is balanced.
pub fn assert_rows_balanced(grads: ArrayView2<'_, f32>, tolerance: f32) {
    for (sample, row) in grads.outer_iter().enumerate() {
        let sum: f32 = row.sum();
        assert!(
            sum.abs() <= tolerance,
            "row {sample} sums to {sum} (tolerance={tolerance})"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn approx_eq_within_tolerance() {
        let a = array![[1.0f32, 2.0], [3.0, 4.0]];
        let b = array![[1.0f32, 2.000001], [3.0, 4.0]];
        assert_array_approx_eq(a.view(), b.view(), DEFAULT_TOLERANCE, "close");
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn approx_eq_rejects_shape_mismatch() {
        let a = array![[1.0f32, 2.0]];
        let b = array![[1.0f32], [2.0]];
        assert_array_approx_eq(a.view(), b.view(), DEFAULT_TOLERANCE, "shape");
    }

    #[test]
    #[should_panic(expected = "row 1")]
    fn unbalanced_row_detected() {
        let g = array![[1.0f32, -1.0], [0.5, 0.0]];
        assert_rows_balanced(g.view(), 1e-6);
    }
}
