//! Finite-difference gradient checking for [`LossFn`] implementations.
//!
//! Every score is perturbed by `±step` and the central difference of the
//! objective `loss_weight * evaluate(..)` is compared with the analytic
//! gradient. Hinge losses are only piecewise smooth, so when the central
//! difference straddles a kink the check falls back to the one-sided
//! differences: the analytic value must lie between them (up to tolerance).

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::data::{LabelsView, ScoresView};
use crate::training::{LossError, LossFn, LossFnExt};

/// A single gradient entry that failed the check.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientMismatch {
    /// `(sample, class)` of the entry.
    pub index: (usize, usize),
    pub analytic: f64,
    pub estimated: f64,
    pub tolerance: f64,
}

/// Result of a full gradient check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientCheckReport {
    /// Number of entries checked.
    pub n_checked: usize,
    /// Entries accepted through the one-sided fallback.
    pub n_kinks: usize,
    /// Largest `|analytic − central estimate|` seen.
    pub max_abs_error: f64,
    /// Entries outside tolerance.
    pub failures: Vec<GradientMismatch>,
}

impl GradientCheckReport {
    /// `true` if no entry failed.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Finite-difference checker.
///
/// Defaults: `step = 1e-2`, `threshold = 2e-3`, `loss_weight = 2.0`.
/// The tolerance of an entry is `threshold * max(|analytic|, |estimate|, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientChecker {
    step: f32,
    threshold: f64,
    loss_weight: f32,
}

impl Default for GradientChecker {
    fn default() -> Self {
        Self {
            step: 1e-2,
            threshold: 2e-3,
            loss_weight: 2.0,
        }
    }
}

impl GradientChecker {
    pub fn new(step: f32, threshold: f64) -> Self {
        assert!(step > 0.0, "step must be positive, got {step}");
        assert!(threshold > 0.0, "threshold must be positive, got {threshold}");
        Self {
            step,
            threshold,
            ..Self::default()
        }
    }

    /// Upstream multiplier applied to both the objective and the gradient.
    pub fn with_loss_weight(mut self, loss_weight: f32) -> Self {
        self.loss_weight = loss_weight;
        self
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn loss_weight(&self) -> f32 {
        self.loss_weight
    }

    /// Check every entry of the gradient with respect to `scores`.
    ///
    /// # Errors
    ///
    /// Propagates any error the loss returns for these inputs.
    pub fn check<L: LossFn + ?Sized>(
        &self,
        loss: &L,
        scores: ArrayView2<'_, f32>,
        labels: LabelsView<'_>,
    ) -> Result<GradientCheckReport, LossError> {
        let analytic = loss.compute_gradients(ScoresView::new(scores), labels, self.loss_weight)?;
        let mut probe = scores.to_owned();
        let base = self.objective(loss, &probe, labels)?;

        let mut report = GradientCheckReport::default();
        for ((sample, class), &computed) in analytic.indexed_iter() {
            let x = probe[[sample, class]];
            let x_plus = x + self.step;
            let x_minus = x - self.step;

            probe[[sample, class]] = x_plus;
            let f_plus = self.objective(loss, &probe, labels)?;
            probe[[sample, class]] = x_minus;
            let f_minus = self.objective(loss, &probe, labels)?;
            probe[[sample, class]] = x;

            // Divide by the perturbation actually applied after f32 rounding.
            let estimated = (f_plus - f_minus) / (x_plus as f64 - x_minus as f64);
            let computed = computed as f64;
            let error = (computed - estimated).abs();
            let tolerance = self.threshold * computed.abs().max(estimated.abs()).max(1.0);

            report.n_checked += 1;
            report.max_abs_error = report.max_abs_error.max(error);
            if error <= tolerance {
                continue;
            }

            // Each objective is convex in a single score, so the one-sided
            // slopes bracket every subgradient at a kink.
            let forward = (f_plus - base) / (x_plus as f64 - x as f64);
            let backward = (base - f_minus) / (x as f64 - x_minus as f64);
            if computed >= backward - tolerance && computed <= forward + tolerance {
                report.n_kinks += 1;
            } else {
                report.failures.push(GradientMismatch {
                    index: (sample, class),
                    analytic: computed,
                    estimated,
                    tolerance,
                });
            }
        }

        debug!(
            loss = loss.name(),
            n_checked = report.n_checked,
            n_kinks = report.n_kinks,
            n_failures = report.failures.len(),
            max_abs_error = report.max_abs_error,
            "gradient check finished"
        );
        Ok(report)
    }

    fn objective<L: LossFn + ?Sized>(
        &self,
        loss: &L,
        scores: &Array2<f32>,
        labels: LabelsView<'_>,
    ) -> Result<f64, LossError> {
        Ok(self.loss_weight as f64 * loss.evaluate(ScoresView::new(scores.view()), labels)?)
    }
}
