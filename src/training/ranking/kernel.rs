//! Forward and backward pass of the ranking losses.

use std::num::NonZeroUsize;
use std::sync::Arc;

use ndarray::{Array2, ArrayViewMut1, ArrayViewMut2};
use rayon::ThreadPool;
use tracing::{debug, trace};

use super::weights::{class_sign, pair_weight, Formulation};
use super::{ConfigError, MarginMatrix, Norm, RankingLossConfig, WeightType};
use crate::data::{DataError, LabelsView, ScoresView};
use crate::training::{LossError, LossFn, PropagateDown};
use crate::utils::{build_thread_pool, Parallelism};

/// Multiclass ranking (hinge) loss kernel.
///
/// Computes, for a batch of per-class scores and labels, the batch-mean
/// hinge loss ([`evaluate`](Self::evaluate)) and its exact gradient with
/// respect to the scores ([`gradient_into`](Self::gradient_into)).
///
/// # Penalties
///
/// Uniform and Quadratic weights compare each competitor `j ≠ y` with the
/// true class `y`:
///
/// - margin: `m = 1 + s_j − s_y`
/// - L1 term: `w·max(0, m)`
/// - L2 term: `(w·max(0, m))²`
///
/// ExponentialDistance compares every class, the true class included, with
/// a unit margin:
///
/// - margin: `m = 1 + s_j` (competitors), `m = 1 − s_y` (true class)
/// - L1 term: `w·max(0, m)`
/// - L2 term: `w·max(0, m)²`
///
/// The loss is the sum of all terms divided by the number of samples.
///
/// # Threads
///
/// With `n_threads > 1` the kernel owns a pool of exactly that many workers
/// and runs all row-parallel work inside it. Clones share the pool.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use rankloss::data::{LabelsView, ScoresView};
/// use rankloss::training::{Norm, RankingLossConfig, RankingLossKernel};
///
/// let kernel = RankingLossKernel::new(RankingLossConfig::multiclass_hinge(Norm::L1, 3).unwrap()).unwrap();
/// let scores = array![[2.0f32, 1.5, -1.0]];
/// let labels = [0.0f32];
///
/// // Only class 1 violates the margin: 1 + 1.5 - 2.0 = 0.5
/// let loss = kernel.evaluate(ScoresView::new(scores.view()), LabelsView::from_slice(&labels)).unwrap();
/// assert!((loss - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct RankingLossKernel {
    config: RankingLossConfig,
    parallelism: Parallelism,
    pool: Option<Arc<ThreadPool>>,
}

impl RankingLossKernel {
    /// Create a kernel from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::Config`] if the configuration is invalid or the
    /// pool for `n_threads` cannot be started.
    pub fn new(config: RankingLossConfig) -> Result<Self, LossError> {
        config.validate()?;
        let n_threads = config.n_threads.map_or(0, NonZeroUsize::get);
        let pool = build_thread_pool(n_threads).map_err(|e| ConfigError::ThreadPool {
            n_threads,
            reason: e.to_string(),
        })?;
        if pool.is_some() {
            debug!(n_threads, "started dedicated ranking loss pool");
        }
        let parallelism = config.parallelism();
        Ok(Self {
            config,
            parallelism,
            pool: pool.map(Arc::new),
        })
    }

    /// Override the execution mode chosen from `n_threads`.
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// The kernel configuration.
    pub fn config(&self) -> &RankingLossConfig {
        &self.config
    }

    #[inline]
    pub fn norm(&self) -> Norm {
        self.config.norm
    }

    #[inline]
    pub fn weight_type(&self) -> WeightType {
        self.config.weight_type
    }

    #[inline]
    pub fn formulation(&self) -> Formulation {
        self.config.weight_type.formulation()
    }

    #[inline]
    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    /// Run `op` inside the kernel's dedicated pool, or on the current pool
    /// when there is none.
    pub fn install<T: Send>(&self, op: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    // =========================================================================
    // Margins
    // =========================================================================

    /// Validate a batch and compute its margins.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] (wrapped) for an empty batch, a class count
    /// other than `n_classes`, a label count other than the sample count, or
    /// a label that is not a class index.
    pub fn margins(
        &self,
        scores: ScoresView<'_>,
        labels: LabelsView<'_>,
    ) -> Result<MarginMatrix, LossError> {
        let (n_samples, n_classes) = scores.dim();
        if n_samples == 0 {
            return Err(DataError::EmptyBatch.into());
        }
        if n_classes != self.config.n_classes {
            return Err(DataError::ClassCountMismatch {
                expected: self.config.n_classes,
                got: n_classes,
            }
            .into());
        }
        if labels.n_samples() != n_samples {
            return Err(DataError::BatchSizeMismatch {
                samples: n_samples,
                labels: labels.n_samples(),
            }
            .into());
        }
        let class_indices = labels.class_indices(n_classes)?;

        Ok(self.install(|| {
            MarginMatrix::compute(
                scores,
                class_indices,
                self.config.weight_type,
                self.parallelism,
            )
        }))
    }

    fn check_margins(&self, margins: &MarginMatrix) -> Result<(), LossError> {
        if margins.n_classes() != self.config.n_classes
            || margins.weight_type() != self.config.weight_type
        {
            return Err(LossError::ForeignMargins {
                expected_classes: self.config.n_classes,
                expected_weight: self.config.weight_type,
                found_classes: margins.n_classes(),
                found_weight: margins.weight_type(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Forward
    // =========================================================================

    /// Batch-mean loss.
    pub fn evaluate(&self, scores: ScoresView<'_>, labels: LabelsView<'_>) -> Result<f64, LossError> {
        let margins = self.margins(scores, labels)?;
        self.loss_from_margins(&margins)
    }

    /// Batch-mean loss together with the margins it was computed from.
    ///
    /// Pass the margins to [`gradient_from_margins_into`](Self::gradient_from_margins_into)
    /// to skip recomputing them in the backward pass.
    pub fn evaluate_with_margins(
        &self,
        scores: ScoresView<'_>,
        labels: LabelsView<'_>,
    ) -> Result<(f64, MarginMatrix), LossError> {
        let margins = self.margins(scores, labels)?;
        let loss = self.loss_from_margins(&margins)?;
        Ok((loss, margins))
    }

    /// Reduce precomputed margins to the batch-mean loss.
    pub fn loss_from_margins(&self, margins: &MarginMatrix) -> Result<f64, LossError> {
        self.check_margins(margins)?;
        let n_samples = margins.n_samples();

        // Row sums are reduced in row order so parallel and sequential agree.
        let row_losses = self.install(|| {
            self.parallelism
                .maybe_par_map(0..n_samples, |sample| self.sample_loss(margins, sample))
        });
        let loss = row_losses.iter().sum::<f64>() / n_samples as f64;

        debug!(
            loss = self.name(),
            n_samples,
            n_classes = margins.n_classes(),
            norm = %self.config.norm,
            value = loss,
            "evaluated ranking loss"
        );
        Ok(loss)
    }

    /// Sum of the penalty terms of one sample.
    fn sample_loss(&self, margins: &MarginMatrix, sample: usize) -> f64 {
        let label = margins.label(sample);
        let n_classes = margins.n_classes();
        let formulation = self.formulation();

        margins
            .row(sample)
            .iter()
            .enumerate()
            .filter(|&(class, _)| margins.has_term(sample, class))
            .map(|(class, &margin)| {
                let hinge = margin.max(0.0);
                let weight = pair_weight(self.config.weight_type, label, class, n_classes);
                match (self.config.norm, formulation) {
                    (Norm::L1, _) => hinge * weight,
                    (Norm::L2, Formulation::Pairwise) => {
                        let penalty = hinge * weight;
                        penalty * penalty
                    }
                    (Norm::L2, Formulation::LabelWise) => weight * hinge * hinge,
                }
            })
            .sum()
    }

    // =========================================================================
    // Backward
    // =========================================================================

    /// Gradient of `loss_weight * loss` with respect to the scores.
    ///
    /// # Errors
    ///
    /// - [`LossError::LabelGradient`] if `propagate_down.labels` is set
    ///   (checked before anything else)
    /// - [`DataError::GradientShapeMismatch`] if `grads` doesn't match `scores`
    /// - any error of [`margins`](Self::margins)
    ///
    /// When `propagate_down.scores` is false, `grads` is left untouched.
    pub fn gradient_into(
        &self,
        scores: ScoresView<'_>,
        labels: LabelsView<'_>,
        loss_weight: f32,
        propagate_down: PropagateDown,
        grads: ArrayViewMut2<'_, f32>,
    ) -> Result<(), LossError> {
        if propagate_down.labels {
            return Err(LossError::LabelGradient { loss: self.name() });
        }
        if !propagate_down.scores {
            return Ok(());
        }
        if grads.dim() != scores.dim() {
            return Err(DataError::GradientShapeMismatch {
                expected: scores.dim(),
                got: grads.dim(),
            }
            .into());
        }
        let margins = self.margins(scores, labels)?;
        self.gradient_from_margins_into(&margins, loss_weight, grads)
    }

    /// Allocating variant of [`gradient_into`](Self::gradient_into) for the
    /// scores input.
    pub fn gradient(
        &self,
        scores: ScoresView<'_>,
        labels: LabelsView<'_>,
        loss_weight: f32,
    ) -> Result<Array2<f32>, LossError> {
        let mut grads = Array2::<f32>::zeros(scores.dim());
        self.gradient_into(
            scores,
            labels,
            loss_weight,
            PropagateDown::scores_only(),
            grads.view_mut(),
        )?;
        Ok(grads)
    }

    /// Gradient from precomputed margins.
    pub fn gradient_from_margins_into(
        &self,
        margins: &MarginMatrix,
        loss_weight: f32,
        mut grads: ArrayViewMut2<'_, f32>,
    ) -> Result<(), LossError> {
        self.check_margins(margins)?;
        if grads.dim() != margins.dim() {
            return Err(DataError::GradientShapeMismatch {
                expected: margins.dim(),
                got: grads.dim(),
            }
            .into());
        }

        // Chain rule for the batch mean, and the factor 2 of the square for L2.
        let n_samples = margins.n_samples() as f64;
        let scale = match self.config.norm {
            Norm::L1 => loss_weight as f64 / n_samples,
            Norm::L2 => 2.0 * loss_weight as f64 / n_samples,
        };

        self.install(|| {
            self.parallelism.maybe_par_bridge_for_each(
                grads.outer_iter_mut().enumerate(),
                |(sample, row)| self.sample_gradient(margins, sample, scale, row),
            )
        });

        debug!(
            loss = self.name(),
            n_samples = margins.n_samples(),
            loss_weight,
            scale,
            "computed ranking loss gradient"
        );
        Ok(())
    }

    /// Write the scaled gradient of one sample into `out`.
    fn sample_gradient(
        &self,
        margins: &MarginMatrix,
        sample: usize,
        scale: f64,
        mut out: ArrayViewMut1<'_, f32>,
    ) {
        let label = margins.label(sample);
        let n_classes = margins.n_classes();
        let weight_type = self.config.weight_type;
        let norm = self.config.norm;
        let mut active = 0usize;

        match self.formulation() {
            Formulation::Pairwise => {
                // The true class collects the negated competitor gradients.
                let mut true_class = 0.0f64;
                for (class, (&margin, g)) in margins.row(sample).iter().zip(out.iter_mut()).enumerate() {
                    if class == label {
                        continue;
                    }
                    let d = if margin > 0.0 {
                        active += 1;
                        let w = pair_weight(weight_type, label, class, n_classes);
                        match norm {
                            Norm::L1 => w,
                            Norm::L2 => w * w * margin,
                        }
                    } else {
                        0.0
                    };
                    *g = (d * scale) as f32;
                    true_class -= d;
                }
                out[label] = (true_class * scale) as f32;
            }
            Formulation::LabelWise => {
                for (class, (&margin, g)) in margins.row(sample).iter().zip(out.iter_mut()).enumerate() {
                    let d = if margin > 0.0 {
                        active += 1;
                        let w = pair_weight(weight_type, label, class, n_classes);
                        let sign = class_sign(label, class);
                        match norm {
                            Norm::L1 => sign * w,
                            Norm::L2 => sign * w * margin,
                        }
                    } else {
                        0.0
                    };
                    *g = (d * scale) as f32;
                }
            }
        }

        trace!(sample, label, active, "sample gradient");
    }
}

impl LossFn for RankingLossKernel {
    fn n_classes(&self) -> usize {
        self.config.n_classes
    }

    fn evaluate(&self, scores: ScoresView<'_>, labels: LabelsView<'_>) -> Result<f64, LossError> {
        RankingLossKernel::evaluate(self, scores, labels)
    }

    fn compute_gradients_into(
        &self,
        scores: ScoresView<'_>,
        labels: LabelsView<'_>,
        loss_weight: f32,
        propagate_down: PropagateDown,
        grads: ArrayViewMut2<'_, f32>,
    ) -> Result<(), LossError> {
        self.gradient_into(scores, labels, loss_weight, propagate_down, grads)
    }

    fn name(&self) -> &'static str {
        match self.config.weight_type {
            WeightType::Uniform => "multiclass_hinge",
            WeightType::Quadratic => "quadratic_weighted_hinge",
            WeightType::ExponentialDistance => "exponential_labelwise_hinge",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
