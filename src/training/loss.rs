//! Loss function trait and its shared error and capability types.
//!
//! A loss has two inputs, the class scores (input 0) and the labels
//! (input 1), and produces a scalar. Only the scores are differentiable.

use ndarray::{Array2, ArrayViewMut2};

use crate::data::{DataError, LabelsView, ScoresView};
use crate::training::ranking::ConfigError;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by loss evaluation and differentiation.
///
/// None of these are recoverable inside the kernel; a failed call writes
/// nothing and the embedding framework decides whether to abort.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LossError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scores, labels or the output buffer don't fit the kernel.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Gradient propagation into the label input was requested.
    #[error("{loss} loss cannot backpropagate to label inputs")]
    LabelGradient { loss: &'static str },

    /// A margin matrix from a differently configured kernel was supplied.
    #[error("margins were computed for {found_classes} classes with {found_weight} weights, kernel expects {expected_classes} classes with {expected_weight} weights")]
    ForeignMargins {
        expected_classes: usize,
        expected_weight: crate::training::ranking::WeightType,
        found_classes: usize,
        found_weight: crate::training::ranking::WeightType,
    },
}

// =============================================================================
// Inputs and propagation flags
// =============================================================================

/// The two inputs of a loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LossInput {
    /// Per-class activation scores (input 0).
    Scores,
    /// Ground-truth class indices (input 1).
    Labels,
}

impl LossInput {
    /// Positional index of the input.
    pub fn index(self) -> usize {
        match self {
            Self::Scores => 0,
            Self::Labels => 1,
        }
    }

    /// Input at a positional index.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Scores),
            1 => Some(Self::Labels),
            _ => None,
        }
    }
}

/// Which inputs the caller wants gradients for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagateDown {
    pub scores: bool,
    pub labels: bool,
}

impl PropagateDown {
    /// Gradient for the scores only (the normal case).
    pub fn scores_only() -> Self {
        Self {
            scores: true,
            labels: false,
        }
    }

    /// No gradient requested.
    pub fn none() -> Self {
        Self {
            scores: false,
            labels: false,
        }
    }

    /// Whether a gradient is requested for `input`.
    pub fn is_requested(self, input: LossInput) -> bool {
        match input {
            LossInput::Scores => self.scores,
            LossInput::Labels => self.labels,
        }
    }
}

impl Default for PropagateDown {
    fn default() -> Self {
        Self::scores_only()
    }
}

/// Positional flags, `[scores, labels]`.
impl From<[bool; 2]> for PropagateDown {
    fn from([scores, labels]: [bool; 2]) -> Self {
        Self { scores, labels }
    }
}

// =============================================================================
// LossFn Trait
// =============================================================================

/// A loss over a batch of class scores and integer labels.
///
/// # Layout
///
/// - `scores`: row-major `[n_samples, n_classes]`
/// - `labels`: `[n_samples]` class indices
/// - `grads`: row-major `[n_samples, n_classes]`, matching `scores`
pub trait LossFn: Send + Sync {
    /// Number of classes (scores per sample) this loss expects.
    fn n_classes(&self) -> usize;

    /// Batch-mean loss value.
    fn evaluate(&self, scores: ScoresView<'_>, labels: LabelsView<'_>) -> Result<f64, LossError>;

    /// Gradient of `loss_weight * evaluate(..)` with respect to the scores.
    ///
    /// # Arguments
    ///
    /// * `loss_weight` - Upstream chain-rule multiplier
    /// * `propagate_down` - Requested inputs; a label request is an error
    /// * `grads` - Output buffer, overwritten entirely on success
    fn compute_gradients_into(
        &self,
        scores: ScoresView<'_>,
        labels: LabelsView<'_>,
        loss_weight: f32,
        propagate_down: PropagateDown,
        grads: ArrayViewMut2<'_, f32>,
    ) -> Result<(), LossError>;

    /// Whether a gradient may be forced into `input`.
    ///
    /// Labels are categorical, so only the scores qualify.
    fn allow_force_backward(&self, input: LossInput) -> bool {
        input == LossInput::Scores
    }

    /// Name of the loss (for logging and errors).
    fn name(&self) -> &'static str;
}

/// Allocating helpers on top of [`LossFn`].
pub trait LossFnExt: LossFn {
    /// Gradient with respect to the scores in a freshly allocated array.
    fn compute_gradients(
        &self,
        scores: ScoresView<'_>,
        labels: LabelsView<'_>,
        loss_weight: f32,
    ) -> Result<Array2<f32>, LossError> {
        let mut grads = Array2::<f32>::zeros(scores.dim());
        self.compute_gradients_into(
            scores,
            labels,
            loss_weight,
            PropagateDown::scores_only(),
            grads.view_mut(),
        )?;
        Ok(grads)
    }
}

impl<T: LossFn + ?Sized> LossFnExt for T {}
