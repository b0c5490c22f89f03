//! Batch data views consumed by the loss kernels.
//!
//! - [`ScoresView`]: per-class activation scores, `[n_samples, n_classes]`
//! - [`LabelsView`]: ground-truth class index per sample
//!
//! Shape and label problems are reported as [`DataError`].

mod views;

pub use views::{LabelsView, ScoresView};

/// Errors raised while validating a batch against a kernel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// The batch has no samples.
    #[error("batch must contain at least one sample")]
    EmptyBatch,

    /// A flat buffer cannot be split evenly into samples.
    #[error("buffer of length {len} cannot be split into {n_samples} samples")]
    RaggedBuffer { len: usize, n_samples: usize },

    /// Scores have a different class count than the kernel was built for.
    #[error("scores have {got} classes per sample, expected {expected}")]
    ClassCountMismatch { expected: usize, got: usize },

    /// Scores and labels disagree on the batch size.
    #[error("{labels} labels supplied for {samples} samples")]
    BatchSizeMismatch { samples: usize, labels: usize },

    /// A label is not a valid class index.
    #[error("label {value} of sample {sample} is not a class index in [0, {n_classes})")]
    InvalidLabel {
        sample: usize,
        value: f32,
        n_classes: usize,
    },

    /// The gradient output buffer does not match the scores shape.
    #[error("gradient buffer has shape {got:?}, expected {expected:?}")]
    GradientShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
}
