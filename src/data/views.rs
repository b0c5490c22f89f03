//! Borrowed views over a batch of class scores and labels.
//!
//! Both views are thin wrappers around `ndarray` views so callers can hand
//! over framework buffers without copying.
//!
//! # Layout
//!
//! Scores are **row-major** with shape `[n_samples, n_classes]`: one row per
//! sample, one column per class.
//!
//! ```text
//! scores: [s0_c0, s0_c1, ..., s0_cK, s1_c0, s1_c1, ..., s1_cK, ...]
//!         |------ sample 0 ------|  |------ sample 1 ------|
//! ```
//!
//! Index formula: `scores[sample * n_classes + class]`
//!
//! Labels are one class index per sample, stored as `f32` the way training
//! frameworks keep them next to activations.

use ndarray::{ArrayView1, ArrayView2, Axis};

use super::DataError;

// =============================================================================
// ScoresView
// =============================================================================

/// Read-only view of per-class activation scores, shape `[n_samples, n_classes]`.
#[derive(Debug, Clone, Copy)]
pub struct ScoresView<'a> {
    data: ArrayView2<'a, f32>,
}

impl<'a> ScoresView<'a> {
    /// Wrap an existing array view with shape `[n_samples, n_classes]`.
    pub fn new(data: ArrayView2<'a, f32>) -> Self {
        Self { data }
    }

    /// Build a view over a flat row-major buffer.
    ///
    /// `n_classes` is derived as `data.len() / n_samples`.
    ///
    /// # Errors
    ///
    /// [`DataError::EmptyBatch`] if `n_samples == 0`, and
    /// [`DataError::RaggedBuffer`] if the buffer length is not a multiple of
    /// `n_samples`.
    pub fn from_slice(data: &'a [f32], n_samples: usize) -> Result<Self, DataError> {
        if n_samples == 0 {
            return Err(DataError::EmptyBatch);
        }
        if data.len() % n_samples != 0 {
            return Err(DataError::RaggedBuffer {
                len: data.len(),
                n_samples,
            });
        }
        let n_classes = data.len() / n_samples;
        let view = ArrayView2::from_shape((n_samples, n_classes), data)
            .map_err(|_| DataError::RaggedBuffer {
                len: data.len(),
                n_samples,
            })?;
        Ok(Self { data: view })
    }

    /// Number of samples (rows).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of classes per sample (columns).
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.data.ncols()
    }

    /// Shape as `(n_samples, n_classes)`.
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Score of `class` for `sample`.
    #[inline]
    pub fn get(&self, sample: usize, class: usize) -> f32 {
        self.data[[sample, class]]
    }

    /// All class scores of one sample.
    #[inline]
    pub fn row(&self, sample: usize) -> ArrayView1<'a, f32> {
        self.data.index_axis_move(Axis(0), sample)
    }

    /// Get the underlying array view.
    pub fn view(&self) -> ArrayView2<'a, f32> {
        self.data
    }
}

impl<'a> From<ArrayView2<'a, f32>> for ScoresView<'a> {
    fn from(data: ArrayView2<'a, f32>) -> Self {
        Self::new(data)
    }
}

// =============================================================================
// LabelsView
// =============================================================================

/// Read-only view of ground-truth class indices, one per sample.
#[derive(Debug, Clone, Copy)]
pub struct LabelsView<'a> {
    data: ArrayView1<'a, f32>,
}

impl<'a> LabelsView<'a> {
    /// Wrap an existing 1D view.
    pub fn new(data: ArrayView1<'a, f32>) -> Self {
        Self { data }
    }

    /// Wrap a flat slice.
    pub fn from_slice(data: &'a [f32]) -> Self {
        Self {
            data: ArrayView1::from(data),
        }
    }

    /// Number of labels.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.len()
    }

    /// Raw stored label value for `sample`.
    #[inline]
    pub fn get(&self, sample: usize) -> f32 {
        self.data[sample]
    }

    /// Get the underlying array view.
    pub fn view(&self) -> ArrayView1<'a, f32> {
        self.data
    }

    /// Convert every label to a class index.
    ///
    /// Labels must be finite, integral and in `[0, n_classes)`. Fractional
    /// values are rejected rather than truncated.
    pub fn class_indices(&self, n_classes: usize) -> Result<Vec<usize>, DataError> {
        self.data
            .iter()
            .enumerate()
            .map(|(sample, &value)| {
                let valid = value.is_finite()
                    && value >= 0.0
                    && value.fract() == 0.0
                    && (value as usize) < n_classes;
                if valid {
                    Ok(value as usize)
                } else {
                    Err(DataError::InvalidLabel {
                        sample,
                        value,
                        n_classes,
                    })
                }
            })
            .collect()
    }
}

impl<'a> From<&'a [f32]> for LabelsView<'a> {
    fn from(data: &'a [f32]) -> Self {
        Self::from_slice(data)
    }
}
