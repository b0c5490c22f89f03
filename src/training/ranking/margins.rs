//! Explicit margin matrix shared by the forward and backward pass.

use ndarray::{Array2, ArrayView1, ArrayView2};

use super::weights::{pair_margin, Formulation};
use super::WeightType;
use crate::data::ScoresView;
use crate::utils::Parallelism;

/// Raw per-class margins of a batch, shape `[n_samples, n_classes]`.
///
/// Produced by [`RankingLossKernel::margins`](super::RankingLossKernel::margins)
/// and consumed by both loss reduction and gradient computation. Margins are
/// stored unclamped so the backward pass can tell active pairs
/// (`margin > 0`) from inactive ones.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginMatrix {
    margins: Array2<f64>,
    labels: Vec<usize>,
    weight_type: WeightType,
}

impl MarginMatrix {
    /// Compute margins for validated inputs.
    ///
    /// `labels` must already be checked against the score shape.
    pub(crate) fn compute(
        scores: ScoresView<'_>,
        labels: Vec<usize>,
        weight_type: WeightType,
        parallelism: Parallelism,
    ) -> Self {
        debug_assert_eq!(scores.n_samples(), labels.len());
        let formulation = weight_type.formulation();
        let mut margins = Array2::<f64>::zeros(scores.dim());

        parallelism.maybe_par_bridge_for_each(
            margins.outer_iter_mut().enumerate(),
            |(sample, mut row)| {
                let label = labels[sample];
                let sample_scores = scores.row(sample);
                for (class, m) in row.iter_mut().enumerate() {
                    *m = pair_margin(formulation, sample_scores, label, class);
                }
            },
        );

        Self {
            margins,
            labels,
            weight_type,
        }
    }

    /// Number of samples.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.margins.nrows()
    }

    /// Number of classes.
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.margins.ncols()
    }

    /// Shape as `(n_samples, n_classes)`.
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.margins.dim()
    }

    /// Weight type the margins were computed for.
    #[inline]
    pub fn weight_type(&self) -> WeightType {
        self.weight_type
    }

    /// Formulation the margins were computed for.
    #[inline]
    pub fn formulation(&self) -> Formulation {
        self.weight_type.formulation()
    }

    /// True class of `sample`.
    #[inline]
    pub fn label(&self, sample: usize) -> usize {
        self.labels[sample]
    }

    /// True classes of all samples.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Raw margin of `class` for `sample`.
    #[inline]
    pub fn margin(&self, sample: usize, class: usize) -> f64 {
        self.margins[[sample, class]]
    }

    /// Raw margins of one sample.
    #[inline]
    pub fn row(&self, sample: usize) -> ArrayView1<'_, f64> {
        self.margins.row(sample)
    }

    /// Whether `(sample, class)` has a term in the loss at all.
    #[inline]
    pub fn has_term(&self, sample: usize, class: usize) -> bool {
        self.formulation().includes_true_class() || class != self.labels[sample]
    }

    /// Whether `(sample, class)` contributes a nonzero penalty.
    ///
    /// A margin of exactly zero sits on the hinge and is inactive.
    #[inline]
    pub fn is_active(&self, sample: usize, class: usize) -> bool {
        self.has_term(sample, class) && self.margins[[sample, class]] > 0.0
    }

    /// Number of active pairs over the whole batch.
    pub fn n_active(&self) -> usize {
        self.margins
            .indexed_iter()
            .filter(|&((sample, class), _)| self.is_active(sample, class))
            .count()
    }

    /// Get the underlying array view.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.margins.view()
    }
}
