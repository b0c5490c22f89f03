//! Property tests over random batches.

use ndarray::Array2;
use proptest::prelude::*;
use rankloss::data::{LabelsView, ScoresView};
use rankloss::testing::assert_rows_balanced;
use rankloss::training::{Norm, RankingLossConfig, RankingLossKernel, WeightType};

fn norm_strategy() -> impl Strategy<Value = Norm> {
    prop_oneof![Just(Norm::L1), Just(Norm::L2)]
}

fn weight_strategy() -> impl Strategy<Value = WeightType> {
    prop_oneof![
        Just(WeightType::Uniform),
        Just(WeightType::Quadratic),
        Just(WeightType::ExponentialDistance),
    ]
}

/// `(scores, labels, n_classes)` with 1..16 samples and 2..8 classes.
fn batch_strategy() -> impl Strategy<Value = (Array2<f32>, Vec<f32>, usize)> {
    (1usize..16, 2usize..8).prop_flat_map(|(n_samples, n_classes)| {
        (
            prop::collection::vec(-20.0f32..20.0, n_samples * n_classes),
            prop::collection::vec(0..n_classes, n_samples),
        )
            .prop_map(move |(scores, labels)| {
                let scores = Array2::from_shape_vec((n_samples, n_classes), scores)
                    .expect("length matches shape");
                let labels = labels.into_iter().map(|l| l as f32).collect();
                (scores, labels, n_classes)
            })
    })
}

fn kernel(norm: Norm, weight_type: WeightType, n_classes: usize) -> RankingLossKernel {
    let config = RankingLossConfig::weighted_hinge(norm, weight_type, n_classes).expect("valid");
    RankingLossKernel::new(config).expect("valid")
}

proptest! {
    #[test]
    fn loss_is_non_negative_and_finite(
        (scores, labels, n_classes) in batch_strategy(),
        norm in norm_strategy(),
        weight_type in weight_strategy(),
    ) {
        let loss = kernel(norm, weight_type, n_classes)
            .evaluate(ScoresView::new(scores.view()), LabelsView::from_slice(&labels))
            .unwrap();
        prop_assert!(loss.is_finite());
        prop_assert!(loss >= 0.0);
    }

    #[test]
    fn gradient_has_score_shape_and_inputs_are_untouched(
        (scores, labels, n_classes) in batch_strategy(),
        norm in norm_strategy(),
        weight_type in weight_strategy(),
    ) {
        let scores_before = scores.clone();
        let labels_before = labels.clone();
        let grads = kernel(norm, weight_type, n_classes)
            .gradient(ScoresView::new(scores.view()), LabelsView::from_slice(&labels), 1.0)
            .unwrap();
        prop_assert_eq!(grads.dim(), scores.dim());
        prop_assert!(grads.iter().all(|g| g.is_finite()));
        prop_assert_eq!(scores, scores_before);
        prop_assert_eq!(labels, labels_before);
    }

    #[test]
    fn pairwise_rows_balance(
        (scores, labels, n_classes) in batch_strategy(),
        norm in norm_strategy(),
        quadratic in any::<bool>(),
    ) {
        let weight_type = if quadratic { WeightType::Quadratic } else { WeightType::Uniform };
        let grads = kernel(norm, weight_type, n_classes)
            .gradient(ScoresView::new(scores.view()), LabelsView::from_slice(&labels), 1.0)
            .unwrap();
        assert_rows_balanced(grads.view(), 1e-3);
    }

    #[test]
    fn zero_loss_iff_zero_gradient(
        (scores, labels, n_classes) in batch_strategy(),
        norm in norm_strategy(),
        weight_type in weight_strategy(),
    ) {
        let kernel = kernel(norm, weight_type, n_classes);
        let scores_view = ScoresView::new(scores.view());
        let labels_view = LabelsView::from_slice(&labels);
        let (loss, margins) = kernel.evaluate_with_margins(scores_view, labels_view).unwrap();
        let grads = kernel.gradient(scores_view, labels_view, 1.0).unwrap();
        prop_assert_eq!(loss == 0.0, margins.n_active() == 0);
        if margins.n_active() == 0 {
            prop_assert!(grads.iter().all(|&g| g == 0.0));
        }
    }
}
