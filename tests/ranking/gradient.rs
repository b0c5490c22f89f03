//! Gradient checks over every norm and weighting.
//!
//! Batch of 10 samples with 5 classes, Gaussian scores (std 10), labels drawn
//! uniformly, all seeded with 1701. Every score is perturbed by ±1e-2 and the
//! central difference must match within 2e-3 (relative, floored at 1) with a
//! loss weight of 2.

use ndarray::Array2;
use rankloss::data::{DataError, LabelsView, ScoresView};
use rankloss::testing::{assert_array_approx_eq, assert_rows_balanced, ranking_batch, GradientChecker};
use rankloss::training::{
    LossError, LossFn, LossFnExt, LossInput, Norm, PropagateDown, RankingLossConfig,
    RankingLossKernel, WeightType,
};
use rankloss::utils::Parallelism;
use rstest::rstest;

const N_SAMPLES: usize = 10;
const N_CLASSES: usize = 5;
const SEED: u64 = 1701;

fn kernel(norm: Norm, weight_type: WeightType) -> RankingLossKernel {
    let config = RankingLossConfig::builder()
        .n_classes(N_CLASSES)
        .norm(norm)
        .weight_type(weight_type)
        .build()
        .expect("valid config");
    RankingLossKernel::new(config).expect("valid kernel")
}

fn batch() -> (Array2<f32>, Vec<f32>) {
    let (scores, labels) = ranking_batch(N_SAMPLES, N_CLASSES, 10.0, SEED);
    (scores, labels.to_vec())
}

#[rstest]
#[case(Norm::L1, WeightType::Uniform)]
#[case(Norm::L2, WeightType::Uniform)]
#[case(Norm::L1, WeightType::Quadratic)]
#[case(Norm::L2, WeightType::Quadratic)]
#[case(Norm::L1, WeightType::ExponentialDistance)]
#[case(Norm::L2, WeightType::ExponentialDistance)]
fn gradient_matches_finite_differences(#[case] norm: Norm, #[case] weight_type: WeightType) {
    let (scores, labels) = batch();
    let kernel = kernel(norm, weight_type);

    let report = GradientChecker::default()
        .check(&kernel, scores.view(), LabelsView::from_slice(&labels))
        .expect("check runs");

    assert_eq!(report.n_checked, N_SAMPLES * N_CLASSES);
    assert!(
        report.passed(),
        "{norm}/{weight_type}: {} mismatches, first {:?}",
        report.failures.len(),
        report.failures.first()
    );
}

#[rstest]
#[case(Norm::L1, WeightType::Uniform)]
#[case(Norm::L2, WeightType::ExponentialDistance)]
fn gradient_matches_on_tight_scores(#[case] norm: Norm, #[case] weight_type: WeightType) {
    // Scores near the margin put many pairs close to their kink.
    let (scores, labels) = ranking_batch(20, N_CLASSES, 0.5, SEED);
    let labels = labels.to_vec();
    let report = GradientChecker::new(1e-3, 2e-3)
        .check(&kernel(norm, weight_type), scores.view(), LabelsView::from_slice(&labels))
        .expect("check runs");
    assert!(report.passed(), "{report:?}");
}

#[rstest]
#[case(Norm::L1, WeightType::Uniform)]
#[case(Norm::L2, WeightType::Uniform)]
#[case(Norm::L1, WeightType::Quadratic)]
#[case(Norm::L2, WeightType::Quadratic)]
fn pairwise_gradient_rows_are_balanced(#[case] norm: Norm, #[case] weight_type: WeightType) {
    let (scores, labels) = batch();
    let grads = kernel(norm, weight_type)
        .compute_gradients(ScoresView::new(scores.view()), LabelsView::from_slice(&labels), 1.0)
        .expect("gradient");
    assert_rows_balanced(grads.view(), 1e-3);
}

#[test]
fn flat_buffers_match_array_views() {
    let (scores, labels) = batch();
    let flat: Vec<f32> = scores.iter().copied().collect();
    let kernel = kernel(Norm::L2, WeightType::Quadratic);

    let from_array = kernel
        .evaluate(ScoresView::new(scores.view()), LabelsView::from_slice(&labels))
        .expect("loss");
    let flat_view = ScoresView::from_slice(&flat, N_SAMPLES).expect("evenly shaped");
    let from_flat = kernel
        .evaluate(flat_view, LabelsView::from_slice(&labels))
        .expect("loss");
    assert_eq!(from_array, from_flat);
}

#[test]
fn parallel_kernel_matches_sequential() {
    let (scores, labels) = ranking_batch(257, N_CLASSES, 3.0, SEED);
    let labels = labels.to_vec();
    let seq = kernel(Norm::L2, WeightType::Quadratic).with_parallelism(Parallelism::Sequential);
    let par = seq.clone().with_parallelism(Parallelism::Parallel);

    let scores_view = ScoresView::new(scores.view());
    let labels_view = LabelsView::from_slice(&labels);
    assert_eq!(
        seq.evaluate(scores_view, labels_view).expect("loss"),
        par.evaluate(scores_view, labels_view).expect("loss")
    );

    let g_seq = seq.gradient(scores_view, labels_view, 2.0).expect("gradient");
    let g_par = par.gradient(scores_view, labels_view, 2.0).expect("gradient");
    assert_array_approx_eq(g_seq.view(), g_par.view(), 0.0, "parallel gradient");
}

#[test]
fn label_gradient_is_rejected() {
    let (scores, labels) = batch();
    let kernel = kernel(Norm::L1, WeightType::Uniform);
    let mut grads = Array2::<f32>::zeros(scores.dim());

    let err = kernel
        .compute_gradients_into(
            ScoresView::new(scores.view()),
            LabelsView::from_slice(&labels),
            1.0,
            PropagateDown::from([true, true]),
            grads.view_mut(),
        )
        .unwrap_err();

    assert_eq!(err, LossError::LabelGradient { loss: "multiclass_hinge" });
    assert!(err.to_string().contains("label inputs"));
}

#[test]
fn force_backward_only_for_scores() {
    for weight_type in [WeightType::Uniform, WeightType::Quadratic, WeightType::ExponentialDistance] {
        let kernel = kernel(Norm::L1, weight_type);
        assert!(kernel.allow_force_backward(LossInput::Scores));
        assert!(!kernel.allow_force_backward(LossInput::Labels));
    }
}

#[test]
fn out_of_range_label_is_reported() {
    let (scores, mut labels) = batch();
    labels[3] = N_CLASSES as f32;
    let err = kernel(Norm::L1, WeightType::Quadratic)
        .evaluate(ScoresView::new(scores.view()), LabelsView::from_slice(&labels))
        .unwrap_err();
    assert!(matches!(
        err,
        LossError::Data(DataError::InvalidLabel { sample: 3, n_classes: N_CLASSES, .. })
    ));
}

#[test]
fn config_round_trips_through_names() {
    let norm: Norm = "L2".parse().expect("known norm");
    let weight_type: WeightType = "exponential".parse().expect("known weight type");
    let config = RankingLossConfig::weighted_hinge(norm, weight_type, N_CLASSES).expect("valid");
    let kernel = RankingLossKernel::new(config).expect("valid kernel");
    assert_eq!(kernel.name(), "exponential_labelwise_hinge");
    assert_eq!(kernel.n_classes(), N_CLASSES);
}
