//! Seeded synthetic batches for tests and benchmarks.

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_distr::StandardNormal;

/// Gaussian scores with mean 0 and standard deviation `std`.
pub fn gaussian_scores(n_samples: usize, n_classes: usize, std: f32, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    fill_scores(&mut rng, n_samples, n_classes, std)
}

/// Uniformly drawn class indices in `[0, n_classes)`, stored as `f32`.
pub fn random_labels(n_samples: usize, n_classes: usize, seed: u64) -> Array1<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    fill_labels(&mut rng, n_samples, n_classes)
}

/// Scores and labels drawn from a single seeded stream.
///
/// Scores are drawn first, then labels, so the batch for a given seed is
/// stable regardless of the caller.
pub fn ranking_batch(
    n_samples: usize,
    n_classes: usize,
    std: f32,
    seed: u64,
) -> (Array2<f32>, Array1<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let scores = fill_scores(&mut rng, n_samples, n_classes, std);
    let labels = fill_labels(&mut rng, n_samples, n_classes);
    (scores, labels)
}

fn fill_scores(rng: &mut StdRng, n_samples: usize, n_classes: usize, std: f32) -> Array2<f32> {
    assert!(std >= 0.0, "std must be non-negative, got {std}");
    Array2::from_shape_simple_fn((n_samples, n_classes), || {
        rng.sample::<f32, _>(StandardNormal) * std
    })
}

fn fill_labels(rng: &mut StdRng, n_samples: usize, n_classes: usize) -> Array1<f32> {
    assert!(n_classes > 0, "need at least one class");
    Array1::from_shape_simple_fn(n_samples, || rng.gen_range(0..n_classes) as f32)
}
