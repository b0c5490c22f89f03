//! rankloss: multiclass ranking (hinge) losses for Rust.
//!
//! Evaluates the batch-mean multiclass hinge loss and its exact gradient
//! with respect to the per-class scores, with an `L1` or `L2` norm and
//! uniform, quadratic or exponential class-distance weighting.
//!
//! ```
//! use ndarray::array;
//! use rankloss::{LabelsView, LossFnExt, Norm, RankingLossConfig, RankingLossKernel, ScoresView, WeightType};
//!
//! let config = RankingLossConfig::builder()
//!     .n_classes(3)
//!     .norm(Norm::L2)
//!     .weight_type(WeightType::Quadratic)
//!     .build()
//!     .unwrap();
//! let kernel = RankingLossKernel::new(config).unwrap();
//!
//! let scores = array![[0.2f32, 1.0, 0.9], [2.0, -1.0, 0.0]];
//! let labels = [1.0f32, 0.0];
//! let grads = kernel
//!     .compute_gradients(ScoresView::new(scores.view()), LabelsView::from_slice(&labels), 1.0)
//!     .unwrap();
//! assert_eq!(grads.dim(), (2, 3));
//! ```

pub mod data;
pub mod testing;
pub mod training;
pub mod utils;

pub use data::{DataError, LabelsView, ScoresView};
pub use training::{
    ConfigError, LossError, LossFn, LossFnExt, LossInput, Norm, PropagateDown, RankingLossConfig,
    RankingLossKernel, WeightType,
};
pub use utils::Parallelism;
