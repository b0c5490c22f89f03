//! Loss functions for training multiclass models.
//!
//! This module provides:
//!
//! - [`LossFn`]: Trait for evaluating a loss and its gradient over a batch
//! - [`LossFnExt`]: Allocating helpers on top of [`LossFn`]
//! - [`PropagateDown`]: Which inputs a gradient is requested for
//! - [`LossError`]: Everything that can go wrong in either pass
//!
//! ## Ranking Losses
//!
//! - [`RankingLossKernel`]: Multiclass hinge with optional class-distance weights
//! - [`RankingLossConfig`]: Norm, weighting and class count of a kernel

mod loss;
pub mod ranking;

pub use loss::{LossError, LossFn, LossFnExt, LossInput, PropagateDown};
pub use ranking::{
    ConfigError, MarginMatrix, Norm, RankingLossConfig, RankingLossConfigBuilder,
    RankingLossKernel, WeightType,
};
