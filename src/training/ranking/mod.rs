//! Multiclass ranking (hinge) losses.
//!
//! A sample with true class `y` is penalized whenever a competing class
//! scores within a unit margin of it. Two knobs shape the penalty:
//!
//! - [`Norm`]: sum of hinge penalties (`L1`) or of their squares (`L2`)
//! - [`WeightType`]: how much each competitor counts, by its distance to `y`
//!
//! [`RankingLossKernel`] evaluates the batch-mean loss and its gradient with
//! respect to the scores; [`MarginMatrix`] carries the margins from one pass
//! to the other.

mod config;
mod kernel;
mod margins;
mod weights;

pub use config::{ConfigError, Norm, RankingLossConfig, RankingLossConfigBuilder, WeightType};
pub use kernel::RankingLossKernel;
pub use margins::MarginMatrix;
pub use weights::{class_sign, pair_margin, pair_weight, Formulation};
