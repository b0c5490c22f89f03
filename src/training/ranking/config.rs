//! Ranking loss configuration with builder pattern.
//!
//! [`RankingLossConfig`] selects the norm and the inter-class weighting of a
//! [`RankingLossKernel`](super::RankingLossKernel). It uses the `bon` crate
//! for builder generation and validates at build time, so an invalid
//! configuration never reaches the numeric code.
//!
//! # Example
//!
//! ```
//! use rankloss::training::{Norm, RankingLossConfig, WeightType};
//!
//! // Plain multiclass hinge, L1
//! let config = RankingLossConfig::builder().n_classes(5).build().unwrap();
//!
//! // Quadratic class-distance weighting with squared penalties
//! let config = RankingLossConfig::builder()
//!     .n_classes(5)
//!     .norm(Norm::L2)
//!     .weight_type(WeightType::Quadratic)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::utils::Parallelism;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur while parsing or validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Norm name not recognized.
    #[error("unknown norm `{0}`, expected `l1` or `l2`")]
    UnknownNorm(String),

    /// Weight type name not recognized.
    #[error("unknown weight type `{0}`, expected `uniform`, `quadratic` or `exponential_distance`")]
    UnknownWeightType(String),

    /// Fewer than two classes: distance weights divide by `(n_classes - 1)²`.
    #[error("n_classes must be at least 2, got {0}")]
    TooFewClasses(usize),

    /// The dedicated pool for `n_threads` could not be started.
    #[error("failed to build a pool of {n_threads} threads: {reason}")]
    ThreadPool { n_threads: usize, reason: String },
}

// =============================================================================
// Norm
// =============================================================================

/// Reduction applied to the clamped margins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Norm {
    /// Sum of (weighted) hinge penalties.
    #[default]
    #[serde(alias = "L1")]
    L1,
    /// Sum of squared (weighted) hinge penalties.
    #[serde(alias = "L2")]
    L2,
}

impl fmt::Display for Norm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L1 => f.write_str("l1"),
            Self::L2 => f.write_str("l2"),
        }
    }
}

impl FromStr for Norm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l1" => Ok(Self::L1),
            "l2" => Ok(Self::L2),
            _ => Err(ConfigError::UnknownNorm(s.to_string())),
        }
    }
}

// =============================================================================
// WeightType
// =============================================================================

/// Per class-pair weighting of the hinge penalties.
///
/// With `y` the true class, `j` another class and `K` the class count:
///
/// | Variant | Weight | Classes summed |
/// |---|---|---|
/// | `Uniform` | `1` | `j ≠ y` |
/// | `Quadratic` | `(y − j)² / (K − 1)²` | `j ≠ y` |
/// | `ExponentialDistance` | `exp((y − j)² / (K − 1)²)` | all `j` |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightType {
    /// Every competitor counts the same (plain multiclass hinge).
    #[default]
    #[serde(alias = "multiclass", alias = "MULTICLASS")]
    Uniform,
    /// Competitors far from the true class count more, normalized to `[0, 1]`.
    #[serde(alias = "QUADRATIC")]
    Quadratic,
    /// Label-wise hinge with exponential class-distance weights.
    #[serde(alias = "exponential", alias = "EXPONENTIAL")]
    ExponentialDistance,
}

impl fmt::Display for WeightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform => f.write_str("uniform"),
            Self::Quadratic => f.write_str("quadratic"),
            Self::ExponentialDistance => f.write_str("exponential_distance"),
        }
    }
}

impl FromStr for WeightType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" | "multiclass" => Ok(Self::Uniform),
            "quadratic" => Ok(Self::Quadratic),
            "exponential" | "exponential_distance" => Ok(Self::ExponentialDistance),
            _ => Err(ConfigError::UnknownWeightType(s.to_string())),
        }
    }
}

// =============================================================================
// RankingLossConfig
// =============================================================================

/// Configuration of a ranking loss kernel.
///
/// Immutable once built; a kernel keeps it for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct RankingLossConfig {
    /// Penalty reduction. Default: `L1`.
    #[builder(default)]
    pub norm: Norm,

    /// Inter-class weighting. Default: `Uniform`.
    #[builder(default)]
    pub weight_type: WeightType,

    /// Number of classes (scores per sample). Must be at least 2.
    pub n_classes: usize,

    /// Number of threads. `None` uses the current rayon pool, `1` runs on
    /// the calling thread, and larger counts give the kernel its own pool
    /// of exactly that many workers.
    pub n_threads: Option<NonZeroUsize>,
}

/// Custom finishing function that validates the config.
impl<S: ranking_loss_config_builder::IsComplete> RankingLossConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TooFewClasses`] if `n_classes < 2`.
    pub fn build(self) -> Result<RankingLossConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl RankingLossConfig {
    /// Plain multiclass hinge loss (uniform weights).
    pub fn multiclass_hinge(norm: Norm, n_classes: usize) -> Result<Self, ConfigError> {
        Self::builder().norm(norm).n_classes(n_classes).build()
    }

    /// Class-distance weighted hinge loss.
    pub fn weighted_hinge(
        norm: Norm,
        weight_type: WeightType,
        n_classes: usize,
    ) -> Result<Self, ConfigError> {
        Self::builder()
            .norm(norm)
            .weight_type(weight_type)
            .n_classes(n_classes)
            .build()
    }

    /// Validate the configuration.
    ///
    /// Fields are public, so kernels re-run this on construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_classes < 2 {
            return Err(ConfigError::TooFewClasses(self.n_classes));
        }
        Ok(())
    }

    /// Execution mode implied by `n_threads`.
    pub fn parallelism(&self) -> Parallelism {
        Parallelism::from_threads(self.n_threads.map_or(0, NonZeroUsize::get))
    }
}

// =============================================================================
// Tests
// =============================================================================
