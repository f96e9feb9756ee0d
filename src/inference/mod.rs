//! Price model interface and the artifact-backed implementation.
//!
//! The rest of the crate talks to a model only through [`PriceModel`]:
//! `transform` turns a [`DiamondRecord`] into a numeric feature vector, and
//! `predict` turns that vector into one scalar. [`ArtifactModel`] implements
//! the trait over a JSON model artifact holding a fitted preprocessor and a
//! linear or tree-ensemble regressor, or over a model saved by XGBoost.

mod artifact;
mod tree;
mod xgboost;

pub use artifact::*;
pub use tree::*;
pub use xgboost::XgbModel;

use thiserror::Error;

use crate::models::DiamondRecord;

/// Model-ready numeric representation of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Features(Vec<f64>);

impl Features {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Failures raised while transforming or scoring a record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("column '{0}' is not part of the record schema")]
    UnknownColumn(String),

    #[error("column '{column}' does not hold {expected} values")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    #[error("found unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("tree {tree} has no node {node}")]
    MalformedTree { tree: usize, node: usize },

    #[error("model produced a non-finite value")]
    NonFinite,

    #[error("{0}")]
    Runtime(String),
}

/// A fitted preprocessing + regression pair.
///
/// Implementations are loaded once and shared read-only across requests.
pub trait PriceModel: Send + Sync {
    /// Encode a record into the representation the regressor was trained on.
    fn transform(&self, record: &DiamondRecord) -> Result<Features, ModelError>;

    /// Score a transformed record.
    fn predict(&self, features: &Features) -> Result<f64, ModelError>;
}
