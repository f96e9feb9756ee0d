use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::xgboost::{self, XgbModel};
use super::{Features, ModelError, PriceModel, TreeEnsemble};
use crate::config::FormConfig;
use crate::models::{CategoricalName, DiamondRecord, RecordValue, RECORD_COLUMNS};

/// On-disk model artifact.
///
/// ```json
/// {
///   "name": "diamonds-linear",
///   "preprocessor": {
///     "numeric": [{ "name": "carat", "mean": 0.8, "scale": 0.47 }],
///     "categorical": [{ "name": "cut", "categories": ["Fair", "Good"] }]
///   },
///   "regressor": { "kind": "linear", "intercept": 7.7, "coefficients": [1.1, 0.2, -0.1] },
///   "log_target": true
/// }
/// ```
///
/// A model saved by XGBoost (`model.json` with a top-level `learner`) is
/// also accepted. It carries no preprocessor and no log-target flag; both
/// come from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<Preprocessor>,
    pub regressor: Regressor,
    /// The regressor was trained on `ln(1 + price)`.
    #[serde(default)]
    pub log_target: bool,
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid model artifact {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("Failed to parse model artifact")?;

        if xgboost::is_xgboost(&value) {
            let ensemble = XgbModel::from_value(value)?.into_ensemble()?;
            return Ok(Self {
                name: Some("xgboost".to_string()),
                preprocessor: None,
                regressor: Regressor::TreeEnsemble(ensemble),
                log_target: false,
            });
        }

        serde_json::from_value(value).context("Failed to parse model artifact")
    }
}

/// Fitted column transformer: standard-scaled numeric columns followed by
/// one-hot encoded categorical columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preprocessor {
    #[serde(default)]
    pub numeric: Vec<NumericScaler>,
    #[serde(default)]
    pub categorical: Vec<OneHotEncoder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericScaler {
    pub name: String,
    #[serde(default)]
    pub mean: f64,
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

fn unit_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub name: String,
    pub categories: Vec<String>,
}

impl Preprocessor {
    /// Load a fitted preprocessor stored on its own, for pairing with a
    /// regressor file that has none.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preprocessor {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse preprocessor {}", path.display()))
    }

    pub fn width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    fn check(&self) -> Result<()> {
        for scaler in &self.numeric {
            if !matches!(column_kind(&scaler.name)?, ColumnKind::Numeric) {
                anyhow::bail!("Cannot scale text column '{}'", scaler.name);
            }
            if !scaler.mean.is_finite() || !scaler.scale.is_finite() {
                anyhow::bail!("Scaler for '{}' has non-finite parameters", scaler.name);
            }
        }
        for encoder in &self.categorical {
            if !matches!(column_kind(&encoder.name)?, ColumnKind::Text) {
                anyhow::bail!("Cannot one-hot encode numeric column '{}'", encoder.name);
            }
            if encoder.categories.is_empty() {
                anyhow::bail!("Encoder for '{}' lists no categories", encoder.name);
            }
        }
        Ok(())
    }

    pub fn transform(&self, record: &DiamondRecord) -> Result<Features, ModelError> {
        let mut out = Vec::with_capacity(self.width());

        for scaler in &self.numeric {
            let value = number(record, &scaler.name)?;
            // A zero-variance column was fitted with scale 0; leave it unscaled.
            let scale = if scaler.scale == 0.0 { 1.0 } else { scaler.scale };
            out.push((value - scaler.mean) / scale);
        }

        for encoder in &self.categorical {
            let value = text(record, &encoder.name)?;
            let hot = encoder
                .categories
                .iter()
                .position(|c| c == value)
                .ok_or_else(|| ModelError::UnknownCategory {
                    column: encoder.name.clone(),
                    value: value.to_string(),
                })?;
            out.extend((0..encoder.categories.len()).map(|i| if i == hot { 1.0 } else { 0.0 }));
        }

        Ok(Features::new(out))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Linear(LinearRegressor),
    TreeEnsemble(TreeEnsemble),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    #[serde(default)]
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearRegressor {
    pub fn predict(&self, features: &Features) -> Result<f64, ModelError> {
        if features.len() != self.coefficients.len() {
            return Err(ModelError::FeatureCount {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features.as_slice())
            .map(|(w, x)| w * x)
            .sum();
        Ok(self.intercept + dot)
    }
}

/// [`PriceModel`] backed by a [`ModelArtifact`].
///
/// Without a preprocessor, records are encoded in column order with each
/// categorical value replaced by its position in the form's choice list.
#[derive(Debug, Clone)]
pub struct ArtifactModel {
    preprocessor: Option<Preprocessor>,
    regressor: Regressor,
    ordinal: [Vec<String>; 3],
}

impl ArtifactModel {
    pub fn new(artifact: ModelArtifact, form: &FormConfig) -> Result<Self> {
        let model = Self {
            preprocessor: artifact.preprocessor,
            regressor: artifact.regressor,
            ordinal: CategoricalName::ALL.map(|name| form.choices(name).to_vec()),
        };

        if let Some(preprocessor) = &model.preprocessor {
            preprocessor.check()?;
        }

        let width = model.width();
        match &model.regressor {
            Regressor::Linear(linear) => {
                if linear.coefficients.len() != width {
                    anyhow::bail!(
                        "Linear regressor has {} coefficients but the preprocessor yields {} features",
                        linear.coefficients.len(),
                        width
                    );
                }
            }
            Regressor::TreeEnsemble(ensemble) => {
                ensemble.check(width).map_err(anyhow::Error::msg)?;
            }
        }

        Ok(model)
    }

    /// Number of features the regressor consumes.
    pub fn width(&self) -> usize {
        match &self.preprocessor {
            Some(p) => p.width(),
            None => RECORD_COLUMNS.len(),
        }
    }

    /// Short human-readable description, e.g. for the about page.
    pub fn summary(&self) -> String {
        let regressor = match &self.regressor {
            Regressor::Linear(_) => "linear regression".to_string(),
            Regressor::TreeEnsemble(e) => format!("{} boosted trees", e.trees.len()),
        };
        format!("{} over {} features", regressor, self.width())
    }

    fn ordinal_encode(&self, record: &DiamondRecord) -> Result<Features, ModelError> {
        let mut out = Vec::with_capacity(RECORD_COLUMNS.len());
        for (column, value) in RECORD_COLUMNS.iter().zip(record.values()) {
            match value {
                RecordValue::Number(v) => out.push(v),
                RecordValue::Text(s) => {
                    let choices = CategoricalName::from_str(column)
                        .map(|name| &self.ordinal[name as usize])
                        .ok_or_else(|| ModelError::UnknownColumn(column.to_string()))?;
                    let code = choices.iter().position(|c| c == s).ok_or_else(|| {
                        ModelError::UnknownCategory {
                            column: column.to_string(),
                            value: s.to_string(),
                        }
                    })?;
                    out.push(code as f64);
                }
            }
        }
        Ok(Features::new(out))
    }
}

impl PriceModel for ArtifactModel {
    fn transform(&self, record: &DiamondRecord) -> Result<Features, ModelError> {
        match &self.preprocessor {
            Some(p) => p.transform(record),
            None => self.ordinal_encode(record),
        }
    }

    fn predict(&self, features: &Features) -> Result<f64, ModelError> {
        match &self.regressor {
            Regressor::Linear(linear) => linear.predict(features),
            Regressor::TreeEnsemble(ensemble) => ensemble.predict(features),
        }
    }
}

enum ColumnKind {
    Numeric,
    Text,
}

fn column_kind(column: &str) -> Result<ColumnKind> {
    match column {
        "carat" | "depth" | "table" | "xyz" => Ok(ColumnKind::Numeric),
        "cut" | "color" | "clarity" => Ok(ColumnKind::Text),
        _ => anyhow::bail!("Column '{}' is not part of the record schema", column),
    }
}

fn number(record: &DiamondRecord, column: &str) -> Result<f64, ModelError> {
    match record.value(column) {
        Some(RecordValue::Number(v)) => Ok(v),
        Some(RecordValue::Text(_)) => Err(ModelError::ColumnType {
            column: column.to_string(),
            expected: "numeric",
        }),
        None => Err(ModelError::UnknownColumn(column.to_string())),
    }
}

fn text<'a>(record: &'a DiamondRecord, column: &str) -> Result<&'a str, ModelError> {
    match record.value(column) {
        Some(RecordValue::Text(s)) => Ok(s),
        Some(RecordValue::Number(_)) => Err(ModelError::ColumnType {
            column: column.to_string(),
            expected: "text",
        }),
        None => Err(ModelError::UnknownColumn(column.to_string())),
    }
}
