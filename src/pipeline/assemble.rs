use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::validate_numeric;
use crate::config::FormConfig;
use crate::models::{
    CategoricalField, CategoricalName, DiamondRecord, FieldError, NumericField, NumericName,
};

/// Raw form contents, exactly as typed or selected.
///
/// Numeric inputs stay as text so that blank, malformed and out-of-range
/// entries can be told apart. Missing or `null` JSON fields deserialize as
/// blank, and JSON numbers are accepted for numeric inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormInput {
    #[serde(deserialize_with = "text_or_number")]
    pub carat: String,
    pub cut: String,
    pub color: String,
    pub clarity: String,
    #[serde(deserialize_with = "text_or_number")]
    pub depth: String,
    #[serde(deserialize_with = "text_or_number")]
    pub table: String,
    #[serde(deserialize_with = "text_or_number")]
    pub x: String,
    #[serde(deserialize_with = "text_or_number")]
    pub y: String,
    #[serde(deserialize_with = "text_or_number")]
    pub z: String,
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text,
        Some(Raw::Number(number)) => number.to_string(),
        None => String::new(),
    })
}

impl FormInput {
    pub fn numeric(&self, name: NumericName) -> &str {
        match name {
            NumericName::Carat => &self.carat,
            NumericName::Depth => &self.depth,
            NumericName::Table => &self.table,
            NumericName::X => &self.x,
            NumericName::Y => &self.y,
            NumericName::Z => &self.z,
        }
    }

    pub fn numeric_mut(&mut self, name: NumericName) -> &mut String {
        match name {
            NumericName::Carat => &mut self.carat,
            NumericName::Depth => &mut self.depth,
            NumericName::Table => &mut self.table,
            NumericName::X => &mut self.x,
            NumericName::Y => &mut self.y,
            NumericName::Z => &mut self.z,
        }
    }

    pub fn selection(&self, name: CategoricalName) -> &str {
        match name {
            CategoricalName::Cut => &self.cut,
            CategoricalName::Color => &self.color,
            CategoricalName::Clarity => &self.clarity,
        }
    }

    pub fn selection_mut(&mut self, name: CategoricalName) -> &mut String {
        match name {
            CategoricalName::Cut => &mut self.cut,
            CategoricalName::Color => &mut self.color,
            CategoricalName::Clarity => &mut self.clarity,
        }
    }
}

/// Numeric inputs after validation. `None` marks an absent field, whether
/// it was left blank or rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedFields {
    pub carat: Option<f64>,
    pub depth: Option<f64>,
    pub table: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    /// One entry per rejected field, in form order.
    pub warnings: Vec<FieldError>,
}

impl ValidatedFields {
    pub fn get(&self, name: NumericName) -> Option<f64> {
        match name {
            NumericName::Carat => self.carat,
            NumericName::Depth => self.depth,
            NumericName::Table => self.table,
            NumericName::X => self.x,
            NumericName::Y => self.y,
            NumericName::Z => self.z,
        }
    }

    fn slot(&mut self, name: NumericName) -> &mut Option<f64> {
        match name {
            NumericName::Carat => &mut self.carat,
            NumericName::Depth => &mut self.depth,
            NumericName::Table => &mut self.table,
            NumericName::X => &mut self.x,
            NumericName::Y => &mut self.y,
            NumericName::Z => &mut self.z,
        }
    }

    pub fn missing(&self) -> Vec<NumericName> {
        NumericName::ALL
            .into_iter()
            .filter(|name| self.get(*name).is_none())
            .collect()
    }
}

/// Why no record could be built from a submission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssembleError {
    #[error("Please enter valid values for all fields (missing: {})", .missing.join(", "))]
    IncompleteInput { missing: Vec<String> },

    #[error("'{value}' is not a valid {field}; expected one of: {}", .allowed.join(", "))]
    InvalidChoice {
        field: CategoricalName,
        value: String,
        allowed: Vec<String>,
    },
}

/// Validate every numeric input of the form.
///
/// All six fields are checked, so the caller sees every warning at once.
pub fn validate_fields(input: &FormInput, form: &FormConfig) -> ValidatedFields {
    let mut fields = ValidatedFields::default();

    for name in NumericName::ALL {
        let field = NumericField::new(name, input.numeric(name), form.bounds(name));
        match validate_numeric(&field) {
            Ok(value) => *fields.slot(name) = value,
            Err(e) => {
                tracing::warn!(field = name.as_str(), "{}", e);
                fields.warnings.push(e);
            }
        }
    }

    fields
}

/// Build the model record, or explain why it cannot be built.
///
/// Every numeric field must be present and every selection made. The
/// derived `xyz` column is the product of the three dimensions and is not
/// bounds-checked itself.
pub fn assemble(
    fields: &ValidatedFields,
    input: &FormInput,
    form: &FormConfig,
) -> Result<DiamondRecord, AssembleError> {
    let selections = CategoricalName::ALL
        .map(|name| CategoricalField::new(name, input.selection(name), form.choices(name)));

    let mut missing: Vec<String> = selections
        .iter()
        .filter(|s| !s.is_selected())
        .map(|s| s.name.label().to_string())
        .collect();
    missing.extend(fields.missing().iter().map(|n| n.label().to_string()));

    if !missing.is_empty() {
        return Err(AssembleError::IncompleteInput { missing });
    }

    if let Some(bad) = selections.iter().find(|s| !s.is_allowed()) {
        return Err(AssembleError::InvalidChoice {
            field: bad.name,
            value: bad.value.to_string(),
            allowed: bad.allowed.to_vec(),
        });
    }

    let value = |name| fields.get(name).unwrap_or_default();
    let [cut, color, clarity] = selections.map(|s| s.value.to_string());

    Ok(DiamondRecord {
        carat: value(NumericName::Carat),
        cut,
        color,
        clarity,
        depth: value(NumericName::Depth),
        table: value(NumericName::Table),
        xyz: value(NumericName::X) * value(NumericName::Y) * value(NumericName::Z),
    })
}
