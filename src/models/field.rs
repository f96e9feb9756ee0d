use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The six free-text numeric inputs of the form.
///
/// `X`, `Y` and `Z` are the diamond's measured dimensions in millimetres.
/// They never reach the model directly; their product becomes the `xyz` column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NumericName {
    Carat,
    Depth,
    Table,
    X,
    Y,
    Z,
}

impl NumericName {
    pub const ALL: [NumericName; 6] = [
        Self::Carat,
        Self::Depth,
        Self::Table,
        Self::X,
        Self::Y,
        Self::Z,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Carat => "carat",
            Self::Depth => "depth",
            Self::Table => "table",
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "carat" => Some(Self::Carat),
            "depth" => Some(Self::Depth),
            "table" => Some(Self::Table),
            "x" => Some(Self::X),
            "y" => Some(Self::Y),
            "z" => Some(Self::Z),
            _ => None,
        }
    }

    /// Label shown next to the input.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Carat => "Carat",
            Self::Depth => "Depth",
            Self::Table => "Table",
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
        }
    }
}

impl fmt::Display for NumericName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The three closed-set selections of the form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalName {
    Cut,
    Color,
    Clarity,
}

impl CategoricalName {
    pub const ALL: [CategoricalName; 3] = [Self::Cut, Self::Color, Self::Clarity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cut => "cut",
            Self::Color => "color",
            Self::Clarity => "clarity",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cut" => Some(Self::Cut),
            "color" => Some(Self::Color),
            "clarity" => Some(Self::Clarity),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cut => "Cut",
            Self::Color => "Color",
            Self::Clarity => "Clarity",
        }
    }
}

impl fmt::Display for CategoricalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive bounds for a numeric input. Either side may be left open.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FieldBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub const fn unbounded() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

impl fmt::Display for FieldBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "between {} and {}", min, max),
            (Some(min), None) => write!(f, "at least {}", min),
            (None, Some(max)) => write!(f, "at most {}", max),
            (None, None) => f.write_str("any number"),
        }
    }
}

/// Why a numeric input was rejected.
///
/// Both variants are warnings, not request failures: the field is treated as
/// absent and the caller decides whether the submission can still proceed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("Please enter a valid number for {field}")]
    Parse { field: NumericName, input: String },

    #[error("{field} must be {bounds}, got {value}")]
    Range {
        field: NumericName,
        value: f64,
        bounds: FieldBounds,
    },
}

impl FieldError {
    pub fn field(&self) -> NumericName {
        match self {
            Self::Parse { field, .. } | Self::Range { field, .. } => *field,
        }
    }
}

/// Raw text from one numeric input.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericField<'a> {
    pub name: NumericName,
    pub raw_text: &'a str,
    pub bounds: FieldBounds,
}

impl<'a> NumericField<'a> {
    pub fn new(name: NumericName, raw_text: &'a str, bounds: FieldBounds) -> Self {
        Self {
            name,
            raw_text,
            bounds,
        }
    }
}

/// A selection from a closed set of choices.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalField<'a> {
    pub name: CategoricalName,
    pub value: &'a str,
    pub allowed: &'a [String],
}

impl<'a> CategoricalField<'a> {
    pub fn new(name: CategoricalName, value: &'a str, allowed: &'a [String]) -> Self {
        Self {
            name,
            value,
            allowed,
        }
    }

    pub fn is_selected(&self) -> bool {
        !self.value.trim().is_empty()
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed.iter().any(|choice| choice == self.value)
    }
}
