//! Application configuration.
//!
//! Configuration is read from a JSON file. The file is located by, in order:
//! - the `--config` flag
//! - `DIAMOND_PRICE_CONFIG` (handled by the CLI through the same flag)
//! - `config.json` in the platform config directory
//!
//! If no file is found the built-in defaults apply: the usual
//! cut/color/clarity grades and conservative bounds for each measurement.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{CategoricalName, FieldBounds, NumericName};

const APP_NAME: &str = "diamond-price";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_MODEL_FILE: &str = "model.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the model artifact. Relative paths resolve against the
    /// directory holding the config file.
    pub model_path: PathBuf,
    /// Fitted preprocessor stored separately from the model, as when the
    /// model file was saved by XGBoost. Replaces any preprocessor inside the
    /// artifact. Relative paths resolve like `model_path`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessor_path: Option<PathBuf>,
    /// Force the inverse-log step on or off. When unset, the artifact decides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_target: Option<bool>,
    pub form: FormConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_FILE),
            preprocessor_path: None,
            log_target: None,
            form: FormConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit path, or from the user's config
    /// directory when none is given.
    ///
    /// An explicit path must exist and parse. A missing file in the config
    /// directory falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if let Some(parent) = path.parent() {
            config.model_path = parent.join(&config.model_path);
            config.preprocessor_path = config.preprocessor_path.map(|p| parent.join(p));
        }

        config.form.check()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

fn default_config_path() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Some(dirs.config_dir().join(CONFIG_FILE))
}

/// Choices and bounds presented by the form.
///
/// Different deployments ship different grade lists and bounds, so none of
/// these are hard-coded into validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub cut: Vec<String>,
    pub color: Vec<String>,
    pub clarity: Vec<String>,
    pub carat: FieldBounds,
    pub depth: FieldBounds,
    pub table: FieldBounds,
    pub x: FieldBounds,
    pub y: FieldBounds,
    pub z: FieldBounds,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            cut: strings(&["Fair", "Good", "Very Good", "Premium", "Ideal"]),
            color: strings(&["D", "E", "F", "G", "H", "I", "J"]),
            clarity: strings(&["I1", "SI2", "SI1", "VS2", "VS1", "VVS2", "VVS1", "IF"]),
            carat: FieldBounds::new(0.1, 5.0),
            depth: FieldBounds::new(50.0, 70.0),
            table: FieldBounds::new(50.0, 70.0),
            x: FieldBounds::new(3.0, 20.0),
            y: FieldBounds::new(3.0, 20.0),
            z: FieldBounds::new(2.0, 15.0),
        }
    }
}

impl FormConfig {
    pub fn bounds(&self, name: NumericName) -> FieldBounds {
        match name {
            NumericName::Carat => self.carat,
            NumericName::Depth => self.depth,
            NumericName::Table => self.table,
            NumericName::X => self.x,
            NumericName::Y => self.y,
            NumericName::Z => self.z,
        }
    }

    pub fn choices(&self, name: CategoricalName) -> &[String] {
        match name {
            CategoricalName::Cut => &self.cut,
            CategoricalName::Color => &self.color,
            CategoricalName::Clarity => &self.clarity,
        }
    }

    /// Reject configurations the form could never satisfy.
    pub fn check(&self) -> Result<()> {
        for name in CategoricalName::ALL {
            if self.choices(name).is_empty() {
                anyhow::bail!("Form config lists no choices for {}", name);
            }
        }
        for name in NumericName::ALL {
            let bounds = self.bounds(name);
            if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
                if min > max {
                    anyhow::bail!("Form config bounds for {} are inverted ({} > {})", name, min, max);
                }
            }
        }
        Ok(())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_form_matches_reference_grades() {
        let form = FormConfig::default();
        assert_eq!(form.cut.len(), 5);
        assert_eq!(form.color.len(), 7);
        assert_eq!(form.clarity.len(), 8);
        assert_eq!(form.bounds(NumericName::Z), FieldBounds::new(2.0, 15.0));
        assert!(form.check().is_ok());
    }

    #[test]
    fn partial_form_config_keeps_other_defaults() {
        let form: FormConfig =
            serde_json::from_str(r#"{ "carat": { "min": 0.2 }, "cut": ["Good", "Ideal"] }"#)
                .unwrap();
        assert_eq!(form.cut, vec!["Good", "Ideal"]);
        assert_eq!(form.carat.min, Some(0.2));
        assert_eq!(form.carat.max, None);
        assert_eq!(form.depth, FieldBounds::new(50.0, 70.0));
    }

    #[test]
    fn check_rejects_inverted_bounds() {
        let form = FormConfig {
            table: FieldBounds::new(70.0, 50.0),
            ..FormConfig::default()
        };
        assert!(form.check().is_err());
    }

    #[test]
    fn check_rejects_empty_choices() {
        let form = FormConfig {
            color: Vec::new(),
            ..FormConfig::default()
        };
        assert!(form.check().is_err());
    }
}
