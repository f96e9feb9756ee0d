use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;

use super::{assemble, validate_fields, AssembleError, FormInput};
use crate::config::{AppConfig, FormConfig};
use crate::inference::{ArtifactModel, ModelArtifact, ModelError, Preprocessor, PriceModel};
use crate::models::{DiamondRecord, FieldError, PredictionResult};

/// Failure inside the transform/predict step. Carries the cause so it can be
/// shown to the user.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Prediction failed: {0}")]
pub struct PredictionError(#[from] pub ModelError);

/// Why a submission produced no price.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

/// Everything one submission produced: per-field warnings plus either a
/// price or the reason there is none.
#[derive(Debug, Clone)]
pub struct Submission {
    pub warnings: Vec<FieldError>,
    pub outcome: Result<PredictionResult, SubmitError>,
}

/// The loaded model and the form it serves.
///
/// Built once at startup and shared by handle; nothing in here changes
/// after construction, so clones are cheap and need no locking.
#[derive(Clone)]
pub struct PriceService {
    model: Arc<dyn PriceModel>,
    form: Arc<FormConfig>,
    log_target: bool,
    description: Arc<str>,
}

impl PriceService {
    pub fn new(model: Arc<dyn PriceModel>, form: FormConfig, log_target: bool) -> Self {
        Self {
            model,
            form: Arc::new(form),
            log_target,
            description: Arc::from("custom price model"),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Arc::from(description.into());
        self
    }

    /// Load the model artifact named by the configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut artifact = ModelArtifact::load(&config.model_path)?;
        if let Some(path) = &config.preprocessor_path {
            artifact.preprocessor = Some(Preprocessor::load(path)?);
        }
        let log_target = config.log_target.unwrap_or(artifact.log_target);
        let name = artifact.name.clone();
        let model = ArtifactModel::new(artifact, &config.form)?;

        let description = match name {
            Some(name) => format!("{} ({})", name, model.summary()),
            None => model.summary(),
        };
        tracing::info!(
            "Loaded model from {}: {}",
            config.model_path.display(),
            description
        );

        Ok(Self::new(Arc::new(model), config.form.clone(), log_target)
            .with_description(description))
    }

    pub fn form(&self) -> &FormConfig {
        &self.form
    }

    pub fn log_target(&self) -> bool {
        self.log_target
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Transform, score and format one record.
    pub fn predict(&self, record: &DiamondRecord) -> Result<PredictionResult, PredictionError> {
        let features = self.model.transform(record)?;
        let raw = self.model.predict(&features)?;

        let price = if self.log_target { raw.exp_m1() } else { raw };
        if !price.is_finite() {
            return Err(ModelError::NonFinite.into());
        }

        Ok(PredictionResult::new(price, raw))
    }

    /// Run a whole form submission: validate, assemble, predict.
    pub fn submit(&self, input: &FormInput) -> Submission {
        let fields = validate_fields(input, &self.form);

        let outcome = assemble(&fields, input, &self.form)
            .map_err(SubmitError::from)
            .and_then(|record| self.predict(&record).map_err(SubmitError::from));

        match &outcome {
            Ok(result) => tracing::info!(
                request_id = %result.request_id,
                "Predicted {}",
                result.formatted
            ),
            Err(SubmitError::Assemble(e)) => tracing::warn!("Rejected submission: {}", e),
            Err(SubmitError::Prediction(e)) => tracing::error!("{}", e),
        }

        Submission {
            warnings: fields.warnings,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Features;
    use std::sync::Mutex;

    /// Passes `carat * 1000` through, recording every record it transforms.
    #[derive(Default)]
    struct SpyModel {
        seen: Mutex<Vec<DiamondRecord>>,
    }

    impl PriceModel for SpyModel {
        fn transform(&self, record: &DiamondRecord) -> Result<Features, ModelError> {
            self.seen.lock().unwrap().push(record.clone());
            Ok(Features::new(vec![record.carat]))
        }

        fn predict(&self, features: &Features) -> Result<f64, ModelError> {
            Ok(features.as_slice()[0] * 1000.0)
        }
    }

    struct ConstantModel(f64);

    impl PriceModel for ConstantModel {
        fn transform(&self, _record: &DiamondRecord) -> Result<Features, ModelError> {
            Ok(Features::new(Vec::new()))
        }

        fn predict(&self, _features: &Features) -> Result<f64, ModelError> {
            Ok(self.0)
        }
    }

    fn record() -> DiamondRecord {
        DiamondRecord {
            carat: 1.0,
            cut: "Ideal".to_string(),
            color: "G".to_string(),
            clarity: "VS2".to_string(),
            depth: 61.5,
            table: 57.0,
            xyz: 155.061,
        }
    }

    #[test]
    fn log_target_applies_inverse_transform() {
        let service = PriceService::new(
            Arc::new(ConstantModel(5001f64.ln())),
            FormConfig::default(),
            true,
        );
        let result = service.predict(&record()).unwrap();
        assert_eq!(result.formatted, "$5,000.00");
        assert!((result.raw_output - 8.517).abs() < 1e-3);
    }

    #[test]
    fn plain_target_is_used_as_is() {
        let service =
            PriceService::new(Arc::new(ConstantModel(326.0)), FormConfig::default(), false);
        assert_eq!(service.predict(&record()).unwrap().formatted, "$326.00");
    }

    #[test]
    fn overflowing_inverse_transform_is_a_prediction_error() {
        let service =
            PriceService::new(Arc::new(ConstantModel(1e6)), FormConfig::default(), true);
        assert_eq!(
            service.predict(&record()),
            Err(PredictionError(ModelError::NonFinite))
        );
    }

    #[test]
    fn submit_passes_assembled_record_to_model() {
        let spy = Arc::new(SpyModel::default());
        let service = PriceService::new(spy.clone(), FormConfig::default(), false);

        let submission = service.submit(&FormInput {
            carat: "2".to_string(),
            cut: "Premium".to_string(),
            color: "D".to_string(),
            clarity: "IF".to_string(),
            depth: "60".to_string(),
            table: "58".to_string(),
            x: "4".to_string(),
            y: "4".to_string(),
            z: "2.5".to_string(),
        });

        assert!(submission.warnings.is_empty());
        assert_eq!(submission.outcome.unwrap().formatted, "$2,000.00");
        let seen = spy.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].xyz, 40.0);
        assert_eq!(seen[0].cut, "Premium");
    }

    #[test]
    fn incomplete_submission_never_reaches_model() {
        let spy = Arc::new(SpyModel::default());
        let service = PriceService::new(spy.clone(), FormConfig::default(), false);

        let submission = service.submit(&FormInput {
            carat: "abc".to_string(),
            ..FormInput::default()
        });

        assert_eq!(submission.warnings.len(), 1);
        assert!(matches!(
            submission.outcome,
            Err(SubmitError::Assemble(AssembleError::IncompleteInput { .. }))
        ));
        assert!(spy.seen.lock().unwrap().is_empty());
    }
}
