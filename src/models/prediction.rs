use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The outcome of one successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub request_id: Uuid,
    /// Price on the original scale, after any inverse-log step.
    pub price: f64,
    /// Value returned by the regressor before post-processing.
    pub raw_output: f64,
    /// `price` rendered for display, e.g. `$5,000.00`.
    pub formatted: String,
    pub predicted_at: DateTime<Utc>,
}

impl PredictionResult {
    pub fn new(price: f64, raw_output: f64) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            price,
            raw_output,
            formatted: format_price(price),
            predicted_at: Utc::now(),
        }
    }
}

/// Format a price as dollars with thousands separators and two decimals.
pub fn format_price(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // A value that rounds to zero cents is not shown as negative.
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}
