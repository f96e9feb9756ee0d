use crate::models::{FieldError, NumericField};

/// Parse one numeric input.
///
/// Returns `Ok(None)` for blank input, which is not an error: the field is
/// simply absent. A number outside the field's inclusive bounds is a range
/// error, infinities included. Text that does not parse, `NaN`, and an
/// infinity the bounds do not exclude are parse errors.
pub fn validate_numeric(field: &NumericField<'_>) -> Result<Option<f64>, FieldError> {
    let text = field.raw_text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let parse_error = || FieldError::Parse {
        field: field.name,
        input: field.raw_text.to_string(),
    };

    let value = text
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .ok_or_else(parse_error)?;

    if !field.bounds.contains(value) {
        return Err(FieldError::Range {
            field: field.name,
            value,
            bounds: field.bounds,
        });
    }

    if value.is_infinite() {
        return Err(parse_error());
    }

    Ok(Some(value))
}
