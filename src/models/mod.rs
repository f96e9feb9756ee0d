//! Domain models for diamond price estimation.
//!
//! # Core Concepts
//!
//! Every entity here is request-scoped: it is built from one form submission
//! and dropped once the response is rendered.
//!
//! - [`NumericField`]: Raw text typed into one of the six numeric inputs,
//!   together with the inclusive bounds it is checked against.
//! - [`CategoricalField`]: One of the three closed-set selections (cut, color, clarity).
//! - [`DiamondRecord`]: The fixed seven-column row handed to the model. Only
//!   built once every field is present and valid.
//! - [`PredictionResult`]: The scalar price and its display string.

mod field;
mod prediction;
mod record;

pub use field::*;
pub use prediction::*;
pub use record::*;
