//! The predict-request pipeline.
//!
//! One form submission flows through here exactly once:
//!
//! 1. [`validate_fields`] parses the six numeric inputs and collects warnings.
//! 2. [`assemble`] checks that nothing is missing and builds a [`DiamondRecord`].
//! 3. [`PriceService::predict`] transforms, scores and formats the record.
//!
//! [`PriceService::submit`] runs all three and reports warnings alongside
//! the outcome.
//!
//! [`DiamondRecord`]: crate::models::DiamondRecord

mod assemble;
mod service;
mod validate;

pub use assemble::*;
pub use service::*;
pub use validate::*;
