//! Diamond price estimation.
//!
//! Validates a diamond's attributes, assembles them into the fixed record
//! schema a pre-trained pipeline expects, and renders the predicted price.

pub mod api;
pub mod client;
pub mod config;
pub mod form;
pub mod inference;
pub mod models;
pub mod pipeline;
