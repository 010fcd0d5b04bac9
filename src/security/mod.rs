//! Pre-execution statement validation.

pub mod validator;

pub use validator::{ValidationResult, validate};
