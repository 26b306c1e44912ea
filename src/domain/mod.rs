pub mod error;
pub mod session;
pub mod validation;

pub use error::{AppError, AppResult, FieldError, ValidationError};
