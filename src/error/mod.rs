mod app_error;
mod database;

pub use app_error::{AppError, AppResult, ValidationFieldError};
pub use database::convert_diesel_error;
