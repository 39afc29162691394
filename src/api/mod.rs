// src/api/mod.rs

pub mod error;
pub mod types;

pub use error::{missing_param_error, ApiError, ApiResult};
