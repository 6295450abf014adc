pub mod classification;
pub mod data_preparation;
pub mod error;
pub mod linking;
pub mod models;
pub mod pipeline;
pub mod types;

#[cfg(feature = "csv")]
pub mod tables;

pub use error::AttributionError;
pub use types::*;

/// Standard result type for all attribution operations
pub type AttributionResult<T> = Result<T, AttributionError>;
