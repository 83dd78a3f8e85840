//! Result type alias for Tidemark operations

use crate::domain::errors::TidemarkError;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, TidemarkError>;
