use thiserror::Error;

/// Errors raised by the calculation core.
///
/// Zero principal, zero months or an allocation leftover are normal outcomes
/// and never show up here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no eligible products to allocate capital to")]
    NoEligibleProducts,

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("unknown product '{product}' at institution '{institution}'")]
    UnknownProduct { institution: String, product: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

pub(crate) fn ensure_non_negative(name: &str, value: f64) -> CoreResult<()> {
    if !value.is_finite() {
        return Err(CoreError::InvalidInput(format!("{name} must be finite")));
    }
    if value < 0.0 {
        return Err(CoreError::InvalidInput(format!("{name} must be >= 0")));
    }
    Ok(())
}
