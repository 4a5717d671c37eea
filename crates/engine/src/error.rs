//! The module contains the error the engine can throw.
//!
//! The errors fall in four families:
//!
//! - validation: [`MissingField`], [`InvalidAmount`], [`InvalidCategory`],
//!   [`InvalidCurrency`], [`InvalidPeriod`], [`InvalidId`], [`ExistingKey`];
//! - lookup: [`KeyNotFound`] and [`Forbidden`] (the item exists but belongs
//!   to someone else);
//! - rate provider: [`RateUnavailable`] and [`Upstream`];
//! - persistence: [`Database`] and [`InvalidData`].
//!
//!  [`MissingField`]: EngineError::MissingField
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidCategory`]: EngineError::InvalidCategory
//!  [`InvalidCurrency`]: EngineError::InvalidCurrency
//!  [`InvalidPeriod`]: EngineError::InvalidPeriod
//!  [`InvalidId`]: EngineError::InvalidId
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`RateUnavailable`]: EngineError::RateUnavailable
//!  [`Upstream`]: EngineError::Upstream
//!  [`Database`]: EngineError::Database
//!  [`InvalidData`]: EngineError::InvalidData
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid category: {0}")]
    InvalidCategory(String),
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("exchange rate unavailable: {0}")]
    RateUnavailable(String),
    #[error("rate provider error: {0}")]
    Upstream(String),
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MissingField(a), Self::MissingField(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidCategory(a), Self::InvalidCategory(b)) => a == b,
            (Self::InvalidCurrency(a), Self::InvalidCurrency(b)) => a == b,
            (Self::InvalidPeriod(a), Self::InvalidPeriod(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::RateUnavailable(a), Self::RateUnavailable(b)) => a == b,
            (Self::Upstream(a), Self::Upstream(b)) => a == b,
            (Self::InvalidData(a), Self::InvalidData(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}
