//! The module contains the errors the engine can throw.
//!
//! Each variant belongs to one class of failure callers can react to:
//!
//! - [`KeyNotFound`] the entity is absent or not visible to the actor.
//! - [`Forbidden`] the actor is not a member of the group.
//! - [`ExistingKey`] a unique value (login) is already taken.
//! - [`InvalidAmount`], [`InvalidRecurrence`], [`InvalidInput`],
//!   [`InvalidPage`] malformed or out-of-range input.
//! - [`Unauthorized`] missing, invalid or expired credentials.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidRecurrence`]: EngineError::InvalidRecurrence
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`InvalidPage`]: EngineError::InvalidPage
//!  [`Unauthorized`]: EngineError::Unauthorized
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid page: {0}")]
    InvalidPage(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` for errors caused by malformed or out-of-range input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::InvalidRecurrence(_)
                | Self::InvalidInput(_)
                | Self::InvalidPage(_)
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidRecurrence(a), Self::InvalidRecurrence(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidPage(a), Self::InvalidPage(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
