//! Error type for `strainbook-store-sqlite`.

use strainbook_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Validation, not-found and refused-reconciliation outcomes.
  #[error(transparent)]
  Core(#[from] strainbook_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// Raised inside a transaction; the transaction has been rolled back.
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  /// A stored column could not be decoded into a domain value.
  #[error("decode error: {0}")]
  Decode(String),
}

impl From<ValidationError> for Error {
  fn from(e: ValidationError) -> Self {
    Self::Core(strainbook_core::Error::Validation(e))
  }
}

impl Error {
  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_validation())
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_not_found())
  }

  /// The guard refused a reconciliation.
  pub fn is_refused(&self) -> bool {
    matches!(self, Self::Core(strainbook_core::Error::ReconcileRefused(_)))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
