//! Error types for `strainbook-core`.

use thiserror::Error;

use crate::{
  ShopId, entry::EntryId, reconcile::SafetyStop, strain::StrainId,
};

/// A rejected operator-supplied field. Never accompanied by a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("strain name cannot be blank")]
  BlankName,

  #[error("category must be one of: sativa, indica, hybrid, hash (got {0:?})")]
  UnknownCategory(String),

  #[error("currency must be one of: €, £, $ (got {0:?})")]
  UnsupportedCurrency(String),

  #[error("price amount is required")]
  MissingAmount,

  #[error("price amount must be a number such as 12 or 12,5 (got {0:?})")]
  InvalidAmount(String),

  #[error("price amount cannot be negative (got {0:?})")]
  NegativeAmount(String),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation error: {0}")]
  Validation(#[from] ValidationError),

  #[error("strain not found: {0}")]
  StrainNotFound(StrainId),

  #[error("menu entry {entry} not found for shop {shop}")]
  EntryNotFound { shop: ShopId, entry: EntryId },

  #[error("no offering of strain {strain} for shop {shop}")]
  OfferingNotFound { shop: ShopId, strain: StrainId },

  #[error("reconciliation refused: {0}")]
  ReconcileRefused(SafetyStop),
}

impl Error {
  pub fn is_validation(&self) -> bool { matches!(self, Self::Validation(_)) }

  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::StrainNotFound(_)
        | Self::EntryNotFound { .. }
        | Self::OfferingNotFound { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
