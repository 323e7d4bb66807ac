//! Strain identities and the outcome of correcting one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct StrainId(pub i64);

impl fmt::Display for StrainId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// A product identity. `matching_key` is unique across all strains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strain {
  pub strain_id:    StrainId,
  pub matching_key: String,
  pub display_name: String,
  pub created_at:   DateTime<Utc>,
}

/// What [`crate::store::CatalogueStore::rename_or_merge`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenameOutcome {
  /// The submitted name normalised to exactly what was stored.
  Unchanged { strain_id: StrainId },
  /// The strain kept its id and took the new key and display name.
  Renamed { strain_id: StrainId },
  /// The source strain was folded into an existing strain and deleted.
  Merged {
    /// The deleted strain.
    from: StrainId,
    /// The surviving strain; always the one that already held the key.
    into: StrainId,
    /// Menu entries repointed from `from` to `into`.
    entries_repointed: usize,
    /// Menu entries dropped because the shop already listed `into`.
    entries_dropped: usize,
    offerings_repointed: usize,
    offerings_dropped: usize,
  },
}

impl RenameOutcome {
  /// The id callers should use from now on.
  pub fn strain_id(&self) -> StrainId {
    match *self {
      Self::Unchanged { strain_id } | Self::Renamed { strain_id } => strain_id,
      Self::Merged { into, .. } => into,
    }
  }

  pub fn is_merge(&self) -> bool { matches!(self, Self::Merged { .. }) }
}
