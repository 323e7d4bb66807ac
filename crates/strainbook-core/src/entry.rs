//! Current-menu entries: the working set an operator edits while
//! transcribing one photographed menu.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  ShopId, ValidationError,
  price::{Amount, Category, Currency, Price},
  strain::{RenameOutcome, StrainId},
};

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
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// Raw operator input for one menu line, exactly as typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryDraft {
  pub category: String,
  /// The "cali" flag; independent of category.
  pub overlay:  bool,
  pub currency: String,
  pub amount:   String,
  pub note:     String,
}

impl EntryDraft {
  pub fn new(category: &str, currency: &str, amount: &str) -> Self {
    Self {
      category: category.to_owned(),
      overlay:  false,
      currency: currency.to_owned(),
      amount:   amount.to_owned(),
      note:     String::new(),
    }
  }

  pub fn with_overlay(mut self, overlay: bool) -> Self {
    self.overlay = overlay;
    self
  }

  pub fn with_note(mut self, note: &str) -> Self {
    self.note = note.to_owned();
    self
  }

  /// Check every field; the first invalid one is reported.
  pub fn validate(&self) -> Result<EntryFields, ValidationError> {
    Ok(EntryFields {
      category: Category::parse(&self.category)?,
      overlay:  self.overlay,
      price:    Price {
        currency: Currency::parse(&self.currency)?,
        amount:   Amount::parse(&self.amount)?,
      },
      note:     self.note.trim().to_owned(),
    })
  }
}

/// Validated descriptive fields shared by menu entries and offerings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFields {
  pub category: Category,
  pub overlay:  bool,
  pub price:    Price,
  pub note:     String,
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// A menu entry joined with its strain's current display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
  pub entry_id:    EntryId,
  pub shop_id:     ShopId,
  pub strain_id:   StrainId,
  pub strain_name: String,
  #[serde(flatten)]
  pub fields:      EntryFields,
  pub recorded_at: DateTime<Utc>,
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of editing a menu entry by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryUpdate {
  /// The entry now carries the new fields (and possibly a new strain id).
  Updated {
    entry:  MenuEntry,
    rename: RenameOutcome,
  },
  /// Renaming merged the entry's strain into one this shop already listed;
  /// the edited entry was removed in favour of the existing one.
  DuplicateRemoved {
    removed: EntryId,
    kept:    Option<EntryId>,
    rename:  RenameOutcome,
  },
}

/// Row counts around a bulk delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
  pub before:  usize,
  pub after:   usize,
  pub removed: usize,
}

impl DeleteSummary {
  pub fn new(before: usize, after: usize) -> Self {
    Self { before, after, removed: before.saturating_sub(after) }
  }
}

/// Sorted, de-duplicated, strictly positive ids.
pub fn clean_entry_ids(ids: impl IntoIterator<Item = EntryId>) -> Vec<EntryId> {
  let mut ids: Vec<EntryId> = ids.into_iter().filter(|id| id.0 > 0).collect();
  ids.sort_unstable();
  ids.dedup();
  ids
}
