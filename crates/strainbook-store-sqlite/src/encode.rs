//! Encoding and decoding helpers between domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, enums as their lowercase names
//! (currencies as their symbol), amounts as integer hundredths.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use strainbook_core::{
  ShopId,
  entry::{EntryFields, EntryId, MenuEntry},
  offering::{Discontinuation, Offering, OfferingId, OfferingStatus},
  price::{Amount, Category, Currency, Price},
  strain::{Strain, StrainId},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Amount ──────────────────────────────────────────────────────────────────

pub fn encode_amount(amount: Amount) -> Result<i64> {
  i64::try_from(amount.cents())
    .map_err(|_| Error::Decode(format!("amount {amount} out of range")))
}

pub fn decode_amount(cents: i64) -> Result<Amount> {
  u64::try_from(cents)
    .map(Amount::from_cents)
    .map_err(|_| Error::Decode(format!("negative stored amount: {cents}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(what: &str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode(format!("unknown {what}: {s:?}")))
}

pub fn decode_category(s: &str) -> Result<Category> { decode_enum("category", s) }

pub fn decode_currency(s: &str) -> Result<Currency> { decode_enum("currency", s) }

pub fn decode_status(s: &str) -> Result<OfferingStatus> {
  decode_enum("offering status", s)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Select list shared by every strain query.
pub const STRAIN_COLUMNS: &str =
  "s.strain_id, s.matching_key, s.display_name, s.created_at";

/// Raw values read directly from a `strains` row.
pub struct RawStrain {
  pub strain_id:    i64,
  pub matching_key: String,
  pub display_name: String,
  pub created_at:   String,
}

impl RawStrain {
  /// Expects the columns of [`STRAIN_COLUMNS`], in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      strain_id:    row.get(0)?,
      matching_key: row.get(1)?,
      display_name: row.get(2)?,
      created_at:   row.get(3)?,
    })
  }

  pub fn into_strain(self) -> Result<Strain> {
    Ok(Strain {
      strain_id:    StrainId(self.strain_id),
      matching_key: self.matching_key,
      display_name: self.display_name,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw descriptive columns shared by `menu_entries` and `offerings`.
pub struct RawFields {
  pub category: String,
  pub overlay:  bool,
  pub currency: String,
  pub cents:    i64,
  pub note:     String,
}

impl RawFields {
  fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      category: row.get(at)?,
      overlay:  row.get(at + 1)?,
      currency: row.get(at + 2)?,
      cents:    row.get(at + 3)?,
      note:     row.get(at + 4)?,
    })
  }

  fn into_fields(self) -> Result<EntryFields> {
    Ok(EntryFields {
      category: decode_category(&self.category)?,
      overlay:  self.overlay,
      price:    Price {
        currency: decode_currency(&self.currency)?,
        amount:   decode_amount(self.cents)?,
      },
      note:     self.note,
    })
  }
}

/// Select list for menu entries joined with their strain as `s`.
pub const ENTRY_COLUMNS: &str = "e.entry_id, e.shop_id, e.strain_id, \
  s.display_name, e.category, e.overlay, e.price_currency, e.price_cents, \
  e.note, e.recorded_at";

pub struct RawMenuEntry {
  pub entry_id:    i64,
  pub shop_id:     i64,
  pub strain_id:   i64,
  pub strain_name: String,
  pub fields:      RawFields,
  pub recorded_at: String,
}

impl RawMenuEntry {
  /// Expects the columns of [`ENTRY_COLUMNS`], in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:    row.get(0)?,
      shop_id:     row.get(1)?,
      strain_id:   row.get(2)?,
      strain_name: row.get(3)?,
      fields:      RawFields::from_row(row, 4)?,
      recorded_at: row.get(9)?,
    })
  }

  pub fn into_entry(self) -> Result<MenuEntry> {
    Ok(MenuEntry {
      entry_id:    EntryId(self.entry_id),
      shop_id:     ShopId(self.shop_id),
      strain_id:   StrainId(self.strain_id),
      strain_name: self.strain_name,
      fields:      self.fields.into_fields()?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Select list for offerings joined with their strain as `s`.
pub const OFFERING_COLUMNS: &str = "o.offering_id, o.shop_id, o.strain_id, \
  s.display_name, o.category, o.overlay, o.price_currency, o.price_cents, \
  o.note, o.status, o.discontinued_reason, o.discontinued_since, \
  o.discontinued_until, o.manual_lock, o.last_seen, o.created_at, \
  o.updated_at";

pub struct RawOffering {
  pub offering_id:         i64,
  pub shop_id:             i64,
  pub strain_id:           i64,
  pub strain_name:         String,
  pub fields:              RawFields,
  pub status:              String,
  pub discontinued_reason: Option<String>,
  pub discontinued_since:  Option<String>,
  pub discontinued_until:  Option<String>,
  pub manual_lock:         bool,
  pub last_seen:           String,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawOffering {
  /// Expects the columns of [`OFFERING_COLUMNS`], in order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      offering_id:         row.get(0)?,
      shop_id:             row.get(1)?,
      strain_id:           row.get(2)?,
      strain_name:         row.get(3)?,
      fields:              RawFields::from_row(row, 4)?,
      status:              row.get(9)?,
      discontinued_reason: row.get(10)?,
      discontinued_since:  row.get(11)?,
      discontinued_until:  row.get(12)?,
      manual_lock:         row.get(13)?,
      last_seen:           row.get(14)?,
      created_at:          row.get(15)?,
      updated_at:          row.get(16)?,
    })
  }

  pub fn into_offering(self) -> Result<Offering> {
    // Reason and since travel together; a row with only one is corrupt.
    let discontinued = match (self.discontinued_reason, self.discontinued_since) {
      (Some(reason), Some(since)) => Some(Discontinuation {
        reason,
        since: decode_dt(&since)?,
        until_hint: self.discontinued_until,
      }),
      (None, None) => None,
      _ => {
        return Err(Error::Decode(format!(
          "offering {} has partial discontinuation metadata",
          self.offering_id
        )));
      }
    };

    Ok(Offering {
      offering_id: OfferingId(self.offering_id),
      shop_id: ShopId(self.shop_id),
      strain_id: StrainId(self.strain_id),
      strain_name: self.strain_name,
      fields: self.fields.into_fields()?,
      status: decode_status(&self.status)?,
      discontinued,
      manual_lock: self.manual_lock,
      last_seen: decode_dt(&self.last_seen)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
