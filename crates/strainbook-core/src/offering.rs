//! Durable per-shop offerings and their active/discontinued lifecycle.
//!
//! An offering records that a shop has carried a strain at some point. It is
//! never deleted; only its status flips. The transition rules live here as
//! plain methods so every backend applies them identically:
//!
//! | Trigger            | Unlocked                         | Locked                 |
//! |--------------------|----------------------------------|------------------------|
//! | seen on menu       | fields refreshed, becomes active | fields refreshed only  |
//! | missing from menu  | active becomes discontinued      | untouched              |
//! | manual set         | status forced, lock set          | status forced, lock set|

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{ShopId, entry::EntryFields, strain::StrainId};

/// Reason recorded when a reconciliation sweep discontinues an offering.
pub const MISSING_FROM_MENU: &str = "missing from latest menu";

/// Reason recorded for a manual discontinue with no reason given.
pub const MANUAL_REASON: &str = "manual";

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
pub struct OfferingId(pub i64);

impl fmt::Display for OfferingId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OfferingStatus {
  Active,
  Discontinued,
}

/// Why and since when an offering stopped being carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discontinuation {
  pub reason:     String,
  pub since:      DateTime<Utc>,
  /// Free text such as "back in spring"; never interpreted.
  pub until_hint: Option<String>,
}

/// An explicit operator decision about an offering's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ManualStatus {
  Active,
  Discontinued {
    reason:     Option<String>,
    until_hint: Option<String>,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
  pub offering_id:  OfferingId,
  pub shop_id:      ShopId,
  pub strain_id:    StrainId,
  pub strain_name:  String,
  #[serde(flatten)]
  pub fields:       EntryFields,
  pub status:       OfferingStatus,
  pub discontinued: Option<Discontinuation>,
  /// When set, only a manual status change may alter `status` or
  /// `discontinued`.
  pub manual_lock:  bool,
  pub last_seen:    DateTime<Utc>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl Offering {
  pub fn is_active(&self) -> bool { self.status == OfferingStatus::Active }

  /// The strain appeared on the shop's current menu at `now`.
  ///
  /// Descriptive fields are always refreshed. Status is reset to active only
  /// when the offering is unlocked.
  pub fn record_sighting(&mut self, fields: EntryFields, now: DateTime<Utc>) {
    self.fields = fields;
    self.last_seen = now;
    self.updated_at = now;
    if !self.manual_lock {
      self.status = OfferingStatus::Active;
      self.discontinued = None;
    }
  }

  /// The strain is absent from the shop's current menu. Returns whether the
  /// offering changed.
  pub fn record_missing(&mut self, now: DateTime<Utc>) -> bool {
    if self.manual_lock || !self.is_active() {
      return false;
    }
    self.status = OfferingStatus::Discontinued;
    self.discontinued = Some(Discontinuation {
      reason:     MISSING_FROM_MENU.to_owned(),
      since:      now,
      until_hint: None,
    });
    self.updated_at = now;
    true
  }

  /// Force the status and set the lock to `lock`.
  pub fn set_manual(
    &mut self,
    status: ManualStatus,
    lock: bool,
    now: DateTime<Utc>,
  ) {
    match status {
      ManualStatus::Active => {
        self.status = OfferingStatus::Active;
        self.discontinued = None;
      }
      ManualStatus::Discontinued { reason, until_hint } => {
        self.status = OfferingStatus::Discontinued;
        self.discontinued = Some(Discontinuation {
          reason: reason
            .map(|r| r.trim().to_owned())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| MANUAL_REASON.to_owned()),
          since: now,
          until_hint: until_hint
            .map(|h| h.trim().to_owned())
            .filter(|h| !h.is_empty()),
        });
      }
    }
    self.manual_lock = lock;
    self.updated_at = now;
  }
}
