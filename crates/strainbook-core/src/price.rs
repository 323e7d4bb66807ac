//! Product categories, currencies and price amounts, with the parsers that
//! turn operator-typed text into them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::ValidationError;

/// Every price is per gram.
pub const UNIT: &str = "g";

// ─── Category ────────────────────────────────────────────────────────────────

/// The product type of a menu line.
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
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
  Sativa,
  Indica,
  Hybrid,
  Hash,
}

impl Category {
  pub fn parse(raw: &str) -> Result<Self, ValidationError> {
    Self::from_str(raw.trim())
      .map_err(|_| ValidationError::UnknownCategory(raw.trim().to_owned()))
  }
}

// ─── Currency ────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
pub enum Currency {
  #[default]
  #[serde(rename = "€")]
  #[strum(serialize = "€")]
  Euro,
  #[serde(rename = "£")]
  #[strum(serialize = "£")]
  Pound,
  #[serde(rename = "$")]
  #[strum(serialize = "$")]
  Dollar,
}

impl Currency {
  /// Parse a currency symbol. Blank input falls back to the default (`€`).
  pub fn parse(raw: &str) -> Result<Self, ValidationError> {
    let symbol = raw.trim();
    if symbol.is_empty() {
      return Ok(Self::default());
    }
    Self::from_str(symbol)
      .map_err(|_| ValidationError::UnsupportedCurrency(symbol.to_owned()))
  }
}

// ─── Amount ──────────────────────────────────────────────────────────────────

/// A non-negative price amount held exactly, in hundredths.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
  pub const fn from_cents(cents: u64) -> Self { Self(cents) }

  pub const fn cents(self) -> u64 { self.0 }

  /// Parse `12`, `12.5` or `12,5`. Digits past the hundredths round half
  /// up.
  pub fn parse(raw: &str) -> Result<Self, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
      return Err(ValidationError::MissingAmount);
    }
    let text = text.replace(',', ".");
    let invalid = || ValidationError::InvalidAmount(raw.trim().to_owned());

    if let Some(rest) = text.strip_prefix('-') {
      return match Self::parse_unsigned(rest) {
        Some(_) => Err(ValidationError::NegativeAmount(raw.trim().to_owned())),
        None => Err(invalid()),
      };
    }
    Self::parse_unsigned(&text).ok_or_else(invalid)
  }

  fn parse_unsigned(text: &str) -> Option<Self> {
    let (whole, frac) = match text.split_once('.') {
      Some((whole, frac)) => (whole, frac),
      None => (text, ""),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
      return None;
    }
    if text.contains('.') && frac.is_empty() {
      return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
      return None;
    }
    let digits = frac.as_bytes();
    let digit = |i: usize| digits.get(i).map_or(0, |b| u64::from(b - b'0'));
    let round_up = u64::from(digit(2) >= 5);
    let frac_cents = digit(0) * 10 + digit(1) + round_up;

    let whole: u64 = whole.parse().ok()?;
    whole.checked_mul(100)?.checked_add(frac_cents).map(Self)
  }
}

impl fmt::Display for Amount {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
  }
}

// ─── Price ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
  pub currency: Currency,
  pub amount:   Amount,
}

impl fmt::Display for Price {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}/{UNIT}", self.currency, self.amount)
  }
}
