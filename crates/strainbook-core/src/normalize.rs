//! Identity normalisation for free-text strain names.
//!
//! Two forms come out of every name: a `matching_key` used for uniqueness and
//! lookup, and a `display_name` shown to people. Coded names such as `AK47`
//! or `g 13` are upper-cased in both forms; everything else keeps the
//! operator's capitalisation for display and matches case-insensitively.

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Longest string (in characters) still treated as a strain code.
pub const MAX_CODE_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedName {
  pub matching_key: String,
  pub display_name: String,
}

/// Normalise `raw` into its matching key and display form.
///
/// Fails with [`ValidationError::BlankName`] when nothing but whitespace
/// remains.
pub fn normalize(raw: &str) -> Result<NormalizedName, ValidationError> {
  let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
  if collapsed.is_empty() {
    return Err(ValidationError::BlankName);
  }

  if is_coded(&collapsed) {
    let display_name = collapsed
      .split(' ')
      .map(|token| token.to_ascii_uppercase())
      .collect::<Vec<_>>()
      .join(" ");
    return Ok(NormalizedName {
      matching_key: display_name.clone(),
      display_name,
    });
  }

  Ok(NormalizedName {
    matching_key: collapsed.to_lowercase(),
    display_name: collapsed,
  })
}

/// A code has at least one digit, only ASCII letters, digits, hyphens and
/// spaces, and is short.
fn is_coded(s: &str) -> bool {
  s.chars().count() <= MAX_CODE_LEN
    && s.chars().any(|c| c.is_ascii_digit())
    && s
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ')
}
