//! The safety guard evaluated before a shop's offerings are reconciled
//! against its current menu, and the report of a completed reconciliation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Below this many active unlocked offerings a full wipe is not suspicious.
pub const MASS_DISCONTINUE_THRESHOLD: usize = 5;

/// Explicit confirmations a caller may pass to bypass the guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOverride {
  /// Reconcile even though the shop has no current menu entries.
  pub allow_empty: bool,
  /// Reconcile even though every active unlocked offering would be dropped.
  pub allow_mass:  bool,
}

impl ReconcileOverride {
  pub fn force() -> Self { Self { allow_empty: true, allow_mass: true } }
}

/// Counts describing what reconciling a shop right now would do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyCheck {
  pub menu_entry_count:       usize,
  pub active_count:           usize,
  pub active_unlocked_count:  usize,
  pub would_auto_discontinue: usize,
}

/// Why a reconciliation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SafetyStop {
  /// No current entries while offerings are still active.
  EmptyMenu { active: usize },
  /// Every active unlocked offering is missing from a non-empty menu.
  MassDiscontinue { would_discontinue: usize },
}

impl fmt::Display for SafetyStop {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::EmptyMenu { active } => write!(
        f,
        "no current menu entries; reconciling would discontinue all {active} \
         active offerings (pass allow_empty to confirm)"
      ),
      Self::MassDiscontinue { would_discontinue } => write!(
        f,
        "reconciling would auto-discontinue all {would_discontinue} active \
         offerings (pass allow_mass to confirm)"
      ),
    }
  }
}

impl SafetyCheck {
  /// Whether reconciling would wipe every active unlocked offering from a
  /// non-empty menu.
  pub fn requires_mass_confirm(&self) -> bool {
    self.menu_entry_count > 0
      && self.active_unlocked_count >= MASS_DISCONTINUE_THRESHOLD
      && self.would_auto_discontinue == self.active_unlocked_count
  }

  pub fn requires_empty_confirm(&self) -> bool {
    self.menu_entry_count == 0 && self.active_count > 0
  }

  /// `Err` when reconciling must not proceed under `overrides`.
  pub fn evaluate(&self, overrides: ReconcileOverride) -> Result<(), SafetyStop> {
    if self.requires_empty_confirm() && !overrides.allow_empty {
      return Err(SafetyStop::EmptyMenu { active: self.active_count });
    }
    if self.requires_mass_confirm() && !overrides.allow_mass {
      return Err(SafetyStop::MassDiscontinue {
        would_discontinue: self.would_auto_discontinue,
      });
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
  /// Offerings upserted from current menu entries.
  pub synced:       usize,
  /// Offerings moved to discontinued by the sweep.
  pub discontinued: usize,
  pub check:        SafetyCheck,
}
