//! Strain registry: create-if-absent, rename in place, and merge.
//!
//! Writers take a `&Transaction` so callers decide the unit of work; the
//! edit path composes [`rename_or_merge`] with its own entry update.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, Transaction, params};
use strainbook_core::{
  normalize::{NormalizedName, normalize},
  strain::{RenameOutcome, Strain, StrainId},
};

use crate::{
  Result,
  encode::{RawStrain, STRAIN_COLUMNS, encode_dt},
};

/// Upper bound for [`suggest`] results.
pub const MAX_SUGGESTIONS: usize = 100;

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn strain_by_id(conn: &Connection, id: StrainId) -> Result<Option<Strain>> {
  let raw = conn
    .prepare_cached(&format!(
      "SELECT {STRAIN_COLUMNS} FROM strains s WHERE s.strain_id = ?1"
    ))?
    .query_row(params![id.0], RawStrain::from_row)
    .optional()?;
  raw.map(RawStrain::into_strain).transpose()
}

pub fn strain_by_key(conn: &Connection, key: &str) -> Result<Option<Strain>> {
  let raw = conn
    .prepare_cached(&format!(
      "SELECT {STRAIN_COLUMNS} FROM strains s WHERE s.matching_key = ?1"
    ))?
    .query_row(params![key], RawStrain::from_row)
    .optional()?;
  raw.map(RawStrain::into_strain).transpose()
}

/// Find the strain `name` normalises to.
pub fn find(conn: &Connection, name: &str) -> Result<Option<Strain>> {
  let name = normalize(name)?;
  strain_by_key(conn, &name.matching_key)
}

/// Display-name prefix search; a blank prefix lists the newest strains.
pub fn suggest(conn: &Connection, prefix: &str, limit: usize) -> Result<Vec<Strain>> {
  let limit = limit.clamp(1, MAX_SUGGESTIONS) as i64;
  let prefix = prefix.trim();

  let raws = if prefix.is_empty() {
    conn
      .prepare_cached(&format!(
        "SELECT {STRAIN_COLUMNS} FROM strains s
         ORDER BY s.strain_id DESC
         LIMIT ?1"
      ))?
      .query_map(params![limit], RawStrain::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
  } else {
    conn
      .prepare_cached(&format!(
        "SELECT {STRAIN_COLUMNS} FROM strains s
         WHERE s.display_name LIKE ?1 ESCAPE '\\'
         ORDER BY s.display_name
         LIMIT ?2"
      ))?
      .query_map(params![like_prefix(prefix), limit], RawStrain::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  raws.into_iter().map(RawStrain::into_strain).collect()
}

/// `prefix%` with LIKE wildcards in `prefix` escaped.
fn like_prefix(prefix: &str) -> String {
  let mut pattern = String::with_capacity(prefix.len() + 1);
  for c in prefix.chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Return the strain holding `name`'s matching key, refreshing its display
/// name to the latest input, or create one.
pub fn resolve_or_create(
  tx: &Transaction<'_>,
  name: &str,
  now: DateTime<Utc>,
) -> Result<Strain> {
  let name = normalize(name)?;
  tx.prepare_cached(
    "INSERT INTO strains (matching_key, display_name, created_at)
     VALUES (?1, ?2, ?3)
     ON CONFLICT (matching_key) DO UPDATE SET
       display_name = excluded.display_name",
  )?
  .execute(params![name.matching_key, name.display_name, encode_dt(now)])?;

  let raw = tx
    .prepare_cached(&format!(
      "SELECT {STRAIN_COLUMNS} FROM strains s WHERE s.matching_key = ?1"
    ))?
    .query_row(params![name.matching_key], RawStrain::from_row)?;
  let strain = raw.into_strain()?;
  tracing::debug!(strain = %strain.strain_id, name = %strain.display_name, "resolved strain");
  Ok(strain)
}

/// Rename `strain_id` to `new_name`, merging it into an existing strain when
/// another one already holds the target matching key.
pub fn rename_or_merge(
  tx: &Transaction<'_>,
  strain_id: StrainId,
  new_name: &str,
) -> Result<RenameOutcome> {
  let target = normalize(new_name)?;
  let current = strain_by_id(tx, strain_id)?
    .ok_or(strainbook_core::Error::StrainNotFound(strain_id))?;

  if current.matching_key == target.matching_key
    && current.display_name == target.display_name
  {
    return Ok(RenameOutcome::Unchanged { strain_id });
  }

  match strain_by_key(tx, &target.matching_key)? {
    Some(existing) if existing.strain_id != strain_id => {
      merge(tx, strain_id, existing.strain_id, &target)
    }
    _ => {
      tx.prepare_cached(
        "UPDATE strains SET matching_key = ?1, display_name = ?2
         WHERE strain_id = ?3",
      )?
      .execute(params![target.matching_key, target.display_name, strain_id.0])?;
      tracing::info!(
        strain = %strain_id,
        from = %current.display_name,
        to = %target.display_name,
        "renamed strain"
      );
      Ok(RenameOutcome::Renamed { strain_id })
    }
  }
}

/// Fold every reference to `from` into `into`, then delete `from`.
///
/// The surviving strain also takes the freshly normalised display name.
fn merge(
  tx: &Transaction<'_>,
  from: StrainId,
  into: StrainId,
  target: &NormalizedName,
) -> Result<RenameOutcome> {
  let (entries_repointed, entries_dropped) =
    fold_references(tx, Table::MenuEntries, from, into)?;
  let (offerings_repointed, offerings_dropped) =
    fold_references(tx, Table::Offerings, from, into)?;

  tx.prepare_cached("DELETE FROM strains WHERE strain_id = ?1")?
    .execute(params![from.0])?;
  tx.prepare_cached("UPDATE strains SET display_name = ?1 WHERE strain_id = ?2")?
    .execute(params![target.display_name, into.0])?;

  tracing::info!(
    from = %from,
    into = %into,
    name = %target.display_name,
    entries_repointed,
    entries_dropped,
    offerings_repointed,
    offerings_dropped,
    "merged strain"
  );

  Ok(RenameOutcome::Merged {
    from,
    into,
    entries_repointed,
    entries_dropped,
    offerings_repointed,
    offerings_dropped,
  })
}

#[derive(Clone, Copy)]
enum Table {
  MenuEntries,
  Offerings,
}

impl Table {
  fn name(self) -> &'static str {
    match self {
      Self::MenuEntries => "menu_entries",
      Self::Offerings => "offerings",
    }
  }
}

/// Repoint `table` rows from `from` to `into`, shop by shop. A shop that
/// already has its own `into` row keeps it and loses the `from` row.
///
/// Returns `(repointed, dropped)`.
fn fold_references(
  tx: &Transaction<'_>,
  table: Table,
  from: StrainId,
  into: StrainId,
) -> Result<(usize, usize)> {
  let table = table.name();
  let shops: Vec<i64> = tx
    .prepare_cached(&format!(
      "SELECT shop_id FROM {table} WHERE strain_id = ?1 ORDER BY shop_id"
    ))?
    .query_map(params![from.0], |row| row.get(0))?
    .collect::<rusqlite::Result<_>>()?;

  let mut repointed = 0;
  let mut dropped = 0;
  for shop in shops {
    let taken: bool = tx
      .prepare_cached(&format!(
        "SELECT EXISTS (
           SELECT 1 FROM {table} WHERE shop_id = ?1 AND strain_id = ?2
         )"
      ))?
      .query_row(params![shop, into.0], |row| row.get(0))?;

    if taken {
      tx.prepare_cached(&format!(
        "DELETE FROM {table} WHERE shop_id = ?1 AND strain_id = ?2"
      ))?
      .execute(params![shop, from.0])?;
      dropped += 1;
    } else {
      tx.prepare_cached(&format!(
        "UPDATE {table} SET strain_id = ?1 WHERE shop_id = ?2 AND strain_id = ?3"
      ))?
      .execute(params![into.0, shop, from.0])?;
      repointed += 1;
    }
  }
  Ok((repointed, dropped))
}
