//! Menu entry store: the per-shop working set of the menu being transcribed.
//!
//! Every write that leaves an entry in place also syncs its offering, so the
//! catalogue reflects edits immediately.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, Transaction, params, params_from_iter};
use strainbook_core::{
  ShopId,
  entry::{DeleteSummary, EntryFields, EntryId, EntryUpdate, MenuEntry, clean_entry_ids},
  strain::StrainId,
};

use crate::{
  Result,
  catalogue,
  encode::{ENTRY_COLUMNS, RawMenuEntry, encode_amount, encode_dt},
  registry,
};

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn entry_by_id(
  conn: &Connection,
  shop: ShopId,
  entry_id: EntryId,
) -> Result<Option<MenuEntry>> {
  let raw = conn
    .prepare_cached(&format!(
      "SELECT {ENTRY_COLUMNS}
       FROM menu_entries e
       JOIN strains s ON s.strain_id = e.strain_id
       WHERE e.entry_id = ?1 AND e.shop_id = ?2"
    ))?
    .query_row(params![entry_id.0, shop.0], RawMenuEntry::from_row)
    .optional()?;
  raw.map(RawMenuEntry::into_entry).transpose()
}

fn entry_by_shop_strain(
  conn: &Connection,
  shop: ShopId,
  strain: StrainId,
) -> Result<MenuEntry> {
  let raw = conn
    .prepare_cached(&format!(
      "SELECT {ENTRY_COLUMNS}
       FROM menu_entries e
       JOIN strains s ON s.strain_id = e.strain_id
       WHERE e.shop_id = ?1 AND e.strain_id = ?2"
    ))?
    .query_row(params![shop.0, strain.0], RawMenuEntry::from_row)?;
  raw.into_entry()
}

/// Ordered by strain display name.
pub fn list_for_shop(conn: &Connection, shop: ShopId) -> Result<Vec<MenuEntry>> {
  let raws = conn
    .prepare_cached(&format!(
      "SELECT {ENTRY_COLUMNS}
       FROM menu_entries e
       JOIN strains s ON s.strain_id = e.strain_id
       WHERE e.shop_id = ?1
       ORDER BY s.display_name, e.entry_id"
    ))?
    .query_map(params![shop.0], RawMenuEntry::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawMenuEntry::into_entry).collect()
}

fn count_for_shop(conn: &Connection, shop: ShopId) -> Result<usize> {
  let n: i64 = conn
    .prepare_cached("SELECT COUNT(*) FROM menu_entries WHERE shop_id = ?1")?
    .query_row(params![shop.0], |r| r.get(0))?;
  Ok(usize::try_from(n).unwrap_or_default())
}

// ─── Writes ──────────────────────────────────────────────────────────────────

fn write_entry(
  tx: &Transaction<'_>,
  shop: ShopId,
  strain: StrainId,
  fields: &EntryFields,
  now: DateTime<Utc>,
) -> Result<()> {
  tx.prepare_cached(
    "INSERT INTO menu_entries (
       shop_id, strain_id, category, overlay, price_currency, price_cents,
       note, recorded_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT (shop_id, strain_id) DO UPDATE SET
       category       = excluded.category,
       overlay        = excluded.overlay,
       price_currency = excluded.price_currency,
       price_cents    = excluded.price_cents,
       note           = excluded.note,
       recorded_at    = excluded.recorded_at",
  )?
  .execute(params![
    shop.0,
    strain.0,
    fields.category.as_ref(),
    fields.overlay,
    fields.price.currency.as_ref(),
    encode_amount(fields.price.amount)?,
    fields.note,
    encode_dt(now),
  ])?;
  Ok(())
}

/// Insert or replace the entry for (`shop`, `strain`) and sync its offering.
pub fn upsert(
  tx: &Transaction<'_>,
  shop: ShopId,
  strain: StrainId,
  fields: &EntryFields,
  now: DateTime<Utc>,
) -> Result<MenuEntry> {
  if registry::strain_by_id(tx, strain)?.is_none() {
    return Err(strainbook_core::Error::StrainNotFound(strain).into());
  }
  write_entry(tx, shop, strain, fields, now)?;
  catalogue::sync_from_menu(tx, shop, strain, fields, now)?;

  let entry = entry_by_shop_strain(tx, shop, strain)?;
  tracing::debug!(shop = %shop, entry = %entry.entry_id, strain = %entry.strain_name, "saved menu entry");
  Ok(entry)
}

/// Edit an entry by id, renaming or merging its strain when the name
/// changed.
pub fn update(
  tx: &Transaction<'_>,
  shop: ShopId,
  entry_id: EntryId,
  new_name: &str,
  fields: &EntryFields,
  now: DateTime<Utc>,
) -> Result<EntryUpdate> {
  let entry = entry_by_id(tx, shop, entry_id)?
    .ok_or(strainbook_core::Error::EntryNotFound { shop, entry: entry_id })?;

  let rename = registry::rename_or_merge(tx, entry.strain_id, new_name)?;
  let strain = rename.strain_id();

  if strain != entry.strain_id {
    // The merge may already have dropped this entry because the shop listed
    // the surviving strain; otherwise look for a clash ourselves.
    let kept: Option<i64> = tx
      .prepare_cached(
        "SELECT entry_id FROM menu_entries
         WHERE shop_id = ?1 AND strain_id = ?2 AND entry_id != ?3",
      )?
      .query_row(params![shop.0, strain.0, entry_id.0], |r| r.get(0))
      .optional()?;
    let still_there = entry_by_id(tx, shop, entry_id)?.is_some();

    if kept.is_some() || !still_there {
      tx.prepare_cached("DELETE FROM menu_entries WHERE entry_id = ?1 AND shop_id = ?2")?
        .execute(params![entry_id.0, shop.0])?;
      tracing::info!(
        shop = %shop,
        entry = %entry_id,
        into = %strain,
        "edited entry merged into existing entry; duplicate removed"
      );
      return Ok(EntryUpdate::DuplicateRemoved {
        removed: entry_id,
        kept: kept.map(EntryId),
        rename,
      });
    }
  }

  tx.prepare_cached(
    "UPDATE menu_entries SET
       strain_id      = ?1,
       category       = ?2,
       overlay        = ?3,
       price_currency = ?4,
       price_cents    = ?5,
       note           = ?6,
       recorded_at    = ?7
     WHERE entry_id = ?8 AND shop_id = ?9",
  )?
  .execute(params![
    strain.0,
    fields.category.as_ref(),
    fields.overlay,
    fields.price.currency.as_ref(),
    encode_amount(fields.price.amount)?,
    fields.note,
    encode_dt(now),
    entry_id.0,
    shop.0,
  ])?;
  catalogue::sync_from_menu(tx, shop, strain, fields, now)?;

  let entry = entry_by_id(tx, shop, entry_id)?
    .ok_or(strainbook_core::Error::EntryNotFound { shop, entry: entry_id })?;
  tracing::debug!(shop = %shop, entry = %entry_id, strain = %entry.strain_name, "updated menu entry");
  Ok(EntryUpdate::Updated { entry, rename })
}

pub fn delete_one(
  tx: &Transaction<'_>,
  shop: ShopId,
  entry_id: EntryId,
) -> Result<DeleteSummary> {
  let before = count_for_shop(tx, shop)?;
  let removed = tx
    .prepare_cached("DELETE FROM menu_entries WHERE entry_id = ?1 AND shop_id = ?2")?
    .execute(params![entry_id.0, shop.0])?;
  if removed == 0 {
    return Err(strainbook_core::Error::EntryNotFound { shop, entry: entry_id }.into());
  }
  Ok(DeleteSummary::new(before, count_for_shop(tx, shop)?))
}

fn placeholders(n: usize, first: usize) -> String {
  (first..first + n)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

pub fn delete_many(
  tx: &Transaction<'_>,
  shop: ShopId,
  entry_ids: Vec<EntryId>,
) -> Result<DeleteSummary> {
  let ids = clean_entry_ids(entry_ids);
  let before = count_for_shop(tx, shop)?;
  if ids.is_empty() {
    return Ok(DeleteSummary::new(before, before));
  }

  let sql = format!(
    "DELETE FROM menu_entries WHERE shop_id = ?1 AND entry_id IN ({})",
    placeholders(ids.len(), 2)
  );
  let values = std::iter::once(shop.0).chain(ids.iter().map(|id| id.0));
  tx.execute(&sql, params_from_iter(values))?;

  let summary = DeleteSummary::new(before, count_for_shop(tx, shop)?);
  tracing::info!(shop = %shop, removed = summary.removed, "deleted selected entries");
  Ok(summary)
}

pub fn keep_only(
  tx: &Transaction<'_>,
  shop: ShopId,
  entry_ids: Vec<EntryId>,
) -> Result<DeleteSummary> {
  let ids = clean_entry_ids(entry_ids);
  let before = count_for_shop(tx, shop)?;
  if before == 0 {
    return Ok(DeleteSummary::default());
  }

  if ids.is_empty() {
    tx.prepare_cached("DELETE FROM menu_entries WHERE shop_id = ?1")?
      .execute(params![shop.0])?;
  } else {
    let sql = format!(
      "DELETE FROM menu_entries WHERE shop_id = ?1 AND entry_id NOT IN ({})",
      placeholders(ids.len(), 2)
    );
    let values = std::iter::once(shop.0).chain(ids.iter().map(|id| id.0));
    tx.execute(&sql, params_from_iter(values))?;
  }

  let summary = DeleteSummary::new(before, count_for_shop(tx, shop)?);
  tracing::info!(shop = %shop, kept = summary.after, removed = summary.removed, "kept selected entries");
  Ok(summary)
}

pub fn clear(tx: &Transaction<'_>, shop: ShopId) -> Result<DeleteSummary> {
  let before = count_for_shop(tx, shop)?;
  tx.prepare_cached("DELETE FROM menu_entries WHERE shop_id = ?1")?
    .execute(params![shop.0])?;
  tracing::info!(shop = %shop, removed = before, "cleared current menu");
  Ok(DeleteSummary::new(before, 0))
}

/// Clone every active offering of `shop` into its current entries.
pub fn load_from_active_offerings(
  tx: &Transaction<'_>,
  shop: ShopId,
  replace: bool,
  now: DateTime<Utc>,
) -> Result<usize> {
  if replace {
    tx.prepare_cached("DELETE FROM menu_entries WHERE shop_id = ?1")?
      .execute(params![shop.0])?;
  }

  let active: Vec<_> = catalogue::list_for_shop(tx, shop)?
    .into_iter()
    .filter(|o| o.is_active())
    .collect();
  for offering in &active {
    write_entry(tx, shop, offering.strain_id, &offering.fields, now)?;
  }

  tracing::info!(shop = %shop, loaded = active.len(), replace, "loaded active offerings into menu");
  Ok(active.len())
}
