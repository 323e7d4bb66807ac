//! Offering catalogue and reconciler.
//!
//! Status transitions are applied as read-modify-write through the methods
//! on [`Offering`], so the manual lock guards status fields exactly as the
//! core defines it.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, Transaction, params};
use strainbook_core::{
  ShopId,
  entry::EntryFields,
  offering::{ManualStatus, Offering, OfferingStatus},
  reconcile::{ReconcileOverride, ReconcileReport, SafetyCheck},
  strain::StrainId,
};

use crate::{
  Result,
  encode::{OFFERING_COLUMNS, RawOffering, encode_amount, encode_dt},
  entries,
};

/// Upper bound for [`find_active`] results.
pub const MAX_LOOKUP: usize = 1500;

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn offering_by_shop_strain(
  conn: &Connection,
  shop: ShopId,
  strain: StrainId,
) -> Result<Option<Offering>> {
  let raw = conn
    .prepare_cached(&format!(
      "SELECT {OFFERING_COLUMNS}
       FROM offerings o
       JOIN strains s ON s.strain_id = o.strain_id
       WHERE o.shop_id = ?1 AND o.strain_id = ?2"
    ))?
    .query_row(params![shop.0, strain.0], RawOffering::from_row)
    .optional()?;
  raw.map(RawOffering::into_offering).transpose()
}

/// Active first, then by strain display name.
pub fn list_for_shop(conn: &Connection, shop: ShopId) -> Result<Vec<Offering>> {
  let raws = conn
    .prepare_cached(&format!(
      "SELECT {OFFERING_COLUMNS}
       FROM offerings o
       JOIN strains s ON s.strain_id = o.strain_id
       WHERE o.shop_id = ?1
       ORDER BY CASE o.status WHEN 'active' THEN 0 ELSE 1 END,
                s.display_name,
                o.offering_id"
    ))?
    .query_map(params![shop.0], RawOffering::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawOffering::into_offering).collect()
}

/// Active offerings in any shop whose strain display name contains `query`.
pub fn find_active(
  conn: &Connection,
  query: &str,
  limit: usize,
) -> Result<Vec<Offering>> {
  let needle = query.trim().to_ascii_lowercase();
  if needle.is_empty() {
    return Ok(Vec::new());
  }
  let limit = limit.clamp(1, MAX_LOOKUP) as i64;

  let raws = conn
    .prepare_cached(&format!(
      "SELECT {OFFERING_COLUMNS}
       FROM offerings o
       JOIN strains s ON s.strain_id = o.strain_id
       WHERE o.status = 'active'
         AND instr(lower(s.display_name), ?1) > 0
       ORDER BY s.display_name, o.shop_id
       LIMIT ?2"
    ))?
    .query_map(params![needle, limit], RawOffering::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawOffering::into_offering).collect()
}

fn count(conn: &Connection, sql: &str, shop: ShopId) -> Result<usize> {
  let n: i64 = conn.prepare_cached(sql)?.query_row(params![shop.0], |r| r.get(0))?;
  Ok(usize::try_from(n).unwrap_or_default())
}

pub fn safety_check(conn: &Connection, shop: ShopId) -> Result<SafetyCheck> {
  Ok(SafetyCheck {
    menu_entry_count:       count(
      conn,
      "SELECT COUNT(*) FROM menu_entries WHERE shop_id = ?1",
      shop,
    )?,
    active_count:           count(
      conn,
      "SELECT COUNT(*) FROM offerings WHERE shop_id = ?1 AND status = 'active'",
      shop,
    )?,
    active_unlocked_count:  count(
      conn,
      "SELECT COUNT(*) FROM offerings
       WHERE shop_id = ?1 AND status = 'active' AND manual_lock = 0",
      shop,
    )?,
    would_auto_discontinue: count(
      conn,
      "SELECT COUNT(*) FROM offerings
       WHERE shop_id = ?1 AND status = 'active' AND manual_lock = 0
         AND strain_id NOT IN (
           SELECT strain_id FROM menu_entries WHERE shop_id = ?1
         )",
      shop,
    )?,
  })
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Persist every mutable column of `offering`.
fn write_back(tx: &Transaction<'_>, offering: &Offering) -> Result<()> {
  let discontinued = offering.discontinued.as_ref();
  tx.prepare_cached(
    "UPDATE offerings SET
       category            = ?1,
       overlay             = ?2,
       price_currency      = ?3,
       price_cents         = ?4,
       note                = ?5,
       status              = ?6,
       discontinued_reason = ?7,
       discontinued_since  = ?8,
       discontinued_until  = ?9,
       manual_lock         = ?10,
       last_seen           = ?11,
       updated_at          = ?12
     WHERE offering_id = ?13",
  )?
  .execute(params![
    offering.fields.category.as_ref(),
    offering.fields.overlay,
    offering.fields.price.currency.as_ref(),
    encode_amount(offering.fields.price.amount)?,
    offering.fields.note,
    offering.status.as_ref(),
    discontinued.map(|d| d.reason.as_str()),
    discontinued.map(|d| encode_dt(d.since)),
    discontinued.and_then(|d| d.until_hint.as_deref()),
    offering.manual_lock,
    encode_dt(offering.last_seen),
    encode_dt(offering.updated_at),
    offering.offering_id.0,
  ])?;
  Ok(())
}

/// Sync-from-menu: upsert the offering for (`shop`, `strain`) with `fields`
/// and mark it seen at `now`.
pub fn sync_from_menu(
  tx: &Transaction<'_>,
  shop: ShopId,
  strain: StrainId,
  fields: &EntryFields,
  now: DateTime<Utc>,
) -> Result<Offering> {
  if let Some(mut offering) = offering_by_shop_strain(tx, shop, strain)? {
    offering.record_sighting(fields.clone(), now);
    write_back(tx, &offering)?;
    tracing::debug!(shop = %shop, strain = %strain, status = %offering.status, "refreshed offering");
    return Ok(offering);
  }

  let at = encode_dt(now);
  tx.prepare_cached(
    "INSERT INTO offerings (
       shop_id, strain_id, category, overlay, price_currency, price_cents,
       note, status, manual_lock, last_seen, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9, ?9)",
  )?
  .execute(params![
    shop.0,
    strain.0,
    fields.category.as_ref(),
    fields.overlay,
    fields.price.currency.as_ref(),
    encode_amount(fields.price.amount)?,
    fields.note,
    OfferingStatus::Active.as_ref(),
    at,
  ])?;
  tracing::debug!(shop = %shop, strain = %strain, "created offering");

  let raw = tx
    .prepare_cached(&format!(
      "SELECT {OFFERING_COLUMNS}
       FROM offerings o
       JOIN strains s ON s.strain_id = o.strain_id
       WHERE o.shop_id = ?1 AND o.strain_id = ?2"
    ))?
    .query_row(params![shop.0, strain.0], RawOffering::from_row)?;
  raw.into_offering()
}

/// Sync every current entry of `shop`, then discontinue active unlocked
/// offerings whose strain is not on the menu.
pub fn reconcile(
  tx: &Transaction<'_>,
  shop: ShopId,
  overrides: ReconcileOverride,
  now: DateTime<Utc>,
) -> Result<ReconcileReport> {
  let check = safety_check(tx, shop)?;
  if let Err(stop) = check.evaluate(overrides) {
    tracing::warn!(shop = %shop, ?check, %stop, "reconciliation refused");
    return Err(strainbook_core::Error::ReconcileRefused(stop).into());
  }

  let current = entries::list_for_shop(tx, shop)?;
  for entry in &current {
    sync_from_menu(tx, shop, entry.strain_id, &entry.fields, now)?;
  }

  let missing = tx
    .prepare_cached(&format!(
      "SELECT {OFFERING_COLUMNS}
       FROM offerings o
       JOIN strains s ON s.strain_id = o.strain_id
       WHERE o.shop_id = ?1
         AND o.status = 'active'
         AND o.manual_lock = 0
         AND o.strain_id NOT IN (
           SELECT strain_id FROM menu_entries WHERE shop_id = ?1
         )"
    ))?
    .query_map(params![shop.0], RawOffering::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut discontinued = 0;
  for raw in missing {
    let mut offering = raw.into_offering()?;
    if offering.record_missing(now) {
      write_back(tx, &offering)?;
      discontinued += 1;
    }
  }

  let report = ReconcileReport { synced: current.len(), discontinued, check };
  tracing::info!(shop = %shop, synced = report.synced, discontinued, "reconciled offerings");
  Ok(report)
}

/// Manual set: force the status of (`shop`, `strain`) and set its lock.
pub fn set_status(
  tx: &Transaction<'_>,
  shop: ShopId,
  strain: StrainId,
  status: ManualStatus,
  lock: bool,
  now: DateTime<Utc>,
) -> Result<Offering> {
  let mut offering = offering_by_shop_strain(tx, shop, strain)?
    .ok_or(strainbook_core::Error::OfferingNotFound { shop, strain })?;
  offering.set_manual(status, lock, now);
  write_back(tx, &offering)?;
  tracing::info!(
    shop = %shop,
    strain = %strain,
    status = %offering.status,
    lock,
    "set offering status"
  );
  Ok(offering)
}
