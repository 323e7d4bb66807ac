//! [`SqliteStore`] — the SQLite implementation of [`CatalogueStore`].

use std::{path::Path, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use strainbook_core::{
  ShopId,
  clock::{Clock, SystemClock},
  entry::{DeleteSummary, EntryDraft, EntryId, EntryUpdate, MenuEntry},
  offering::{ManualStatus, Offering},
  reconcile::{ReconcileOverride, ReconcileReport, SafetyCheck},
  store::CatalogueStore,
  strain::{RenameOutcome, Strain, StrainId},
};

use crate::{Error, Result, catalogue, entries, registry, schema::SCHEMA};

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A strainbook catalogue backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  clock: Arc<dyn Clock>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, clock: Arc::new(SystemClock) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, clock: Arc::new(SystemClock) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the time source used for every timestamp this store writes.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` as one unit of work. The transaction takes the write lock up
  /// front and commits only if `f` succeeds; any error rolls it back.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>, DateTime<Utc>) -> Result<T> + Send + 'static,
  {
    let now = self.clock.now();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx, now) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => Ok(Err(e)),
        }
      })
      .await?
  }

  /// Run raw SQL on the store's connection.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &str) -> Result<()> {
    let sql = sql.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against a single read snapshot.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        Ok(f(&tx))
      })
      .await?
  }
}

// ─── CatalogueStore impl ─────────────────────────────────────────────────────

impl CatalogueStore for SqliteStore {
  type Error = Error;

  // ── Strain registry ───────────────────────────────────────────────────────

  async fn resolve_or_create(&self, name: &str) -> Result<Strain> {
    let name = name.to_owned();
    self
      .write(move |tx, now| registry::resolve_or_create(tx, &name, now))
      .await
  }

  async fn rename_or_merge(
    &self,
    strain_id: StrainId,
    new_name: &str,
  ) -> Result<RenameOutcome> {
    let new_name = new_name.to_owned();
    self
      .write(move |tx, _| registry::rename_or_merge(tx, strain_id, &new_name))
      .await
  }

  async fn get_strain(&self, strain_id: StrainId) -> Result<Option<Strain>> {
    self
      .read(move |conn| registry::strain_by_id(conn, strain_id))
      .await
  }

  async fn find_strain(&self, name: &str) -> Result<Option<Strain>> {
    let name = name.to_owned();
    self.read(move |conn| registry::find(conn, &name)).await
  }

  async fn suggest_strains(&self, prefix: &str, limit: usize) -> Result<Vec<Strain>> {
    let prefix = prefix.to_owned();
    self
      .read(move |conn| registry::suggest(conn, &prefix, limit))
      .await
  }

  // ── Menu entries ──────────────────────────────────────────────────────────

  async fn upsert_entry(
    &self,
    shop: ShopId,
    strain_id: StrainId,
    draft: &EntryDraft,
  ) -> Result<MenuEntry> {
    let fields = draft.validate()?;
    self
      .write(move |tx, now| entries::upsert(tx, shop, strain_id, &fields, now))
      .await
  }

  async fn record_entry(
    &self,
    shop: ShopId,
    strain_name: &str,
    draft: &EntryDraft,
  ) -> Result<MenuEntry> {
    let fields = draft.validate()?;
    let strain_name = strain_name.to_owned();
    self
      .write(move |tx, now| {
        let strain = registry::resolve_or_create(tx, &strain_name, now)?;
        entries::upsert(tx, shop, strain.strain_id, &fields, now)
      })
      .await
  }

  async fn update_entry(
    &self,
    shop: ShopId,
    entry_id: EntryId,
    new_name: &str,
    draft: &EntryDraft,
  ) -> Result<EntryUpdate> {
    let fields = draft.validate()?;
    strainbook_core::normalize::normalize(new_name)?;
    let new_name = new_name.to_owned();
    self
      .write(move |tx, now| entries::update(tx, shop, entry_id, &new_name, &fields, now))
      .await
  }

  async fn get_entry(&self, shop: ShopId, entry_id: EntryId) -> Result<Option<MenuEntry>> {
    self
      .read(move |conn| entries::entry_by_id(conn, shop, entry_id))
      .await
  }

  async fn list_entries(&self, shop: ShopId) -> Result<Vec<MenuEntry>> {
    self.read(move |conn| entries::list_for_shop(conn, shop)).await
  }

  async fn delete_entry(&self, shop: ShopId, entry_id: EntryId) -> Result<DeleteSummary> {
    self
      .write(move |tx, _| entries::delete_one(tx, shop, entry_id))
      .await
  }

  async fn delete_entries(
    &self,
    shop: ShopId,
    entry_ids: Vec<EntryId>,
  ) -> Result<DeleteSummary> {
    self
      .write(move |tx, _| entries::delete_many(tx, shop, entry_ids))
      .await
  }

  async fn keep_only_entries(
    &self,
    shop: ShopId,
    entry_ids: Vec<EntryId>,
  ) -> Result<DeleteSummary> {
    self
      .write(move |tx, _| entries::keep_only(tx, shop, entry_ids))
      .await
  }

  async fn clear_entries(&self, shop: ShopId) -> Result<DeleteSummary> {
    self.write(move |tx, _| entries::clear(tx, shop)).await
  }

  async fn load_entries_from_active_offerings(
    &self,
    shop: ShopId,
    replace: bool,
  ) -> Result<usize> {
    self
      .write(move |tx, now| entries::load_from_active_offerings(tx, shop, replace, now))
      .await
  }

  // ── Offerings ─────────────────────────────────────────────────────────────

  async fn sync_offering_from_entry(
    &self,
    shop: ShopId,
    entry_id: EntryId,
  ) -> Result<Offering> {
    self
      .write(move |tx, now| {
        let entry = entries::entry_by_id(tx, shop, entry_id)?
          .ok_or(strainbook_core::Error::EntryNotFound { shop, entry: entry_id })?;
        catalogue::sync_from_menu(tx, shop, entry.strain_id, &entry.fields, now)
      })
      .await
  }

  async fn safety_check(&self, shop: ShopId) -> Result<SafetyCheck> {
    self.read(move |conn| catalogue::safety_check(conn, shop)).await
  }

  async fn reconcile(
    &self,
    shop: ShopId,
    overrides: ReconcileOverride,
  ) -> Result<ReconcileReport> {
    self
      .write(move |tx, now| catalogue::reconcile(tx, shop, overrides, now))
      .await
  }

  async fn set_offering_status(
    &self,
    shop: ShopId,
    strain_id: StrainId,
    status: ManualStatus,
    lock: bool,
  ) -> Result<Offering> {
    self
      .write(move |tx, now| catalogue::set_status(tx, shop, strain_id, status, lock, now))
      .await
  }

  async fn get_offering(
    &self,
    shop: ShopId,
    strain_id: StrainId,
  ) -> Result<Option<Offering>> {
    self
      .read(move |conn| catalogue::offering_by_shop_strain(conn, shop, strain_id))
      .await
  }

  async fn list_offerings(&self, shop: ShopId) -> Result<Vec<Offering>> {
    self.read(move |conn| catalogue::list_for_shop(conn, shop)).await
  }

  async fn find_active_offerings(&self, query: &str, limit: usize) -> Result<Vec<Offering>> {
    let query = query.to_owned();
    self
      .read(move |conn| catalogue::find_active(conn, &query, limit))
      .await
  }
}
