//! The `CatalogueStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `strainbook-store-sqlite`). Callers such as the CLI depend on this
//! abstraction, not on any concrete backend.
//!
//! Every state-changing method is one atomic unit of work: on error nothing
//! has been written.

use std::future::Future;

use crate::{
  ShopId,
  entry::{DeleteSummary, EntryDraft, EntryId, EntryUpdate, MenuEntry},
  offering::{ManualStatus, Offering},
  reconcile::{ReconcileOverride, ReconcileReport, SafetyCheck},
  strain::{RenameOutcome, Strain, StrainId},
};

/// Abstraction over a strainbook catalogue backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait CatalogueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Strain registry ───────────────────────────────────────────────────

  /// Return the strain whose matching key equals `name`'s, refreshing its
  /// display name to the normalised input, or create it.
  fn resolve_or_create<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Strain, Self::Error>> + Send + 'a;

  /// Rename `strain_id` in place, or merge it into the strain that already
  /// holds `new_name`'s matching key. On merge the existing strain survives
  /// and the source strain is deleted.
  fn rename_or_merge<'a>(
    &'a self,
    strain_id: StrainId,
    new_name: &'a str,
  ) -> impl Future<Output = Result<RenameOutcome, Self::Error>> + Send + 'a;

  fn get_strain(
    &self,
    strain_id: StrainId,
  ) -> impl Future<Output = Result<Option<Strain>, Self::Error>> + Send + '_;

  /// Look up a strain by the matching key `name` normalises to.
  fn find_strain<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Strain>, Self::Error>> + Send + 'a;

  /// Display-name prefix search for autocomplete. A blank prefix returns the
  /// most recently created strains.
  fn suggest_strains<'a>(
    &'a self,
    prefix: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Strain>, Self::Error>> + Send + 'a;

  // ── Menu entries ──────────────────────────────────────────────────────

  /// Insert or replace the single entry for (`shop`, `strain_id`) and sync
  /// its offering.
  fn upsert_entry<'a>(
    &'a self,
    shop: ShopId,
    strain_id: StrainId,
    draft: &'a EntryDraft,
  ) -> impl Future<Output = Result<MenuEntry, Self::Error>> + Send + 'a;

  /// The "add a line" flow: validate, resolve the strain by name, upsert.
  fn record_entry<'a>(
    &'a self,
    shop: ShopId,
    strain_name: &'a str,
    draft: &'a EntryDraft,
  ) -> impl Future<Output = Result<MenuEntry, Self::Error>> + Send + 'a;

  /// Edit an entry. A changed name renames or merges the entry's existing
  /// strain rather than creating a new one.
  fn update_entry<'a>(
    &'a self,
    shop: ShopId,
    entry_id: EntryId,
    new_name: &'a str,
    draft: &'a EntryDraft,
  ) -> impl Future<Output = Result<EntryUpdate, Self::Error>> + Send + 'a;

  fn get_entry(
    &self,
    shop: ShopId,
    entry_id: EntryId,
  ) -> impl Future<Output = Result<Option<MenuEntry>, Self::Error>> + Send + '_;

  /// Current entries for `shop`, ordered by strain display name.
  fn list_entries(
    &self,
    shop: ShopId,
  ) -> impl Future<Output = Result<Vec<MenuEntry>, Self::Error>> + Send + '_;

  fn delete_entry(
    &self,
    shop: ShopId,
    entry_id: EntryId,
  ) -> impl Future<Output = Result<DeleteSummary, Self::Error>> + Send + '_;

  fn delete_entries(
    &self,
    shop: ShopId,
    entry_ids: Vec<EntryId>,
  ) -> impl Future<Output = Result<DeleteSummary, Self::Error>> + Send + '_;

  /// Delete every entry of `shop` except `entry_ids`.
  fn keep_only_entries(
    &self,
    shop: ShopId,
    entry_ids: Vec<EntryId>,
  ) -> impl Future<Output = Result<DeleteSummary, Self::Error>> + Send + '_;

  /// Drop all current entries of `shop`; used when a new menu supersedes
  /// the old one.
  fn clear_entries(
    &self,
    shop: ShopId,
  ) -> impl Future<Output = Result<DeleteSummary, Self::Error>> + Send + '_;

  /// Copy every active offering of `shop` into its current entries,
  /// optionally clearing the existing entries first. Returns the number of
  /// offerings loaded.
  fn load_entries_from_active_offerings(
    &self,
    shop: ShopId,
    replace: bool,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Offerings ─────────────────────────────────────────────────────────

  /// Project one current entry into the offering catalogue.
  fn sync_offering_from_entry(
    &self,
    shop: ShopId,
    entry_id: EntryId,
  ) -> impl Future<Output = Result<Offering, Self::Error>> + Send + '_;

  /// The counts the reconciliation guard is evaluated on.
  fn safety_check(
    &self,
    shop: ShopId,
  ) -> impl Future<Output = Result<SafetyCheck, Self::Error>> + Send + '_;

  /// Sync every current entry into the catalogue, then discontinue active
  /// unlocked offerings that are missing from the menu. Refused without
  /// state change when the guard trips and `overrides` does not cover it.
  fn reconcile(
    &self,
    shop: ShopId,
    overrides: ReconcileOverride,
  ) -> impl Future<Output = Result<ReconcileReport, Self::Error>> + Send + '_;

  /// Force an offering's status and set its manual lock to `lock`.
  fn set_offering_status(
    &self,
    shop: ShopId,
    strain_id: StrainId,
    status: ManualStatus,
    lock: bool,
  ) -> impl Future<Output = Result<Offering, Self::Error>> + Send + '_;

  fn get_offering(
    &self,
    shop: ShopId,
    strain_id: StrainId,
  ) -> impl Future<Output = Result<Option<Offering>, Self::Error>> + Send + '_;

  /// All offerings of `shop`, active first, then by strain display name.
  fn list_offerings(
    &self,
    shop: ShopId,
  ) -> impl Future<Output = Result<Vec<Offering>, Self::Error>> + Send + '_;

  /// Active offerings across all shops whose strain display name contains
  /// `query`, case-insensitively.
  fn find_active_offerings<'a>(
    &'a self,
    query: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Offering>, Self::Error>> + Send + 'a;
}
