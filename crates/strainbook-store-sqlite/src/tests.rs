//! Integration tests for `SqliteStore` against an in-memory database.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Duration, TimeZone, Utc};
use strainbook_core::{
  ShopId,
  clock::FixedClock,
  entry::{EntryDraft, EntryId, EntryUpdate},
  offering::{MANUAL_REASON, MISSING_FROM_MENU, ManualStatus, OfferingStatus},
  price::{Category, Currency},
  reconcile::{ReconcileOverride, SafetyStop},
  store::CatalogueStore,
  strain::{RenameOutcome, StrainId},
};

use crate::SqliteStore;

const SHOP: ShopId = ShopId(1);
const OTHER_SHOP: ShopId = ShopId(2);

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap() }

async fn store() -> (SqliteStore, Arc<FixedClock>) {
  let clock = Arc::new(FixedClock::new(t0()));
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
    .with_clock(clock.clone());
  (store, clock)
}

fn draft(amount: &str) -> EntryDraft { EntryDraft::new("hybrid", "€", amount) }

// ─── Strain registry ─────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_or_create_reuses_matching_key() {
  let (s, _) = store().await;

  let first = s.resolve_or_create("Kosher OG").await.unwrap();
  let again = s.resolve_or_create("  kosher   og ").await.unwrap();

  assert_eq!(first.strain_id, again.strain_id);
  assert_eq!(again.matching_key, "kosher og");
  // The latest input wins for display.
  assert_eq!(again.display_name, "kosher og");

  let other = s.resolve_or_create("ak47").await.unwrap();
  assert_ne!(other.strain_id, first.strain_id);
  assert_eq!(other.display_name, "AK47");
}

#[tokio::test]
async fn resolve_or_create_rejects_blank() {
  let (s, _) = store().await;
  let err = s.resolve_or_create("   ").await.unwrap_err();
  assert!(err.is_validation());
  assert!(s.suggest_strains("", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn rename_in_place_keeps_id() {
  let (s, _) = store().await;
  let strain = s.resolve_or_create("Amnezia Haze").await.unwrap();

  let outcome = s.rename_or_merge(strain.strain_id, "Amnesia Haze").await.unwrap();
  assert_eq!(outcome, RenameOutcome::Renamed { strain_id: strain.strain_id });

  let renamed = s.get_strain(strain.strain_id).await.unwrap().unwrap();
  assert_eq!(renamed.matching_key, "amnesia haze");
  assert_eq!(renamed.display_name, "Amnesia Haze");
  assert_eq!(renamed.created_at, strain.created_at);
  assert!(s.find_strain("amnezia haze").await.unwrap().is_none());
}

#[tokio::test]
async fn rename_to_same_name_is_a_noop() {
  let (s, _) = store().await;
  let strain = s.resolve_or_create("Lemon Haze").await.unwrap();

  let outcome = s.rename_or_merge(strain.strain_id, " Lemon   Haze ").await.unwrap();
  assert_eq!(outcome, RenameOutcome::Unchanged { strain_id: strain.strain_id });
}

#[tokio::test]
async fn rename_can_fix_casing_only() {
  let (s, _) = store().await;
  let strain = s.resolve_or_create("lemon haze").await.unwrap();

  let outcome = s.rename_or_merge(strain.strain_id, "Lemon Haze").await.unwrap();
  assert_eq!(outcome, RenameOutcome::Renamed { strain_id: strain.strain_id });
  let fixed = s.get_strain(strain.strain_id).await.unwrap().unwrap();
  assert_eq!(fixed.display_name, "Lemon Haze");
  assert_eq!(fixed.matching_key, "lemon haze");
}

#[tokio::test]
async fn rename_unknown_strain_is_not_found() {
  let (s, _) = store().await;
  let err = s.rename_or_merge(StrainId(42), "Anything").await.unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn rename_to_blank_is_rejected_without_change() {
  let (s, _) = store().await;
  let strain = s.resolve_or_create("Lemon Haze").await.unwrap();
  let err = s.rename_or_merge(strain.strain_id, " ").await.unwrap_err();
  assert!(err.is_validation());
  assert_eq!(s.get_strain(strain.strain_id).await.unwrap().unwrap(), strain);
}

#[tokio::test]
async fn merge_repoints_references_and_deletes_source() {
  let (s, _) = store().await;

  let typo = s.record_entry(SHOP, "Tropicana Chery", &draft("10")).await.unwrap();
  s.record_entry(OTHER_SHOP, "Tropicana Chery", &draft("11")).await.unwrap();
  let good = s
    .record_entry(OTHER_SHOP, "tropicana cherry", &draft("12"))
    .await
    .unwrap();
  let a = typo.strain_id;
  let b = good.strain_id;
  assert_ne!(a, b);

  let outcome = s.rename_or_merge(a, "Tropicana Cherry").await.unwrap();
  assert_eq!(outcome.strain_id(), b);
  assert_eq!(
    outcome,
    RenameOutcome::Merged {
      from:                a,
      into:                b,
      entries_repointed:   1,
      entries_dropped:     1,
      offerings_repointed: 1,
      offerings_dropped:   1,
    }
  );

  assert!(s.get_strain(a).await.unwrap().is_none());
  let survivor = s.get_strain(b).await.unwrap().unwrap();
  assert_eq!(survivor.display_name, "Tropicana Cherry");

  // Shop 1's entry was repointed.
  let shop1 = s.list_entries(SHOP).await.unwrap();
  assert_eq!(shop1.len(), 1);
  assert_eq!(shop1[0].entry_id, typo.entry_id);
  assert_eq!(shop1[0].strain_id, b);
  assert_eq!(shop1[0].strain_name, "Tropicana Cherry");

  // Shop 2 already listed the target; its own row won.
  let shop2 = s.list_entries(OTHER_SHOP).await.unwrap();
  assert_eq!(shop2.len(), 1);
  assert_eq!(shop2[0].entry_id, good.entry_id);
  assert_eq!(shop2[0].fields.price.amount.cents(), 1200);

  let offerings2 = s.list_offerings(OTHER_SHOP).await.unwrap();
  assert_eq!(offerings2.len(), 1);
  assert_eq!(offerings2[0].strain_id, b);
  assert_eq!(offerings2[0].fields.price.amount.cents(), 1200);
  assert_eq!(s.list_offerings(SHOP).await.unwrap()[0].strain_id, b);
}

#[tokio::test]
async fn matching_keys_stay_unique() {
  let (s, _) = store().await;
  let a = s.resolve_or_create("Blue Dream").await.unwrap();
  let b = s.resolve_or_create("Blu Dream").await.unwrap();
  let c = s.resolve_or_create("g13").await.unwrap();
  s.resolve_or_create("G 13").await.unwrap();

  s.rename_or_merge(b.strain_id, "blue dream").await.unwrap();
  s.rename_or_merge(c.strain_id, "Blue Dreams").await.unwrap();
  s.rename_or_merge(a.strain_id, "G 13").await.unwrap();
  s.resolve_or_create("BLUE DREAM").await.unwrap();

  let all = s.suggest_strains("", 100).await.unwrap();
  let keys: HashSet<_> = all.iter().map(|st| st.matching_key.clone()).collect();
  assert_eq!(keys.len(), all.len());
}

#[tokio::test]
async fn find_and_suggest_strains() {
  let (s, _) = store().await;
  s.resolve_or_create("Amnesia").await.unwrap();
  s.resolve_or_create("Amnesia Haze").await.unwrap();
  s.resolve_or_create("Ammo_Kush").await.unwrap();
  s.resolve_or_create("Ammo Kush").await.unwrap();
  s.resolve_or_create("Bubba Kush").await.unwrap();

  let found = s.find_strain("AMNESIA").await.unwrap().unwrap();
  assert_eq!(found.display_name, "Amnesia");
  assert!(s.find_strain("Amnesia Kush").await.unwrap().is_none());

  let names: Vec<_> = s
    .suggest_strains("amn", 10)
    .await
    .unwrap()
    .into_iter()
    .map(|st| st.display_name)
    .collect();
  assert_eq!(names, vec!["Amnesia", "Amnesia Haze"]);

  // `_` is literal, not a wildcard.
  let names: Vec<_> = s
    .suggest_strains("Ammo_", 10)
    .await
    .unwrap()
    .into_iter()
    .map(|st| st.display_name)
    .collect();
  assert_eq!(names, vec!["Ammo_Kush"]);

  // Blank prefix: newest first.
  let newest = s.suggest_strains("", 2).await.unwrap();
  assert_eq!(newest[0].display_name, "Bubba Kush");
  assert_eq!(newest.len(), 2);
}

// ─── Menu entries ────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_keeps_one_row_per_shop_and_strain() {
  let (s, _) = store().await;
  let strain = s.resolve_or_create("Gorilla Glue").await.unwrap();

  let first = s
    .upsert_entry(SHOP, strain.strain_id, &draft("10"))
    .await
    .unwrap();
  let second = s
    .upsert_entry(
      SHOP,
      strain.strain_id,
      &EntryDraft::new("indica", "£", "12,5").with_overlay(true).with_note("new"),
    )
    .await
    .unwrap();

  assert_eq!(first.entry_id, second.entry_id);
  let entries = s.list_entries(SHOP).await.unwrap();
  assert_eq!(entries.len(), 1);
  let e = &entries[0];
  assert_eq!(e.fields.category, Category::Indica);
  assert_eq!(e.fields.price.currency, Currency::Pound);
  assert_eq!(e.fields.price.amount.cents(), 1250);
  assert!(e.fields.overlay);
  assert_eq!(e.fields.note, "new");

  // The offering follows the entry.
  let offering = s.get_offering(SHOP, strain.strain_id).await.unwrap().unwrap();
  assert_eq!(offering.fields, e.fields);
  assert_eq!(offering.status, OfferingStatus::Active);
}

#[tokio::test]
async fn upsert_validation_leaves_state_untouched() {
  let (s, _) = store().await;
  let strain = s.resolve_or_create("Gorilla Glue").await.unwrap();
  s.upsert_entry(SHOP, strain.strain_id, &draft("10")).await.unwrap();

  for bad in [
    EntryDraft::new("edible", "€", "10"),
    EntryDraft::new("hybrid", "USD", "10"),
    EntryDraft::new("hybrid", "€", "abc"),
    EntryDraft::new("hybrid", "€", "-3"),
  ] {
    let err = s.upsert_entry(SHOP, strain.strain_id, &bad).await.unwrap_err();
    assert!(err.is_validation(), "{err}");
  }

  let entries = s.list_entries(SHOP).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].fields.price.amount.cents(), 1000);
}

#[tokio::test]
async fn upsert_unknown_strain_is_not_found() {
  let (s, _) = store().await;
  let err = s.upsert_entry(SHOP, StrainId(9), &draft("10")).await.unwrap_err();
  assert!(err.is_not_found());
  assert!(s.list_offerings(SHOP).await.unwrap().is_empty());
}

#[tokio::test]
async fn record_entry_with_blank_name_creates_nothing() {
  let (s, _) = store().await;
  let err = s.record_entry(SHOP, "  ", &draft("10")).await.unwrap_err();
  assert!(err.is_validation());
  assert!(s.list_entries(SHOP).await.unwrap().is_empty());
  assert!(s.suggest_strains("", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn editing_a_typo_into_an_existing_entry_removes_the_duplicate() {
  let (s, _) = store().await;
  let amnesia = s.record_entry(SHOP, "Amnesia", &draft("10")).await.unwrap();
  let amnesya = s.record_entry(SHOP, "Amnesya", &draft("11")).await.unwrap();

  let update = s
    .update_entry(SHOP, amnesya.entry_id, "Amnesia", &draft("11"))
    .await
    .unwrap();

  match update {
    EntryUpdate::DuplicateRemoved { removed, kept, rename } => {
      assert_eq!(removed, amnesya.entry_id);
      assert_eq!(kept, Some(amnesia.entry_id));
      assert_eq!(rename.strain_id(), amnesia.strain_id);
    }
    other => panic!("expected duplicate removal, got {other:?}"),
  }

  let entries = s.list_entries(SHOP).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].entry_id, amnesia.entry_id);
  assert_eq!(entries[0].strain_name, "Amnesia");
  assert!(s.get_strain(amnesya.strain_id).await.unwrap().is_none());

  let offerings = s.list_offerings(SHOP).await.unwrap();
  assert_eq!(offerings.len(), 1);
  assert_eq!(offerings[0].strain_id, amnesia.strain_id);
}

#[tokio::test]
async fn editing_a_name_renames_the_existing_strain() {
  let (s, clock) = store().await;
  let entry = s.record_entry(SHOP, "Purple Haz", &draft("10")).await.unwrap();
  clock.advance(Duration::minutes(5));

  let update = s
    .update_entry(SHOP, entry.entry_id, "Purple Haze", &draft("9,5"))
    .await
    .unwrap();

  let EntryUpdate::Updated { entry: updated, rename } = update else {
    panic!("expected in-place update");
  };
  assert_eq!(rename, RenameOutcome::Renamed { strain_id: entry.strain_id });
  assert_eq!(updated.entry_id, entry.entry_id);
  assert_eq!(updated.strain_id, entry.strain_id);
  assert_eq!(updated.strain_name, "Purple Haze");
  assert_eq!(updated.fields.price.amount.cents(), 950);
  assert_eq!(updated.recorded_at, t0() + Duration::minutes(5));

  // No second strain was created.
  assert_eq!(s.suggest_strains("", 10).await.unwrap().len(), 1);

  let offering = s.get_offering(SHOP, entry.strain_id).await.unwrap().unwrap();
  assert_eq!(offering.fields.price.amount.cents(), 950);
  assert_eq!(offering.last_seen, t0() + Duration::minutes(5));
}

#[tokio::test]
async fn editing_into_a_strain_another_shop_uses_repoints_the_entry() {
  let (s, _) = store().await;
  let other = s.record_entry(OTHER_SHOP, "Super Silver Haze", &draft("10")).await.unwrap();
  let typo = s.record_entry(SHOP, "Super Silver Hase", &draft("12")).await.unwrap();

  let update = s
    .update_entry(SHOP, typo.entry_id, "Super Silver Haze", &draft("12"))
    .await
    .unwrap();
  let EntryUpdate::Updated { entry, rename } = update else {
    panic!("expected in-place update");
  };
  assert!(rename.is_merge());
  assert_eq!(entry.entry_id, typo.entry_id);
  assert_eq!(entry.strain_id, other.strain_id);
  assert_eq!(s.list_offerings(SHOP).await.unwrap()[0].strain_id, other.strain_id);
}

#[tokio::test]
async fn editing_an_entry_of_another_shop_is_not_found() {
  let (s, _) = store().await;
  let entry = s.record_entry(SHOP, "Amnesia", &draft("10")).await.unwrap();

  let err = s
    .update_entry(OTHER_SHOP, entry.entry_id, "Amnesia Haze", &draft("10"))
    .await
    .unwrap_err();
  assert!(err.is_not_found());
  assert_eq!(
    s.get_strain(entry.strain_id).await.unwrap().unwrap().display_name,
    "Amnesia"
  );
}

#[tokio::test]
async fn editing_with_invalid_fields_does_not_rename() {
  let (s, _) = store().await;
  let entry = s.record_entry(SHOP, "Amnesia", &draft("10")).await.unwrap();

  let err = s
    .update_entry(SHOP, entry.entry_id, "Amnesia Haze", &draft("abc"))
    .await
    .unwrap_err();
  assert!(err.is_validation());
  assert_eq!(
    s.get_strain(entry.strain_id).await.unwrap().unwrap().display_name,
    "Amnesia"
  );
}

#[tokio::test]
async fn delete_operations_report_counts() {
  let (s, _) = store().await;
  let mut ids = Vec::new();
  for name in ["A1", "B2", "C3", "D4", "E5"] {
    ids.push(s.record_entry(SHOP, name, &draft("10")).await.unwrap().entry_id);
  }
  let foreign = s.record_entry(OTHER_SHOP, "A1", &draft("10")).await.unwrap();

  let one = s.delete_entry(SHOP, ids[0]).await.unwrap();
  assert_eq!((one.before, one.after, one.removed), (5, 4, 1));

  let err = s.delete_entry(SHOP, ids[0]).await.unwrap_err();
  assert!(err.is_not_found());
  let err = s.delete_entry(SHOP, foreign.entry_id).await.unwrap_err();
  assert!(err.is_not_found());

  let many = s
    .delete_entries(SHOP, vec![ids[1], ids[1], EntryId(-4), foreign.entry_id])
    .await
    .unwrap();
  assert_eq!((many.before, many.after, many.removed), (4, 3, 1));

  let kept = s.keep_only_entries(SHOP, vec![ids[4]]).await.unwrap();
  assert_eq!((kept.before, kept.after, kept.removed), (3, 1, 2));
  assert_eq!(s.list_entries(SHOP).await.unwrap()[0].entry_id, ids[4]);

  let cleared = s.clear_entries(SHOP).await.unwrap();
  assert_eq!((cleared.before, cleared.after, cleared.removed), (1, 0, 1));

  // Other shops and the offering catalogue are untouched.
  assert_eq!(s.list_entries(OTHER_SHOP).await.unwrap().len(), 1);
  assert_eq!(s.list_offerings(SHOP).await.unwrap().len(), 5);
}

#[tokio::test]
async fn keep_only_with_no_ids_clears_the_shop() {
  let (s, _) = store().await;
  s.record_entry(SHOP, "A1", &draft("10")).await.unwrap();
  s.record_entry(SHOP, "B2", &draft("10")).await.unwrap();

  let summary = s.keep_only_entries(SHOP, Vec::new()).await.unwrap();
  assert_eq!((summary.before, summary.after, summary.removed), (2, 0, 2));

  let empty = s.keep_only_entries(SHOP, Vec::new()).await.unwrap();
  assert_eq!((empty.before, empty.after, empty.removed), (0, 0, 0));
}

#[tokio::test]
async fn load_entries_from_active_offerings() {
  let (s, _) = store().await;
  for name in ["Amnesia", "Bubba Kush", "Critical"] {
    s.record_entry(SHOP, name, &draft("10")).await.unwrap();
  }
  let bubba = s.find_strain("bubba kush").await.unwrap().unwrap();
  s.set_offering_status(
    SHOP,
    bubba.strain_id,
    ManualStatus::Discontinued { reason: None, until_hint: None },
    true,
  )
  .await
  .unwrap();
  s.clear_entries(SHOP).await.unwrap();

  let loaded = s.load_entries_from_active_offerings(SHOP, true).await.unwrap();
  assert_eq!(loaded, 2);
  let names: Vec<_> = s
    .list_entries(SHOP)
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.strain_name)
    .collect();
  assert_eq!(names, vec!["Amnesia", "Critical"]);
}

// ─── Offerings and reconciliation ────────────────────────────────────────────

#[tokio::test]
async fn reconcile_discontinues_offerings_missing_from_menu() {
  let (s, clock) = store().await;
  for name in ["Strain A", "Strain B", "Strain C"] {
    s.record_entry(SHOP, name, &draft("10")).await.unwrap();
  }
  s.clear_entries(SHOP).await.unwrap();
  s.record_entry(SHOP, "Strain A", &draft("11")).await.unwrap();

  let later = t0() + Duration::days(7);
  clock.set(later);
  let report = s.reconcile(SHOP, ReconcileOverride::default()).await.unwrap();
  assert_eq!(report.synced, 1);
  assert_eq!(report.discontinued, 2);

  let offerings = s.list_offerings(SHOP).await.unwrap();
  assert_eq!(offerings.len(), 3);

  let a = &offerings[0];
  assert_eq!(a.strain_name, "Strain A");
  assert_eq!(a.status, OfferingStatus::Active);
  assert_eq!(a.last_seen, later);
  assert_eq!(a.fields.price.amount.cents(), 1100);

  for gone in &offerings[1..] {
    assert_eq!(gone.status, OfferingStatus::Discontinued);
    let d = gone.discontinued.as_ref().unwrap();
    assert_eq!(d.reason, MISSING_FROM_MENU);
    assert_eq!(d.since, later);
    assert_eq!(d.until_hint, None);
    assert_eq!(gone.last_seen, t0());
  }
}

#[tokio::test]
async fn reappearing_offering_is_reactivated() {
  let (s, clock) = store().await;
  s.record_entry(SHOP, "Strain A", &draft("10")).await.unwrap();
  let b = s.record_entry(SHOP, "Strain B", &draft("10")).await.unwrap();
  s.delete_entry(SHOP, b.entry_id).await.unwrap();
  s.reconcile(SHOP, ReconcileOverride::default()).await.unwrap();
  assert_eq!(
    s.get_offering(SHOP, b.strain_id).await.unwrap().unwrap().status,
    OfferingStatus::Discontinued
  );

  clock.advance(Duration::days(1));
  s.record_entry(SHOP, "Strain B", &draft("10")).await.unwrap();
  let back = s.get_offering(SHOP, b.strain_id).await.unwrap().unwrap();
  assert_eq!(back.status, OfferingStatus::Active);
  assert!(back.discontinued.is_none());
}

#[tokio::test]
async fn empty_menu_guard_requires_override() {
  let (s, _) = store().await;
  for i in 0..6 {
    s.record_entry(SHOP, &format!("Strain {i}"), &draft("10")).await.unwrap();
  }
  s.clear_entries(SHOP).await.unwrap();

  let check = s.safety_check(SHOP).await.unwrap();
  assert_eq!(check.menu_entry_count, 0);
  assert_eq!(check.active_unlocked_count, 6);
  assert!(check.requires_empty_confirm());

  let err = s.reconcile(SHOP, ReconcileOverride::default()).await.unwrap_err();
  assert!(err.is_refused());
  assert!(matches!(
    err,
    crate::Error::Core(strainbook_core::Error::ReconcileRefused(
      SafetyStop::EmptyMenu { active: 6 }
    ))
  ));
  assert!(
    s.list_offerings(SHOP)
      .await
      .unwrap()
      .iter()
      .all(|o| o.status == OfferingStatus::Active)
  );

  let report = s
    .reconcile(SHOP, ReconcileOverride { allow_empty: true, allow_mass: false })
    .await
    .unwrap();
  assert_eq!(report.discontinued, 6);
  assert!(
    s.list_offerings(SHOP)
      .await
      .unwrap()
      .iter()
      .all(|o| o.status == OfferingStatus::Discontinued)
  );
}

#[tokio::test]
async fn mass_discontinue_guard_requires_override() {
  let (s, _) = store().await;
  for name in ["Old One", "Old Two", "Old Three", "Old Four", "Old Five", "Old Six"] {
    s.record_entry(SHOP, name, &draft("10")).await.unwrap();
  }
  s.clear_entries(SHOP).await.unwrap();
  // The only current entry belongs to a locked offering.
  let fresh = s.record_entry(SHOP, "Fresh", &draft("10")).await.unwrap();
  s.set_offering_status(SHOP, fresh.strain_id, ManualStatus::Active, true)
    .await
    .unwrap();

  // Six unlocked actives, none on the menu; the locked one does not count.
  let check = s.safety_check(SHOP).await.unwrap();
  assert_eq!(check.active_count, 7);
  assert_eq!(check.active_unlocked_count, 6);
  assert_eq!(check.would_auto_discontinue, 6);

  let err = s.reconcile(SHOP, ReconcileOverride::default()).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(strainbook_core::Error::ReconcileRefused(
      SafetyStop::MassDiscontinue { would_discontinue: 6 }
    ))
  ));

  let report = s
    .reconcile(SHOP, ReconcileOverride { allow_empty: false, allow_mass: true })
    .await
    .unwrap();
  assert_eq!(report.discontinued, 6);
  let locked = s.get_offering(SHOP, fresh.strain_id).await.unwrap().unwrap();
  assert_eq!(locked.status, OfferingStatus::Active);
}

#[tokio::test]
async fn lock_protects_status_from_sync_and_reconcile() {
  let (s, clock) = store().await;
  let entry = s.record_entry(SHOP, "Seasonal Kush", &draft("10")).await.unwrap();
  s.record_entry(SHOP, "Everyday", &draft("10")).await.unwrap();

  clock.advance(Duration::hours(1));
  let locked = s
    .set_offering_status(
      SHOP,
      entry.strain_id,
      ManualStatus::Discontinued {
        reason:     Some("out of season".into()),
        until_hint: Some("back in spring".into()),
      },
      true,
    )
    .await
    .unwrap();
  let pinned = locked.discontinued.clone().unwrap();
  assert_eq!(pinned.reason, "out of season");
  assert_eq!(pinned.until_hint.as_deref(), Some("back in spring"));

  // Still on the menu: a fresh write and a reconcile refresh fields only.
  clock.advance(Duration::hours(1));
  s.record_entry(SHOP, "Seasonal Kush", &draft("14")).await.unwrap();
  s.sync_offering_from_entry(SHOP, entry.entry_id).await.unwrap();
  s.reconcile(SHOP, ReconcileOverride::default()).await.unwrap();

  let after = s.get_offering(SHOP, entry.strain_id).await.unwrap().unwrap();
  assert_eq!(after.status, OfferingStatus::Discontinued);
  assert_eq!(after.discontinued, Some(pinned.clone()));
  assert!(after.manual_lock);
  assert_eq!(after.fields.price.amount.cents(), 1400);
  assert_eq!(after.last_seen, t0() + Duration::hours(2));

  // Off the menu: the sweep leaves it alone too.
  s.delete_entry(SHOP, entry.entry_id).await.unwrap();
  s.reconcile(SHOP, ReconcileOverride::default()).await.unwrap();
  let after = s.get_offering(SHOP, entry.strain_id).await.unwrap().unwrap();
  assert_eq!(after.discontinued, Some(pinned));
}

#[tokio::test]
async fn manual_status_can_unlock() {
  let (s, _) = store().await;
  let entry = s.record_entry(SHOP, "Critical", &draft("10")).await.unwrap();
  s.record_entry(SHOP, "Everyday", &draft("10")).await.unwrap();

  let off = s
    .set_offering_status(
      SHOP,
      entry.strain_id,
      ManualStatus::Discontinued { reason: None, until_hint: Some(" ".into()) },
      true,
    )
    .await
    .unwrap();
  let d = off.discontinued.unwrap();
  assert_eq!(d.reason, MANUAL_REASON);
  assert_eq!(d.until_hint, None);

  let resumed = s
    .set_offering_status(SHOP, entry.strain_id, ManualStatus::Active, false)
    .await
    .unwrap();
  assert_eq!(resumed.status, OfferingStatus::Active);
  assert!(!resumed.manual_lock);
  assert!(resumed.discontinued.is_none());

  // Unlocked again, so the sweep applies.
  s.delete_entry(SHOP, entry.entry_id).await.unwrap();
  s.reconcile(SHOP, ReconcileOverride::default()).await.unwrap();
  let swept = s.get_offering(SHOP, entry.strain_id).await.unwrap().unwrap();
  assert_eq!(swept.status, OfferingStatus::Discontinued);
  assert!(!swept.manual_lock);
}

#[tokio::test]
async fn manual_status_on_unknown_offering_is_not_found() {
  let (s, _) = store().await;
  let strain = s.resolve_or_create("Nowhere").await.unwrap();
  let err = s
    .set_offering_status(SHOP, strain.strain_id, ManualStatus::Active, true)
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn sync_unknown_entry_is_not_found() {
  let (s, _) = store().await;
  let err = s.sync_offering_from_entry(SHOP, EntryId(77)).await.unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn offerings_list_active_first() {
  let (s, _) = store().await;
  for name in ["Zkittlez", "Amnesia", "Mango"] {
    s.record_entry(SHOP, name, &draft("10")).await.unwrap();
  }
  let amnesia = s.find_strain("amnesia").await.unwrap().unwrap();
  s.set_offering_status(
    SHOP,
    amnesia.strain_id,
    ManualStatus::Discontinued { reason: None, until_hint: None },
    false,
  )
  .await
  .unwrap();

  let names: Vec<_> = s
    .list_offerings(SHOP)
    .await
    .unwrap()
    .into_iter()
    .map(|o| o.strain_name)
    .collect();
  assert_eq!(names, vec!["Mango", "Zkittlez", "Amnesia"]);
}

#[tokio::test]
async fn find_active_offerings_across_shops() {
  let (s, _) = store().await;
  s.record_entry(SHOP, "Amnesia Haze", &draft("10")).await.unwrap();
  s.record_entry(OTHER_SHOP, "Amnesia Haze", &draft("12")).await.unwrap();
  s.record_entry(OTHER_SHOP, "Lemon Haze", &draft("9")).await.unwrap();
  let lemon = s.find_strain("lemon haze").await.unwrap().unwrap();
  s.set_offering_status(
    OTHER_SHOP,
    lemon.strain_id,
    ManualStatus::Discontinued { reason: None, until_hint: None },
    true,
  )
  .await
  .unwrap();

  let hits = s.find_active_offerings("HAZE", 50).await.unwrap();
  assert_eq!(hits.len(), 2);
  assert!(hits.iter().all(|o| o.strain_name == "Amnesia Haze"));
  assert_eq!(hits[0].shop_id, SHOP);
  assert_eq!(hits[1].shop_id, OTHER_SHOP);

  assert!(s.find_active_offerings("  ", 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn long_decimal_prices_round_to_hundredths() {
  let (s, _) = store().await;
  let entry = s.record_entry(SHOP, "Critical", &draft("12,345")).await.unwrap();
  assert_eq!(entry.fields.price.amount.cents(), 1235);
  let offering = s.get_offering(SHOP, entry.strain_id).await.unwrap().unwrap();
  assert_eq!(offering.fields.price.amount.cents(), 1235);
}

// ─── Atomicity ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_merge_leaves_everything_in_place() {
  let (s, _) = store().await;
  let typo = s.record_entry(SHOP, "Tropicana Chery", &draft("10")).await.unwrap();
  let good = s
    .record_entry(OTHER_SHOP, "tropicana cherry", &draft("12"))
    .await
    .unwrap();

  // References are folded before the source strain is deleted, so this
  // fails the merge half way through.
  s.execute_batch(
    "CREATE TRIGGER block_strain_delete BEFORE DELETE ON strains
     BEGIN SELECT RAISE(ABORT, 'strain delete blocked'); END;",
  )
  .await
  .unwrap();

  let err = s
    .rename_or_merge(typo.strain_id, "Tropicana Cherry")
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Sqlite(_)), "{err}");

  let source = s.get_strain(typo.strain_id).await.unwrap().unwrap();
  assert_eq!(source.display_name, "Tropicana Chery");
  let target = s.get_strain(good.strain_id).await.unwrap().unwrap();
  assert_eq!(target.display_name, "tropicana cherry");

  let entries = s.list_entries(SHOP).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].strain_id, typo.strain_id);
  let offerings = s.list_offerings(SHOP).await.unwrap();
  assert_eq!(offerings.len(), 1);
  assert_eq!(offerings[0].strain_id, typo.strain_id);
}

#[tokio::test]
async fn failed_reconcile_leaves_offerings_untouched() {
  let (s, clock) = store().await;
  for name in ["Strain A", "Strain B", "Strain C"] {
    s.record_entry(SHOP, name, &draft("10")).await.unwrap();
  }
  s.clear_entries(SHOP).await.unwrap();
  s.record_entry(SHOP, "Strain A", &draft("10")).await.unwrap();
  let before = s.list_offerings(SHOP).await.unwrap();

  // Syncing the menu succeeds; the sweep that follows does not.
  s.execute_batch(
    "CREATE TRIGGER block_discontinue BEFORE UPDATE ON offerings
     WHEN NEW.status = 'discontinued'
     BEGIN SELECT RAISE(ABORT, 'discontinue blocked'); END;",
  )
  .await
  .unwrap();

  clock.advance(Duration::days(1));
  let err = s.reconcile(SHOP, ReconcileOverride::default()).await.unwrap_err();
  assert!(matches!(err, crate::Error::Sqlite(_)), "{err}");

  let after = s.list_offerings(SHOP).await.unwrap();
  assert_eq!(after, before);
  assert!(after.iter().all(|o| o.status == OfferingStatus::Active));
  assert_eq!(after[0].last_seen, t0());
}
