//! Core types and trait definitions for the strainbook catalogue.
//!
//! Two subsystems live behind the [`store::CatalogueStore`] trait: the strain
//! identity model (normalisation, rename and merge) and the offering
//! reconciliation state machine. This crate is free of database dependencies;
//! storage backends implement the trait.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod entry;
pub mod error;
pub mod normalize;
pub mod offering;
pub mod price;
pub mod reconcile;
pub mod store;
pub mod strain;

pub use error::{Error, Result, ValidationError};

/// Opaque shop identifier supplied by callers. Shops themselves are not
/// modelled by this crate.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  serde::Serialize,
  serde::Deserialize,
)]
#[serde(transparent)]
pub struct ShopId(pub i64);

impl std::fmt::Display for ShopId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.0.fmt(f)
  }
}
