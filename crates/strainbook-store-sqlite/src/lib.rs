//! SQLite backend for the strainbook catalogue.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each state-changing operation is a
//! single SQLite transaction; the per-module functions take that transaction
//! as a parameter so operations compose without ambient connection state.

mod catalogue;
mod encode;
mod entries;
mod registry;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
