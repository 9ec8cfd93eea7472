//! Catalog implementations.
//!
//! The [`RepositoryCatalog`](crate::core::RepositoryCatalog) trait lives in
//! `core::traits`; this module holds concrete implementations. The
//! in-memory catalog backs the CLI (via a YAML inventory file) and the
//! test suite.

mod memory;

pub use memory::{Inventory, MemoryCatalog};
