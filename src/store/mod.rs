//! Trust-material store (spec §4.4): a dual-tier persistence layer — a
//! relational catalog with rich metadata, and a hierarchical directory
//! keyed by canonical DNs. Both tiers are exposed as traits; this crate
//! ships one concrete adapter per tier, an in-memory store, matching the
//! ports/adapters split spec §1/§6 scopes the real catalog/directory to
//! ("external collaborators, spec'd only at their interface").

pub mod catalog;
pub mod directory;
pub mod error;

pub use catalog::{CatalogStore, InMemoryCatalog, UpsertOutcome};
pub use directory::{DirectoryLayout, DirectoryStore, InMemoryDirectory};
pub use error::StoreError;
