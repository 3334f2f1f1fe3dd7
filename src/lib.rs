//! National mirror of the ICAO Public Key Directory: LDIF/Master List
//! ingestion, a dual-tier trust-material store, and a Passive Authentication
//! engine for ePassports.
//!
//! The module tree mirrors the component design: `crypto`/`asn1` are the
//! pure, I/O-free primitives; `model` is the canonical in-memory data the
//! rest of the crate reads and writes; `parsers` turns raw bytes into model
//! values; `store` persists them; `trust` validates a certificate's chain of
//! custody; `pa` runs Passive Authentication against a SOD and Data Groups;
//! `ingest` and `reconcile` are the two stateful coordinators that sit above
//! everything else.

pub mod asn1;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod ingest;
pub mod model;
pub mod pa;
pub mod parsers;
pub mod reconcile;
pub mod store;
pub mod trust;

pub use error::Error;

/// Crate-wide result alias for public entry points.
pub type Result<T> = std::result::Result<T, Error>;
