//! Validation engine (C5, spec §4.5): chain construction, signature
//! verification, expiry, and revocation, combined into a single result.

pub mod chain;
pub mod engine;
pub mod revocation;

pub use chain::{build_chain, MAX_CHAIN_DEPTH};
pub use engine::{validate, ValidationResult, ValidationStatus};
pub use revocation::CrlStatus;
