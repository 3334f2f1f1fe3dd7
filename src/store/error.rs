//! Error taxonomy for the trust-material store layer.

/// Errors raised by `CatalogStore`/`DirectoryStore` implementations.
///
/// `UniqueViolation` is deliberately internal: the in-memory catalog turns
/// a duplicate-fingerprint write into the `Duplicate` branch of
/// [`super::catalog::UpsertOutcome`] rather than surfacing it, matching the
/// "triggers DUPLICATE path rather than bubbling" rule.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("canonical DN exceeds the 512-character ceiling")]
    DnTooLong,

    #[error("catalog unavailable")]
    CatalogUnavailable,

    #[error("directory unavailable")]
    DirectoryUnavailable,

    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("unique constraint violated for fingerprint")]
    UniqueViolation,
}
