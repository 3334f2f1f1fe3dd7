//! Crate-level error taxonomy, mirroring the five families every component
//! boundary reduces its errors to: malformed input, broken trust, flagged
//! conformance, storage unavailability, and lifecycle lookups.
//!
//! Lower layers (`crypto`, `asn1`, and most of `model`/`parsers`) use
//! `anyhow::Result` internally, the way the teacher's ASN.1 code already
//! does — the conversions here exist at the seam where a public operation
//! hands a result back to a caller, so nothing upstream ever sees an
//! `anyhow` chain, a raw DER byte, or key material in a message.

use der::asn1::ObjectIdentifier as Oid;

use crate::{crypto::error::CryptoError, store::error::StoreError};

/// The crate's public error type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Trust(#[from] TrustError),

    #[error(transparent)]
    Conformance(#[from] ConformanceError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Errors raised while decoding or validating a single piece of input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("certificate is not valid DER X.509")]
    MalformedCertificate,

    #[error("CRL is not valid DER X.509")]
    MalformedCrl,

    #[error("CMS structure is not valid DER")]
    MalformedCms,

    #[error("malformed LDIF: {0}")]
    MalformedLdif(String),

    #[error("malformed SOD: {0}")]
    MalformedSod(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(Oid),

    #[error("canonical DN exceeds the 512-character ceiling")]
    DnTooLong,
}

/// Errors describing a failure of the trust chain or signature itself.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("no CSCA candidate found for issuer")]
    CscaNotFound,

    #[error("certificate chain exceeds the maximum depth")]
    ChainTooLong,

    #[error("signature does not verify")]
    BadSignature,

    #[error("certificate expired")]
    Expired,

    #[error("certificate expired at the reference instant")]
    ExpiredAtReference,

    #[error("certificate serial number is revoked")]
    Revoked,

    #[error("no CRL available for issuer")]
    CrlUnavailable,

    #[error("CRL has lapsed (now is past nextUpdate)")]
    CrlExpired,

    #[error("CRL signature does not verify against its issuer")]
    CrlInvalid,
}

/// Conformance findings that annotate a result without failing it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConformanceError {
    #[error("non-conformant DSC ({code}): {text}")]
    NonConformantDsc { code: String, text: String },
}

/// Errors from the catalog/directory storage tier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("catalog unavailable")]
    CatalogUnavailable,

    #[error("directory unavailable")]
    DirectoryUnavailable,

    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("unique constraint violated for fingerprint")]
    UniqueViolation,
}

/// Errors looking up a record by identity.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("upload not found")]
    UploadNotFound,

    #[error("verification not found")]
    VerificationNotFound,
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::MalformedCertificate => InputError::MalformedCertificate.into(),
            CryptoError::MalformedCrl => InputError::MalformedCrl.into(),
            CryptoError::MalformedCms => InputError::MalformedCms.into(),
            CryptoError::UnsupportedAlgorithm(oid) => InputError::UnsupportedAlgorithm(oid).into(),
            CryptoError::BadSignature => TrustError::BadSignature.into(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DnTooLong => InputError::DnTooLong.into(),
            StoreError::CatalogUnavailable => StorageError::CatalogUnavailable.into(),
            StoreError::DirectoryUnavailable => StorageError::DirectoryUnavailable.into(),
            StoreError::PoolExhausted => StorageError::PoolExhausted.into(),
            StoreError::UniqueViolation => StorageError::UniqueViolation.into(),
        }
    }
}
