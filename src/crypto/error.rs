//! Error taxonomy for the crypto primitives layer.

use der::asn1::ObjectIdentifier as Oid;

/// Errors raised while decoding or verifying cryptographic material.
///
/// Deliberately opaque: variants never carry raw DER bytes, key material, or
/// the underlying library's error chain, so that callers can surface the
/// message to a client without leaking internals.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("certificate is not valid DER X.509")]
    MalformedCertificate,

    #[error("CRL is not valid DER X.509")]
    MalformedCrl,

    #[error("CMS structure is not valid DER")]
    MalformedCms,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(Oid),

    #[error("signature does not verify")]
    BadSignature,
}
