//! Canonical in-memory data model: the types every other component reads
//! and writes, plus DN canonicalization and fingerprinting.

pub mod certificate;
pub mod crl;
pub mod dn;
pub mod duplicate;
pub mod extensions;
pub mod master_list;

pub use certificate::{Certificate, CertificateType, ClassificationHint, SourceType};
pub use crl::Crl;
pub use duplicate::DuplicateCertificate;
pub use master_list::MasterList;

/// Opaque identifier of an `UploadRecord`, referenced from `Certificate`
/// and `DuplicateCertificate` without an in-memory back-pointer (spec §9:
/// "resolve by storing only ids and resolving on demand").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct UploadId(pub u64);

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 fingerprint of a certificate or CRL's DER bytes, the system's
/// canonical identifier (spec GLOSSARY).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    pub fn of(der_bytes: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(der_bytes);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}
