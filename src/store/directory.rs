//! The hierarchical directory tier (spec §4.4/§6): a derived projection of
//! the catalog, keyed by a deterministic DN computed from type/country/
//! fingerprint. The catalog is authoritative; this tier is never consulted
//! for `last_seen_at`/`duplicate_count`/`first_upload_id`.

use std::collections::HashSet;

use parking_lot::RwLock;

use super::error::StoreError;
use crate::model::{
    certificate::CertificateType,
    dn::{self, MAX_DN_LEN},
    Certificate, Crl,
};

/// The container DNs a directory adapter is configured with (spec §6's
/// `data_container`/`nc_data_container`, rooted at `base_dn`).
#[derive(Clone, Debug)]
pub struct DirectoryLayout {
    pub base_dn: String,
    pub data_container: String,
    pub nc_data_container: String,
}

/// Computes the deterministic directory DN for a certificate: `cn=<fp>,
/// o=<type-lowercase>,c=<country>,<container-dn>` (spec §4.4).
pub fn certificate_dn(cert: &Certificate, layout: &DirectoryLayout) -> Result<String, StoreError> {
    let container = if cert.certificate_type == CertificateType::DscNc {
        &layout.nc_data_container
    } else {
        &layout.data_container
    };
    let type_label = certificate_type_label(cert.certificate_type);
    let raw = format!(
        "cn={},o={},c={},{}",
        cert.fingerprint_sha256, type_label, cert.country_code, container
    );
    let canonical = dn::canonicalize(&raw);
    if canonical.len() > MAX_DN_LEN {
        return Err(StoreError::DnTooLong);
    }
    Ok(canonical)
}

/// Computes the deterministic directory DN for a CRL: `o=crl` in place of
/// the certificate-type container segment.
pub fn crl_dn(crl: &Crl, layout: &DirectoryLayout) -> Result<String, StoreError> {
    let raw = format!(
        "cn={},o=crl,c={},{}",
        crl.fingerprint_sha256, crl.country_code, layout.data_container
    );
    let canonical = dn::canonicalize(&raw);
    if canonical.len() > MAX_DN_LEN {
        return Err(StoreError::DnTooLong);
    }
    Ok(canonical)
}

fn certificate_type_label(ty: CertificateType) -> &'static str {
    match ty {
        CertificateType::Csca => "csca",
        CertificateType::Dsc => "dsc",
        CertificateType::DscNc => "dsc",
        CertificateType::Mlsc => "mlsc",
        CertificateType::LinkCert => "link_cert",
        CertificateType::DvlSigner => "dvl_signer",
    }
}

/// Public operations of spec §4.4, object-safe for the same reason as
/// `CatalogStore`.
pub trait DirectoryStore: Send + Sync {
    fn project_certificate(&self, cert: &Certificate, layout: &DirectoryLayout) -> Result<(), StoreError>;
    fn project_crl(&self, crl: &Crl, layout: &DirectoryLayout) -> Result<(), StoreError>;
    fn contains(&self, dn: &str) -> bool;
    fn delete(&self, dn: &str) -> bool;
    fn all_dns(&self) -> Vec<String>;
}

/// The crate's one concrete `DirectoryStore`: an in-memory set of DNs. A
/// real LDAP-backed adapter (bind/search/add/modify/delete, read replicas
/// plus a pinned write primary — spec §5(b)) is an external collaborator.
#[derive(Default)]
pub struct InMemoryDirectory {
    entries: RwLock<HashSet<String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirectoryStore for InMemoryDirectory {
    fn project_certificate(&self, cert: &Certificate, layout: &DirectoryLayout) -> Result<(), StoreError> {
        let dn = certificate_dn(cert, layout)?;
        tracing::debug!(dn = %dn, fingerprint = %cert.fingerprint_sha256, "projecting certificate to directory");
        self.entries.write().insert(dn);
        Ok(())
    }

    fn project_crl(&self, crl: &Crl, layout: &DirectoryLayout) -> Result<(), StoreError> {
        let dn = crl_dn(crl, layout)?;
        self.entries.write().insert(dn);
        Ok(())
    }

    fn contains(&self, dn: &str) -> bool {
        self.entries.read().contains(&dn::canonicalize(dn))
    }

    fn delete(&self, dn: &str) -> bool {
        self.entries.write().remove(&dn::canonicalize(dn))
    }

    fn all_dns(&self) -> Vec<String> {
        self.entries.read().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{certificate::SourceType, Fingerprint};
    use chrono::Utc;

    fn layout() -> DirectoryLayout {
        DirectoryLayout {
            base_dn: "o=pkd".to_string(),
            data_container: "ou=data,o=pkd".to_string(),
            nc_data_container: "ou=nc-data,o=pkd".to_string(),
        }
    }

    fn sample_cert() -> Certificate {
        Certificate {
            fingerprint_sha256: Fingerprint([7u8; 32]),
            serial_number_hex: "01".to_string(),
            subject_dn: "cn=csca-kr,c=kr".to_string(),
            issuer_dn: "cn=csca-kr,c=kr".to_string(),
            not_before: Utc::now(),
            not_after: Utc::now(),
            certificate_type: CertificateType::Csca,
            country_code: "KR".to_string(),
            der: vec![],
            version: 3,
            signature_algorithm: der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11"),
            public_key_algorithm: der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1"),
            public_key_bits: Some(2048),
            subject_key_identifier: None,
            authority_key_identifier: None,
            key_usage_bits: None,
            extended_key_usage: vec![],
            is_ca: true,
            path_len_constraint: None,
            crl_distribution_points: vec![],
            is_self_signed: true,
            source_type: SourceType::FileUpload,
            first_upload_id: None,
            last_seen_upload_id: None,
            last_seen_at: None,
            duplicate_count: 0,
            pkd_conformance_code: None,
            pkd_conformance_text: None,
        }
    }

    #[test]
    fn projects_certificate_at_deterministic_dn() {
        let directory = InMemoryDirectory::new();
        let layout = layout();
        directory.project_certificate(&sample_cert(), &layout).unwrap();
        let dn = certificate_dn(&sample_cert(), &layout).unwrap();
        assert!(directory.contains(&dn));
        assert!(dn.starts_with("cn="));
        assert!(dn.contains("o=csca"));
    }

    #[test]
    fn delete_is_idempotent() {
        let directory = InMemoryDirectory::new();
        assert!(!directory.delete("cn=nonexistent"));
    }
}
