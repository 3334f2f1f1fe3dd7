//! The validation engine (C5, spec §4.5): combines chain construction,
//! per-edge signature verification, expiry, and revocation into a single
//! `ValidationResult`.

use chrono::{DateTime, Utc};

use super::{
    chain::{self},
    revocation::{self, CrlStatus},
};
use crate::{crypto, model::Certificate, store::CatalogStore};

/// `validation_status`, spec §3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ValidationStatus {
    Pending,
    Valid,
    Invalid,
    Warning,
    Error,
}

/// Per (upload, certificate fingerprint) validation record, spec §3.
#[derive(Clone, Debug)]
pub struct ValidationResult {
    pub trust_chain_valid: bool,
    pub csca_subject_dn: Option<String>,
    pub signature_verified: bool,
    pub is_expired: bool,
    pub crl_checked: bool,
    pub crl_revoked: bool,
    pub validation_status: ValidationStatus,
    pub error_message: Option<String>,
}

/// Validates `leaf` at `reference_time`: builds the chain to a CSCA root,
/// verifies every signature in the chain, checks validity periods, and
/// checks revocation of every non-root certificate in the chain.
pub fn validate(
    leaf: &Certificate,
    catalog: &dyn CatalogStore,
    reference_time: DateTime<Utc>,
) -> ValidationResult {
    let chain = match chain::build_chain(leaf, catalog, reference_time) {
        Ok(chain) => chain,
        Err(err) => {
            return ValidationResult {
                trust_chain_valid: false,
                csca_subject_dn: None,
                signature_verified: false,
                is_expired: false,
                crl_checked: false,
                crl_revoked: false,
                validation_status: ValidationStatus::Invalid,
                error_message: Some(err.to_string()),
            };
        }
    };

    let csca_subject_dn = chain.last().map(|root| root.subject_dn.clone());

    let mut signature_verified = true;
    for pair in chain.windows(2) {
        let (child, issuer) = (&pair[0], &pair[1]);
        if !verify_edge(child, issuer) {
            signature_verified = false;
            break;
        }
    }
    if signature_verified {
        if let Some(root) = chain.last() {
            if !verify_edge(root, root) {
                signature_verified = false;
            }
        }
    }

    let is_expired = chain.iter().any(|cert| cert.is_expired_at(reference_time));

    let mut crl_checked = false;
    let mut crl_revoked = false;
    let mut crl_degraded = false;
    for pair in chain.windows(2) {
        let (cert, issuer) = (&pair[0], &pair[1]);
        match revocation::check(cert, issuer, catalog, reference_time) {
            CrlStatus::Valid => crl_checked = true,
            CrlStatus::Revoked => {
                crl_checked = true;
                crl_revoked = true;
            }
            CrlStatus::CrlUnavailable | CrlStatus::CrlExpired | CrlStatus::CrlInvalid => {
                crl_degraded = true;
            }
            CrlStatus::NotChecked => {}
        }
    }

    let validation_status = if !signature_verified || is_expired || crl_revoked {
        ValidationStatus::Invalid
    } else if crl_degraded {
        ValidationStatus::Warning
    } else {
        ValidationStatus::Valid
    };

    ValidationResult {
        trust_chain_valid: true,
        csca_subject_dn,
        signature_verified,
        is_expired,
        crl_checked,
        crl_revoked,
        validation_status,
        error_message: None,
    }
}

fn verify_edge(cert: &Certificate, issuer: &Certificate) -> bool {
    let Ok(cert_structure) = crypto::x509::decode_certificate(&cert.der) else {
        return false;
    };
    let Ok(issuer_structure) = crypto::x509::decode_certificate(&issuer.der) else {
        return false;
    };
    crypto::x509::verify_issued_by(&cert_structure, &issuer_structure).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{certificate::SourceType, CertificateType, Fingerprint},
        store::InMemoryCatalog,
    };
    use chrono::Duration;

    fn cert(fp: u8, subject: &str, issuer: &str, self_signed: bool) -> Certificate {
        let now = Utc::now();
        Certificate {
            fingerprint_sha256: Fingerprint([fp; 32]),
            serial_number_hex: "01".to_string(),
            subject_dn: subject.to_string(),
            issuer_dn: issuer.to_string(),
            not_before: now - Duration::days(365),
            not_after: now + Duration::days(365),
            certificate_type: CertificateType::Dsc,
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
            is_ca: self_signed,
            path_len_constraint: None,
            crl_distribution_points: vec![],
            is_self_signed: self_signed,
            source_type: SourceType::FileUpload,
            first_upload_id: None,
            last_seen_upload_id: None,
            last_seen_at: Some(now),
            duplicate_count: 0,
            pkd_conformance_code: None,
            pkd_conformance_text: None,
        }
    }

    #[test]
    fn missing_issuer_is_invalid_with_message() {
        let catalog = InMemoryCatalog::new();
        let dsc = cert(2, "cn=dsc-kr,c=kr", "cn=csca-kr,c=kr", false);
        let result = validate(&dsc, &catalog, Utc::now());
        assert_eq!(result.validation_status, ValidationStatus::Invalid);
        assert!(!result.trust_chain_valid);
        assert!(result.error_message.is_some());
    }
}
