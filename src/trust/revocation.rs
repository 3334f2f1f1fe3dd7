//! Revocation checks (spec §4.5): locate the current CRL for a
//! certificate's issuer, verify its signature, and check serial-number
//! membership.

use chrono::{DateTime, Utc};

use crate::{
    crypto,
    model::{Certificate, Crl},
    store::CatalogStore,
};

/// `crl_status`, spec §3/§4.5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CrlStatus {
    Valid,
    Revoked,
    CrlUnavailable,
    CrlExpired,
    CrlInvalid,
    NotChecked,
}

/// Checks revocation of `cert`, issued by `issuer`, at `reference_time`.
///
/// Observes whichever CRL is current in the catalog *right now*; a CRL
/// update mid-validation-run is not retroactively applied (spec §5).
pub fn check(
    cert: &Certificate,
    issuer: &Certificate,
    catalog: &dyn CatalogStore,
    reference_time: DateTime<Utc>,
) -> CrlStatus {
    let Some(crl) = catalog.find_crl_for(&cert.issuer_dn) else {
        return if cert.crl_distribution_points.is_empty() {
            CrlStatus::NotChecked
        } else {
            CrlStatus::CrlUnavailable
        };
    };

    if !crl.is_current_at(reference_time) {
        return CrlStatus::CrlExpired;
    }

    if verify_crl_signature(&crl, issuer).is_err() {
        return CrlStatus::CrlInvalid;
    }

    match crl.is_revoked(&cert.serial_number_hex) {
        Some(_) => CrlStatus::Revoked,
        None => CrlStatus::Valid,
    }
}

fn verify_crl_signature(crl: &Crl, issuer: &Certificate) -> anyhow::Result<()> {
    let issuer_cert = crypto::x509::decode_certificate(&issuer.der)?;
    let crl_structure = crypto::x509::decode_crl(&crl.der)?;
    crypto::x509::verify_crl_issued_by(&crl_structure, &issuer_cert)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{
            certificate::{CertificateType, SourceType},
            Fingerprint,
        },
        store::InMemoryCatalog,
    };
    use chrono::Duration;

    fn cert() -> Certificate {
        let now = Utc::now();
        Certificate {
            fingerprint_sha256: Fingerprint([9u8; 32]),
            serial_number_hex: "ab".to_string(),
            subject_dn: "cn=dsc-kr,c=kr".to_string(),
            issuer_dn: "cn=csca-kr,c=kr".to_string(),
            not_before: now - Duration::days(1),
            not_after: now + Duration::days(1),
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
            is_ca: false,
            path_len_constraint: None,
            crl_distribution_points: vec![],
            is_self_signed: false,
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
    fn no_crl_and_no_distribution_points_is_not_checked() {
        let catalog = InMemoryCatalog::new();
        let cert = cert();
        let issuer = cert.clone();
        assert_eq!(check(&cert, &issuer, &catalog, Utc::now()), CrlStatus::NotChecked);
    }

    #[test]
    fn missing_crl_with_distribution_points_is_unavailable() {
        let catalog = InMemoryCatalog::new();
        let mut cert = cert();
        cert.crl_distribution_points.push("ldap://example/crl".to_string());
        let issuer = cert.clone();
        assert_eq!(check(&cert, &issuer, &catalog, Utc::now()), CrlStatus::CrlUnavailable);
    }
}
