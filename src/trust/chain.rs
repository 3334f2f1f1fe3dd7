//! Chain construction (spec §4.5): repeatedly resolve a certificate's
//! issuer until a self-signed certificate is reached, tie-breaking among
//! candidates by AKI match, validity-at-reference-time, then recency.

use chrono::{DateTime, Utc};

use crate::{error::TrustError, model::Certificate, store::CatalogStore};

/// Paths longer than this are rejected as cyclic (spec §4.5).
pub const MAX_CHAIN_DEPTH: usize = 8;

/// Builds the path from `leaf` to its self-signed root, inclusive of both
/// ends. Returns `CscaNotFound` if no issuer candidate exists at some
/// point before a root is reached, and `ChainTooLong` if the path would
/// exceed [`MAX_CHAIN_DEPTH`].
pub fn build_chain(
    leaf: &Certificate,
    catalog: &dyn CatalogStore,
    reference_time: DateTime<Utc>,
) -> Result<Vec<Certificate>, TrustError> {
    let mut chain = vec![leaf.clone()];
    let mut current = leaf.clone();

    while !current.is_self_signed {
        if chain.len() >= MAX_CHAIN_DEPTH {
            return Err(TrustError::ChainTooLong);
        }
        let candidates = catalog.find_issuer_candidates(
            &current.issuer_dn,
            current.authority_key_identifier.as_deref(),
        );
        let issuer = select_issuer(&current, candidates, reference_time).ok_or(TrustError::CscaNotFound)?;
        chain.push(issuer.clone());
        current = issuer;
    }

    Ok(chain)
}

/// Tie-breaking rule of spec §4.5: AKI match over subject-only match;
/// among those, validity covers `reference_time`; then most recently
/// observed.
fn select_issuer(
    child: &Certificate,
    candidates: Vec<Certificate>,
    reference_time: DateTime<Utc>,
) -> Option<Certificate> {
    let aki = child.authority_key_identifier.as_deref();

    candidates.into_iter().max_by(|a, b| {
        let a_aki_match = aki.is_some() && a.subject_key_identifier.as_deref() == aki;
        let b_aki_match = aki.is_some() && b.subject_key_identifier.as_deref() == aki;
        a_aki_match
            .cmp(&b_aki_match)
            .then_with(|| covers(a, reference_time).cmp(&covers(b, reference_time)))
            .then_with(|| a.last_seen_at.cmp(&b.last_seen_at))
    })
}

fn covers(cert: &Certificate, reference_time: DateTime<Utc>) -> bool {
    cert.not_before <= reference_time && reference_time <= cert.not_after
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{certificate::SourceType, Fingerprint},
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
            certificate_type: crate::model::CertificateType::Dsc,
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
    fn builds_two_level_chain() {
        let catalog = InMemoryCatalog::new();
        let csca = cert(1, "cn=csca-kr,c=kr", "cn=csca-kr,c=kr", true);
        catalog
            .upsert_certificate(csca.clone(), crate::model::UploadId(1))
            .unwrap();
        let dsc = cert(2, "cn=dsc-kr,c=kr", "cn=csca-kr,c=kr", false);

        let chain = build_chain(&dsc, &catalog, Utc::now()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].fingerprint_sha256, csca.fingerprint_sha256);
    }

    #[test]
    fn missing_issuer_yields_csca_not_found() {
        let catalog = InMemoryCatalog::new();
        let dsc = cert(2, "cn=dsc-kr,c=kr", "cn=csca-kr,c=kr", false);
        assert_eq!(build_chain(&dsc, &catalog, Utc::now()).unwrap_err(), TrustError::CscaNotFound);
    }
}
