//! Spec §4.5/§8: chain construction, signature verification, expiry, and
//! revocation against real P-256 certificates and a real CRL, none of it
//! mocked — the same decode and verify paths `pa::verify` drives.

use chrono::{TimeZone, Utc};

use icao_pkd_mirror::{
    model::{
        certificate::{ClassificationHint, IngestContext, SourceType},
        Certificate, Crl, UploadId,
    },
    store::{CatalogStore, InMemoryCatalog},
    trust::{self, CrlStatus, ValidationStatus},
};

const CSCA_DER: &[u8] = include_bytes!("fixtures/csca.der");
const ROGUE_CSCA_DER: &[u8] = include_bytes!("fixtures/rogue_csca.der");
const DSC_DER: &[u8] = include_bytes!("fixtures/dsc.der");
const DSC_EXPIRED_DER: &[u8] = include_bytes!("fixtures/dsc_expired.der");
const DSC_REVOKED_DER: &[u8] = include_bytes!("fixtures/dsc_revoked.der");
const CRL_DER: &[u8] = include_bytes!("fixtures/csca.crl");

fn load_cert(der: &[u8]) -> Certificate {
    Certificate::from_der(
        der,
        IngestContext {
            source_type: SourceType::FileUpload,
            storing_dn: None,
            classification_hint: ClassificationHint::None,
            first_upload_id: Some(UploadId(1)),
        },
    )
    .unwrap()
}

fn reference_time(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single().unwrap()
}

#[test]
fn dsc_issued_by_a_stored_csca_validates() {
    let catalog = InMemoryCatalog::new();
    catalog.upsert_certificate(load_cert(CSCA_DER), UploadId(1)).unwrap();
    let dsc = load_cert(DSC_DER);

    let result = trust::validate(&dsc, &catalog, reference_time(2025, 6, 1));
    assert_eq!(result.validation_status, ValidationStatus::Valid);
    assert!(result.trust_chain_valid);
    assert!(result.signature_verified);
    assert!(!result.is_expired);
}

#[test]
fn expired_dsc_is_invalid_even_with_a_valid_signature() {
    let catalog = InMemoryCatalog::new();
    catalog.upsert_certificate(load_cert(CSCA_DER), UploadId(1)).unwrap();
    let dsc = load_cert(DSC_EXPIRED_DER);

    let result = trust::validate(&dsc, &catalog, reference_time(2025, 6, 1));
    assert_eq!(result.validation_status, ValidationStatus::Invalid);
    assert!(result.trust_chain_valid);
    assert!(result.signature_verified);
    assert!(result.is_expired);
}

#[test]
fn a_cert_signed_by_a_different_key_than_the_stored_issuer_fails_signature_verification() {
    let catalog = InMemoryCatalog::new();
    // Store the rogue CSCA under the real CSCA's subject DN: same subject,
    // different key, so the chain builder finds an "issuer" whose public
    // key does not actually match the DSC's signature.
    catalog.upsert_certificate(load_cert(ROGUE_CSCA_DER), UploadId(1)).unwrap();
    let dsc = load_cert(DSC_DER);

    let result = trust::validate(&dsc, &catalog, reference_time(2025, 6, 1));
    assert_eq!(result.validation_status, ValidationStatus::Invalid);
    assert!(!result.signature_verified);
}

#[test]
fn revoked_dsc_is_invalid_and_reported_as_revoked() {
    let catalog = InMemoryCatalog::new();
    catalog.upsert_certificate(load_cert(CSCA_DER), UploadId(1)).unwrap();
    let crl = Crl::from_der(CRL_DER).unwrap();
    catalog.upsert_crl(crl, UploadId(1)).unwrap();

    let dsc = load_cert(DSC_REVOKED_DER);
    let result = trust::validate(&dsc, &catalog, reference_time(2025, 6, 1));
    assert_eq!(result.validation_status, ValidationStatus::Invalid);
    assert!(result.crl_checked);
    assert!(result.crl_revoked);
}

#[test]
fn non_revoked_dsc_checked_against_the_same_crl_is_valid() {
    let catalog = InMemoryCatalog::new();
    catalog.upsert_certificate(load_cert(CSCA_DER), UploadId(1)).unwrap();
    let crl = Crl::from_der(CRL_DER).unwrap();
    catalog.upsert_crl(crl, UploadId(1)).unwrap();

    let dsc = load_cert(DSC_DER);
    let result = trust::validate(&dsc, &catalog, reference_time(2025, 6, 1));
    assert_eq!(result.validation_status, ValidationStatus::Valid);
    assert!(result.crl_checked);
    assert!(!result.crl_revoked);
}

#[test]
fn crl_checked_outside_its_validity_window_is_reported_expired_and_degrades_to_warning() {
    let catalog = InMemoryCatalog::new();
    catalog.upsert_certificate(load_cert(CSCA_DER), UploadId(1)).unwrap();
    let crl = Crl::from_der(CRL_DER).unwrap();
    catalog.upsert_crl(crl, UploadId(1)).unwrap();

    // The fixture CRL's validity window is 2025-01-01..2026-01-01.
    let dsc = load_cert(DSC_DER);
    let result = trust::validate(&dsc, &catalog, reference_time(2027, 1, 1));
    assert_eq!(result.validation_status, ValidationStatus::Warning);
    assert!(!result.crl_revoked);

    let direct = trust::revocation::check(&dsc, &load_cert(CSCA_DER), &catalog, reference_time(2027, 1, 1));
    assert_eq!(direct, CrlStatus::CrlExpired);
}
