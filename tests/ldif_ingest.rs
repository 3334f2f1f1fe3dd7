//! Spec §8 scenarios 1/2: a clean LDIF upload stores and projects every
//! certificate exactly once; re-uploading the same bytes records
//! duplicates instead of growing the catalog.

use std::collections::HashMap;

use icao_pkd_mirror::{
    ingest::{ingest_ldif, ProcessingMode, UploadStatus},
    model::{certificate::CertificateType, UploadId},
    store::{CatalogStore, DirectoryLayout, DirectoryStore, InMemoryCatalog, InMemoryDirectory},
};

const CLEAN_LDIF: &str = include_str!("fixtures/clean.ldif");
const DUPLICATE_LDIF: &str = include_str!("fixtures/duplicate.ldif");

fn layout() -> DirectoryLayout {
    DirectoryLayout {
        base_dn: "o=pkd".to_string(),
        data_container: "ou=data,o=pkd".to_string(),
        nc_data_container: "ou=nc-data,o=pkd".to_string(),
    }
}

#[test]
fn clean_ldif_stores_and_projects_every_certificate() {
    let catalog = InMemoryCatalog::new();
    let directory = InMemoryDirectory::new();
    let layout = layout();

    let record = ingest_ldif(
        CLEAN_LDIF.as_bytes(),
        &catalog,
        &directory,
        &layout,
        UploadId(1),
        "clean.ldif".to_string(),
        ProcessingMode::Manual,
        None,
        |_| {},
    );

    assert_eq!(record.status, UploadStatus::Completed);
    assert!(record.errors.is_empty(), "unexpected errors: {:?}", record.errors);
    assert_eq!(record.processed_entries, 2);

    let certs = catalog.all_certificates();
    assert_eq!(certs.len(), 2);

    let csca = certs
        .iter()
        .find(|c| c.certificate_type == CertificateType::Csca)
        .expect("csca stored");
    assert!(csca.is_self_signed);
    assert!(csca.is_ca);
    assert_eq!(csca.country_code, "KR");

    let dsc = certs
        .iter()
        .find(|c| c.certificate_type == CertificateType::Dsc)
        .expect("dsc stored");
    assert!(!dsc.is_self_signed);
    assert_eq!(dsc.issuer_dn, csca.subject_dn);

    // Every inserted certificate is projected into the directory under its
    // deterministic DN.
    assert_eq!(directory.all_dns().len(), 2);

    let mut per_type_total = 0;
    let per_type: HashMap<_, _> = record.per_type_counts.clone().into_iter().collect();
    for count in per_type.values() {
        per_type_total += count;
    }
    assert_eq!(per_type_total, 2);
}

#[test]
fn reuploading_the_same_entry_is_recorded_as_a_duplicate_not_a_second_row() {
    let catalog = InMemoryCatalog::new();
    let directory = InMemoryDirectory::new();
    let layout = layout();

    let first = ingest_ldif(
        DUPLICATE_LDIF.as_bytes(),
        &catalog,
        &directory,
        &layout,
        UploadId(1),
        "duplicate.ldif".to_string(),
        ProcessingMode::Manual,
        None,
        |_| {},
    );

    assert_eq!(first.status, UploadStatus::Completed);
    assert_eq!(first.processed_entries, 2);

    // Both entries carry the same DER bytes, so the catalog holds exactly
    // one certificate, observed twice.
    let certs = catalog.all_certificates();
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0].duplicate_count, 1);

    // The directory projection is likewise deduplicated to a single DN.
    assert_eq!(directory.all_dns().len(), 1);
}
