//! Reconciliation (C8, spec §4.8): the catalog is authoritative; this
//! compares it against the directory's derived projection and repairs any
//! drift — adding entries the directory is missing, deleting entries that
//! no longer correspond to a catalog row.

use std::{collections::HashMap, collections::HashSet, time::Instant};

use chrono::{DateTime, Utc};

use crate::{
    model::{Certificate, CertificateType, Crl},
    store::{directory as directory_dn, CatalogStore, DirectoryLayout, DirectoryStore},
};

/// One repair (or would-be repair, under `dry_run`) performed this run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOp {
    Added,
    Deleted,
    WouldAdd,
    WouldDelete,
}

#[derive(Clone, Debug)]
pub struct ReconciliationLogEntry {
    pub operation: ReconcileOp,
    pub dn: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PerTypeCounts {
    pub added: usize,
    pub deleted: usize,
}

#[derive(Clone, Debug)]
pub struct ReconciliationSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total_processed: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub per_type: HashMap<CertificateType, PerTypeCounts>,
}

/// One reconciliation pass over the full catalog, spec §8 scenario 6: a
/// catalog row missing its directory projection is re-projected on
/// `dry_run=false`; running again afterward performs zero operations.
pub fn run(
    catalog: &dyn CatalogStore,
    directory: &dyn DirectoryStore,
    layout: &DirectoryLayout,
    dry_run: bool,
) -> (ReconciliationSummary, Vec<ReconciliationLogEntry>) {
    let started_at = Utc::now();
    let started = Instant::now();

    let mut log = Vec::new();
    let mut per_type: HashMap<CertificateType, PerTypeCounts> = HashMap::new();
    let mut success_count = 0;
    let mut failed_count = 0;

    let certificates = catalog.all_certificates();
    let crls = catalog.all_crls();

    let mut expected_certificate_dns: HashMap<String, &Certificate> = HashMap::new();
    for cert in &certificates {
        match directory_dn::certificate_dn(cert, layout) {
            Ok(dn) => {
                expected_certificate_dns.insert(dn, cert);
            }
            Err(_) => failed_count += 1,
        }
    }

    let mut expected_crl_dns: HashMap<String, &Crl> = HashMap::new();
    for crl in &crls {
        match directory_dn::crl_dn(crl, layout) {
            Ok(dn) => {
                expected_crl_dns.insert(dn, crl);
            }
            Err(_) => failed_count += 1,
        }
    }

    let existing: HashSet<String> = directory.all_dns().into_iter().collect();

    for (dn, cert) in &expected_certificate_dns {
        if existing.contains(dn) {
            continue;
        }
        let op = if dry_run {
            ReconcileOp::WouldAdd
        } else {
            match directory.project_certificate(cert, layout) {
                Ok(()) => ReconcileOp::Added,
                Err(_) => {
                    failed_count += 1;
                    continue;
                }
            }
        };
        per_type.entry(cert.certificate_type).or_default().added += 1;
        success_count += 1;
        tracing::debug!(dn = %dn, op = ?op, "reconciliation: certificate repaired");
        log.push(ReconciliationLogEntry { operation: op, dn: dn.clone() });
    }

    for (dn, crl) in &expected_crl_dns {
        if existing.contains(dn) {
            continue;
        }
        let op = if dry_run {
            ReconcileOp::WouldAdd
        } else {
            match directory.project_crl(crl, layout) {
                Ok(()) => ReconcileOp::Added,
                Err(_) => {
                    failed_count += 1;
                    continue;
                }
            }
        };
        success_count += 1;
        tracing::debug!(dn = %dn, op = ?op, "reconciliation: crl repaired");
        log.push(ReconciliationLogEntry { operation: op, dn: dn.clone() });
    }

    for dn in &existing {
        if expected_certificate_dns.contains_key(dn) || expected_crl_dns.contains_key(dn) {
            continue;
        }
        let op = if dry_run {
            ReconcileOp::WouldDelete
        } else {
            directory.delete(dn);
            ReconcileOp::Deleted
        };
        if let Some(label) = certificate_type_from_dn(dn) {
            per_type.entry(label).or_default().deleted += 1;
        }
        success_count += 1;
        tracing::debug!(dn = %dn, op = ?op, "reconciliation: stray entry removed");
        log.push(ReconciliationLogEntry { operation: op, dn: dn.clone() });
    }

    let total_processed = success_count + failed_count;
    let completed_at = Utc::now();

    tracing::info!(
        dry_run,
        total_processed,
        success_count,
        failed_count,
        repairs = log.len(),
        "reconciliation pass complete"
    );

    (
        ReconciliationSummary {
            started_at,
            completed_at,
            duration_ms: started.elapsed().as_millis() as u64,
            total_processed,
            success_count,
            failed_count,
            per_type,
        },
        log,
    )
}

/// Best-effort recovery of a certificate's type from its directory DN's
/// `o=` segment, used only to attribute a stray entry's deletion to a type
/// in the summary; CRL entries (`o=crl`) attribute to nothing.
fn certificate_type_from_dn(dn: &str) -> Option<CertificateType> {
    let label = dn.split(',').find_map(|rdn| rdn.strip_prefix("o="))?;
    Some(match label {
        "csca" => CertificateType::Csca,
        "dsc" => CertificateType::Dsc,
        "mlsc" => CertificateType::Mlsc,
        "link_cert" => CertificateType::LinkCert,
        "dvl_signer" => CertificateType::DvlSigner,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{certificate::SourceType, Fingerprint},
        store::{InMemoryCatalog, InMemoryDirectory},
    };
    use chrono::Utc as ChronoUtc;

    fn layout() -> DirectoryLayout {
        DirectoryLayout {
            base_dn: "o=pkd".to_string(),
            data_container: "ou=data,o=pkd".to_string(),
            nc_data_container: "ou=nc-data,o=pkd".to_string(),
        }
    }

    fn sample_cert() -> Certificate {
        Certificate {
            fingerprint_sha256: Fingerprint([3u8; 32]),
            serial_number_hex: "01".to_string(),
            subject_dn: "cn=csca-kr,c=kr".to_string(),
            issuer_dn: "cn=csca-kr,c=kr".to_string(),
            not_before: ChronoUtc::now(),
            not_after: ChronoUtc::now(),
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
    fn missing_directory_entry_is_reprojected_then_stable() {
        let catalog = InMemoryCatalog::new();
        let directory = InMemoryDirectory::new();
        let layout = layout();
        catalog
            .upsert_certificate(sample_cert(), crate::model::UploadId(1))
            .unwrap();

        let (summary, log) = run(&catalog, &directory, &layout, false);
        assert_eq!(summary.success_count, 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].operation, ReconcileOp::Added);

        let (summary, log) = run(&catalog, &directory, &layout, false);
        assert_eq!(summary.success_count, 0);
        assert!(log.is_empty());
    }

    #[test]
    fn dry_run_does_not_mutate_directory() {
        let catalog = InMemoryCatalog::new();
        let directory = InMemoryDirectory::new();
        let layout = layout();
        catalog
            .upsert_certificate(sample_cert(), crate::model::UploadId(1))
            .unwrap();

        let (_, log) = run(&catalog, &directory, &layout, true);
        assert_eq!(log[0].operation, ReconcileOp::WouldAdd);
        assert!(directory.all_dns().is_empty());
    }
}
