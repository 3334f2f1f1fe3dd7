//! The relational catalog tier (spec §4.4): idempotent upserts keyed by
//! `fingerprint_sha256`, duplicate-event recording, and issuer/CRL lookup
//! for the chain builder.
//!
//! `InMemoryCatalog` shards its locks by the fingerprint's leading byte so
//! that concurrent upserts of *different* certificates don't contend on a
//! single global lock, while upserts of the *same* fingerprint are
//! serialized by sharing a shard (spec §5(c): "upsert is serialized on
//! fingerprint_sha256").

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use super::error::StoreError;
use crate::model::{dn, Certificate, Crl, DuplicateCertificate, Fingerprint, UploadId};

const SHARD_COUNT: usize = 16;

/// The outcome of a single `upsert_certificate`/`upsert_crl` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Duplicate,
}

/// Public operations of spec §4.4, object-safe so an external SQL-backed
/// adapter can implement it without touching the rest of the crate.
pub trait CatalogStore: Send + Sync {
    fn upsert_certificate(
        &self,
        cert: Certificate,
        upload_id: UploadId,
    ) -> Result<(Certificate, UpsertOutcome, Option<DuplicateCertificate>), StoreError>;

    fn upsert_crl(&self, crl: Crl, upload_id: UploadId) -> Result<(Crl, UpsertOutcome), StoreError>;

    fn get_certificate(&self, fingerprint: &Fingerprint) -> Option<Certificate>;

    fn find_issuer_candidates(&self, issuer_dn: &str, ski_hint: Option<&[u8]>) -> Vec<Certificate>;

    /// Looks up a certificate by its own signer identity — `issuer_dn` and
    /// `serial_number_hex` together, as carried in a CMS
    /// `IssuerAndSerialNumber` — rather than by what it issued. Used by
    /// Passive Authentication (spec §4.6) to resolve a DSC that the SOD's
    /// certificate bag omitted.
    fn find_by_issuer_and_serial(&self, issuer_dn: &str, serial_hex: &str) -> Option<Certificate>;

    /// The current CRL for `issuer_dn`: max by `this_update`, ties broken
    /// by max `crl_number` (spec §4.4).
    fn find_crl_for(&self, issuer_dn: &str) -> Option<Crl>;

    fn all_certificates(&self) -> Vec<Certificate>;
    fn all_crls(&self) -> Vec<Crl>;
}

#[derive(Default)]
struct Shard {
    certificates: HashMap<Fingerprint, Certificate>,
    crls: HashMap<Fingerprint, Crl>,
}

/// The crate's one concrete `CatalogStore`: an in-memory, lock-sharded
/// map. A real deployment's relational catalog (row-level unique
/// constraints, ACID transactions, connection pooling — spec §5(a)) is an
/// external collaborator this trait adapts to.
pub struct InMemoryCatalog {
    shards: Vec<RwLock<Shard>>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(Shard::default())).collect(),
        }
    }

    fn shard_for(&self, fingerprint: &Fingerprint) -> &RwLock<Shard> {
        let index = fingerprint.0[0] as usize % self.shards.len();
        &self.shards[index]
    }
}

impl CatalogStore for InMemoryCatalog {
    fn upsert_certificate(
        &self,
        mut cert: Certificate,
        upload_id: UploadId,
    ) -> Result<(Certificate, UpsertOutcome, Option<DuplicateCertificate>), StoreError> {
        let fingerprint = cert.fingerprint_sha256;
        let shard = self.shard_for(&fingerprint);
        let mut shard = shard.write();

        if let Some(existing) = shard.certificates.get_mut(&fingerprint) {
            existing.duplicate_count += 1;
            existing.last_seen_upload_id = Some(upload_id);
            existing.last_seen_at = Some(Utc::now());
            let duplicate = DuplicateCertificate {
                fingerprint_sha256: fingerprint,
                observing_upload_id: upload_id,
                first_upload_id: existing.first_upload_id.unwrap_or(upload_id),
                certificate_type: existing.certificate_type,
                country_code: existing.country_code.clone(),
                subject_dn: existing.subject_dn.clone(),
                observed_at: existing.last_seen_at.expect("just set"),
            };
            tracing::info!(
                fingerprint = %fingerprint,
                upload_id = %upload_id,
                duplicate_count = existing.duplicate_count,
                "duplicate certificate observed"
            );
            return Ok((existing.clone(), UpsertOutcome::Duplicate, Some(duplicate)));
        }

        cert.first_upload_id = Some(upload_id);
        cert.last_seen_upload_id = Some(upload_id);
        cert.last_seen_at = Some(Utc::now());
        cert.duplicate_count = 0;
        shard.certificates.insert(fingerprint, cert.clone());
        tracing::info!(fingerprint = %fingerprint, upload_id = %upload_id, "certificate inserted");
        Ok((cert, UpsertOutcome::Inserted, None))
    }

    fn upsert_crl(&self, crl: Crl, _upload_id: UploadId) -> Result<(Crl, UpsertOutcome), StoreError> {
        let fingerprint = crl.fingerprint_sha256;
        let shard = self.shard_for(&fingerprint);
        let mut shard = shard.write();
        let outcome = if shard.crls.contains_key(&fingerprint) {
            UpsertOutcome::Duplicate
        } else {
            UpsertOutcome::Inserted
        };
        shard.crls.insert(fingerprint, crl.clone());
        Ok((crl, outcome))
    }

    fn get_certificate(&self, fingerprint: &Fingerprint) -> Option<Certificate> {
        self.shard_for(fingerprint).read().certificates.get(fingerprint).cloned()
    }

    fn find_issuer_candidates(&self, issuer_dn: &str, ski_hint: Option<&[u8]>) -> Vec<Certificate> {
        self.shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .certificates
                    .values()
                    .filter(|cert| {
                        dn::dn_equal(&cert.subject_dn, issuer_dn)
                            || ski_hint.is_some_and(|ski| {
                                cert.subject_key_identifier.as_deref() == Some(ski)
                            })
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn find_by_issuer_and_serial(&self, issuer_dn: &str, serial_hex: &str) -> Option<Certificate> {
        self.shards.iter().find_map(|shard| {
            shard
                .read()
                .certificates
                .values()
                .find(|cert| dn::dn_equal(&cert.issuer_dn, issuer_dn) && cert.serial_number_hex == serial_hex)
                .cloned()
        })
    }

    fn find_crl_for(&self, issuer_dn: &str) -> Option<Crl> {
        self.shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .crls
                    .values()
                    .filter(|crl| dn::dn_equal(&crl.issuer_dn, issuer_dn))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .max_by(|a, b| a.this_update.cmp(&b.this_update).then(a.crl_number.cmp(&b.crl_number)))
    }

    fn all_certificates(&self) -> Vec<Certificate> {
        self.shards.iter().flat_map(|s| s.read().certificates.values().cloned().collect::<Vec<_>>()).collect()
    }

    fn all_crls(&self) -> Vec<Crl> {
        self.shards.iter().flat_map(|s| s.read().crls.values().cloned().collect::<Vec<_>>()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::certificate::{CertificateType, SourceType};

    fn sample_cert(fingerprint_byte: u8) -> Certificate {
        Certificate {
            fingerprint_sha256: Fingerprint([fingerprint_byte; 32]),
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
    fn first_insert_is_inserted_second_is_duplicate() {
        let catalog = InMemoryCatalog::new();
        let (_, outcome, dup) = catalog.upsert_certificate(sample_cert(1), UploadId(1)).unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert!(dup.is_none());

        let (stored, outcome, dup) = catalog.upsert_certificate(sample_cert(1), UploadId(2)).unwrap();
        assert_eq!(outcome, UpsertOutcome::Duplicate);
        assert_eq!(stored.duplicate_count, 1);
        assert!(dup.is_some());
        assert_eq!(dup.unwrap().first_upload_id, UploadId(1));
    }

    #[test]
    fn find_issuer_candidates_matches_on_canonical_subject() {
        let catalog = InMemoryCatalog::new();
        catalog.upsert_certificate(sample_cert(2), UploadId(1)).unwrap();
        let candidates = catalog.find_issuer_candidates("CN = CSCA-KR , C=KR", None);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn find_by_issuer_and_serial_matches_signer_identity_not_subject() {
        let catalog = InMemoryCatalog::new();
        let mut dsc = sample_cert(3);
        dsc.subject_dn = "cn=dsc-kr,c=kr".to_string();
        dsc.issuer_dn = "cn=csca-kr,c=kr".to_string();
        dsc.serial_number_hex = "ab".to_string();
        catalog.upsert_certificate(dsc, UploadId(1)).unwrap();

        let found = catalog
            .find_by_issuer_and_serial("CN = CSCA-KR , C=KR", "ab")
            .expect("dsc found by its own issuer and serial");
        assert_eq!(found.subject_dn, "cn=dsc-kr,c=kr");

        assert!(catalog.find_by_issuer_and_serial("CN = CSCA-KR , C=KR", "ff").is_none());
    }
}
