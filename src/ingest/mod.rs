//! Ingestion coordinator (C7, spec §4.7): the `PENDING → PROCESSING →
//! {COMPLETED, FAILED}` upload state machine, driving an LDIF or Master
//! List file entry-by-entry through the canonical model (C2), the store
//! (C4), and the validation engine (C5), with rate-limited progress
//! snapshots and per-type/validation aggregation.

use std::{collections::HashMap, io::Cursor, time::Instant};

use chrono::{DateTime, Utc};

use crate::{
    model::{
        certificate::{ClassificationHint, IngestContext, SourceType},
        Certificate, CertificateType, Crl, Fingerprint, UploadId,
    },
    parsers::ldif::LdifEntries,
    store::{CatalogStore, DirectoryLayout, DirectoryStore, UpsertOutcome},
    trust::{self, ValidationStatus},
};

const USER_CERTIFICATE_ATTR: &str = "usercertificate;binary";
const CA_CERTIFICATE_ATTR: &str = "cacertificate;binary";
const CRL_ATTR: &str = "certificaterevocationlist;binary";
const CONFORMANCE_CODE_ATTR: &str = "pkdconformancecode";
const CONFORMANCE_TEXT_ATTR: &str = "pkdconformancetext";

/// `format`, spec §3/§6.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadFormat {
    Ldif,
    Ml,
    Pem,
    Der,
    Cer,
    Bin,
    Dvl,
    MasterList,
}

/// `status`, spec §3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// `processing_mode`, spec §3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingMode {
    Auto,
    Manual,
}

/// A progress event, spec §4.7: `(processed, total, current_stage,
/// per_type_counts)`.
#[derive(Clone, Debug)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: Option<usize>,
    pub current_stage: &'static str,
    pub per_type_counts: HashMap<CertificateType, usize>,
}

/// Fires when either `every_count` entries have passed, or `every_duration`
/// has elapsed, whichever comes first (spec §4.7's progress rate limit).
struct IntervalGate {
    every_count: usize,
    every: std::time::Duration,
    last_count: usize,
    last_fired: Instant,
}

impl IntervalGate {
    fn new(every_count: usize, every: std::time::Duration) -> Self {
        Self { every_count, every, last_count: 0, last_fired: Instant::now() }
    }

    fn should_fire(&mut self, processed: usize) -> bool {
        let count_due = processed.saturating_sub(self.last_count) >= self.every_count;
        let time_due = self.last_fired.elapsed() >= self.every;
        if count_due || time_due {
            self.last_count = processed;
            self.last_fired = Instant::now();
            true
        } else {
            false
        }
    }
}

/// The canonical upload record, spec §3.
#[derive(Clone, Debug)]
pub struct UploadRecord {
    pub id: UploadId,
    pub original_file_name: String,
    pub size_bytes: u64,
    pub sha256: Fingerprint,
    pub format: UploadFormat,
    pub status: UploadStatus,
    pub processing_mode: ProcessingMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_entries: Option<usize>,
    pub processed_entries: usize,
    pub per_type_counts: HashMap<CertificateType, usize>,
    pub validation_outcomes: HashMap<ValidationStatus, usize>,
    pub errors: Vec<String>,
    pub error_message: Option<String>,
}

impl UploadRecord {
    fn new(id: UploadId, original_file_name: String, bytes: &[u8], format: UploadFormat, processing_mode: ProcessingMode) -> Self {
        let now = Utc::now();
        Self {
            id,
            original_file_name,
            size_bytes: bytes.len() as u64,
            sha256: Fingerprint::of(bytes),
            format,
            status: UploadStatus::Pending,
            processing_mode,
            created_at: now,
            updated_at: now,
            total_entries: None,
            processed_entries: 0,
            per_type_counts: HashMap::new(),
            validation_outcomes: HashMap::new(),
            errors: Vec::new(),
            error_message: None,
        }
    }

    fn record_certificate(&mut self, cert: &Certificate, validation_status: ValidationStatus) {
        self.processed_entries += 1;
        *self.per_type_counts.entry(cert.certificate_type).or_insert(0) += 1;
        *self.validation_outcomes.entry(validation_status).or_insert(0) += 1;
        self.updated_at = Utc::now();
    }

    fn fail(&mut self, message: String) {
        self.status = UploadStatus::Failed;
        self.error_message = Some(message);
        self.updated_at = Utc::now();
    }

    fn complete(&mut self) {
        self.status = UploadStatus::Completed;
        self.updated_at = Utc::now();
    }
}

/// Ingests one LDIF file, spec §8 scenarios 1/2: `userCertificate;binary`/
/// `cACertificate;binary` entries become certificates, `pkdConformanceCode`/
/// `pkdConformanceText` attributes mark the entry's certificates DSC_NC,
/// `certificateRevocationList;binary` entries become CRLs. Each successfully
/// stored item is projected into the directory best-effort (spec §4.7's
/// "logical transaction spanning catalog upsert, optional directory
/// projection, and statistics update").
#[allow(clippy::too_many_arguments)]
pub fn ingest_ldif(
    bytes: &[u8],
    catalog: &dyn CatalogStore,
    directory: &dyn DirectoryStore,
    layout: &DirectoryLayout,
    upload_id: UploadId,
    original_file_name: String,
    processing_mode: ProcessingMode,
    total_hint: Option<usize>,
    mut on_progress: impl FnMut(ProgressSnapshot),
) -> UploadRecord {
    let mut record = UploadRecord::new(upload_id, original_file_name, bytes, UploadFormat::Ldif, processing_mode);
    record.status = UploadStatus::Processing;
    record.total_entries = total_hint;
    tracing::info!(upload_id = %upload_id, size_bytes = record.size_bytes, "ldif upload: pending -> processing");

    let mut gate = IntervalGate::new(100, std::time::Duration::from_millis(500));
    let mut entries = LdifEntries::new(Cursor::new(bytes));

    while let Some(entry) = entries.next() {
        let hint = conformance_hint(&entry.attributes);
        let ctx_for = |hint: ClassificationHint| IngestContext {
            source_type: SourceType::LdifParsed,
            storing_dn: Some(entry.dn.clone()),
            classification_hint: hint,
            first_upload_id: Some(upload_id),
        };

        for der_bytes in entry.values(USER_CERTIFICATE_ATTR) {
            ingest_one_certificate(der_bytes, ctx_for(hint.clone()), catalog, directory, layout, &mut record);
        }
        for der_bytes in entry.values(CA_CERTIFICATE_ATTR) {
            ingest_one_certificate(der_bytes, ctx_for(hint.clone()), catalog, directory, layout, &mut record);
        }
        for der_bytes in entry.values(CRL_ATTR) {
            ingest_one_crl(der_bytes, catalog, directory, layout, upload_id, &mut record);
        }

        if gate.should_fire(record.processed_entries) {
            on_progress(ProgressSnapshot {
                processed: record.processed_entries,
                total: record.total_entries,
                current_stage: "ldif",
                per_type_counts: record.per_type_counts.clone(),
            });
        }
    }

    record
        .errors
        .extend(entries.errors().iter().map(|e| format!("entry {}: {}", e.entry_index, e.message)));
    record.complete();
    tracing::info!(
        upload_id = %upload_id,
        processed = record.processed_entries,
        errors = record.errors.len(),
        "ldif upload: processing -> completed"
    );
    record
}

fn ingest_one_certificate(
    der_bytes: &[u8],
    ctx: IngestContext,
    catalog: &dyn CatalogStore,
    directory: &dyn DirectoryStore,
    layout: &DirectoryLayout,
    record: &mut UploadRecord,
) {
    let cert = match Certificate::from_der(der_bytes, ctx) {
        Ok(cert) => cert,
        Err(err) => {
            record.errors.push(format!("malformed certificate: {err}"));
            return;
        }
    };

    let upload_id = record.id;
    let (stored, outcome, _duplicate) = match catalog.upsert_certificate(cert, upload_id) {
        Ok(result) => result,
        Err(err) => {
            record.errors.push(format!("catalog upsert failed: {err}"));
            return;
        }
    };

    if outcome == UpsertOutcome::Inserted {
        if let Err(err) = directory.project_certificate(&stored, layout) {
            record.errors.push(format!("directory projection failed: {err}"));
        }
    }

    let validation = trust::validate(&stored, catalog, Utc::now());
    record.record_certificate(&stored, validation.validation_status);
}

fn ingest_one_crl(
    der_bytes: &[u8],
    catalog: &dyn CatalogStore,
    directory: &dyn DirectoryStore,
    layout: &DirectoryLayout,
    upload_id: UploadId,
    record: &mut UploadRecord,
) {
    let crl = match Crl::from_der(der_bytes) {
        Ok(crl) => crl,
        Err(err) => {
            record.errors.push(format!("malformed CRL: {err}"));
            return;
        }
    };

    let (stored, outcome) = match catalog.upsert_crl(crl, upload_id) {
        Ok(result) => result,
        Err(err) => {
            record.errors.push(format!("catalog upsert failed: {err}"));
            return;
        }
    };

    if outcome == UpsertOutcome::Inserted {
        if let Err(err) = directory.project_crl(&stored, layout) {
            record.errors.push(format!("directory projection failed: {err}"));
        }
    }
    record.processed_entries += 1;
    record.updated_at = Utc::now();
}

fn conformance_hint(attributes: &HashMap<String, Vec<Vec<u8>>>) -> ClassificationHint {
    let code = attributes
        .get(CONFORMANCE_CODE_ATTR)
        .and_then(|values| values.first())
        .and_then(|bytes| String::from_utf8(bytes.clone()).ok());
    let text = attributes
        .get(CONFORMANCE_TEXT_ATTR)
        .and_then(|values| values.first())
        .and_then(|bytes| String::from_utf8(bytes.clone()).ok());

    match (code, text) {
        (Some(code), Some(text)) => ClassificationHint::LdifConformance { code, text },
        (Some(code), None) => ClassificationHint::LdifConformance { code, text: String::new() },
        _ => ClassificationHint::None,
    }
}

/// Ingests a CMS-signed Master List against `trust_anchor` (spec §8
/// scenario 3): either all bag members are stored, or (on a signature
/// mismatch against the anchor) nothing is, and the upload fails whole.
pub fn ingest_master_list(
    bytes: &[u8],
    trust_anchor: &x509_cert::Certificate,
    catalog: &dyn CatalogStore,
    directory: &dyn DirectoryStore,
    layout: &DirectoryLayout,
    upload_id: UploadId,
    original_file_name: String,
) -> UploadRecord {
    let mut record = UploadRecord::new(upload_id, original_file_name, bytes, UploadFormat::MasterList, ProcessingMode::Auto);
    record.status = UploadStatus::Processing;
    tracing::info!(upload_id = %upload_id, size_bytes = record.size_bytes, "master list upload: pending -> processing");

    let master_list = match crate::parsers::master_list::parse(bytes, trust_anchor, upload_id) {
        Ok(ml) => ml,
        Err(err) => {
            tracing::warn!(upload_id = %upload_id, error = %err, "master list upload: processing -> failed");
            record.fail(err.to_string());
            return record;
        }
    };
    record.total_entries = Some(master_list.certificates.len());

    for cert in &master_list.certificates {
        let (stored, outcome, _duplicate) = match catalog.upsert_certificate(cert.clone(), upload_id) {
            Ok(result) => result,
            Err(err) => {
                record.errors.push(format!("catalog upsert failed: {err}"));
                continue;
            }
        };
        if outcome == UpsertOutcome::Inserted {
            if let Err(err) = directory.project_certificate(&stored, layout) {
                record.errors.push(format!("directory projection failed: {err}"));
            }
        }
        let validation = trust::validate(&stored, catalog, Utc::now());
        record.record_certificate(&stored, validation.validation_status);
    }

    record.complete();
    tracing::info!(upload_id = %upload_id, processed = record.processed_entries, "master list upload: processing -> completed");
    record
}
