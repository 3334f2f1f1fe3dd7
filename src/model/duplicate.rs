//! `DuplicateCertificate`: an event row recorded on each re-ingest of a
//! known fingerprint (spec §3). Never replaces the `Certificate` row.

use chrono::{DateTime, Utc};

use super::{certificate::CertificateType, Fingerprint, UploadId};

#[derive(Clone, Debug)]
pub struct DuplicateCertificate {
    pub fingerprint_sha256: Fingerprint,
    pub observing_upload_id: UploadId,
    pub first_upload_id: UploadId,
    pub certificate_type: CertificateType,
    pub country_code: String,
    pub subject_dn: String,
    pub observed_at: DateTime<Utc>,
}
