//! `Certificate::from_der`: decode, canonicalize, fingerprint, and classify
//! an X.509 certificate (spec §4.2).

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use der::{asn1::ObjectIdentifier as Oid, Encode};

use super::{dn, extensions, Fingerprint, UploadId};

/// `certificate_type`, spec §3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CertificateType {
    Csca,
    Dsc,
    DscNc,
    Mlsc,
    LinkCert,
    DvlSigner,
}

/// `source_type`, spec §3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SourceType {
    FileUpload,
    MlParsed,
    LdifParsed,
    DvlParsed,
    ApiRegistered,
    SystemGenerated,
}

/// Evidence external to the DER bytes themselves that the classification
/// algorithm (spec §4.2) combines with the self-signed/`is_ca` check: where
/// a certificate was discovered, and what the storing LDIF entry said about
/// it.
///
/// Open Question (resolved, see DESIGN.md): the source's heuristic for
/// Link-certificate classification — "CA, not self-signed, found inside a
/// Master List" — has no defined OID policy. We implement exactly that
/// heuristic and nothing stronger, matching spec §4.2/§9's "treat as
/// provisional" guidance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ClassificationHint {
    #[default]
    None,
    /// Discovered as the signer of a Master List CMS envelope.
    MasterListSigner,
    /// Discovered as a non-signer member of a Master List certificate bag.
    MasterListMember,
    /// The storing LDIF entry carried `pkdConformance*` attributes.
    LdifConformance { code: String, text: String },
}

/// Context supplied by the caller (a parser or the store) that the
/// classification and country-code fallback chain need but that isn't
/// recoverable from the DER bytes alone.
#[derive(Clone, Debug, Default)]
pub struct IngestContext {
    pub source_type: SourceType,
    /// The `c=` component of the storing directory entry's DN, used as the
    /// last fallback in the country-code chain (spec §4.2 step 3).
    pub storing_dn: Option<String>,
    pub classification_hint: ClassificationHint,
    pub first_upload_id: Option<UploadId>,
}

impl Default for SourceType {
    fn default() -> Self {
        Self::SystemGenerated
    }
}

/// The canonical certificate record, spec §3.
#[derive(Clone, Debug)]
pub struct Certificate {
    pub fingerprint_sha256: Fingerprint,
    pub serial_number_hex: String,
    pub subject_dn: String,
    pub issuer_dn: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub certificate_type: CertificateType,
    pub country_code: String,
    pub der: Vec<u8>,

    pub version: u8,
    pub signature_algorithm: Oid,
    pub public_key_algorithm: Oid,
    pub public_key_bits: Option<usize>,
    pub subject_key_identifier: Option<Vec<u8>>,
    pub authority_key_identifier: Option<Vec<u8>>,
    pub key_usage_bits: Option<u16>,
    pub extended_key_usage: Vec<Oid>,
    pub is_ca: bool,
    pub path_len_constraint: Option<u32>,
    pub crl_distribution_points: Vec<String>,
    pub is_self_signed: bool,

    pub source_type: SourceType,
    pub first_upload_id: Option<UploadId>,
    pub last_seen_upload_id: Option<UploadId>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub duplicate_count: u32,

    pub pkd_conformance_code: Option<String>,
    pub pkd_conformance_text: Option<String>,
}

const UNKNOWN_COUNTRY: &str = "ZZ";

impl Certificate {
    /// Decodes `der_bytes` and builds the canonical record, applying the
    /// classification and country-code algorithms of spec §4.2.
    pub fn from_der(der_bytes: &[u8], ctx: IngestContext) -> Result<Self> {
        let cert = crate::crypto::x509::decode_certificate(der_bytes)
            .map_err(|e| anyhow!("{e}"))?;
        let tbs = &cert.tbs_certificate;

        let subject_raw = tbs.subject.to_string();
        let issuer_raw = tbs.issuer.to_string();
        let subject_dn = dn::canonicalize(&subject_raw);
        let issuer_dn = dn::canonicalize(&issuer_raw);
        let is_self_signed = dn::dn_equal(&subject_raw, &issuer_raw);

        let ext = extensions::extract(&cert);

        let country_code = dn::country_code_rdn(&subject_raw)
            .or_else(|| dn::country_code_rdn(&issuer_raw))
            .or_else(|| {
                ctx.storing_dn
                    .as_deref()
                    .and_then(dn::country_code_rdn)
            })
            .filter(|code| code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase()))
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());

        let (certificate_type, pkd_conformance_code, pkd_conformance_text) =
            classify(is_self_signed, ext.is_ca, &ctx.classification_hint);

        let public_key_bits = public_key_bit_len(&cert);

        Ok(Self {
            fingerprint_sha256: Fingerprint::of(der_bytes),
            serial_number_hex: hex::encode(tbs.serial_number.as_bytes()),
            subject_dn,
            issuer_dn,
            not_before: time_to_chrono(&tbs.validity.not_before)?,
            not_after: time_to_chrono(&tbs.validity.not_after)?,
            certificate_type,
            country_code,
            der: der_bytes.to_vec(),

            version: version_number(tbs.version),
            signature_algorithm: cert.signature_algorithm.oid,
            public_key_algorithm: tbs.subject_public_key_info.algorithm.oid,
            public_key_bits,
            subject_key_identifier: ext.subject_key_identifier,
            authority_key_identifier: ext.authority_key_identifier,
            key_usage_bits: ext.key_usage_bits,
            extended_key_usage: ext.extended_key_usage,
            is_ca: ext.is_ca,
            path_len_constraint: ext.path_len_constraint,
            crl_distribution_points: ext.crl_distribution_points,
            is_self_signed,

            source_type: ctx.source_type,
            first_upload_id: ctx.first_upload_id,
            last_seen_upload_id: ctx.first_upload_id,
            last_seen_at: None,
            duplicate_count: 0,

            pkd_conformance_code,
            pkd_conformance_text,
        })
    }

    /// I2: a CSCA is self-signed and a CA.
    pub fn is_valid_csca_shape(&self) -> bool {
        self.certificate_type != CertificateType::Csca || (self.is_self_signed && self.is_ca)
    }

    /// I3: `not_before <= not_after`.
    pub fn has_valid_period(&self) -> bool {
        self.not_before <= self.not_after
    }

    pub fn is_expired_at(&self, reference_time: DateTime<Utc>) -> bool {
        reference_time > self.not_after
    }
}

/// Classification algorithm of spec §4.2, combining self-signed/`is_ca`
/// evidence from the DER with the external [`ClassificationHint`].
fn classify(
    is_self_signed: bool,
    is_ca: bool,
    hint: &ClassificationHint,
) -> (CertificateType, Option<String>, Option<String>) {
    if is_self_signed && is_ca {
        return (CertificateType::Csca, None, None);
    }
    match hint {
        ClassificationHint::MasterListSigner => (CertificateType::Mlsc, None, None),
        ClassificationHint::MasterListMember if is_ca && !is_self_signed => {
            (CertificateType::LinkCert, None, None)
        }
        ClassificationHint::LdifConformance { code, text } => (
            CertificateType::DscNc,
            Some(code.clone()),
            Some(text.clone()),
        ),
        _ => (CertificateType::Dsc, None, None),
    }
}

fn version_number(version: x509_cert::Version) -> u8 {
    match version {
        x509_cert::Version::V1 => 1,
        x509_cert::Version::V2 => 2,
        x509_cert::Version::V3 => 3,
    }
}

fn time_to_chrono(time: &x509_cert::time::Time) -> Result<DateTime<Utc>> {
    let unix = time.to_unix_duration();
    Utc.timestamp_opt(unix.as_secs() as i64, unix.subsec_nanos())
        .single()
        .ok_or_else(|| anyhow!("certificate timestamp out of range"))
}

fn public_key_bit_len(cert: &x509_cert::Certificate) -> Option<usize> {
    use crate::asn1::public_key_info::SubjectPublicKeyInfo as Spki;
    let spki = Spki::try_from(&cert.tbs_certificate.subject_public_key_info).ok()?;
    Some(match spki {
        Spki::Rsa(rsa) => bit_len_of_unsigned(rsa.modulus.as_bytes()),
        // SEC1 uncompressed point: 0x04 || X || Y, X and Y each the curve's
        // field width.
        Spki::Ec(ec) => ec.point.len().saturating_sub(1) / 2 * 8,
        Spki::Unknown { public_key, .. } => public_key.len() * 8,
    })
}

/// Bit length of a big-endian unsigned integer, tolerating the leading
/// `0x00` DER sometimes carries to keep the high bit from reading as a sign.
fn bit_len_of_unsigned(bytes: &[u8]) -> usize {
    let bytes = match bytes {
        [0x00, rest @ ..] if !rest.is_empty() => rest,
        other => other,
    };
    match bytes.first() {
        Some(&first) => (bytes.len() - 1) * 8 + (8 - first.leading_zeros() as usize),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_self_signed_ca_as_csca() {
        let (ty, _, _) = classify(true, true, &ClassificationHint::None);
        assert_eq!(ty, CertificateType::Csca);
    }

    #[test]
    fn classifies_master_list_signer_as_mlsc() {
        let (ty, _, _) = classify(false, false, &ClassificationHint::MasterListSigner);
        assert_eq!(ty, CertificateType::Mlsc);
    }

    #[test]
    fn classifies_non_self_signed_ca_in_master_list_as_link_cert() {
        let (ty, _, _) = classify(false, true, &ClassificationHint::MasterListMember);
        assert_eq!(ty, CertificateType::LinkCert);
    }

    #[test]
    fn classifies_conformance_flagged_entry_as_dsc_nc() {
        let (ty, code, text) = classify(
            false,
            false,
            &ClassificationHint::LdifConformance {
                code: "1".to_string(),
                text: "missing extension".to_string(),
            },
        );
        assert_eq!(ty, CertificateType::DscNc);
        assert_eq!(code.as_deref(), Some("1"));
        assert_eq!(text.as_deref(), Some("missing extension"));
    }

    #[test]
    fn classifies_plain_non_ca_as_dsc() {
        let (ty, _, _) = classify(false, false, &ClassificationHint::None);
        assert_eq!(ty, CertificateType::Dsc);
    }
}
