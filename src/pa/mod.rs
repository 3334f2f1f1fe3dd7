//! Passive Authentication (C6, spec §4.6): verify a Document Security
//! Object against its issuing DSC, recompute Data Group hashes, and run the
//! DSC through the validation engine (C5).

use std::{collections::HashMap, time::Instant};

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use cms::{content_info::ContentInfo, signed_data::SignedData};
use der::{asn1::OctetString, Decode};
use x509_cert::Certificate as X509Certificate;

use crate::{
    asn1::emrtd::{EfSod, LdsSecurityObject},
    crypto::{
        cms as cms_verify,
        digest::DigestAlgorithm,
        x509 as x509_crypto,
    },
    model::{
        certificate::{ClassificationHint, IngestContext, SourceType},
        dn, Certificate, Fingerprint,
    },
    store::CatalogStore,
    trust::{self, CrlStatus, ValidationStatus},
};

const SIGNING_TIME_OID: der::asn1::ObjectIdentifier = der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");

/// Input to a single Passive Authentication run, spec §4.6.
#[derive(Clone, Debug)]
pub struct PaRequest {
    pub issuing_country: String,
    pub sod_bytes: Vec<u8>,
    pub data_groups: HashMap<u8, Vec<u8>>,
    pub document_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub date_of_expiry: Option<String>,
}

/// One Data Group's expected-vs-actual hash comparison, spec §3.
#[derive(Clone, Debug)]
pub struct DgObservation {
    pub dg_number: u8,
    pub expected_hash: Vec<u8>,
    pub actual_hash: Option<Vec<u8>>,
    pub hash_valid: bool,
}

/// `verification_status`, spec §3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VerificationStatus {
    Pending,
    Valid,
    Invalid,
    Error,
}

/// The full Passive Authentication result, spec §3.
#[derive(Clone, Debug)]
pub struct PaVerification {
    pub issuing_country: String,
    pub document_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub date_of_expiry: Option<String>,
    pub sod_digest: Fingerprint,
    pub sod_bytes: Vec<u8>,
    pub dsc_subject_dn: Option<String>,
    pub dsc_fingerprint: Option<Fingerprint>,
    pub csca_subject_dn: Option<String>,
    pub trust_chain_valid: bool,
    pub sod_signature_valid: bool,
    pub dg_hashes_valid: bool,
    pub crl_status: CrlStatus,
    pub verification_status: VerificationStatus,
    pub data_groups: Vec<DgObservation>,
    pub processing_time_ms: u64,
    pub error_message: Option<String>,
}

/// Runs the eight steps of spec §4.6 against `request`, consulting
/// `catalog` for chain-building and revocation and, when the SOD's
/// certificate bag is empty, for the DSC itself.
pub fn verify(request: PaRequest, catalog: &dyn CatalogStore) -> PaVerification {
    let started = Instant::now();
    let sod_digest = Fingerprint::of(&request.sod_bytes);
    let result = match verify_inner(&request, catalog) {
        Ok(mut result) => {
            result.processing_time_ms = started.elapsed().as_millis() as u64;
            result
        }
        Err(err) => error_result(&request, started, err.to_string()),
    };
    tracing::info!(
        sod_digest = %sod_digest,
        issuing_country = %request.issuing_country,
        status = ?result.verification_status,
        processing_time_ms = result.processing_time_ms,
        "passive authentication verification complete"
    );
    result
}

fn verify_inner(request: &PaRequest, catalog: &dyn CatalogStore) -> Result<PaVerification> {
    let sod_digest = Fingerprint::of(&request.sod_bytes);

    // Step 1/2: unwrap the optional outer 0x77 tag and parse the CMS envelope.
    let signed_data = decode_signed_data(&request.sod_bytes)?;
    cms_verify::check_signed_data_profile(&signed_data).map_err(|e| anyhow!("{e}"))?;

    // Step 3: identify the DSC by the signer's (issuerDn, serial).
    let bag = cms_verify::embedded_certificates(&signed_data).unwrap_or_default();
    let signer_info = signed_data
        .signer_infos
        .0
        .as_slice()
        .first()
        .ok_or_else(|| anyhow!("SOD SignedData has no SignerInfo"))?;

    let dsc_x509 = find_dsc(&bag, signer_info, catalog)?;
    let dsc_der = der::Encode::to_der(&dsc_x509)?;
    let dsc = Certificate::from_der(
        &dsc_der,
        IngestContext {
            source_type: SourceType::SystemGenerated,
            storing_dn: None,
            classification_hint: ClassificationHint::None,
            first_upload_id: None,
        },
    )?;

    // Step 4: CMS signature verify against the DSC, no chain validation here.
    let sod_signature_valid = cms_verify::verify_signed_data(&signed_data, &dsc_x509).is_ok();

    // Step 5: decode the LDSSecurityObject payload.
    let lds = decode_lds(&signed_data)?;
    let digest_algorithm = DigestAlgorithm::from_oid(&lds.hash_algorithm.oid)
        .ok_or_else(|| anyhow!("unsupported LDS hash algorithm {}", lds.hash_algorithm.oid))?;

    // Step 6: recompute and compare every advertised DG hash.
    let mut data_groups = Vec::new();
    let mut dg_hashes_valid = true;
    for entry in &lds.data_group_hash_values {
        let dg_number = entry.data_group_number as u8;
        let expected_hash = entry.hash_value.as_bytes().to_vec();
        let actual_hash = request.data_groups.get(&dg_number).map(|bytes| digest_algorithm.digest(bytes));
        let hash_valid = actual_hash.as_deref() == Some(expected_hash.as_slice());
        if !hash_valid {
            dg_hashes_valid = false;
        }
        data_groups.push(DgObservation { dg_number, expected_hash, actual_hash, hash_valid });
    }

    // Step 7: chain + revocation, at the SOD's signing time (falling back to
    // the DSC's own not_before).
    let reference_time = signing_time(signer_info)?.unwrap_or(dsc.not_before);
    let validation = trust::validate(&dsc, catalog, reference_time);

    // Step 8: assemble.
    let verification_status = if !sod_signature_valid || !dg_hashes_valid {
        VerificationStatus::Invalid
    } else {
        match validation.validation_status {
            ValidationStatus::Valid | ValidationStatus::Warning => VerificationStatus::Valid,
            ValidationStatus::Invalid => VerificationStatus::Invalid,
            ValidationStatus::Error | ValidationStatus::Pending => VerificationStatus::Error,
        }
    };

    // Re-derive the precise per-edge CRL status (spec §3's full enum) for
    // the DSC against its immediate issuer; `validation` only exposes the
    // checked/revoked booleans rolled up across the whole chain.
    let crl_status = trust::build_chain(&dsc, catalog, reference_time)
        .ok()
        .and_then(|chain| chain.get(1).cloned())
        .map(|issuer| trust::revocation::check(&dsc, &issuer, catalog, reference_time))
        .unwrap_or(CrlStatus::NotChecked);

    Ok(PaVerification {
        issuing_country: request.issuing_country.clone(),
        document_number: request.document_number.clone(),
        date_of_birth: request.date_of_birth.clone(),
        date_of_expiry: request.date_of_expiry.clone(),
        sod_digest,
        sod_bytes: request.sod_bytes.clone(),
        dsc_subject_dn: Some(dsc.subject_dn.clone()),
        dsc_fingerprint: Some(dsc.fingerprint_sha256),
        csca_subject_dn: validation.csca_subject_dn.clone(),
        trust_chain_valid: validation.trust_chain_valid,
        sod_signature_valid,
        dg_hashes_valid,
        crl_status,
        verification_status,
        data_groups,
        processing_time_ms: 0,
        error_message: None,
    })
}

fn error_result(request: &PaRequest, started: Instant, message: String) -> PaVerification {
    PaVerification {
        issuing_country: request.issuing_country.clone(),
        document_number: request.document_number.clone(),
        date_of_birth: request.date_of_birth.clone(),
        date_of_expiry: request.date_of_expiry.clone(),
        sod_digest: Fingerprint::of(&request.sod_bytes),
        sod_bytes: request.sod_bytes.clone(),
        dsc_subject_dn: None,
        dsc_fingerprint: None,
        csca_subject_dn: None,
        trust_chain_valid: false,
        sod_signature_valid: false,
        dg_hashes_valid: false,
        crl_status: CrlStatus::NotChecked,
        verification_status: VerificationStatus::Error,
        data_groups: Vec::new(),
        processing_time_ms: started.elapsed().as_millis() as u64,
        error_message: Some(message),
    }
}

/// Decodes the CMS `SignedData`, stripping the `[APPLICATION 23]` wrapper
/// only when present (spec §4.6 step 1).
fn decode_signed_data(bytes: &[u8]) -> Result<SignedData> {
    if bytes.first() == Some(&0x77) {
        EfSod::from_der(bytes)?.signed_data()
    } else {
        Ok(ContentInfo::from_der(bytes)?.content.decode_as::<SignedData>()?)
    }
}

fn decode_lds(signed_data: &SignedData) -> Result<LdsSecurityObject> {
    let econ = &signed_data.encap_content_info;
    let octet_string = econ
        .econtent
        .as_ref()
        .ok_or_else(|| anyhow!("SOD encapsulated content is absent"))?
        .decode_as::<OctetString>()?;
    Ok(LdsSecurityObject::from_der(octet_string.as_bytes())?)
}

/// Finds the DSC: first in the SOD's own certificate bag, matching the
/// signer's `(issuerDn, serial)`; failing that, by the same identity in the
/// catalog (spec §4.6 step 3).
fn find_dsc(
    bag: &[X509Certificate],
    signer_info: &cms::signed_data::SignerInfo,
    catalog: &dyn CatalogStore,
) -> Result<X509Certificate> {
    use cms::signed_data::SignerIdentifier;

    let SignerIdentifier::IssuerAndSerialNumber(iasn) = &signer_info.sid else {
        return Err(anyhow!("SOD SignerInfo does not use issuerAndSerialNumber"));
    };

    if let Some(cert) = bag.iter().find(|cert| {
        dn::dn_equal(&cert.tbs_certificate.issuer.to_string(), &iasn.issuer.to_string())
            && cert.tbs_certificate.serial_number == iasn.serial_number
    }) {
        return Ok(cert.clone());
    }

    let issuer_dn = dn::canonicalize(&iasn.issuer.to_string());
    let serial_hex = hex::encode(iasn.serial_number.as_bytes());
    let stored = catalog
        .find_by_issuer_and_serial(&issuer_dn, &serial_hex)
        .ok_or_else(|| anyhow!("NoDscInSod: no DSC in bag or store matching signer identity"))?;
    Ok(x509_crypto::decode_certificate(&stored.der)?)
}

fn signing_time(signer_info: &cms::signed_data::SignerInfo) -> Result<Option<DateTime<Utc>>> {
    let Some(attrs) = &signer_info.signed_attrs else {
        return Ok(None);
    };
    let Some(attr) = attrs.iter().find(|attr| attr.oid == SIGNING_TIME_OID) else {
        return Ok(None);
    };
    let Some(value) = attr.values.get(0) else {
        return Ok(None);
    };
    let time = value.decode_as::<x509_cert::time::Time>()?;
    let unix = time.to_unix_duration();
    Ok(Utc.timestamp_opt(unix.as_secs() as i64, unix.subsec_nanos()).single())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_application_tag_only_when_present() {
        assert!(decode_signed_data(&[0x30, 0x00]).is_err());
        assert!(decode_signed_data(&[0x77, 0x00]).is_err());
    }
}
