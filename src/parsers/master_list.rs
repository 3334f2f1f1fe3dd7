//! Master List parser (spec §4.3), wrapping `crypto::cms`/`crypto::x509`:
//! verifies the CMS signature against a configured trust anchor, locates
//! the MLSC by matching `SignerInfo`'s `(issuer, serial)` against the
//! certificate bag, and classifies every other bag member.

use anyhow::{anyhow, Result};
use cms::signed_data::SignerIdentifier;
use x509_cert::Certificate as X509Certificate;

use crate::{
    asn1::master_list::MasterList as RawMasterList,
    crypto::cms as cms_verify,
    model::{
        certificate::{ClassificationHint, IngestContext, SourceType},
        dn, Certificate, MasterList,
    },
};

/// Verifies `der_bytes` as a CSCA Master List against `trust_anchor` and
/// returns the canonical [`MasterList`] record: the MLSC plus every
/// embedded CSCA/Link certificate, classified.
///
/// Per spec §4.3/§3, the embedded CSCAs are not trusted from the CMS
/// structure alone — the signature must verify against `trust_anchor`
/// before any of its certificates are returned.
pub fn parse(
    der_bytes: &[u8],
    trust_anchor: &X509Certificate,
    first_upload_id: crate::model::UploadId,
) -> Result<MasterList> {
    let raw = RawMasterList::from_der(der_bytes)?;
    let signed_data = raw.signed_data()?;
    cms_verify::check_signed_data_profile(&signed_data).map_err(|e| anyhow!("{e}"))?;
    cms_verify::verify_signed_data(&signed_data, trust_anchor).map_err(|e| anyhow!("{e}"))?;

    let bag = cms_verify::embedded_certificates(&signed_data)?;
    let signer_info = signed_data
        .signer_infos
        .0
        .as_slice()
        .first()
        .ok_or_else(|| anyhow!("Master List SignedData has no SignerInfo"))?;
    let signer_index = find_signer_index(signer_info, &bag)
        .ok_or_else(|| anyhow!("Master List signer certificate not found in certificate bag"))?;

    let mut certificates = Vec::with_capacity(bag.len());
    for (index, cert) in bag.iter().enumerate() {
        let der = cert.to_der_bytes()?;
        let hint = if index == signer_index {
            ClassificationHint::MasterListSigner
        } else {
            ClassificationHint::MasterListMember
        };
        let ctx = IngestContext {
            source_type: SourceType::MlParsed,
            storing_dn: None,
            classification_hint: hint,
            first_upload_id: Some(first_upload_id),
        };
        certificates.push(Certificate::from_der(&der, ctx)?);
    }

    let signer_dn = dn::canonicalize(&bag[signer_index].tbs_certificate.subject.to_string());
    Ok(MasterList {
        signer_dn,
        der: der_bytes.to_vec(),
        certificates,
    })
}

fn find_signer_index(
    signer_info: &cms::signed_data::SignerInfo,
    bag: &[X509Certificate],
) -> Option<usize> {
    match &signer_info.sid {
        SignerIdentifier::IssuerAndSerialNumber(iasn) => bag.iter().position(|cert| {
            dn::dn_equal(&cert.tbs_certificate.issuer.to_string(), &iasn.issuer.to_string())
                && cert.tbs_certificate.serial_number == iasn.serial_number
        }),
        // ICAO 9303-12 §9 Master Lists identify their signer by
        // issuerAndSerialNumber; the subjectKeyIdentifier form isn't used
        // in practice for this profile.
        SignerIdentifier::SubjectKeyIdentifier(_) => None,
    }
}

/// Small helper: `x509_cert::Certificate` doesn't expose its own DER bytes
/// once decoded, so re-encode it (the bag was decoded from DER in the
/// first place, so this is lossless).
trait ToDerBytes {
    fn to_der_bytes(&self) -> Result<Vec<u8>>;
}

impl ToDerBytes for X509Certificate {
    fn to_der_bytes(&self) -> Result<Vec<u8>> {
        use der::Encode;
        Ok(self.to_der()?)
    }
}
