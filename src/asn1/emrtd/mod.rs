//! EF.SOD (Document Security Object) and the LDS Security Object it carries.
//!
//! ICAO 9303-10 4.6.2.3. Chip-side structures (EF.CardAccess, EF.DG14, Chip
//! Authentication, PACE) are out of scope for a relying-party trust mirror
//! and are not implemented here.

use {
    anyhow::{bail, ensure, Result},
    cms::{
        content_info::ContentInfo,
        signed_data::{EncapsulatedContentInfo, SignedData, SignerInfo},
    },
    der::{
        asn1::{ObjectIdentifier as Oid, OctetString, PrintableString},
        Decode, Sequence,
    },
    x509_cert::spki::AlgorithmIdentifierOwned,
};

const LDS_SECURITY_OBJECT_CONTENT_TYPE: Oid = Oid::new_unwrap("2.23.136.1.1.1");

/// ICAO 9303-10 4.6.2.3.
#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct LdsSecurityObject {
    pub version: u64,
    pub hash_algorithm: AlgorithmIdentifierOwned,
    pub data_group_hash_values: Vec<DataGroupHash>,
    pub lds_version_info: Option<LdsVersionInfo>,
}

/// ICAO 9303-10 4.6.2.3.
#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct LdsVersionInfo {
    pub lds_version: PrintableString,
    pub unicode_version: PrintableString,
}

/// ICAO 9303-10 4.6.2.3.
#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct DataGroupHash {
    pub data_group_number: u64,
    pub hash_value: OctetString,
}

impl LdsSecurityObject {
    pub fn hash_for_dg(&self, dg_number: u64) -> Option<&[u8]> {
        self.data_group_hash_values
            .iter()
            .find(|entry| entry.data_group_number == dg_number)
            .map(|entry| entry.hash_value.as_bytes())
    }
}

/// EF.SOD, a CMS `SignedData` wrapped in an ICAO `[APPLICATION 23]`
/// constructed tag (encoded as the single byte `0x77`, since tag number 23
/// fits in the low tag form).
///
/// ICAO 9303-10 4.7.14.
#[derive(Clone, Debug)]
pub struct EfSod {
    content_info: ContentInfo,
}

impl EfSod {
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let inner = strip_application_wrapper(bytes, 23)?;
        Ok(Self {
            content_info: ContentInfo::from_der(inner)?,
        })
    }

    pub fn signed_data(&self) -> Result<SignedData> {
        Ok(self.content_info.content.decode_as::<SignedData>()?)
    }

    pub fn signer_info(&self) -> Result<SignerInfo> {
        let sd = self.signed_data()?;
        sd.signer_infos
            .0
            .as_slice()
            .first()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("SignedData has no SignerInfo"))
    }

    pub fn encapsulated_content(&self) -> Result<EncapsulatedContentInfo> {
        Ok(self.signed_data()?.encap_content_info)
    }

    pub fn lds_security_object(&self) -> Result<LdsSecurityObject> {
        let econ = self.encapsulated_content()?;
        ensure!(
            econ.econtent_type == LDS_SECURITY_OBJECT_CONTENT_TYPE,
            "EF.SOD encapsulated content is not an LDSSecurityObject (oid {})",
            econ.econtent_type
        );
        let octet_string = econ
            .econtent
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("EF.SOD encapsulated content is absent"))?
            .decode_as::<OctetString>()?;
        Ok(LdsSecurityObject::from_der(octet_string.as_bytes())?)
    }
}

/// Strips an ICAO `[APPLICATION N]` constructed wrapper, used for on-card EF
/// files, returning the bytes of the enclosed value.
fn strip_application_wrapper(bytes: &[u8], number: u8) -> Result<&[u8]> {
    ensure!(number < 31, "application tag numbers >= 31 need multi-byte encoding");
    let expected_tag = 0x40 | 0x20 | number;
    let actual_tag = *bytes.first().ok_or_else(|| anyhow::anyhow!("empty input"))?;
    ensure!(
        actual_tag == expected_tag,
        "unexpected outer tag 0x{actual_tag:02x}, expected 0x{expected_tag:02x} (APPLICATION {number})"
    );
    let (len, header_len) = parse_der_length(&bytes[1..])?;
    let start = 1 + header_len;
    let end = start
        .checked_add(len)
        .ok_or_else(|| anyhow::anyhow!("length overflow"))?;
    ensure!(bytes.len() >= end, "truncated application-tagged value");
    Ok(&bytes[start..end])
}

fn parse_der_length(bytes: &[u8]) -> Result<(usize, usize)> {
    let first = *bytes.first().ok_or_else(|| anyhow::anyhow!("missing length octet"))?;
    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }
    let octets = (first & 0x7f) as usize;
    ensure!(
        octets > 0 && octets <= 8,
        "unsupported DER length encoding ({octets} octets)"
    );
    ensure!(bytes.len() > octets, "truncated length octets");
    let mut len = 0usize;
    for &b in &bytes[1..=octets] {
        len = (len << 8) | b as usize;
    }
    Ok((len, 1 + octets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_application_wrapper() {
        let bytes = hex_literal::hex!("3003020101");
        assert!(strip_application_wrapper(&bytes, 23).is_err());
    }

    #[test]
    fn strips_short_form_length() {
        let mut bytes = vec![0x77, 0x03];
        bytes.extend_from_slice(&[0xaa, 0xbb, 0xcc]);
        let inner = strip_application_wrapper(&bytes, 23).unwrap();
        assert_eq!(inner, &[0xaa, 0xbb, 0xcc]);
    }

    #[test]
    fn strips_long_form_length() {
        let payload = vec![0x42; 200];
        let mut bytes = vec![0x77, 0x81, 200u8];
        bytes.extend_from_slice(&payload);
        let inner = strip_application_wrapper(&bytes, 23).unwrap();
        assert_eq!(inner, payload.as_slice());
    }
}
