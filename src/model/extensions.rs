//! Decoding of the X.509v3 extensions the store and validation engine care
//! about (RFC 5280 §4.2): basic constraints, key usage, subject/authority
//! key identifiers, and CRL distribution points.
//!
//! `x509_cert::Certificate` leaves `extnValue` as an opaque `OCTET STRING`
//! per-extension; each of these is decoded the way `asn1::public_key_info`
//! decodes algorithm-specific key material — a small hand-rolled `Sequence`
//! per extension, found by OID in the certificate's extension list.

use anyhow::Result;
use der::{
    asn1::{BitStringRef, ObjectIdentifier as Oid, OctetStringRef},
    Decode, Sequence,
};
use x509_cert::{ext::Extensions, Certificate};

pub const ID_CE_SUBJECT_KEY_IDENTIFIER: Oid = Oid::new_unwrap("2.5.29.14");
pub const ID_CE_KEY_USAGE: Oid = Oid::new_unwrap("2.5.29.15");
pub const ID_CE_CRL_DISTRIBUTION_POINTS: Oid = Oid::new_unwrap("2.5.29.31");
pub const ID_CE_BASIC_CONSTRAINTS: Oid = Oid::new_unwrap("2.5.29.19");
pub const ID_CE_EXT_KEY_USAGE: Oid = Oid::new_unwrap("2.5.29.37");
pub const ID_CE_AUTHORITY_KEY_IDENTIFIER: Oid = Oid::new_unwrap("2.5.29.35");

/// RFC 5280 §4.2.1.9.
#[derive(Clone, Debug, Default, Sequence)]
struct BasicConstraints {
    #[asn1(default = "default_false")]
    ca: bool,
    #[asn1(optional = "true")]
    path_len_constraint: Option<u32>,
}

fn default_false() -> bool {
    false
}

/// RFC 5280 §4.2.1.1. Only the `keyIdentifier` [0] field is extracted; the
/// `authorityCertIssuer`/`authorityCertSerialNumber` alternative form (used
/// by a handful of cross-signed CAs) is not needed for AKI-based chain
/// matching.
#[derive(Clone, Debug, Sequence)]
struct AuthorityKeyIdentifier<'a> {
    #[asn1(context_specific = "0", optional = "true")]
    key_identifier: Option<OctetStringRef<'a>>,
}

/// RFC 5280 §4.2.1.13, simplified to the `fullName`/`uniformResourceIdentifier`
/// form actually used by ICAO 9303 CRLDPs; other `DistributionPointName`
/// variants are skipped rather than failing the whole extension.
fn parse_crl_distribution_points(bytes: &[u8]) -> Result<Vec<String>> {
    #[derive(Clone, Debug, Sequence)]
    struct DistributionPoint {
        #[asn1(context_specific = "0", optional = "true")]
        distribution_point: Option<der::Any>,
        #[asn1(context_specific = "1", optional = "true")]
        reasons: Option<der::asn1::BitStringOwned>,
        #[asn1(context_specific = "2", optional = "true")]
        crl_issuer: Option<der::Any>,
    }

    let points = der::asn1::SequenceOf::<DistributionPoint, 32>::from_der(bytes)?;
    let mut uris = Vec::new();
    for point in points.iter() {
        let Some(name) = &point.distribution_point else {
            continue;
        };
        // fullName [0] GeneralNames is EXPLICIT (GeneralNames is a CHOICE),
        // so `name` is itself a context [0] wrapper around a SEQUENCE OF
        // GeneralName; decode that inner SEQUENCE and pick out any
        // uniformResourceIdentifier [6] IA5String alternatives.
        if let Ok(general_names) = name.decode_as::<der::asn1::SequenceOf<der::Any, 16>>() {
            for general_name in general_names.iter() {
                if let Ok(uri) = general_name.decode_as::<der::asn1::Ia5StringRef>() {
                    uris.push(uri.as_str().to_string());
                }
            }
        }
    }
    Ok(uris)
}

/// Extension-derived metadata pulled out of a decoded certificate.
#[derive(Clone, Debug, Default)]
pub struct ExtensionData {
    pub subject_key_identifier: Option<Vec<u8>>,
    pub authority_key_identifier: Option<Vec<u8>>,
    pub key_usage_bits: Option<u16>,
    pub extended_key_usage: Vec<Oid>,
    pub is_ca: bool,
    pub path_len_constraint: Option<u32>,
    pub crl_distribution_points: Vec<String>,
}

pub fn extract(cert: &Certificate) -> ExtensionData {
    let mut data = ExtensionData::default();
    let Some(extensions) = &cert.tbs_certificate.extensions else {
        return data;
    };
    for ext in extensions_iter(extensions) {
        let value = ext.extn_value.as_bytes();
        match ext.extn_id {
            ID_CE_SUBJECT_KEY_IDENTIFIER => {
                if let Ok(ski) = OctetStringRef::from_der(value) {
                    data.subject_key_identifier = Some(ski.as_bytes().to_vec());
                }
            }
            ID_CE_AUTHORITY_KEY_IDENTIFIER => {
                if let Ok(aki) = AuthorityKeyIdentifier::from_der(value) {
                    data.authority_key_identifier =
                        aki.key_identifier.map(|id| id.as_bytes().to_vec());
                }
            }
            ID_CE_KEY_USAGE => {
                if let Ok(bits) = BitStringRef::from_der(value) {
                    data.key_usage_bits = Some(key_usage_to_u16(&bits));
                }
            }
            ID_CE_BASIC_CONSTRAINTS => {
                if let Ok(bc) = BasicConstraints::from_der(value) {
                    data.is_ca = bc.ca;
                    data.path_len_constraint = bc.path_len_constraint;
                }
            }
            ID_CE_EXT_KEY_USAGE => {
                if let Ok(oids) = der::asn1::SequenceOf::<Oid, 32>::from_der(value) {
                    data.extended_key_usage = oids.iter().copied().collect();
                }
            }
            ID_CE_CRL_DISTRIBUTION_POINTS => {
                if let Ok(uris) = parse_crl_distribution_points(value) {
                    data.crl_distribution_points = uris;
                }
            }
            _ => {}
        }
    }
    data
}

fn extensions_iter(extensions: &Extensions) -> impl Iterator<Item = &x509_cert::ext::Extension> {
    extensions.iter()
}

fn key_usage_to_u16(bits: &BitStringRef<'_>) -> u16 {
    let mut value: u16 = 0;
    for (byte_idx, byte) in bits.raw_bytes().iter().enumerate().take(2) {
        for bit_idx in 0..8u16 {
            if byte & (0x80 >> bit_idx) != 0 {
                value |= 1 << (byte_idx as u16 * 8 + bit_idx);
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_constraints_default_to_not_ca() {
        // An empty SEQUENCE (no bytes follow the header) decodes both
        // optional/default fields to their defaults.
        let empty_sequence = hex_literal::hex!("3000");
        let bc = BasicConstraints::from_der(&empty_sequence).unwrap();
        assert!(!bc.ca);
        assert_eq!(bc.path_len_constraint, None);
    }
}
