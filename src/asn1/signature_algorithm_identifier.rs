//! Signature algorithm identifiers as they appear in a certificate or a CMS
//! `SignerInfo`.
//!
//! Parsed per-variant because the shape of the parameters depends on the
//! algorithm: RSASSA-PSS (RFC 4055 §3.1) carries an explicit parameter
//! sequence, while PKCS#1 v1.5 and ECDSA signature OIDs carry none.

use {
    super::AnyAlgorithmIdentifier,
    crate::crypto::digest::DigestAlgorithm,
    anyhow::{anyhow, Result},
    der::{asn1::Int, Decode, Sequence},
    x509_cert::spki::AlgorithmIdentifierOwned,
};

pub use der::asn1::ObjectIdentifier as Oid;

pub const ID_SHA1_WITH_RSA_ENCRYPTION: Oid = Oid::new_unwrap("1.2.840.113549.1.1.5");
pub const ID_SHA224_WITH_RSA_ENCRYPTION: Oid = Oid::new_unwrap("1.2.840.113549.1.1.14");
pub const ID_SHA256_WITH_RSA_ENCRYPTION: Oid = Oid::new_unwrap("1.2.840.113549.1.1.11");
pub const ID_SHA384_WITH_RSA_ENCRYPTION: Oid = Oid::new_unwrap("1.2.840.113549.1.1.12");
pub const ID_SHA512_WITH_RSA_ENCRYPTION: Oid = Oid::new_unwrap("1.2.840.113549.1.1.13");
pub const ID_RSASSA_PSS: Oid = Oid::new_unwrap("1.2.840.113549.1.1.10");
pub const ID_ECDSA_WITH_SHA224: Oid = Oid::new_unwrap("1.2.840.10045.4.3.1");
pub const ID_ECDSA_WITH_SHA256: Oid = Oid::new_unwrap("1.2.840.10045.4.3.2");
pub const ID_ECDSA_WITH_SHA384: Oid = Oid::new_unwrap("1.2.840.10045.4.3.3");
pub const ID_ECDSA_WITH_SHA512: Oid = Oid::new_unwrap("1.2.840.10045.4.3.4");

/// RSASSA-PSS-params, RFC 4055 §3.1.
///
/// All four fields are context-tagged and DEFAULT; absent fields fall back to
/// the RFC defaults (SHA-1, MGF1-SHA1, 20-byte salt, trailer 0xbc).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct RsaPssParameters {
    #[asn1(context_specific = "0", default = "default_hash_algorithm")]
    pub hash_algorithm: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "1", default = "default_mask_gen_algorithm")]
    pub mask_gen_algorithm: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "2", default = "default_salt_length")]
    pub salt_length: Int,
    #[asn1(context_specific = "3", default = "default_trailer_field")]
    pub trailer_field: Int,
}

fn default_hash_algorithm() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: DigestAlgorithm::Sha1.oid(),
        parameters: None,
    }
}

fn default_mask_gen_algorithm() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: Oid::new_unwrap("1.2.840.113549.1.1.8"), // id-mgf1
        parameters: Some(der::Any::from(default_hash_algorithm().oid)),
    }
}

fn default_salt_length() -> Int {
    Int::new(&[20]).expect("20 fits in an Int")
}

fn default_trailer_field() -> Int {
    Int::new(&[1]).expect("1 fits in an Int")
}

impl RsaPssParameters {
    /// The hash algorithm used both for the message digest and, per RFC
    /// 4055, the MGF1 mask.
    pub fn hash_algorithm(&self) -> Result<DigestAlgorithm> {
        DigestAlgorithm::from_oid(&self.hash_algorithm.oid)
            .ok_or_else(|| anyhow!("unsupported PSS hash algorithm: {}", self.hash_algorithm.oid))
    }

    pub fn salt_len(&self) -> Result<usize> {
        self.salt_length
            .as_bytes()
            .last()
            .map(|&b| b as usize)
            .ok_or_else(|| anyhow!("empty PSS salt length"))
    }
}

/// Signature algorithm as it appears in a certificate's `signatureAlgorithm`
/// field or a CMS `SignerInfo.signatureAlgorithm`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureAlgorithmIdentifier {
    RsaPkcs1v15(DigestAlgorithm),
    RsaPss(RsaPssParameters),
    Ecdsa(DigestAlgorithm),
    Unknown(AnyAlgorithmIdentifier),
}

impl TryFrom<&AlgorithmIdentifierOwned> for SignatureAlgorithmIdentifier {
    type Error = anyhow::Error;

    fn try_from(algorithm: &AlgorithmIdentifierOwned) -> Result<Self> {
        Ok(match algorithm.oid {
            ID_SHA1_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(DigestAlgorithm::Sha1),
            ID_SHA224_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(DigestAlgorithm::Sha224),
            ID_SHA256_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(DigestAlgorithm::Sha256),
            ID_SHA384_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(DigestAlgorithm::Sha384),
            ID_SHA512_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(DigestAlgorithm::Sha512),
            ID_ECDSA_WITH_SHA224 => Self::Ecdsa(DigestAlgorithm::Sha224),
            ID_ECDSA_WITH_SHA256 => Self::Ecdsa(DigestAlgorithm::Sha256),
            ID_ECDSA_WITH_SHA384 => Self::Ecdsa(DigestAlgorithm::Sha384),
            ID_ECDSA_WITH_SHA512 => Self::Ecdsa(DigestAlgorithm::Sha512),
            ID_RSASSA_PSS => {
                let params = algorithm
                    .parameters
                    .as_ref()
                    .ok_or_else(|| anyhow!("RSASSA-PSS algorithm identifier missing parameters"))?;
                Self::RsaPss(RsaPssParameters::from_der(&params.to_der()?)?)
            }
            oid => Self::Unknown(AnyAlgorithmIdentifier {
                algorithm: oid,
                parameters: algorithm.parameters.clone(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_sha256_with_rsa() {
        let algo = AlgorithmIdentifierOwned {
            oid: ID_SHA256_WITH_RSA_ENCRYPTION,
            parameters: None,
        };
        let parsed = SignatureAlgorithmIdentifier::try_from(&algo).unwrap();
        assert_eq!(parsed, SignatureAlgorithmIdentifier::RsaPkcs1v15(DigestAlgorithm::Sha256));
    }

    #[test]
    fn pss_defaults_to_sha1_when_params_absent() {
        let params = RsaPssParameters {
            hash_algorithm: default_hash_algorithm(),
            mask_gen_algorithm: default_mask_gen_algorithm(),
            salt_length: default_salt_length(),
            trailer_field: default_trailer_field(),
        };
        assert_eq!(params.hash_algorithm().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!(params.salt_len().unwrap(), 20);
    }
}
