//! Subject public key info, decoded per-algorithm.
//!
//! `x509_cert::spki::SubjectPublicKeyInfoOwned` gives us the outer
//! AlgorithmIdentifier + BIT STRING; the inner structure of the key material
//! is algorithm-specific (a PKCS#1 `RSAPublicKey` SEQUENCE for RSA, a raw SEC1
//! point for EC), so we decode that ourselves.

use {
    anyhow::{anyhow, Result},
    der::{
        asn1::{BitStringRef, Int, ObjectIdentifier as Oid},
        Decode, Sequence,
    },
    x509_cert::spki::SubjectPublicKeyInfoOwned,
};

pub const ID_RSA_ENCRYPTION: Oid = Oid::new_unwrap("1.2.840.113549.1.1.1");
pub const ID_EC_PUBLIC_KEY: Oid = Oid::new_unwrap("1.2.840.10045.2.1");

/// A certificate's subject public key, decoded enough to drive signature
/// verification but no further.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubjectPublicKeyInfo {
    Rsa(RsaPublicKeyInfo),
    Ec(EcPublicKeyInfo),
    Unknown { algorithm: Oid, public_key: Vec<u8> },
}

/// PKCS#1 `RSAPublicKey`, RFC 8017 appendix A.1.1.
#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct RsaPublicKeyInfo {
    pub modulus: Int,
    pub public_exponent: Int,
}

/// An EC point on a named curve, SEC1 uncompressed form (`04 || X || Y`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcPublicKeyInfo {
    pub curve: Oid,
    pub point: Vec<u8>,
}

impl SubjectPublicKeyInfo {
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        Self::try_from(&SubjectPublicKeyInfoOwned::from_der(bytes)?)
    }
}

impl TryFrom<SubjectPublicKeyInfoOwned> for SubjectPublicKeyInfo {
    type Error = anyhow::Error;

    fn try_from(spki: SubjectPublicKeyInfoOwned) -> Result<Self> {
        Self::try_from(&spki)
    }
}

impl TryFrom<&SubjectPublicKeyInfoOwned> for SubjectPublicKeyInfo {
    type Error = anyhow::Error;

    fn try_from(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let bit_string: &BitStringRef<'_> = &spki.subject_public_key;
        let key_bytes = bit_string
            .as_bytes()
            .ok_or_else(|| anyhow!("subject public key BIT STRING has unused trailing bits"))?;
        Ok(match spki.algorithm.oid {
            ID_RSA_ENCRYPTION => Self::Rsa(RsaPublicKeyInfo::from_der(key_bytes)?),
            ID_EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .ok_or_else(|| anyhow!("EC public key missing namedCurve parameter"))?
                    .decode_as::<Oid>()?;
                Self::Ec(EcPublicKeyInfo {
                    curve,
                    point: key_bytes.to_vec(),
                })
            }
            oid => Self::Unknown {
                algorithm: oid,
                public_key: key_bytes.to_vec(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RSA-2048 SubjectPublicKeyInfo, from the RSA-PSS fixture used in
    // crypto::rsa's tests.
    const RSA_SPKI: &[u8] = &hex_literal::hex!(
        "30820122300d06092a864886f70d01010105000382010f003082010a0282010100a2b451a07d0aa5f96e455671513550514a8a5b462ebef717094fa1fee82224e637f9746d3f7cafd31878d80325b6ef5a1700f65903b469429e89d6eac8845097b5ab393189db92512ed8a7711a1253facd20f79c15e8247f3d3e42e46e48c98e254a2fe9765313a03eff8f17e1a029397a1fa26a8dce26f490ed81299615d9814c22da610428e09c7d9658594266f5c021d0fceca08d945a12be82de4d1ece6b4c03145b5d3495d4ed5411eb878daf05fd7afc3e09ada0f1126422f590975a1969816f48698bcbba1b4d9cae79d460d8f9f85e7975005d9bc22c4e5ac0f7c1a45d12569a62807d3b9a02e5a530e773066f453d1f5b4c2e9cf7820283f742b9d50203010001"
    );

    #[test]
    fn decodes_rsa_spki() {
        let info = SubjectPublicKeyInfo::from_der(RSA_SPKI).unwrap();
        assert!(matches!(info, SubjectPublicKeyInfo::Rsa(_)));
    }
}
