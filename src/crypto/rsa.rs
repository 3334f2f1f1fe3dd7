//! RSA signature verification.
//!
//! To *not* do: signing. This stays verification-only. RSA is a minefield of
//! pitfalls and no-one should create new signatures using it. See e.g.
//! <https://blog.trailofbits.com/2019/07/08/fuck-rsa>.

use {
    super::{
        digest::DigestAlgorithm,
        error::CryptoError,
        mod_ring::{ModRing, ModRingElementRef, RingRefExt, UintMont},
    },
    crate::asn1::{public_key_info::SubjectPublicKeyInfo, signature_algorithm_identifier::RsaPssParameters},
    anyhow::{ensure, Error, Result},
    ruint::Uint,
    subtle::ConstantTimeEq,
};

/// Fixed-width integer wide enough for any RSA modulus seen in the ICAO PKI
/// (1024 through 4096-bit keys), zero-extended where narrower.
pub type RsaUint = Uint<4096, 64>;

#[derive(Clone, Debug)]
pub struct RsaPublicKey<U: UintMont> {
    ring: ModRing<U>,
    public_exponent: U,
}

impl<U: UintMont> RsaPublicKey<U> {
    pub const fn modulus_bit_len(&self) -> usize {
        self.ring.modulus().bit_len()
    }

    fn modulus_byte_len(&self) -> usize {
        (self.modulus_bit_len() + 7) / 8
    }

    fn signature_element<'s>(&'s self, signature: &[u8]) -> Result<ModRingElementRef<'s, U>, CryptoError> {
        if signature.len() > self.modulus_byte_len() {
            return Err(CryptoError::BadSignature);
        }
        let value = U::from_be_bytes(signature);
        Ok(self.ring.from(value))
    }

    /// RSASSA-PKCS1-v1_5 verification, RFC 8017 §8.2.2.
    pub fn verify_pkcs1v15(
        &self,
        message: &[u8],
        signature: &[u8],
        digest_algorithm: DigestAlgorithm,
    ) -> Result<(), CryptoError> {
        let sig_elem = self.signature_element(signature)?;
        let em = sig_elem.pow_ct(self.public_exponent).to_uint().to_be_bytes();
        let em_len = self.modulus_byte_len();
        let expected = pkcs1v15_encode(message, digest_algorithm, em_len);
        let actual = &em[em.len().saturating_sub(em_len)..];
        if bool::from(actual.ct_eq(&expected)) {
            Ok(())
        } else {
            Err(CryptoError::BadSignature)
        }
    }

    /// RSASSA-PSS verification, RFC 8017 §9.1.2.
    ///
    /// EM (encoded message) = signature^e mod n, split as
    /// `maskedDB || H || 0xBC`; `DB = MGF1(H) xor maskedDB` must end in
    /// `0x01 || salt`, and `H` must equal `hash(0x00*8 || hash(message) ||
    /// salt)`.
    pub fn verify_pss(
        &self,
        message: &[u8],
        signature: &[u8],
        params: &RsaPssParameters,
    ) -> Result<(), CryptoError> {
        let digest_algo = params
            .hash_algorithm()
            .map_err(|_| CryptoError::UnsupportedAlgorithm(params.hash_algorithm.oid))?;
        let salt_len = params.salt_len().map_err(|_| CryptoError::BadSignature)?;
        let trailer_field = params.trailer_field.as_bytes().last().copied().unwrap_or(0);
        if trailer_field != 1 {
            return Err(CryptoError::BadSignature);
        }

        let sig_elem = self.signature_element(signature)?;
        let em_bytes = sig_elem.pow_ct(self.public_exponent).to_uint().to_be_bytes();
        let em_len = self.modulus_byte_len();
        let em_bytes = trim_to_len(&em_bytes, em_len);

        if em_bytes.last().copied() != Some(0xbc) {
            return Err(CryptoError::BadSignature);
        }

        let hash_len = digest_algo.output_len();
        if em_len < hash_len + salt_len + 2 {
            return Err(CryptoError::BadSignature);
        }
        let db_len = em_len - hash_len - 1;
        let db = &em_bytes[..db_len];
        let h = &em_bytes[db_len..db_len + hash_len];

        let mask = mgf1(digest_algo, h, db_len);
        let mut db_unmasked = vec![0u8; db_len];
        for (i, &b) in db.iter().enumerate() {
            db_unmasked[i] = b ^ mask[i];
        }
        let em_bits = self.modulus_bit_len() - 1;
        let mask_bits = 8 * em_len - em_bits;
        db_unmasked[0] &= if mask_bits >= 8 { 0 } else { 0xffu8 >> mask_bits };

        let salt_start = db_len.checked_sub(salt_len).ok_or(CryptoError::BadSignature)?;
        let one_pos = (0..salt_start)
            .rev()
            .find(|&i| db_unmasked[i] != 0x00)
            .filter(|&i| db_unmasked[i] == 0x01)
            .ok_or(CryptoError::BadSignature)?;
        if db_unmasked[..one_pos].iter().any(|&b| b != 0) {
            return Err(CryptoError::BadSignature);
        }
        let salt = &db_unmasked[one_pos + 1..];

        let message_hash = digest_algo.digest(message);
        let mut pre_data = vec![0u8; 8];
        pre_data.extend_from_slice(&message_hash);
        pre_data.extend_from_slice(salt);
        let h_prime = digest_algo.digest(&pre_data);

        if bool::from(h.ct_eq(&h_prime)) {
            Ok(())
        } else {
            Err(CryptoError::BadSignature)
        }
    }
}

fn trim_to_len(bytes: &[u8], len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        bytes[bytes.len() - len..].to_vec()
    } else {
        let mut padded = vec![0u8; len - bytes.len()];
        padded.extend_from_slice(bytes);
        padded
    }
}

/// EMSA-PKCS1-v1_5 encoding, RFC 8017 §9.2: `0x00 || 0x01 || PS || 0x00 || T`,
/// where `T` is the DER encoding of `DigestInfo`.
fn pkcs1v15_encode(message: &[u8], digest_algorithm: DigestAlgorithm, em_len: usize) -> Vec<u8> {
    let digest = digest_algorithm.digest(message);
    let digest_info = digest_info_der(digest_algorithm, &digest);
    let ps_len = em_len.saturating_sub(digest_info.len() + 3);
    let mut em = Vec::with_capacity(em_len);
    em.push(0x00);
    em.push(0x01);
    em.extend(std::iter::repeat(0xff).take(ps_len));
    em.push(0x00);
    em.extend_from_slice(&digest_info);
    em
}

/// DER-encodes `DigestInfo ::= SEQUENCE { digestAlgorithm AlgorithmIdentifier,
/// digest OCTET STRING }` for the given digest algorithm, RFC 8017 appendix A.
fn digest_info_der(digest_algorithm: DigestAlgorithm, digest: &[u8]) -> Vec<u8> {
    use der::{asn1::OctetString, Encode};

    let alg = x509_cert::spki::AlgorithmIdentifierOwned {
        oid: digest_algorithm.oid(),
        parameters: Some(der::Any::from(der::asn1::Null)),
    };
    #[derive(der::Sequence)]
    struct DigestInfo {
        algorithm: x509_cert::spki::AlgorithmIdentifierOwned,
        digest: OctetString,
    }
    let info = DigestInfo {
        algorithm: alg,
        digest: OctetString::new(digest.to_vec()).expect("digest fits in an OCTET STRING"),
    };
    info.to_der().expect("DigestInfo always encodes")
}

fn mgf1(digest_algo: DigestAlgorithm, seed: &[u8], out_len: usize) -> Vec<u8> {
    let mut mask = Vec::new();
    let mut counter: u32 = 0;
    while mask.len() < out_len {
        let mut data = Vec::with_capacity(seed.len() + 4);
        data.extend_from_slice(seed);
        data.extend_from_slice(&counter.to_be_bytes());
        mask.extend_from_slice(&digest_algo.digest(&data));
        counter += 1;
    }
    mask.truncate(out_len);
    mask
}

impl<const B: usize, const L: usize> TryFrom<&SubjectPublicKeyInfo> for RsaPublicKey<Uint<B, L>> {
    type Error = Error;

    fn try_from(info: &SubjectPublicKeyInfo) -> Result<Self> {
        match info {
            SubjectPublicKeyInfo::Rsa(key) => {
                let modulus = Uint::<B, L>::try_from(key.modulus.clone())
                    .map_err(|_| anyhow::anyhow!("RSA modulus does not fit in {B} bits"))?;
                let public_exponent = Uint::<B, L>::try_from(key.public_exponent.clone())
                    .map_err(|_| anyhow::anyhow!("RSA public exponent does not fit in {B} bits"))?;
                Ok(Self {
                    ring: ModRing::from_modulus(modulus),
                    public_exponent,
                })
            }
            _ => anyhow::bail!("SubjectPublicKeyInfo is not RSA"),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::asn1::signature_algorithm_identifier::RsaPssParameters,
        anyhow::{ensure, Result},
        der::Decode,
        hex_literal::hex,
        num_traits::ToPrimitive,
        ruint::Uint,
        x509_cert::spki::AlgorithmIdentifierOwned,
    };

    #[test]
    fn test_rsa_ssa_pss() -> Result<()> {
        // RSA-PSS example with MGF1/SHA-256, 32-byte salt.
        let subject_public_key = hex!("30820122300d06092a864886f70d01010105000382010f003082010a0282010100a2b451a07d0aa5f96e455671513550514a8a5b462ebef717094fa1fee82224e637f9746d3f7cafd31878d80325b6ef5a1700f65903b469429e89d6eac8845097b5ab393189db92512ed8a7711a1253facd20f79c15e8247f3d3e42e46e48c98e254a2fe9765313a03eff8f17e1a029397a1fa26a8dce26f490ed81299615d9814c22da610428e09c7d9658594266f5c021d0fceca08d945a12be82de4d1ece6b4c03145b5d3495d4ed5411eb878daf05fd7afc3e09ada0f1126422f590975a1969816f48698bcbba1b4d9cae79d460d8f9f85e7975005d9bc22c4e5ac0f7c1a45d12569a62807d3b9a02e5a530e773066f453d1f5b4c2e9cf7820283f742b9d50203010001");
        let signature = hex!("68caf07e71ee654ffabf07d342fc4059deb4f7e5970746c423b1e8f668d5332275cc35eb61270aebd27855b1e80d59def47fe8882867fd33c2308c91976baa0b1df952caa78db4828ab81e79949bf145cbdfd1c4987ed036f81e8442081016f20fa4b587574884ca6f6045959ce3501ae7c02b1902ec1d241ef28dee356c0d30d28a950f1fbc683ee7d9aad26b048c13426fe3975d5638afeb5b9c1a99d162d3a5810e8b074d7a2eae2be52b577151f76e1f734b0a956ef4f22be64dc20a81ad1316e4f79dff5fc41fc08a20bc612283a88415d41595bfea66d59de7ac12e230f72244ad9905aef0ead3fa41ed70bf4218863d5f041292f2d14ce0a7271c6d36");
        let message = hex!("313233343030");

        let digest_algo = AlgorithmIdentifierOwned {
            oid: DigestAlgorithm::Sha256.oid(),
            parameters: None,
        };
        let params = RsaPssParameters {
            hash_algorithm: digest_algo.clone(),
            mask_gen_algorithm: AlgorithmIdentifierOwned {
                oid: der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.8"),
                parameters: Some(der::Any::from(digest_algo.oid)),
            },
            salt_length: der::asn1::Int::new(&[32]).unwrap(),
            trailer_field: der::asn1::Int::new(&[1]).unwrap(),
        };

        let pubkey_info = SubjectPublicKeyInfo::from_der(&subject_public_key)?;
        ensure!(matches!(pubkey_info, SubjectPublicKeyInfo::Rsa(_)));

        let pubkey = RsaPublicKey::<Uint<2048, 32>>::try_from(&pubkey_info)?;
        if let SubjectPublicKeyInfo::Rsa(key) = &pubkey_info {
            let exponent = Uint::<2048, 32>::try_from(key.public_exponent.clone())?;
            assert_eq!(exponent.to_u64().unwrap(), 65537);
        }

        pubkey.verify_pss(&message, &signature, &params).map_err(|e| anyhow::anyhow!("{e}"))?;

        Ok(())
    }
}
