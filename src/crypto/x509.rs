//! X.509 certificate and CRL decoding, RFC 5280.
//!
//! Parsing is delegated entirely to `x509-cert`; this module only adds the
//! error mapping and public-key extraction the rest of the crate needs.

use {
    super::error::CryptoError,
    crate::asn1::{public_key_info::SubjectPublicKeyInfo, SignatureAlgorithmIdentifier as Algo},
    der::{Decode, Encode},
    x509_cert::{crl::CertificateList, Certificate},
};

/// Decodes a DER-encoded X.509 certificate.
pub fn decode_certificate(bytes: &[u8]) -> Result<Certificate, CryptoError> {
    Certificate::from_der(bytes).map_err(|_| CryptoError::MalformedCertificate)
}

/// Decodes a DER-encoded X.509 CRL (`CertificateList`).
pub fn decode_crl(bytes: &[u8]) -> Result<CertificateList, CryptoError> {
    CertificateList::from_der(bytes).map_err(|_| CryptoError::MalformedCrl)
}

/// Extracts and decodes a certificate's subject public key.
pub fn public_key_of(cert: &Certificate) -> Result<SubjectPublicKeyInfo, CryptoError> {
    SubjectPublicKeyInfo::try_from(&cert.tbs_certificate.subject_public_key_info)
        .map_err(|_| CryptoError::MalformedCertificate)
}

/// Verifies that `cert` was signed by `issuer`'s public key.
///
/// This checks only the cryptographic signature; path-building, validity
/// windows, and extension constraints are the trust engine's responsibility.
pub fn verify_issued_by(cert: &Certificate, issuer: &Certificate) -> Result<(), CryptoError> {
    let tbs_der = cert
        .tbs_certificate
        .to_der()
        .map_err(|_| CryptoError::MalformedCertificate)?;
    let algorithm_oid = cert.signature_algorithm.oid;
    let algorithm = Algo::try_from(&cert.signature_algorithm)
        .map_err(|_| CryptoError::UnsupportedAlgorithm(algorithm_oid))?;
    let signature = cert
        .signature
        .as_bytes()
        .ok_or(CryptoError::MalformedCertificate)?;
    let issuer_key = public_key_of(issuer)?;
    verify_with_key(&issuer_key, &tbs_der, signature, &algorithm, algorithm_oid)
}

/// Verifies that `crl` was signed by `issuer`'s public key.
pub fn verify_crl_issued_by(
    crl: &CertificateList,
    issuer: &Certificate,
) -> Result<(), CryptoError> {
    let tbs_der = crl
        .tbs_cert_list
        .to_der()
        .map_err(|_| CryptoError::MalformedCrl)?;
    let algorithm_oid = crl.signature_algorithm.oid;
    let algorithm = Algo::try_from(&crl.signature_algorithm)
        .map_err(|_| CryptoError::UnsupportedAlgorithm(algorithm_oid))?;
    let signature = crl.signature.as_bytes().ok_or(CryptoError::MalformedCrl)?;
    let issuer_key = public_key_of(issuer)?;
    verify_with_key(&issuer_key, &tbs_der, signature, &algorithm, algorithm_oid)
}

fn verify_with_key(
    pubkey: &SubjectPublicKeyInfo,
    message: &[u8],
    signature: &[u8],
    algorithm: &Algo,
    algorithm_oid: der::asn1::ObjectIdentifier,
) -> Result<(), CryptoError> {
    match (pubkey, algorithm) {
        (SubjectPublicKeyInfo::Rsa(_), Algo::RsaPkcs1v15(digest)) => {
            let key = super::rsa::RsaPublicKey::<super::rsa::RsaUint>::try_from(pubkey)
                .map_err(|_| CryptoError::MalformedCertificate)?;
            key.verify_pkcs1v15(message, signature, *digest)
        }
        (SubjectPublicKeyInfo::Rsa(_), Algo::RsaPss(params)) => {
            let key = super::rsa::RsaPublicKey::<super::rsa::RsaUint>::try_from(pubkey)
                .map_err(|_| CryptoError::MalformedCertificate)?;
            key.verify_pss(message, signature, params)
        }
        (SubjectPublicKeyInfo::Ec(ec), Algo::Ecdsa(digest)) => {
            let hash = digest.digest(message);
            super::ecdsa::verify(ec, &hash, signature)
        }
        _ => Err(CryptoError::UnsupportedAlgorithm(algorithm_oid)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_certificate_bytes() {
        assert!(decode_certificate(&[0x00, 0x01, 0x02]).is_err());
    }

    #[test]
    fn rejects_garbage_crl_bytes() {
        assert!(decode_crl(&[0x00, 0x01, 0x02]).is_err());
    }
}
