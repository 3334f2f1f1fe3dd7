//! CMS `SignedData` signature verification, RFC 5652, as profiled by ICAO
//! 9303-10 §4.6.2.2 (EF.SOD) and ICAO 9303-12 §9 (CSCA Master List).
//!
//! Both profiles require `SignedData` version 3, a mandatory `certificates`
//! field, an absent `crls` field, and a mandatory `signedAttrs` on the
//! `SignerInfo` whose DER encoding is what's actually signed.

use {
    super::{ecdsa, error::CryptoError, rsa::RsaPublicKey},
    crate::asn1::{public_key_info::SubjectPublicKeyInfo, SignatureAlgorithmIdentifier},
    anyhow::{anyhow, ensure, Result},
    cms::{
        cert::CertificateChoices,
        content_info::CmsVersion,
        signed_data::{SignedData, SignerInfo},
    },
    der::Encode,
    ruint::Uint,
    x509_cert::Certificate,
};

/// Fixed-width integer wide enough for any RSA modulus seen in the ICAO PKI.
type RsaVerifyUint = Uint<4096, 64>;

/// Checks the structural requirements ICAO 9303 places on `SignedData`
/// independent of content type: version 3, certificates present, CRLs
/// absent.
pub fn check_signed_data_profile(signed_data: &SignedData) -> Result<(), CryptoError> {
    if signed_data.version != CmsVersion::V3 {
        return Err(CryptoError::MalformedCms);
    }
    if signed_data.certificates.is_none() {
        return Err(CryptoError::MalformedCms);
    }
    if signed_data.crls.is_some() {
        return Err(CryptoError::MalformedCms);
    }
    Ok(())
}

/// Returns every `Certificate` embedded in `signed_data`'s `certificates`
/// field, ignoring any non-certificate `CertificateChoices` variant (e.g.
/// attribute certificates, which ICAO 9303 does not use).
pub fn embedded_certificates(signed_data: &SignedData) -> Result<Vec<Certificate>> {
    let set = signed_data
        .certificates
        .as_ref()
        .ok_or_else(|| anyhow!("SignedData contains no certificates"))?;
    Ok(set
        .0
        .iter()
        .filter_map(|choice| match choice {
            CertificateChoices::Certificate(cert) => Some(cert.clone()),
            _ => None,
        })
        .collect())
}

/// Finds the self-signed certificate (subject == issuer) among the embedded
/// certificates, as used to locate a CSCA Master List's signer.
pub fn find_self_signed_certificate(signed_data: &SignedData) -> Result<Certificate> {
    embedded_certificates(signed_data)?
        .into_iter()
        .find(|cert| cert.tbs_certificate.subject == cert.tbs_certificate.issuer)
        .ok_or_else(|| anyhow!("no self-signed certificate in SignedData.certificates"))
}

/// Verifies `signer_info`'s signature over its `signedAttrs`, RFC 5652 §5.4,
/// against `cert`'s subject public key.
pub fn verify_signer_info(signer_info: &SignerInfo, cert: &Certificate) -> Result<(), CryptoError> {
    verify_signer_info_inner(signer_info, cert).map_err(|_| CryptoError::BadSignature)
}

fn verify_signer_info_inner(signer_info: &SignerInfo, cert: &Certificate) -> Result<()> {
    let algorithm = SignatureAlgorithmIdentifier::try_from(&signer_info.signature_algorithm)?;
    let attrs = signer_info
        .signed_attrs
        .as_ref()
        .ok_or_else(|| anyhow!("SignerInfo must contain signedAttrs"))?;
    let message = attrs.to_der()?;
    let signature = signer_info.signature.as_bytes();

    let pubkey = SubjectPublicKeyInfo::try_from(&cert.tbs_certificate.subject_public_key_info)?;

    match (&pubkey, &algorithm) {
        (SubjectPublicKeyInfo::Rsa(_), SignatureAlgorithmIdentifier::RsaPkcs1v15(digest)) => {
            let key = RsaPublicKey::<RsaVerifyUint>::try_from(&pubkey)?;
            key.verify_pkcs1v15(&message, signature, *digest)?;
        }
        (SubjectPublicKeyInfo::Rsa(_), SignatureAlgorithmIdentifier::RsaPss(params)) => {
            let key = RsaPublicKey::<RsaVerifyUint>::try_from(&pubkey)?;
            key.verify_pss(&message, signature, params)?;
        }
        (SubjectPublicKeyInfo::Ec(ec), SignatureAlgorithmIdentifier::Ecdsa(digest)) => {
            let hash = digest.digest(&message);
            ecdsa::verify(ec, &hash, signature)?;
        }
        _ => anyhow::bail!("signature algorithm does not match subject public key type"),
    }
    Ok(())
}

/// Verifies that `signed_data` is well-formed per the ICAO profile and that
/// its sole `SignerInfo` is signed by `signer_cert`.
pub fn verify_signed_data(signed_data: &SignedData, signer_cert: &Certificate) -> Result<(), CryptoError> {
    check_signed_data_profile(signed_data)?;
    let signer_info = signed_data
        .signer_infos
        .0
        .as_slice()
        .first()
        .ok_or(CryptoError::MalformedCms)?;
    verify_signer_info(signer_info, signer_cert)
}
