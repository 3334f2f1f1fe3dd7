//! The canonical record produced by parsing a Master List file (spec §3):
//! the signer's DN, the full set of embedded certificates (already
//! classified — one `Mlsc` plus `Csca`/`LinkCert` members), and the raw
//! CMS bytes for audit/replay.
//!
//! Built by [`crate::parsers::master_list`]; kept separate from
//! [`crate::asn1::master_list::MasterList`] (the raw CMS/ASN.1 wrapper)
//! the way `model::certificate::Certificate` is kept separate from the
//! `x509_cert::Certificate` it's built from.

use super::Certificate;

#[derive(Clone, Debug)]
pub struct MasterList {
    pub signer_dn: String,
    pub der: Vec<u8>,
    pub certificates: Vec<Certificate>,
}

impl MasterList {
    pub fn signer(&self) -> Option<&Certificate> {
        self.certificates
            .iter()
            .find(|c| c.certificate_type == super::CertificateType::Mlsc)
    }
}
