//! CSCA Master List, ICAO 9303-12 §9.
//!
//! A Master List file is a CMS `SignedData` (wrapped in `ContentInfo`) whose
//! encapsulated content is a `CscaMasterList` holding the set of CSCA
//! certificates a country publishes.

use {
    anyhow::{anyhow, ensure, Result},
    cms::{content_info::ContentInfo, signed_data::SignedData},
    der::{
        asn1::{ObjectIdentifier as Oid, OctetString, SetOfVec},
        Decode, Sequence,
    },
    x509_cert::Certificate,
};

const CSCA_MASTER_LIST_CONTENT_TYPE: Oid = Oid::new_unwrap("2.23.136.1.1.2");

#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct CscaMasterList {
    pub version: u64,
    pub cert_list: SetOfVec<Certificate>,
}

/// A decoded ICAO Master List file: `ContentInfo` wrapping a `SignedData`
/// whose payload is a `CscaMasterList`.
#[derive(Clone, Debug)]
pub struct MasterList {
    content_info: ContentInfo,
}

impl MasterList {
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            content_info: ContentInfo::from_der(bytes)?,
        })
    }

    pub fn signed_data(&self) -> Result<SignedData> {
        Ok(self.content_info.content.decode_as::<SignedData>()?)
    }

    /// The `CscaMasterList` carried as encapsulated content.
    pub fn csca_master_list(&self) -> Result<CscaMasterList> {
        let sd = self.signed_data()?;
        let econ = sd.encap_content_info;
        ensure!(
            econ.econtent_type == CSCA_MASTER_LIST_CONTENT_TYPE,
            "Master List encapsulated content is not a CscaMasterList (oid {})",
            econ.econtent_type
        );
        let octet_string = econ
            .econtent
            .as_ref()
            .ok_or_else(|| anyhow!("Master List encapsulated content is absent"))?
            .decode_as::<OctetString>()?;
        Ok(CscaMasterList::from_der(octet_string.as_bytes())?)
    }
}
