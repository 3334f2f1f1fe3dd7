//! `Crl::from_der`: decode a CRL and build the canonical record and its
//! `revoked_set`, spec §3.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use der::{asn1::ObjectIdentifier as Oid, Decode};

use super::{dn, Fingerprint};

const ID_CE_CRL_NUMBER: Oid = Oid::new_unwrap("2.5.29.20");
const ID_CE_CRL_REASON: Oid = Oid::new_unwrap("2.5.29.21");

/// A revoked certificate's revocation date and optional reason code.
#[derive(Clone, Debug)]
pub struct RevocationEntry {
    pub revocation_date: DateTime<Utc>,
    pub reason: Option<u8>,
}

/// The canonical CRL record, spec §3.
#[derive(Clone, Debug)]
pub struct Crl {
    pub fingerprint_sha256: Fingerprint,
    pub country_code: String,
    pub issuer_dn: String,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub crl_number: Option<u64>,
    pub der: Vec<u8>,
    pub revoked_set: HashMap<String, RevocationEntry>,
}

impl Crl {
    pub fn from_der(der_bytes: &[u8]) -> Result<Self> {
        let crl = crate::crypto::x509::decode_crl(der_bytes).map_err(|e| anyhow!("{e}"))?;
        let tbs = &crl.tbs_cert_list;

        let issuer_raw = tbs.issuer.to_string();
        let issuer_dn = dn::canonicalize(&issuer_raw);
        let country_code = dn::country_code_rdn(&issuer_raw).unwrap_or_else(|| "ZZ".to_string());

        let crl_number = tbs.crl_extensions.as_ref().and_then(|exts| {
            exts.iter().find_map(|ext| {
                (ext.extn_id == ID_CE_CRL_NUMBER)
                    .then(|| der::asn1::Int::from_der(ext.extn_value.as_bytes()).ok())
                    .flatten()
                    .and_then(|n| int_to_u64(n.as_bytes()))
            })
        });

        let mut revoked_set = HashMap::new();
        if let Some(revoked) = &tbs.revoked_certificates {
            for entry in revoked {
                let serial_hex = hex::encode(entry.serial_number.as_bytes());
                let revocation_date = time_to_chrono(&entry.revocation_date)?;
                let reason = entry.crl_entry_extensions.as_ref().and_then(|exts| {
                    exts.iter().find_map(|ext| {
                        (ext.extn_id == ID_CE_CRL_REASON)
                            .then(|| crl_reason_code(ext.extn_value.as_bytes()))
                            .flatten()
                    })
                });
                revoked_set.insert(serial_hex, RevocationEntry { revocation_date, reason });
            }
        }

        Ok(Self {
            fingerprint_sha256: Fingerprint::of(der_bytes),
            country_code,
            issuer_dn,
            this_update: time_to_chrono(&tbs.this_update)?,
            next_update: tbs.next_update.as_ref().map(time_to_chrono).transpose()?,
            crl_number,
            der: der_bytes.to_vec(),
            revoked_set,
        })
    }

    /// A CRL is "current" iff `this_update <= now <= next_update` (spec
    /// §3); a CRL with no `next_update` never lapses on that basis alone.
    pub fn is_current_at(&self, reference_time: DateTime<Utc>) -> bool {
        self.this_update <= reference_time
            && self.next_update.map_or(true, |next| reference_time <= next)
    }

    pub fn is_revoked(&self, serial_hex: &str) -> Option<&RevocationEntry> {
        self.revoked_set.get(serial_hex)
    }
}

fn int_to_u64(bytes: &[u8]) -> Option<u64> {
    let bytes = match bytes {
        [0x00, rest @ ..] if !rest.is_empty() => rest,
        other => other,
    };
    if bytes.len() > 8 {
        return None;
    }
    let mut padded = [0u8; 8];
    padded[8 - bytes.len()..].copy_from_slice(bytes);
    Some(u64::from_be_bytes(padded))
}

fn crl_reason_code(bytes: &[u8]) -> Option<u8> {
    let enumerated = der::asn1::Int::from_der(bytes).ok()?;
    enumerated.as_bytes().last().copied()
}

fn time_to_chrono(time: &x509_cert::time::Time) -> Result<DateTime<Utc>> {
    let unix = time.to_unix_duration();
    Utc.timestamp_opt(unix.as_secs() as i64, unix.subsec_nanos())
        .single()
        .ok_or_else(|| anyhow!("CRL timestamp out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_der() {
        assert!(Crl::from_der(&[0x00, 0x01]).is_err());
    }
}
