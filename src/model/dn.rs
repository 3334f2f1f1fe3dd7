//! Distinguished-name canonicalization, RFC 4514.
//!
//! `x509_cert::name::Name`'s `Display` impl already renders RDNs
//! most-specific-first (the RFC 4514 string order); canonicalization here
//! only needs to lowercase attribute types and strip incidental whitespace
//! around `=` and `,` so that two syntactically-equivalent DNs compare
//! byte-for-byte equal.

/// Maximum length a canonical DN may reach before a directory write is
/// rejected with `DnTooLong`.
pub const MAX_DN_LEN: usize = 512;

/// Canonicalizes a DN string: lowercases each RDN's attribute type and
/// trims whitespace around `=` and the RDN-separating `,`, preserving
/// attribute values (including escaped commas) verbatim.
pub fn canonicalize(dn: &str) -> String {
    split_rdns(dn)
        .iter()
        .map(|rdn| canonicalize_rdn(rdn))
        .collect::<Vec<_>>()
        .join(",")
}

/// Two DNs are "equal" iff their canonical forms match byte-for-byte.
pub fn dn_equal(a: &str, b: &str) -> bool {
    canonicalize(a) == canonicalize(b)
}

/// Extracts the value of the first `C=` (or `c=`) RDN, if any.
pub fn country_code_rdn(dn: &str) -> Option<String> {
    split_rdns(dn).into_iter().find_map(|rdn| {
        let (attr, value) = rdn.split_once('=')?;
        (attr.trim().eq_ignore_ascii_case("c")).then(|| value.trim().to_string())
    })
}

/// Splits a DN into its RDN components, respecting backslash-escaped
/// commas inside a value (RFC 4514 §2.4).
fn split_rdns(dn: &str) -> Vec<&str> {
    let mut rdns = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let bytes = dn.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b',' => {
                rdns.push(dn[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = dn[start..].trim();
    if !tail.is_empty() || !rdns.is_empty() {
        rdns.push(tail);
    }
    rdns
}

fn canonicalize_rdn(rdn: &str) -> String {
    match rdn.split_once('=') {
        Some((attr, value)) => format!("{}={}", attr.trim().to_ascii_lowercase(), value.trim()),
        None => rdn.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_attribute_types_and_trims_whitespace() {
        let a = "CN = CSCA-KR , O=Gov , C=KR";
        let b = "cn=CSCA-KR,o=Gov,c=KR";
        assert_eq!(canonicalize(a), canonicalize(b));
        assert_eq!(canonicalize(b), "cn=CSCA-KR,o=Gov,c=KR");
    }

    #[test]
    fn preserves_escaped_commas_in_values() {
        let dn = r"CN=Acme\, Inc,C=US";
        let rdns = split_rdns(dn);
        assert_eq!(rdns, vec![r"CN=Acme\, Inc", "C=US"]);
    }

    #[test]
    fn extracts_country_code() {
        assert_eq!(country_code_rdn("CN=CSCA-KR,O=Gov,C=KR"), Some("KR".to_string()));
        assert_eq!(country_code_rdn("CN=Nobody"), None);
    }

    #[test]
    fn dn_equal_ignores_case_and_whitespace() {
        assert!(dn_equal("CN=X, C=US", "cn = X,c=US"));
        assert!(!dn_equal("CN=X,C=US", "CN=Y,C=US"));
    }
}
