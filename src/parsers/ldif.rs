//! Streaming LDIF parser, RFC 2849.
//!
//! Folding: a line beginning with a single space continues the previous
//! line (the leading space is dropped). A blank line terminates the
//! current entry. `#` begins a comment line. `name:: base64` is decoded
//! eagerly and the attribute name normalized to end with `;binary`
//! (mirroring how ICAO PKD LDIF exports mark binary attributes);
//! `name: value` is a UTF-8 value carried as-is. Malformed entries are
//! pushed to an accumulator and skipped rather than raised, so one bad
//! entry in a multi-megabyte file doesn't fail the whole upload.

use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Read},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// How often (in entries) the progress callback fires.
pub const PROGRESS_INTERVAL: usize = 100;

#[derive(Clone, Debug)]
pub struct LdifError {
    pub entry_index: usize,
    pub message: String,
}

/// One parsed LDIF entry: its DN and a name -> values multimap.
#[derive(Clone, Debug, Default)]
pub struct LdifEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl LdifEntry {
    pub fn values(&self, name: &str) -> &[Vec<u8>] {
        self.attributes
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn first_value(&self, name: &str) -> Option<&[u8]> {
        self.values(name).first().map(Vec::as_slice)
    }
}

/// A streaming iterator over `LDIF` entries. Errors encountered while
/// parsing an individual entry are recorded in [`LdifEntries::errors`]
/// rather than surfaced through `next`.
pub struct LdifEntries<R> {
    lines: std::io::Lines<BufReader<R>>,
    entry_index: usize,
    errors: Vec<LdifError>,
    on_progress: Option<Box<dyn FnMut(usize, Option<usize>)>>,
    total_hint: Option<usize>,
}

impl<R: Read> LdifEntries<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            entry_index: 0,
            errors: Vec::new(),
            on_progress: None,
            total_hint: None,
        }
    }

    /// Registers a callback fired every [`PROGRESS_INTERVAL`] entries with
    /// `(processed, total)`. `total` is only known if the caller supplies
    /// it (e.g. from an upload's declared entry count); streaming input
    /// alone can't determine it in advance.
    pub fn with_progress(
        mut self,
        total_hint: Option<usize>,
        callback: impl FnMut(usize, Option<usize>) + 'static,
    ) -> Self {
        self.total_hint = total_hint;
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn errors(&self) -> &[LdifError] {
        &self.errors
    }

    /// Reads and folds the raw lines of the next logical entry, returning
    /// `None` once the stream is exhausted.
    fn next_raw_entry(&mut self) -> Option<Vec<String>> {
        let mut logical_lines: Vec<String> = Vec::new();
        let mut saw_any_line = false;
        while let Some(line) = self.lines.next() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            saw_any_line = true;
            if line.is_empty() {
                if logical_lines.is_empty() {
                    continue; // leading blank lines between entries
                }
                break;
            }
            if line.starts_with(' ') {
                if let Some(last) = logical_lines.last_mut() {
                    last.push_str(&line[1..]);
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            logical_lines.push(line);
        }
        (saw_any_line && !logical_lines.is_empty()).then_some(logical_lines)
    }

    fn parse_entry(&self, lines: Vec<String>) -> Result<LdifEntry, String> {
        let mut entry = LdifEntry::default();
        let mut dn_set = false;
        for line in lines {
            let (name, value) = split_attribute_line(&line)
                .ok_or_else(|| format!("line without ':' separator: {line:?}"))?;
            if name.name.eq_ignore_ascii_case("dn") {
                entry.dn = String::from_utf8(value.0.clone())
                    .map_err(|_| "dn value is not valid UTF-8".to_string())?;
                dn_set = true;
                continue;
            }
            let normalized = if name.base64 {
                normalize_binary_name(&name.name)
            } else {
                name.name
            };
            entry.attributes.entry(normalized).or_default().push(value.0);
        }
        if !dn_set {
            return Err("entry has no dn: line".to_string());
        }
        Ok(entry)
    }
}

/// A decoded attribute value plus whether it arrived base64-encoded.
struct DecodedValue(Vec<u8>);

struct AttrName {
    name: String,
    base64: bool,
}

fn split_attribute_line(line: &str) -> Option<(AttrName, DecodedValue)> {
    let colon = line.find(':')?;
    let name = line[..colon].to_string();
    let rest = &line[colon + 1..];
    if let Some(b64) = rest.strip_prefix(':') {
        let decoded = STANDARD.decode(b64.trim()).ok()?;
        Some((AttrName { name, base64: true }, DecodedValue(decoded)))
    } else {
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        Some((
            AttrName { name, base64: false },
            DecodedValue(value.as_bytes().to_vec()),
        ))
    }
}

fn normalize_binary_name(name: &str) -> String {
    if name.ends_with(";binary") {
        name.to_string()
    } else {
        format!("{name};binary")
    }
}

impl<R: Read> Iterator for LdifEntries<R> {
    type Item = LdifEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.next_raw_entry()?;
            self.entry_index += 1;
            match self.parse_entry(raw) {
                Ok(entry) => {
                    if self.entry_index % PROGRESS_INTERVAL == 0 {
                        if let Some(cb) = self.on_progress.as_mut() {
                            cb(self.entry_index, self.total_hint);
                        }
                    }
                    return Some(entry);
                }
                Err(message) => {
                    self.errors.push(LdifError {
                        entry_index: self.entry_index,
                        message,
                    });
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_text_entry() {
        let ldif = "dn: c=KR,o=icao,c=pkd\nobjectClass: top\n\n";
        let mut entries = LdifEntries::new(ldif.as_bytes());
        let entry = entries.next().unwrap();
        assert_eq!(entry.dn, "c=KR,o=icao,c=pkd");
        assert_eq!(entry.first_value("objectClass"), Some(b"top".as_slice()));
        assert!(entries.next().is_none());
    }

    #[test]
    fn folds_continuation_lines() {
        let ldif = "dn: c=KR,o=\n icao,c=pkd\nobjectClass: top\n\n";
        let mut entries = LdifEntries::new(ldif.as_bytes());
        let entry = entries.next().unwrap();
        assert_eq!(entry.dn, "c=KR,o=icao,c=pkd");
    }

    #[test]
    fn decodes_base64_binary_attributes_and_normalizes_name() {
        let encoded = STANDARD.encode(b"\x30\x03\x02\x01\x01");
        let ldif = format!("dn: c=KR\nuserCertificate:: {encoded}\n\n");
        let mut entries = LdifEntries::new(ldif.as_bytes());
        let entry = entries.next().unwrap();
        assert_eq!(
            entry.first_value("userCertificate;binary"),
            Some(b"\x30\x03\x02\x01\x01".as_slice())
        );
    }

    #[test]
    fn skips_malformed_entries_and_records_errors() {
        let ldif = "objectClass: top\n\ndn: c=KR\nobjectClass: top\n\n";
        let mut entries = LdifEntries::new(ldif.as_bytes());
        let entry = entries.next().unwrap();
        assert_eq!(entry.dn, "c=KR");
        assert_eq!(entries.errors().len(), 1);
    }

    #[test]
    fn ignores_comment_lines() {
        let ldif = "# a comment\ndn: c=KR\n# another\nobjectClass: top\n\n";
        let mut entries = LdifEntries::new(ldif.as_bytes());
        let entry = entries.next().unwrap();
        assert_eq!(entry.dn, "c=KR");
        assert_eq!(entry.first_value("objectClass"), Some(b"top".as_slice()));
    }
}
