use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("record does not start with a WARC version line")]
    MissingVersion,
    #[error("header line {line} has no ':' separator")]
    MissingSeparator { line: usize },
    #[error("header line {line} has an empty field name")]
    EmptyName { line: usize },
    #[error("header line {line} continues a field that does not exist")]
    OrphanContinuation { line: usize },
    #[error("value of field {name} is not valid UTF-8")]
    InvalidUtf8 { name: String },
    #[error("header block is not terminated by an empty line")]
    Unterminated,
}

/// Header fields of a single record. Names are case-sensitive.
///
/// Values are kept as raw bytes; UTF-8 is only checked for the fields that
/// are actually read, so a Latin-1 `WARC-Filename` does not spoil the rest.
#[derive(Debug, Default)]
pub struct FieldSet {
    fields: FxHashMap<String, Vec<u8>>,
}

impl FieldSet {
    /// Value as written after the colon, surrounding whitespace included.
    pub fn value(&self, name: &str) -> Result<Option<&str>, FieldError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(raw) => std::str::from_utf8(raw)
                .map(Some)
                .map_err(|_| FieldError::InvalidUtf8 {
                    name: name.to_string(),
                }),
        }
    }

    pub fn raw_value(&self, name: &str) -> Option<&[u8]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parses the header block of a raw record. Bytes after the first empty
/// line are never inspected.
pub fn parse_fields(raw: &[u8]) -> Result<FieldSet, FieldError> {
    let mut fields: FxHashMap<String, Vec<u8>> = FxHashMap::default();
    // Some(None) when the previous field was a duplicate we dropped
    let mut last: Option<Option<String>> = None;
    let mut pos = 0;
    let mut line_no = 0;

    loop {
        let end = memchr::memchr(b'\n', &raw[pos..]).ok_or(FieldError::Unterminated)?;
        let mut line = &raw[pos..pos + end];
        pos += end + 1;
        line_no += 1;

        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }

        if line_no == 1 {
            if !line.starts_with(b"WARC/") {
                return Err(FieldError::MissingVersion);
            }
            continue;
        }
        if line.is_empty() {
            break;
        }

        if matches!(line[0], b' ' | b'\t') {
            match &last {
                None => return Err(FieldError::OrphanContinuation { line: line_no }),
                Some(Some(name)) => {
                    if let Some(value) = fields.get_mut(name) {
                        value.push(b' ');
                        value.extend_from_slice(line.trim_ascii());
                    }
                }
                Some(None) => {}
            }
            continue;
        }

        let colon =
            memchr::memchr(b':', line).ok_or(FieldError::MissingSeparator { line: line_no })?;
        let name = String::from_utf8_lossy(line[..colon].trim_ascii());
        if name.is_empty() {
            return Err(FieldError::EmptyName { line: line_no });
        }

        if fields.contains_key(&*name) {
            last = Some(None);
        } else {
            let name = name.into_owned();
            fields.insert(name.clone(), line[colon + 1..].to_vec());
            last = Some(Some(name));
        }
    }

    Ok(FieldSet { fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_fields() {
        let raw = b"WARC/1.0\r\nWARC-Type: response\r\nWARC-Target-URI: http://example.com/\r\nContent-Length: 4\r\n\r\nbody";
        let fields = parse_fields(raw).unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.value("WARC-Type").unwrap(), Some(" response"));
        assert_eq!(
            fields.value("WARC-Target-URI").unwrap(),
            Some(" http://example.com/")
        );
        assert_eq!(fields.value("Content-Length").unwrap(), Some(" 4"));
        assert_eq!(fields.value("WARC-Date").unwrap(), None);
    }

    #[test]
    fn names_are_case_sensitive() {
        let raw = b"WARC/1.0\r\nwarc-target-uri: http://example.com/\r\n\r\n";
        let fields = parse_fields(raw).unwrap();
        assert_eq!(fields.value("WARC-Target-URI").unwrap(), None);
        assert!(fields.value("warc-target-uri").unwrap().is_some());
    }

    #[test]
    fn value_keeps_colons() {
        let raw = b"WARC/1.0\r\nWARC-Target-URI: http://example.com:8080/a\r\n\r\n";
        let fields = parse_fields(raw).unwrap();
        assert_eq!(
            fields.value("WARC-Target-URI").unwrap(),
            Some(" http://example.com:8080/a")
        );
    }

    #[test]
    fn first_duplicate_wins() {
        let raw = b"WARC/1.0\r\nWARC-Target-URI: http://first/\r\nWARC-Target-URI: http://second/\r\n  folded\r\n\r\n";
        let fields = parse_fields(raw).unwrap();
        assert_eq!(fields.value("WARC-Target-URI").unwrap(), Some(" http://first/"));
    }

    #[test]
    fn continuation_lines_are_folded() {
        let raw = b"WARC/1.0\r\nWARC-Warcinfo-ID: part one\r\n\tpart two\r\n\r\n";
        let fields = parse_fields(raw).unwrap();
        assert_eq!(
            fields.value("WARC-Warcinfo-ID").unwrap(),
            Some(" part one part two")
        );
    }

    #[test]
    fn block_is_not_parsed() {
        let raw = b"WARC/1.0\r\nWARC-Type: resource\r\n\r\nno colon here\r\n\xff\xfe\r\n";
        assert!(parse_fields(raw).is_ok());
    }

    #[test]
    fn empty_header_block_is_valid() {
        let fields = parse_fields(b"WARC/1.0\r\n\r\n").unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn latin1_in_other_field_keeps_record_usable() {
        let raw = b"WARC/1.0\r\nWARC-Target-URI: http://example.com/\r\nWARC-Filename: caf\xe9.warc\r\n\r\n";
        let fields = parse_fields(raw).unwrap();
        assert_eq!(
            fields.value("WARC-Target-URI").unwrap(),
            Some(" http://example.com/")
        );
        assert_eq!(fields.raw_value("WARC-Filename"), Some(&b" caf\xe9.warc"[..]));
        assert_eq!(
            fields.value("WARC-Filename").unwrap_err(),
            FieldError::InvalidUtf8 {
                name: "WARC-Filename".to_string()
            }
        );
    }

    #[test]
    fn rejects_missing_version() {
        let raw = b"HTTP/1.1 200 OK\r\nWARC-Type: response\r\n\r\n";
        assert_eq!(parse_fields(raw).unwrap_err(), FieldError::MissingVersion);
    }

    #[test]
    fn rejects_line_without_separator() {
        let raw = b"WARC/1.0\r\nWARC-Type response\r\n\r\n";
        assert_eq!(
            parse_fields(raw).unwrap_err(),
            FieldError::MissingSeparator { line: 2 }
        );
    }

    #[test]
    fn rejects_empty_name() {
        let raw = b"WARC/1.0\r\n: value\r\n\r\n";
        assert_eq!(
            parse_fields(raw).unwrap_err(),
            FieldError::EmptyName { line: 2 }
        );
    }

    #[test]
    fn rejects_orphan_continuation() {
        let raw = b"WARC/1.0\r\n  dangling\r\n\r\n";
        assert_eq!(
            parse_fields(raw).unwrap_err(),
            FieldError::OrphanContinuation { line: 2 }
        );
    }

    #[test]
    fn rejects_unterminated_header() {
        let raw = b"WARC/1.0\r\nWARC-Type: response\r\n";
        assert_eq!(parse_fields(raw).unwrap_err(), FieldError::Unterminated);
        assert_eq!(parse_fields(b"").unwrap_err(), FieldError::Unterminated);
    }
}
