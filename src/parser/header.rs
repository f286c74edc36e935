//! RFC 5322 header-section splitting.
//!
//! Field bodies are returned raw, folds included, since both body parsers
//! accept folding whitespace directly.

use super::flags::Mode;

/// Which parser a field body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Address list (`From`, `To`, `Cc`, ...).
    Address,
    /// Structured body handled by the tokenizer.
    Structured,
    /// Free text (`Subject`, `Comments`, ...) or a field we know nothing of.
    Unstructured,
}

/// One header field, name as written and body as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub body: Vec<u8>,
}

const ADDRESS_FIELDS: &[&str] = &[
    "from",
    "sender",
    "reply-to",
    "to",
    "cc",
    "bcc",
    "resent-from",
    "resent-sender",
    "resent-to",
    "resent-cc",
    "resent-bcc",
];

impl HeaderField {
    pub fn kind(&self) -> FieldKind {
        let name = self.name.to_ascii_lowercase();
        if ADDRESS_FIELDS.contains(&name.as_str()) {
            FieldKind::Address
        } else if self.structured_mode().is_some() {
            FieldKind::Structured
        } else {
            FieldKind::Unstructured
        }
    }

    /// Tokenizer mode bits this field's grammar needs on top of the
    /// caller's, or `None` when the field is not tokenized.
    pub fn structured_mode(&self) -> Option<Mode> {
        match self.name.to_ascii_lowercase().as_str() {
            "content-type" | "content-disposition" => Some(Mode::DOT_ATOM | Mode::SEMICOLON),
            "content-transfer-encoding" | "content-language" => Some(Mode::empty()),
            "mime-version" => Some(Mode::DOT_ATOM),
            _ => None,
        }
    }
}

/// Split the header section at the start of `raw` into fields.
///
/// Stops at the first empty line. A leading BOM and an mbox `From ` line
/// are skipped, and so is any other line that is neither a field nor a
/// continuation.
pub fn split_header_section(raw: &[u8]) -> Vec<HeaderField> {
    let raw = raw.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(raw);
    let mut fields: Vec<HeaderField> = Vec::new();

    for line in raw.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            break;
        }
        if line[0] == b' ' || line[0] == b'\t' {
            // Continuation line
            if let Some(last) = fields.last_mut() {
                last.body.extend_from_slice(b"\r\n");
                last.body.extend_from_slice(line);
            }
            continue;
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let name = trim_end(&line[..colon]);
        if name.is_empty() || !name.iter().all(|&b| (33..=126).contains(&b)) {
            continue;
        }
        fields.push(HeaderField {
            name: String::from_utf8_lossy(name).into_owned(),
            body: line[colon + 1..].to_vec(),
        });
    }

    fields
}

fn trim_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != b'\t')
        .map_or(0, |i| i + 1);
    &bytes[..end]
}
