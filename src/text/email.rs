use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static HEADER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(From |[A-Za-z0-9][A-Za-z0-9_-]*:)").expect("valid header regex")
});

/// A raw email split into its subject and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDocument {
    pub subject: Option<String>,
    pub body: String,
}

impl EmailDocument {
    /// Splits `raw` at the first blank line when it opens with a header
    /// block. Plain text with no headers, or a header-looking block that is
    /// never closed by a blank line, is taken whole as the body.
    pub fn parse(raw: &str) -> Self {
        let first_line = raw.lines().find(|line| !line.trim().is_empty());
        let has_headers = first_line.is_some_and(|line| HEADER_LINE.is_match(line));
        if !has_headers {
            return Self {
                subject: None,
                body: raw.to_string(),
            };
        }

        let mut subject = None;
        let mut body_lines = Vec::new();
        let mut in_body = false;
        let mut seen_header = false;

        for line in raw.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if in_body {
                body_lines.push(line);
                continue;
            }
            if line.trim().is_empty() {
                // Blank lines ahead of the first header are padding.
                in_body = seen_header;
                continue;
            }
            seen_header = true;
            if subject.is_none() {
                if let Some(value) = header_value(line, "subject") {
                    subject = Some(value.to_string());
                }
            }
        }

        if !in_body {
            return Self {
                subject: None,
                body: raw.to_string(),
            };
        }

        Self {
            subject: subject.filter(|s| !s.is_empty()),
            body: body_lines.join("\n"),
        }
    }
}

fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
}

/// Decodes uploaded or on-disk email bytes: UTF-8 when valid, otherwise
/// Latin-1, which maps every byte to a code point.
pub fn decode_email_bytes(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
    }
}
