//! Charset repair for tag text and path components.
//!
//! Tag readers surface a frame with an undeclared legacy encoding (GBK, Big5)
//! as Latin-1 text, and some tools re-save UTF-8 bytes as Latin-1 characters
//! ("double encoding"). Both leave characters in 0x00-0xFF that can be mapped
//! back to the original bytes and decoded again.

use crate::error::EncodingError;
use chardetng::EncodingDetector;
use encoding_rs::{BIG5, Encoding, GB18030, GBK, UTF_16BE, UTF_16LE};
use std::ffi::OsStr;
use tracing::debug;

pub const UTF8_LABEL: &str = "UTF-8";
pub const DOUBLE_ENCODED_LABEL: &str = "UTF-8 (double-encoded)";

/// Result of [`fix_encoding`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodingFix {
    pub text: String,
    /// detected source charset
    pub charset: &'static str,
    pub changed: bool,
}

impl EncodingFix {
    fn unchanged(text: &str, charset: &'static str) -> Self {
        Self {
            text: text.to_string(),
            charset,
            changed: false,
        }
    }
}

pub fn detect_charset(bytes: &[u8]) -> &'static str {
    if bytes.is_empty() {
        return UTF8_LABEL;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true).name()
}

/// Decoder table. Labels outside it are passed through undecoded.
fn decoder_for(label: &str) -> Option<&'static Encoding> {
    match label.to_ascii_uppercase().as_str() {
        "GB2312" | "GB-2312" | "GBK" => Some(GBK),
        "GB18030" => Some(GB18030),
        "BIG5" => Some(BIG5),
        "UTF-16LE" => Some(UTF_16LE),
        "UTF-16BE" => Some(UTF_16BE),
        _ => None,
    }
}

pub fn decode_to_utf8(bytes: &[u8], label: &str) -> Result<String, EncodingError> {
    let Some(encoding) = decoder_for(label) else {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(EncodingError::Malformed {
            label: encoding.name(),
        });
    }
    Ok(text.into_owned())
}

/// Each code point as one byte, or None if any code point is above 0xFF.
fn latin1_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(c).ok()).collect()
}

fn contains_cjk(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3000}'..='\u{303F}'))
}

/// Undo UTF-8 bytes that were stored as one Latin-1 character per byte.
/// Only accepted when the recovered text contains CJK ideographs or punctuation.
pub fn fix_double_encoding(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let bytes = latin1_bytes(text)?;
    let candidate = String::from_utf8(bytes).ok()?;
    contains_cjk(&candidate).then_some(candidate)
}

pub fn fix_encoding(text: &str) -> EncodingFix {
    if text.is_empty() {
        return EncodingFix::unchanged(text, UTF8_LABEL);
    }

    if let Some(fixed) = fix_double_encoding(text) {
        return EncodingFix {
            text: fixed,
            charset: DOUBLE_ENCODED_LABEL,
            changed: true,
        };
    }

    let bytes = latin1_bytes(text).unwrap_or_else(|| text.as_bytes().to_vec());
    let charset = detect_charset(&bytes);
    if decoder_for(charset).is_none() {
        return EncodingFix::unchanged(text, charset);
    }

    match decode_to_utf8(&bytes, charset) {
        Ok(decoded) => {
            let changed = charset != UTF8_LABEL && decoded != text;
            EncodingFix {
                text: if changed { decoded } else { text.to_string() },
                charset,
                changed,
            }
        }
        Err(e) => {
            debug!(charset, error = %e, "encoding repair skipped");
            EncodingFix::unchanged(text, UTF8_LABEL)
        }
    }
}

#[derive(Debug, Default)]
struct GarbleCounts {
    question_marks: usize,
    replacement: usize,
    unusual: usize,
    latin1_extended: usize,
    total: usize,
}

impl GarbleCounts {
    // Surrogates and values above U+10FFFF cannot exist in a `str`, so there
    // is no invalid code point bucket.
    fn of(text: &str) -> Self {
        let mut c = GarbleCounts::default();
        for ch in text.chars() {
            c.total += 1;
            let cp = u32::from(ch);
            if ch == '?' {
                c.question_marks += 1;
            }
            if ch == '\u{FFFD}' {
                c.replacement += 1;
            }
            let c0_control = cp < 0x20 && !matches!(ch, '\n' | '\r' | '\t');
            if (0x80..=0x9F).contains(&cp) || cp == 0xD7 || cp == 0xF7 || c0_control {
                c.unusual += 1;
            }
            if (0xA1..=0xFF).contains(&cp) {
                c.latin1_extended += 1;
            }
        }
        c
    }

    fn ratio(&self, n: usize) -> f64 {
        n as f64 / self.total as f64
    }
}

/// Statistical markers of unrecoverable encoding damage.
pub fn is_garbled(text: &str) -> bool {
    let c = GarbleCounts::of(text);
    if c.total == 0 {
        return false;
    }

    if c.ratio(c.question_marks) > 0.10 {
        return true;
    }

    let problems = c.question_marks + c.replacement + c.unusual + c.latin1_extended;
    if c.ratio(problems) > 0.20 {
        return true;
    }

    if c.question_marks > 0
        && (c.unusual > 0 || c.latin1_extended > 0)
        && c.ratio(c.question_marks + c.unusual + c.latin1_extended) > 0.20
    {
        return true;
    }

    c.ratio(c.latin1_extended) > 0.30
}

#[cfg(unix)]
fn os_bytes(name: &OsStr) -> std::borrow::Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    std::borrow::Cow::Borrowed(name.as_bytes())
}

#[cfg(not(unix))]
fn os_bytes(name: &OsStr) -> std::borrow::Cow<'_, [u8]> {
    match name.to_string_lossy() {
        std::borrow::Cow::Borrowed(s) => std::borrow::Cow::Borrowed(s.as_bytes()),
        std::borrow::Cow::Owned(s) => std::borrow::Cow::Owned(s.into_bytes()),
    }
}

/// File or directory name as UTF-8, decoding legacy-encoded names (e.g. GBK
/// names unpacked from an archive). Not garbled-checked.
pub fn normalize_name(name: &OsStr) -> String {
    let bytes = os_bytes(name);
    if let Ok(s) = std::str::from_utf8(&bytes) {
        return s.to_string();
    }

    let charset = detect_charset(&bytes);
    match decode_to_utf8(&bytes, charset) {
        Ok(s) => s,
        Err(e) => {
            debug!(charset, error = %e, "path name decode failed");
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }
}
