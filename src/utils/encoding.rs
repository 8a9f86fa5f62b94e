// Text encoding utilities

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use serde::Serializer;

/// Text encodings selectable by an ID3v2 encoding byte
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextEncoding {
    Iso8859_1 = 0,
    Utf16 = 1,
    Utf16BE = 2,
    Utf8 = 3,
}

impl TextEncoding {
    /// Map an encoding byte; `None` for values outside 0..=3
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TextEncoding::Iso8859_1),
            1 => Some(TextEncoding::Utf16),
            2 => Some(TextEncoding::Utf16BE),
            3 => Some(TextEncoding::Utf8),
            _ => None,
        }
    }

    /// Width of the NUL terminator in this encoding
    pub fn terminator_len(self) -> usize {
        match self {
            TextEncoding::Utf16 | TextEncoding::Utf16BE => 2,
            _ => 1,
        }
    }
}

/// Decode text with specified encoding
pub fn decode_text(data: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Iso8859_1 => decode_latin1(data),
        TextEncoding::Utf16 => {
            // Detect BOM
            if data.len() >= 2 && data[0..2] == [0xFF, 0xFE] {
                UTF_16LE.decode_without_bom_handling(&data[2..]).0.into_owned()
            } else if data.len() >= 2 && data[0..2] == [0xFE, 0xFF] {
                UTF_16BE.decode_without_bom_handling(&data[2..]).0.into_owned()
            } else {
                UTF_16LE.decode_without_bom_handling(data).0.into_owned()
            }
        }
        TextEncoding::Utf16BE => UTF_16BE.decode_without_bom_handling(data).0.into_owned(),
        TextEncoding::Utf8 => UTF_8.decode_with_bom_removal(data).0.into_owned(),
    }
}

/// Decode ISO-8859-1 text (decoded as its Windows-1252 superset)
pub fn decode_latin1(data: &[u8]) -> String {
    WINDOWS_1252.decode_without_bom_handling(data).0.into_owned()
}

/// Split `data` at the first NUL terminator of `encoding`.
///
/// Returns the text before the terminator and the bytes after it. Without a
/// terminator the whole input is text and the remainder is empty.
pub fn split_terminated(data: &[u8], encoding: TextEncoding) -> (&[u8], &[u8]) {
    let width = encoding.terminator_len();
    let end = if width == 1 {
        data.iter().position(|&b| b == 0)
    } else {
        data.chunks_exact(2)
            .position(|pair| pair == [0, 0])
            .map(|i| i * 2)
    };
    match end {
        Some(i) => (&data[..i], &data[i + width..]),
        None => (data, &[]),
    }
}

/// Decode a NUL-separated list of strings, dropping trailing terminators
pub fn decode_text_list(data: &[u8], encoding: TextEncoding) -> Vec<String> {
    let mut values = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let (text, tail) = split_terminated(rest, encoding);
        values.push(decode_text(text, encoding));
        rest = tail;
    }
    // "A\0" carries one value, not a trailing empty one
    while values.len() > 1 && values.last().is_some_and(|v| v.is_empty()) {
        values.pop();
    }
    values
}

/// Serialize binary payloads as base64 strings
pub fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

/// Decode base64 text, tolerating surrounding whitespace
pub fn decode_base64(text: &str) -> Option<Vec<u8>> {
    STANDARD.decode(text.trim()).ok()
}
