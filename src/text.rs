//! Named text codecs for text string fields.
//!
//! Text fields carry an encoding chosen by label and a [TextPolicy]
//! deciding what happens to malformed input: fail, drop it, or substitute
//! a replacement character.

use super::error::{DescriptorError, FramingError};

/// How a codec reacts to bytes it cannot decode or characters it cannot
/// encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextPolicy {
    /// Fail with a [FramingError].
    #[default]
    Strict,
    /// Drop the offending input.
    Ignore,
    /// Substitute `U+FFFD` when decoding and `?` when encoding.
    Replace,
}

/// The text encodings the library ships.
///
/// Labels without a byte-order suffix (`"utf-16"`, `"utf-32"`) mean the
/// big-endian variant, consistent with the fixed network byte order of
/// everything else on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, the internal string encoding of rust.
    Utf8,
    /// Plain 7-bit ASCII.
    Ascii,
    /// ISO-8859-1, every byte is the matching code point.
    Latin1,
    /// UTF-16, big-endian code units.
    Utf16Be,
    /// UTF-16, little-endian code units.
    Utf16Le,
    /// UTF-32, big-endian code units.
    Utf32Be,
    /// UTF-32, little-endian code units.
    Utf32Le,
}

impl TextEncoding {
    /// Looks up a codec by label, tolerating the usual spelling
    /// variations (`"UTF-8"`, `"utf8"`, `"utf_8"` are all the same).
    pub fn for_label(label: &str) -> Result<TextEncoding, DescriptorError> {
        let normalized: String = label
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "utf8" => Ok(TextEncoding::Utf8),
            "ascii" | "usascii" => Ok(TextEncoding::Ascii),
            "latin1" | "iso88591" => Ok(TextEncoding::Latin1),
            "utf16" | "utf16be" => Ok(TextEncoding::Utf16Be),
            "utf16le" => Ok(TextEncoding::Utf16Le),
            "utf32" | "utf32be" => Ok(TextEncoding::Utf32Be),
            "utf32le" => Ok(TextEncoding::Utf32Le),
            _ => Err(DescriptorError::UnknownEncoding {
                label: label.to_string(),
            }),
        }
    }

    /// The canonical label of this codec.
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Utf16Be => "utf-16-be",
            TextEncoding::Utf16Le => "utf-16-le",
            TextEncoding::Utf32Be => "utf-32-be",
            TextEncoding::Utf32Le => "utf-32-le",
        }
    }

    /// Decodes wire bytes under the given policy.
    pub fn decode(&self, bytes: &[u8], policy: TextPolicy) -> Result<String, FramingError> {
        match self {
            TextEncoding::Utf8 => decode_utf8(bytes, policy),
            TextEncoding::Ascii => decode_ascii(bytes, policy),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|b| char::from(*b)).collect()),
            TextEncoding::Utf16Be => decode_utf16(bytes, policy, u16::from_be_bytes),
            TextEncoding::Utf16Le => decode_utf16(bytes, policy, u16::from_le_bytes),
            TextEncoding::Utf32Be => decode_utf32(bytes, policy, u32::from_be_bytes),
            TextEncoding::Utf32Le => decode_utf32(bytes, policy, u32::from_le_bytes),
        }
    }

    /// Encodes text into wire bytes under the given policy.
    pub fn encode(&self, text: &str, policy: TextPolicy) -> Result<Vec<u8>, FramingError> {
        match self {
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            TextEncoding::Ascii => encode_narrow(text, policy, 0x7F, "ascii"),
            TextEncoding::Latin1 => encode_narrow(text, policy, 0xFF, "latin-1"),
            TextEncoding::Utf16Be => Ok(text
                .encode_utf16()
                .flat_map(|unit| unit.to_be_bytes())
                .collect()),
            TextEncoding::Utf16Le => Ok(text
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect()),
            TextEncoding::Utf32Be => Ok(text
                .chars()
                .flat_map(|c| u32::from(c).to_be_bytes())
                .collect()),
            TextEncoding::Utf32Le => Ok(text
                .chars()
                .flat_map(|c| u32::from(c).to_le_bytes())
                .collect()),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str(self.label())
    }
}

fn codec_error(detail: String) -> FramingError {
    FramingError::Codec { detail }
}

fn decode_utf8(bytes: &[u8], policy: TextPolicy) -> Result<String, FramingError> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(e) => match policy {
            TextPolicy::Strict => Err(codec_error(format!("invalid utf-8: {e}"))),
            TextPolicy::Replace => Ok(String::from_utf8_lossy(bytes).into_owned()),
            TextPolicy::Ignore => Ok(String::from_utf8_lossy(bytes)
                .chars()
                .filter(|c| *c != char::REPLACEMENT_CHARACTER)
                .collect()),
        },
    }
}

fn decode_ascii(bytes: &[u8], policy: TextPolicy) -> Result<String, FramingError> {
    let mut out = String::with_capacity(bytes.len());
    for b in bytes {
        if b.is_ascii() {
            out.push(char::from(*b));
        } else {
            match policy {
                TextPolicy::Strict => {
                    return Err(codec_error(format!("byte {b:#04x} is not ascii")));
                }
                TextPolicy::Ignore => {}
                TextPolicy::Replace => out.push(char::REPLACEMENT_CHARACTER),
            }
        }
    }
    Ok(out)
}

fn decode_utf16(
    bytes: &[u8],
    policy: TextPolicy,
    unit: fn([u8; 2]) -> u16,
) -> Result<String, FramingError> {
    if bytes.len() % 2 != 0 && policy == TextPolicy::Strict {
        return Err(codec_error(format!(
            "utf-16 data has odd byte length {}",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    let mut out = String::with_capacity(units.len());
    for decoded in char::decode_utf16(units) {
        match decoded {
            Ok(c) => out.push(c),
            Err(e) => match policy {
                TextPolicy::Strict => {
                    return Err(codec_error(format!("invalid utf-16: {e}")));
                }
                TextPolicy::Ignore => {}
                TextPolicy::Replace => out.push(char::REPLACEMENT_CHARACTER),
            },
        }
    }
    if bytes.len() % 2 != 0 && policy == TextPolicy::Replace {
        out.push(char::REPLACEMENT_CHARACTER);
    }
    Ok(out)
}

fn decode_utf32(
    bytes: &[u8],
    policy: TextPolicy,
    unit: fn([u8; 4]) -> u32,
) -> Result<String, FramingError> {
    if bytes.len() % 4 != 0 && policy == TextPolicy::Strict {
        return Err(codec_error(format!(
            "utf-32 data length {} is not a multiple of four",
            bytes.len()
        )));
    }
    let mut out = String::with_capacity(bytes.len() / 4);
    for quad in bytes.chunks_exact(4) {
        let code = unit([quad[0], quad[1], quad[2], quad[3]]);
        match char::from_u32(code) {
            Some(c) => out.push(c),
            None => match policy {
                TextPolicy::Strict => {
                    return Err(codec_error(format!("{code:#x} is not a unicode scalar")));
                }
                TextPolicy::Ignore => {}
                TextPolicy::Replace => out.push(char::REPLACEMENT_CHARACTER),
            },
        }
    }
    if bytes.len() % 4 != 0 && policy == TextPolicy::Replace {
        out.push(char::REPLACEMENT_CHARACTER);
    }
    Ok(out)
}

fn encode_narrow(
    text: &str,
    policy: TextPolicy,
    max: u32,
    label: &str,
) -> Result<Vec<u8>, FramingError> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        let code = u32::from(c);
        if code <= max {
            out.push(code as u8);
        } else {
            match policy {
                TextPolicy::Strict => {
                    return Err(codec_error(format!("{c:?} cannot be encoded as {label}")));
                }
                TextPolicy::Ignore => {}
                TextPolicy::Replace => out.push(b'?'),
            }
        }
    }
    Ok(out)
}
