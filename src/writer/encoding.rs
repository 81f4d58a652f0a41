//! Text decoding for files embedded into generated output.

use std::fmt;
use std::str::FromStr;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Encoding of a file read by `write_file` / `write_file_region`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8; a leading byte order mark is dropped.
    #[default]
    Utf8,
    /// UTF-16 little endian; a leading byte order mark is dropped.
    Utf16Le,
    /// UTF-16 big endian; a leading byte order mark is dropped.
    Utf16Be,
    /// ISO-8859-1, one byte per code point.
    Latin1,
}

impl Encoding {
    /// Decode `bytes` into a string. Invalid sequences become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => {
                let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                String::from_utf8_lossy(bytes).into_owned()
            }
            Encoding::Utf16Le => {
                let bytes = bytes.strip_prefix(UTF16_LE_BOM).unwrap_or(bytes);
                decode_utf16(bytes, u16::from_le_bytes)
            }
            Encoding::Utf16Be => {
                let bytes = bytes.strip_prefix(UTF16_BE_BOM).unwrap_or(bytes);
                decode_utf16(bytes, u16::from_be_bytes)
            }
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => write!(f, "utf-8"),
            Encoding::Utf16Le => write!(f, "utf-16le"),
            Encoding::Utf16Be => write!(f, "utf-16be"),
            Encoding::Latin1 => write!(f, "latin1"),
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Encoding::Utf16Le),
            "utf16be" | "utf-16be" => Ok(Encoding::Utf16Be),
            "latin1" | "iso-8859-1" | "binary" => Ok(Encoding::Latin1),
            other => Err(format!("Unsupported encoding: '{}'", other)),
        }
    }
}
