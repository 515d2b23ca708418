//! Payload decoding with encoding fallback.
//!
//! Field exports come from Windows CAD tools and GNSS software as often as
//! from spreadsheets, so the encoding is never declared. Candidates are tried
//! in order: UTF-8, Latin-1, Windows-1252.

use encoding_rs::WINDOWS_1252;
use serde::Serialize;
use std::fmt::{Display, Formatter};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encoding a payload was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadEncoding {
    Utf8,
    Latin1,
    Windows1252,
}

impl Display for PayloadEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Windows1252 => "windows-1252",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub text: String,
    pub encoding: PayloadEncoding,
}

/// Decodes raw bytes using the first candidate that accepts them.
///
/// Latin-1 accepts any byte, so it is only taken when the payload has no
/// C1 control bytes (0x80..=0x9F); those are printable characters in
/// Windows-1252 (`€`, `“`, `”`) and almost never intended as controls.
pub fn decode_payload(bytes: &[u8]) -> DecodedPayload {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedPayload {
            text: text.to_string(),
            encoding: PayloadEncoding::Utf8,
        };
    }

    if !bytes.iter().any(|byte| (0x80..=0x9F).contains(byte)) {
        return DecodedPayload {
            text: encoding_rs::mem::decode_latin1(bytes).into_owned(),
            encoding: PayloadEncoding::Latin1,
        };
    }

    let (text, _had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    DecodedPayload {
        text: text.into_owned(),
        encoding: PayloadEncoding::Windows1252,
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_payload, PayloadEncoding};

    #[test]
    fn utf8_wins_when_valid() {
        let decoded = decode_payload("V01\tJoão".as_bytes());
        assert_eq!(decoded.encoding, PayloadEncoding::Utf8);
        assert_eq!(decoded.text, "V01\tJoão");
    }

    #[test]
    fn utf8_bom_is_dropped() {
        let decoded = decode_payload(b"\xEF\xBB\xBFV01");
        assert_eq!(decoded.text, "V01");
        assert_eq!(decoded.encoding, PayloadEncoding::Utf8);
    }

    #[test]
    fn latin1_decodes_accented_text() {
        // "Jo\xe3o" is "João" in Latin-1 and invalid UTF-8.
        let decoded = decode_payload(b"Jo\xe3o 27\xb027'");
        assert_eq!(decoded.encoding, PayloadEncoding::Latin1);
        assert_eq!(decoded.text, "João 27°27'");
    }

    #[test]
    fn c1_bytes_fall_through_to_windows_1252() {
        let decoded = decode_payload(b"\x93Rua\x94 \xe9");
        assert_eq!(decoded.encoding, PayloadEncoding::Windows1252);
        assert_eq!(decoded.text, "\u{201C}Rua\u{201D} é");
    }
}
