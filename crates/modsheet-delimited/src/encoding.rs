use encoding_rs::{UTF_16LE, UTF_8, WINDOWS_1252};

/// Number of leading bytes inspected when guessing an encoding without a BOM.
pub const SNIFF_WINDOW: usize = 2048;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Byte encoding of an export, as detected on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    /// Windows-1252 (aka CP-1252), the fallback for bytes that aren't valid UTF-8.
    Windows1252,
}

impl TextEncoding {
    pub fn is_utf16(self) -> bool {
        matches!(self, TextEncoding::Utf16Le | TextEncoding::Utf16Be)
    }

    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Guess the encoding of `bytes`. Never fails.
///
/// A UTF-16 BOM wins. Otherwise more than 20% NUL bytes in the sniff window means BOM-less
/// UTF-16LE, a window that is valid UTF-8 means UTF-8, and anything else is Windows-1252. A
/// multi-byte sequence cut off by the end of the window does not count as invalid UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> TextEncoding {
    if bytes.starts_with(&UTF16_LE_BOM) {
        return TextEncoding::Utf16Le;
    }
    if bytes.starts_with(&UTF16_BE_BOM) {
        return TextEncoding::Utf16Be;
    }

    let head = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    let nuls = head.iter().filter(|b| **b == 0).count();
    if !head.is_empty() && nuls * 5 > head.len() {
        return TextEncoding::Utf16Le;
    }

    match std::str::from_utf8(head) {
        Ok(_) => TextEncoding::Utf8,
        Err(err) if err.error_len().is_none() => TextEncoding::Utf8,
        Err(_) => TextEncoding::Windows1252,
    }
}

/// Decode `bytes` as `encoding`, dropping a matching BOM. Malformed input becomes U+FFFD.
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Utf8 => UTF_8.decode_with_bom_removal(bytes).0.into_owned(),
        TextEncoding::Utf16Le => UTF_16LE.decode_with_bom_removal(bytes).0.into_owned(),
        TextEncoding::Utf16Be => {
            let swapped: Vec<u8> = bytes
                .chunks(2)
                .flat_map(|pair| pair.iter().rev().copied())
                .collect();
            UTF_16LE.decode_with_bom_removal(&swapped).0.into_owned()
        }
        TextEncoding::Windows1252 => WINDOWS_1252
            .decode_without_bom_handling(bytes)
            .0
            .into_owned(),
    }
}

/// Encode text for writing back out.
///
/// Exports that arrived as UTF-16 (either byte order) go out as UTF-16LE with a BOM; everything
/// else goes out as UTF-8 with a BOM.
pub fn encode_for_output(text: &str, source: TextEncoding) -> Vec<u8> {
    if source.is_utf16() {
        // encoding_rs only encodes to UTF-8 for the UTF-16 labels.
        let mut out = Vec::with_capacity(UTF16_LE_BOM.len() + text.len() * 2);
        out.extend_from_slice(&UTF16_LE_BOM);
        for unit in text.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    } else {
        let mut out = Vec::with_capacity(UTF8_BOM.len() + text.len());
        out.extend_from_slice(&UTF8_BOM);
        out.extend_from_slice(text.as_bytes());
        out
    }
}
