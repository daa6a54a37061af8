//! String payload encoding for data objects
//!
//! String data objects carry a 16-byte sub-header (encoding code, payload
//! byte length, two reserved words) followed by the raw string bytes.
//! Encoding code 2 means UTF-8; every other value is UTF-16 little-endian,
//! which is what players write by default.

/// Encoding code for UTF-16LE payloads (the common case).
pub const ENCODING_UTF16: u32 = 1;
/// Encoding code for UTF-8 payloads.
pub const ENCODING_UTF8: u32 = 2;

/// Byte length of the string sub-header preceding the payload.
pub const STRING_SUBHEADER_LEN: usize = 16;

/// True when the encoding code selects UTF-8 rather than UTF-16LE.
pub fn is_utf8(encoding: u32) -> bool {
    encoding == ENCODING_UTF8
}

/// Human-readable encoding name for diagnostics.
pub fn encoding_name(encoding: u32) -> &'static str {
    if is_utf8(encoding) {
        "UTF-8"
    } else {
        "UTF-16LE"
    }
}

/// Decode payload bytes under the given encoding code.
///
/// Returns the text plus a flag that is true when the bytes were not valid
/// under the declared encoding and replacement characters were substituted.
pub fn decode_payload(encoding: u32, bytes: &[u8]) -> (String, bool) {
    if is_utf8(encoding) {
        match std::str::from_utf8(bytes) {
            Ok(s) => (s.to_string(), false),
            Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
        }
    } else {
        decode_utf16le(bytes)
    }
}

/// Encode text under the given encoding code.
pub fn encode_payload(encoding: u32, text: &str) -> Vec<u8> {
    if is_utf8(encoding) {
        text.as_bytes().to_vec()
    } else {
        encode_utf16le(text)
    }
}

/// Decode UTF-16LE bytes, flagging odd lengths and unpaired surrogates.
pub fn decode_utf16le(bytes: &[u8]) -> (String, bool) {
    let mut lossy = bytes.len() % 2 != 0;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let text = match String::from_utf16(&units) {
        Ok(s) => s,
        Err(_) => {
            lossy = true;
            String::from_utf16_lossy(&units)
        }
    };
    (text, lossy)
}

/// Encode text as UTF-16LE bytes.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}
