// UTF-8 → target encoding converters
//
// Pure-Rust implementations for converting UTF-8 encoded bytes to other
// character encodings. No external crate dependencies.

/// Target encoding for output conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingTarget {
    Utf8,
    Latin1,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

/// Convert UTF-8 bytes to the target encoding.
///
/// For `Utf8`, returns a copy of the input (caller can optimise this away).
/// For other encodings, decodes UTF-8 and re-encodes to the target.
pub fn encode_utf8_to_target(input: &[u8], target: EncodingTarget) -> Vec<u8> {
    match target {
        EncodingTarget::Utf8 => input.to_vec(),
        EncodingTarget::Latin1 => utf8_to_latin1(input),
        EncodingTarget::Utf16Le => utf8_to_utf16(input, false),
        EncodingTarget::Utf16Be => utf8_to_utf16(input, true),
        EncodingTarget::Utf32Le => utf8_to_utf32(input, false),
        EncodingTarget::Utf32Be => utf8_to_utf32(input, true),
    }
}

/// Convert UTF-8 to Latin-1 (ISO-8859-1).
///
/// Fast path: if all bytes are ASCII (< 0x80), return a copy as-is.
/// Otherwise decode UTF-8 char-by-char and emit single bytes.
/// Codepoints > 255 are replaced with '?' to avoid panics.
pub fn utf8_to_latin1(input: &[u8]) -> Vec<u8> {
    // Fast check: if all ASCII, shortcut
    if input.iter().all(|&b| b < 0x80) {
        return input.to_vec();
    }

    let s = match std::str::from_utf8(input) {
        Ok(s) => s,
        Err(_) => return input.to_vec(), // not valid UTF-8, pass through
    };

    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        let cp = ch as u32;
        if cp <= 255 {
            out.push(cp as u8);
        } else {
            out.push(b'?'); // replacement for unmappable codepoints
        }
    }
    out
}

/// Convert UTF-8 to UTF-16 (little-endian or big-endian).
pub fn utf8_to_utf16(input: &[u8], big_endian: bool) -> Vec<u8> {
    let s = match std::str::from_utf8(input) {
        Ok(s) => s,
        Err(_) => return input.to_vec(),
    };

    let mut out = Vec::with_capacity(s.len() * 2);
    for code_unit in s.encode_utf16() {
        let bytes = if big_endian {
            code_unit.to_be_bytes()
        } else {
            code_unit.to_le_bytes()
        };
        out.extend_from_slice(&bytes);
    }
    out
}

/// Convert UTF-8 to UTF-32 (little-endian or big-endian).
pub fn utf8_to_utf32(input: &[u8], big_endian: bool) -> Vec<u8> {
    let s = match std::str::from_utf8(input) {
        Ok(s) => s,
        Err(_) => return input.to_vec(),
    };

    let mut out = Vec::with_capacity(s.len() * 4);
    for ch in s.chars() {
        let cp = ch as u32;
        let bytes = if big_endian {
            cp.to_be_bytes()
        } else {
            cp.to_le_bytes()
        };
        out.extend_from_slice(&bytes);
    }
    out
}

// ==========================================================================
// Extend variants — append encoded bytes directly into an existing buffer
// ==========================================================================

/// Encode UTF-8 bytes and append to output buffer (no intermediate allocation).
pub fn encode_utf8_extend(out: &mut Vec<u8>, input: &[u8], target: EncodingTarget) {
    match target {
        EncodingTarget::Utf8 => out.extend_from_slice(input),
        EncodingTarget::Latin1 => extend_latin1(out, input),
        EncodingTarget::Utf16Le => extend_utf16(out, input, false),
        EncodingTarget::Utf16Be => extend_utf16(out, input, true),
        EncodingTarget::Utf32Le => extend_utf32(out, input, false),
        EncodingTarget::Utf32Be => extend_utf32(out, input, true),
    }
}

fn extend_latin1(out: &mut Vec<u8>, input: &[u8]) {
    if input.iter().all(|&b| b < 0x80) {
        out.extend_from_slice(input);
        return;
    }
    let s = match std::str::from_utf8(input) {
        Ok(s) => s,
        Err(_) => {
            out.extend_from_slice(input);
            return;
        }
    };
    out.reserve(s.len());
    for ch in s.chars() {
        let cp = ch as u32;
        if cp <= 255 {
            out.push(cp as u8);
        } else {
            out.push(b'?');
        }
    }
}

fn extend_utf16(out: &mut Vec<u8>, input: &[u8], big_endian: bool) {
    let s = match std::str::from_utf8(input) {
        Ok(s) => s,
        Err(_) => {
            out.extend_from_slice(input);
            return;
        }
    };
    out.reserve(s.len() * 2);
    for code_unit in s.encode_utf16() {
        let bytes = if big_endian {
            code_unit.to_be_bytes()
        } else {
            code_unit.to_le_bytes()
        };
        out.extend_from_slice(&bytes);
    }
}

fn extend_utf32(out: &mut Vec<u8>, input: &[u8], big_endian: bool) {
    let s = match std::str::from_utf8(input) {
        Ok(s) => s,
        Err(_) => {
            out.extend_from_slice(input);
            return;
        }
    };
    out.reserve(s.len() * 4);
    for ch in s.chars() {
        let cp = ch as u32;
        let bytes = if big_endian {
            cp.to_be_bytes()
        } else {
            cp.to_le_bytes()
        };
        out.extend_from_slice(&bytes);
    }
}

// ==========================================================================
// Tests
// ==========================================================================
