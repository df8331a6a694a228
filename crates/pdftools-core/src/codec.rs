//! Radix-64 transcoding for moving document bytes across text boundaries
//!
//! `encode`/`decode` use the `base64` engine. The `*_manual` functions are a
//! lookup-table implementation of the same alphabet for hosts without the
//! engine; both paths produce identical output.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{PdfToolsError, Result};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Marker for bytes outside the alphabet in the decode table
const INVALID: u8 = 0xFF;

const DECODE_TABLE: [u8; 256] = build_decode_table();

const fn build_decode_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < 64 {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// Encode bytes as padded radix-64 text
pub fn encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode radix-64 text back to bytes
///
/// ASCII whitespace is ignored. Input the strict engine rejects (for example
/// missing `=` padding) is retried with the table decoder.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    match BASE64.decode(compact.as_bytes()) {
        Ok(bytes) => Ok(bytes),
        Err(_) => decode_manual(&compact),
    }
}

/// Table-driven encoder: 3 raw bytes into 4 symbols, `=` padded
pub fn encode_manual(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);

    for chunk in bytes.chunks(3) {
        let a = chunk[0];
        let b = chunk.get(1).copied().unwrap_or(0);
        let c = chunk.get(2).copied().unwrap_or(0);

        out.push(ALPHABET[(a >> 2) as usize] as char);
        out.push(ALPHABET[(((a & 0x03) << 4) | (b >> 4)) as usize] as char);
        if chunk.len() > 1 {
            out.push(ALPHABET[(((b & 0x0F) << 2) | (c >> 6)) as usize] as char);
        } else {
            out.push('=');
        }
        if chunk.len() > 2 {
            out.push(ALPHABET[(c & 0x3F) as usize] as char);
        } else {
            out.push('=');
        }
    }

    out
}

/// Table-driven decoder
///
/// Trailing padding is optional; whitespace is skipped. A dangling single
/// symbol or any byte outside the alphabet is rejected.
pub fn decode_manual(text: &str) -> Result<Vec<u8>> {
    let symbols: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let trimmed = match symbols.iter().rposition(|&b| b != b'=') {
        Some(last) => &symbols[..=last],
        None => &symbols[..0],
    };

    if trimmed.len() % 4 == 1 {
        return Err(PdfToolsError::InvalidInput(
            "base64 input has a dangling symbol".into(),
        ));
    }

    let mut out = Vec::with_capacity(trimmed.len() * 3 / 4);
    for block in trimmed.chunks(4) {
        let mut values = [0u8; 4];
        for (slot, &symbol) in values.iter_mut().zip(block) {
            let value = DECODE_TABLE[symbol as usize];
            if value == INVALID {
                return Err(PdfToolsError::InvalidInput(format!(
                    "invalid base64 symbol: {:?}",
                    symbol as char
                )));
            }
            *slot = value;
        }

        out.push((values[0] << 2) | (values[1] >> 4));
        if block.len() > 2 {
            out.push(((values[1] & 0x0F) << 4) | (values[2] >> 2));
        }
        if block.len() > 3 {
            out.push(((values[2] & 0x03) << 6) | values[3]);
        }
    }

    Ok(out)
}
