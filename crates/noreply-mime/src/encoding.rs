//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Maximum line length for Quoted-Printable encoding.
const MAX_LINE_LENGTH: usize = 76;

/// Largest UTF-8 payload per RFC 2047 encoded-word (keeps each word within 75 chars).
const ENCODED_WORD_BYTES: usize = 45;

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input become hard CRLF breaks; long lines get soft
/// breaks so no encoded line exceeds 76 characters.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut lines = text.split('\n').peekable();

    while let Some(line) = lines.next() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        encode_quoted_printable_line(line.as_bytes(), &mut result);
        if lines.peek().is_some() {
            result.push_str("\r\n");
        }
    }

    result
}

fn encode_quoted_printable_line(line: &[u8], out: &mut String) {
    let mut line_length = 0;

    for (i, &byte) in line.iter().enumerate() {
        let is_last = i + 1 == line.len();
        let literal = match byte {
            // Printable ASCII except '='
            b'!'..=b'<' | b'>'..=b'~' => true,
            // Whitespace is only encoded at the end of a line
            b' ' | b'\t' => !is_last,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Leave room for the '=' of a soft line break
        if line_length + width > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        line_length += width;
    }
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// Hard CRLF line breaks are returned as `\n`.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'=' => {
                let rest = &bytes[i + 1..];
                // Soft line break
                if rest.starts_with(b"\r\n") {
                    i += 3;
                    continue;
                }
                if rest.starts_with(b"\n") {
                    i += 2;
                    continue;
                }

                let byte = rest
                    .get(..2)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| {
                        Error::InvalidEncoding(format!("Invalid escape sequence at offset {i}"))
                    })?;
                result.push(byte);
                i += 3;
            }
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                result.push(b'\n');
                i += 2;
            }
            byte => {
                result.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8(result).map_err(Into::into)
}

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?charset?B?encoded-text?=`. Pure ASCII values are returned
/// unchanged; longer values are split into several encoded-words separated
/// by spaces.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if text.is_ascii() && !text.contains("=?") {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_BYTES {
            words.push(format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())));
    }

    words.join(" ")
}

/// Decodes an RFC 2047 encoded header value.
///
/// Whitespace between adjacent encoded-words is dropped; plain words are
/// kept as they are.
///
/// # Errors
///
/// Returns an error if an encoded-word is malformed.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    if !text.contains("=?") {
        return Ok(text.to_string());
    }

    let mut result = String::with_capacity(text.len());
    let mut previous_encoded = false;

    for (i, token) in text.split_whitespace().enumerate() {
        match decode_encoded_word(token)? {
            Some(decoded) => {
                if i > 0 && !previous_encoded {
                    result.push(' ');
                }
                result.push_str(&decoded);
                previous_encoded = true;
            }
            None => {
                if i > 0 {
                    result.push(' ');
                }
                result.push_str(token);
                previous_encoded = false;
            }
        }
    }

    Ok(result)
}

fn decode_encoded_word(token: &str) -> Result<Option<String>> {
    let Some(inner) = token
        .strip_prefix("=?")
        .and_then(|rest| rest.strip_suffix("?="))
    else {
        return Ok(None);
    };

    let parts: Vec<&str> = inner.split('?').collect();
    let [_charset, encoding, encoded_text] = parts.as_slice() else {
        return Err(Error::InvalidEncoding(format!(
            "Invalid RFC 2047 word: {token}"
        )));
    };

    match encoding.to_ascii_uppercase().as_str() {
        "B" => {
            let decoded = decode_base64(encoded_text)?;
            Ok(Some(String::from_utf8(decoded)?))
        }
        "Q" => decode_quoted_printable(&encoded_text.replace('_', " ")).map(Some),
        other => Err(Error::InvalidEncoding(format!("Unknown encoding: {other}"))),
    }
}
