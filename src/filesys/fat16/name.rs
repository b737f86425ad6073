//! 8.3 short name encoding

use super::constants::*;
use crate::filesys::FsError;
use arrayvec::ArrayString;

/// Padded on-disk name: 8 name bytes then 3 extension bytes
pub type ShortName = [u8; SHORT_NAME_LENGTH];

/// Display form of a short name, at most "XXXXXXXX.XXX"
pub type DisplayName = ArrayString<{ SHORT_NAME_LENGTH + 1 }>;

pub const DOT: ShortName = *b".          ";
pub const DOT_DOT: ShortName = *b"..         ";

fn encode_char(c: char) -> u8 {
    if c.is_ascii() {
        c.to_ascii_uppercase() as u8
    } else {
        b'_'
    }
}

/// Converts "readme.txt" into "README  TXT".
///
/// Splits on the first '.', truncates the base to 8 and the extension to 3
/// characters without complaint and pads with spaces.
pub fn format_fixed(name: &str) -> ShortName {
    match name {
        "." => return DOT,
        ".." => return DOT_DOT,
        _ => {}
    }

    let mut out = [b' '; SHORT_NAME_LENGTH];
    let (base, ext) = name.split_once('.').unwrap_or((name, ""));

    for (slot, c) in out[..MAX_FILENAME_LENGTH].iter_mut().zip(base.chars()) {
        *slot = encode_char(c);
    }
    for (slot, c) in out[MAX_FILENAME_LENGTH..].iter_mut().zip(ext.chars()) {
        *slot = encode_char(c);
    }
    out
}

/// Converts "README  TXT" back into "README.TXT"
pub fn decode_fixed(raw: &ShortName) -> DisplayName {
    let mut out = DisplayName::new();
    let base = trim_padding(&raw[..MAX_FILENAME_LENGTH]);
    let ext = trim_padding(&raw[MAX_FILENAME_LENGTH..]);

    for &b in base {
        out.push(decode_byte(b));
    }
    if !ext.is_empty() {
        out.push('.');
        for &b in ext {
            out.push(decode_byte(b));
        }
    }
    out
}

fn trim_padding(part: &[u8]) -> &[u8] {
    let end = part.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    &part[..end]
}

fn decode_byte(b: u8) -> char {
    if b.is_ascii() && !b.is_ascii_control() {
        b as char
    } else {
        '?'
    }
}

/// Checks a name before it is used to create or rename an entry
pub fn validate(name: &str) -> Result<ShortName, FsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FsError::InvalidName);
    }
    let raw = format_fixed(name);
    if raw[..MAX_FILENAME_LENGTH].iter().all(|&b| b == b' ') {
        return Err(FsError::InvalidName);
    }
    Ok(raw)
}
