/*
 *     This file is part of Classpatch.
 *
 *     Classpatch is free software: you can redistribute it and/or modify
 *     it under the terms of the GNU Lesser General Public License as published by
 *     the Free Software Foundation, either version 3 of the License, or
 *     (at your option) any later version.
 *
 *     Classpatch is distributed in the hope that it will be useful,
 *     but WITHOUT ANY WARRANTY; without even the implied warranty of
 *     MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *     GNU General Public License for more details.
 *
 *     You should have received a copy of the GNU Lesser General Public License
 *     along with Classpatch. (LICENSE.md)  If not, see <https://www.gnu.org/licenses/>.
 */
//! Conversion between Java's modified UTF-8 and Rust strings.
//!
//! Modified UTF-8 differs from UTF-8 in two ways: the NUL character is encoded as two bytes so that
//! no string contains a zero byte, and characters outside the basic multilingual plane are
//! encoded as a surrogate pair with three bytes per surrogate instead of four bytes per character.
//!
//! Refer to the [JVM Spec](https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.4.7) for more info.

use thiserror::Error;

/// An error encountered during conversion.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum MUTFError {
    /// The last code unit is truncated.
    #[error("Malformed Input: Partial character at end")]
    PartialCharacterAtEnd,

    /// The byte at this index does not start or continue a valid code unit.
    #[error("Malformed Input around byte: {0}")]
    AroundByte(usize),

    /// A surrogate without its other half, which has no representation in a Rust string.
    #[error("Unpaired surrogate around byte: {0}")]
    UnpairedSurrogate(usize),
}

/// Decodes the UTF-16 code units of a modified UTF-8 buffer along with the byte offset each unit starts at.
fn code_units(buf: &[u8]) -> Result<Vec<(u16, usize)>, MUTFError> {
    let mut units = Vec::with_capacity(buf.len());
    let mut i = 0;
    while i < buf.len() {
        let b = buf[i];
        let width = match b {
            0x01..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            _ => return Err(MUTFError::AroundByte(i)),
        };
        let bytes = buf.get(i..i + width).ok_or(MUTFError::PartialCharacterAtEnd)?;
        if bytes[1..].iter().any(|c| c & 0xC0 != 0x80) {
            return Err(MUTFError::AroundByte(i));
        }
        let unit = match width {
            1 => b as u16,
            2 => ((b as u16 & 0x1F) << 6) | (bytes[1] as u16 & 0x3F),
            _ => ((b as u16 & 0x0F) << 12) | ((bytes[1] as u16 & 0x3F) << 6) | (bytes[2] as u16 & 0x3F),
        };
        units.push((unit, i));
        i += width;
    }
    Ok(units)
}

/// Converts a modified utf-8 sequence to an owned rust string.
pub fn modified_utf8_to_string(buf: &[u8]) -> Result<String, MUTFError> {
    // fast path: pure ASCII is identical in both encodings
    if buf.iter().all(|&b| b != 0 && b < 0x80) {
        return Ok(buf.iter().map(|&b| b as char).collect());
    }
    let units = code_units(buf)?;
    let mut str = String::with_capacity(buf.len());
    let mut iter = units.iter().peekable();
    while let Some(&(unit, off)) = iter.next() {
        let c = match unit {
            0xD800..=0xDBFF => match iter.peek() {
                Some(&&(low @ 0xDC00..=0xDFFF, _)) => {
                    iter.next();
                    0x10000 + (((unit as u32) - 0xD800) << 10) + (low as u32 - 0xDC00)
                }
                _ => return Err(MUTFError::UnpairedSurrogate(off)),
            },
            0xDC00..=0xDFFF => return Err(MUTFError::UnpairedSurrogate(off)),
            _ => unit as u32,
        };
        str.push(std::char::from_u32(c).ok_or(MUTFError::AroundByte(off))?);
    }
    Ok(str)
}

/// Converts a string to modified UTF-8.
///
/// This never fails: every Rust string has a modified UTF-8 representation.
pub fn string_to_modified_utf8(str: &str) -> Vec<u8> {
    let mut vec = Vec::with_capacity(str.len());
    for unit in str.encode_utf16() {
        match unit {
            0x01..=0x7F => vec.push(unit as u8),
            0x00 | 0x80..=0x7FF => {
                vec.push(0xC0 | (unit >> 6) as u8);
                vec.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                vec.push(0xE0 | (unit >> 12) as u8);
                vec.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                vec.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    vec
}
