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
//! Context-free binary reading and writing.

use std::convert::TryFrom;
use std::io::{Read, Write};

use crate::mod_utf8::{modified_utf8_to_string, string_to_modified_utf8};
use crate::{Error, Result};

/// The generic read and write trait. This indicates a structure can be read without additional contextual information.
///
/// This trait can be derived with #[derive(ReadWrite)] if all the types it can hold are also `ReadWrite`.
/// Furthermore, all integer types implement `ReadWrite`, in big-endian byte order.
pub trait ReadWrite
where
    Self: Sized,
{
    fn read_from<T: Read>(reader: &mut T) -> Result<Self>;
    fn write_to<T: Write>(&self, writer: &mut T) -> Result<()>;
}

macro_rules! impl_readwrite_nums {
    ($($i:ty, $s:literal)*) => {
        $(
            impl ReadWrite for $i {
                fn read_from<T: Read>(reader: &mut T) -> Result<Self> {
                    let mut bytes = [0u8; $s];
                    reader.read_exact(&mut bytes)?;
                    Ok(<$i>::from_be_bytes(bytes))
                }
                fn write_to<T: Write>(&self, writer: &mut T) -> Result<()> {
                    writer.write_all(&self.to_be_bytes())?;
                    Ok(())
                }
            }
        )*
    };
}
impl_readwrite_nums! { u8, 1  i8, 1  u16, 2  i16, 2  u32, 4  i32, 4  f32, 4  u64, 8  i64, 8  f64, 8 }

/// Strings are prefixed with the length of their modified UTF-8 form.
impl ReadWrite for String {
    fn read_from<T: Read>(reader: &mut T) -> Result<Self> {
        let length = u16::read_from(reader)?;
        let buf = read_bytes(reader, length as usize)?;
        Ok(modified_utf8_to_string(&buf)?)
    }

    fn write_to<T: Write>(&self, writer: &mut T) -> Result<()> {
        let bytes = string_to_modified_utf8(self);
        u16_len(bytes.len(), "string length")?.write_to(writer)?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}

/// Vectors are prefixed with a `u16` element count, which is the case for almost every table in a class file.
impl<E: ReadWrite> ReadWrite for Vec<E> {
    fn read_from<T: Read>(reader: &mut T) -> Result<Self> {
        let count = u16::read_from(reader)?;
        (0..count).map(|_| E::read_from(reader)).collect()
    }

    fn write_to<T: Write>(&self, writer: &mut T) -> Result<()> {
        u16_len(self.len(), "table length")?.write_to(writer)?;
        for e in self {
            e.write_to(writer)?;
        }
        Ok(())
    }
}

/// Reads exactly `len` bytes.
pub fn read_bytes<T: Read>(reader: &mut T, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(0x10000));
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, got {}", len, buf.len()),
        )
        .into());
    }
    Ok(buf)
}

#[inline]
pub(crate) fn u16_len(len: usize, what: &'static str) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::Overflow(what))
}

#[inline]
pub(crate) fn u32_len(len: usize, what: &'static str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::Overflow(what))
}
