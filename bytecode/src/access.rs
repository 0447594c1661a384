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
use std::io::{Read, Write};

use crate::{ReadWrite, Result};

bitflags! {
    /// Access and property flags of classes, fields, methods and inner classes.
    ///
    /// Some bits are shared between flags whose meaning depends on where they appear.
    pub struct AccessFlags: u16 {
        // @formatter:off
        const ACC_PUBLIC       = 0x0001;
        const ACC_PRIVATE      = 0x0002;
        const ACC_PROTECTED    = 0x0004;
        const ACC_STATIC       = 0x0008;
        const ACC_FINAL        = 0x0010;
        const ACC_SUPER        = 0x0020;
        const ACC_SYNCHRONIZED = 0x0020;
        const ACC_VOLATILE     = 0x0040;
        const ACC_BRIDGE       = 0x0040;
        const ACC_VARARGS      = 0x0080;
        const ACC_TRANSIENT    = 0x0080;
        const ACC_NATIVE       = 0x0100;
        const ACC_INTERFACE    = 0x0200;
        const ACC_ABSTRACT     = 0x0400;
        const ACC_STRICT       = 0x0800;
        const ACC_SYNTHETIC    = 0x1000;
        const ACC_ANNOTATION   = 0x2000;
        const ACC_ENUM         = 0x4000;
        const ACC_MODULE       = 0x8000;
        // @formatter:on
    }
}

impl AccessFlags {
    #[inline]
    pub fn is_static(self) -> bool {
        self.contains(AccessFlags::ACC_STATIC)
    }

    #[inline]
    pub fn is_private(self) -> bool {
        self.contains(AccessFlags::ACC_PRIVATE)
    }
}

impl ReadWrite for AccessFlags {
    fn read_from<T: Read>(reader: &mut T) -> Result<AccessFlags> {
        // every bit has a flag so nothing is dropped here
        Ok(AccessFlags::from_bits_truncate(u16::read_from(reader)?))
    }

    fn write_to<T: Write>(&self, writer: &mut T) -> Result<()> {
        self.bits().write_to(writer)
    }
}
