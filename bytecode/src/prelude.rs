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
//! Useful re-exports that can be reused.

pub use std::io::{Read, Write};

pub use crate::access::AccessFlags;
pub use crate::attr::*;
pub use crate::clazz::ClassFile;
pub use crate::code::{instruction_length, CodeIterator, Gap};
pub use crate::compiler::*;
pub use crate::convert::*;
pub use crate::cp::{ConstPool, MemberKind, MemberRef, RawConstantEntry};
pub use crate::dynamic::*;
pub use crate::loadable::*;
pub use crate::member::*;
pub use crate::ty::*;
pub use crate::{Error, ReadWrite, Result};
