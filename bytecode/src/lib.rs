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
//! Reading, rewriting and writing JVM class files.
//!
//! The entry point is [`ClassFile`](crate::clazz::ClassFile), which owns the constant pool and the
//! method, field and attribute structures. Method bodies are edited through a
//! [`CodeIterator`](crate::code::CodeIterator), either directly or by a
//! [`TransformerChain`](crate::convert::TransformerChain).

#[macro_use]
extern crate bitflags;

#[macro_use]
extern crate classpatch_macros;

pub mod access;
pub mod attr;
pub mod clazz;
pub mod code;
pub mod compiler;
pub mod constants;
pub mod convert;
pub mod cp;
pub mod dynamic;
pub mod error;
pub mod loadable;
pub mod member;
pub mod mod_utf8;
pub mod prelude;
pub mod reflect;
pub mod rw;
pub mod ty;

#[cfg(test)]
mod tests;

pub use crate::error::{Error, Result};
pub use crate::rw::ReadWrite;
