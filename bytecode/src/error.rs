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
use std::borrow::Cow;

use thiserror::Error;

use crate::compiler::CompileError;
use crate::mod_utf8::MUTFError;
use crate::reflect::CannotInvoke;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("Invalid {0}: {1}")]
    Invalid(&'static str, Cow<'static, str>),
    #[error(transparent)]
    MUTF(#[from] MUTFError),
    #[error("Attribute length mismatch in {2}: declared {0} bytes but {1} bytes were consumed")]
    AttributeLength(u32, u32, String),
    #[error("Constant pool entry #{index} is {found}, expected {expected}")]
    Mismatch {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Unknown method handle reference kind: {0}")]
    UnknownReferenceKind(u8),
    #[error("dynamic call site without bootstrap table")]
    MissingBootstrapMethods,
    #[error("{0} overflows")]
    Overflow(&'static str),
    #[error("Cannot compile: {0}")]
    CannotCompile(#[from] CompileError),
    #[error(transparent)]
    CannotInvoke(#[from] CannotInvoke),
}

impl Error {
    /// Returns `true` if this error was caused by malformed or inconsistent class file data.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Error::CannotCompile(_) | Error::CannotInvoke(_))
    }

    pub(crate) fn invalid<S: Into<Cow<'static, str>>>(what: &'static str, detail: S) -> Self {
        Error::Invalid(what, detail.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
