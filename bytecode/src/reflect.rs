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
//! A uniform error for failed reflective invocations.

use std::error::Error as StdError;

use thiserror::Error;

type Cause = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InvocationFailure {
    /// The invoked method threw.
    TargetException,
    IllegalAccess,
    ClassNotFound,
    /// Anything else, described by a plain message.
    Other,
}

/// A reflective call that could not be made, or that threw.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CannotInvoke {
    kind: InvocationFailure,
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl CannotInvoke {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            kind: InvocationFailure::Other,
            message: reason.into(),
            cause: None,
        }
    }

    fn caused_by<E: Into<Cause>>(kind: InvocationFailure, cause: E) -> Self {
        let cause = cause.into();
        Self {
            kind,
            message: format!("by {}", cause),
            cause: Some(cause),
        }
    }

    /// Wraps the exception thrown by the invoked method.
    pub fn target_exception<E: Into<Cause>>(cause: E) -> Self {
        Self::caused_by(InvocationFailure::TargetException, cause)
    }

    pub fn illegal_access<E: Into<Cause>>(cause: E) -> Self {
        Self::caused_by(InvocationFailure::IllegalAccess, cause)
    }

    pub fn class_not_found<E: Into<Cause>>(cause: E) -> Self {
        Self::caused_by(InvocationFailure::ClassNotFound, cause)
    }

    pub fn kind(&self) -> InvocationFailure {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped failure, `None` when created from a plain reason.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}
