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
//! Loadable values: constants that bootstrap methods receive as static arguments.

use std::convert::TryFrom;

use crate::cp::{ConstPool, MemberKind, RawConstantEntry};
use crate::{Error, Result};

/// The kind of a method handle. It generally represents an instruction related to a member with one exception.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
#[repr(u8)]
pub enum MethodHandleKind {
    /// A method handle reading from a virtual field.
    GetField = 1,
    /// A method handle reading from a static field.
    GetStatic = 2,
    /// A method handle writing to a virtual field.
    PutField = 3,
    /// A method handle writing to a static field.
    PutStatic = 4,
    /// A method handle invoking a virtual method.
    InvokeVirtual = 5,
    /// A method handle invoking a static method.
    InvokeStatic = 6,
    /// A method handle invoking a special method.
    InvokeSpecial = 7,
    /// A method handle invoking a constructor.
    NewInvokeSpecial = 8,
    /// A method handle invoking an interface method.
    InvokeInterface = 9,
}

impl TryFrom<u8> for MethodHandleKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use MethodHandleKind::*;
        Ok(match value {
            1 => GetField,
            2 => GetStatic,
            3 => PutField,
            4 => PutStatic,
            5 => InvokeVirtual,
            6 => InvokeStatic,
            7 => InvokeSpecial,
            8 => NewInvokeSpecial,
            9 => InvokeInterface,
            v => return Err(v),
        })
    }
}

impl MethodHandleKind {
    /// `GetField` through `PutStatic`.
    #[inline]
    pub fn is_field(self) -> bool {
        (self as u8) <= 4
    }

    /// `InvokeVirtual` through `NewInvokeSpecial`.
    #[inline]
    pub fn is_method(self) -> bool {
        (5..=8).contains(&(self as u8))
    }

    #[inline]
    pub fn is_interface_method(self) -> bool {
        self == MethodHandleKind::InvokeInterface
    }

    /// Bootstrap methods are invoked either as static methods or as constructors.
    #[inline]
    pub fn is_valid_bootstrap(self) -> bool {
        matches!(self, MethodHandleKind::InvokeStatic | MethodHandleKind::NewInvokeSpecial)
    }

    /// Whether a member reference of kind `member` may back a handle of this kind.
    fn accepts(self, member: MemberKind) -> bool {
        use MethodHandleKind::*;
        match self {
            GetField | GetStatic | PutField | PutStatic => member == MemberKind::Field,
            InvokeVirtual | NewInvokeSpecial => member == MemberKind::Method,
            InvokeStatic | InvokeSpecial => {
                matches!(member, MemberKind::Method | MemberKind::InterfaceMethod)
            }
            InvokeInterface => member == MemberKind::InterfaceMethod,
        }
    }
}

/// A decoded `CONSTANT_MethodHandle` entry.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MethodHandleReference {
    pub kind: MethodHandleKind,
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
}

impl MethodHandleReference {
    /// Decodes the method handle at `idx`, checking that its member reference suits its kind.
    pub fn decode(cp: &ConstPool, idx: u16) -> Result<Self> {
        let kind = cp.get_method_handle_kind(idx)?;
        let reference = cp.get_method_handle_index(idx)?;
        let member = cp.get_member_ref(reference)?;
        if !kind.accepts(member.kind) {
            return Err(Error::invalid(
                "method handle",
                format!(
                    "#{} of kind {:?} refers to {:?} #{}",
                    idx, kind, member.kind, reference
                ),
            ));
        }
        Ok(Self {
            kind,
            class_name: member.class_name.to_owned(),
            name: member.name.to_owned(),
            descriptor: member.descriptor.to_owned(),
        })
    }

    #[inline]
    pub fn is_field_ref(&self) -> bool {
        self.kind.is_field()
    }

    #[inline]
    pub fn is_method_ref(&self) -> bool {
        self.kind.is_method()
    }

    #[inline]
    pub fn is_interface_method_ref(&self) -> bool {
        self.kind.is_interface_method()
    }
}

/// A class constant, in internal form or as an array descriptor.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ConstClassInfo {
    pub name: String,
}

/// A method type constant.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ConstMethodType {
    pub descriptor: String,
}

/// A dynamically computed constant.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ConstDynamic {
    /// Position of its bootstrap method in the BootstrapMethods table.
    pub bootstrap_index: u16,
    pub name: String,
    pub descriptor: String,
}

/// A static argument passed to a bootstrap method.
#[derive(Clone, PartialEq, Debug)]
pub enum BootstrapArgument {
    String(String),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Class(ConstClassInfo),
    MethodType(ConstMethodType),
    MethodHandle(MethodHandleReference),
    Dynamic(ConstDynamic),
}

impl BootstrapArgument {
    /// Decodes the loadable constant at `idx`.
    pub fn decode(cp: &ConstPool, idx: u16) -> Result<Self> {
        Ok(match cp.get_entry(idx)? {
            RawConstantEntry::String(s) => BootstrapArgument::String(cp.get_utf8_info(*s)?.to_owned()),
            RawConstantEntry::Int(i) => BootstrapArgument::Integer(*i),
            RawConstantEntry::Long(l) => BootstrapArgument::Long(*l),
            RawConstantEntry::Float(f) => BootstrapArgument::Float(*f),
            RawConstantEntry::Double(d) => BootstrapArgument::Double(*d),
            RawConstantEntry::Class(n) => BootstrapArgument::Class(ConstClassInfo {
                name: cp.get_utf8_info(*n)?.to_owned(),
            }),
            RawConstantEntry::MethodType(d) => BootstrapArgument::MethodType(ConstMethodType {
                descriptor: cp.get_utf8_info(*d)?.to_owned(),
            }),
            RawConstantEntry::MethodHandle(..) => {
                BootstrapArgument::MethodHandle(MethodHandleReference::decode(cp, idx)?)
            }
            RawConstantEntry::Dynamic(bootstrap_index, _) => BootstrapArgument::Dynamic(ConstDynamic {
                bootstrap_index: *bootstrap_index,
                name: cp.get_dynamic_name(idx)?.to_owned(),
                descriptor: cp.get_dynamic_type(idx)?.to_owned(),
            }),
            other => {
                return Err(Error::Mismatch {
                    index: idx,
                    expected: "loadable constant",
                    found: other.kind_name(),
                })
            }
        })
    }
}
