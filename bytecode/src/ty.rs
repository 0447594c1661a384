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
//! A type represents a field descriptor or a method descriptor.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::take_till1;
use nom::character::complete::char;
use nom::combinator::{all_consuming, map, map_res, value};
use nom::multi::{many0, many1_count};
use nom::sequence::{delimited, pair};
use nom::IResult;

use crate::constants::insn::*;
use crate::Error;

/// A descriptor, field or method.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Type {
    /// `B`, a signed 8-bit integer.
    Byte,
    /// `C`, a UTF-16 code unit.
    Char,
    /// `D`, a double-precision floating point number.
    Double,
    /// `F`, a single-precision floating point number.
    Float,
    /// `I`, a signed 32-bit integer.
    Int,
    /// `J`, a signed 64-bit integer.
    Long,
    /// `Z`, a boolean.
    Boolean,
    /// `S`, a signed 16-bit integer.
    Short,
    /// A class or interface type, in internal form (`java/lang/String`).
    Ref(String),
    /// An array type with its dimension and component type.
    ArrayRef(u8, Box<Type>),
    /// A method descriptor. The return type is `None` for `void`.
    Method {
        parameters: Vec<Type>,
        ret: Option<Box<Type>>,
    },
}

impl Type {
    /// returns `true` if this type is `Long` or `Double`.
    #[inline]
    pub fn is_wide(&self) -> bool {
        matches!(self, Type::Long | Type::Double)
    }

    /// returns `true` if this type is a method descriptor.
    #[inline]
    pub fn is_method(&self) -> bool {
        matches!(self, Type::Method { .. })
    }

    /// Creates a new method descriptor with parameters and return type.
    #[inline]
    pub fn method<P: Into<Vec<Type>>>(params: P, ret: Option<Type>) -> Type {
        Type::Method {
            parameters: params.into(),
            ret: ret.map(Box::new),
        }
    }

    /// Creates a new reference type.
    #[inline]
    pub fn reference<S: Into<String>>(name: S) -> Type {
        Type::Ref(name.into())
    }

    /// Creates a new array type. Arrays of arrays collapse into one type with the summed dimension.
    pub fn array(dim: u8, t: Type) -> Type {
        match t {
            Type::ArrayRef(orig, inner) => Type::ArrayRef(orig.saturating_add(dim), inner),
            t => Type::ArrayRef(dim, Box::new(t)),
        }
    }

    /// The number of local variable slots (or operand stack words) a value of this type occupies.
    #[inline]
    pub fn slot_size(&self) -> u16 {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    /// The parameters and the return type of a method descriptor.
    pub fn as_method(&self) -> Option<(&[Type], Option<&Type>)> {
        match self {
            Type::Method { parameters, ret } => Some((parameters, ret.as_deref())),
            _ => None,
        }
    }

    /// Offset of the typed variant of a load, store or return instruction family
    /// (`int`, `long`, `float`, `double`, reference in that order).
    fn opcode_offset(&self) -> u8 {
        match self {
            Type::Long => 1,
            Type::Float => 2,
            Type::Double => 3,
            Type::Ref(_) | Type::ArrayRef(..) | Type::Method { .. } => 4,
            _ => 0,
        }
    }

    /// The `xLOAD` opcode that takes a local variable index operand.
    #[inline]
    pub fn load_opcode(&self) -> u8 {
        ILOAD + self.opcode_offset()
    }

    /// The `xSTORE` opcode that takes a local variable index operand.
    #[inline]
    pub fn store_opcode(&self) -> u8 {
        ISTORE + self.opcode_offset()
    }

    /// The `xLOAD_0` opcode; `xLOAD_n` is this plus `n` for `n` up to 3.
    #[inline]
    pub fn short_load_opcode(&self) -> u8 {
        ILOAD_0 + self.opcode_offset() * 4
    }

    /// The `xSTORE_0` opcode; `xSTORE_n` is this plus `n` for `n` up to 3.
    #[inline]
    pub fn short_store_opcode(&self) -> u8 {
        ISTORE_0 + self.opcode_offset() * 4
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Byte => f.write_str("B"),
            Type::Char => f.write_str("C"),
            Type::Double => f.write_str("D"),
            Type::Float => f.write_str("F"),
            Type::Int => f.write_str("I"),
            Type::Long => f.write_str("J"),
            Type::Boolean => f.write_str("Z"),
            Type::Short => f.write_str("S"),
            Type::Ref(name) => write!(f, "L{};", name),
            Type::ArrayRef(dim, t) => {
                for _ in 0..*dim {
                    f.write_str("[")?;
                }
                t.fmt(f)
            }
            Type::Method { parameters, ret } => {
                f.write_str("(")?;
                for p in parameters {
                    p.fmt(f)?;
                }
                f.write_str(")")?;
                match ret {
                    Some(t) => t.fmt(f),
                    None => f.write_str("V"),
                }
            }
        }
    }
}

fn field_type(i: &str) -> IResult<&str, Type> {
    alt((
        value(Type::Byte, char('B')),
        value(Type::Char, char('C')),
        value(Type::Double, char('D')),
        value(Type::Float, char('F')),
        value(Type::Int, char('I')),
        value(Type::Long, char('J')),
        value(Type::Boolean, char('Z')),
        value(Type::Short, char('S')),
        map(
            delimited(char('L'), take_till1(|c| c == ';'), char(';')),
            |name: &str| Type::Ref(name.to_owned()),
        ),
        map_res(pair(many1_count(char('[')), field_type), |(dim, t)| {
            u8::try_from(dim).map(|dim| Type::array(dim, t))
        }),
    ))(i)
}

fn method_type(i: &str) -> IResult<&str, Type> {
    let (i, parameters) = delimited(char('('), many0(field_type), char(')'))(i)?;
    let (i, ret) = alt((value(None, char('V')), map(field_type, Some)))(i)?;
    Ok((i, Type::method(parameters, ret)))
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(alt((method_type, field_type)))(s)
            .map(|(_, t)| t)
            .map_err(|_| Error::invalid("descriptor", s.to_owned()))
    }
}

/// Maps internal class names (`java/lang/String`) to replacement names.
pub type ClassNames = HashMap<String, String>;

/// Replaces every class name in a descriptor according to the map.
///
/// The descriptor does not need to be well-formed: everything between an `L` and the following
/// `;` is treated as a class name, everything else is copied.
pub fn rename_descriptor(desc: &str, map: &ClassNames) -> String {
    if map.is_empty() {
        return desc.to_owned();
    }
    let mut out = String::with_capacity(desc.len());
    let mut rest = desc;
    while let Some(start) = rest.find('L') {
        out.push_str(&rest[..=start]);
        rest = &rest[start + 1..];
        match rest.find(';') {
            Some(end) => {
                let name = &rest[..end];
                out.push_str(map.get(name).map_or(name, String::as_str));
                rest = &rest[end..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Renames a class reference as found in a `CONSTANT_Class` entry, which may also name an array type.
pub fn rename_class(name: &str, map: &ClassNames) -> String {
    if name.starts_with('[') {
        rename_descriptor(name, map)
    } else {
        map.get(name).cloned().unwrap_or_else(|| name.to_owned())
    }
}
