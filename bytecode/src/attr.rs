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
//! Attributes of classes, fields, methods and code.
//!
//! Attributes with a recognized name are decoded into dedicated payload types, everything else is
//! kept as [`AttributeBody::Raw`] and written back byte for byte.

use std::io::{Read, Write};

use log::trace;

use crate::constants::attr_name;
use crate::cp::ConstPool;
use crate::rw::{read_bytes, u16_len, u32_len};
use crate::ty::ClassNames;
use crate::{Error, ReadWrite, Result};

mod class;
mod code;
mod debug;
mod stack_map;

pub use class::*;
pub use code::*;
pub use debug::*;
pub use stack_map::*;

pub(crate) use debug::shift_target;

/// The recognized attribute kinds, plus [`Raw`](AttributeKind::Raw) for the rest.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum AttributeKind {
    Code,
    Exceptions,
    ConstantValue,
    SourceFile,
    LineNumberTable,
    LocalVariableTable,
    LocalVariableTypeTable,
    StackMapTable,
    Synthetic,
    InnerClasses,
    BootstrapMethods,
    Raw,
}

impl AttributeKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            attr_name::CODE => AttributeKind::Code,
            attr_name::EXCEPTIONS => AttributeKind::Exceptions,
            attr_name::CONSTANT_VALUE => AttributeKind::ConstantValue,
            attr_name::SOURCE_FILE => AttributeKind::SourceFile,
            attr_name::LINE_NUMBER_TABLE => AttributeKind::LineNumberTable,
            attr_name::LOCAL_VARIABLE_TABLE => AttributeKind::LocalVariableTable,
            attr_name::LOCAL_VARIABLE_TYPE_TABLE => AttributeKind::LocalVariableTypeTable,
            attr_name::STACK_MAP_TABLE => AttributeKind::StackMapTable,
            attr_name::SYNTHETIC => AttributeKind::Synthetic,
            attr_name::INNER_CLASSES => AttributeKind::InnerClasses,
            attr_name::BOOTSTRAP_METHODS => AttributeKind::BootstrapMethods,
            _ => AttributeKind::Raw,
        }
    }

    /// The attribute name of this kind. Raw attributes carry their own name.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            AttributeKind::Code => attr_name::CODE,
            AttributeKind::Exceptions => attr_name::EXCEPTIONS,
            AttributeKind::ConstantValue => attr_name::CONSTANT_VALUE,
            AttributeKind::SourceFile => attr_name::SOURCE_FILE,
            AttributeKind::LineNumberTable => attr_name::LINE_NUMBER_TABLE,
            AttributeKind::LocalVariableTable => attr_name::LOCAL_VARIABLE_TABLE,
            AttributeKind::LocalVariableTypeTable => attr_name::LOCAL_VARIABLE_TYPE_TABLE,
            AttributeKind::StackMapTable => attr_name::STACK_MAP_TABLE,
            AttributeKind::Synthetic => attr_name::SYNTHETIC,
            AttributeKind::InnerClasses => attr_name::INNER_CLASSES,
            AttributeKind::BootstrapMethods => attr_name::BOOTSTRAP_METHODS,
            AttributeKind::Raw => return None,
        })
    }
}

/// Checked exceptions a method may throw, as indices to `CONSTANT_Class` entries.
#[derive(ReadWrite, Clone, Eq, PartialEq, Debug, Default)]
pub struct ExceptionsAttribute {
    pub exceptions: Vec<u16>,
}

impl ExceptionsAttribute {
    pub fn exception_names<'a>(&self, cp: &'a ConstPool) -> Result<Vec<&'a str>> {
        self.exceptions.iter().map(|&e| cp.get_class_info(e)).collect()
    }

    fn copy(&self, src: &ConstPool, dest: &mut ConstPool, class_names: &ClassNames) -> Result<Self> {
        let exceptions = self
            .exceptions
            .iter()
            .map(|&e| src.copy(e, dest, class_names))
            .collect::<Result<_>>()?;
        Ok(Self { exceptions })
    }
}

/// The value of a constant field.
#[derive(ReadWrite, Copy, Clone, Eq, PartialEq, Debug)]
pub struct ConstantValueAttribute {
    pub index: u16,
}

/// The payload of an attribute.
#[derive(Clone, PartialEq, Debug)]
pub enum AttributeBody {
    Code(CodeAttribute),
    Exceptions(ExceptionsAttribute),
    ConstantValue(ConstantValueAttribute),
    SourceFile(SourceFileAttribute),
    LineNumberTable(LineNumberAttribute),
    LocalVariableTable(LocalVariableAttribute),
    LocalVariableTypeTable(LocalVariableAttribute),
    StackMapTable(StackMapTableAttribute),
    Synthetic,
    InnerClasses(InnerClassesAttribute),
    BootstrapMethods(BootstrapMethodsAttribute),
    /// The undecoded payload of an unrecognized attribute.
    Raw(Vec<u8>),
}

impl AttributeBody {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeBody::Code(_) => AttributeKind::Code,
            AttributeBody::Exceptions(_) => AttributeKind::Exceptions,
            AttributeBody::ConstantValue(_) => AttributeKind::ConstantValue,
            AttributeBody::SourceFile(_) => AttributeKind::SourceFile,
            AttributeBody::LineNumberTable(_) => AttributeKind::LineNumberTable,
            AttributeBody::LocalVariableTable(_) => AttributeKind::LocalVariableTable,
            AttributeBody::LocalVariableTypeTable(_) => AttributeKind::LocalVariableTypeTable,
            AttributeBody::StackMapTable(_) => AttributeKind::StackMapTable,
            AttributeBody::Synthetic => AttributeKind::Synthetic,
            AttributeBody::InnerClasses(_) => AttributeKind::InnerClasses,
            AttributeBody::BootstrapMethods(_) => AttributeKind::BootstrapMethods,
            AttributeBody::Raw(_) => AttributeKind::Raw,
        }
    }

    fn read_from(kind: AttributeKind, cp: &ConstPool, payload: &mut &[u8]) -> Result<Self> {
        Ok(match kind {
            AttributeKind::Code => AttributeBody::Code(CodeAttribute::read_from(cp, payload)?),
            AttributeKind::Exceptions => AttributeBody::Exceptions(ReadWrite::read_from(payload)?),
            AttributeKind::ConstantValue => AttributeBody::ConstantValue(ReadWrite::read_from(payload)?),
            AttributeKind::SourceFile => AttributeBody::SourceFile(ReadWrite::read_from(payload)?),
            AttributeKind::LineNumberTable => {
                AttributeBody::LineNumberTable(ReadWrite::read_from(payload)?)
            }
            AttributeKind::LocalVariableTable => {
                AttributeBody::LocalVariableTable(ReadWrite::read_from(payload)?)
            }
            AttributeKind::LocalVariableTypeTable => {
                AttributeBody::LocalVariableTypeTable(ReadWrite::read_from(payload)?)
            }
            AttributeKind::StackMapTable => AttributeBody::StackMapTable(ReadWrite::read_from(payload)?),
            AttributeKind::Synthetic => AttributeBody::Synthetic,
            AttributeKind::InnerClasses => AttributeBody::InnerClasses(ReadWrite::read_from(payload)?),
            AttributeKind::BootstrapMethods => {
                AttributeBody::BootstrapMethods(ReadWrite::read_from(payload)?)
            }
            AttributeKind::Raw => {
                let bytes = payload.to_vec();
                *payload = &[];
                AttributeBody::Raw(bytes)
            }
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            AttributeBody::Code(c) => c.write_to(writer),
            AttributeBody::Exceptions(e) => e.write_to(writer),
            AttributeBody::ConstantValue(c) => c.write_to(writer),
            AttributeBody::SourceFile(s) => s.write_to(writer),
            AttributeBody::LineNumberTable(l) => l.write_to(writer),
            AttributeBody::LocalVariableTable(l) | AttributeBody::LocalVariableTypeTable(l) => {
                l.write_to(writer)
            }
            AttributeBody::StackMapTable(s) => s.write_to(writer),
            AttributeBody::Synthetic => Ok(()),
            AttributeBody::InnerClasses(i) => i.write_to(writer),
            AttributeBody::BootstrapMethods(b) => b.write_to(writer),
            AttributeBody::Raw(bytes) => {
                writer.write_all(bytes)?;
                Ok(())
            }
        }
    }

    /// The number of bytes [`write_to`](Self::write_to) produces.
    fn payload_len(&self) -> usize {
        match self {
            AttributeBody::Code(c) => c.payload_len(),
            AttributeBody::Exceptions(e) => 2 + 2 * e.exceptions.len(),
            AttributeBody::ConstantValue(_) | AttributeBody::SourceFile(_) => 2,
            AttributeBody::LineNumberTable(l) => 2 + 4 * l.entries.len(),
            AttributeBody::LocalVariableTable(l) | AttributeBody::LocalVariableTypeTable(l) => {
                2 + 10 * l.entries.len()
            }
            AttributeBody::StackMapTable(s) => s.payload_len(),
            AttributeBody::Synthetic => 0,
            AttributeBody::InnerClasses(i) => 2 + 8 * i.classes.len(),
            AttributeBody::BootstrapMethods(b) => {
                2 + b.methods.iter().map(|m| 4 + 2 * m.arguments.len()).sum::<usize>()
            }
            AttributeBody::Raw(bytes) => bytes.len(),
        }
    }

    fn copy(&self, src: &ConstPool, dest: &mut ConstPool, class_names: &ClassNames) -> Result<Self> {
        Ok(match self {
            AttributeBody::Code(c) => AttributeBody::Code(c.copy(src, dest, class_names)?),
            AttributeBody::Exceptions(e) => AttributeBody::Exceptions(e.copy(src, dest, class_names)?),
            AttributeBody::ConstantValue(c) => AttributeBody::ConstantValue(ConstantValueAttribute {
                index: src.copy(c.index, dest, class_names)?,
            }),
            AttributeBody::SourceFile(s) => AttributeBody::SourceFile(s.copy(src, dest)?),
            AttributeBody::LineNumberTable(l) => AttributeBody::LineNumberTable(l.clone()),
            AttributeBody::LocalVariableTable(l) => {
                AttributeBody::LocalVariableTable(l.copy(src, dest, Some(class_names))?)
            }
            AttributeBody::LocalVariableTypeTable(l) => {
                AttributeBody::LocalVariableTypeTable(l.copy(src, dest, None)?)
            }
            AttributeBody::StackMapTable(s) => {
                AttributeBody::StackMapTable(s.copy(src, dest, class_names)?)
            }
            AttributeBody::Synthetic => AttributeBody::Synthetic,
            AttributeBody::InnerClasses(i) => {
                AttributeBody::InnerClasses(i.copy(src, dest, class_names)?)
            }
            AttributeBody::BootstrapMethods(b) => {
                AttributeBody::BootstrapMethods(b.copy(src, dest, class_names)?)
            }
            AttributeBody::Raw(bytes) => AttributeBody::Raw(bytes.clone()),
        })
    }
}

/// An attribute: the index of its name in the constant pool and its payload.
#[derive(Clone, PartialEq, Debug)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub body: AttributeBody,
}

impl AttributeInfo {
    /// Creates a recognized attribute, adding its name to the constant pool.
    pub fn new(cp: &mut ConstPool, body: AttributeBody) -> Result<Self> {
        let name = body
            .kind()
            .name()
            .ok_or_else(|| Error::invalid("attribute", "raw attributes need a name"))?;
        Ok(Self {
            name_index: cp.add_utf8_info(name)?,
            body,
        })
    }

    /// Creates an attribute that is written verbatim.
    pub fn raw(cp: &mut ConstPool, name: &str, bytes: Vec<u8>) -> Result<Self> {
        Ok(Self {
            name_index: cp.add_utf8_info(name)?,
            body: AttributeBody::Raw(bytes),
        })
    }

    /// Reads an attribute, decoding the payload when the name is recognized.
    pub fn read_from<R: Read>(cp: &ConstPool, reader: &mut R) -> Result<Self> {
        let name_index = u16::read_from(reader)?;
        let length = u32::read_from(reader)?;
        let payload = read_bytes(reader, length as usize)?;
        let name = cp.get_utf8_info(name_index)?;
        let kind = AttributeKind::from_name(name);
        let mut rest = &payload[..];
        let body = AttributeBody::read_from(kind, cp, &mut rest)?;
        if !rest.is_empty() {
            return Err(Error::AttributeLength(
                length,
                length - rest.len() as u32,
                name.to_owned(),
            ));
        }
        if kind == AttributeKind::Raw {
            trace!("passing through unknown attribute {} ({} bytes)", name, length);
        }
        Ok(Self { name_index, body })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut payload = Vec::with_capacity(self.body.payload_len());
        self.body.write_to(&mut payload)?;
        self.name_index.write_to(writer)?;
        u32_len(payload.len(), "attribute length")?.write_to(writer)?;
        writer.write_all(&payload)?;
        Ok(())
    }

    /// The number of bytes this attribute occupies in a class file, including the six byte header.
    pub fn length(&self) -> usize {
        6 + self.body.payload_len()
    }

    pub fn kind(&self) -> AttributeKind {
        self.body.kind()
    }

    pub fn name<'a>(&self, cp: &'a ConstPool) -> Result<&'a str> {
        cp.get_utf8_info(self.name_index)
    }

    /// Copies this attribute into `dest`, re-resolving every constant pool index it contains and
    /// renaming classes according to `class_names`.
    pub fn copy(&self, src: &ConstPool, dest: &mut ConstPool, class_names: &ClassNames) -> Result<Self> {
        Ok(Self {
            name_index: dest.add_utf8_info(self.name(src)?)?,
            body: self.body.copy(src, dest, class_names)?,
        })
    }
}

/// Reads a `u16` count followed by that many attributes.
pub fn read_all<R: Read>(cp: &ConstPool, reader: &mut R) -> Result<Vec<AttributeInfo>> {
    let count = u16::read_from(reader)?;
    (0..count).map(|_| AttributeInfo::read_from(cp, reader)).collect()
}

/// Writes a `u16` count followed by the attributes.
pub fn write_all<W: Write>(list: &[AttributeInfo], writer: &mut W) -> Result<()> {
    u16_len(list.len(), "attribute count")?.write_to(writer)?;
    for a in list {
        a.write_to(writer)?;
    }
    Ok(())
}

/// The number of bytes the attributes occupy, excluding the count.
pub fn total_length(list: &[AttributeInfo]) -> usize {
    list.iter().map(AttributeInfo::length).sum()
}

fn has_name(attr: &AttributeInfo, cp: &ConstPool, name: &str) -> bool {
    attr.name(cp).map_or(false, |n| n == name)
}

/// Returns the first attribute with the given name.
pub fn lookup_by_name<'a>(
    list: Option<&'a [AttributeInfo]>,
    cp: &ConstPool,
    name: &str,
) -> Option<&'a AttributeInfo> {
    list?.iter().find(|a| has_name(a, cp, name))
}

/// Returns the first attribute of the given kind.
pub fn lookup_by_kind(list: Option<&[AttributeInfo]>, kind: AttributeKind) -> Option<&AttributeInfo> {
    list?.iter().find(|a| a.kind() == kind)
}

pub fn lookup_by_kind_mut(
    list: Option<&mut Vec<AttributeInfo>>,
    kind: AttributeKind,
) -> Option<&mut AttributeInfo> {
    list?.iter_mut().find(|a| a.kind() == kind)
}

/// Removes every attribute with the given name, keeping the order of the others.
///
/// Returns the number of removed attributes.
pub fn remove_by_name(list: Option<&mut Vec<AttributeInfo>>, cp: &ConstPool, name: &str) -> usize {
    match list {
        Some(list) => {
            let before = list.len();
            list.retain(|a| !has_name(a, cp, name));
            before - list.len()
        }
        None => 0,
    }
}

/// Removes every attribute of the given kind, keeping the order of the others.
pub fn remove_by_kind(list: Option<&mut Vec<AttributeInfo>>, kind: AttributeKind) -> usize {
    match list {
        Some(list) => {
            let before = list.len();
            list.retain(|a| a.kind() != kind);
            before - list.len()
        }
        None => 0,
    }
}
