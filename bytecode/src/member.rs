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
//! Methods and fields.
//!
//! Members do not own a constant pool; every operation that needs symbols takes the pool of the class
//! the member belongs to.

use std::io::{Read, Write};

use log::debug;

use crate::access::AccessFlags;
use crate::attr::{
    self, AttributeBody, AttributeInfo, AttributeKind, CodeAttribute, ExceptionsAttribute,
};
use crate::constants::{CONSTRUCTOR_NAME, STATIC_INITIALIZER_NAME};
use crate::cp::ConstPool;
use crate::ty::{rename_descriptor, ClassNames};
use crate::{ReadWrite, Result};

/// A method of a class.
#[derive(Clone, PartialEq, Debug)]
pub struct MethodInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    /// `None` until the first attribute is added to a method that was created without any.
    pub attributes: Option<Vec<AttributeInfo>>,
}

impl MethodInfo {
    /// Creates a method with no attributes, adding its name and descriptor to `cp`.
    pub fn new(cp: &mut ConstPool, name: &str, descriptor: &str) -> Result<Self> {
        Ok(Self {
            access_flags: AccessFlags::empty(),
            name_index: cp.add_utf8_info(name)?,
            descriptor_index: cp.add_utf8_info(descriptor)?,
            attributes: None,
        })
    }

    /// Copies `src` into a class whose pool is `dest` under a new name.
    ///
    /// Only the Code and Exceptions attributes are carried over; class names in the descriptor and the
    /// copied attributes are replaced according to `class_names`.
    pub fn transplant(
        dest: &mut ConstPool,
        name: &str,
        src: &MethodInfo,
        src_cp: &ConstPool,
        class_names: &ClassNames,
    ) -> Result<Self> {
        let descriptor = rename_descriptor(src.descriptor(src_cp)?, class_names);
        let mut attributes = Vec::new();
        if let Some(exceptions) = src.attribute(AttributeKind::Exceptions) {
            attributes.push(exceptions.copy(src_cp, dest, class_names)?);
        }
        if let Some(code) = src.attribute(AttributeKind::Code) {
            attributes.push(code.copy(src_cp, dest, class_names)?);
        }
        Ok(Self {
            access_flags: src.access_flags,
            name_index: dest.add_utf8_info(name)?,
            descriptor_index: dest.add_utf8_info(&descriptor)?,
            attributes: Some(attributes),
        })
    }

    pub fn read_from<R: Read>(cp: &ConstPool, reader: &mut R) -> Result<Self> {
        Ok(Self {
            access_flags: AccessFlags::read_from(reader)?,
            name_index: u16::read_from(reader)?,
            descriptor_index: u16::read_from(reader)?,
            attributes: Some(attr::read_all(cp, reader)?),
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.access_flags.write_to(writer)?;
        self.name_index.write_to(writer)?;
        self.descriptor_index.write_to(writer)?;
        attr::write_all(self.attributes.as_deref().unwrap_or(&[]), writer)
    }

    pub fn name<'a>(&self, cp: &'a ConstPool) -> Result<&'a str> {
        cp.get_utf8_info(self.name_index)
    }

    pub fn set_name(&mut self, cp: &mut ConstPool, name: &str) -> Result<()> {
        self.name_index = cp.add_utf8_info(name)?;
        Ok(())
    }

    /// Returns `true` if this is neither a constructor nor a static initializer.
    pub fn is_method(&self, cp: &ConstPool) -> Result<bool> {
        let name = self.name(cp)?;
        Ok(name != CONSTRUCTOR_NAME && name != STATIC_INITIALIZER_NAME)
    }

    pub fn is_constructor(&self, cp: &ConstPool) -> Result<bool> {
        Ok(self.name(cp)? == CONSTRUCTOR_NAME)
    }

    pub fn is_static_initializer(&self, cp: &ConstPool) -> Result<bool> {
        Ok(self.name(cp)? == STATIC_INITIALIZER_NAME)
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.access_flags.is_static()
    }

    pub fn descriptor<'a>(&self, cp: &'a ConstPool) -> Result<&'a str> {
        cp.get_utf8_info(self.descriptor_index)
    }

    /// Changes the descriptor. Nothing is added to the pool when it is unchanged.
    pub fn set_descriptor(&mut self, cp: &mut ConstPool, descriptor: &str) -> Result<()> {
        if self.descriptor(cp)? != descriptor {
            self.descriptor_index = cp.add_utf8_info(descriptor)?;
        }
        Ok(())
    }

    /// The attribute list, created empty if the method has none yet.
    pub fn attributes_mut(&mut self) -> &mut Vec<AttributeInfo> {
        self.attributes.get_or_insert_with(Vec::new)
    }

    /// Returns the first attribute with the given name.
    pub fn get_attribute(&self, cp: &ConstPool, name: &str) -> Option<&AttributeInfo> {
        attr::lookup_by_name(self.attributes.as_deref(), cp, name)
    }

    pub fn attribute(&self, kind: AttributeKind) -> Option<&AttributeInfo> {
        attr::lookup_by_kind(self.attributes.as_deref(), kind)
    }

    /// Adds an attribute, replacing any attribute with the same name.
    pub fn add_attribute(&mut self, cp: &ConstPool, info: AttributeInfo) -> Result<()> {
        let name = info.name(cp)?;
        attr::remove_by_name(Some(self.attributes_mut()), cp, name);
        self.attributes_mut().push(info);
        Ok(())
    }

    pub fn code_attribute(&self) -> Option<&CodeAttribute> {
        match &self.attribute(AttributeKind::Code)?.body {
            AttributeBody::Code(code) => Some(code),
            _ => None,
        }
    }

    pub fn code_attribute_mut(&mut self) -> Option<&mut CodeAttribute> {
        match &mut attr::lookup_by_kind_mut(self.attributes.as_mut(), AttributeKind::Code)?.body {
            AttributeBody::Code(code) => Some(code),
            _ => None,
        }
    }

    /// Replaces the Code attribute.
    pub fn set_code_attribute(&mut self, cp: &mut ConstPool, code: CodeAttribute) -> Result<()> {
        self.remove_code_attribute();
        let info = AttributeInfo::new(cp, AttributeBody::Code(code))?;
        self.attributes_mut().push(info);
        Ok(())
    }

    pub fn remove_code_attribute(&mut self) {
        attr::remove_by_kind(self.attributes.as_mut(), AttributeKind::Code);
    }

    pub fn exceptions_attribute(&self) -> Option<&ExceptionsAttribute> {
        match &self.attribute(AttributeKind::Exceptions)?.body {
            AttributeBody::Exceptions(e) => Some(e),
            _ => None,
        }
    }

    /// Replaces the Exceptions attribute.
    pub fn set_exceptions_attribute(
        &mut self,
        cp: &mut ConstPool,
        exceptions: ExceptionsAttribute,
    ) -> Result<()> {
        self.remove_exceptions_attribute();
        let info = AttributeInfo::new(cp, AttributeBody::Exceptions(exceptions))?;
        self.attributes_mut().push(info);
        Ok(())
    }

    pub fn remove_exceptions_attribute(&mut self) {
        attr::remove_by_kind(self.attributes.as_mut(), AttributeKind::Exceptions);
    }

    /// The source line of the instruction at `pc`, or -1 without line number information.
    pub fn line_number(&self, pc: usize) -> i32 {
        let table = self
            .code_attribute()
            .and_then(|c| c.attribute(AttributeKind::LineNumberTable));
        match table.map(|t| &t.body) {
            Some(AttributeBody::LineNumberTable(t)) => t.to_line_number(pc),
            _ => -1,
        }
    }

    /// Makes a constructor call the constructor of `superclass` instead of its current super constructor.
    ///
    /// The call keeps its name and descriptor. Methods that are not constructors and constructors that
    /// delegate to `this(...)` are left alone.
    pub fn set_superclass(&mut self, cp: &mut ConstPool, superclass: &str) -> Result<()> {
        if !self.is_constructor(cp)? {
            return Ok(());
        }
        let code = match self.code_attribute_mut() {
            Some(code) => code,
            None => return Ok(()),
        };
        let mut iter = code.iterator();
        if let Some(pos) = iter.skip_super_constructor(cp)? {
            let mref = iter.u16bit_at(pos + 1)?;
            let nat = cp.get_methodref_name_and_type(mref)?;
            let class = cp.add_class_info(superclass)?;
            let new_ref = cp.add_methodref(class, nat)?;
            iter.write16bit(new_ref, pos + 1)?;
            debug!("super constructor call at {} now targets {}", pos, superclass);
        }
        Ok(())
    }
}

/// A field of a class.
#[derive(Clone, PartialEq, Debug)]
pub struct FieldInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl FieldInfo {
    pub fn new(cp: &mut ConstPool, access_flags: AccessFlags, name: &str, descriptor: &str) -> Result<Self> {
        Ok(Self {
            access_flags,
            name_index: cp.add_utf8_info(name)?,
            descriptor_index: cp.add_utf8_info(descriptor)?,
            attributes: Vec::new(),
        })
    }

    pub fn read_from<R: Read>(cp: &ConstPool, reader: &mut R) -> Result<Self> {
        Ok(Self {
            access_flags: AccessFlags::read_from(reader)?,
            name_index: u16::read_from(reader)?,
            descriptor_index: u16::read_from(reader)?,
            attributes: attr::read_all(cp, reader)?,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.access_flags.write_to(writer)?;
        self.name_index.write_to(writer)?;
        self.descriptor_index.write_to(writer)?;
        attr::write_all(&self.attributes, writer)
    }

    pub fn name<'a>(&self, cp: &'a ConstPool) -> Result<&'a str> {
        cp.get_utf8_info(self.name_index)
    }

    pub fn descriptor<'a>(&self, cp: &'a ConstPool) -> Result<&'a str> {
        cp.get_utf8_info(self.descriptor_index)
    }

    pub fn get_attribute(&self, cp: &ConstPool, name: &str) -> Option<&AttributeInfo> {
        attr::lookup_by_name(Some(self.attributes.as_slice()), cp, name)
    }

    /// Adds an attribute, replacing any attribute with the same name.
    pub fn add_attribute(&mut self, cp: &ConstPool, info: AttributeInfo) -> Result<()> {
        attr::remove_by_name(Some(&mut self.attributes), cp, info.name(cp)?);
        self.attributes.push(info);
        Ok(())
    }
}
