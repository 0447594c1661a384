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
//! Whole class files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;

use crate::access::AccessFlags;
use crate::attr::{self, AttributeBody, AttributeInfo, AttributeKind, BootstrapMethodsAttribute};
use crate::constants::JVM_MAGIC;
use crate::convert::{TransformerChain, TypeHierarchy};
use crate::cp::ConstPool;
use crate::member::{FieldInfo, MethodInfo};
use crate::rw::u16_len;
use crate::{Error, ReadWrite, Result};

/// A parsed class file.
///
/// Reading and then writing a class file reproduces it byte for byte.
#[derive(Clone, Debug)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    /// 0 for `java/lang/Object`.
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Creates an empty public class extending `superclass`.
    pub fn new(name: &str, superclass: &str, major_version: u16) -> Result<Self> {
        let mut constant_pool = ConstPool::new(name)?;
        let this_class = constant_pool.this_class_index();
        let super_class = constant_pool.add_class_info(superclass)?;
        Ok(Self {
            minor_version: 0,
            major_version,
            constant_pool,
            access_flags: AccessFlags::ACC_PUBLIC | AccessFlags::ACC_SUPER,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        })
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = u32::read_from(reader)?;
        if magic != JVM_MAGIC {
            return Err(Error::invalid("magic", format!("{:#010X}", magic)));
        }
        let minor_version = u16::read_from(reader)?;
        let major_version = u16::read_from(reader)?;
        let mut constant_pool = ConstPool::read_from(reader)?;
        let access_flags = AccessFlags::read_from(reader)?;
        let this_class = u16::read_from(reader)?;
        constant_pool.set_this_class_index(this_class);
        let super_class = u16::read_from(reader)?;
        let interfaces = Vec::<u16>::read_from(reader)?;
        let field_count = u16::read_from(reader)?;
        let fields = (0..field_count)
            .map(|_| FieldInfo::read_from(&constant_pool, reader))
            .collect::<Result<_>>()?;
        let method_count = u16::read_from(reader)?;
        let methods = (0..method_count)
            .map(|_| MethodInfo::read_from(&constant_pool, reader))
            .collect::<Result<_>>()?;
        let attributes = attr::read_all(&constant_pool, reader)?;
        let class = Self {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        debug!(
            "read class {} with {} methods",
            class.name().unwrap_or("<unknown>"),
            class.methods.len()
        );
        Ok(class)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        JVM_MAGIC.write_to(writer)?;
        self.minor_version.write_to(writer)?;
        self.major_version.write_to(writer)?;
        self.constant_pool.write_to(writer)?;
        self.access_flags.write_to(writer)?;
        self.this_class.write_to(writer)?;
        self.super_class.write_to(writer)?;
        self.interfaces.write_to(writer)?;
        u16_len(self.fields.len(), "field count")?.write_to(writer)?;
        for f in &self.fields {
            f.write_to(writer)?;
        }
        u16_len(self.methods.len(), "method count")?.write_to(writer)?;
        for m in &self.methods {
            m.write_to(writer)?;
        }
        attr::write_all(&self.attributes, writer)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_from(&mut BufReader::new(File::open(path)?))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// The internal name of this class.
    pub fn name(&self) -> Result<&str> {
        self.constant_pool.get_class_info(self.this_class)
    }

    /// The internal name of the super class, `None` for `java/lang/Object`.
    pub fn super_class_name(&self) -> Result<Option<&str>> {
        match self.super_class {
            0 => Ok(None),
            idx => self.constant_pool.get_class_info(idx).map(Some),
        }
    }

    pub fn interface_names(&self) -> Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&i| self.constant_pool.get_class_info(i))
            .collect()
    }

    pub fn get_attribute(&self, name: &str) -> Option<&AttributeInfo> {
        attr::lookup_by_name(Some(self.attributes.as_slice()), &self.constant_pool, name)
    }

    /// Adds a class attribute, replacing any attribute with the same name.
    pub fn add_attribute(&mut self, info: AttributeInfo) -> Result<()> {
        attr::remove_by_name(
            Some(&mut self.attributes),
            &self.constant_pool,
            info.name(&self.constant_pool)?,
        );
        self.attributes.push(info);
        Ok(())
    }

    /// The BootstrapMethods table, if the class has one.
    pub fn bootstrap_methods(&self) -> Option<&BootstrapMethodsAttribute> {
        match &attr::lookup_by_kind(Some(self.attributes.as_slice()), AttributeKind::BootstrapMethods)?.body {
            AttributeBody::BootstrapMethods(b) => Some(b),
            _ => None,
        }
    }

    /// Finds a method by name and descriptor.
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        let cp = &self.constant_pool;
        self.methods.iter().find(|m| {
            m.name(cp).map_or(false, |n| n == name) && m.descriptor(cp).map_or(false, |d| d == descriptor)
        })
    }

    /// Like [`method`](Self::method), but returns the position in [`methods`](Self::methods).
    pub fn method_index(&self, name: &str, descriptor: &str) -> Option<usize> {
        let cp = &self.constant_pool;
        self.methods.iter().position(|m| {
            m.name(cp).map_or(false, |n| n == name) && m.descriptor(cp).map_or(false, |d| d == descriptor)
        })
    }

    pub fn method_mut(&mut self, name: &str, descriptor: &str) -> Option<&mut MethodInfo> {
        let idx = self.method_index(name, descriptor)?;
        self.methods.get_mut(idx)
    }

    /// Runs `chain` over every method body of this class.
    pub fn transform(&mut self, chain: &mut TransformerChain, hierarchy: &dyn TypeHierarchy) -> Result<()> {
        chain.apply_to_class(self, hierarchy)
    }
}
