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
//! The constant pool of a class file.
//!
//! Every class owns one [`ConstPool`]; indices into it are only meaningful for that pool. Entries are
//! interned: adding an entry equal to an existing one returns the existing index.

use std::convert::TryFrom;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::constants::tag;
use crate::loadable::MethodHandleKind;
use crate::ty::{rename_class, rename_descriptor, ClassNames};
use crate::{Error, ReadWrite, Result};

/// A raw constant entry that has unresolved indices to other entries.
#[derive(ReadWrite, Debug, Clone)]
#[tag_type(u8)]
pub enum RawConstantEntry {
    #[tag(1)]
    UTF8(String),
    #[tag(3)]
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    Field(u16, u16),
    Method(u16, u16),
    InterfaceMethod(u16, u16),
    NameAndType(u16, u16),
    #[tag(15)]
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
}

// Floating point constants are compared and hashed by their bits, which is what ends up in the class file.
impl PartialEq for RawConstantEntry {
    fn eq(&self, other: &Self) -> bool {
        use RawConstantEntry::*;
        match (self, other) {
            (UTF8(a), UTF8(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Long(a), Long(b)) => a == b,
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Class(a), Class(b))
            | (String(a), String(b))
            | (MethodType(a), MethodType(b))
            | (Module(a), Module(b))
            | (Package(a), Package(b)) => a == b,
            (Field(a1, a2), Field(b1, b2))
            | (Method(a1, a2), Method(b1, b2))
            | (InterfaceMethod(a1, a2), InterfaceMethod(b1, b2))
            | (NameAndType(a1, a2), NameAndType(b1, b2))
            | (Dynamic(a1, a2), Dynamic(b1, b2))
            | (InvokeDynamic(a1, a2), InvokeDynamic(b1, b2)) => a1 == b1 && a2 == b2,
            (MethodHandle(a1, a2), MethodHandle(b1, b2)) => a1 == b1 && a2 == b2,
            _ => false,
        }
    }
}

impl Eq for RawConstantEntry {}

impl Hash for RawConstantEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use RawConstantEntry::*;
        std::mem::discriminant(self).hash(state);
        match self {
            UTF8(s) => s.hash(state),
            Int(i) => i.hash(state),
            Float(f) => f.to_bits().hash(state),
            Long(l) => l.hash(state),
            Double(d) => d.to_bits().hash(state),
            Class(u) | String(u) | MethodType(u) | Module(u) | Package(u) => u.hash(state),
            Field(u1, u2)
            | Method(u1, u2)
            | InterfaceMethod(u1, u2)
            | NameAndType(u1, u2)
            | Dynamic(u1, u2)
            | InvokeDynamic(u1, u2) => {
                u1.hash(state);
                u2.hash(state);
            }
            MethodHandle(b, u) => {
                b.hash(state);
                u.hash(state);
            }
        }
    }
}

impl RawConstantEntry {
    /// returns the number of indices that this entry takes.
    #[inline]
    pub const fn size(&self) -> u16 {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    /// Returns `true` if this entry is a Long/Double constant, which takes 2 indices.
    #[inline]
    pub const fn is_wide(&self) -> bool {
        matches!(self, RawConstantEntry::Long(_) | RawConstantEntry::Double(_))
    }

    /// The tag byte of this entry.
    pub const fn tag(&self) -> u8 {
        use RawConstantEntry::*;
        match self {
            UTF8(_) => tag::UTF8,
            Int(_) => tag::INTEGER,
            Float(_) => tag::FLOAT,
            Long(_) => tag::LONG,
            Double(_) => tag::DOUBLE,
            Class(_) => tag::CLASS,
            String(_) => tag::STRING,
            Field(..) => tag::FIELDREF,
            Method(..) => tag::METHODREF,
            InterfaceMethod(..) => tag::INTERFACE_METHODREF,
            NameAndType(..) => tag::NAME_AND_TYPE,
            MethodHandle(..) => tag::METHOD_HANDLE,
            MethodType(_) => tag::METHOD_TYPE,
            Dynamic(..) => tag::DYNAMIC,
            InvokeDynamic(..) => tag::INVOKE_DYNAMIC,
            Module(_) => tag::MODULE,
            Package(_) => tag::PACKAGE,
        }
    }

    /// A human readable name of the kind of this entry.
    pub const fn kind_name(&self) -> &'static str {
        use RawConstantEntry::*;
        match self {
            UTF8(_) => "Utf8",
            Int(_) => "Integer",
            Float(_) => "Float",
            Long(_) => "Long",
            Double(_) => "Double",
            Class(_) => "Class",
            String(_) => "String",
            Field(..) => "Fieldref",
            Method(..) => "Methodref",
            InterfaceMethod(..) => "InterfaceMethodref",
            NameAndType(..) => "NameAndType",
            MethodHandle(..) => "MethodHandle",
            MethodType(_) => "MethodType",
            Dynamic(..) => "Dynamic",
            InvokeDynamic(..) => "InvokeDynamic",
            Module(_) => "Module",
            Package(_) => "Package",
        }
    }
}

/// Identity of a constant pool. Clones get a new identity.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct PoolId(u64);

impl PoolId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        PoolId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The kind of a member reference entry.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MemberKind {
    Field,
    Method,
    InterfaceMethod,
}

impl MemberKind {
    const fn name(self) -> &'static str {
        match self {
            MemberKind::Field => "Fieldref",
            MemberKind::Method => "Methodref",
            MemberKind::InterfaceMethod => "InterfaceMethodref",
        }
    }
}

/// A resolved `Fieldref`, `Methodref` or `InterfaceMethodref` entry.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MemberRef<'a> {
    pub kind: MemberKind,
    pub class_index: u16,
    pub name_and_type_index: u16,
    pub class_name: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// The constant pool of a class file.
#[derive(Debug)]
pub struct ConstPool {
    id: PoolId,
    /// `None` at index 0 and at the second slot of wide entries.
    entries: Vec<Option<RawConstantEntry>>,
    lookup: IndexMap<RawConstantEntry, u16>,
    this_class: u16,
}

impl Clone for ConstPool {
    fn clone(&self) -> Self {
        Self {
            id: PoolId::next(),
            entries: self.entries.clone(),
            lookup: self.lookup.clone(),
            this_class: self.this_class,
        }
    }
}

impl Default for ConstPool {
    fn default() -> Self {
        Self::empty()
    }
}

macro_rules! expect_entry {
    ($self:ident, $idx:expr, $expected:literal, $pat:pat => $res:expr) => {{
        let idx = $idx;
        match $self.get_entry(idx)? {
            $pat => Ok($res),
            other => Err(Error::Mismatch {
                index: idx,
                expected: $expected,
                found: other.kind_name(),
            }),
        }
    }};
}

impl ConstPool {
    /// Creates a constant pool with no entries and no class.
    pub fn empty() -> Self {
        Self {
            id: PoolId::next(),
            entries: vec![None],
            lookup: IndexMap::new(),
            this_class: 0,
        }
    }

    /// Creates a constant pool for the class with the given internal name.
    pub fn new(this_class: &str) -> Result<Self> {
        let mut cp = Self::empty();
        cp.this_class = cp.add_class_info(this_class)?;
        Ok(cp)
    }

    /// The identity of this pool.
    #[inline]
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// The number written in the `constant_pool_count` item, which is one more than the largest index.
    #[inline]
    pub fn size(&self) -> u16 {
        // add_entry never lets this exceed u16::MAX
        self.entries.len() as u16
    }

    /// Index of the `CONSTANT_Class` entry of the class owning this pool, or 0 if unknown.
    #[inline]
    pub fn this_class_index(&self) -> u16 {
        self.this_class
    }

    #[inline]
    pub fn set_this_class_index(&mut self, index: u16) {
        self.this_class = index;
    }

    /// The internal name of the class owning this pool.
    pub fn class_name(&self) -> Result<&str> {
        self.get_class_info(self.this_class)
    }

    /// Iterates over all entries with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &RawConstantEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i as u16, e)))
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let count = u16::read_from(reader)?;
        if count == 0 {
            return Err(Error::invalid("constant pool count", "0"));
        }
        let mut cp = Self::empty();
        cp.entries.reserve(count as usize);
        while cp.entries.len() < count as usize {
            let idx = cp.entries.len() as u16;
            let entry = RawConstantEntry::read_from(reader)?;
            if entry.is_wide() && idx + 1 >= count {
                return Err(Error::invalid(
                    "constant pool",
                    format!("wide entry #{} exceeds the pool count {}", idx, count),
                ));
            }
            let wide = entry.is_wide();
            cp.lookup.entry(entry.clone()).or_insert(idx);
            cp.entries.push(Some(entry));
            if wide {
                cp.entries.push(None);
            }
        }
        Ok(cp)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.size().write_to(writer)?;
        for e in self.entries.iter().flatten() {
            e.write_to(writer)?;
        }
        Ok(())
    }

    /// Adds an entry, returning the index of an equal entry instead if there already is one.
    pub fn add_entry(&mut self, entry: RawConstantEntry) -> Result<u16> {
        if let Some(&idx) = self.lookup.get(&entry) {
            return Ok(idx);
        }
        let idx = self.entries.len();
        if idx + entry.size() as usize > u16::MAX as usize {
            return Err(Error::Overflow("constant pool"));
        }
        let idx = idx as u16;
        let wide = entry.is_wide();
        self.lookup.insert(entry.clone(), idx);
        self.entries.push(Some(entry));
        if wide {
            self.entries.push(None);
        }
        Ok(idx)
    }

    pub fn add_utf8_info(&mut self, s: &str) -> Result<u16> {
        self.add_entry(RawConstantEntry::UTF8(s.to_owned()))
    }

    pub fn add_integer_info(&mut self, i: i32) -> Result<u16> {
        self.add_entry(RawConstantEntry::Int(i))
    }

    pub fn add_float_info(&mut self, f: f32) -> Result<u16> {
        self.add_entry(RawConstantEntry::Float(f))
    }

    pub fn add_long_info(&mut self, l: i64) -> Result<u16> {
        self.add_entry(RawConstantEntry::Long(l))
    }

    pub fn add_double_info(&mut self, d: f64) -> Result<u16> {
        self.add_entry(RawConstantEntry::Double(d))
    }

    /// Adds a `CONSTANT_Class` entry for an internal class name or array descriptor.
    pub fn add_class_info(&mut self, name: &str) -> Result<u16> {
        let name = self.add_utf8_info(name)?;
        self.add_entry(RawConstantEntry::Class(name))
    }

    pub fn add_string_info(&mut self, s: &str) -> Result<u16> {
        let s = self.add_utf8_info(s)?;
        self.add_entry(RawConstantEntry::String(s))
    }

    pub fn add_name_and_type(&mut self, name_index: u16, descriptor_index: u16) -> Result<u16> {
        self.add_entry(RawConstantEntry::NameAndType(name_index, descriptor_index))
    }

    pub fn add_name_and_type_info(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name = self.add_utf8_info(name)?;
        let descriptor = self.add_utf8_info(descriptor)?;
        self.add_name_and_type(name, descriptor)
    }

    pub fn add_fieldref(&mut self, class_index: u16, name_and_type: u16) -> Result<u16> {
        self.add_entry(RawConstantEntry::Field(class_index, name_and_type))
    }

    pub fn add_fieldref_info(&mut self, class: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class = self.add_class_info(class)?;
        let nat = self.add_name_and_type_info(name, descriptor)?;
        self.add_fieldref(class, nat)
    }

    pub fn add_methodref(&mut self, class_index: u16, name_and_type: u16) -> Result<u16> {
        self.add_entry(RawConstantEntry::Method(class_index, name_and_type))
    }

    pub fn add_methodref_info(&mut self, class: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class = self.add_class_info(class)?;
        let nat = self.add_name_and_type_info(name, descriptor)?;
        self.add_methodref(class, nat)
    }

    pub fn add_interface_methodref(&mut self, class_index: u16, name_and_type: u16) -> Result<u16> {
        self.add_entry(RawConstantEntry::InterfaceMethod(class_index, name_and_type))
    }

    pub fn add_interface_methodref_info(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16> {
        let class = self.add_class_info(class)?;
        let nat = self.add_name_and_type_info(name, descriptor)?;
        self.add_interface_methodref(class, nat)
    }

    pub fn add_method_handle_info(&mut self, kind: MethodHandleKind, reference: u16) -> Result<u16> {
        self.add_entry(RawConstantEntry::MethodHandle(kind as u8, reference))
    }

    pub fn add_method_type_info(&mut self, descriptor: &str) -> Result<u16> {
        let descriptor = self.add_utf8_info(descriptor)?;
        self.add_entry(RawConstantEntry::MethodType(descriptor))
    }

    /// Adds a `CONSTANT_Dynamic` entry. `bootstrap` is a position in the BootstrapMethods table.
    pub fn add_dynamic_info(&mut self, bootstrap: u16, name_and_type: u16) -> Result<u16> {
        self.add_entry(RawConstantEntry::Dynamic(bootstrap, name_and_type))
    }

    /// Adds a `CONSTANT_InvokeDynamic` entry. `bootstrap` is a position in the BootstrapMethods table.
    pub fn add_invoke_dynamic_info(&mut self, bootstrap: u16, name_and_type: u16) -> Result<u16> {
        self.add_entry(RawConstantEntry::InvokeDynamic(bootstrap, name_and_type))
    }

    pub fn add_module_info(&mut self, name: &str) -> Result<u16> {
        let name = self.add_utf8_info(name)?;
        self.add_entry(RawConstantEntry::Module(name))
    }

    pub fn add_package_info(&mut self, name: &str) -> Result<u16> {
        let name = self.add_utf8_info(name)?;
        self.add_entry(RawConstantEntry::Package(name))
    }

    /// Returns the entry at `idx`, failing for index 0, indices past the end and the second slot of wide entries.
    pub fn get_entry(&self, idx: u16) -> Result<&RawConstantEntry> {
        self.entries
            .get(idx as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::invalid("constant pool index", idx.to_string()))
    }

    pub fn get_tag(&self, idx: u16) -> Result<u8> {
        self.get_entry(idx).map(RawConstantEntry::tag)
    }

    pub fn get_utf8_info(&self, idx: u16) -> Result<&str> {
        expect_entry!(self, idx, "Utf8", RawConstantEntry::UTF8(s) => s.as_str())
    }

    pub fn get_integer_info(&self, idx: u16) -> Result<i32> {
        expect_entry!(self, idx, "Integer", RawConstantEntry::Int(i) => *i)
    }

    pub fn get_float_info(&self, idx: u16) -> Result<f32> {
        expect_entry!(self, idx, "Float", RawConstantEntry::Float(f) => *f)
    }

    pub fn get_long_info(&self, idx: u16) -> Result<i64> {
        expect_entry!(self, idx, "Long", RawConstantEntry::Long(l) => *l)
    }

    pub fn get_double_info(&self, idx: u16) -> Result<f64> {
        expect_entry!(self, idx, "Double", RawConstantEntry::Double(d) => *d)
    }

    /// The name index of a `CONSTANT_Class` entry.
    pub fn get_class_name_index(&self, idx: u16) -> Result<u16> {
        expect_entry!(self, idx, "Class", RawConstantEntry::Class(n) => *n)
    }

    /// The internal name (or array descriptor) of a `CONSTANT_Class` entry.
    pub fn get_class_info(&self, idx: u16) -> Result<&str> {
        self.get_utf8_info(self.get_class_name_index(idx)?)
    }

    pub fn get_string_info(&self, idx: u16) -> Result<&str> {
        let s = expect_entry!(self, idx, "String", RawConstantEntry::String(s) => *s)?;
        self.get_utf8_info(s)
    }

    /// The name and descriptor indices of a `CONSTANT_NameAndType` entry.
    pub fn get_name_and_type(&self, idx: u16) -> Result<(u16, u16)> {
        expect_entry!(self, idx, "NameAndType", RawConstantEntry::NameAndType(n, t) => (*n, *t))
    }

    pub fn get_name_and_type_name(&self, idx: u16) -> Result<&str> {
        self.get_utf8_info(self.get_name_and_type(idx)?.0)
    }

    pub fn get_name_and_type_descriptor(&self, idx: u16) -> Result<&str> {
        self.get_utf8_info(self.get_name_and_type(idx)?.1)
    }

    fn member_indices(&self, idx: u16, kind: Option<MemberKind>) -> Result<(MemberKind, u16, u16)> {
        let (found, class, nat) = match self.get_entry(idx)? {
            RawConstantEntry::Field(c, n) => (MemberKind::Field, *c, *n),
            RawConstantEntry::Method(c, n) => (MemberKind::Method, *c, *n),
            RawConstantEntry::InterfaceMethod(c, n) => (MemberKind::InterfaceMethod, *c, *n),
            other => {
                return Err(Error::Mismatch {
                    index: idx,
                    expected: kind.map_or("member reference", MemberKind::name),
                    found: other.kind_name(),
                })
            }
        };
        match kind {
            Some(kind) if kind != found => Err(Error::Mismatch {
                index: idx,
                expected: kind.name(),
                found: found.name(),
            }),
            _ => Ok((found, class, nat)),
        }
    }

    fn member(&self, idx: u16, kind: Option<MemberKind>) -> Result<MemberRef<'_>> {
        let (kind, class_index, name_and_type_index) = self.member_indices(idx, kind)?;
        Ok(MemberRef {
            kind,
            class_index,
            name_and_type_index,
            class_name: self.get_class_info(class_index)?,
            name: self.get_name_and_type_name(name_and_type_index)?,
            descriptor: self.get_name_and_type_descriptor(name_and_type_index)?,
        })
    }

    /// Resolves a field, method or interface method reference.
    pub fn get_member_ref(&self, idx: u16) -> Result<MemberRef<'_>> {
        self.member(idx, None)
    }

    pub fn get_fieldref(&self, idx: u16) -> Result<MemberRef<'_>> {
        self.member(idx, Some(MemberKind::Field))
    }

    pub fn get_fieldref_class_index(&self, idx: u16) -> Result<u16> {
        Ok(self.member_indices(idx, Some(MemberKind::Field))?.1)
    }

    pub fn get_fieldref_class_name(&self, idx: u16) -> Result<&str> {
        Ok(self.get_fieldref(idx)?.class_name)
    }

    pub fn get_fieldref_name_and_type(&self, idx: u16) -> Result<u16> {
        Ok(self.member_indices(idx, Some(MemberKind::Field))?.2)
    }

    pub fn get_fieldref_name(&self, idx: u16) -> Result<&str> {
        Ok(self.get_fieldref(idx)?.name)
    }

    pub fn get_fieldref_type(&self, idx: u16) -> Result<&str> {
        Ok(self.get_fieldref(idx)?.descriptor)
    }

    pub fn get_methodref(&self, idx: u16) -> Result<MemberRef<'_>> {
        self.member(idx, Some(MemberKind::Method))
    }

    pub fn get_methodref_class_index(&self, idx: u16) -> Result<u16> {
        Ok(self.member_indices(idx, Some(MemberKind::Method))?.1)
    }

    pub fn get_methodref_class_name(&self, idx: u16) -> Result<&str> {
        Ok(self.get_methodref(idx)?.class_name)
    }

    pub fn get_methodref_name_and_type(&self, idx: u16) -> Result<u16> {
        Ok(self.member_indices(idx, Some(MemberKind::Method))?.2)
    }

    pub fn get_methodref_name(&self, idx: u16) -> Result<&str> {
        Ok(self.get_methodref(idx)?.name)
    }

    pub fn get_methodref_type(&self, idx: u16) -> Result<&str> {
        Ok(self.get_methodref(idx)?.descriptor)
    }

    pub fn get_interface_methodref(&self, idx: u16) -> Result<MemberRef<'_>> {
        self.member(idx, Some(MemberKind::InterfaceMethod))
    }

    pub fn get_interface_methodref_class_name(&self, idx: u16) -> Result<&str> {
        Ok(self.get_interface_methodref(idx)?.class_name)
    }

    pub fn get_interface_methodref_name(&self, idx: u16) -> Result<&str> {
        Ok(self.get_interface_methodref(idx)?.name)
    }

    pub fn get_interface_methodref_type(&self, idx: u16) -> Result<&str> {
        Ok(self.get_interface_methodref(idx)?.descriptor)
    }

    fn method_handle(&self, idx: u16) -> Result<(u8, u16)> {
        expect_entry!(self, idx, "MethodHandle", RawConstantEntry::MethodHandle(k, r) => (*k, *r))
    }

    pub fn get_method_handle_kind(&self, idx: u16) -> Result<MethodHandleKind> {
        let (kind, _) = self.method_handle(idx)?;
        MethodHandleKind::try_from(kind).map_err(Error::UnknownReferenceKind)
    }

    /// The index of the member reference a method handle points to.
    pub fn get_method_handle_index(&self, idx: u16) -> Result<u16> {
        Ok(self.method_handle(idx)?.1)
    }

    /// The method descriptor of a `CONSTANT_MethodType` entry.
    pub fn get_method_type_info(&self, idx: u16) -> Result<&str> {
        let d = expect_entry!(self, idx, "MethodType", RawConstantEntry::MethodType(d) => *d)?;
        self.get_utf8_info(d)
    }

    fn invoke_dynamic(&self, idx: u16) -> Result<(u16, u16)> {
        expect_entry!(self, idx, "InvokeDynamic", RawConstantEntry::InvokeDynamic(b, n) => (*b, *n))
    }

    /// The position of the call site's bootstrap method in the BootstrapMethods table.
    pub fn get_invoke_dynamic_bootstrap(&self, idx: u16) -> Result<u16> {
        Ok(self.invoke_dynamic(idx)?.0)
    }

    pub fn get_invoke_dynamic_name_and_type(&self, idx: u16) -> Result<u16> {
        Ok(self.invoke_dynamic(idx)?.1)
    }

    pub fn get_invoke_dynamic_name(&self, idx: u16) -> Result<&str> {
        self.get_name_and_type_name(self.get_invoke_dynamic_name_and_type(idx)?)
    }

    /// The method descriptor of the call site.
    pub fn get_invoke_dynamic_type(&self, idx: u16) -> Result<&str> {
        self.get_name_and_type_descriptor(self.get_invoke_dynamic_name_and_type(idx)?)
    }

    fn dynamic(&self, idx: u16) -> Result<(u16, u16)> {
        expect_entry!(self, idx, "Dynamic", RawConstantEntry::Dynamic(b, n) => (*b, *n))
    }

    pub fn get_dynamic_bootstrap(&self, idx: u16) -> Result<u16> {
        Ok(self.dynamic(idx)?.0)
    }

    pub fn get_dynamic_name_and_type(&self, idx: u16) -> Result<u16> {
        Ok(self.dynamic(idx)?.1)
    }

    pub fn get_dynamic_name(&self, idx: u16) -> Result<&str> {
        self.get_name_and_type_name(self.get_dynamic_name_and_type(idx)?)
    }

    pub fn get_dynamic_type(&self, idx: u16) -> Result<&str> {
        self.get_name_and_type_descriptor(self.get_dynamic_name_and_type(idx)?)
    }

    pub fn get_module_info(&self, idx: u16) -> Result<&str> {
        let n = expect_entry!(self, idx, "Module", RawConstantEntry::Module(n) => *n)?;
        self.get_utf8_info(n)
    }

    pub fn get_package_info(&self, idx: u16) -> Result<&str> {
        let n = expect_entry!(self, idx, "Package", RawConstantEntry::Package(n) => *n)?;
        self.get_utf8_info(n)
    }

    fn copy_class(&self, idx: u16, dest: &mut ConstPool, class_names: &ClassNames) -> Result<u16> {
        dest.add_class_info(&rename_class(self.get_class_info(idx)?, class_names))
    }

    fn copy_name_and_type(
        &self,
        idx: u16,
        dest: &mut ConstPool,
        class_names: &ClassNames,
    ) -> Result<u16> {
        let (name, descriptor) = self.get_name_and_type(idx)?;
        dest.add_name_and_type_info(
            self.get_utf8_info(name)?,
            &rename_descriptor(self.get_utf8_info(descriptor)?, class_names),
        )
    }

    fn copy_member(&self, idx: u16, dest: &mut ConstPool, class_names: &ClassNames) -> Result<u16> {
        let (kind, class, nat) = self.member_indices(idx, None)?;
        let class = self.copy_class(class, dest, class_names)?;
        let nat = self.copy_name_and_type(nat, dest, class_names)?;
        match kind {
            MemberKind::Field => dest.add_fieldref(class, nat),
            MemberKind::Method => dest.add_methodref(class, nat),
            MemberKind::InterfaceMethod => dest.add_interface_methodref(class, nat),
        }
    }

    /// Copies the entry at `idx` and everything it refers to into `dest`, returning its index there.
    ///
    /// Class names are replaced according to `class_names`, in class entries as well as in the
    /// descriptors of `NameAndType` and `MethodType` entries. Index 0 copies to 0. Dynamic entries keep
    /// their bootstrap method position, so the BootstrapMethods table must be copied along with them.
    pub fn copy(&self, idx: u16, dest: &mut ConstPool, class_names: &ClassNames) -> Result<u16> {
        use RawConstantEntry::*;
        if idx == 0 {
            return Ok(0);
        }
        match self.get_entry(idx)? {
            UTF8(s) => dest.add_utf8_info(s),
            e @ Int(_) | e @ Float(_) | e @ Long(_) | e @ Double(_) => dest.add_entry(e.clone()),
            Class(_) => self.copy_class(idx, dest, class_names),
            String(s) => dest.add_string_info(self.get_utf8_info(*s)?),
            Field(..) | Method(..) | InterfaceMethod(..) => self.copy_member(idx, dest, class_names),
            NameAndType(..) => self.copy_name_and_type(idx, dest, class_names),
            MethodHandle(kind, reference) => {
                let reference = self.copy_member(*reference, dest, class_names)?;
                dest.add_entry(MethodHandle(*kind, reference))
            }
            MethodType(d) => {
                dest.add_method_type_info(&rename_descriptor(self.get_utf8_info(*d)?, class_names))
            }
            Dynamic(bsm, nat) => {
                let nat = self.copy_name_and_type(*nat, dest, class_names)?;
                dest.add_dynamic_info(*bsm, nat)
            }
            InvokeDynamic(bsm, nat) => {
                let nat = self.copy_name_and_type(*nat, dest, class_names)?;
                dest.add_invoke_dynamic_info(*bsm, nat)
            }
            Module(n) => dest.add_module_info(self.get_utf8_info(*n)?),
            Package(n) => dest.add_package_info(self.get_utf8_info(*n)?),
        }
    }
}
