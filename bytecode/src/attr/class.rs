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
use crate::cp::ConstPool;
use crate::ty::ClassNames;
use crate::Result;

/// The name of the source file a class was compiled from.
#[derive(ReadWrite, Copy, Clone, Eq, PartialEq, Debug)]
pub struct SourceFileAttribute {
    /// Index of a `CONSTANT_Utf8` entry.
    pub index: u16,
}

impl SourceFileAttribute {
    pub fn file_name<'a>(&self, cp: &'a ConstPool) -> Result<&'a str> {
        cp.get_utf8_info(self.index)
    }

    pub(super) fn copy(&self, src: &ConstPool, dest: &mut ConstPool) -> Result<Self> {
        Ok(Self {
            index: dest.add_utf8_info(self.file_name(src)?)?,
        })
    }
}

/// An entry of the InnerClasses attribute. Indices may be 0 where the JVM allows it.
#[derive(ReadWrite, Copy, Clone, Eq, PartialEq, Debug)]
pub struct InnerClass {
    pub inner_class_info: u16,
    pub outer_class_info: u16,
    pub inner_name: u16,
    pub access_flags: u16,
}

#[derive(ReadWrite, Clone, Eq, PartialEq, Debug, Default)]
pub struct InnerClassesAttribute {
    pub classes: Vec<InnerClass>,
}

impl InnerClassesAttribute {
    pub(super) fn copy(&self, src: &ConstPool, dest: &mut ConstPool, class_names: &ClassNames) -> Result<Self> {
        let classes = self
            .classes
            .iter()
            .map(|c| -> Result<InnerClass> {
                Ok(InnerClass {
                    inner_class_info: src.copy(c.inner_class_info, dest, class_names)?,
                    outer_class_info: src.copy(c.outer_class_info, dest, class_names)?,
                    inner_name: src.copy(c.inner_name, dest, class_names)?,
                    access_flags: c.access_flags,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { classes })
    }
}

/// A bootstrap method: a method handle and the static arguments passed to it.
#[derive(ReadWrite, Clone, Eq, PartialEq, Debug)]
pub struct BootstrapMethod {
    /// Index of a `CONSTANT_MethodHandle` entry.
    pub method_ref: u16,
    /// Indices of loadable constants.
    pub arguments: Vec<u16>,
}

/// The table that dynamic call sites and dynamic constants refer to by position.
#[derive(ReadWrite, Clone, Eq, PartialEq, Debug, Default)]
pub struct BootstrapMethodsAttribute {
    pub methods: Vec<BootstrapMethod>,
}

impl BootstrapMethodsAttribute {
    /// Copies the table, keeping every method at its position.
    pub(super) fn copy(&self, src: &ConstPool, dest: &mut ConstPool, class_names: &ClassNames) -> Result<Self> {
        let methods = self
            .methods
            .iter()
            .map(|m| -> Result<BootstrapMethod> {
                Ok(BootstrapMethod {
                    method_ref: src.copy(m.method_ref, dest, class_names)?,
                    arguments: m
                        .arguments
                        .iter()
                        .map(|&a| src.copy(a, dest, class_names))
                        .collect::<Result<_>>()?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { methods })
    }
}
