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
//! Debugging tables nested in the Code attribute.

use crate::cp::ConstPool;
use crate::ty::{rename_descriptor, ClassNames};
use crate::Result;

#[derive(ReadWrite, Copy, Clone, Eq, PartialEq, Debug)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

/// Maps ranges of bytecode to source lines. Entries are ordered by `start_pc`.
#[derive(ReadWrite, Clone, Eq, PartialEq, Debug, Default)]
pub struct LineNumberAttribute {
    pub entries: Vec<LineNumber>,
}

impl LineNumberAttribute {
    /// The source line of the instruction at `pc`, or -1 if the table is empty.
    ///
    /// A `pc` before the first entry maps to the first line.
    pub fn to_line_number(&self, pc: usize) -> i32 {
        let after = self
            .entries
            .iter()
            .position(|e| pc < e.start_pc as usize)
            .unwrap_or_else(|| self.entries.len());
        self.entries
            .get(after.saturating_sub(1))
            .map_or(-1, |e| e.line_number as i32)
    }

    /// The first `start_pc` recorded for `line`, or -1.
    pub fn to_start_pc(&self, line: u16) -> i32 {
        self.entries
            .iter()
            .find(|e| e.line_number == line)
            .map_or(-1, |e| e.start_pc as i32)
    }

    pub(crate) fn shift_pc(&mut self, at: usize, gap: usize, exclusive: bool) {
        for e in &mut self.entries {
            e.start_pc = shift_target(e.start_pc as usize, at, gap, exclusive) as u16;
        }
    }
}

#[derive(ReadWrite, Copy, Clone, Eq, PartialEq, Debug)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    /// A field descriptor in LocalVariableTable, a field signature in LocalVariableTypeTable.
    pub descriptor_index: u16,
    pub index: u16,
}

/// The layout shared by LocalVariableTable and LocalVariableTypeTable.
#[derive(ReadWrite, Clone, Eq, PartialEq, Debug, Default)]
pub struct LocalVariableAttribute {
    pub entries: Vec<LocalVariable>,
}

impl LocalVariableAttribute {
    pub fn variable_name<'a>(&self, i: usize, cp: &'a ConstPool) -> Result<Option<&'a str>> {
        self.entries
            .get(i)
            .map(|e| cp.get_utf8_info(e.name_index))
            .transpose()
    }

    /// Variables live at `pc` occupying `slot`.
    pub fn live_at(&self, pc: usize, slot: u16) -> impl Iterator<Item = &LocalVariable> {
        self.entries.iter().filter(move |e| {
            let start = e.start_pc as usize;
            e.index == slot && start <= pc && pc < start + e.length as usize
        })
    }

    /// Ranges that start after the gap move, ranges that span it grow.
    pub(crate) fn shift_pc(&mut self, at: usize, gap: usize, exclusive: bool) {
        for e in &mut self.entries {
            let start = e.start_pc as usize;
            let end = start + e.length as usize;
            if start > at || (exclusive && start == at) {
                e.start_pc = (start + gap) as u16;
            } else if end > at || (exclusive && end == at) {
                e.length = (e.length as usize + gap) as u16;
            }
        }
    }

    /// Copies the table. Descriptors are renamed when `class_names` is given; signatures are copied as they are.
    pub(super) fn copy(
        &self,
        src: &ConstPool,
        dest: &mut ConstPool,
        class_names: Option<&ClassNames>,
    ) -> Result<Self> {
        let entries = self
            .entries
            .iter()
            .map(|e| -> Result<LocalVariable> {
                let descriptor = src.get_utf8_info(e.descriptor_index)?;
                let descriptor_index = match class_names {
                    Some(names) => dest.add_utf8_info(&rename_descriptor(descriptor, names))?,
                    None => dest.add_utf8_info(descriptor)?,
                };
                Ok(LocalVariable {
                    name_index: dest.add_utf8_info(src.get_utf8_info(e.name_index)?)?,
                    descriptor_index,
                    ..*e
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { entries })
    }
}

/// Where a branch target or table pc ends up after `gap` bytes are inserted at `at`.
///
/// Targets equal to `at` only move when the gap is exclusive.
#[inline]
pub(crate) fn shift_target(pc: usize, at: usize, gap: usize, exclusive: bool) -> usize {
    if pc > at || (exclusive && pc == at) {
        pc + gap
    } else {
        pc
    }
}
