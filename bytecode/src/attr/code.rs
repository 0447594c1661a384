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
use std::io::{Read, Write};

use log::trace;

use crate::code::{instruction_length, CodeIterator};
use crate::constants::insn::*;
use crate::cp::ConstPool;
use crate::rw::{read_bytes, u32_len};
use crate::ty::ClassNames;
use crate::{ReadWrite, Result};

use super::{read_all, total_length, write_all, AttributeInfo, AttributeKind};

/// An entry of the exception table. `catch_type` 0 catches everything.
#[derive(ReadWrite, Copy, Clone, Eq, PartialEq, Debug)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

/// The body of a method.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self {
            max_stack,
            max_locals,
            code,
            exception_table: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn read_from<R: Read>(cp: &ConstPool, reader: &mut R) -> Result<Self> {
        let max_stack = u16::read_from(reader)?;
        let max_locals = u16::read_from(reader)?;
        let code_length = u32::read_from(reader)?;
        let code = read_bytes(reader, code_length as usize)?;
        let exception_table = ReadWrite::read_from(reader)?;
        let attributes = read_all(cp, reader)?;
        Ok(Self {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.max_stack.write_to(writer)?;
        self.max_locals.write_to(writer)?;
        u32_len(self.code.len(), "code length")?.write_to(writer)?;
        writer.write_all(&self.code)?;
        self.exception_table.write_to(writer)?;
        write_all(&self.attributes, writer)
    }

    pub(crate) fn payload_len(&self) -> usize {
        12 + self.code.len() + 8 * self.exception_table.len() + total_length(&self.attributes)
    }

    /// A cursor over the instructions of this body.
    pub fn iterator(&mut self) -> CodeIterator<'_> {
        CodeIterator::new(self)
    }

    /// Returns the first nested attribute of the given kind.
    pub fn attribute(&self, kind: AttributeKind) -> Option<&AttributeInfo> {
        super::lookup_by_kind(Some(self.attributes.as_slice()), kind)
    }

    pub fn attribute_mut(&mut self, kind: AttributeKind) -> Option<&mut AttributeInfo> {
        super::lookup_by_kind_mut(Some(&mut self.attributes), kind)
    }

    /// Copies this body into `dest`, rewriting every constant pool operand.
    ///
    /// An `ldc` whose constant lands above index 255 in `dest` is widened to `ldc_w`.
    pub fn copy(&self, src: &ConstPool, dest: &mut ConstPool, class_names: &ClassNames) -> Result<Self> {
        let attributes = self
            .attributes
            .iter()
            .map(|a| a.copy(src, dest, class_names))
            .collect::<Result<_>>()?;
        let exception_table = self
            .exception_table
            .iter()
            .map(|e| -> Result<ExceptionTableEntry> {
                Ok(ExceptionTableEntry {
                    catch_type: src.copy(e.catch_type, dest, class_names)?,
                    ..*e
                })
            })
            .collect::<Result<_>>()?;

        let mut code = self.code.clone();
        let mut widen = Vec::new();
        let mut pos = 0;
        while pos < code.len() {
            let len = instruction_length(&code, pos)?;
            match code[pos] {
                LDC => {
                    let idx = src.copy(code[pos + 1] as u16, dest, class_names)?;
                    if idx <= 0xFF {
                        code[pos + 1] = idx as u8;
                    } else {
                        widen.push((pos, idx));
                    }
                }
                LDC_W | LDC2_W | GETSTATIC..=NEW | ANEWARRAY | CHECKCAST | INSTANCEOF | MULTIANEWARRAY => {
                    let old = u16::from_be_bytes([code[pos + 1], code[pos + 2]]);
                    let idx = src.copy(old, dest, class_names)?;
                    code[pos + 1..pos + 3].copy_from_slice(&idx.to_be_bytes());
                }
                _ => {}
            }
            pos += len;
        }

        let mut copied = Self {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code,
            exception_table,
            attributes,
        };
        let mut iter = copied.iterator();
        // back to front so earlier positions stay valid
        for (pos, idx) in widen.into_iter().rev() {
            trace!("widening ldc at {} for constant #{}", pos, idx);
            let gap = iter.insert_gap_at(pos, 1, false)?;
            let at = gap.position + gap.length - 1;
            iter.write8bit(LDC_W, at)?;
            iter.write16bit(idx, at + 1)?;
        }
        Ok(copied)
    }
}
