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
use std::convert::TryFrom;

use log::debug;

use crate::attr::{shift_target, AttributeBody, CodeAttribute, ExceptionTableEntry};
use crate::constants::insn::*;
use crate::constants::CONSTRUCTOR_NAME;
use crate::cp::ConstPool;
use crate::{Error, Result};

use super::{instruction_length, switch_operands};

/// The location and size of bytes inserted by [`CodeIterator::insert_gap_at`].
///
/// The gap is filled with `nop`s.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Gap {
    pub position: usize,
    pub length: usize,
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Constructor {
    Any,
    Super,
    This,
}

/// A cursor over the instructions of a [`CodeAttribute`] that can also edit them.
///
/// Operand accessors take absolute code positions; they fail instead of panicking when the position
/// is out of range.
#[derive(Debug)]
pub struct CodeIterator<'a> {
    code: &'a mut CodeAttribute,
    current: usize,
}

impl<'a> CodeIterator<'a> {
    pub(crate) fn new(code: &'a mut CodeAttribute) -> Self {
        Self { code, current: 0 }
    }

    /// The code attribute being iterated.
    pub fn get(&self) -> &CodeAttribute {
        &*self.code
    }

    pub fn get_mut(&mut self) -> &mut CodeAttribute {
        &mut *self.code
    }

    pub fn code_length(&self) -> usize {
        self.code.code.len()
    }

    /// Moves to the first instruction.
    pub fn begin(&mut self) {
        self.current = 0;
    }

    /// Moves to the instruction at `index`, which must start an instruction.
    pub fn move_to(&mut self, index: usize) {
        self.current = index;
    }

    pub fn has_next(&self) -> bool {
        self.current < self.code.code.len()
    }

    /// Returns the position of the next instruction and advances past it.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<usize> {
        let pos = self.current;
        self.current = pos + instruction_length(&self.code.code, pos)?;
        Ok(pos)
    }

    /// The position of the instruction [`next`](Self::next) returns, without advancing.
    pub fn lookahead(&self) -> usize {
        self.current
    }

    fn bytes(&self, index: usize, n: usize) -> Result<&[u8]> {
        self.code
            .code
            .get(index..index + n)
            .ok_or_else(|| Error::invalid("code index", index.to_string()))
    }

    fn bytes_mut(&mut self, index: usize, n: usize) -> Result<&mut [u8]> {
        self.code
            .code
            .get_mut(index..index + n)
            .ok_or_else(|| Error::invalid("code index", index.to_string()))
    }

    pub fn byte_at(&self, index: usize) -> Result<u8> {
        Ok(self.bytes(index, 1)?[0])
    }

    pub fn signed_byte_at(&self, index: usize) -> Result<i8> {
        Ok(self.byte_at(index)? as i8)
    }

    pub fn u16bit_at(&self, index: usize) -> Result<u16> {
        let b = self.bytes(index, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn s16bit_at(&self, index: usize) -> Result<i16> {
        Ok(self.u16bit_at(index)? as i16)
    }

    pub fn s32bit_at(&self, index: usize) -> Result<i32> {
        let b = self.bytes(index, 4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn write8bit(&mut self, value: u8, index: usize) -> Result<()> {
        self.bytes_mut(index, 1)?[0] = value;
        Ok(())
    }

    pub fn write16bit(&mut self, value: u16, index: usize) -> Result<()> {
        self.bytes_mut(index, 2)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn write32bit(&mut self, value: i32, index: usize) -> Result<()> {
        self.bytes_mut(index, 4)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Overwrites code starting at `index`.
    pub fn write(&mut self, bytes: &[u8], index: usize) -> Result<()> {
        self.bytes_mut(index, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Inserts `bytes` before the instruction at `pos`; branches to `pos` land on the inserted code.
    ///
    /// Returns the position the bytes were written at. Bytes left over from rounding the gap stay `nop`.
    pub fn insert_at(&mut self, pos: usize, bytes: &[u8]) -> Result<usize> {
        let gap = self.insert_gap_at(pos, bytes.len(), false)?;
        self.write(bytes, gap.position)?;
        Ok(gap.position)
    }

    /// Moves to the instruction after the call to a super or `this` constructor and returns the
    /// position of that call, or `None` if there is none.
    pub fn skip_constructor(&mut self, cp: &ConstPool) -> Result<Option<usize>> {
        self.skip_constructor0(cp, Constructor::Any)
    }

    /// Like [`skip_constructor`](Self::skip_constructor), but only for calls to a super constructor.
    pub fn skip_super_constructor(&mut self, cp: &ConstPool) -> Result<Option<usize>> {
        self.skip_constructor0(cp, Constructor::Super)
    }

    /// Like [`skip_constructor`](Self::skip_constructor), but only for calls to `this(...)`.
    pub fn skip_this_constructor(&mut self, cp: &ConstPool) -> Result<Option<usize>> {
        self.skip_constructor0(cp, Constructor::This)
    }

    fn skip_constructor0(&mut self, cp: &ConstPool, which: Constructor) -> Result<Option<usize>> {
        let this_class = match which {
            Constructor::Any => None,
            _ => Some(cp.class_name()?),
        };
        self.begin();
        // every `new` is paired with a later `<init>` call on the created object
        let mut nested = 0i32;
        while self.has_next() {
            let index = self.next()?;
            match self.byte_at(index)? {
                NEW => nested += 1,
                INVOKESPECIAL => {
                    let member = cp.get_member_ref(self.u16bit_at(index + 1)?)?;
                    if member.name != CONSTRUCTOR_NAME {
                        continue;
                    }
                    nested -= 1;
                    if nested < 0 {
                        let calls_this = this_class == Some(member.class_name);
                        match which {
                            Constructor::Any => return Ok(Some(index)),
                            Constructor::This if calls_this => return Ok(Some(index)),
                            Constructor::Super if !calls_this => return Ok(Some(index)),
                            _ => break,
                        }
                    }
                }
                _ => {}
            }
        }
        self.begin();
        Ok(None)
    }

    /// Inserts `length` bytes of `nop`s before the instruction at `pos`, rounded up to a multiple of
    /// four so that switch padding stays valid.
    ///
    /// Branch offsets, the exception table, line numbers, local variable ranges and stack map frames
    /// are shifted. Jumps to `pos` itself land on the start of the gap unless `exclusive` is set, in
    /// which case they still reach the moved instruction.
    pub fn insert_gap_at(&mut self, pos: usize, length: usize, exclusive: bool) -> Result<Gap> {
        if length == 0 {
            return Ok(Gap { position: pos, length: 0 });
        }
        let code_len = self.code.code.len();
        if pos > code_len {
            return Err(Error::invalid("gap position", pos.to_string()));
        }
        let gap = (length + 3) & !3;
        if code_len + gap > u16::MAX as usize {
            return Err(Error::Overflow("code length"));
        }

        relocate_branches(&mut self.code.code, pos, gap, exclusive)?;
        self.code
            .code
            .splice(pos..pos, std::iter::repeat(NOP).take(gap));

        let shift = |pc: u16| shift_target(pc as usize, pos, gap, exclusive) as u16;
        for e in &mut self.code.exception_table {
            e.start_pc = shift(e.start_pc);
            e.end_pc = shift(e.end_pc);
            e.handler_pc = shift(e.handler_pc);
        }
        for attr in &mut self.code.attributes {
            match &mut attr.body {
                AttributeBody::LineNumberTable(t) => t.shift_pc(pos, gap, exclusive),
                AttributeBody::LocalVariableTable(t) | AttributeBody::LocalVariableTypeTable(t) => {
                    t.shift_pc(pos, gap, exclusive)
                }
                AttributeBody::StackMapTable(t) => t.shift_pc(pos, gap, exclusive),
                _ => {}
            }
        }
        self.current = shift_target(self.current, pos, gap, exclusive);

        debug!("inserted a {} byte gap at {}", gap, pos);
        Ok(Gap { position: pos, length: gap })
    }

    /// Prepends `entries` to the exception table with their pcs moved by `offset`.
    pub fn insert_exception_table(&mut self, entries: &[ExceptionTableEntry], offset: usize) -> Result<()> {
        let add = |pc: u16| {
            u16::try_from(pc as usize + offset).map_err(|_| Error::Overflow("exception table pc"))
        };
        let shifted = entries
            .iter()
            .map(|e| -> Result<ExceptionTableEntry> {
                Ok(ExceptionTableEntry {
                    start_pc: add(e.start_pc)?,
                    end_pc: add(e.end_pc)?,
                    handler_pc: add(e.handler_pc)?,
                    catch_type: e.catch_type,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.code.exception_table.splice(0..0, shifted);
        Ok(())
    }
}

/// The offset a branch at `pos` needs after the gap is inserted.
fn new_offset(pos: usize, offset: i64, at: usize, gap: usize, exclusive: bool) -> i64 {
    let target = pos as i64 + offset;
    let at = at as i64;
    let gap = gap as i64;
    let new_target = if target > at || (exclusive && target == at) {
        target + gap
    } else {
        target
    };
    let new_pos = if pos as i64 >= at { pos as i64 + gap } else { pos as i64 };
    new_target - new_pos
}

fn read_i32(code: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([code[at], code[at + 1], code[at + 2], code[at + 3]])
}

/// A relocated branch operand, written only once every branch is known to fit.
enum Patch {
    Short(usize, i16),
    Wide(usize, i32),
}

fn relocate32(
    code: &[u8],
    pos: usize,
    at: usize,
    gap: usize,
    exclusive: bool,
    operand: usize,
) -> Result<Patch> {
    let offset = read_i32(code, operand);
    let new = new_offset(pos, offset as i64, at, gap, exclusive);
    let new = i32::try_from(new).map_err(|_| Error::Overflow("branch offset"))?;
    Ok(Patch::Wide(operand, new))
}

/// Rewrites every branch offset in `code` for a gap about to be inserted at `at`.
///
/// Nothing is written if some offset overflows.
fn relocate_branches(code: &mut [u8], at: usize, gap: usize, exclusive: bool) -> Result<()> {
    let mut patches = Vec::new();
    let mut pos = 0;
    while pos < code.len() {
        // instruction_length checked that all operands are in bounds
        let len = instruction_length(code, pos)?;
        match code[pos] {
            IFEQ..=JSR | IFNULL | IFNONNULL => {
                let offset = i16::from_be_bytes([code[pos + 1], code[pos + 2]]);
                let new = new_offset(pos, offset as i64, at, gap, exclusive);
                let new = i16::try_from(new).map_err(|_| Error::Overflow("branch offset"))?;
                patches.push(Patch::Short(pos + 1, new));
            }
            GOTO_W | JSR_W => patches.push(relocate32(code, pos, at, gap, exclusive, pos + 1)?),
            TABLESWITCH => {
                let ops = switch_operands(pos);
                patches.push(relocate32(code, pos, at, gap, exclusive, ops)?);
                let low = read_i32(code, ops + 4) as i64;
                let high = read_i32(code, ops + 8) as i64;
                for i in 0..(high - low + 1) as usize {
                    patches.push(relocate32(code, pos, at, gap, exclusive, ops + 12 + 4 * i)?);
                }
            }
            LOOKUPSWITCH => {
                let ops = switch_operands(pos);
                patches.push(relocate32(code, pos, at, gap, exclusive, ops)?);
                let pairs = read_i32(code, ops + 4) as usize;
                for i in 0..pairs {
                    patches.push(relocate32(code, pos, at, gap, exclusive, ops + 12 + 8 * i)?);
                }
            }
            _ => {}
        }
        pos += len;
    }
    for patch in patches {
        match patch {
            Patch::Short(operand, new) => code[operand..operand + 2].copy_from_slice(&new.to_be_bytes()),
            Patch::Wide(operand, new) => code[operand..operand + 4].copy_from_slice(&new.to_be_bytes()),
        }
    }
    Ok(())
}
