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
//! Walking and editing the instructions of a method body.

use std::convert::TryFrom;

use crate::constants::insn::*;
use crate::{Error, Result};

mod iterator;

pub use iterator::*;

/// The length of instructions that have no variable-length operands.
fn fixed_length(opcode: u8) -> Option<usize> {
    Some(match opcode {
        NOP..=DCONST_1 => 1,
        BIPUSH => 2,
        SIPUSH => 3,
        LDC => 2,
        LDC_W | LDC2_W => 3,
        ILOAD..=ALOAD => 2,
        ILOAD_0..=0x35 => 1,
        ISTORE..=ASTORE => 2,
        ISTORE_0..=0x83 => 1,
        IINC => 3,
        I2L..=0x98 => 1,
        IFEQ..=JSR => 3,
        RET => 2,
        IRETURN..=RETURN => 1,
        GETSTATIC..=INVOKESTATIC => 3,
        INVOKEINTERFACE | INVOKEDYNAMIC => 5,
        NEW => 3,
        NEWARRAY => 2,
        ANEWARRAY => 3,
        ARRAYLENGTH | ATHROW => 1,
        CHECKCAST | INSTANCEOF => 3,
        MONITORENTER | MONITOREXIT => 1,
        MULTIANEWARRAY => 4,
        IFNULL | IFNONNULL => 3,
        GOTO_W | JSR_W => 5,
        _ => return None,
    })
}

fn s32_at(code: &[u8], pos: usize) -> Result<i32> {
    code.get(pos..pos + 4)
        .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::invalid("instruction", format!("truncated switch at {}", pos)))
}

/// The position of the first 4-byte aligned operand of a switch instruction at `pos`.
#[inline]
pub(crate) fn switch_operands(pos: usize) -> usize {
    (pos & !3) + 4
}

/// Returns the length of the instruction at `pos`, including the padding of switch instructions and
/// the operands of `wide`.
pub fn instruction_length(code: &[u8], pos: usize) -> Result<usize> {
    let opcode = *code
        .get(pos)
        .ok_or_else(|| Error::invalid("code index", pos.to_string()))?;
    let len = match fixed_length(opcode) {
        Some(len) => len,
        None => match opcode {
            TABLESWITCH => {
                let ops = switch_operands(pos);
                let low = s32_at(code, ops + 4)?;
                let high = s32_at(code, ops + 8)?;
                let count = i64::from(high) - i64::from(low) + 1;
                let count = usize::try_from(count)
                    .map_err(|_| Error::invalid("tableswitch", format!("low {} > high {}", low, high)))?;
                ops - pos + 12 + 4 * count
            }
            LOOKUPSWITCH => {
                let ops = switch_operands(pos);
                let pairs = usize::try_from(s32_at(code, ops + 4)?)
                    .map_err(|_| Error::invalid("lookupswitch", "negative pair count"))?;
                ops - pos + 8 + 8 * pairs
            }
            WIDE => match code.get(pos + 1) {
                Some(&IINC) => 6,
                Some(_) => 4,
                None => 2,
            },
            _ => {
                return Err(Error::invalid(
                    "opcode",
                    format!("{:#04x} at {}", opcode, pos),
                ))
            }
        },
    };
    if pos + len > code.len() {
        return Err(Error::invalid(
            "instruction",
            format!("{:#04x} at {} runs past the end of the code", opcode, pos),
        ));
    }
    Ok(len)
}
