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
//! The StackMapTable attribute.
//!
//! Frames are kept in the compact form they were read in; a frame only switches to its extended form
//! when its offset delta no longer fits.

use std::io::{Read, Write};

use crate::cp::ConstPool;
use crate::ty::ClassNames;
use crate::{Error, ReadWrite, Result};

use super::debug::shift_target;

#[derive(ReadWrite, Copy, Clone, Eq, PartialEq, Debug)]
#[tag_type(u8)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    /// Index of a `CONSTANT_Class` entry.
    Object(u16),
    /// Offset of the `new` instruction that created the object.
    Uninitialized(u16),
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum StackMapFrame {
    Same {
        offset_delta: u16,
    },
    SameLocals1StackItem {
        offset_delta: u16,
        stack: VerificationType,
    },
    SameLocals1StackItemExtended {
        offset_delta: u16,
        stack: VerificationType,
    },
    /// Removes the last `k` (1 to 3) locals.
    Chop {
        k: u8,
        offset_delta: u16,
    },
    SameExtended {
        offset_delta: u16,
    },
    /// Adds 1 to 3 locals.
    Append {
        offset_delta: u16,
        locals: Vec<VerificationType>,
    },
    Full {
        offset_delta: u16,
        locals: Vec<VerificationType>,
        stack: Vec<VerificationType>,
    },
}

impl StackMapFrame {
    pub fn offset_delta(&self) -> u16 {
        match self {
            StackMapFrame::Same { offset_delta }
            | StackMapFrame::SameLocals1StackItem { offset_delta, .. }
            | StackMapFrame::SameLocals1StackItemExtended { offset_delta, .. }
            | StackMapFrame::Chop { offset_delta, .. }
            | StackMapFrame::SameExtended { offset_delta }
            | StackMapFrame::Append { offset_delta, .. }
            | StackMapFrame::Full { offset_delta, .. } => *offset_delta,
        }
    }

    /// Sets the offset delta, switching compact frames to their extended form when needed.
    pub fn set_offset_delta(&mut self, delta: u16) {
        match self {
            StackMapFrame::Same { .. } if delta > 63 => {
                *self = StackMapFrame::SameExtended { offset_delta: delta };
            }
            StackMapFrame::SameLocals1StackItem { stack, .. } if delta > 63 => {
                let stack = *stack;
                *self = StackMapFrame::SameLocals1StackItemExtended {
                    offset_delta: delta,
                    stack,
                };
            }
            StackMapFrame::Same { offset_delta }
            | StackMapFrame::SameLocals1StackItem { offset_delta, .. }
            | StackMapFrame::SameLocals1StackItemExtended { offset_delta, .. }
            | StackMapFrame::Chop { offset_delta, .. }
            | StackMapFrame::SameExtended { offset_delta }
            | StackMapFrame::Append { offset_delta, .. }
            | StackMapFrame::Full { offset_delta, .. } => *offset_delta = delta,
        }
    }

    fn types_mut(&mut self) -> Vec<&mut VerificationType> {
        match self {
            StackMapFrame::Same { .. } | StackMapFrame::Chop { .. } | StackMapFrame::SameExtended { .. } => {
                Vec::new()
            }
            StackMapFrame::SameLocals1StackItem { stack, .. }
            | StackMapFrame::SameLocals1StackItemExtended { stack, .. } => vec![stack],
            StackMapFrame::Append { locals, .. } => locals.iter_mut().collect(),
            StackMapFrame::Full { locals, stack, .. } => locals.iter_mut().chain(stack.iter_mut()).collect(),
        }
    }

    fn payload_len(&self) -> usize {
        fn types_len(types: &[VerificationType]) -> usize {
            types
                .iter()
                .map(|t| match t {
                    VerificationType::Object(_) | VerificationType::Uninitialized(_) => 3,
                    _ => 1,
                })
                .sum()
        }
        match self {
            StackMapFrame::Same { .. } => 1,
            StackMapFrame::SameLocals1StackItem { stack, .. } => 1 + types_len(std::slice::from_ref(stack)),
            StackMapFrame::SameLocals1StackItemExtended { stack, .. } => {
                3 + types_len(std::slice::from_ref(stack))
            }
            StackMapFrame::Chop { .. } | StackMapFrame::SameExtended { .. } => 3,
            StackMapFrame::Append { locals, .. } => 3 + types_len(locals),
            StackMapFrame::Full { locals, stack, .. } => 7 + types_len(locals) + types_len(stack),
        }
    }
}

impl ReadWrite for StackMapFrame {
    fn read_from<T: Read>(reader: &mut T) -> Result<Self> {
        let frame_type = u8::read_from(reader)?;
        Ok(match frame_type {
            0..=63 => StackMapFrame::Same {
                offset_delta: frame_type as u16,
            },
            64..=127 => StackMapFrame::SameLocals1StackItem {
                offset_delta: frame_type as u16 - 64,
                stack: VerificationType::read_from(reader)?,
            },
            247 => StackMapFrame::SameLocals1StackItemExtended {
                offset_delta: u16::read_from(reader)?,
                stack: VerificationType::read_from(reader)?,
            },
            248..=250 => StackMapFrame::Chop {
                k: 251 - frame_type,
                offset_delta: u16::read_from(reader)?,
            },
            251 => StackMapFrame::SameExtended {
                offset_delta: u16::read_from(reader)?,
            },
            252..=254 => {
                let offset_delta = u16::read_from(reader)?;
                let locals = (0..frame_type - 251)
                    .map(|_| VerificationType::read_from(reader))
                    .collect::<Result<_>>()?;
                StackMapFrame::Append { offset_delta, locals }
            }
            255 => StackMapFrame::Full {
                offset_delta: u16::read_from(reader)?,
                locals: ReadWrite::read_from(reader)?,
                stack: ReadWrite::read_from(reader)?,
            },
            _ => return Err(Error::invalid("stack map frame type", frame_type.to_string())),
        })
    }

    fn write_to<T: Write>(&self, writer: &mut T) -> Result<()> {
        match self {
            StackMapFrame::Same { offset_delta } => (*offset_delta as u8).write_to(writer),
            StackMapFrame::SameLocals1StackItem { offset_delta, stack } => {
                (64 + *offset_delta as u8).write_to(writer)?;
                stack.write_to(writer)
            }
            StackMapFrame::SameLocals1StackItemExtended { offset_delta, stack } => {
                247u8.write_to(writer)?;
                offset_delta.write_to(writer)?;
                stack.write_to(writer)
            }
            StackMapFrame::Chop { k, offset_delta } => {
                (251 - *k).write_to(writer)?;
                offset_delta.write_to(writer)
            }
            StackMapFrame::SameExtended { offset_delta } => {
                251u8.write_to(writer)?;
                offset_delta.write_to(writer)
            }
            StackMapFrame::Append { offset_delta, locals } => {
                (251 + locals.len() as u8).write_to(writer)?;
                offset_delta.write_to(writer)?;
                for l in locals {
                    l.write_to(writer)?;
                }
                Ok(())
            }
            StackMapFrame::Full {
                offset_delta,
                locals,
                stack,
            } => {
                255u8.write_to(writer)?;
                offset_delta.write_to(writer)?;
                locals.write_to(writer)?;
                stack.write_to(writer)
            }
        }
    }
}

#[derive(ReadWrite, Clone, Eq, PartialEq, Debug, Default)]
pub struct StackMapTableAttribute {
    pub frames: Vec<StackMapFrame>,
}

impl StackMapTableAttribute {
    /// The bytecode offsets the frames apply to.
    pub fn offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.frames.len());
        for (i, f) in self.frames.iter().enumerate() {
            let offset = match i {
                0 => f.offset_delta() as usize,
                _ => offsets[i - 1] + f.offset_delta() as usize + 1,
            };
            offsets.push(offset);
        }
        offsets
    }

    pub(crate) fn payload_len(&self) -> usize {
        2 + self.frames.iter().map(StackMapFrame::payload_len).sum::<usize>()
    }

    pub(crate) fn shift_pc(&mut self, at: usize, gap: usize, exclusive: bool) {
        let offsets = self.offsets();
        let mut prev: Option<usize> = None;
        for (frame, offset) in self.frames.iter_mut().zip(offsets) {
            let offset = shift_target(offset, at, gap, exclusive);
            let delta = match prev {
                None => offset,
                Some(p) => offset - p - 1,
            };
            frame.set_offset_delta(delta as u16);
            prev = Some(offset);
            for t in frame.types_mut() {
                if let VerificationType::Uninitialized(new_at) = t {
                    // the `new` instruction itself moves when it sits at or after the gap
                    if *new_at as usize >= at {
                        *new_at = (*new_at as usize + gap) as u16;
                    }
                }
            }
        }
    }

    pub(super) fn copy(&self, src: &ConstPool, dest: &mut ConstPool, class_names: &ClassNames) -> Result<Self> {
        let mut copied = self.clone();
        for frame in &mut copied.frames {
            for t in frame.types_mut() {
                if let VerificationType::Object(idx) = t {
                    *idx = src.copy(*idx, dest, class_names)?;
                }
            }
        }
        Ok(copied)
    }
}
