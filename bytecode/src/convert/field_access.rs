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
use log::trace;

use crate::attr::CodeAttribute;
use crate::code::CodeIterator;
use crate::constants::insn::{GETFIELD, GETSTATIC, PUTFIELD, PUTSTATIC};
use crate::cp::{ConstPool, PoolId};
use crate::Result;

use super::{Transformer, TypeHierarchy};

/// Redirects every access to one field to another field with the same descriptor.
#[derive(Clone, Debug)]
pub struct FieldAccessRedirect {
    class: String,
    field_name: String,
    is_private: bool,
    new_class: String,
    new_field: String,
    cached_pool: Option<PoolId>,
    new_index: u16,
}

impl FieldAccessRedirect {
    /// Accesses to `class.field_name` become accesses to `new_class.new_field`.
    ///
    /// Accesses through a subclass are redirected too unless the field `is_private`.
    pub fn new<S: Into<String>>(class: S, field_name: S, is_private: bool, new_class: S, new_field: S) -> Self {
        Self {
            class: class.into(),
            field_name: field_name.into(),
            is_private,
            new_class: new_class.into(),
            new_field: new_field.into(),
            cached_pool: None,
            new_index: 0,
        }
    }

    /// Returns the descriptor of the Fieldref at `index` if it names the redirected field.
    fn matching_descriptor<'a>(
        &self,
        hierarchy: &dyn TypeHierarchy,
        cp: &'a ConstPool,
        index: u16,
    ) -> Result<Option<&'a str>> {
        let field = cp.get_fieldref(index)?;
        if field.name != self.field_name {
            return Ok(None);
        }
        let matches = field.class_name == self.class
            || (!self.is_private
                && hierarchy
                    .field_declaring_class(field.class_name, field.name)
                    .map_or(false, |declaring| declaring == self.class));
        Ok(if matches { Some(field.descriptor) } else { None })
    }
}

impl Transformer for FieldAccessRedirect {
    fn reset(&mut self, cp: &ConstPool, _code: &CodeAttribute) {
        if self.cached_pool != Some(cp.id()) {
            self.cached_pool = None;
            self.new_index = 0;
        }
    }

    fn transform(
        &mut self,
        hierarchy: &dyn TypeHierarchy,
        pos: usize,
        iter: &mut CodeIterator<'_>,
        cp: &mut ConstPool,
    ) -> Result<usize> {
        let opcode = iter.byte_at(pos)?;
        if !matches!(opcode, GETFIELD | GETSTATIC | PUTFIELD | PUTSTATIC) {
            return Ok(pos);
        }
        let index = iter.u16bit_at(pos + 1)?;
        let descriptor = match self.matching_descriptor(hierarchy, cp, index)? {
            Some(d) => d.to_owned(),
            None => return Ok(pos),
        };
        if self.new_index == 0 {
            let name_and_type = cp.add_name_and_type_info(&self.new_field, &descriptor)?;
            let class = cp.add_class_info(&self.new_class)?;
            self.new_index = cp.add_fieldref(class, name_and_type)?;
            self.cached_pool = Some(cp.id());
        }
        trace!(
            "redirecting {}.{} at {} to {}.{}",
            self.class,
            self.field_name,
            pos,
            self.new_class,
            self.new_field
        );
        iter.write16bit(self.new_index, pos + 1)?;
        Ok(pos)
    }
}
