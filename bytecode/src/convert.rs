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
//! Instruction-level rewriting of method bodies by a chain of transformers.

use std::cmp::max;

use log::debug;

use crate::attr::CodeAttribute;
use crate::clazz::ClassFile;
use crate::code::CodeIterator;
use crate::cp::ConstPool;
use crate::member::MethodInfo;
use crate::{Error, Result};

mod field_access;

pub use field_access::FieldAccessRedirect;

/// Answers the class hierarchy questions a transformer may ask.
pub trait TypeHierarchy {
    /// The class declaring the field `field` that `class` sees, if it can be resolved.
    ///
    /// Both class names are internal names such as `java/lang/String`.
    fn field_declaring_class(&self, class: &str, field: &str) -> Option<String>;
}

/// A hierarchy that knows no class, so only exact class names match.
#[derive(Copy, Clone, Debug, Default)]
pub struct ExactMatch;

impl TypeHierarchy for ExactMatch {
    fn field_declaring_class(&self, _class: &str, _field: &str) -> Option<String> {
        None
    }
}

/// One stage of a [`TransformerChain`].
pub trait Transformer {
    /// Called before each method body is walked.
    ///
    /// Caches tied to a constant pool must be dropped here when `cp` is not the pool seen last.
    fn reset(&mut self, _cp: &ConstPool, _code: &CodeAttribute) {}

    /// Inspects and possibly rewrites the instruction at `pos`.
    ///
    /// Returns the position the next stage works on. A stage that inserts code in front of the
    /// instruction returns where the instruction moved to.
    fn transform(
        &mut self,
        hierarchy: &dyn TypeHierarchy,
        pos: usize,
        iter: &mut CodeIterator<'_>,
        cp: &mut ConstPool,
    ) -> Result<usize>;

    /// Called after each method body is walked.
    fn clean(&mut self) {}

    /// Local variable slots this stage needs on top of the method's own.
    fn extra_locals(&self) -> u16 {
        0
    }

    /// Operand stack words this stage needs on top of the method's own.
    fn extra_stack(&self) -> u16 {
        0
    }
}

/// An ordered list of transformers, applied left to right to every instruction.
#[derive(Default)]
pub struct TransformerChain {
    stages: Vec<Box<dyn Transformer>>,
}

impl TransformerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T: Transformer + 'static>(&mut self, stage: T) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage over one method body.
    pub fn apply_to_code(
        &mut self,
        hierarchy: &dyn TypeHierarchy,
        cp: &mut ConstPool,
        code: &mut CodeAttribute,
    ) -> Result<()> {
        for stage in &mut self.stages {
            stage.reset(cp, code);
        }

        let mut iter = code.iterator();
        while iter.has_next() {
            let mut pos = iter.next()?;
            for stage in &mut self.stages {
                pos = stage.transform(hierarchy, pos, &mut iter, cp)?;
            }
        }

        let mut locals = 0;
        let mut stack = 0;
        for stage in &mut self.stages {
            stage.clean();
            locals = max(locals, stage.extra_locals());
            stack = max(stack, stage.extra_stack());
        }
        code.max_locals = code
            .max_locals
            .checked_add(locals)
            .ok_or(Error::Overflow("max locals"))?;
        code.max_stack = code
            .max_stack
            .checked_add(stack)
            .ok_or(Error::Overflow("max stack"))?;
        Ok(())
    }

    /// Runs every stage over the body of `method`. Returns `false` if the method has no code.
    pub fn apply_to_method(
        &mut self,
        hierarchy: &dyn TypeHierarchy,
        cp: &mut ConstPool,
        method: &mut MethodInfo,
    ) -> Result<bool> {
        match method.code_attribute_mut() {
            Some(code) => {
                self.apply_to_code(hierarchy, cp, code)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn apply_to_class(&mut self, class: &mut ClassFile, hierarchy: &dyn TypeHierarchy) -> Result<()> {
        if self.stages.is_empty() {
            return Ok(());
        }
        let cp = &mut class.constant_pool;
        let mut transformed = 0;
        for method in &mut class.methods {
            if self.apply_to_method(hierarchy, cp, method)? {
                transformed += 1;
            }
        }
        debug!(
            "ran {} transformers over {} methods of {}",
            self.stages.len(),
            transformed,
            class.name().unwrap_or("<unknown>")
        );
        Ok(())
    }
}
