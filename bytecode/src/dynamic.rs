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
//! Inspection and replacement of `invokedynamic` call sites.

use std::cmp::max;

use log::debug;

use crate::attr::{BootstrapMethod, CodeAttribute};
use crate::clazz::ClassFile;
use crate::code::instruction_length;
use crate::compiler::{emit_load, emit_store, CompileError, ProceedForIndy, StatementCompiler};
use crate::constants::insn::{ACONST_NULL, INVOKEDYNAMIC, NOP};
use crate::cp::{ConstPool, MemberRef};
use crate::loadable::{BootstrapArgument, MethodHandleReference};
use crate::ty::Type;
use crate::{Error, Result};

/// An `invokedynamic` instruction in a method of a class.
#[derive(Debug)]
pub struct InvokeDynamicCall<'a> {
    class: &'a mut ClassFile,
    method: usize,
    pos: usize,
    end: usize,
    callsite: u16,
    bootstrap: u16,
}

impl<'a> InvokeDynamicCall<'a> {
    /// Checks that the instruction at `pos` in the code of `class.methods[method]` is an
    /// `invokedynamic`.
    pub fn new(class: &'a mut ClassFile, method: usize, pos: usize) -> Result<Self> {
        let code = class
            .methods
            .get(method)
            .and_then(|m| m.code_attribute())
            .ok_or_else(|| Error::invalid("method", format!("#{} has no code", method)))?;
        let callsite = match code.code.get(pos..pos + 5) {
            Some(&[INVOKEDYNAMIC, hi, lo, _, _]) => u16::from_be_bytes([hi, lo]),
            _ => return Err(Error::invalid("call site", format!("no invokedynamic at {}", pos))),
        };
        let bootstrap = class.constant_pool.get_invoke_dynamic_bootstrap(callsite)?;
        Ok(Self {
            class,
            method,
            pos,
            end: pos + 5,
            callsite,
            bootstrap,
        })
    }

    /// The position of the instruction.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The position right after the instruction, or after the code that replaced it.
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn class(&self) -> &ClassFile {
        &*self.class
    }

    fn cp(&self) -> &ConstPool {
        &self.class.constant_pool
    }

    /// The index of the `CONSTANT_InvokeDynamic` entry.
    ///
    /// Taken when the call was found, so it stays valid after [`replace`](Self::replace).
    pub fn callsite_index(&self) -> u16 {
        self.callsite
    }

    pub fn callsite_method_name(&self) -> Result<&str> {
        self.cp().get_invoke_dynamic_name(self.callsite)
    }

    /// The descriptor of the call site.
    pub fn callsite_method_signature(&self) -> Result<&str> {
        self.cp().get_invoke_dynamic_type(self.callsite)
    }

    /// The position of the bootstrap method in the BootstrapMethods table.
    pub fn bootstrap_index(&self) -> u16 {
        self.bootstrap
    }

    pub fn bootstrap_method(&self) -> Result<&BootstrapMethod> {
        let table = self
            .class
            .bootstrap_methods()
            .ok_or(Error::MissingBootstrapMethods)?;
        let index = self.bootstrap;
        table.methods.get(index as usize).ok_or_else(|| {
            Error::invalid(
                "bootstrap method index",
                format!("{} of {}", index, table.methods.len()),
            )
        })
    }

    pub fn bootstrap_method_handle(&self) -> Result<MethodHandleReference> {
        MethodHandleReference::decode(self.cp(), self.bootstrap_method()?.method_ref)
    }

    fn bootstrap_member(&self) -> Result<MemberRef<'_>> {
        let handle = self.bootstrap_method()?.method_ref;
        let cp = self.cp();
        cp.get_member_ref(cp.get_method_handle_index(handle)?)
    }

    pub fn bootstrap_method_name(&self) -> Result<&str> {
        Ok(self.bootstrap_member()?.name)
    }

    pub fn bootstrap_method_signature(&self) -> Result<&str> {
        Ok(self.bootstrap_member()?.descriptor)
    }

    /// The class declaring the bootstrap method.
    pub fn bootstrap_method_class(&self) -> Result<&str> {
        Ok(self.bootstrap_member()?.class_name)
    }

    pub fn bootstrap_method_arg_count(&self) -> Result<usize> {
        Ok(self.bootstrap_method()?.arguments.len())
    }

    /// The decoded static arguments of the bootstrap method.
    pub fn bootstrap_method_arguments(&self) -> Result<Vec<BootstrapArgument>> {
        let cp = self.cp();
        self.bootstrap_method()?
            .arguments
            .iter()
            .map(|&idx| BootstrapArgument::decode(cp, idx))
            .collect()
    }

    /// Replaces the call with the compiled `statement`.
    ///
    /// `$0` is `null`, `$1, $2, ...` are the arguments of the call, `$_` must receive the result if
    /// the call site returns one and `$proceed` performs the original call.
    pub fn replace(&mut self, statement: &str, compiler: &mut dyn StatementCompiler) -> Result<()> {
        let callsite_index = self.callsite;
        let bootstrap_index = self.bootstrap;
        let descriptor: Type = self.callsite_method_signature()?.parse()?;
        let (params, ret) = descriptor
            .as_method()
            .ok_or_else(|| Error::invalid("call site descriptor", descriptor.to_string()))?;
        let owner = self.class.name()?.to_owned();

        let ClassFile {
            constant_pool: cp,
            methods,
            ..
        } = &mut *self.class;
        let code = methods[self.method]
            .code_attribute_mut()
            .ok_or_else(|| Error::invalid("method", "code attribute removed"))?;

        let first_slot = code.max_locals;
        let mut param_slots = Vec::with_capacity(params.len());
        let mut slot = first_slot.checked_add(1).ok_or(Error::Overflow("max locals"))?;
        for p in params {
            param_slots.push(slot);
            slot = slot
                .checked_add(p.slot_size())
                .ok_or(Error::Overflow("max locals"))?;
        }
        let ret_slot = slot;
        let locals_end = ret_slot
            .checked_add(ret.map_or(0, Type::slot_size))
            .ok_or(Error::Overflow("max locals"))?;

        compiler.record_params(&owner, params, true, first_slot)?;
        compiler.record_return_type(ret, ret_slot)?;
        compiler.record_proceed(Box::new(ProceedForIndy {
            return_type: ret.cloned(),
            bootstrap_index,
            callsite_index,
        }));
        if ret.is_some() && !statement.contains("$_") {
            return Err(CompileError::Compile("the resulting value is not stored in $_".into()).into());
        }

        // the arguments are on the stack, the last one on top
        let mut body = Vec::new();
        for (p, &slot) in params.iter().zip(&param_slots).rev() {
            emit_store(&mut body, p, slot);
        }
        body.push(ACONST_NULL);
        emit_store(&mut body, &Type::reference("java/lang/Object"), first_slot);
        let prologue = body.len();

        compiler.record_local_variables(cp, code, self.pos)?;
        let compiled = compiler.compile_statement(statement)?;
        body.extend_from_slice(&compiled.code);
        if let Some(ret) = ret {
            emit_load(&mut body, ret, ret_slot);
        }

        // edits go to a copy so that a failure leaves the method untouched
        let mut edited = code.clone();
        let mut iter = edited.iterator();
        for i in 0..5 {
            iter.write8bit(NOP, self.pos + i)?;
        }
        let mut pos = self.pos;
        if body.len() > 5 {
            pos = iter.insert_gap_at(pos, body.len() - 5, false)?.position;
        }
        iter.write(&body, pos)?;
        iter.insert_exception_table(&compiled.exception_table, pos + prologue)?;
        drop(iter);

        edited.max_locals = max(max(edited.max_locals, compiled.max_locals), locals_end);
        edited.max_stack = edited
            .max_stack
            .checked_add(max(compiled.max_stack, 1))
            .ok_or(Error::Overflow("max stack"))?;
        *code = edited;

        debug!(
            "replaced call site #{} at {} with {} bytes",
            callsite_index,
            self.pos,
            body.len()
        );
        self.pos = pos;
        self.end = pos + max(body.len(), 5);
        Ok(())
    }
}

/// Calls `f` with every `invokedynamic` in every method of `class`.
///
/// When `f` replaces a call, the search continues after the replacement.
pub fn edit_invoke_dynamic<F>(class: &mut ClassFile, mut f: F) -> Result<()>
where
    F: FnMut(&mut InvokeDynamicCall<'_>) -> Result<()>,
{
    for method in 0..class.methods.len() {
        let mut pos = 0;
        loop {
            let found = match class.methods[method].code_attribute() {
                Some(code) => next_call_site(code, pos)?,
                None => None,
            };
            let at = match found {
                Some(at) => at,
                None => break,
            };
            let mut call = InvokeDynamicCall::new(class, method, at)?;
            f(&mut call)?;
            pos = call.end();
        }
    }
    Ok(())
}

fn next_call_site(code: &CodeAttribute, from: usize) -> Result<Option<usize>> {
    let mut pos = from;
    while pos < code.code.len() {
        if code.code[pos] == INVOKEDYNAMIC {
            return Ok(Some(pos));
        }
        pos += instruction_length(&code.code, pos)?;
    }
    Ok(None)
}
