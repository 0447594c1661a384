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
//! The seam between call-site replacement and a statement compiler.
//!
//! This crate does not compile source snippets itself. A [`StatementCompiler`] is handed the
//! layout of the fresh local variables the replacement may use and returns the bytecode of the
//! compiled statement.

use std::convert::TryFrom;

use thiserror::Error;

use crate::attr::{CodeAttribute, ExceptionTableEntry};
use crate::constants::insn::{INVOKEDYNAMIC, WIDE};
use crate::cp::ConstPool;
use crate::ty::Type;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{0}")]
    Compile(String),
    #[error("cannot find {0}")]
    NotFound(String),
}

/// The output of [`StatementCompiler::compile_statement`].
///
/// Exception table pcs are relative to the start of `code`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompiledStatement {
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub max_stack: u16,
    pub max_locals: u16,
}

/// Emits the original operation wherever the compiled statement says `$proceed`.
pub trait ProceedHandler {
    /// Appends the bytecode performing the original operation to `out`.
    ///
    /// The arguments are expected on the operand stack.
    fn emit(&self, out: &mut Vec<u8>);

    /// The value left on the stack by [`emit`](Self::emit), `None` for `void`.
    fn return_type(&self) -> Option<&Type>;
}

/// Re-issues a dynamic call site.
///
/// Emits `invokedynamic` with the index of the call site's `CONSTANT_InvokeDynamic` entry followed
/// by two zero bytes. The bootstrap index is only carried along for compilers that want it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProceedForIndy {
    pub return_type: Option<Type>,
    pub bootstrap_index: u16,
    /// The InvokeDynamic constant the emitted instruction refers to.
    pub callsite_index: u16,
}

impl ProceedHandler for ProceedForIndy {
    fn emit(&self, out: &mut Vec<u8>) {
        out.push(INVOKEDYNAMIC);
        out.extend_from_slice(&self.callsite_index.to_be_bytes());
        out.extend_from_slice(&[0, 0]);
    }

    fn return_type(&self) -> Option<&Type> {
        self.return_type.as_ref()
    }
}

/// A compiler for replacement statements such as `{ $_ = $proceed($$); }`.
pub trait StatementCompiler {
    /// Declares the parameters `$1, $2, ...` of the statement.
    ///
    /// `$0` lives in `first_slot` (it is `null` when `is_static`), the parameters follow in order.
    fn record_params(
        &mut self,
        owner: &str,
        params: &[Type],
        is_static: bool,
        first_slot: u16,
    ) -> Result<(), CompileError>;

    /// Declares the type of `$_` and the slot that holds it. `ret` is `None` for `void`.
    fn record_return_type(&mut self, ret: Option<&Type>, slot: u16) -> Result<(), CompileError>;

    /// Sets what `$proceed` compiles to.
    fn record_proceed(&mut self, handler: Box<dyn ProceedHandler>);

    /// Makes the local variables live at `pos` visible to the statement.
    fn record_local_variables(
        &mut self,
        _cp: &ConstPool,
        _code: &CodeAttribute,
        _pos: usize,
    ) -> Result<(), CompileError> {
        Ok(())
    }

    fn compile_statement(&mut self, source: &str) -> Result<CompiledStatement, CompileError>;
}

/// Appends the shortest load of a local variable of type `ty`.
pub fn emit_load(out: &mut Vec<u8>, ty: &Type, slot: u16) {
    emit_local(out, ty.short_load_opcode(), ty.load_opcode(), slot)
}

/// Appends the shortest store into a local variable of type `ty`.
pub fn emit_store(out: &mut Vec<u8>, ty: &Type, slot: u16) {
    emit_local(out, ty.short_store_opcode(), ty.store_opcode(), slot)
}

fn emit_local(out: &mut Vec<u8>, short: u8, normal: u8, slot: u16) {
    if slot < 4 {
        out.push(short + slot as u8);
    } else if let Ok(slot) = u8::try_from(slot) {
        out.push(normal);
        out.push(slot);
    } else {
        out.push(WIDE);
        out.push(normal);
        out.extend_from_slice(&slot.to_be_bytes());
    }
}
