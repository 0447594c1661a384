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
use crate::access::AccessFlags;
use crate::attr::{
    AttributeBody, AttributeInfo, BootstrapMethod, BootstrapMethodsAttribute, CodeAttribute, ExceptionTableEntry,
};
use crate::clazz::ClassFile;
use crate::code::instruction_length;
use crate::compiler::*;
use crate::constants::insn::*;
use crate::dynamic::{edit_invoke_dynamic, InvokeDynamicCall};
use crate::loadable::{BootstrapArgument, ConstMethodType, MethodHandleKind};
use crate::member::MethodInfo;
use crate::ty::Type;
use crate::Error;

/// A class with `static String run(int, long)` whose body is a single dynamic call.
fn indy_class() -> (ClassFile, u16) {
    let mut class = ClassFile::new("Sample", "java/lang/Object", 52).unwrap();
    let cp = &mut class.constant_pool;
    let bsm = cp
        .add_methodref_info(
            "Bootstraps",
            "make",
            "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;[Ljava/lang/Object;)Ljava/lang/invoke/CallSite;",
        )
        .unwrap();
    let handle = cp.add_method_handle_info(MethodHandleKind::InvokeStatic, bsm).unwrap();
    let arguments = vec![
        cp.add_string_info("x").unwrap(),
        cp.add_integer_info(42).unwrap(),
        cp.add_method_type_info("(I)V").unwrap(),
    ];
    let table = BootstrapMethodsAttribute {
        methods: vec![BootstrapMethod { method_ref: handle, arguments }],
    };
    class.attributes.push(AttributeInfo::new(cp, AttributeBody::BootstrapMethods(table)).unwrap());

    let nat = cp.add_name_and_type_info("apply", "(IJ)Ljava/lang/String;").unwrap();
    let callsite = cp.add_invoke_dynamic_info(0, nat).unwrap();
    let [hi, lo] = callsite.to_be_bytes();
    let mut run = MethodInfo::new(cp, "run", "(IJ)Ljava/lang/String;").unwrap();
    run.access_flags = AccessFlags::ACC_STATIC;
    let code = vec![ILOAD_0, LLOAD_0 + 1, INVOKEDYNAMIC, hi, lo, 0, 0, ARETURN];
    run.set_code_attribute(cp, CodeAttribute::new(3, 3, code)).unwrap();
    class.methods.push(run);
    (class, callsite)
}

/// Adds `static void twice()` calling a `()V` call site two times.
fn add_twice(class: &mut ClassFile) {
    let cp = &mut class.constant_pool;
    let nat = cp.add_name_and_type_info("ping", "()V").unwrap();
    let [hi, lo] = cp.add_invoke_dynamic_info(0, nat).unwrap().to_be_bytes();
    let mut twice = MethodInfo::new(cp, "twice", "()V").unwrap();
    let code = vec![INVOKEDYNAMIC, hi, lo, 0, 0, INVOKEDYNAMIC, hi, lo, 0, 0, RETURN];
    twice.set_code_attribute(cp, CodeAttribute::new(0, 0, code)).unwrap();
    class.methods.push(twice);
}

/// Compiles `$proceed($$)` into loads of the parameters, the proceed call and a store into `$_`.
#[derive(Default)]
struct MockCompiler {
    owner: String,
    is_static: bool,
    first_slot: u16,
    params: Vec<Type>,
    ret: Option<(Type, u16)>,
    proceed: Option<Box<dyn ProceedHandler>>,
    handlers: Vec<ExceptionTableEntry>,
}

impl StatementCompiler for MockCompiler {
    fn record_params(
        &mut self,
        owner: &str,
        params: &[Type],
        is_static: bool,
        first_slot: u16,
    ) -> Result<(), CompileError> {
        self.owner = owner.to_owned();
        self.is_static = is_static;
        self.first_slot = first_slot;
        self.params = params.to_vec();
        Ok(())
    }

    fn record_return_type(&mut self, ret: Option<&Type>, slot: u16) -> Result<(), CompileError> {
        self.ret = ret.map(|t| (t.clone(), slot));
        Ok(())
    }

    fn record_proceed(&mut self, handler: Box<dyn ProceedHandler>) {
        self.proceed = Some(handler);
    }

    fn compile_statement(&mut self, source: &str) -> Result<CompiledStatement, CompileError> {
        let mut code = Vec::new();
        if source.contains("$proceed") {
            let mut slot = self.first_slot + 1;
            for p in &self.params {
                emit_load(&mut code, p, slot);
                slot += p.slot_size();
            }
            match &self.proceed {
                Some(proceed) => proceed.emit(&mut code),
                None => return Err(CompileError::NotFound("$proceed".into())),
            }
            if let Some((ty, slot)) = &self.ret {
                emit_store(&mut code, ty, *slot);
            }
        }
        Ok(CompiledStatement {
            code,
            exception_table: self.handlers.clone(),
            max_stack: 3,
            max_locals: 0,
        })
    }
}

fn call_sites(code: &[u8]) -> usize {
    let mut pos = 0;
    let mut count = 0;
    while pos < code.len() {
        if code[pos] == INVOKEDYNAMIC {
            count += 1;
        }
        pos += instruction_length(code, pos).unwrap();
    }
    count
}

#[test]
fn inspect_call_site() {
    let (mut class, callsite) = indy_class();
    let call = InvokeDynamicCall::new(&mut class, 0, 2).unwrap();
    assert_eq!(call.callsite_index(), callsite);
    assert_eq!(call.callsite_method_name().unwrap(), "apply");
    assert_eq!(call.callsite_method_signature().unwrap(), "(IJ)Ljava/lang/String;");
    assert_eq!(call.bootstrap_index(), 0);
    assert_eq!(call.bootstrap_method_class().unwrap(), "Bootstraps");
    assert_eq!(call.bootstrap_method_name().unwrap(), "make");
    assert!(call.bootstrap_method_signature().unwrap().ends_with(")Ljava/lang/invoke/CallSite;"));

    let handle = call.bootstrap_method_handle().unwrap();
    assert_eq!(handle.kind, MethodHandleKind::InvokeStatic);
    assert!(handle.is_method_ref());
    assert!(!handle.is_field_ref());
    assert!(!handle.is_interface_method_ref());

    assert_eq!(call.bootstrap_method_arg_count().unwrap(), 3);
    assert_eq!(
        call.bootstrap_method_arguments().unwrap(),
        vec![
            BootstrapArgument::String("x".to_owned()),
            BootstrapArgument::Integer(42),
            BootstrapArgument::MethodType(ConstMethodType {
                descriptor: "(I)V".to_owned()
            }),
        ]
    );
}

#[test]
fn only_invokedynamic_is_a_call_site() {
    let (mut class, _) = indy_class();
    assert!(InvokeDynamicCall::new(&mut class, 0, 0).is_err());
    assert!(InvokeDynamicCall::new(&mut class, 0, 7).is_err());
    assert!(InvokeDynamicCall::new(&mut class, 1, 2).is_err());
}

#[test]
fn missing_bootstrap_table() {
    let (mut class, _) = indy_class();
    class.attributes.clear();
    let call = InvokeDynamicCall::new(&mut class, 0, 2).unwrap();
    assert_eq!(call.callsite_method_name().unwrap(), "apply");
    let err = call.bootstrap_method().unwrap_err();
    assert!(matches!(err, Error::MissingBootstrapMethods));
    assert!(err.is_format_error());
    assert_eq!(err.to_string(), "dynamic call site without bootstrap table");
}

#[test]
fn bootstrap_index_out_of_range() {
    let (mut class, _) = indy_class();
    let cp = &mut class.constant_pool;
    let nat = cp.add_name_and_type_info("apply", "(IJ)Ljava/lang/String;").unwrap();
    let callsite = cp.add_invoke_dynamic_info(4, nat).unwrap();
    let code = class.methods[0].code_attribute_mut().unwrap();
    code.code[3..5].copy_from_slice(&callsite.to_be_bytes());

    let call = InvokeDynamicCall::new(&mut class, 0, 2).unwrap();
    assert!(matches!(call.bootstrap_method(), Err(Error::Invalid(..))));
}

#[test]
fn replace_call_site() {
    let (mut class, callsite) = indy_class();
    let mut compiler = MockCompiler {
        handlers: vec![ExceptionTableEntry {
            start_pc: 0,
            end_pc: 4,
            handler_pc: 4,
            catch_type: 0,
        }],
        ..MockCompiler::default()
    };
    let mut call = InvokeDynamicCall::new(&mut class, 0, 2).unwrap();
    call.replace("{ $_ = $proceed($$); }", &mut compiler).unwrap();
    assert_eq!(call.position(), 2);
    assert_eq!(call.end(), 21);
    // the call site can still be inspected after its code is gone
    assert_eq!(call.callsite_index(), callsite);
    assert_eq!(call.callsite_method_name().unwrap(), "apply");
    assert_eq!(call.bootstrap_index(), 0);
    assert_eq!(call.bootstrap_method_name().unwrap(), "make");

    assert_eq!(compiler.owner, "Sample");
    assert!(compiler.is_static);
    assert_eq!(compiler.first_slot, 3);
    assert_eq!(compiler.params, vec![Type::Int, Type::Long]);
    assert_eq!(compiler.ret, Some((Type::reference("java/lang/String"), 7)));

    let [hi, lo] = callsite.to_be_bytes();
    let code = class.methods[0].code_attribute().unwrap();
    let mut expected = vec![ILOAD_0, LLOAD_0 + 1];
    // arguments and $0
    expected.extend_from_slice(&[LSTORE, 5, ISTORE, 4, ACONST_NULL, ASTORE_0 + 3]);
    // the compiled statement
    expected.extend_from_slice(&[ILOAD, 4, LLOAD, 5, INVOKEDYNAMIC, hi, lo, 0, 0, ASTORE, 7]);
    // the value of $_
    expected.extend_from_slice(&[ALOAD, 7]);
    expected.extend_from_slice(&[NOP, NOP, ARETURN]);
    assert_eq!(code.code, expected);
    assert_eq!(
        code.exception_table,
        vec![ExceptionTableEntry {
            start_pc: 8,
            end_pc: 12,
            handler_pc: 12,
            catch_type: 0,
        }]
    );
    assert_eq!(code.max_locals, 8);
    assert_eq!(code.max_stack, 6);
}

#[test]
fn replace_with_shorter_code() {
    let (mut class, _) = indy_class();
    add_twice(&mut class);
    let mut compiler = MockCompiler::default();
    let mut call = InvokeDynamicCall::new(&mut class, 1, 5).unwrap();
    call.replace("{}", &mut compiler).unwrap();
    assert_eq!(call.end(), 10);

    let code = class.methods[1].code_attribute().unwrap();
    assert_eq!(code.code[..5], [INVOKEDYNAMIC, code.code[1], code.code[2], 0, 0]);
    assert_eq!(code.code[5..], [ACONST_NULL, ASTORE_0, NOP, NOP, NOP, RETURN]);
    assert_eq!(code.max_locals, 1);
    assert_eq!(code.max_stack, 3);
}

#[test]
fn result_must_be_stored() {
    let (mut class, _) = indy_class();
    let before = class.methods[0].clone();
    let mut compiler = MockCompiler::default();
    let mut call = InvokeDynamicCall::new(&mut class, 0, 2).unwrap();
    let err = call.replace("{ $proceed($$); }", &mut compiler).unwrap_err();
    assert!(matches!(err, Error::CannotCompile(CompileError::Compile(_))));
    assert!(!err.is_format_error());
    assert_eq!(class.methods[0], before);
}

#[test]
fn failed_splice_keeps_the_call() {
    let (mut class, _) = indy_class();
    let code = class.methods[0].code_attribute_mut().unwrap();
    code.code.splice(7..7, std::iter::repeat(NOP).take(65534 - 8));
    assert_eq!(code.code.len(), 65534);
    let before = class.methods[0].clone();

    let mut compiler = MockCompiler::default();
    let mut call = InvokeDynamicCall::new(&mut class, 0, 2).unwrap();
    let err = call.replace("{ $_ = $proceed($$); }", &mut compiler).unwrap_err();
    assert!(matches!(err, Error::Overflow("code length")));
    assert_eq!(call.end(), 7);
    assert_eq!(class.methods[0], before);
    assert_eq!(class.methods[0].code_attribute().unwrap().code[2], INVOKEDYNAMIC);
}

#[test]
fn failed_handler_rebase_keeps_the_call() {
    let (mut class, _) = indy_class();
    let before = class.methods[0].clone();
    let mut compiler = MockCompiler {
        handlers: vec![ExceptionTableEntry {
            start_pc: 0,
            end_pc: 4,
            handler_pc: u16::MAX,
            catch_type: 0,
        }],
        ..MockCompiler::default()
    };
    let mut call = InvokeDynamicCall::new(&mut class, 0, 2).unwrap();
    let err = call.replace("{ $_ = $proceed($$); }", &mut compiler).unwrap_err();
    assert!(matches!(err, Error::Overflow("exception table pc")));
    assert_eq!(class.methods[0], before);
}

#[test]
fn compiler_failures_keep_their_cause() {
    struct Failing;
    impl StatementCompiler for Failing {
        fn record_params(&mut self, _: &str, _: &[Type], _: bool, _: u16) -> Result<(), CompileError> {
            Ok(())
        }
        fn record_return_type(&mut self, _: Option<&Type>, _: u16) -> Result<(), CompileError> {
            Ok(())
        }
        fn record_proceed(&mut self, _: Box<dyn ProceedHandler>) {}
        fn compile_statement(&mut self, _: &str) -> Result<CompiledStatement, CompileError> {
            Err(CompileError::NotFound("java/lang/Strin".into()))
        }
    }

    let (mut class, _) = indy_class();
    let mut call = InvokeDynamicCall::new(&mut class, 0, 2).unwrap();
    let err = call.replace("{ $_ = \"x\"; }", &mut Failing).unwrap_err();
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "cannot find java/lang/Strin");
}

#[test]
fn edit_every_call_site() {
    let (mut class, _) = indy_class();
    add_twice(&mut class);
    let mut compiler = MockCompiler::default();
    let mut visited = Vec::new();
    edit_invoke_dynamic(&mut class, |call| {
        let name = call.callsite_method_name()?.to_owned();
        if name == "ping" {
            call.replace("{ $proceed($$); }", &mut compiler)?;
            assert_eq!(call.callsite_method_name()?, "ping");
        }
        visited.push(name);
        Ok(())
    })
    .unwrap();
    assert_eq!(visited, vec!["apply", "ping", "ping"]);

    let code = class.methods[1].code_attribute().unwrap();
    assert_eq!(call_sites(&code.code), 2);
    assert_eq!(code.max_locals, 2);
    assert_eq!(class.methods[0].code_attribute().unwrap().code.len(), 8);
}

#[test]
fn proceed_and_local_variable_encodings() {
    let proceed = ProceedForIndy {
        return_type: None,
        bootstrap_index: 3,
        callsite_index: 0x0102,
    };
    let mut out = Vec::new();
    proceed.emit(&mut out);
    assert_eq!(out, vec![INVOKEDYNAMIC, 1, 2, 0, 0]);
    assert!(proceed.return_type().is_none());

    let mut out = Vec::new();
    emit_store(&mut out, &Type::Double, 2);
    emit_load(&mut out, &Type::reference("java/lang/Object"), 4);
    emit_load(&mut out, &Type::Int, 300);
    assert_eq!(out, vec![DSTORE_0 + 2, ALOAD, 4, WIDE, ILOAD, 1, 44]);
}
