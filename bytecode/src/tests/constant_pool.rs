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
use std::collections::HashMap;
use std::io::Cursor;

use crate::cp::{ConstPool, MemberKind, RawConstantEntry};
use crate::loadable::MethodHandleKind;
use crate::Error;

#[test]
fn interning_returns_existing_index() {
    let mut cp = ConstPool::new("Sample").unwrap();
    let size = cp.size();
    assert_eq!(cp.add_class_info("Sample").unwrap(), cp.this_class_index());
    assert_eq!(cp.size(), size);

    let a = cp.add_methodref_info("java/lang/Object", "<init>", "()V").unwrap();
    let size = cp.size();
    let b = cp.add_methodref_info("java/lang/Object", "<init>", "()V").unwrap();
    assert_eq!(a, b);
    assert_eq!(cp.size(), size);
}

#[test]
fn float_constants_intern_by_bits() {
    let mut cp = ConstPool::empty();
    let nan = cp.add_float_info(f32::NAN).unwrap();
    assert_eq!(cp.add_float_info(f32::NAN).unwrap(), nan);
    let zero = cp.add_float_info(0.0).unwrap();
    assert_ne!(cp.add_float_info(-0.0).unwrap(), zero);
}

#[test]
fn wide_entries_take_two_slots() {
    let mut cp = ConstPool::empty();
    assert_eq!(cp.add_long_info(5).unwrap(), 1);
    assert_eq!(cp.add_integer_info(7).unwrap(), 3);
    assert_eq!(cp.add_double_info(1.5).unwrap(), 4);
    assert_eq!(cp.size(), 6);

    assert_eq!(cp.get_long_info(1).unwrap(), 5);
    assert_eq!(cp.get_double_info(4).unwrap(), 1.5);
    assert!(matches!(cp.get_entry(2), Err(Error::Invalid(..))));
    assert!(matches!(cp.get_entry(0), Err(Error::Invalid(..))));
    assert!(matches!(cp.get_entry(6), Err(Error::Invalid(..))));
}

#[test]
fn accessor_tag_mismatch() {
    let mut cp = ConstPool::new("Sample").unwrap();
    let field = cp.add_fieldref_info("Sample", "count", "I").unwrap();
    match cp.get_methodref(field) {
        Err(Error::Mismatch { index, expected, found }) => {
            assert_eq!(index, field);
            assert_eq!(expected, "Methodref");
            assert_eq!(found, "Fieldref");
        }
        other => panic!("unexpected {:?}", other),
    }
    let err = cp.get_utf8_info(cp.this_class_index()).unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn member_references_resolve() {
    let mut cp = ConstPool::new("Sample").unwrap();
    let field = cp.add_fieldref_info("Sample", "count", "I").unwrap();
    let method = cp.add_interface_methodref_info("java/util/List", "size", "()I").unwrap();

    assert_eq!(cp.get_fieldref_class_name(field).unwrap(), "Sample");
    assert_eq!(cp.get_fieldref_name(field).unwrap(), "count");
    assert_eq!(cp.get_fieldref_type(field).unwrap(), "I");

    let member = cp.get_member_ref(method).unwrap();
    assert_eq!(member.kind, MemberKind::InterfaceMethod);
    assert_eq!(member.class_name, "java/util/List");
    assert_eq!(member.name, "size");
    assert_eq!(member.descriptor, "()I");
    assert_eq!(cp.get_interface_methodref_name(method).unwrap(), "size");
}

#[test]
fn unknown_method_handle_kind() {
    let mut cp = ConstPool::new("Sample").unwrap();
    let method = cp.add_methodref_info("Sample", "run", "()V").unwrap();
    let good = cp.add_method_handle_info(MethodHandleKind::InvokeStatic, method).unwrap();
    let bad = cp.add_entry(RawConstantEntry::MethodHandle(10, method)).unwrap();

    assert_eq!(cp.get_method_handle_kind(good).unwrap(), MethodHandleKind::InvokeStatic);
    assert_eq!(cp.get_method_handle_index(good).unwrap(), method);
    let err = cp.get_method_handle_kind(bad).unwrap_err();
    assert!(matches!(err, Error::UnknownReferenceKind(10)));
    assert!(err.is_format_error());
}

#[test]
fn pool_reads_back_what_it_wrote() {
    let mut cp = ConstPool::new("Sample").unwrap();
    cp.add_string_info("hello\u{0}world").unwrap();
    cp.add_long_info(-1).unwrap();
    cp.add_float_info(2.5).unwrap();
    cp.add_integer_info(-7).unwrap();
    cp.add_double_info(0.125).unwrap();
    let nat = cp.add_name_and_type_info("run", "()V").unwrap();
    let bsm = cp.add_methodref_info("Sample", "bsm", "()V").unwrap();
    cp.add_method_handle_info(MethodHandleKind::InvokeStatic, bsm).unwrap();
    cp.add_fieldref_info("Sample", "count", "I").unwrap();
    cp.add_interface_methodref_info("java/lang/Runnable", "run", "()V").unwrap();
    cp.add_invoke_dynamic_info(0, nat).unwrap();
    let constant = cp.add_name_and_type_info("ZERO", "I").unwrap();
    cp.add_dynamic_info(0, constant).unwrap();
    cp.add_method_type_info("(I)V").unwrap();
    cp.add_module_info("java.base").unwrap();
    cp.add_package_info("java/lang").unwrap();

    let mut buf = Vec::new();
    cp.write_to(&mut buf).unwrap();
    let read = ConstPool::read_from(&mut Cursor::new(&buf)).unwrap();

    assert_eq!(read.size(), cp.size());
    assert!(read.iter().eq(cp.iter()));
    assert_ne!(read.id(), cp.id());

    let mut again = Vec::new();
    read.write_to(&mut again).unwrap();
    assert_eq!(again, buf);
}

#[test]
fn truncated_pool_is_an_error() {
    let mut cp = ConstPool::new("Sample").unwrap();
    cp.add_utf8_info("something").unwrap();
    let mut buf = Vec::new();
    cp.write_to(&mut buf).unwrap();
    buf.truncate(buf.len() - 3);

    let err = ConstPool::read_from(&mut Cursor::new(&buf)).unwrap_err();
    assert!(matches!(err, Error::IO(_)));
    assert!(err.is_format_error());
}

#[test]
fn clones_get_a_new_identity() {
    let cp = ConstPool::new("Sample").unwrap();
    let copy = cp.clone();
    assert_ne!(cp.id(), copy.id());
    assert_eq!(copy.class_name().unwrap(), "Sample");
}

#[test]
fn copy_renames_classes() {
    let mut src = ConstPool::new("Sample").unwrap();
    let field = src.add_fieldref_info("Sample", "next", "LSample;").unwrap();
    let method = src.add_methodref_info("java/lang/Object", "toString", "()Ljava/lang/String;").unwrap();

    let mut names = HashMap::new();
    names.insert("Sample".to_owned(), "Copy".to_owned());
    let mut dest = ConstPool::new("Copy").unwrap();

    let copied = src.copy(field, &mut dest, &names).unwrap();
    assert_eq!(dest.get_fieldref_class_name(copied).unwrap(), "Copy");
    assert_eq!(dest.get_fieldref_name(copied).unwrap(), "next");
    assert_eq!(dest.get_fieldref_type(copied).unwrap(), "LCopy;");

    let copied = src.copy(method, &mut dest, &names).unwrap();
    assert_eq!(dest.get_methodref_class_name(copied).unwrap(), "java/lang/Object");
    assert_eq!(dest.get_methodref_type(copied).unwrap(), "()Ljava/lang/String;");

    // copying twice interns
    let size = dest.size();
    src.copy(method, &mut dest, &names).unwrap();
    assert_eq!(dest.size(), size);
    assert_eq!(src.copy(0, &mut dest, &names).unwrap(), 0);
}
