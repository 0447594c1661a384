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

use crate::attr::{self, *};
use crate::cp::ConstPool;
use crate::loadable::MethodHandleKind;
use crate::{Error, ReadWrite};

fn sample_list(cp: &mut ConstPool) -> Vec<AttributeInfo> {
    let file = cp.add_utf8_info("Sample.java").unwrap();
    let runtime = cp.add_class_info("java/lang/RuntimeException").unwrap();
    vec![
        AttributeInfo::new(cp, AttributeBody::SourceFile(SourceFileAttribute { index: file })).unwrap(),
        AttributeInfo::raw(cp, "Custom", vec![1, 2, 3]).unwrap(),
        AttributeInfo::new(cp, AttributeBody::Synthetic).unwrap(),
        AttributeInfo::new(
            cp,
            AttributeBody::Exceptions(ExceptionsAttribute { exceptions: vec![runtime] }),
        )
        .unwrap(),
        AttributeInfo::raw(cp, "Custom", vec![4]).unwrap(),
    ]
}

#[test]
fn attribute_list_reads_back_what_it_wrote() {
    let mut cp = ConstPool::new("Sample").unwrap();
    let list = sample_list(&mut cp);
    let mut buf = Vec::new();
    attr::write_all(&list, &mut buf).unwrap();
    assert_eq!(buf.len(), 2 + attr::total_length(&list));

    let read = attr::read_all(&cp, &mut Cursor::new(&buf)).unwrap();
    assert_eq!(read, list);
    assert_eq!(read[1].kind(), AttributeKind::Raw);
    assert_eq!(read[1].name(&cp).unwrap(), "Custom");
}

/// One attribute of every kind that has no nested code.
fn every_kind(cp: &mut ConstPool) -> Vec<AttributeInfo> {
    let mut list = sample_list(cp);
    let value = cp.add_integer_info(3).unwrap();
    let inner = cp.add_class_info("Sample$Inner").unwrap();
    let outer = cp.add_class_info("Sample").unwrap();
    let inner_name = cp.add_utf8_info("Inner").unwrap();
    let name = cp.add_utf8_info("items").unwrap();
    let descriptor = cp.add_utf8_info("Ljava/util/List;").unwrap();
    let signature = cp.add_utf8_info("Ljava/util/List<Ljava/lang/String;>;").unwrap();
    let bsm = cp.add_methodref_info("Sample", "bsm", "()V").unwrap();
    let handle = cp.add_method_handle_info(MethodHandleKind::InvokeStatic, bsm).unwrap();
    let argument = cp.add_string_info("x").unwrap();
    let variable = |descriptor_index| LocalVariable {
        start_pc: 0,
        length: 4,
        name_index: name,
        descriptor_index,
        index: 1,
    };
    let bodies = vec![
        AttributeBody::ConstantValue(ConstantValueAttribute { index: value }),
        AttributeBody::InnerClasses(InnerClassesAttribute {
            classes: vec![InnerClass {
                inner_class_info: inner,
                outer_class_info: outer,
                inner_name,
                access_flags: 0x0008,
            }],
        }),
        AttributeBody::LocalVariableTable(LocalVariableAttribute {
            entries: vec![variable(descriptor)],
        }),
        AttributeBody::LocalVariableTypeTable(LocalVariableAttribute {
            entries: vec![variable(signature)],
        }),
        AttributeBody::BootstrapMethods(BootstrapMethodsAttribute {
            methods: vec![BootstrapMethod {
                method_ref: handle,
                arguments: vec![argument],
            }],
        }),
    ];
    for body in bodies {
        list.push(AttributeInfo::new(cp, body).unwrap());
    }
    list
}

#[test]
fn every_kind_reads_back_what_it_wrote() {
    let mut cp = ConstPool::new("Sample").unwrap();
    let list = every_kind(&mut cp);
    let mut buf = Vec::new();
    attr::write_all(&list, &mut buf).unwrap();

    let read = attr::read_all(&cp, &mut Cursor::new(&buf)).unwrap();
    assert_eq!(read, list);
    let kinds: Vec<_> = read[5..].iter().map(AttributeInfo::kind).collect();
    assert_eq!(
        kinds,
        vec![
            AttributeKind::ConstantValue,
            AttributeKind::InnerClasses,
            AttributeKind::LocalVariableTable,
            AttributeKind::LocalVariableTypeTable,
            AttributeKind::BootstrapMethods,
        ]
    );
}

#[test]
fn copy_resolves_indices_in_the_new_pool() {
    let mut src = ConstPool::new("Sample").unwrap();
    let list = every_kind(&mut src);
    let mut names = HashMap::new();
    names.insert("Sample".to_owned(), "Copy".to_owned());
    // shift every index so that a verbatim copy would be caught
    let mut dest = ConstPool::new("Copy").unwrap();
    dest.add_utf8_info("padding").unwrap();

    let inner = list[6].copy(&src, &mut dest, &names).unwrap();
    assert_eq!(inner.name(&dest).unwrap(), "InnerClasses");
    match &inner.body {
        AttributeBody::InnerClasses(t) => {
            let c = t.classes[0];
            assert_eq!(dest.get_class_info(c.inner_class_info).unwrap(), "Sample$Inner");
            assert_eq!(dest.get_class_info(c.outer_class_info).unwrap(), "Copy");
            assert_eq!(dest.get_utf8_info(c.inner_name).unwrap(), "Inner");
            assert_eq!(c.access_flags, 0x0008);
        }
        other => panic!("unexpected {:?}", other),
    }

    let bootstrap = list[9].copy(&src, &mut dest, &names).unwrap();
    match &bootstrap.body {
        AttributeBody::BootstrapMethods(t) => {
            let m = &t.methods[0];
            assert_eq!(dest.get_method_handle_kind(m.method_ref).unwrap(), MethodHandleKind::InvokeStatic);
            let target = dest.get_method_handle_index(m.method_ref).unwrap();
            assert_eq!(dest.get_methodref_class_name(target).unwrap(), "Copy");
            assert_eq!(dest.get_methodref_name(target).unwrap(), "bsm");
            assert_eq!(dest.get_string_info(m.arguments[0]).unwrap(), "x");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn raw_attribute_is_written_verbatim() {
    let mut cp = ConstPool::new("Sample").unwrap();
    let info = AttributeInfo::raw(&mut cp, "RuntimeVisibleAnnotations", vec![0, 0]).unwrap();
    let mut buf = Vec::new();
    info.write_to(&mut buf).unwrap();
    let [hi, lo] = info.name_index.to_be_bytes();
    assert_eq!(buf, vec![hi, lo, 0, 0, 0, 2, 0, 0]);
    assert_eq!(info.length(), 8);
}

#[test]
fn payload_length_must_match() {
    let mut cp = ConstPool::new("Sample").unwrap();
    let name = cp.add_utf8_info("SourceFile").unwrap();
    let [hi, lo] = name.to_be_bytes();
    let bytes = [hi, lo, 0, 0, 0, 3, 0, 1, 0];
    match AttributeInfo::read_from(&cp, &mut Cursor::new(&bytes[..])) {
        Err(Error::AttributeLength(declared, consumed, name)) => {
            assert_eq!(declared, 3);
            assert_eq!(consumed, 2);
            assert_eq!(name, "SourceFile");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn lookup_returns_first_match() {
    let mut cp = ConstPool::new("Sample").unwrap();
    let list = sample_list(&mut cp);

    let found = attr::lookup_by_name(Some(list.as_slice()), &cp, "Custom").unwrap();
    assert_eq!(found.body, AttributeBody::Raw(vec![1, 2, 3]));
    assert!(attr::lookup_by_name(Some(list.as_slice()), &cp, "Code").is_none());
    assert!(attr::lookup_by_name(None, &cp, "Custom").is_none());

    let found = attr::lookup_by_kind(Some(list.as_slice()), AttributeKind::Exceptions).unwrap();
    match &found.body {
        AttributeBody::Exceptions(e) => {
            assert_eq!(e.exception_names(&cp).unwrap(), vec!["java/lang/RuntimeException"])
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(attr::lookup_by_kind(None, AttributeKind::Synthetic).is_none());
}

#[test]
fn remove_keeps_order_of_survivors() {
    let mut cp = ConstPool::new("Sample").unwrap();
    let mut list = sample_list(&mut cp);

    assert_eq!(attr::remove_by_name(Some(&mut list), &cp, "Custom"), 2);
    let kinds: Vec<_> = list.iter().map(AttributeInfo::kind).collect();
    assert_eq!(
        kinds,
        vec![AttributeKind::SourceFile, AttributeKind::Synthetic, AttributeKind::Exceptions]
    );

    assert_eq!(attr::remove_by_kind(Some(&mut list), AttributeKind::Synthetic), 1);
    assert_eq!(attr::remove_by_kind(Some(&mut list), AttributeKind::Synthetic), 0);
    assert_eq!(list.len(), 2);
    assert_eq!(attr::remove_by_name(None, &cp, "Custom"), 0);
}

#[test]
fn line_numbers() {
    let table = LineNumberAttribute {
        entries: vec![
            LineNumber { start_pc: 0, line_number: 10 },
            LineNumber { start_pc: 4, line_number: 11 },
            LineNumber { start_pc: 9, line_number: 13 },
        ],
    };
    assert_eq!(table.to_line_number(0), 10);
    assert_eq!(table.to_line_number(3), 10);
    assert_eq!(table.to_line_number(4), 11);
    assert_eq!(table.to_line_number(100), 13);
    assert_eq!(table.to_start_pc(13), 9);
    assert_eq!(table.to_start_pc(12), -1);
    assert_eq!(LineNumberAttribute::default().to_line_number(5), -1);
}

#[test]
fn bootstrap_methods_layout() {
    let table = BootstrapMethodsAttribute {
        methods: vec![
            BootstrapMethod { method_ref: 7, arguments: vec![8, 9] },
            BootstrapMethod { method_ref: 10, arguments: vec![] },
        ],
    };
    let mut buf = Vec::new();
    table.write_to(&mut buf).unwrap();
    assert_eq!(buf, vec![0, 2, 0, 7, 0, 2, 0, 8, 0, 9, 0, 10, 0, 0]);
    assert_eq!(BootstrapMethodsAttribute::read_from(&mut Cursor::new(&buf)).unwrap(), table);
}

#[test]
fn stack_map_frames_switch_to_extended_form() {
    let mut frame = StackMapFrame::Same { offset_delta: 10 };
    frame.set_offset_delta(70);
    assert_eq!(frame, StackMapFrame::SameExtended { offset_delta: 70 });

    let mut frame = StackMapFrame::SameLocals1StackItem {
        offset_delta: 3,
        stack: VerificationType::Integer,
    };
    frame.set_offset_delta(64);
    assert_eq!(
        frame,
        StackMapFrame::SameLocals1StackItemExtended {
            offset_delta: 64,
            stack: VerificationType::Integer,
        }
    );
}

#[test]
fn stack_map_frames_read_back() {
    let table = StackMapTableAttribute {
        frames: vec![
            StackMapFrame::Same { offset_delta: 5 },
            StackMapFrame::Append {
                offset_delta: 2,
                locals: vec![VerificationType::Integer, VerificationType::Object(3)],
            },
            StackMapFrame::Chop { k: 1, offset_delta: 200 },
            StackMapFrame::Full {
                offset_delta: 0,
                locals: vec![VerificationType::Long],
                stack: vec![VerificationType::Uninitialized(12)],
            },
        ],
    };
    let mut buf = Vec::new();
    table.write_to(&mut buf).unwrap();
    assert_eq!(buf.len(), table.payload_len());
    assert_eq!(StackMapTableAttribute::read_from(&mut Cursor::new(&buf)).unwrap(), table);
    assert_eq!(table.offsets(), vec![5, 8, 209, 210]);
}
