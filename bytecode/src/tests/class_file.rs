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
use std::io::Cursor;

use tempfile::tempdir;

use crate::attr::{AttributeBody, AttributeInfo, AttributeKind};
use crate::clazz::ClassFile;
use crate::convert::{ExactMatch, FieldAccessRedirect, TransformerChain};
use crate::Error;

use super::{sample_class, SAMPLE};

#[test]
fn sample_reads_back_byte_for_byte() {
    let class = ClassFile::read_from(&mut Cursor::new(&*SAMPLE)).unwrap();
    assert_eq!(class.to_bytes().unwrap(), *SAMPLE);
    assert_eq!(class.major_version, 52);
    assert_eq!(class.methods.len(), 2);
    assert_eq!(class.fields.len(), 1);
}

#[test]
fn class_names() {
    let mut class = ClassFile::read_from(&mut Cursor::new(&*SAMPLE)).unwrap();
    assert_eq!(class.name().unwrap(), "Sample");
    assert_eq!(class.constant_pool.class_name().unwrap(), "Sample");
    assert_eq!(class.super_class_name().unwrap(), Some("java/lang/Object"));
    assert!(class.interface_names().unwrap().is_empty());

    let runnable = class.constant_pool.add_class_info("java/lang/Runnable").unwrap();
    class.interfaces.push(runnable);
    assert_eq!(class.interface_names().unwrap(), vec!["java/lang/Runnable"]);

    class.super_class = 0;
    assert_eq!(class.super_class_name().unwrap(), None);
}

#[test]
fn unknown_attributes_survive() {
    let class = ClassFile::read_from(&mut Cursor::new(&*SAMPLE)).unwrap();
    let custom = class.get_attribute("Custom").unwrap();
    assert_eq!(custom.kind(), AttributeKind::Raw);
    assert_eq!(custom.body, AttributeBody::Raw(vec![0xDE, 0xAD, 0xBE, 0xEF]));
    match &class.get_attribute("SourceFile").unwrap().body {
        AttributeBody::SourceFile(s) => assert_eq!(s.file_name(&class.constant_pool).unwrap(), "Sample.java"),
        other => panic!("unexpected {:?}", other),
    }
    assert!(class.bootstrap_methods().is_none());
}

#[test]
fn add_attribute_replaces() {
    let mut class = sample_class();
    let info = AttributeInfo::raw(&mut class.constant_pool, "Custom", vec![1]).unwrap();
    class.add_attribute(info).unwrap();
    assert_eq!(class.attributes.len(), 2);
    assert_eq!(class.attributes[1].body, AttributeBody::Raw(vec![1]));
}

#[test]
fn find_methods() {
    let mut class = sample_class();
    assert!(class.method("bump", "()V").is_some());
    assert!(class.method("bump", "()I").is_none());
    assert_eq!(class.method_index("<init>", "()V"), Some(0));
    let bump = class.method_mut("bump", "()V").unwrap();
    bump.access_flags |= crate::access::AccessFlags::ACC_SYNCHRONIZED;
    assert!(class.methods[1].access_flags.contains(crate::access::AccessFlags::ACC_SYNCHRONIZED));
}

#[test]
fn bad_magic() {
    let mut bytes = SAMPLE.clone();
    bytes[0] = 0xCB;
    match ClassFile::read_from(&mut Cursor::new(&bytes)) {
        Err(Error::Invalid("magic", _)) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn truncated_class() {
    let bytes = &SAMPLE[..SAMPLE.len() - 1];
    let err = ClassFile::read_from(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, Error::IO(_)));
    assert!(err.is_format_error());
}

#[test]
fn save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Sample.class");
    let mut class = sample_class();
    let mut chain = TransformerChain::new();
    chain.push(FieldAccessRedirect::new("Sample", "count", false, "Sample", "total"));
    class.transform(&mut chain, &ExactMatch).unwrap();
    class.save_to_path(&path).unwrap();

    let loaded = ClassFile::read_from_path(&path).unwrap();
    assert_eq!(loaded.to_bytes().unwrap(), class.to_bytes().unwrap());
    let code = &loaded.method("bump", "()V").unwrap().code_attribute().unwrap().code;
    let field = u16::from_be_bytes([code[3], code[4]]);
    assert_eq!(loaded.constant_pool.get_fieldref_name(field).unwrap(), "total");

    assert!(matches!(
        ClassFile::read_from_path(dir.path().join("Missing.class")),
        Err(Error::IO(_))
    ));
}
