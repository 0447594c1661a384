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
use lazy_static::lazy_static;

use crate::access::AccessFlags;
use crate::attr::{
    AttributeBody, AttributeInfo, CodeAttribute, LineNumber, LineNumberAttribute, SourceFileAttribute,
};
use crate::clazz::ClassFile;
use crate::constants::insn::*;
use crate::member::{FieldInfo, MethodInfo};

mod attributes;
mod class_file;
mod constant_pool;
mod dynamic;

lazy_static! {
    /// The serialized form of [`sample_class`].
    static ref SAMPLE: Vec<u8> = sample_class().to_bytes().unwrap();
}

/// Bytecode of `Sample.bump()`: `this.count = this.count + 1; return;`, with the two Fieldref
/// operands at 3 and 8.
fn bump_code(count_ref: u16) -> Vec<u8> {
    let [hi, lo] = count_ref.to_be_bytes();
    vec![ALOAD_0, DUP, GETFIELD, hi, lo, ICONST_1, IADD, PUTFIELD, hi, lo, RETURN]
}

/// A small class resembling what javac emits for
///
/// ```java
/// public class Sample {
///     int count;
///     public void bump() { count++; }
/// }
/// ```
///
/// plus an attribute this crate does not know.
fn sample_class() -> ClassFile {
    let mut class = ClassFile::new("Sample", "java/lang/Object", 52).unwrap();
    let cp = &mut class.constant_pool;

    class.fields.push(FieldInfo::new(cp, AccessFlags::empty(), "count", "I").unwrap());

    let object_init = cp.add_methodref_info("java/lang/Object", "<init>", "()V").unwrap();
    let mut init = MethodInfo::new(cp, "<init>", "()V").unwrap();
    init.access_flags = AccessFlags::ACC_PUBLIC;
    let [hi, lo] = object_init.to_be_bytes();
    init.set_code_attribute(cp, CodeAttribute::new(1, 1, vec![ALOAD_0, INVOKESPECIAL, hi, lo, RETURN]))
        .unwrap();
    class.methods.push(init);

    let count_ref = cp.add_fieldref_info("Sample", "count", "I").unwrap();
    let mut bump = MethodInfo::new(cp, "bump", "()V").unwrap();
    bump.access_flags = AccessFlags::ACC_PUBLIC;
    let mut code = CodeAttribute::new(3, 1, bump_code(count_ref));
    code.attributes.push(
        AttributeInfo::new(
            cp,
            AttributeBody::LineNumberTable(LineNumberAttribute {
                entries: vec![
                    LineNumber { start_pc: 0, line_number: 3 },
                    LineNumber { start_pc: 10, line_number: 4 },
                ],
            }),
        )
        .unwrap(),
    );
    bump.set_code_attribute(cp, code).unwrap();
    class.methods.push(bump);

    let source = cp.add_utf8_info("Sample.java").unwrap();
    class.attributes.push(
        AttributeInfo::new(cp, AttributeBody::SourceFile(SourceFileAttribute { index: source })).unwrap(),
    );
    class.attributes.push(AttributeInfo::raw(cp, "Custom", vec![0xDE, 0xAD, 0xBE, 0xEF]).unwrap());
    class
}
