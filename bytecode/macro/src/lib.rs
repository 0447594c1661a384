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
//! Procedural macros for `classpatch`. The generated code refers to `crate::ReadWrite`
//! and `crate::error`, so these are unusable outside of it.

use proc_macro::TokenStream;

mod derive;

/// Derives `ReadWrite` for fixed-layout binary records.
///
/// Structs read and write their fields in declaration order.
///
/// Enums need a `#[tag_type(..)]` attribute naming the integer type of the tag that precedes
/// every variant. The tag of a variant is taken from `#[tag(n)]`, then from an explicit
/// discriminant, and otherwise is the previous tag plus one (the first variant defaults to 0).
#[proc_macro_derive(ReadWrite, attributes(tag_type, tag))]
pub fn derive_readwrite(item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::DeriveInput);
    derive::readwrite(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
