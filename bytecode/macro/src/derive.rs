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

use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{format_ident, quote, quote_spanned};
use syn::spanned::Spanned;
use syn::*;

fn rw_of<T: quote::ToTokens + Spanned>(ty: &T) -> TokenStream2 {
    let span = ty.span();
    quote_spanned! { span => <#ty as crate::ReadWrite> }
}

/// Identifiers the fields of a variant or struct are bound to.
fn bindings(fields: &Fields) -> Vec<Ident> {
    match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .filter_map(|f| f.ident.clone())
            .collect(),
        Fields::Unnamed(unnamed) => (0..unnamed.unnamed.len())
            .map(|i| format_ident!("__field{}", i))
            .collect(),
        Fields::Unit => Vec::new(),
    }
}

fn pattern(path: TokenStream2, fields: &Fields, idents: &[Ident]) -> TokenStream2 {
    match fields {
        Fields::Named(_) => quote! { #path { #(#idents),* } },
        Fields::Unnamed(_) => quote! { #path ( #(#idents),* ) },
        Fields::Unit => quote! { #path },
    }
}

fn tag_of(variant: &Variant, prev: Option<i128>) -> Result<i128> {
    if let Some(attr) = variant.attrs.iter().find(|a| a.path.is_ident("tag")) {
        return attr.parse_args::<LitInt>()?.base10_parse();
    }
    if let Some((_, Expr::Lit(ExprLit { lit: Lit::Int(lit), .. }))) = &variant.discriminant {
        return lit.base10_parse();
    }
    Ok(prev.map_or(0, |p| p + 1))
}

pub(crate) fn readwrite(input: DeriveInput) -> Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (read_body, write_body) = match &input.data {
        Data::Struct(s) => {
            let idents = bindings(&s.fields);
            let types = s.fields.iter().map(|f| rw_of(&f.ty)).collect::<Vec<_>>();
            let construct = pattern(quote!(Self), &s.fields, &idents);
            let destruct = pattern(quote!(Self), &s.fields, &idents);
            (
                quote! {
                    #(let #idents = #types::read_from(reader)?;)*
                    Ok(#construct)
                },
                quote! {
                    let #destruct = self;
                    #(#types::write_to(#idents, writer)?;)*
                    Ok(())
                },
            )
        }
        Data::Enum(e) => {
            let tag_type: Ident = input
                .attrs
                .iter()
                .find(|a| a.path.is_ident("tag_type"))
                .ok_or_else(|| Error::new(input.span(), "missing #[tag_type(..)] attribute"))?
                .parse_args()?;
            let tag_rw = rw_of(&tag_type);

            let mut prev = None;
            let mut read_arms = Vec::new();
            let mut write_arms = Vec::new();
            for v in &e.variants {
                let tag = tag_of(v, prev)?;
                prev = Some(tag);
                let tag = LitInt::new(&format!("{}{}", tag, tag_type), Span::call_site());

                let idents = bindings(&v.fields);
                let types = v.fields.iter().map(|f| rw_of(&f.ty)).collect::<Vec<_>>();
                let ident = &v.ident;
                let pat = pattern(quote!(Self::#ident), &v.fields, &idents);
                read_arms.push(quote! {
                    #tag => {
                        #(let #idents = #types::read_from(reader)?;)*
                        Ok(#pat)
                    }
                });
                write_arms.push(quote! {
                    #pat => {
                        #tag_rw::write_to(&#tag, writer)?;
                        #(#types::write_to(#idents, writer)?;)*
                        Ok(())
                    }
                });
            }
            (
                quote! {
                    let tag = #tag_rw::read_from(reader)?;
                    match tag {
                        #(#read_arms)*
                        _ => Err(crate::error::Error::Invalid("tag", tag.to_string().into())),
                    }
                },
                quote! {
                    match self {
                        #(#write_arms)*
                    }
                },
            )
        }
        Data::Union(_) => {
            return Err(Error::new(
                input.span(),
                "ReadWrite cannot be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics crate::ReadWrite for #name #ty_generics #where_clause {
            fn read_from<Reader: std::io::Read>(reader: &mut Reader) -> crate::error::Result<Self> {
                #read_body
            }
            fn write_to<Writer: std::io::Write>(&self, writer: &mut Writer) -> crate::error::Result<()> {
                #write_body
            }
        }
    })
}
