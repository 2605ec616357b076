extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, DeriveInput, Ident, Token};

/// Implements `Layer` for a dissected header.
///
/// With a `#[layers(A, B)]` attribute the struct also gets a `HasLayers` impl
/// over its `layers` field, and nested lookups descend through `A` and `B`.
/// A bare `#[layers]` exposes the field without descending.
#[proc_macro_derive(Layer, attributes(layers))]
pub fn layer_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let name = &ast.ident;

    let mut gen = quote! {
        impl crate::Layer for #name {
            fn name() -> &'static str where Self: Sized {
                stringify!(#name)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };

    if let Some(attr) = ast.attrs.iter().find(|a| a.path.is_ident("layers")) {
        let children = if attr.tokens.is_empty() {
            Punctuated::<Ident, Token![,]>::new()
        } else {
            match attr.parse_args_with(Punctuated::<Ident, Token![,]>::parse_terminated) {
                Ok(children) => children,
                Err(e) => return e.to_compile_error().into(),
            }
        };
        let children = children.iter();
        gen.extend(quote! {
            impl crate::HasLayers for #name {
                fn layers(&self) -> &crate::Layers {
                    &self.layers
                }

                fn get_layer_descendants<T>(&self) -> Option<&T> where T: crate::Layer {
                    None
                    #(
                    .or_else(|| crate::get_layer::<_, #children>(self)
                        .and_then(|l| crate::GetLayers::get_layer::<T>(l)))
                    )*
                }
            }
        });
    }

    gen.into()
}
