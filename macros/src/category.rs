//! Category derive macro implementation
//!
//! Expands a unit-only enum into an ordered, labelled cohort axis.

use darling::{ast, FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

use crate::utils;

/// Receiver for the enum that derives `Category`
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(category), supports(enum_unit))]
struct CategoryReceiver {
    /// The enum identifier
    ident: syn::Ident,
    /// Human readable axis name used in error messages
    #[darling(default)]
    name: Option<String>,
    /// The enum data with parsed variants
    data: ast::Data<CategoryVariantReceiver, ()>,
}

/// Receiver for one enum variant
#[derive(Debug, FromVariant)]
#[darling(attributes(category))]
struct CategoryVariantReceiver {
    ident: syn::Ident,
    /// Canonical label written to and read from tables
    #[darling(default)]
    label: Option<String>,
    /// Extra labels accepted when parsing
    #[darling(default, multiple, rename = "alias")]
    aliases: Vec<String>,
}

/// Process the Category derive macro
pub fn process_derive_category(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let receiver = match CategoryReceiver::from_derive_input(&input) {
        Ok(receiver) => receiver,
        Err(err) => return err.write_errors().into(),
    };

    let ast::Data::Enum(variants) = &receiver.data else {
        unreachable!("Darling ensures this is an enum")
    };

    if variants.is_empty() {
        return syn::Error::new_spanned(&receiver.ident, "Category needs at least one variant")
            .to_compile_error()
            .into();
    }

    let labels: Vec<String> = variants
        .iter()
        .map(|v| utils::variant_label(&v.ident, v.label.as_deref()))
        .collect();

    if let Some(duplicate) = utils::first_duplicate(&labels) {
        return syn::Error::new_spanned(
            &receiver.ident,
            format!("duplicate category label '{duplicate}'"),
        )
        .to_compile_error()
        .into();
    }

    let axis_name = receiver
        .name
        .clone()
        .unwrap_or_else(|| utils::to_screaming_snake(&receiver.ident.to_string()).to_lowercase());

    TokenStream::from(generate_category_impl(
        &receiver.ident,
        &axis_name,
        variants,
        &labels,
    ))
}

/// Generate the trait, `Display` and `FromStr` implementations
fn generate_category_impl(
    enum_name: &syn::Ident,
    axis_name: &str,
    variants: &[CategoryVariantReceiver],
    labels: &[String],
) -> proc_macro2::TokenStream {
    let count = variants.len();
    let idents: Vec<_> = variants.iter().map(|v| &v.ident).collect();
    let indices: Vec<usize> = (0..count).collect();

    let parse_arms = variants.iter().zip(labels).map(|(variant, label)| {
        let ident = &variant.ident;
        let checks = std::iter::once(label)
            .chain(variant.aliases.iter())
            .map(|accepted| {
                quote! {
                    if label.eq_ignore_ascii_case(#accepted) {
                        return Some(Self::#ident);
                    }
                }
            });
        quote! { #(#checks)* }
    });

    quote! {
        impl #enum_name {
            /// Number of categories on this axis
            pub const COUNT: usize = #count;
        }

        impl crate::models::cohort::Category for #enum_name {
            const NAME: &'static str = #axis_name;
            const ALL: &'static [Self] = &[#(Self::#idents),*];

            fn index(self) -> usize {
                match self {
                    #(Self::#idents => #indices,)*
                }
            }

            fn label(self) -> &'static str {
                match self {
                    #(Self::#idents => #labels,)*
                }
            }

            fn from_label(label: &str) -> Option<Self> {
                let label = label.trim();
                #(#parse_arms)*
                None
            }
        }

        impl ::std::fmt::Display for #enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(crate::models::cohort::Category::label(*self))
            }
        }

        impl ::std::str::FromStr for #enum_name {
            type Err = crate::error::ProjectionError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                <Self as crate::models::cohort::Category>::from_label(s).ok_or_else(|| {
                    crate::error::ProjectionError::InvalidInput(format!(
                        "unknown {} label '{}'",
                        #axis_name,
                        s
                    ))
                })
            }
        }
    }
}
