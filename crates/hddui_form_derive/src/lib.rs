use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Type, parse_macro_input};

const FIELD_TYPES: &[(&str, &str)] = &[
    ("image", "Image"),
    ("text", "Text"),
    ("select", "Select"),
    ("multiple_dropdown", "MultipleDropdown"),
    ("checkbox", "Checkbox"),
    ("autocomplete", "Autocomplete"),
    ("date", "Date"),
    ("custom", "Custom"),
    ("number", "Number"),
    ("listbox", "Listbox"),
];

const NUMBER_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize", "f32",
    "f64", "Decimal",
];

const DATE_TYPES: &[&str] = &["NaiveDate", "NaiveDateTime", "DateTime"];

/// Derives `FormFields`, producing one field definition per named struct
/// field in declaration order.
///
/// Supported field attributes: `#[form(label = "..", required, skip,
/// field_type = "number")]`.
#[proc_macro_derive(FormFields, attributes(form))]
pub fn derive_form_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.ident,
            "FormFields derive currently supports only non-generic structs",
        ));
    }

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "FormFields derive requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                Span::call_site(),
                "FormFields derive is only supported on structs",
            ));
        }
    };

    let hddui = hddui_path();
    let model_ident = input.ident;
    let mut definitions = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let options = FieldOptions::parse(&field.attrs)?;
        if options.skip {
            continue;
        }

        let name = field_ident.to_string();
        let variant = match options.field_type {
            Some(tag) => field_type_variant(&tag)?,
            None => format_ident!("{}", infer_variant(&field.ty)),
        };
        let label = options
            .label
            .map(|label| quote!(.label(#label)))
            .unwrap_or_default();
        let required = options.required.then(|| quote!(.required(true)));

        definitions.push(quote! {
            #hddui::form::FieldDefinition::new(#name)
                .field_type(#hddui::form::FieldType::#variant)
                #label
                #required
        });
    }

    Ok(quote! {
        impl #hddui::form::FormFields for #model_ident {
            fn form_fields() -> ::std::vec::Vec<#hddui::form::FieldDefinition> {
                ::std::vec![#(#definitions),*]
            }
        }
    })
}

#[derive(Default)]
struct FieldOptions {
    label: Option<LitStr>,
    field_type: Option<LitStr>,
    required: bool,
    skip: bool,
}

impl FieldOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("form")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("label") {
                    options.label = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("field_type") {
                    options.field_type = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("required") {
                    options.required = true;
                } else if meta.path.is_ident("skip") {
                    options.skip = true;
                } else {
                    return Err(meta.error("unsupported form attribute"));
                }
                Ok(())
            })?;
        }
        Ok(options)
    }
}

fn field_type_variant(tag: &LitStr) -> syn::Result<Ident> {
    let value = tag.value();
    FIELD_TYPES
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, variant)| format_ident!("{variant}"))
        .ok_or_else(|| syn::Error::new_spanned(tag, format!("unknown field type `{value}`")))
}

/// Guesses the field type from the last path segment, looking through
/// `Option<T>`.
fn infer_variant(ty: &Type) -> &'static str {
    let Type::Path(path) = ty else {
        return "Text";
    };
    let Some(segment) = path.path.segments.last() else {
        return "Text";
    };
    let ident = segment.ident.to_string();
    if ident == "Option" {
        if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
            if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                return infer_variant(inner);
            }
        }
        return "Text";
    }
    if ident == "bool" {
        "Checkbox"
    } else if NUMBER_TYPES.contains(&ident.as_str()) {
        "Number"
    } else if DATE_TYPES.contains(&ident.as_str()) {
        "Date"
    } else {
        "Text"
    }
}

fn hddui_path() -> TokenStream2 {
    match crate_name("hddui") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::hddui),
    }
}
