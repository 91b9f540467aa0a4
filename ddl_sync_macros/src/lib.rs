//! Procedural macros for ddl_sync
//!
//! `#[derive(Entity)]` turns the `#[table]`, `#[index]` and `#[column]`
//! attributes of a struct into an `Entity` implementation and registers the
//! type in ddl_sync's static entity registry.

use ddl_sync_attrs::{
    parse_column_attr, parse_index_attr, parse_table_attr, ColumnAttr, IndexAttr, Literal,
};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{parse_macro_input, Data, DeriveInput, Fields};

/// Derive `ddl_sync::Entity` from declarative table metadata.
///
/// ```ignore
/// #[derive(Entity)]
/// #[table(name = "users")]
/// struct User {
///     #[column(primary_key, auto_increment)]
///     id: i32,
///     #[column(type = "string", length = 100, unique)]
///     username: String,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(table, index, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_entity(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name = name.to_string();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Entity only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Entity only supports structs")),
    };

    let mut table_name = None;
    let mut has_table = false;
    let mut indexes = Vec::new();
    for attr in &input.attrs {
        if attr.path().is_ident("table") {
            has_table = true;
            table_name = parse_table_attr(attr)?;
        } else if attr.path().is_ident("index") {
            indexes.push(index_tokens(parse_index_attr(attr)?));
        }
    }

    if !has_table {
        return Err(syn::Error::new_spanned(
            name,
            "Entity requires a #[table] or #[table(name = \"...\")] attribute",
        ));
    }

    let mut columns = Vec::new();
    for field in fields {
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("column")) {
            let field_name = field
                .ident
                .as_ref()
                .map(|ident| ident.to_string().trim_start_matches("r#").to_string())
                .unwrap_or_default();
            let ty = field.ty.to_token_stream();
            columns.push(column_tokens(parse_column_attr(attr)?, &field_name, ty));
        }
    }

    let table_name = option_string(table_name.as_deref());

    Ok(quote! {
        impl ::ddl_sync::Entity for #name {
            fn metadata() -> ::ddl_sync::models::EntityMeta {
                ::ddl_sync::models::EntityMeta {
                    type_name: #type_name.to_string(),
                    table: ::ddl_sync::models::TableMeta {
                        name: #table_name,
                        indexes: ::std::vec![#(#indexes),*],
                    },
                    columns: ::std::vec![#(#columns),*],
                }
            }
        }

        ::ddl_sync::inventory::submit! {
            ::ddl_sync::models::EntityDef {
                type_name: #type_name,
                source_file: ::std::file!(),
                metadata: <#name as ::ddl_sync::Entity>::metadata,
            }
        }
    })
}

fn index_tokens(index: IndexAttr) -> TokenStream2 {
    let name = option_string(index.name.as_deref());
    let columns = index.columns;
    let unique = index.unique;

    quote! {
        ::ddl_sync::models::IndexMeta {
            name: #name,
            columns: ::std::vec![#(#columns.to_string()),*],
            unique: #unique,
        }
    }
}

fn column_tokens(column: ColumnAttr, field: &str, ty: TokenStream2) -> TokenStream2 {
    let name = option_string(column.name.as_deref());
    let column_type = option_string(column.column_type.as_deref());
    let length = option_tokens(column.length);
    let nullable = option_tokens(column.nullable);
    let precision = option_tokens(column.precision);
    let scale = option_tokens(column.scale);
    let default = option_tokens(column.default.as_ref().map(scalar_tokens));
    let options = column.options.iter().map(|(key, value)| {
        let value = scalar_tokens(value);
        quote! { (#key.to_string(), #value) }
    });
    let ColumnAttr {
        unique,
        primary_key,
        auto_increment,
        ..
    } = column;

    quote! {
        ::ddl_sync::models::ColumnMeta {
            field: #field.to_string(),
            name: #name,
            column_type: #column_type,
            rust_type: ::std::stringify!(#ty).to_string(),
            length: #length,
            nullable: #nullable,
            default: #default,
            unique: #unique,
            primary_key: #primary_key,
            auto_increment: #auto_increment,
            precision: #precision,
            scale: #scale,
            options: ::std::vec![#(#options),*],
        }
    }
}

fn scalar_tokens(value: &Literal) -> TokenStream2 {
    match value {
        Literal::Null => quote! { ::ddl_sync::Scalar::Null },
        Literal::Bool(value) => quote! { ::ddl_sync::Scalar::Bool(#value) },
        Literal::Int(value) => quote! { ::ddl_sync::Scalar::Int(#value) },
        Literal::Float(value) => quote! { ::ddl_sync::Scalar::Float(#value) },
        Literal::Str(value) => quote! { ::ddl_sync::Scalar::String(#value.to_string()) },
    }
}

fn option_string(value: Option<&str>) -> TokenStream2 {
    match value {
        Some(value) => quote! { ::std::option::Option::Some(#value.to_string()) },
        None => quote! { ::std::option::Option::None },
    }
}

fn option_tokens<T: ToTokens>(value: Option<T>) -> TokenStream2 {
    match value {
        Some(value) => quote! { ::std::option::Option::Some(#value) },
        None => quote! { ::std::option::Option::None },
    }
}
