//! The entity attribute grammar
//!
//! Parsers for `#[table]`, `#[index]` and `#[column]`, shared by the
//! `Entity` derive and ddl_sync's source scanner so both read attributes
//! the same way:
//!
//! ```text
//! #[table(name = "users")]
//! #[index(name = "idx_users_email", columns("email"), unique)]
//! struct User {
//!     #[column(primary_key, auto_increment)]
//!     id: i32,
//!     #[column(type = "string", length = 100, unique)]
//!     username: String,
//!     #[column(default = true, options(comment = "soft delete"))]
//!     active: bool,
//! }
//! ```

use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ExprLit, ExprUnary, Lit, LitStr, Meta, Token, UnOp};

/// A literal written as a default or option value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// `#[index(...)]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexAttr {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// `#[column(...)]`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnAttr {
    pub name: Option<String>,
    pub column_type: Option<String>,
    pub length: Option<u32>,
    pub nullable: Option<bool>,
    pub default: Option<Literal>,
    pub unique: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub options: Vec<(String, Literal)>,
}

/// `#[table]` or `#[table(name = "...")]`
pub fn parse_table_attr(attr: &Attribute) -> syn::Result<Option<String>> {
    if matches!(attr.meta, Meta::Path(_)) {
        return Ok(None);
    }

    let mut name = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse::<LitStr>()?.value());
            Ok(())
        } else {
            Err(meta.error("unsupported table attribute, expected `name`"))
        }
    })?;

    Ok(name)
}

/// `#[index(name = "...", columns("a", "b"), unique)]`
pub fn parse_index_attr(attr: &Attribute) -> syn::Result<IndexAttr> {
    let mut index = IndexAttr::default();

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            index.name = Some(meta.value()?.parse::<LitStr>()?.value());
        } else if meta.path.is_ident("columns") {
            let content;
            syn::parenthesized!(content in meta.input);
            let names = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
            index.columns = names.iter().map(LitStr::value).collect();
        } else if meta.path.is_ident("unique") {
            index.unique = parse_flag(&meta)?;
        } else {
            return Err(meta.error("unsupported index attribute"));
        }
        Ok(())
    })?;

    if index.columns.is_empty() {
        return Err(syn::Error::new_spanned(attr, "index requires `columns(...)`"));
    }

    Ok(index)
}

/// `#[column]` or `#[column(...)]` on a field
pub fn parse_column_attr(attr: &Attribute) -> syn::Result<ColumnAttr> {
    let mut column = ColumnAttr::default();

    if matches!(attr.meta, Meta::Path(_)) {
        return Ok(column);
    }

    attr.parse_nested_meta(|meta| {
        let path = &meta.path;

        if path.is_ident("name") {
            column.name = Some(meta.value()?.parse::<LitStr>()?.value());
        } else if path.is_ident("type") {
            column.column_type = Some(meta.value()?.parse::<LitStr>()?.value());
        } else if path.is_ident("length") {
            column.length = Some(meta.value()?.parse::<syn::LitInt>()?.base10_parse()?);
        } else if path.is_ident("precision") {
            column.precision = Some(meta.value()?.parse::<syn::LitInt>()?.base10_parse()?);
        } else if path.is_ident("scale") {
            column.scale = Some(meta.value()?.parse::<syn::LitInt>()?.base10_parse()?);
        } else if path.is_ident("nullable") {
            column.nullable = Some(parse_flag(&meta)?);
        } else if path.is_ident("unique") {
            column.unique = parse_flag(&meta)?;
        } else if path.is_ident("primary_key") {
            column.primary_key = parse_flag(&meta)?;
        } else if path.is_ident("auto_increment") {
            column.auto_increment = parse_flag(&meta)?;
        } else if path.is_ident("default") {
            let expr: Expr = meta.value()?.parse()?;
            column.default = Some(parse_literal(&expr)?);
        } else if path.is_ident("options") {
            meta.parse_nested_meta(|option| {
                let key = option
                    .path
                    .get_ident()
                    .map(ToString::to_string)
                    .ok_or_else(|| option.error("option keys must be identifiers"))?;
                let expr: Expr = option.value()?.parse()?;
                column.options.push((key, parse_literal(&expr)?));
                Ok(())
            })?;
        } else {
            return Err(meta.error("unsupported column attribute"));
        }
        Ok(())
    })?;

    Ok(column)
}

/// A bare flag (`unique`) or an explicit `unique = false`
fn parse_flag(meta: &syn::meta::ParseNestedMeta) -> syn::Result<bool> {
    if meta.input.peek(Token![=]) {
        Ok(meta.value()?.parse::<syn::LitBool>()?.value)
    } else {
        Ok(true)
    }
}

/// `"x"`, `true`, `42`, `-1`, `1.5` or `None`
pub fn parse_literal(expr: &Expr) -> syn::Result<Literal> {
    match expr {
        Expr::Lit(ExprLit { lit, .. }) => lit_value(lit, false),
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => match expr.as_ref() {
            Expr::Lit(ExprLit { lit, .. }) => lit_value(lit, true),
            other => Err(syn::Error::new_spanned(other, "default must be a literal")),
        },
        Expr::Path(path) if path.path.is_ident("None") => Ok(Literal::Null),
        other => Err(syn::Error::new_spanned(other, "default must be a literal")),
    }
}

fn lit_value(lit: &Lit, negative: bool) -> syn::Result<Literal> {
    let value = match lit {
        Lit::Int(int) => {
            let value: i64 = int.base10_parse()?;
            Literal::Int(if negative { -value } else { value })
        }
        Lit::Float(float) => {
            let value: f64 = float.base10_parse()?;
            Literal::Float(if negative { -value } else { value })
        }
        Lit::Str(s) if !negative => Literal::Str(s.value()),
        Lit::Bool(b) if !negative => Literal::Bool(b.value),
        other => return Err(syn::Error::new_spanned(other, "unsupported default literal")),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use syn::parse_quote;

    #[test]
    fn bare_and_named_tables() {
        let bare: Attribute = parse_quote!(#[table]);
        let named: Attribute = parse_quote!(#[table(name = "users")]);

        assert_eq!(parse_table_attr(&bare).unwrap(), None);
        assert_eq!(parse_table_attr(&named).unwrap().as_deref(), Some("users"));
    }

    #[test]
    fn index_requires_columns() {
        let attr: Attribute = parse_quote!(#[index(name = "by_email", unique)]);
        assert!(parse_index_attr(&attr).is_err());

        let attr: Attribute = parse_quote!(#[index(columns("owner", "label"), unique = false)]);
        let index = parse_index_attr(&attr).unwrap();
        assert_eq!(index.columns, vec!["owner", "label"]);
        assert!(!index.unique);
    }

    #[test]
    fn every_column_key() {
        let attr: Attribute = parse_quote!(#[column(
            name = "price_cents",
            type = "decimal",
            precision = 10,
            scale = 2,
            nullable = false,
            default = -0.5,
            unique,
            options(collation = "nocase", weight = 3)
        )]);
        let column = parse_column_attr(&attr).unwrap();

        assert_eq!(column.name.as_deref(), Some("price_cents"));
        assert_eq!(column.column_type.as_deref(), Some("decimal"));
        assert_eq!((column.precision, column.scale), (Some(10), Some(2)));
        assert_eq!(column.nullable, Some(false));
        assert_eq!(column.default, Some(Literal::Float(-0.5)));
        assert!(column.unique && !column.primary_key);
        assert_eq!(
            column.options,
            vec![
                ("collation".to_string(), Literal::Str("nocase".into())),
                ("weight".to_string(), Literal::Int(3)),
            ]
        );
    }

    #[test]
    fn rejects_unknown_keys_and_expressions() {
        let unknown: Attribute = parse_quote!(#[column(size = 3)]);
        let computed: Attribute = parse_quote!(#[column(default = 1 + 1)]);
        let negative_text: Attribute = parse_quote!(#[column(default = -"x")]);

        assert!(parse_column_attr(&unknown).is_err());
        assert!(parse_column_attr(&computed).is_err());
        assert!(parse_column_attr(&negative_text).is_err());
    }
}
