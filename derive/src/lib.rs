use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse::Parser, parse_macro_input, Data, DataStruct, DeriveInput, Fields, Meta};

/// 生成 Record trait 的实现
///
/// 只有标注了 `#[column]` 的字段参与映射，列名默认与字段名相同。
/// 结构体必须实现 `Default`，查询结果中缺失或类型不匹配的字段保持默认值。
///
/// 使用示例：
/// ```ignore
/// #[derive(Debug, Default, Record)]
/// struct User {
///     // 数据库生成的主键，插入时跳过
///     #[column(skip_insert)]
///     id: i64,
///     #[column(name = "user_name")]
///     name: String,
///     #[column]
///     email: Option<String>,
///     // 不参与映射
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(column))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_record(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

/// 单个映射字段
struct ColumnField<'a> {
    ident: &'a syn::Ident,
    column: String,
    skip_insert: bool,
}

fn expand_record(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    // 获取字段列表（必须是具名字段的结构体）
    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record derive only supports structs with named fields",
            ));
        }
    };

    let mut mapped: Vec<ColumnField> = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs: Vec<&syn::Attribute> = field
            .attrs
            .iter()
            .filter(|attr| attr.path().is_ident("column"))
            .collect();
        if attrs.len() > 1 {
            return Err(syn::Error::new_spanned(
                attrs[1],
                "a field can carry only one #[column] attribute",
            ));
        }
        if let Some(attr) = attrs.first() {
            let column_field = parse_column_attr(ident, &attr.meta)?;
            if mapped.iter().any(|f| f.column == column_field.column) {
                return Err(syn::Error::new_spanned(
                    attr,
                    format!("duplicate column name `{}`", column_field.column),
                ));
            }
            mapped.push(column_field);
        }
    }

    let field_strs: Vec<String> = mapped.iter().map(|f| f.ident.unraw().to_string()).collect();
    let columns: Vec<&str> = mapped.iter().map(|f| f.column.as_str()).collect();
    let skips: Vec<bool> = mapped.iter().map(|f| f.skip_insert).collect();

    // INSERT 使用的字段
    let insert_fields: Vec<&ColumnField> = mapped.iter().filter(|f| !f.skip_insert).collect();
    let insert_count = insert_fields.len();
    let insert_idents: Vec<&syn::Ident> = insert_fields.iter().map(|f| f.ident).collect();
    let insert_columns: Vec<&str> = insert_fields.iter().map(|f| f.column.as_str()).collect();

    let assign_indexes: Vec<usize> = (0..mapped.len()).collect();
    let assign_idents: Vec<&syn::Ident> = mapped.iter().map(|f| f.ident).collect();

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics pgdal::Record for #name #ty_generics #where_clause {
            const FIELDS: &'static [pgdal::FieldMeta] = &[
                #(
                    pgdal::FieldMeta {
                        field: #field_strs,
                        column: #columns,
                        skip_insert: #skips,
                    },
                )*
            ];

            fn to_row(&self) -> pgdal::Row {
                let mut row = pgdal::Row::with_capacity(#insert_count);
                #(
                    row.insert(#insert_columns, pgdal::ToValue::to_value(&self.#insert_idents));
                )*
                row
            }

            fn assign(
                &mut self,
                index: usize,
                value: pgdal::Value,
            ) -> ::std::result::Result<(), pgdal::TypeMismatch> {
                match index {
                    #(
                        #assign_indexes => {
                            self.#assign_idents = pgdal::FromValue::from_value(value)?;
                        }
                    )*
                    _ => {}
                }
                Ok(())
            }
        }
    })
}

/// 解析 `#[column]`、`#[column(name = "...")]`、`#[column(skip_insert)]`
fn parse_column_attr<'a>(ident: &'a syn::Ident, meta: &Meta) -> syn::Result<ColumnField<'a>> {
    let mut column = ident.unraw().to_string();
    let mut skip_insert = false;

    match meta {
        Meta::Path(_) => {}
        Meta::List(list) => {
            let parser = syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated;
            let metas = parser.parse2(list.tokens.clone())?;
            for meta in metas {
                match &meta {
                    Meta::NameValue(nv) if nv.path.is_ident("name") => {
                        if let syn::Expr::Lit(syn::ExprLit {
                            lit: syn::Lit::Str(s),
                            ..
                        }) = &nv.value
                        {
                            column = s.value();
                        } else {
                            return Err(syn::Error::new_spanned(
                                &nv.value,
                                "column name must be a string literal",
                            ));
                        }
                    }
                    Meta::Path(path) if path.is_ident("skip_insert") => {
                        skip_insert = true;
                    }
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "unsupported column attribute, expected `name = \"...\"` or `skip_insert`",
                        ));
                    }
                }
            }
        }
        Meta::NameValue(nv) => {
            return Err(syn::Error::new_spanned(
                nv,
                "use #[column(name = \"...\")] to rename a column",
            ));
        }
    }

    if column.is_empty() {
        return Err(syn::Error::new_spanned(ident, "column name must not be empty"));
    }

    Ok(ColumnField {
        ident,
        column,
        skip_insert,
    })
}
