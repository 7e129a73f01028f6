use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use quote::{ToTokens, quote};
use std::collections::{HashMap, HashSet};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, Item, Result, Token, Type, parse_macro_input};

/// #[domain_event] 宏实现
/// - 仅支持单字段元组变体：`Variant(EventStruct)`，事件数据即内部结构体
/// - 合并派生：Debug, Clone, PartialEq
/// - 生成 `DomainEvent`（event_type/kind/encode/bindings）
/// - 内部类型互不相同时生成 `From<EventStruct>`
/// - 变体参数：`#[event(constructing, name = "...")]`，类型名默认为变体名
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[domain_event] takes no arguments; configure variants with #[event(..)]",
        )
        .to_compile_error()
        .into();
    }

    let mut input = parse_macro_input!(item as Item);

    let enum_item = match &mut input {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new(
                other.span(),
                "#[domain_event] can only be used on enum types",
            )
            .to_compile_error()
            .into();
        }
    };

    if enum_item.variants.is_empty() {
        return syn::Error::new(enum_item.span(), "#[domain_event] requires at least one variant")
            .to_compile_error()
            .into();
    }

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
    ];
    apply_derives(&mut enum_item.attrs, required);

    let mut variants: Vec<VariantDef> = Vec::new();
    let mut names: HashMap<String, proc_macro2::Span> = HashMap::new();

    for v in &mut enum_item.variants {
        let inner: Type = match &v.fields {
            syn::Fields::Unnamed(f) if f.unnamed.len() == 1 => f.unnamed[0].ty.clone(),
            _ => {
                return syn::Error::new(
                    v.span(),
                    "#[domain_event] supports only single-field tuple variants, e.g., Created(ItemCreated)",
                )
                .to_compile_error()
                .into();
            }
        };

        let mut retained_attrs = Vec::new();
        let mut cfg = VariantEventAttrConfig::default();

        for attr in v.attrs.iter() {
            if attr.path().is_ident("event") {
                if let Err(err) = parse_variant_event_attr(attr, &mut cfg) {
                    return err.to_compile_error().into();
                }
            } else {
                retained_attrs.push(attr.clone());
            }
        }
        v.attrs = retained_attrs;

        let name = cfg
            .name
            .unwrap_or_else(|| syn::LitStr::new(&v.ident.to_string(), v.ident.span()));

        if names.insert(name.value(), name.span()).is_some() {
            return syn::Error::new(
                name.span(),
                format!("duplicate event type name '{}'", name.value()),
            )
            .to_compile_error()
            .into();
        }

        variants.push(VariantDef {
            ident: v.ident.clone(),
            inner,
            name,
            constructing: cfg.constructing,
        });
    }

    let enum_ident = &enum_item.ident;
    let generics = enum_item.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let type_arms = variants.iter().map(|v| {
        let (ident, name) = (&v.ident, &v.name);
        quote! { Self::#ident(_) => #name }
    });

    let kind_arms = variants.iter().map(|v| {
        let ident = &v.ident;
        if v.constructing {
            quote! { Self::#ident(_) => ::eventsource::domain_event::EventKind::Constructing }
        } else {
            quote! { Self::#ident(_) => ::eventsource::domain_event::EventKind::Regular }
        }
    });

    let encode_arms = variants.iter().map(|v| {
        let ident = &v.ident;
        quote! { Self::#ident(inner) => ::eventsource::__private::serde_json::to_value(inner) }
    });

    let bindings = variants.iter().map(|v| {
        let (ident, inner, name) = (&v.ident, &v.inner, &v.name);
        quote! {
            ::eventsource::registry::TypeBinding::<Self>::new::<#inner>(#name, |data| {
                ::eventsource::__private::serde_json::from_value::<#inner>(data).map(Self::#ident)
            })
        }
    });

    // 同一内部类型出现在多个变体时不生成 From，避免冲突
    let mut seen = HashSet::new();
    let repeated: HashSet<String> = variants
        .iter()
        .map(|v| v.inner.to_token_stream().to_string())
        .filter(|key| !seen.insert(key.clone()))
        .collect();

    let from_impls = variants
        .iter()
        .filter(|v| !repeated.contains(&v.inner.to_token_stream().to_string()))
        .map(|v| {
            let (ident, inner) = (&v.ident, &v.inner);
            quote! {
                impl #impl_generics ::std::convert::From<#inner> for #enum_ident #ty_generics #where_clause {
                    fn from(event: #inner) -> Self {
                        Self::#ident(event)
                    }
                }
            }
        });

    let out = quote! {
        #enum_item

        impl #impl_generics ::eventsource::domain_event::DomainEvent for #enum_ident #ty_generics #where_clause {
            fn event_type(&self) -> &'static str {
                match self { #( #type_arms, )* }
            }

            fn kind(&self) -> ::eventsource::domain_event::EventKind {
                match self { #( #kind_arms, )* }
            }

            fn encode(
                &self,
            ) -> ::eventsource::__private::serde_json::Result<::eventsource::__private::serde_json::Value> {
                match self { #( #encode_arms, )* }
            }

            fn bindings() -> ::std::vec::Vec<::eventsource::registry::TypeBinding<Self>> {
                ::std::vec![ #( #bindings, )* ]
            }
        }

        #( #from_impls )*
    };

    TokenStream::from(out)
}

struct VariantDef {
    ident: syn::Ident,
    inner: Type,
    name: syn::LitStr,
    constructing: bool,
}

#[derive(Default)]
struct VariantEventAttrConfig {
    name: Option<syn::LitStr>,
    constructing: bool,
}

// 解析 `#[event(constructing, name = "...")]`，同一变体可拆成多个属性书写
fn parse_variant_event_attr(attr: &syn::Attribute, cfg: &mut VariantEventAttrConfig) -> Result<()> {
    let items: Punctuated<Expr, Token![,]> =
        attr.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?;

    for item in items {
        match item {
            Expr::Path(p) if p.path.is_ident("constructing") => {
                if cfg.constructing {
                    return Err(syn::Error::new(
                        p.span(),
                        "duplicate key 'constructing' in attribute",
                    ));
                }
                cfg.constructing = true;
            }
            Expr::Assign(assign) => {
                let is_name = matches!(&*assign.left, Expr::Path(p) if p.path.is_ident("name"));
                if !is_name {
                    return Err(syn::Error::new(
                        assign.left.span(),
                        "unknown key; expected 'constructing' | 'name'",
                    ));
                }
                if cfg.name.is_some() {
                    return Err(syn::Error::new(
                        assign.left.span(),
                        "duplicate key 'name' in attribute",
                    ));
                }
                match *assign.right {
                    Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(lit),
                        ..
                    }) => cfg.name = Some(lit),
                    other => {
                        return Err(syn::Error::new(
                            other.span(),
                            "expected string literal for 'name'",
                        ));
                    }
                }
            }
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "unknown key; expected 'constructing' | 'name'",
                ));
            }
        }
    }

    Ok(())
}
