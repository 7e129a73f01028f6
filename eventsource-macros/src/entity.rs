use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Item, ItemStruct, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input,
};

/// #[entity] 宏实现
/// - 在字段最前注入 `root`（生命周期状态），已存在同名字段时报错
/// - 合并派生：Debug（可通过 debug=false 关闭）、Clone、Default
/// - `Entity::new` 以 `Default` 填充业务字段
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[entity] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let Some(event_ty) = cfg.event_ty else {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "missing key 'event', e.g. #[entity(event = OrderEvent)]",
        )
        .to_compile_error()
        .into();
    };

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    if let Some(existing) = fields_named
        .named
        .iter()
        .find(|f| f.ident.as_ref().is_some_and(|i| i == "root"))
    {
        return syn::Error::new(
            existing.span(),
            "field 'root' is reserved for the aggregate lifecycle state",
        )
        .to_compile_error()
        .into();
    }

    let root_field: syn::Field = syn::parse_quote! {
        root: ::eventsource::aggregate_root::AggregateRoot<#event_ty>
    };
    let mut named: Punctuated<syn::Field, Token![,]> = Punctuated::new();
    named.push(root_field);
    named.extend(fields_named.named.clone());
    fields_named.named = named;

    let mut required: Vec<syn::Path> = vec![syn::parse_quote!(Clone), syn::parse_quote!(Default)];
    if cfg.derive_debug.unwrap_or(true) {
        required.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st.attrs, required);

    let out_struct = ItemStruct { ..st };

    let ident = &out_struct.ident;
    let generics = out_struct.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let expanded = quote! {
        #out_struct

        impl #impl_generics ::eventsource::entity::Entity for #ident #ty_generics #where_clause {
            type Event = #event_ty;

            fn new(aggregate_id: ::std::string::String) -> Self {
                Self {
                    root: ::eventsource::aggregate_root::AggregateRoot::new(aggregate_id),
                    ..::std::default::Default::default()
                }
            }

            fn root(&self) -> &::eventsource::aggregate_root::AggregateRoot<#event_ty> {
                &self.root
            }

            fn root_mut(&mut self) -> &mut ::eventsource::aggregate_root::AggregateRoot<#event_ty> {
                &mut self.root
            }
        }
    };

    TokenStream::from(expanded)
}

// -------- parsing --------

struct EntityAttrConfig {
    event_ty: Option<Type>,
    derive_debug: Option<bool>,
}

impl Parse for EntityAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut event_ty: Option<Type> = None;
        let mut derive_debug: Option<bool> = None;

        let elems: Punctuated<EntityAttrElem, Token![,]> =
            Punctuated::<EntityAttrElem, Token![,]>::parse_terminated(input)?;

        for elem in elems.into_iter() {
            match elem {
                EntityAttrElem::Event(ty) => {
                    if event_ty.is_some() {
                        return Err(syn::Error::new(
                            ty.span(),
                            "duplicate key 'event' in attribute",
                        ));
                    }
                    event_ty = Some(*ty);
                }
                EntityAttrElem::Debug(b) => {
                    if derive_debug.is_some() {
                        return Err(syn::Error::new(
                            proc_macro2::Span::call_site(),
                            "duplicate key 'debug' in attribute",
                        ));
                    }
                    derive_debug = Some(b);
                }
            }
        }

        Ok(Self {
            event_ty,
            derive_debug,
        })
    }
}

enum EntityAttrElem {
    Event(Box<Type>),
    Debug(bool),
}

impl Parse for EntityAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        if key == "event" {
            let _eq: Token![=] = input.parse()?;
            let ty: Type = input.parse()?;
            Ok(EntityAttrElem::Event(Box::new(ty)))
        } else if key == "debug" {
            let _eq: Token![=] = input.parse()?;
            let expr: syn::Expr = input.parse()?;
            match expr {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Bool(b),
                    ..
                }) => Ok(EntityAttrElem::Debug(b.value())),
                other => Err(syn::Error::new(
                    other.span(),
                    "expected boolean literal for 'debug'",
                )),
            }
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'event' or 'debug'",
            ))
        }
    }
}
