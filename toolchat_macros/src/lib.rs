//! Procedural macros for declaring tools from plain functions

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, punctuated::Punctuated, spanned::Spanned, token::Comma, Expr, ExprLit,
    FnArg, ItemFn, Lit, LitStr, Meta, Type,
};

/// Attribute macro that turns a function into a registrable tool
///
/// # Example
///
/// ```ignore
/// #[tool(description = "Look up an order by id", permission = "authenticated")]
/// async fn lookup_order(args: LookupArgs, context: ToolExecutionContext) -> Result<Order, String> {
///     // Implementation
/// }
/// ```
///
/// This will generate a module `lookup_order_tool` containing:
/// - `NAME`: the tool name
/// - `DESCRIPTION`: the tool description
/// - `execute`: re-export of the original function
/// - `tool()`: an `FnTool` ready to register
///
/// # Usage
///
/// ```ignore
/// registry.register_tool(lookup_order_tool::tool())?;
///
/// // Or several at once
/// register_tools!(registry, lookup_order_tool, weather_tool);
/// ```
///
/// # Attributes
///
/// - `description`: (required) what the tool does
/// - `name`: (optional) override the tool name (defaults to function name)
/// - `category`: (optional) `knowledge`, `data`, `action`, `integration` or `utility`
/// - `permission`: (optional) `public`, `authenticated`, `admin` or `custom`
/// - `enabled`: (optional) `false` to register the tool disabled
///
/// The first parameter is the arguments type (`Deserialize + JsonSchema`); an optional
/// second parameter receives the `ToolExecutionContext`, by value or by reference.
/// The function may be async or sync and must return `Result<impl Serialize, String>`.
#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_args = parse_macro_input!(attr with Punctuated::<Meta, Comma>::parse_terminated);
    let input_fn = parse_macro_input!(item as ItemFn);

    match expand(attr_args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct ToolAttributes {
    description: Option<String>,
    name: Option<String>,
    category: Option<TokenStream2>,
    permission: Option<TokenStream2>,
    enabled: Option<bool>,
}

fn parse_attributes(args: Punctuated<Meta, Comma>) -> syn::Result<ToolAttributes> {
    let mut attrs = ToolAttributes::default();

    for arg in args {
        let nv = match arg {
            Meta::NameValue(nv) => nv,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "expected `key = value` in tool attribute",
                ))
            }
        };

        let key = nv
            .path
            .get_ident()
            .map(|ident| ident.to_string())
            .unwrap_or_default();

        match (key.as_str(), &nv.value) {
            ("description", Expr::Lit(ExprLit { lit: Lit::Str(lit), .. })) => {
                attrs.description = Some(lit.value());
            }
            ("name", Expr::Lit(ExprLit { lit: Lit::Str(lit), .. })) => {
                attrs.name = Some(lit.value());
            }
            ("category", Expr::Lit(ExprLit { lit: Lit::Str(lit), .. })) => {
                attrs.category = Some(category_variant(lit)?);
            }
            ("permission", Expr::Lit(ExprLit { lit: Lit::Str(lit), .. })) => {
                attrs.permission = Some(permission_variant(lit)?);
            }
            ("enabled", Expr::Lit(ExprLit { lit: Lit::Bool(lit), .. })) => {
                attrs.enabled = Some(lit.value);
            }
            ("description" | "name" | "category" | "permission", value) => {
                return Err(syn::Error::new_spanned(value, "expected a string literal"));
            }
            ("enabled", value) => {
                return Err(syn::Error::new_spanned(value, "expected `true` or `false`"));
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &nv.path,
                    "unknown tool attribute; expected description, name, category, permission or enabled",
                ))
            }
        }
    }

    Ok(attrs)
}

fn category_variant(lit: &LitStr) -> syn::Result<TokenStream2> {
    let variant = match lit.value().as_str() {
        "knowledge" => quote!(Knowledge),
        "data" => quote!(Data),
        "action" => quote!(Action),
        "integration" => quote!(Integration),
        "utility" => quote!(Utility),
        _ => {
            return Err(syn::Error::new(
                lit.span(),
                "category must be one of: knowledge, data, action, integration, utility",
            ))
        }
    };
    Ok(quote!(::toolchat::llm::tools::ToolCategory::#variant))
}

fn permission_variant(lit: &LitStr) -> syn::Result<TokenStream2> {
    let variant = match lit.value().as_str() {
        "public" => quote!(Public),
        "authenticated" => quote!(Authenticated),
        "admin" => quote!(Admin),
        "custom" => quote!(Custom),
        _ => {
            return Err(syn::Error::new(
                lit.span(),
                "permission must be one of: public, authenticated, admin, custom",
            ))
        }
    };
    Ok(quote!(::toolchat::llm::tools::PermissionLevel::#variant))
}

fn expand(args: Punctuated<Meta, Comma>, input_fn: ItemFn) -> syn::Result<TokenStream2> {
    let attrs = parse_attributes(args)?;

    let description = attrs.description.ok_or_else(|| {
        syn::Error::new_spanned(
            &input_fn.sig,
            "tool attribute requires a 'description' parameter",
        )
    })?;

    let fn_name = &input_fn.sig.ident;
    let tool_name = attrs.name.unwrap_or_else(|| fn_name.to_string());

    let params: Vec<&Type> = input_fn
        .sig
        .inputs
        .iter()
        .map(|input| match input {
            FnArg::Typed(pat_type) => Ok(pat_type.ty.as_ref()),
            FnArg::Receiver(receiver) => Err(syn::Error::new(
                receiver.span(),
                "tool functions cannot take `self`",
            )),
        })
        .collect::<syn::Result<_>>()?;

    let (arg_type, context_type) = match params.as_slice() {
        [arg] => (*arg, None),
        [arg, context] => (*arg, Some(*context)),
        _ => {
            return Err(syn::Error::new_spanned(
                &input_fn.sig.inputs,
                "tool function takes the arguments and optionally the execution context",
            ))
        }
    };

    let base_type = strip_reference(arg_type);
    let args_expr = if is_reference(arg_type) {
        quote!(&args)
    } else {
        quote!(args)
    };

    let (context_param, call_args) = match context_type {
        Some(ty) if is_reference(ty) => (quote!(context), quote!(#args_expr, &context)),
        Some(_) => (quote!(context), quote!(#args_expr, context)),
        None => (quote!(_context), quote!(#args_expr)),
    };

    let invoke = if input_fn.sig.asyncness.is_some() {
        quote!(execute(#call_args).await)
    } else {
        quote!(execute(#call_args))
    };

    let category = attrs
        .category
        .unwrap_or_else(|| quote!(::toolchat::llm::tools::ToolCategory::Utility));
    let permission = attrs
        .permission
        .unwrap_or_else(|| quote!(::toolchat::llm::tools::PermissionLevel::Public));
    let enabled = attrs.enabled.unwrap_or(true);

    // calculator -> calculator_tool
    let module_name = syn::Ident::new(&format!("{}_tool", fn_name), fn_name.span());

    let mut pub_input_fn = input_fn.clone();
    pub_input_fn.vis = syn::parse_quote!(pub);

    Ok(quote! {
        #pub_input_fn

        #[allow(dead_code)]
        pub mod #module_name {
            use super::*;

            /// The name of this tool (use when registering)
            pub const NAME: &str = #tool_name;

            /// What the tool does, as shown to the model
            pub const DESCRIPTION: &str = #description;

            /// The executable function for this tool (re-exported from parent)
            pub use super::#fn_name as execute;

            /// Build the registrable tool
            pub fn tool() -> ::toolchat::llm::tools::FnTool {
                ::toolchat::llm::tools::FnTool::new(
                    NAME,
                    DESCRIPTION,
                    |args: #base_type, #context_param: ::toolchat::llm::tools::ToolExecutionContext| async move {
                        #invoke
                    },
                )
                .with_category(#category)
                .with_permission(#permission)
                .with_enabled(#enabled)
            }
        }
    })
}

fn is_reference(ty: &Type) -> bool {
    matches!(ty, Type::Reference(_))
}

/// Strip reference modifiers from a type to get the base type
fn strip_reference(ty: &Type) -> &Type {
    match ty {
        Type::Reference(type_ref) => strip_reference(&type_ref.elem),
        _ => ty,
    }
}
