use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{
    parse_macro_input, Expr, ExprLit, FnArg, Ident, ItemFn, Lit, Meta, Pat, ReturnType, Token,
    Type,
};

/// 为函数织入 AspectManager 的 before / after 钩子
///
/// 函数需要有一个 `Scope` 或 `&Scope` 参数（默认名为 `scope`）。
/// 函数体内的 `scope` 会被替换为压栈后的 Scope，
/// 返回 `Result` 时 `Err` 会传给 `after` 钩子。
///
/// # 参数
/// - `scope = ident`：Scope 参数名
/// - `name = "..."`：方法标识，默认使用 `method_name!()`
/// - `manager = expr`：使用指定的 `Arc<AspectManager>`，默认使用全局实例
///
/// # 示例
/// ```ignore
/// impl OrderRepository {
///     #[advised]
///     pub async fn save(&self, scope: &Scope, order: &Order) -> anyhow::Result<()> {
///         self.client.insert(scope, order).await
///     }
///
///     #[advised(scope = ctx, manager = self.aspects)]
///     pub fn count(&self, ctx: Scope) -> usize {
///         self.orders.len()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn advised(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr with Punctuated::<Meta, Token![,]>::parse_terminated);
    let item = parse_macro_input!(item as ItemFn);

    match expand(args, item) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

struct AdvisedArgs {
    scope: Ident,
    name: Option<Expr>,
    manager: Option<Expr>,
}

fn parse_args(args: Punctuated<Meta, Token![,]>) -> syn::Result<AdvisedArgs> {
    let mut parsed = AdvisedArgs {
        scope: format_ident!("scope"),
        name: None,
        manager: None,
    };

    for meta in args {
        let nv = match meta {
            Meta::NameValue(nv) => nv,
            other => return Err(syn::Error::new_spanned(other, "expected `key = value`")),
        };

        if nv.path.is_ident("scope") {
            parsed.scope = match &nv.value {
                Expr::Path(path) => path.path.get_ident().cloned().ok_or_else(|| {
                    syn::Error::new_spanned(path, "expected an identifier")
                })?,
                other => return Err(syn::Error::new_spanned(other, "expected an identifier")),
            };
        } else if nv.path.is_ident("name") {
            if !matches!(&nv.value, Expr::Lit(ExprLit { lit: Lit::Str(_), .. })) {
                return Err(syn::Error::new_spanned(nv.value, "expected a string literal"));
            }
            parsed.name = Some(nv.value);
        } else if nv.path.is_ident("manager") {
            parsed.manager = Some(nv.value);
        } else {
            return Err(syn::Error::new_spanned(
                nv.path,
                "unknown option, expected `scope`, `name` or `manager`",
            ));
        }
    }

    Ok(parsed)
}

fn expand(args: Punctuated<Meta, Token![,]>, item: ItemFn) -> syn::Result<TokenStream2> {
    let args = parse_args(args)?;
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = item;

    // 找到 Scope 参数，判断它是引用还是值
    let scope_ident = &args.scope;
    let scope_arg = sig.inputs.iter().find_map(|arg| match arg {
        FnArg::Typed(typed) => match typed.pat.as_ref() {
            Pat::Ident(pat) if pat.ident == *scope_ident => Some((typed.ty.as_ref(), pat)),
            _ => None,
        },
        FnArg::Receiver(_) => None,
    });
    let Some((scope_ty, scope_pat)) = scope_arg else {
        return Err(syn::Error::new_spanned(
            &sig,
            format!("#[advised] requires a `{}` parameter of type Scope or &Scope", scope_ident),
        ));
    };

    let method_name = match &args.name {
        Some(name) => quote!(#name),
        None => quote!(::aspectx::method_name!()),
    };
    let enter = match &args.manager {
        Some(manager) => quote!((#manager).enter(&#scope_ident, #method_name)),
        None => quote!(::aspectx::aop::enter(&#scope_ident, #method_name)),
    };

    let rebind_scope = match scope_ty {
        Type::Reference(_) => quote! {
            let __aspectx_scope = __aspectx_invocation.scope().clone();
            #[allow(unused_variables)]
            let #scope_ident = &__aspectx_scope;
        },
        _ => {
            let mutability = &scope_pat.mutability;
            quote! {
                #[allow(unused_mut, unused_variables)]
                let #mutability #scope_ident = __aspectx_invocation.scope().clone();
            }
        }
    };

    let return_type = match &sig.output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => Some(ty.as_ref()),
    };
    let nameable = return_type.map_or(true, |ty| !contains_impl_trait(ty));
    let returns_result = return_type.is_some_and(is_result);

    let body = match (sig.asyncness.is_some(), nameable, return_type) {
        (true, true, Some(ty)) => quote! {
            async move {
                #[allow(unreachable_code)]
                if false {
                    let __aspectx_fake_return: #ty = loop {};
                    return __aspectx_fake_return;
                }
                #block
            }
            .await
        },
        (true, _, _) => quote!(async move #block.await),
        (false, true, Some(ty)) => quote!((move || -> #ty #block)()),
        (false, _, _) => quote!((move || #block)()),
    };

    let finish = if returns_result {
        quote!(let _ = __aspectx_invocation.finish(&__aspectx_result);)
    } else {
        quote!(let _ = __aspectx_invocation.finish_ok();)
    };

    Ok(quote! {
        #(#attrs)*
        #vis #sig {
            let __aspectx_invocation = #enter;
            #rebind_scope
            #[allow(clippy::redundant_closure_call)]
            let __aspectx_result = #body;
            #finish
            __aspectx_result
        }
    })
}

/// 返回类型的最后一段是否为 `Result`（包括 `anyhow::Result<T>`、`io::Result<T>` 等别名）
fn is_result(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Result"),
        Type::Paren(paren) => is_result(&paren.elem),
        Type::Group(group) => is_result(&group.elem),
        _ => false,
    }
}

fn contains_impl_trait(ty: &Type) -> bool {
    match ty {
        Type::ImplTrait(_) => true,
        Type::Reference(reference) => contains_impl_trait(&reference.elem),
        Type::Paren(paren) => contains_impl_trait(&paren.elem),
        Type::Group(group) => contains_impl_trait(&group.elem),
        Type::Tuple(tuple) => tuple.elems.iter().any(contains_impl_trait),
        Type::Slice(slice) => contains_impl_trait(&slice.elem),
        Type::Array(array) => contains_impl_trait(&array.elem),
        Type::Path(path) => path.path.segments.iter().any(|segment| {
            match &segment.arguments {
                syn::PathArguments::AngleBracketed(args) => args.args.iter().any(|arg| {
                    matches!(arg, syn::GenericArgument::Type(ty) if contains_impl_trait(ty))
                }),
                _ => false,
            }
        }),
        _ => false,
    }
}
