//! Procedural macros for the turnstile runtime.
//!
//! - `#[turnstile::main]` runs an `async fn main` on a fresh runtime.
//! - `#[turnstile::test]` does the same for `#[test]` functions.
//! - `join!` awaits several futures concurrently.
//!
//! Both attributes accept the builder options `queue_capacity = N` and
//! `event_interval = N`.

mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};
use utils::RuntimeArgs;

#[proc_macro]
pub fn join(input: TokenStream) -> TokenStream {
    let args = utils::split_args(input);
    let count = args.len();

    if count == 0 {
        return "()".parse().unwrap_or_default();
    }

    if count == 1 {
        let expr = utils::tokens_to_string(&args[0]);
        return format!("{{ ({expr}).await }}")
            .parse()
            .unwrap_or_else(|err| utils::compile_error(&format!("join macro error: {err}")));
    }

    let mut output = String::new();
    output.push_str("{\n");

    for (i, expr_tokens) in args.iter().enumerate() {
        let idx = i + 1;
        let expr = utils::tokens_to_string(expr_tokens);
        output.push_str(&format!(
            "let mut __f{idx} = (::std::boxed::Box::pin({expr}), ::core::option::Option::None::<_>);\n"
        ));
    }

    output.push_str("::std::future::poll_fn(move |cx| {\n");
    output.push_str("    use ::std::task::Poll;\n");

    for i in 1..=count {
        output.push_str(&format!(
            "    if __f{i}.1.is_none() {{\n\
                    if let Poll::Ready(val) = __f{i}.0.as_mut().poll(cx) {{\n\
                        __f{i}.1 = ::core::option::Option::Some(val);\n\
                    }}\n\
                }}\n"
        ));
    }

    let all_done = (1..=count)
        .map(|i| format!("__f{i}.1.is_some()"))
        .collect::<Vec<_>>()
        .join(" && ");

    output.push_str(&format!("    if {all_done} {{\n"));
    output.push_str("        Poll::Ready((\n");

    for i in 1..=count {
        output.push_str(&format!(
            "            match __f{i}.1.take() {{ ::core::option::Option::Some(v) => v, ::core::option::Option::None => unreachable!() }},\n"
        ));
    }

    output.push_str("        ))\n");
    output.push_str("    } else {\n");
    output.push_str("        Poll::Pending\n");
    output.push_str("    }\n");
    output.push_str("}).await\n");
    output.push_str("}\n");

    output
        .parse::<TokenStream>()
        .unwrap_or_else(|err| utils::compile_error(&format!("join macro error: {err}")))
}

/// Replaces the body of an `async fn` with a `block_on` call on a runtime
/// built from `args`, and drops the `async` keyword.
///
/// Returns `None` if the item has no body.
fn wrap_in_runtime(item: TokenStream, args: &RuntimeArgs) -> Option<Vec<TokenTree>> {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let mut pos = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))?;

    let TokenTree::Group(body) = &tokens[pos] else {
        return None;
    };
    let body = body.stream();

    if let Some(async_pos) = tokens[..pos]
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(async_pos);
        pos -= 1;
    }

    let new_body = format!(
        "{{
            let runtime = {};
            runtime.block_on(async move {{ {} }})
        }}",
        args.builder(),
        body
    );

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, new_body.parse().ok()?));

    Some(tokens)
}

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match RuntimeArgs::parse(attr) {
        Ok(args) => args,
        Err(arg) => return utils::compile_error(&format!("unsupported main argument: `{arg}`")),
    };

    match wrap_in_runtime(item, &args) {
        Some(tokens) => tokens.into_iter().collect(),
        None => utils::compile_error("#[turnstile::main] expects an `async fn`"),
    }
}

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match RuntimeArgs::parse(attr) {
        Ok(args) => args,
        Err(arg) => return utils::compile_error(&format!("unsupported test argument: `{arg}`")),
    };

    let Some(tokens) = wrap_in_runtime(item, &args) else {
        return utils::compile_error("#[turnstile::test] expects an `async fn`");
    };

    let mut result: Vec<TokenTree> = "#[::core::prelude::v1::test]"
        .parse::<TokenStream>()
        .unwrap_or_default()
        .into_iter()
        .collect();
    result.extend(tokens);

    result.into_iter().collect()
}
