use proc_macro::{TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`.
/// Commas at the top level are used as separators; commas nested inside
/// groups (parentheses, brackets, braces) belong to their group token and
/// are never seen here. Empty arguments, such as the one after a trailing
/// comma, are skipped.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(current);
                    current = Vec::new();
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Converts a slice of tokens into a Rust source string.
///
/// The tokens are reassembled into a `TokenStream` first, so that joint
/// punctuation (`::`, `'a`, `=>`) is rendered without spaces while
/// neighbouring identifiers never merge.
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    tokens.iter().cloned().collect::<TokenStream>().to_string()
}

/// Builder options accepted by `#[main]` and `#[test]`.
#[derive(Debug, Default)]
pub(crate) struct RuntimeArgs {
    pub(crate) queue_capacity: Option<usize>,
    pub(crate) event_interval: Option<usize>,
}

impl RuntimeArgs {
    /// Parses `key = value` pairs separated by commas.
    ///
    /// Returns the offending fragment on an unknown key or a value that is
    /// not a positive integer.
    pub(crate) fn parse(attr: TokenStream) -> Result<Self, String> {
        let mut args = Self::default();

        for arg in split_args(attr) {
            let text = tokens_to_string(&arg);

            let Some((key, value)) = text.split_once('=') else {
                return Err(text);
            };

            let value = match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(text),
            };

            match key.trim() {
                "queue_capacity" => args.queue_capacity = Some(value),
                "event_interval" => args.event_interval = Some(value),
                _ => return Err(text),
            }
        }

        Ok(args)
    }

    /// Renders the expression building the runtime.
    pub(crate) fn builder(&self) -> String {
        let mut builder = String::from("::turnstile::RuntimeBuilder::new()");

        if let Some(n) = self.queue_capacity {
            builder.push_str(&format!(".queue_capacity({n})"));
        }

        if let Some(n) = self.event_interval {
            builder.push_str(&format!(".event_interval({n})"));
        }

        builder.push_str(".build()");
        builder
    }
}

/// Produces a `compile_error!` invocation carrying `msg`.
pub(crate) fn compile_error(msg: &str) -> TokenStream {
    format!("compile_error!({msg:?});")
        .parse()
        .unwrap_or_default()
}
