use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Parses the `events_capacity = N` argument shared by both attributes.
fn parse_events_capacity(attr: &TokenStream) -> Result<Option<usize>, String> {
    let attr_str = attr.to_string();
    let mut events_capacity = None;

    for part in attr_str.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let Some(v) = part.strip_prefix("events_capacity") else {
            return Err(format!("unknown hub option `{part}`"));
        };

        let v = v.trim().trim_start_matches('=').trim();
        match v.parse::<usize>() {
            Ok(n) if n > 0 => events_capacity = Some(n),
            _ => return Err(format!("events_capacity must be a positive integer, got `{v}`")),
        }
    }

    Ok(events_capacity)
}

fn hub_builder(events_capacity: Option<usize>) -> String {
    let mut builder = String::from("::coselect::HubBuilder::new()");

    if let Some(n) = events_capacity {
        builder.push_str(&format!(".events_capacity({n})"));
    }

    builder.push_str(".build().expect(\"failed to build hub\")");
    builder
}

fn compile_error(msg: &str) -> TokenStream {
    format!("compile_error!({msg:?});").parse().unwrap()
}

/// Removes the `async` keyword and returns the position and source of the
/// function body.
fn split_body(tokens: &mut Vec<TokenTree>) -> Option<(usize, String)> {
    if let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(async_pos);
    }

    let pos = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))?;

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    Some((pos, block))
}

/// Runs an `async fn main` on a hub.
///
/// ```rust,ignore
/// #[coselect::main(events_capacity = 256)]
/// async fn main() {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let events_capacity = match parse_events_capacity(&attr) {
        Ok(n) => n,
        Err(msg) => return compile_error(&msg),
    };

    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some((pos, block)) = split_body(&mut tokens) else {
        return TokenStream::new();
    };

    let new_block = format!(
        "{{
            let hub = {};
            hub
                .block_on(async move {{
                    {}
                }})
        }}",
        hub_builder(events_capacity),
        block
    );

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, new_block.parse().unwrap()));

    tokens.into_iter().collect()
}

/// Runs an `async fn` test on a fresh hub.
///
/// ```rust,ignore
/// #[coselect::test]
/// async fn sleeps() {
///     coselect::time::sleep(std::time::Duration::from_millis(1)).await;
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let events_capacity = match parse_events_capacity(&attr) {
        Ok(n) => n,
        Err(msg) => return compile_error(&msg),
    };

    let mut tokens = item.into_iter().collect::<Vec<_>>();

    let Some((pos, block)) = split_body(&mut tokens) else {
        return TokenStream::new();
    };

    let new_block = format!(
        "{{
        let hub = {};
        hub
            .block_on(async move {{ {} }});
    }}",
        hub_builder(events_capacity),
        block
    );

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, new_block.parse().unwrap()));

    let test_attr: TokenStream = "#[test]".parse().unwrap();
    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(tokens);

    result.into_iter().collect()
}
