// ABOUTME: Syntax highlighting of formatted key values
// ABOUTME: Parses JSON with tree-sitter and wraps its tokens in classed, HTML-escaped spans

use tree_sitter::{Language, Node, Parser, Tree};

const OPEN: &str = "<pre class=\"highlight\"><code>";
const CLOSE: &str = "</code></pre>";

/// Render `text` as highlighted HTML.
///
/// Text that does not parse as JSON is escaped and rendered without spans.
pub fn highlight_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2 + OPEN.len() + CLOSE.len());
    out.push_str(OPEN);
    match parse_json(text) {
        Some(tree) => push_tokens(&mut out, &tree, text),
        None => push_escaped(&mut out, text),
    }
    out.push_str(CLOSE);
    out
}

/// Syntax tree of `text`, or None when it is not clean JSON
fn parse_json(text: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&Language::new(tree_sitter_json::LANGUAGE)) {
        log::warn!("JSON grammar unavailable, highlighting as plain text: {}", e);
        return None;
    }

    let tree = parser.parse(text, None)?;
    let root = tree.root_node();
    if root.has_error() || root.named_child_count() == 0 {
        return None;
    }
    Some(tree)
}

fn token_class(node: &Node) -> Option<&'static str> {
    match node.kind() {
        "string" if is_pair_key(node) => Some("tok-key"),
        "string" => Some("tok-string"),
        "number" => Some("tok-number"),
        "true" | "false" => Some("tok-boolean"),
        "null" => Some("tok-null"),
        "{" | "}" | "[" | "]" | "," | ":" if !node.is_named() => Some("tok-punct"),
        _ => None,
    }
}

fn is_pair_key(node: &Node) -> bool {
    node.parent()
        .and_then(|pair| pair.child_by_field_name("key"))
        .is_some_and(|key| key == *node)
}

/// Walk the tree in document order. Classed nodes become spans; the text
/// between them (whitespace, comments) is copied through escaped.
fn push_tokens(out: &mut String, tree: &Tree, text: &str) {
    let mut written = 0;
    let mut walker = tree.walk();

    'walk: loop {
        let node = walker.node();
        let class = token_class(&node);
        if let Some(class) = class {
            push_escaped(out, &text[written..node.start_byte()]);
            push_span(out, class, &text[node.start_byte()..node.end_byte()]);
            written = node.end_byte();
        }

        if class.is_none() && walker.goto_first_child() {
            continue;
        }
        while !walker.goto_next_sibling() {
            if !walker.goto_parent() {
                break 'walk;
            }
        }
    }

    push_escaped(out, &text[written..]);
}

fn push_span(out: &mut String, class: &str, token: &str) {
    out.push_str("<span class=\"");
    out.push_str(class);
    out.push_str("\">");
    push_escaped(out, token);
    out.push_str("</span>");
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
