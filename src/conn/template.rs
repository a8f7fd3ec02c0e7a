//! HTML escaping and the template renderer seam.

use std::collections::HashMap;

/// Renders a named template with already-escaped variables.
///
/// Returns `None` when no template with that name exists.
pub trait Renderer: Send + Sync {
    fn render(&self, name: &str, vars: &HashMap<String, String>) -> Option<String>;
}

impl<F> Renderer for F
where
    F: Fn(&str, &HashMap<String, String>) -> Option<String> + Send + Sync,
{
    fn render(&self, name: &str, vars: &HashMap<String, String>) -> Option<String> {
        self(name, vars)
    }
}

/// Replace `<`, `>`, `&`, `'` and `"` with their character entities.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
