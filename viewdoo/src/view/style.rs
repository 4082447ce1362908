//! Scoped styles.
//!
//! Every selector of a view's `<style>` block is rewritten to also require the
//! view's scope attribute, e.g. `.foo span` becomes `.foo span[viewdoo-1x2y3z4w5]`.
//! Every element rendered by the view carries the attribute, so the rules
//! only ever match the view's own elements.
//!
//! Scope attributes are unique for the whole process. They are handed out
//! by the global [`Stylesheets`] registry, which also keeps the scoped css by attribute.
use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use rand::Rng;
use tracing::debug;

use std::collections::HashMap;

static STYLESHEETS: Lazy<Mutex<Stylesheets>> = Lazy::new(|| Mutex::new(Stylesheets::new()));

// Pseudo-elements that can be written with a single colon.
const LEGACY_PSEUDO_ELEMENTS: [&str; 4] = ["before", "after", "first-line", "first-letter"];

// At-rules whose blocks contain more rules.
const NESTED_AT_RULES: [&str; 5] = ["media", "supports", "container", "layer", "document"];

/// A view definition's stylesheet, scoped to its attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Stylesheet {
    attr: String,
    css: String,
}

impl Stylesheet {
    /// Scope the style under a newly generated attribute.
    pub fn new(style: &str, prefix: &str) -> Self {
        let mut stylesheets = Stylesheets::cache();
        let attr = stylesheets.unique_attr(prefix);
        let css = scope(style, &attr);
        stylesheets.sheets.insert(attr.clone(), css.clone());

        debug!("Scoped stylesheet under \"{}\"", attr);

        Self { attr, css }
    }

    /// The attribute stamped on every element of the view.
    pub fn attr(&self) -> &str {
        &self.attr
    }

    /// Scoped css.
    pub fn css(&self) -> &str {
        &self.css
    }
}

/// Registry of scoped stylesheets, keyed by scope attribute.
pub struct Stylesheets {
    sheets: HashMap<String, String>,
}

impl Stylesheets {
    fn new() -> Self {
        Self {
            sheets: HashMap::new(),
        }
    }

    /// Obtain a lock to the global stylesheet registry.
    pub fn cache() -> MutexGuard<'static, Stylesheets> {
        STYLESHEETS.lock()
    }

    fn unique_attr(&mut self, prefix: &str) -> String {
        loop {
            let attr = format!("{}{}", prefix, unique_id());
            if !self.sheets.contains_key(&attr) {
                return attr;
            }
        }
    }

    /// Scoped css registered under the attribute.
    pub fn get(&self, attr: &str) -> Option<&str> {
        self.sheets.get(attr).map(|css| css.as_str())
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

// 9 random base36 characters.
fn unique_id() -> String {
    let mut rng = rand::thread_rng();
    (0..9)
        .filter_map(|_| std::char::from_digit(rng.gen_range(0..36), 36))
        .collect()
}

/// Rewrite every selector in `css` to require `attr`.
///
/// Rules inside `@media`, `@supports` and friends are scoped too. Other at-rules,
/// like `@keyframes` and `@font-face`, are copied as is.
pub fn scope(css: &str, attr: &str) -> String {
    let css = strip_comments(css);
    let mut out = String::new();
    rules(&css, attr, &mut out);
    out.trim_end().to_string()
}

fn rules(css: &str, attr: &str, out: &mut String) {
    let mut rest = css;

    loop {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }

        match find_top(trimmed, &['{', ';', '}']) {
            None => {
                out.push_str(trimmed.trim());
                out.push('\n');
                break;
            }

            // `@import url(...);`
            Some((i, ';')) => {
                out.push_str(trimmed[..=i].trim());
                out.push('\n');
                rest = &trimmed[i + 1..];
            }

            // Stray closing brace.
            Some((i, '}')) => {
                rest = &trimmed[i + 1..];
            }

            Some((i, _)) => {
                let prelude = trimmed[..i].trim();
                let end = matching_brace(trimmed, i);
                let body = &trimmed[i + 1..end];

                if let Some(name) = prelude.strip_prefix('@') {
                    let name = name
                        .split(|c: char| c.is_whitespace() || c == '(')
                        .next()
                        .unwrap_or("")
                        .to_lowercase();

                    if NESTED_AT_RULES.contains(&name.as_str()) {
                        out.push_str(prelude);
                        out.push_str(" {\n");
                        let mut nested = String::new();
                        rules(body, attr, &mut nested);
                        for line in nested.lines() {
                            out.push_str("  ");
                            out.push_str(line);
                            out.push('\n');
                        }
                        out.push_str("}\n");
                    } else {
                        out.push_str(prelude);
                        out.push_str(" {");
                        out.push_str(body);
                        out.push_str("}\n");
                    }
                } else {
                    out.push_str(&selectors(prelude, attr));
                    out.push_str(" { ");
                    out.push_str(body.trim());
                    out.push_str(" }\n");
                }

                rest = if end < trimmed.len() {
                    &trimmed[end + 1..]
                } else {
                    ""
                };
            }
        }
    }
}

fn selectors(prelude: &str, attr: &str) -> String {
    split_top(prelude, ',')
        .into_iter()
        .map(|selector| selector.trim())
        .filter(|selector| !selector.is_empty())
        .map(|selector| scope_selector(selector, attr))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Add the attribute to the last compound selector, before its pseudo-element.
pub fn scope_selector(selector: &str, attr: &str) -> String {
    let mut depth = 0usize;
    let mut quote = None;
    let mut pseudo = None;
    let mut chars = selector.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                let _ = chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ' ' | '\t' | '\n' | '>' | '+' | '~' if depth == 0 => pseudo = None,
            ':' if depth == 0 && pseudo.is_none() => {
                let rest = &selector[i + 1..];
                if rest.starts_with(':') || is_legacy_pseudo_element(rest) {
                    pseudo = Some(i);
                }
            }
            _ => (),
        }
    }

    let insert = pseudo.unwrap_or(selector.len());
    format!("{}[{}]{}", &selector[..insert], attr, &selector[insert..])
}

fn is_legacy_pseudo_element(rest: &str) -> bool {
    let name = rest
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .next()
        .unwrap_or("")
        .to_lowercase();
    LEGACY_PSEUDO_ELEMENTS.contains(&name.as_str())
}

// First of `needles` outside strings, parentheses and brackets.
fn find_top(text: &str, needles: &[char]) -> Option<(usize, char)> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut chars = text.char_indices();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                let _ = chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            c if depth == 0 && needles.contains(&c) => return Some((i, c)),
            _ => (),
        }
    }

    None
}

fn split_top(text: &str, separator: char) -> Vec<&str> {
    let mut parts = vec![];
    let mut rest = text;
    while let Some((i, _)) = find_top(rest, &[separator]) {
        parts.push(&rest[..i]);
        rest = &rest[i + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}

// Index of the `}` closing the `{` at `open`, or the end of the text.
fn matching_brace(text: &str, open: usize) -> usize {
    let mut depth = 0usize;
    let mut quote = None;
    let mut chars = text[open..].char_indices();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                let _ = chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return open + i;
                }
            }
            _ => (),
        }
    }

    text.len()
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scope_selector() {
        let attr = "viewdoo-abc";
        assert_eq!(scope_selector(".foo", attr), ".foo[viewdoo-abc]");
        assert_eq!(scope_selector("[bar]", attr), "[bar][viewdoo-abc]");
        assert_eq!(
            scope_selector(":not(div):not(span)", attr),
            ":not(div):not(span)[viewdoo-abc]"
        );
        assert_eq!(
            scope_selector("ul > li a:hover", attr),
            "ul > li a:hover[viewdoo-abc]"
        );
        assert_eq!(
            scope_selector("p::first-line", attr),
            "p[viewdoo-abc]::first-line"
        );
        assert_eq!(scope_selector("p:after", attr), "p[viewdoo-abc]:after");
        assert_eq!(
            scope_selector("a[href$=\".pdf\" i]", attr),
            "a[href$=\".pdf\" i][viewdoo-abc]"
        );
        assert_eq!(
            scope_selector("a::before b", attr),
            "a::before b[viewdoo-abc]"
        );
    }

    #[test]
    fn test_scope() {
        let css = r#"
            /* padding */
            .foo, div > span {
                padding: 3px;
            }

            @media (max-width: 600px) {
                a { color: red; }
            }

            @keyframes spin {
                from { transform: rotate(0deg); }
                to { transform: rotate(360deg); }
            }

            @import url("theme.css");
            p::after { content: "}"; }
        "#;

        let scoped = scope(css, "s");
        let expected = [
            ".foo[s], div > span[s] { padding: 3px; }",
            "@media (max-width: 600px) {",
            "  a[s] { color: red; }",
            "}",
            "@keyframes spin {",
        ];
        for line in expected {
            assert!(scoped.contains(line), "{} not in {}", line, scoped);
        }
        assert!(scoped.contains("from { transform: rotate(0deg); }"));
        assert!(!scoped.contains("from[s]"));
        assert!(scoped.contains("@import url(\"theme.css\");"));
        assert!(scoped.contains("p[s]::after { content: \"}\"; }"));
        assert!(!scoped.contains("padding */"));
    }

    #[test]
    fn test_unique_attrs() {
        let first = Stylesheet::new("div { padding: 4px; }", "viewdoo-");
        let second = Stylesheet::new("div { padding: 4px; }", "viewdoo-");

        assert_ne!(first.attr(), second.attr());
        assert!(first.attr().starts_with("viewdoo-"));
        assert_eq!(first.attr().len(), "viewdoo-".len() + 9);
        assert_eq!(
            first.css(),
            format!("div[{}] {{ padding: 4px; }}", first.attr())
        );

        let stylesheets = Stylesheets::cache();
        assert_eq!(stylesheets.get(first.attr()), Some(first.css()));
        assert!(!stylesheets.is_empty());
    }
}
