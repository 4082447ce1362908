//! Splitting a view definition into markup, style and script.
//!
//! ```text
//! <style>
//!     .count { font-weight: bold; }
//! </style>
//!
//! <script>
//!     increment = () => count++
//! </script>
//!
//! <div class="count">{{ count }}</div>
//! ```
use once_cell::sync::Lazy;
use regex::Regex;

static STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<style>(.*?)</style>").expect("style regex"));
static SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<script>(.*?)</script>").expect("script regex"));
static NEW_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r").expect("new lines regex"));

/// The three parts of a view definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub markup: String,
    pub style: Option<String>,
    pub script: Option<String>,
}

impl Source {
    /// Extract the first `<style>` and `<script>` blocks. Everything else is markup.
    /// Missing blocks are `None`, and so are blocks that are empty once trimmed.
    pub fn split(text: &str) -> Self {
        let text = NEW_LINES.replace_all(text, "\n");

        let (text, style) = extract(&STYLE, &text);
        let (text, script) = extract(&SCRIPT, &text);

        Self {
            markup: text.trim().to_string(),
            style,
            script,
        }
    }
}

fn extract(re: &Regex, text: &str) -> (String, Option<String>) {
    match re.captures(text) {
        Some(captures) => {
            let (all, inner) = match (captures.get(0), captures.get(1)) {
                (Some(all), Some(inner)) => (all, inner),
                _ => return (text.to_string(), None),
            };

            let inner = inner.as_str().trim();
            let remaining = format!("{}{}", &text[..all.start()], &text[all.end()..]);
            let block = if inner.is_empty() {
                None
            } else {
                Some(inner.to_string())
            };

            (remaining, block)
        }

        None => (text.to_string(), None),
    }
}
