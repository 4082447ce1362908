//! Viewdoo turns view definitions, single text blocks with markup, an optional `<style>`
//! and an optional `<script>`, into reactive views. Every instance of a view keeps its
//! rendered nodes in sync with its state.
//!
//! ```
//! use viewdoo::prelude::*;
//!
//! let view = compile(r#"
//!     <style>p { color: red; }</style>
//!     <script>let greeting = "hello"</script>
//!     <p>{{ greeting }}, {{ name }}</p>
//! "#).unwrap();
//!
//! let document = Document::new();
//! let state = view.mount(&document, document.body(), [("name", "world")]).unwrap();
//! assert_eq!(document.body().text_content(), "hello, world");
//!
//! state.set("name", "viewdoo").unwrap();
//! assert_eq!(document.body().text_content(), "hello, viewdoo");
//! ```
//!
//! Views render synchronously by default: a dirty write re-renders the instance before
//! it returns. With [`view::Discipline::Batched`], writes are coalesced into one render
//! on the next frame, see [`view::scheduler`].
pub mod colors;
pub mod config;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod view;

pub use error::Error;
/// Serde is used for (de)serialization of props and config.
pub use serde;
pub use serde_json;

/// Remove unsafe characters from a string printed
/// inside markup.
pub fn safe_html(string: &str) -> String {
    string
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
