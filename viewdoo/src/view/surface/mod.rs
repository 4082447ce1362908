//! The rendering surface views mount into.
//!
//! The engine only needs a handful of operations from the host: parsing markup into
//! a detached fragment, moving nodes around, reading and writing attributes, binding
//! event listeners and injecting stylesheets. [`Document`] implements them in memory.
pub mod document;
pub mod html;

pub use document::{Document, Node};

use super::state::Scope;
use super::template::{self, Function, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("reference node is not attached to a parent")]
    Detached,

    #[error("a node can't be inserted into itself or its descendants")]
    Hierarchy,

    #[error("malformed markup: {0}")]
    Markup(String),
}

/// An event handler bound by a view, with the scope it runs against.
#[derive(Clone, Debug)]
pub struct Listener {
    function: Function,
    scope: Scope,
}

impl Listener {
    pub fn new(function: Function, scope: Scope) -> Self {
        Self { function, scope }
    }

    /// Invoke the handler with the event.
    pub fn call(&self, event: Value) -> Result<Value, template::Error> {
        self.function.call(&self.scope, &[event])
    }

    pub fn function(&self) -> &Function {
        &self.function
    }
}

/// Host rendering surface, e.g. a browser document.
pub trait Surface {
    type Node: Clone + PartialEq + std::fmt::Debug;

    /// Parse markup into a detached fragment.
    fn parse_fragment(&self, html: &str) -> Result<Self::Node, Error>;

    /// Children of a node, in order.
    fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Zero-width node used to anchor re-rendered output.
    fn create_marker(&self) -> Self::Node;

    /// Append `child` to `parent`. Appending a fragment moves its children.
    fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), Error>;

    /// Insert `node` right before `reference`. Inserting a fragment moves its children.
    fn insert_before(&self, node: &Self::Node, reference: &Self::Node) -> Result<(), Error>;

    /// Detach the node from its parent.
    fn remove(&self, node: &Self::Node);

    fn is_element(&self, node: &Self::Node) -> bool;

    /// Attributes of an element, in source order.
    fn attributes(&self, element: &Self::Node) -> Vec<(String, String)>;

    fn set_attribute(&self, element: &Self::Node, name: &str, value: &str);

    fn remove_attribute(&self, element: &Self::Node, name: &str);

    fn add_event_listener(&self, element: &Self::Node, event: &str, listener: Listener);

    /// Inject a stylesheet, once per key. Returns `false` if it's already there.
    fn inject_stylesheet(&self, key: &str, css: &str) -> bool;
}
