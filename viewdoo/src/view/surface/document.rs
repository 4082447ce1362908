//! In-memory document.
//!
//! A small DOM: elements, text, comments and fragments in a `Rc`/`RefCell` tree
//! with weak parent links. Good enough to render views outside of a browser,
//! on the command line or in tests.
use super::{html, Error, Listener, Surface};
use crate::view::template::{self, Value};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[derive(Debug)]
enum Kind {
    Fragment,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        listeners: Vec<(String, Listener)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct Data {
    kind: Kind,
    parent: Option<Weak<RefCell<Data>>>,
    children: Vec<Node>,
}

/// Handle to a node. Clones refer to the same node.
#[derive(Clone)]
pub struct Node {
    inner: Rc<RefCell<Data>>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({})", self.outer_html())
    }
}

impl Node {
    fn new(kind: Kind) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Data {
                kind,
                parent: None,
                children: vec![],
            })),
        }
    }

    pub fn element(tag: &str) -> Self {
        Self::new(Kind::Element {
            tag: tag.to_lowercase(),
            attributes: vec![],
            listeners: vec![],
        })
    }

    pub fn text(text: &str) -> Self {
        Self::new(Kind::Text(text.to_string()))
    }

    pub fn comment(text: &str) -> Self {
        Self::new(Kind::Comment(text.to_string()))
    }

    pub fn fragment() -> Self {
        Self::new(Kind::Fragment)
    }

    pub fn is_element(&self) -> bool {
        matches!(self.inner.borrow().kind, Kind::Element { .. })
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.inner.borrow().kind, Kind::Fragment)
    }

    /// Tag name of an element, lowercase.
    pub fn tag(&self) -> Option<String> {
        match self.inner.borrow().kind {
            Kind::Element { ref tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<Node> {
        self.inner
            .borrow()
            .parent
            .as_ref()
            .and_then(|parent| parent.upgrade())
            .map(|inner| Node { inner })
    }

    pub fn children(&self) -> Vec<Node> {
        self.inner.borrow().children.clone()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        match self.inner.borrow().kind {
            Kind::Element { ref attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        match self.inner.borrow().kind {
            Kind::Element { ref attributes, .. } => attributes.clone(),
            _ => vec![],
        }
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        if let Kind::Element {
            ref mut attributes, ..
        } = self.inner.borrow_mut().kind
        {
            match attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&self, name: &str) {
        if let Kind::Element {
            ref mut attributes, ..
        } = self.inner.borrow_mut().kind
        {
            attributes.retain(|(key, _)| key != name);
        }
    }

    pub fn add_event_listener(&self, event: &str, listener: Listener) {
        if let Kind::Element {
            ref mut listeners, ..
        } = self.inner.borrow_mut().kind
        {
            listeners.push((event.to_lowercase(), listener));
        }
    }

    /// Number of listeners bound for the event.
    pub fn listeners(&self, event: &str) -> usize {
        match self.inner.borrow().kind {
            Kind::Element { ref listeners, .. } => {
                listeners.iter().filter(|(name, _)| name == event).count()
            }
            _ => 0,
        }
    }

    /// Fire an event on the node. It bubbles up to the node's ancestors.
    ///
    /// Returns the number of listeners that ran.
    pub fn dispatch(&self, event: &str) -> Result<usize, template::Error> {
        let event = event.to_lowercase();
        let mut count = 0;
        let mut target = Some(self.clone());

        while let Some(node) = target {
            // Listeners can re-render and detach the node, collect them first.
            let listeners = match node.inner.borrow().kind {
                Kind::Element { ref listeners, .. } => listeners
                    .iter()
                    .filter(|(name, _)| *name == event)
                    .map(|(_, listener)| listener.clone())
                    .collect::<Vec<_>>(),
                _ => vec![],
            };

            for listener in listeners {
                listener.call(Value::String(event.clone()))?;
                count += 1;
            }

            target = node.parent();
        }

        Ok(count)
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self) -> String {
        match self.inner.borrow().kind {
            Kind::Text(ref text) => text.clone(),
            Kind::Comment(_) => String::new(),
            _ => self
                .children()
                .iter()
                .map(|child| child.text_content())
                .collect(),
        }
    }

    /// First descendant element with the tag, depth-first.
    pub fn query(&self, tag: &str) -> Option<Node> {
        self.query_all(tag).into_iter().next()
    }

    /// All descendant elements with the tag, in document order.
    pub fn query_all(&self, tag: &str) -> Vec<Node> {
        let tag = tag.to_lowercase();
        let mut found = vec![];
        self.collect(&tag, &mut found);
        found
    }

    fn collect(&self, tag: &str, found: &mut Vec<Node>) {
        for child in self.children() {
            if child.tag().as_deref() == Some(tag) {
                found.push(child.clone());
            }
            child.collect(tag, found);
        }
    }

    pub fn inner_html(&self) -> String {
        let mut html = String::new();
        for child in self.children() {
            child.serialize(&mut html);
        }
        html
    }

    pub fn outer_html(&self) -> String {
        let mut html = String::new();
        self.serialize(&mut html);
        html
    }

    fn serialize(&self, html: &mut String) {
        let data = self.inner.borrow();
        match data.kind {
            Kind::Text(ref text) => html.push_str(text),
            Kind::Comment(ref text) => {
                html.push_str("<!--");
                html.push_str(text);
                html.push_str("-->");
            }
            Kind::Fragment => {
                for child in &data.children {
                    child.serialize(html);
                }
            }
            Kind::Element {
                ref tag,
                ref attributes,
                ..
            } => {
                html.push('<');
                html.push_str(tag);
                for (name, value) in attributes {
                    html.push(' ');
                    html.push_str(name);
                    html.push_str("=\"");
                    html.push_str(&value.replace('"', "&quot;"));
                    html.push('"');
                }
                html.push('>');

                if html::is_void(tag) {
                    return;
                }

                for child in &data.children {
                    child.serialize(html);
                }

                html.push_str("</");
                html.push_str(tag);
                html.push('>');
            }
        }
    }

    fn contains(&self, other: &Node) -> bool {
        let mut node = Some(other.clone());
        while let Some(current) = node {
            if current == *self {
                return true;
            }
            node = current.parent();
        }
        false
    }

    /// Detach the node from its parent.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent
                .inner
                .borrow_mut()
                .children
                .retain(|child| child != self);
        }
        self.inner.borrow_mut().parent = None;
    }

    // Nodes to move: a fragment's children, or the node itself.
    fn moving(&self) -> Vec<Node> {
        if self.is_fragment() {
            self.children()
        } else {
            vec![self.clone()]
        }
    }

    pub fn append_child(&self, child: &Node) -> Result<(), Error> {
        if child.contains(self) {
            return Err(Error::Hierarchy);
        }

        for node in child.moving() {
            node.remove();
            node.inner.borrow_mut().parent = Some(Rc::downgrade(&self.inner));
            self.inner.borrow_mut().children.push(node);
        }

        Ok(())
    }

    /// Insert `node` right before this node.
    pub fn insert_before(&self, node: &Node) -> Result<(), Error> {
        let parent = self.parent().ok_or(Error::Detached)?;
        if node.contains(&parent) {
            return Err(Error::Hierarchy);
        }

        for moving in node.moving() {
            if moving == *self {
                continue;
            }
            moving.remove();

            let mut data = parent.inner.borrow_mut();
            let index = data
                .children
                .iter()
                .position(|child| child == self)
                .ok_or(Error::Detached)?;
            data.children.insert(index, moving.clone());
            drop(data);

            moving.inner.borrow_mut().parent = Some(Rc::downgrade(&parent.inner));
        }

        Ok(())
    }
}

/// In-memory document with a `<head>` and a `<body>`.
#[derive(Clone, Debug)]
pub struct Document {
    root: Node,
    head: Node,
    body: Node,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let root = Node::element("html");
        let head = Node::element("head");
        let body = Node::element("body");

        // Fresh nodes can't form a cycle.
        let _ = root.append_child(&head);
        let _ = root.append_child(&body);

        Self { root, head, body }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn head(&self) -> &Node {
        &self.head
    }

    pub fn body(&self) -> &Node {
        &self.body
    }

    /// Injected stylesheets as `(key, css)`, in injection order.
    pub fn stylesheets(&self) -> Vec<(String, String)> {
        self.head
            .query_all("style")
            .into_iter()
            .filter_map(|style| {
                style
                    .attributes()
                    .first()
                    .map(|(key, _)| (key.clone(), style.text_content()))
            })
            .collect()
    }

    /// Serialize the whole document.
    pub fn html(&self) -> String {
        format!("<!DOCTYPE html>{}", self.root.outer_html())
    }
}

impl Surface for Document {
    type Node = Node;

    fn parse_fragment(&self, markup: &str) -> Result<Node, Error> {
        let fragment = Node::fragment();
        html::parse(markup, &fragment)?;
        Ok(fragment)
    }

    fn child_nodes(&self, node: &Node) -> Vec<Node> {
        node.children()
    }

    fn create_marker(&self) -> Node {
        Node::text("")
    }

    fn append_child(&self, parent: &Node, child: &Node) -> Result<(), Error> {
        parent.append_child(child)
    }

    fn insert_before(&self, node: &Node, reference: &Node) -> Result<(), Error> {
        reference.insert_before(node)
    }

    fn remove(&self, node: &Node) {
        node.remove()
    }

    fn is_element(&self, node: &Node) -> bool {
        node.is_element()
    }

    fn attributes(&self, element: &Node) -> Vec<(String, String)> {
        element.attributes()
    }

    fn set_attribute(&self, element: &Node, name: &str, value: &str) {
        element.set_attribute(name, value)
    }

    fn remove_attribute(&self, element: &Node, name: &str) {
        element.remove_attribute(name)
    }

    fn add_event_listener(&self, element: &Node, event: &str, listener: Listener) {
        element.add_event_listener(event, listener)
    }

    fn inject_stylesheet(&self, key: &str, css: &str) -> bool {
        let exists = self
            .head
            .query_all("style")
            .iter()
            .any(|style| style.attribute(key).is_some());

        if exists {
            return false;
        }

        let style = Node::element("style");
        style.set_attribute(key, "");
        // Both nodes are fresh and detached.
        let _ = style.append_child(&Node::text(css));
        let _ = self.head.append_child(&style);

        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fragment_moves() -> Result<(), Error> {
        let document = Document::new();
        let fragment = document.parse_fragment("<div>a</div><span>b</span>")?;
        assert_eq!(fragment.children().len(), 2);

        document.append_child(document.body(), &fragment)?;
        assert!(fragment.children().is_empty());
        assert_eq!(
            document.body().inner_html(),
            "<div>a</div><span>b</span>"
        );

        let span = document.body().query("span").ok_or(Error::Detached)?;
        let em = document.parse_fragment("<em>c</em>")?;
        document.insert_before(&em, &span)?;
        assert_eq!(
            document.body().inner_html(),
            "<div>a</div><em>c</em><span>b</span>"
        );

        document.remove(&span);
        assert_eq!(document.body().inner_html(), "<div>a</div><em>c</em>");
        assert_eq!(span.parent(), None);

        Ok(())
    }

    #[test]
    fn test_errors() -> Result<(), Error> {
        let document = Document::new();
        let detached = Node::element("div");
        assert_eq!(
            document.insert_before(&Node::text("x"), &detached),
            Err(Error::Detached)
        );

        let child = Node::element("p");
        detached.append_child(&child)?;
        assert_eq!(child.append_child(&detached), Err(Error::Hierarchy));
        Ok(())
    }

    #[test]
    fn test_stylesheets() {
        let document = Document::new();
        assert!(document.inject_stylesheet("viewdoo-a", "div[viewdoo-a] { padding: 4px; }"));
        assert!(!document.inject_stylesheet("viewdoo-a", "ignored"));
        assert!(document.inject_stylesheet("viewdoo-b", "p[viewdoo-b] {}"));

        assert_eq!(
            document.stylesheets(),
            vec![
                (
                    "viewdoo-a".to_string(),
                    "div[viewdoo-a] { padding: 4px; }".to_string()
                ),
                ("viewdoo-b".to_string(), "p[viewdoo-b] {}".to_string()),
            ]
        );
        assert!(document
            .html()
            .starts_with("<!DOCTYPE html><html><head><style viewdoo-a=\"\">"));
    }

    #[test]
    fn test_attributes() -> Result<(), Error> {
        let document = Document::new();
        let fragment = document.parse_fragment(r#"<input type="text" disabled><br/>"#)?;
        let input = fragment.query("input").ok_or(Error::Detached)?;

        assert_eq!(input.attribute("type").as_deref(), Some("text"));
        assert_eq!(input.attribute("disabled").as_deref(), Some(""));

        input.set_attribute("value", "say \"hi\"");
        input.remove_attribute("disabled");
        assert_eq!(
            fragment.inner_html(),
            r#"<input type="text" value="say &quot;hi&quot;"><br>"#
        );
        Ok(())
    }
}
