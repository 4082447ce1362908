//! Live view instances and the mount/patch engine.
//!
//! Every render materializes the whole view into a fresh fragment. The first one
//! is handed to the caller with a marker appended after the view's nodes. Later
//! renders replace exactly the nodes of the previous render, right before the
//! marker, so anything else living in the same parent stays put.
use super::scheduler::{self, Discipline};
use super::state::Scope;
use super::surface::{Listener, Surface};
use super::template::{Context, Error, Function, Value};
use super::ViewDefinition;
use crate::safe_html;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{trace, warn};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

// The segment before a value ends inside an event handler attribute, e.g. `<button onclick="`.
// Names like `data-onclick` aren't handlers.
static EVENT_SLOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|\s)on([a-z][\w-]*)\s*=\s*["']?$"#).expect("event slot regex")
});

const LISTENER_PLACEHOLDER: &str = "viewdoo-listener:";

/// What the public state handle needs to know about its instance.
pub trait Mounted {
    /// Completed render passes.
    fn renders(&self) -> usize;
    /// A batched render is waiting for the next frame.
    fn pending(&self) -> bool;
}

/// A view mounted on a surface.
pub struct Instance<S: Surface> {
    definition: Rc<ViewDefinition>,
    surface: S,
    scope: Scope,
    discipline: Discipline,
    escape: bool,
    marker: RefCell<Option<S::Node>>,
    mounted: RefCell<Vec<S::Node>>,
    renders: Cell<usize>,
    pending: Cell<bool>,
    rendering: Cell<bool>,
    follow_up: Cell<bool>,
    following: Cell<bool>,
}

impl<S: Surface + 'static> Instance<S> {
    /// Create the instance and subscribe it to its scope. Nothing is rendered yet.
    ///
    /// With `escape`, interpolated values are HTML-escaped before parsing.
    pub fn new(
        definition: Rc<ViewDefinition>,
        surface: S,
        scope: Scope,
        discipline: Discipline,
        escape: bool,
    ) -> Rc<Self> {
        let instance = Rc::new(Self {
            definition,
            surface,
            scope: scope.clone(),
            discipline,
            escape,
            marker: RefCell::new(None),
            mounted: RefCell::new(vec![]),
            renders: Cell::new(0),
            pending: Cell::new(false),
            rendering: Cell::new(false),
            follow_up: Cell::new(false),
            following: Cell::new(false),
        });

        // The scope outlives the instance through closures stored in it,
        // so it can only hold a weak reference back.
        let weak = Rc::downgrade(&instance);
        scope.subscribe(move |name| match weak.upgrade() {
            Some(instance) => instance.dirty(name),
            None => Ok(()),
        });

        instance
    }

    /// Render the view, with a follow-up render if the state
    /// was written to while rendering.
    ///
    /// Returns the fragment on the first render, for the caller to insert.
    pub fn update(&self) -> Result<Option<S::Node>, Error> {
        let fragment = match self.render() {
            Ok(fragment) => fragment,
            Err(err) => {
                // The writes belonged to a render that never landed.
                self.follow_up.set(false);
                return Err(err);
            }
        };

        if self.follow_up.replace(false) {
            self.following.set(true);
            let result = self.render();
            self.following.set(false);
            result?;
        }

        Ok(fragment)
    }

    /// Nodes produced by the last successful render, marker excluded.
    pub fn nodes(&self) -> Vec<S::Node> {
        self.mounted.borrow().clone()
    }

    /// Node anchoring the view's output, once it has rendered.
    pub fn marker(&self) -> Option<S::Node> {
        self.marker.borrow().clone()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    fn dirty(self: Rc<Self>, name: &str) -> Result<(), Error> {
        // Writes made while rendering get one follow-up render, in the same pass.
        if self.following.get() {
            warn!(
                "\"{}\" written during a follow-up render, not rendering again",
                name
            );
            return Ok(());
        }

        if self.rendering.get() {
            trace!("\"{}\" written while rendering, queueing a follow-up", name);
            self.follow_up.set(true);
            return Ok(());
        }

        match self.discipline {
            Discipline::Sync => self.update().map(|_| ()),

            Discipline::Batched => {
                if !self.pending.replace(true) {
                    let weak = Rc::downgrade(&self);
                    scheduler::request_frame(move || match weak.upgrade() {
                        Some(instance) => {
                            instance.pending.set(false);
                            instance.update().map(|_| ())
                        }
                        None => Ok(()),
                    });
                }
                Ok(())
            }
        }
    }

    fn render(&self) -> Result<Option<S::Node>, Error> {
        self.rendering.set(true);
        let result = self.patch();
        self.rendering.set(false);

        if result.is_ok() {
            self.renders.set(self.renders.get() + 1);
            trace!("render #{} done", self.renders.get());
        }

        result
    }

    fn patch(&self) -> Result<Option<S::Node>, Error> {
        let rendered = self
            .definition
            .program
            .evaluate(&mut Context::new(&self.scope))?;

        let mut listeners: Vec<Function> = vec![];
        let html = rendered.html(|i, value| match value {
            Value::Function(function) if EVENT_SLOT.is_match(&rendered.segments[i]) => {
                listeners.push(function.clone());
                format!("{}{}", LISTENER_PLACEHOLDER, listeners.len() - 1)
            }
            value if self.escape => safe_html(&value.render()),
            value => value.render(),
        });

        let fragment = self.surface.parse_fragment(&html)?;
        self.stamp(&fragment, &listeners);

        if let Some(stylesheet) = &self.definition.stylesheet {
            if self.surface.inject_stylesheet(stylesheet.attr(), stylesheet.css()) {
                trace!("injected stylesheet \"{}\"", stylesheet.attr());
            }
        }

        let nodes = self.surface.child_nodes(&fragment);
        let marker = self.marker.borrow().clone();

        match marker {
            None => {
                let marker = self.surface.create_marker();
                self.surface.append_child(&fragment, &marker)?;
                *self.marker.borrow_mut() = Some(marker);
                *self.mounted.borrow_mut() = nodes;
                Ok(Some(fragment))
            }

            Some(marker) => {
                // Insert first: if it fails, the previous output stays.
                self.surface.insert_before(&fragment, &marker)?;
                let previous = std::mem::replace(&mut *self.mounted.borrow_mut(), nodes);
                for node in previous {
                    self.surface.remove(&node);
                }
                Ok(None)
            }
        }
    }

    // Scope attribute on every element, listeners bound in place of their placeholders.
    fn stamp(&self, node: &S::Node, listeners: &[Function]) {
        for child in self.surface.child_nodes(node) {
            if !self.surface.is_element(&child) {
                continue;
            }

            if let Some(stylesheet) = &self.definition.stylesheet {
                self.surface.set_attribute(&child, stylesheet.attr(), "");
            }

            for (name, value) in self.surface.attributes(&child) {
                let event = match name.strip_prefix("on") {
                    Some(event) if !event.is_empty() => event.to_lowercase(),
                    _ => continue,
                };

                let function = value
                    .strip_prefix(LISTENER_PLACEHOLDER)
                    .and_then(|index| index.parse::<usize>().ok())
                    .and_then(|index| listeners.get(index));

                if let Some(function) = function {
                    self.surface.remove_attribute(&child, &name);
                    self.surface.add_event_listener(
                        &child,
                        &event,
                        Listener::new(function.clone(), self.scope.clone()),
                    );
                }
            }

            self.stamp(&child, listeners);
        }
    }
}

impl<S: Surface + 'static> Mounted for Instance<S> {
    fn renders(&self) -> usize {
        self.renders.get()
    }

    fn pending(&self) -> bool {
        self.pending.get()
    }
}

impl<S: Surface> std::fmt::Debug for Instance<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("scope", &self.scope)
            .field("discipline", &self.discipline)
            .field("escape", &self.escape)
            .field("renders", &self.renders.get())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::super::surface::{Document, Node};
    use super::super::View;
    use super::*;

    fn instance(text: &str, scope: Scope) -> Result<Rc<Instance<Document>>, Error> {
        let view = View::compile(text)?;
        Ok(Instance::new(
            view.definition(),
            Document::new(),
            scope,
            Discipline::Sync,
            false,
        ))
    }

    fn native(calls: Rc<Cell<usize>>) -> Value {
        Value::Function(Function::native(move |_, _| {
            calls.set(calls.get() + 1);
            Ok(Value::Null)
        }))
    }

    #[test]
    fn test_first_render() -> Result<(), Error> {
        let scope = Scope::new();
        scope.set_public("name", Value::String("world".into()))?;
        let instance = instance("<p>hello {{ name }}</p>", scope)?;

        assert!(instance.marker().is_none());
        let fragment = instance.update()?.ok_or(Error::Runtime("no fragment".into()))?;

        // One paragraph, then the marker.
        assert_eq!(fragment.children().len(), 2);
        assert_eq!(fragment.inner_html(), "<p>hello world</p>");
        assert_eq!(instance.nodes().len(), 1);
        assert_eq!(instance.renders(), 1);
        assert!(instance.update()?.is_none());
        Ok(())
    }

    #[test]
    fn test_patch_keeps_siblings() -> Result<(), Error> {
        let scope = Scope::new();
        scope.set_public("n", Value::Integer(1))?;
        let instance = instance("<b>{{ n }}</b><i>{{ n }}</i>", scope.clone())?;

        let host = Node::element("div");
        host.append_child(&Node::element("header"))?;
        let fragment = instance.update()?.ok_or(Error::Runtime("no fragment".into()))?;
        host.append_child(&fragment)?;
        host.append_child(&Node::element("footer"))?;

        scope.set_public("n", Value::Integer(2))?;
        assert_eq!(
            host.inner_html(),
            "<header></header><b>2</b><i>2</i><footer></footer>"
        );
        assert_eq!(instance.renders(), 2);
        Ok(())
    }

    #[test]
    fn test_listener_placeholders() -> Result<(), Error> {
        let scope = Scope::new();
        scope.declare("clicked", Value::Integer(0));
        scope.declare(
            "click",
            Value::Function(Function::native(|scope, _| {
                let clicked = scope.get("clicked").unwrap_or(Value::Integer(0));
                scope.set("clicked", clicked.add(&Value::Integer(1)))?;
                Ok(Value::Null)
            })),
        );
        let instance = instance(
            r#"<button onClick="{{ click }}" title="{{ click }}">go</button>"#,
            scope.clone(),
        )?;
        let fragment = instance.update()?.ok_or(Error::Runtime("no fragment".into()))?;

        let button = fragment.query("button").ok_or(Error::Runtime("no button".into()))?;
        assert_eq!(button.attribute("onclick"), None);
        assert_eq!(button.attribute("title").as_deref(), Some(""));
        assert_eq!(button.listeners("click"), 1);

        assert_eq!(button.dispatch("click")?, 1);
        assert_eq!(scope.get("clicked"), Some(Value::Integer(1)));
        Ok(())
    }

    #[test]
    fn test_prefixed_attributes_not_handlers() -> Result<(), Error> {
        let scope = Scope::new();
        let calls = Rc::new(Cell::new(0));
        scope.declare("f", native(calls.clone()));
        let instance = instance(
            r#"<a onclick={{ f }}>x</a><b data-onclick="{{ f }}">y</b>"#,
            scope,
        )?;
        let fragment = instance.update()?.ok_or(Error::Runtime("no fragment".into()))?;

        let a = fragment.query("a").ok_or(Error::Runtime("no a".into()))?;
        assert_eq!(a.attribute("onclick"), None);
        assert_eq!(a.listeners("click"), 1);

        let b = fragment.query("b").ok_or(Error::Runtime("no b".into()))?;
        assert_eq!(b.attribute("data-onclick").as_deref(), Some(""));
        assert_eq!(b.listeners("click"), 0);
        assert!(!fragment.inner_html().contains(LISTENER_PLACEHOLDER));

        a.dispatch("click")?;
        assert_eq!(calls.get(), 1);
        Ok(())
    }

    #[test]
    fn test_failed_render_drops_follow_up() -> Result<(), Error> {
        let scope = Scope::new();
        scope.set_public("flag", Value::Integer(1))?;
        scope.set_public("d", Value::Integer(2))?;
        let instance = instance("{{ seen = flag }}{{ 10 / d }}", scope.clone())?;
        let _fragment = instance.update()?;
        assert_eq!(instance.renders(), 2);

        // `seen` changes, then the render fails.
        scope.declare("flag", Value::Integer(2));
        assert!(scope.set_public("d", Value::Integer(0)).is_err());
        assert_eq!(instance.renders(), 2);

        scope.declare("d", Value::Integer(5));
        instance.update()?;
        assert_eq!(instance.renders(), 3);
        Ok(())
    }

    #[test]
    fn test_detached_marker() -> Result<(), Error> {
        let scope = Scope::new();
        scope.set_public("n", Value::Integer(1))?;
        let instance = instance("<b>{{ n }}</b>", scope.clone())?;
        instance.update()?;

        if let Some(marker) = instance.marker() {
            marker.remove();
        }

        assert!(scope.set_public("n", Value::Integer(2)).is_err());
        assert_eq!(instance.renders(), 1);
        assert_eq!(instance.nodes()[0].outer_html(), "<b>1</b>");
        Ok(())
    }
}
