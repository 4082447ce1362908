//! Reactive views.
//!
//! A view definition is a single text block with optional `<style>` and `<script>`
//! blocks, and markup with `{{ ... }}` tags. Compiling it produces a [`View`]: every
//! call to [`View::render`] or [`View::mount`] creates a live instance and returns its
//! [`State`]. Dirty writes to the state re-render the instance in place.
//!
//! # Example
//!
//! ```
//! # use viewdoo::view::*;
//! let view = compile(r#"<div class="{{ foo }}">{{ bar }}</div>"#).unwrap();
//! let document = Document::new();
//!
//! let state = view
//!     .mount(&document, document.body(), [("foo", "abc"), ("bar", "123")])
//!     .unwrap();
//! assert_eq!(document.body().inner_html(), r#"<div class="abc">123</div>"#);
//!
//! state.set("bar", 789).unwrap();
//! assert_eq!(document.body().inner_html(), r#"<div class="abc">789</div>"#);
//! ```
pub mod cache;
pub mod instance;
pub mod scheduler;
pub mod source;
pub mod state;
pub mod style;
pub mod surface;
pub mod template;

pub use cache::Views;
pub use instance::{Instance, Mounted};
pub use scheduler::Discipline;
pub use source::Source;
pub use state::{Props, Scope, State};
pub use style::{Stylesheet, Stylesheets};
pub use surface::{Document, Listener, Node, Surface};
pub use template::{Error, Function, Program, Rendered, Script, Template, ToValue, Value};

use crate::config::get_config;

use std::rc::Rc;

use tracing::debug;

/// Compile a view definition.
pub fn compile(text: &str) -> Result<View, Error> {
    View::compile(text)
}

/// Everything compiled from a view definition, shared by all its instances.
#[derive(Debug)]
pub struct ViewDefinition {
    source: Source,
    program: Program,
    script: Script,
    stylesheet: Option<Stylesheet>,
    escape: bool,
}

/// View factory.
#[derive(Debug, Clone)]
pub struct View {
    definition: Rc<ViewDefinition>,
    discipline: Option<Discipline>,
    escape: Option<bool>,
}

impl View {
    /// Compile a view definition. Every compiled view gets its own scope attribute,
    /// use [`View::cached`] to compile the same text only once.
    pub fn compile(text: &str) -> Result<Self, Error> {
        let source = Source::split(text);
        let program = Program::from_str(&source.markup)?;
        let script = match source.script {
            Some(ref script) => Script::from_str(script)?,
            None => Script::default(),
        };

        let config = get_config();
        let stylesheet = source
            .style
            .as_deref()
            .map(|style| Stylesheet::new(style, &config.general.scope_prefix));

        debug!(
            "Compiled view ({} statements{})",
            program.statements().len(),
            match stylesheet {
                Some(ref stylesheet) => format!(", scoped to \"{}\"", stylesheet.attr()),
                None => String::new(),
            }
        );

        Ok(Self {
            definition: Rc::new(ViewDefinition {
                source,
                program,
                script,
                stylesheet,
                escape: config.general.escape_values,
            }),
            discipline: None,
            escape: None,
        })
    }

    /// Compile a view definition through this thread's view cache.
    pub fn cached(text: &str) -> Result<Self, Error> {
        Views::with(|views| views.get(text))
    }

    /// Override the configured render discipline for instances created by this view.
    pub fn discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = Some(discipline);
        self
    }

    /// Override `escape_values` for instances created by this view.
    pub fn escape_values(mut self, escape: bool) -> Self {
        self.escape = Some(escape);
        self
    }

    /// Create an instance and render it into a detached fragment.
    ///
    /// The fragment holds the view's nodes followed by the instance's marker;
    /// insert it anywhere on the surface.
    pub fn render<S: Surface + Clone + 'static>(
        &self,
        surface: &S,
        props: impl TryInto<Props, Error = Error>,
    ) -> Result<(S::Node, State), Error> {
        self.instantiate_with(surface, props, |_| Ok(()))
    }

    /// Create an instance and append it to `host`.
    pub fn mount<S: Surface + Clone + 'static>(
        &self,
        surface: &S,
        host: &S::Node,
        props: impl TryInto<Props, Error = Error>,
    ) -> Result<State, Error> {
        let (fragment, state) = self.render(surface, props)?;
        surface.append_child(host, &fragment)?;
        Ok(state)
    }

    /// Create an instance, running `init` against its scope before the view's script,
    /// e.g. to install native functions.
    pub fn instantiate_with<S: Surface + Clone + 'static>(
        &self,
        surface: &S,
        props: impl TryInto<Props, Error = Error>,
        init: impl FnOnce(&Scope) -> Result<(), Error>,
    ) -> Result<(S::Node, State), Error> {
        let scope = Scope::from_props(props.try_into()?);
        init(&scope)?;
        self.definition.script.run(&scope)?;

        let discipline = self
            .discipline
            .unwrap_or(get_config().general.discipline);

        let instance = Instance::new(
            self.definition.clone(),
            surface.clone(),
            scope.clone(),
            discipline,
            self.escape.unwrap_or(self.definition.escape),
        );

        let fragment = instance
            .update()?
            .ok_or_else(|| Error::Runtime("instance rendered before mounting".into()))?;

        Ok((fragment, State::new(scope, instance)))
    }

    /// Attribute stamped on every element of this view, if the view has a style.
    pub fn scope_attr(&self) -> Option<&str> {
        self.definition.stylesheet.as_ref().map(|s| s.attr())
    }

    pub fn stylesheet(&self) -> Option<&Stylesheet> {
        self.definition.stylesheet.as_ref()
    }

    pub fn source(&self) -> &Source {
        &self.definition.source
    }

    pub fn program(&self) -> &Program {
        &self.definition.program
    }

    #[cfg(test)]
    pub(crate) fn definition(&self) -> Rc<ViewDefinition> {
        self.definition.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn body(document: &Document) -> String {
        document.body().inner_html()
    }

    #[test]
    fn test_class_and_text() -> Result<(), Error> {
        let view = compile(r#"<div class="{{foo}}">{{bar}}</div>"#)?;
        let document = Document::new();
        let state = view.mount(&document, document.body(), json!({"foo": "abc", "bar": 123}))?;

        assert_eq!(body(&document), r#"<div class="abc">123</div>"#);
        state.set("bar", 789)?;
        assert_eq!(body(&document), r#"<div class="abc">789</div>"#);
        assert_eq!(state.get("bar"), Some(Value::Integer(789)));
        assert_eq!(state.renders(), 2);
        Ok(())
    }

    #[test]
    fn test_each_and_if() -> Result<(), Error> {
        let view = compile(
            "<ul>{{each items as item, i}}<li>{{i}}: {{item}}</li>{{/each}}</ul>\
             {{if x===1}}A{{else if x===2}}B{{else}}C{{/if}}",
        )?;
        let document = Document::new();
        let state = view.mount(
            &document,
            document.body(),
            json!({"items": ["a", "b"], "x": 1}),
        )?;

        assert_eq!(body(&document), "<ul><li>0: a</li><li>1: b</li></ul>A");
        state.set("x", 2)?;
        assert!(body(&document).ends_with("</ul>B"));
        state.set("x", 99)?;
        assert!(body(&document).ends_with("</ul>C"));
        assert_eq!(document.body().query_all("li").len(), 2);
        Ok(())
    }

    #[test]
    fn test_unchanged_is_identical() -> Result<(), Error> {
        let view = compile("<p>{{ n }}</p>{{ items.join }}")?;
        let document = Document::new();
        let state = view.mount(&document, document.body(), json!({"n": 1, "items": [1, 2]}))?;

        let before = body(&document);
        state.set("items", vec![1, 2])?;
        assert_eq!(body(&document), before);
        Ok(())
    }

    #[test]
    fn test_dirty_writes() -> Result<(), Error> {
        let view = compile("{{ n }} {{ items.len }} {{ user.name }}")?;
        let (_fragment, state) = view.render(
            &Document::new(),
            json!({"n": 1, "items": [], "user": {"name": "a"}}),
        )?;
        assert_eq!(state.renders(), 1);

        // Unchanged primitives never render.
        state.set("n", 1)?;
        assert_eq!(state.renders(), 1);

        // Lists and hashes always do.
        state.set("items", Vec::<i64>::new())?;
        assert_eq!(state.renders(), 2);
        state.set("user", json!({"name": "a"}))?;
        assert_eq!(state.renders(), 3);
        state.update("items", |items| {
            if let Value::List(items) = items {
                items.push(Value::Integer(1));
            }
        })?;
        assert_eq!(state.renders(), 4);

        state.set("n", 2)?;
        assert_eq!(state.renders(), 5);
        Ok(())
    }

    #[test]
    fn test_batched() -> Result<(), Error> {
        let view = compile("<p>{{ a }} {{ b }}</p>")?.discipline(Discipline::Batched);
        let document = Document::new();
        let state = view.mount(&document, document.body(), json!({"a": 1, "b": 1}))?;
        assert_eq!(state.renders(), 1);

        state.set("a", 2)?;
        state.set("b", 3)?;
        state.set("a", 4)?;
        assert!(state.pending());
        assert_eq!(state.renders(), 1);
        assert_eq!(body(&document), "<p>1 1</p>");

        assert_eq!(scheduler::flush(), 1);
        assert!(!state.pending());
        assert_eq!(state.renders(), 2);
        assert_eq!(body(&document), "<p>4 3</p>");

        assert_eq!(scheduler::flush(), 0);
        assert_eq!(state.renders(), 2);
        Ok(())
    }

    #[test]
    fn test_batched_errors() -> Result<(), Error> {
        let errors = Rc::new(RefCell::new(vec![]));
        let e = errors.clone();
        scheduler::set_error_handler(move |err| e.borrow_mut().push(err.to_string()));

        let view = compile("<p>{{ 10 / d }}</p>")?.discipline(Discipline::Batched);
        let document = Document::new();
        let state = view.mount(&document, document.body(), [("d", 2)])?;

        state.set("d", 0)?;
        scheduler::flush();
        scheduler::reset_error_handler();

        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(body(&document), "<p>5</p>");
        Ok(())
    }

    #[test]
    fn test_failed_render_keeps_nodes() -> Result<(), Error> {
        let view = compile("<p>{{ 10 / d }}</p>")?;
        let document = Document::new();
        let state = view.mount(&document, document.body(), [("d", 2)])?;

        assert!(state.set("d", 0).is_err());
        assert_eq!(body(&document), "<p>5</p>");
        assert_eq!(state.renders(), 1);

        state.set("d", 5)?;
        assert_eq!(body(&document), "<p>2</p>");
        Ok(())
    }

    #[test]
    fn test_compile_errors() {
        for text in [
            "{{if x}}open",
            "{{/if}}",
            "{{each items}}{{/each}}",
            "{{if}}{{/if}}",
            "{{each items as item}}{{/if}}",
            "{{ x",
        ] {
            assert!(compile(text).is_err(), "{}", text);
        }
    }

    #[test]
    fn test_siblings_preserved() -> Result<(), Error> {
        let view = compile("<b>{{ n }}</b>\n<i>{{ n }}</i>")?;
        let document = Document::new();
        let host = document.body();
        host.append_child(&Node::element("header"))?;

        let state = view.mount(&document, host, [("n", 1)])?;
        host.append_child(&Node::element("footer"))?;

        state.set("n", 2)?;
        assert_eq!(
            body(&document),
            "<header></header><b>2</b>\n<i>2</i><footer></footer>"
        );
        Ok(())
    }

    #[test]
    fn test_shared_stylesheet() -> Result<(), Error> {
        let text = "<style>p { color: red; }</style><p>{{ n }}</p>";
        let view = compile(text)?;
        let document = Document::new();

        view.mount(&document, document.body(), [("n", 1)])?;
        view.mount(&document, document.body(), [("n", 2)])?;

        let attr = view.scope_attr().ok_or(Error::Runtime("no scope".into()))?;
        assert_eq!(document.stylesheets().len(), 1);
        assert_eq!(document.stylesheets()[0].0, attr);
        for p in document.body().query_all("p") {
            assert!(p.attribute(attr).is_some());
        }

        let other = compile(text)?;
        assert_ne!(other.scope_attr(), view.scope_attr());
        assert!(compile("<p></p>")?.scope_attr().is_none());
        Ok(())
    }

    #[test]
    fn test_events() -> Result<(), Error> {
        let view = compile(
            r#"
            <script>
                let count = 0
                const increment = () => count++
            </script>
            <button onclick="{{ increment }}">{{ count }}</button>
            "#,
        )?;
        let document = Document::new();
        let state = view.mount(&document, document.body(), &Props::new())?;

        let button = || document.body().query("button");
        assert_eq!(body(&document), "<button>0</button>");

        button()
            .ok_or(Error::Runtime("no button".into()))?
            .dispatch("click")?;
        assert_eq!(body(&document), "<button>1</button>");

        // Listeners are bound again on every render.
        button()
            .ok_or(Error::Runtime("no button".into()))?
            .dispatch("click")?;
        assert_eq!(body(&document), "<button>2</button>");

        // Script properties stay internal.
        assert!(state.get("count").is_none());
        assert!(state.keys().is_empty());
        Ok(())
    }

    #[test]
    fn test_increment_prop() -> Result<(), Error> {
        let view = compile(
            r#"
            <script>
                count = default(count, 0)
                const increment = () => count += step
            </script>
            <p>{{ count }}</p>
            "#,
        )?;
        let document = Document::new();
        let state = view.mount(&document, document.body(), json!({"count": 5, "step": 2}))?;
        assert_eq!(body(&document), "<p>5</p>");

        // Not public, not callable from the handle.
        assert!(state.call("increment", &[]).is_err());

        state.set("count", 10)?;
        assert_eq!(body(&document), "<p>10</p>");
        assert_eq!(state.to_json(), json!({"count": 10, "step": 2}));
        Ok(())
    }

    #[test]
    fn test_native_functions() -> Result<(), Error> {
        let view = compile("{{ double(n) }}")?;
        let document = Document::new();
        let (fragment, state) = view.instantiate_with(&document, [("n", 21)], |scope| {
            scope.set_public(
                "double",
                Value::Function(Function::native(|_, args| {
                    Ok(args[0].mul(&Value::Integer(2)))
                })),
            )?;
            Ok(())
        })?;
        document.body().append_child(&fragment)?;

        assert_eq!(body(&document), "42");
        assert_eq!(state.call("double", &[Value::Integer(4)])?, Value::Integer(8));
        state.set("n", 1)?;
        assert_eq!(body(&document), "2");
        Ok(())
    }

    #[test]
    fn test_reentrant_writes() -> Result<(), Error> {
        // The write during the first render queues exactly one follow-up.
        let view = compile("<p>{{ seen = n }}</p>")?;
        let (_fragment, state) = view.render(&Document::new(), [("n", 1)])?;
        assert_eq!(state.renders(), 2);

        state.set("n", 5)?;
        assert_eq!(state.renders(), 4);

        // A view that writes on every render doesn't loop.
        let view = compile("<p>{{ ticks += 1 }}</p>")?;
        let document = Document::new();
        let state = view.mount(&document, document.body(), [("ticks", 0)])?;
        assert_eq!(state.renders(), 2);
        assert_eq!(state.get("ticks"), Some(Value::Integer(2)));
        assert_eq!(body(&document), "<p>2</p>");
        Ok(())
    }

    #[test]
    fn test_escape_values() -> Result<(), Error> {
        let view = compile(r#"<p>{{ t }}</p><button onclick="{{ f }}">x</button>"#)?
            .escape_values(true);
        let document = Document::new();
        let clicks = Rc::new(RefCell::new(0));
        let c = clicks.clone();
        let (fragment, _state) = view.instantiate_with(&document, [("t", "<b>hi</b>")], |scope| {
            scope.declare(
                "f",
                Value::Function(Function::native(move |_, _| {
                    *c.borrow_mut() += 1;
                    Ok(Value::Null)
                })),
            );
            Ok(())
        })?;
        document.body().append_child(&fragment)?;

        let p = document.body().query("p").ok_or(Error::Runtime("no p".into()))?;
        assert!(p.query("b").is_none());
        assert_eq!(p.text_content(), "&lt;b&gt;hi&lt;/b&gt;");

        let button = document
            .body()
            .query("button")
            .ok_or(Error::Runtime("no button".into()))?;
        assert_eq!(button.attribute("onclick"), None);
        assert_eq!(button.listeners("click"), 1);
        button.dispatch("click")?;
        assert_eq!(*clicks.borrow(), 1);

        // Off, the same value is markup.
        let view = compile("<p>{{ t }}</p>")?.escape_values(false);
        let (fragment, _state) = view.render(&document, [("t", "<b>hi</b>")])?;
        assert!(fragment.query("b").is_some());
        Ok(())
    }

    #[test]
    fn test_empty_list_is_falsy() -> Result<(), Error> {
        let view = compile("{{if items}}Y{{else}}N{{/if}}")?;
        let document = Document::new();
        let state = view.mount(&document, document.body(), json!({"items": []}))?;
        assert_eq!(body(&document), "N");

        state.set("items", vec![1])?;
        assert_eq!(body(&document), "Y");
        Ok(())
    }

    #[test]
    fn test_batched_reentrant_writes() -> Result<(), Error> {
        let view = compile("<p>{{ n }} {{ t += 1 }}</p>")?.discipline(Discipline::Batched);
        let document = Document::new();
        let state = view.mount(&document, document.body(), [("n", 1), ("t", 0)])?;
        assert_eq!(state.renders(), 2);
        assert_eq!(state.get("t"), Some(Value::Integer(2)));
        assert!(!state.pending());
        assert_eq!(scheduler::pending(), 0);

        state.set("n", 2)?;
        assert!(state.pending());
        assert_eq!(state.renders(), 2);

        // One frame, one follow-up, then nothing left to do.
        assert_eq!(scheduler::flush(), 1);
        assert_eq!(state.renders(), 4);
        assert_eq!(state.get("t"), Some(Value::Integer(4)));
        assert_eq!(scheduler::flush(), 0);
        assert!(!state.pending());
        Ok(())
    }

    #[test]
    fn test_multiple_roots() -> Result<(), Error> {
        let view = compile("{{each items as item}}<li>{{ item }}</li>{{/each}}")?;
        let document = Document::new();
        let host = document.body();
        let state = view.mount(&document, host, json!({"items": [1, 2, 3]}))?;
        assert_eq!(host.query_all("li").len(), 3);

        state.set("items", vec![4])?;
        assert_eq!(body(&document), "<li>4</li>");

        state.set("items", Vec::<i64>::new())?;
        assert_eq!(body(&document), "");

        state.set("items", vec![5, 6])?;
        assert_eq!(body(&document), "<li>5</li><li>6</li>");
        Ok(())
    }
}
