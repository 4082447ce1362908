//! Reactive state.
//!
//! A [`Scope`] is the property bag expressions read from and write to. Every write
//! goes through [`Scope::set`], which decides if the write is dirty and notifies the
//! subscribed listeners, i.e. the instance that needs to re-render.
//!
//! [`State`] is the handle returned to the caller of a view. It only exposes
//! public properties: the ones passed in as props, or written through the handle.
//! Properties declared by a view's `<script>` stay internal.
use super::instance::Mounted;
use super::template::{Error, ToValue, Value};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

type Listener = Rc<dyn Fn(&str) -> Result<(), Error>>;

struct Property {
    value: Value,
    public: bool,
}

#[derive(Default)]
struct Inner {
    values: RefCell<HashMap<String, Property>>,
    // Public property names, in the order they first appeared.
    order: RefCell<Vec<String>>,
    listeners: RefCell<Vec<Listener>>,
}

/// Observable property bag shared by an instance's script, render program
/// and public handle.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<Inner>,
}

/// A write is dirty if the value changed, or if the new value is a list, hash or function.
/// Those can be mutated in place, so equality says nothing about whether the view is stale.
pub fn is_dirty(prev: Option<&Value>, next: &Value) -> bool {
    match prev {
        Some(prev) => next.is_composite() || prev != next,
        None => true,
    }
}

impl Scope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope with all props public.
    pub fn from_props(props: Props) -> Self {
        let scope = Self::new();
        {
            let mut values = scope.inner.values.borrow_mut();
            let mut order = scope.inner.order.borrow_mut();
            for (key, value) in props.values {
                if values
                    .insert(
                        key.clone(),
                        Property {
                            value,
                            public: true,
                        },
                    )
                    .is_none()
                {
                    order.push(key);
                }
            }
        }
        scope
    }

    /// Get a property, public or internal.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner
            .values
            .borrow()
            .get(name)
            .map(|property| property.value.clone())
    }

    /// Is the property defined, public or internal.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.values.borrow().contains_key(name)
    }

    /// Is the property visible on the public handle.
    pub fn is_public(&self, name: &str) -> bool {
        self.inner
            .values
            .borrow()
            .get(name)
            .map(|property| property.public)
            .unwrap_or(false)
    }

    /// Write a property. New properties are internal.
    ///
    /// Returns whether the write was dirty. Listener errors, e.g. a failed
    /// synchronous render, are returned to the caller.
    pub fn set(&self, name: &str, value: Value) -> Result<bool, Error> {
        self.write(name, value, false)
    }

    /// Write a property and make it visible on the public handle.
    pub fn set_public(&self, name: &str, value: Value) -> Result<bool, Error> {
        self.write(name, value, true)
    }

    /// Define an internal property without notifying anyone.
    pub fn declare(&self, name: &str, value: Value) {
        let mut values = self.inner.values.borrow_mut();
        match values.get_mut(name) {
            Some(property) => property.value = value,
            None => {
                values.insert(
                    name.to_string(),
                    Property {
                        value,
                        public: false,
                    },
                );
            }
        }
    }

    /// Mutate a property in place. Always dirty.
    pub fn update(&self, name: &str, f: impl FnOnce(&mut Value)) -> Result<(), Error> {
        {
            let mut values = self.inner.values.borrow_mut();
            let property = values
                .get_mut(name)
                .ok_or_else(|| Error::UndefinedVariable(name.to_string()))?;
            f(&mut property.value);
        }

        self.notify(name)
    }

    /// Public property names, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.order.borrow().clone()
    }

    /// Call `listener` with the property name after every dirty write.
    pub fn subscribe(&self, listener: impl Fn(&str) -> Result<(), Error> + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn write(&self, name: &str, value: Value, public: bool) -> Result<bool, Error> {
        let dirty = {
            let mut values = self.inner.values.borrow_mut();
            match values.get_mut(name) {
                Some(property) => {
                    let dirty = is_dirty(Some(&property.value), &value);
                    property.value = value;
                    if public && !property.public {
                        property.public = true;
                        self.inner.order.borrow_mut().push(name.to_string());
                    }
                    dirty
                }
                None => {
                    values.insert(name.to_string(), Property { value, public });
                    if public {
                        self.inner.order.borrow_mut().push(name.to_string());
                    }
                    true
                }
            }
        };

        if dirty {
            self.notify(name)?;
        }

        Ok(dirty)
    }

    fn notify(&self, name: &str) -> Result<(), Error> {
        // Listeners can write to the scope themselves, don't hold the borrow.
        let listeners = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(name)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values = self.inner.values.borrow();
        let mut map = f.debug_map();
        for (key, property) in values.iter() {
            map.entry(key, &property.value);
        }
        map.finish()
    }
}

/// Initial properties of an instance.
#[derive(Debug, Default, Clone)]
pub struct Props {
    values: Vec<(String, Value)>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl ToValue) -> Result<&mut Self, Error> {
        let value = value.to_value()?;
        match self.values.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((key.to_string(), value)),
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TryFrom<&Props> for Props {
    type Error = Error;

    fn try_from(props: &Props) -> Result<Props, Self::Error> {
        Ok(props.clone())
    }
}

impl<V: ToValue, const N: usize> TryFrom<[(&str, V); N]> for Props {
    type Error = Error;

    fn try_from(values: [(&str, V); N]) -> Result<Props, Self::Error> {
        let mut props = Props::new();
        for (key, value) in values {
            props.set(key, value)?;
        }
        Ok(props)
    }
}

impl<V: ToValue> TryFrom<Vec<(&str, V)>> for Props {
    type Error = Error;

    fn try_from(values: Vec<(&str, V)>) -> Result<Props, Self::Error> {
        let mut props = Props::new();
        for (key, value) in values {
            props.set(key, value)?;
        }
        Ok(props)
    }
}

impl<V: ToValue> TryFrom<HashMap<String, V>> for Props {
    type Error = Error;

    fn try_from(values: HashMap<String, V>) -> Result<Props, Self::Error> {
        let mut keys = values.keys().cloned().collect::<Vec<_>>();
        keys.sort();

        let mut props = Props::new();
        for key in keys {
            if let Some(value) = values.get(&key) {
                props.set(&key, value.to_value()?)?;
            }
        }
        Ok(props)
    }
}

impl TryFrom<serde_json::Value> for Props {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Props, Self::Error> {
        match value {
            serde_json::Value::Object(map) => {
                let mut props = Props::new();
                for (key, value) in map {
                    props.set(&key, Value::from(value))?;
                }
                Ok(props)
            }
            serde_json::Value::Null => Ok(Props::new()),
            _ => Err(Error::Runtime("props must be a JSON object".into())),
        }
    }
}

/// Public handle to a live instance.
///
/// Reading and writing properties through the handle works like ordinary fields:
/// writes re-render the instance when they're dirty. The instance stays alive
/// as long as at least one handle does.
#[derive(Clone)]
pub struct State {
    scope: Scope,
    instance: Rc<dyn Mounted>,
}

impl State {
    pub(crate) fn new(scope: Scope, instance: Rc<dyn Mounted>) -> Self {
        Self { scope, instance }
    }

    /// Get a public property.
    pub fn get(&self, name: &str) -> Option<Value> {
        if self.scope.is_public(name) {
            self.scope.get(name)
        } else {
            None
        }
    }

    /// Write a property. Dirty writes render the instance, synchronously
    /// or on the next frame depending on the view's discipline.
    pub fn set(&self, name: &str, value: impl ToValue) -> Result<(), Error> {
        self.scope.set_public(name, value.to_value()?)?;
        Ok(())
    }

    /// Mutate a property in place, e.g. push into a list. Always renders.
    pub fn update(&self, name: &str, f: impl FnOnce(&mut Value)) -> Result<(), Error> {
        if !self.scope.is_public(name) {
            return Err(Error::UndefinedVariable(name.to_string()));
        }
        self.scope.update(name, f)
    }

    /// Call a function stored in the state, e.g. an `increment` handler
    /// defined by the view's script.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        match self.get(name) {
            Some(Value::Function(function)) => function.call(&self.scope, args),
            Some(_) => Err(Error::NotCallable(name.to_string())),
            None => Err(Error::UndefinedVariable(name.to_string())),
        }
    }

    /// Public property names.
    pub fn keys(&self) -> Vec<String> {
        self.scope.keys()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scope.is_public(name)
    }

    /// Public properties as a JSON object. Functions are `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for key in self.keys() {
            if let Some(value) = self.scope.get(&key) {
                map.insert(key, serde_json::Value::from(&value));
            }
        }
        serde_json::Value::Object(map)
    }

    /// Number of completed render passes, including the initial one.
    pub fn renders(&self) -> usize {
        self.instance.renders()
    }

    /// Is a batched render waiting for the next frame.
    pub fn pending(&self) -> bool {
        self.instance.pending()
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "State({})", self.to_json())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    fn counting(scope: &Scope) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        scope.subscribe(move |_| {
            c.set(c.get() + 1);
            Ok(())
        });
        count
    }

    #[test]
    fn test_primitive_writes() -> Result<(), Error> {
        let scope = Scope::from_props(Props::try_from([("count", 1)])?);
        let notified = counting(&scope);

        assert!(!scope.set("count", Value::Integer(1))?);
        assert_eq!(notified.get(), 0);

        assert!(scope.set("count", Value::Integer(2))?);
        assert_eq!(notified.get(), 1);

        assert!(!scope.set("count", Value::Float(2.0))?);
        assert_eq!(notified.get(), 1);

        Ok(())
    }

    #[test]
    fn test_composite_writes() -> Result<(), Error> {
        let scope = Scope::from_props(Props::try_from([("items", vec![1, 2])])?);
        let notified = counting(&scope);

        // Same contents, still dirty.
        assert!(scope.set("items", vec![1, 2].to_value()?)?);
        assert!(scope.set("items", vec![3].to_value()?)?);
        assert_eq!(notified.get(), 2);

        scope.update("items", |items| {
            if let Value::List(list) = items {
                list.push(Value::Integer(4));
            }
        })?;
        assert_eq!(notified.get(), 3);
        assert_eq!(scope.get("items"), Some(vec![3, 4].to_value()?));

        Ok(())
    }

    #[test]
    fn test_visibility() -> Result<(), Error> {
        let scope = Scope::from_props(Props::try_from(serde_json::json!({"foo": 1, "bar": 2}))?);
        scope.declare("baz", Value::Integer(3));
        scope.set("qux", Value::Integer(4))?;

        assert_eq!(scope.keys(), vec!["bar".to_string(), "foo".to_string()]);
        assert!(scope.contains("baz"));
        assert!(!scope.is_public("baz"));
        assert!(!scope.is_public("qux"));

        scope.set_public("qux", Value::Integer(5))?;
        assert!(scope.is_public("qux"));
        assert_eq!(scope.keys().last().map(|k| k.as_str()), Some("qux"));

        Ok(())
    }

    #[test]
    fn test_listener_error() -> Result<(), Error> {
        let scope = Scope::from_props(Props::try_from([("a", 1)])?);
        scope.subscribe(|name| Err(Error::Runtime(format!("render failed on {}", name))));

        assert!(scope.set("a", Value::Integer(2)).is_err());
        // The write itself happened.
        assert_eq!(scope.get("a"), Some(Value::Integer(2)));

        Ok(())
    }

    #[test]
    fn test_props() -> Result<(), Error> {
        let mut props = Props::new();
        props.set("a", 1)?.set("b", "two")?.set("a", 3)?;
        let scope = Scope::from_props(props);
        assert_eq!(scope.get("a"), Some(Value::Integer(3)));
        assert_eq!(scope.keys(), vec!["a".to_string(), "b".to_string()]);

        assert!(Props::try_from(serde_json::json!([1, 2])).is_err());
        Ok(())
    }
}
