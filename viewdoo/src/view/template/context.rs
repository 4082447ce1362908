//! Evaluation context.
//!
//! Expressions see the instance scope plus the local bindings introduced by
//! enclosing `each` tags and lambda parameters. Locals shadow scope properties.
use super::{Error, Value};
use crate::view::state::Scope;

pub struct Context<'a> {
    scope: &'a Scope,
    locals: Vec<(String, Value)>,
}

impl<'a> Context<'a> {
    pub fn new(scope: &'a Scope) -> Self {
        Self {
            scope,
            locals: vec![],
        }
    }

    pub fn with_locals(scope: &'a Scope, locals: Vec<(String, Value)>) -> Self {
        Self { scope, locals }
    }

    pub fn scope(&self) -> &'a Scope {
        self.scope
    }

    /// Look up a name: innermost local binding first, then the scope.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.locals
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .or_else(|| self.scope.get(name))
    }

    /// Introduce a local binding.
    pub fn bind(&mut self, name: &str, value: Value) {
        self.locals.push((name.to_string(), value));
    }

    pub fn depth(&self) -> usize {
        self.locals.len()
    }

    /// Drop local bindings introduced after `depth`.
    pub fn truncate(&mut self, depth: usize) {
        self.locals.truncate(depth);
    }

    pub fn locals(&self) -> &[(String, Value)] {
        &self.locals
    }

    /// Assign to a name. Locals are updated in place, anything else
    /// is written to the scope, which may trigger a render.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), Error> {
        if let Some((_, local)) = self.locals.iter_mut().rev().find(|(key, _)| key == name) {
            *local = value;
            return Ok(());
        }

        self.scope.set(name, value)?;
        Ok(())
    }
}
