//! Callable values.
//!
//! Functions are either lambdas written in the template language, e.g.
//! `increment = () => count++`, or native Rust closures installed by the host.
use super::super::{Context, Error, Value};
use super::Expression;
use crate::view::state::Scope;

use std::rc::Rc;

type Native = dyn Fn(&Scope, &[Value]) -> Result<Value, Error>;

#[derive(Clone)]
pub enum Function {
    Lambda {
        params: Vec<String>,
        body: Rc<Expression>,
        // Local bindings in effect where the lambda was created, e.g. loop variables.
        captured: Vec<(String, Value)>,
    },
    Native(Rc<Native>),
}

impl Function {
    /// Wrap a Rust closure. The closure receives the scope the
    /// function is called in, so it can read and write properties.
    ///
    /// ```
    /// # use viewdoo::view::{Function, Value};
    /// let double = Function::native(|_scope, args| match args {
    ///     [Value::Integer(n)] => Ok(Value::Integer(n * 2)),
    ///     _ => Ok(Value::Null),
    /// });
    /// ```
    pub fn native(f: impl Fn(&Scope, &[Value]) -> Result<Value, Error> + 'static) -> Self {
        Function::Native(Rc::new(f))
    }

    /// Invoke the function. Missing arguments are `null`, extra ones are ignored.
    pub fn call(&self, scope: &Scope, args: &[Value]) -> Result<Value, Error> {
        match self {
            Function::Lambda {
                params,
                body,
                captured,
            } => {
                let mut context = Context::with_locals(scope, captured.clone());
                for (i, param) in params.iter().enumerate() {
                    context.bind(param, args.get(i).cloned().unwrap_or(Value::Null));
                }
                body.evaluate(&mut context)
            }

            Function::Native(f) => f(scope, args),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Lambda { body: b1, .. }, Function::Lambda { body: b2, .. }) => {
                Rc::ptr_eq(b1, b2)
            }
            (Function::Native(f1), Function::Native(f2)) => Rc::ptr_eq(f1, f2),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Function::Lambda { params, .. } => write!(f, "Lambda({})", params.join(", ")),
            Function::Native(_) => write!(f, "Native"),
        }
    }
}
