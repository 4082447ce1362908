//! Expression term, a single entity in an expression.
use super::super::{
    lexer::{Token, Value},
    Context, Error,
};

/// Expression term.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Constant(Value),
    Variable(String),
}

impl Term {
    /// Convert a token into a term. If the token isn't a term, return `None`.
    pub fn from_token(token: &Token) -> Option<Self> {
        Some(match token {
            Token::Variable(name) => Term::Variable(name.clone()),
            Token::Value(value) => Term::Constant(value.clone()),
            _ => return None,
        })
    }

    /// Create a constant term from a value. Constant terms are evaluated to the value.
    pub fn constant(value: Value) -> Self {
        Term::Constant(value)
    }

    /// Create a variable term. The term requires a context to be evaluated.
    pub fn variable(name: String) -> Self {
        Term::Variable(name)
    }

    /// Evaluate the term given the context.
    pub fn evaluate(&self, context: &Context) -> Result<Value, Error> {
        match self {
            Term::Constant(value) => Ok(value.clone()),
            Term::Variable(name) => context
                .get(name)
                .ok_or_else(|| Error::UndefinedVariable(name.clone())),
        }
    }

    /// The variable name. Constant terms don't have names.
    pub fn name(&self) -> &str {
        match self {
            Term::Variable(name) => name,
            Term::Constant(_) => "",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::view::state::Scope;
    use crate::view::template::Lexer;

    #[test]
    fn test_terms() -> Result<(), Error> {
        let scope = Scope::new();
        scope.set("variable", Value::String("test".into()))?;
        let context = Context::new(&scope);

        let tokens = Lexer::new("{{ 1 }}").tokens()?;
        let integer = Term::from_token(tokens[1].token_ref());
        assert_eq!(
            integer.expect("integer").evaluate(&context)?,
            Value::Integer(1)
        );

        let tokens = Lexer::new(r#"{{ "string" }}"#).tokens()?;
        let string = Term::from_token(tokens[1].token_ref());
        assert_eq!(
            string.expect("string").evaluate(&context)?,
            Value::String("string".into())
        );

        let tokens = Lexer::new("{{ variable }}").tokens()?;
        let variable = Term::from_token(tokens[1].token_ref()).expect("variable");
        assert_eq!(variable.name(), "variable");
        assert_eq!(variable.evaluate(&context)?, Value::String("test".into()));

        let missing = Term::variable("missing".into());
        assert!(matches!(
            missing.evaluate(&context),
            Err(Error::UndefinedVariable(_))
        ));

        Ok(())
    }
}
