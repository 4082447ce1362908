//! Initializer logic from a view's `<script>` block.
//!
//! ```text
//! const step = 2
//! let increment = () => count += step
//! count = default(count, 0)
//! ```
use super::super::{Context, Error, Lexer, Token, TokenWithContext, Value};
use super::Expression;
use crate::view::state::Scope;

use std::iter::Peekable;

#[derive(Debug, Clone)]
enum Line {
    // `const name = expression`, `let name`
    Declare {
        name: String,
        value: Option<Expression>,
    },
    Expression(Expression),
}

/// Compiled script, run once per instance before its first render.
#[derive(Debug, Clone, Default)]
pub struct Script {
    lines: Vec<Line>,
}

impl Script {
    /// Compile the script from source.
    pub fn from_str(source: &str) -> Result<Self, Error> {
        let tokens = Lexer::script(source).tokens()?;
        Self::parse(tokens)
    }

    pub fn parse(tokens: Vec<TokenWithContext>) -> Result<Self, Error> {
        let mut iter = tokens.into_iter().peekable();
        let mut lines = vec![];

        loop {
            Self::skip_separators(&mut iter);
            if iter.peek().is_none() {
                break;
            }

            lines.push(Self::line(&mut iter)?);

            match iter.next() {
                None => break,
                Some(next) => match next.token_ref() {
                    Token::Semicolon | Token::Newline => (),
                    _ => return Err(Error::ExpressionSyntax(next)),
                },
            }
        }

        Ok(Script { lines })
    }

    fn line(iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>) -> Result<Line, Error> {
        if iter.peek().map(|t| t.token_ref()) != Some(&Token::Declare) {
            return Ok(Line::Expression(Expression::parse(iter)?));
        }
        let _ = iter.next();

        let name = iter.next().ok_or(Error::Eof("declaration"))?;
        let name = match name.token() {
            Token::Variable(name) => name,
            _ => return Err(Error::Syntax(name)),
        };

        let value = match iter.peek().map(|t| t.token_ref()) {
            Some(Token::Assign) => {
                let _ = iter.next();
                Some(Expression::parse(iter)?)
            }
            _ => None,
        };

        Ok(Line::Declare { name, value })
    }

    fn skip_separators(iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>) {
        while matches!(
            iter.peek().map(|t| t.token_ref()),
            Some(Token::Semicolon) | Some(Token::Newline)
        ) {
            let _ = iter.next();
        }
    }

    /// Run the script against the scope. Declared names become internal properties.
    pub fn run(&self, scope: &Scope) -> Result<(), Error> {
        let mut context = Context::new(scope);

        for line in &self.lines {
            match line {
                Line::Declare { name, value } => {
                    let value = match value {
                        Some(value) => value.evaluate(&mut context)?,
                        None => Value::Null,
                    };
                    scope.declare(name, value);
                }

                Line::Expression(expression) => {
                    expression.evaluate(&mut context)?;
                }
            }
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::view::template::ToValue;

    #[test]
    fn test_script() -> Result<(), Error> {
        let script = Script::from_str(
            r#"
            // Counter.
            const step = 2
            let label;
            var increment = () => count += step
            count = default(count, 10); increment()
            "#,
        )?;

        let scope = Scope::new();
        script.run(&scope)?;

        assert_eq!(scope.get("count"), Some(Value::Integer(12)));
        assert_eq!(scope.get("label"), Some(Value::Null));
        assert!(!scope.is_public("step"));
        assert!(matches!(scope.get("increment"), Some(Value::Function(_))));

        Ok(())
    }

    #[test]
    fn test_script_uses_props() -> Result<(), Error> {
        let scope = Scope::new();
        scope.set_public("items", vec![1, 2, 3].to_value()?)?;

        Script::from_str("const total = items.sum\nconst doubled = items.map(x => x * 2)")?
            .run(&scope)?;

        assert_eq!(scope.get("total"), Some(Value::Integer(6)));
        assert_eq!(scope.get("doubled"), Some(vec![2, 4, 6].to_value()?));
        Ok(())
    }

    #[test]
    fn test_script_errors() {
        assert!(Script::from_str("const = 5").is_err());
        assert!(Script::from_str("a = 1 b = 2").is_err());
        assert!(Script::from_str("").map(|s| s.is_empty()).unwrap_or(false));

        let scope = Scope::new();
        let script = Script::from_str("missing()");
        assert!(script.is_ok());
        assert!(script.map(|s| s.run(&scope).is_err()).unwrap_or(false));
    }
}
