//! Template statements: literal markup, interpolated values, loops and conditionals.
use super::super::{Context, Error, Token, TokenWithContext, Value};
use super::Expression;

use std::iter::Peekable;

/// A node of the compiled template.
#[derive(Debug, Clone)]
pub enum Statement {
    // Markup between tags, e.g. `<ul>`.
    Literal(String),

    // `{{ expression }}`
    Value(Expression),

    // `{{each items as item, i}} ... {{/each}}`
    Each {
        iterable: Expression,
        item: String,
        index: Option<String>,
        body: Vec<Statement>,
    },

    // `{{if a}} ... {{else if b}} ... {{else}} ... {{/if}}`
    If {
        branches: Vec<(Expression, Vec<Statement>)>,
        otherwise: Option<Vec<Statement>>,
    },
}

/// Output of a render: literal segments interleaved with values.
///
/// There is always one more segment than there are values.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub segments: Vec<String>,
    pub values: Vec<Value>,
}

impl Default for Rendered {
    fn default() -> Self {
        Self {
            segments: vec![String::new()],
            values: vec![],
        }
    }
}

impl Rendered {
    /// Append literal text to the last segment.
    pub fn literal(&mut self, text: &str) {
        if let Some(last) = self.segments.last_mut() {
            last.push_str(text);
        }
    }

    /// Append a value, and start a new segment after it.
    pub fn value(&mut self, value: Value) {
        self.values.push(value);
        self.segments.push(String::new());
    }

    /// Concatenate segments and values into markup.
    pub fn html(&self, mut render: impl FnMut(usize, &Value) -> String) -> String {
        let mut result = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            result.push_str(segment);
            if let Some(value) = self.values.get(i) {
                result.push_str(&render(i, value));
            }
        }
        result
    }
}

impl std::fmt::Display for Rendered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.html(|_, value| value.render()))
    }
}

// Tags that end a block.
enum Close {
    Else,
    ElseIf(Expression),
    EndEach,
    EndIf,
}

enum Parsed {
    Statement(Statement),
    Close(Close, TokenWithContext),
}

impl Statement {
    /// Evaluate the statement, appending its output.
    pub fn evaluate(&self, context: &mut Context, output: &mut Rendered) -> Result<(), Error> {
        match self {
            Statement::Literal(text) => output.literal(text),

            Statement::Value(expression) => {
                let value = expression.evaluate(context)?;
                output.value(value);
            }

            Statement::Each {
                iterable,
                item,
                index,
                body,
            } => {
                let items = iterable.evaluate(context)?.iterate()?;
                let depth = context.depth();

                for (i, value) in items.into_iter().enumerate() {
                    context.bind(item, value);
                    if let Some(index) = index {
                        context.bind(index, Value::Integer(i as i64));
                    }

                    let result = Self::evaluate_body(body, context, output);
                    context.truncate(depth);
                    result?;
                }
            }

            Statement::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if condition.evaluate(context)?.truthy() {
                        return Self::evaluate_body(body, context, output);
                    }
                }

                if let Some(otherwise) = otherwise {
                    Self::evaluate_body(otherwise, context, output)?;
                }
            }
        }

        Ok(())
    }

    fn evaluate_body(
        body: &[Statement],
        context: &mut Context,
        output: &mut Rendered,
    ) -> Result<(), Error> {
        for statement in body {
            statement.evaluate(context, output)?;
        }
        Ok(())
    }

    /// Parse a top-level statement. Closing tags without a matching
    /// opening tag are an error.
    pub fn parse(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Self, Error> {
        match Self::next(iter)? {
            Parsed::Statement(statement) => Ok(statement),
            Parsed::Close(_, token) => Err(Error::UnexpectedClose(token)),
        }
    }

    fn next(iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>) -> Result<Parsed, Error> {
        let next = iter.next().ok_or(Error::Eof("statement"))?;

        match next.token() {
            Token::Text(text) => Ok(Parsed::Statement(Statement::Literal(text))),

            Token::BlockStart => {
                let keyword = iter.peek().ok_or(Error::Eof("tag"))?.clone();

                match keyword.token() {
                    Token::Each => {
                        let _ = iter.next();
                        let statement = Self::each(keyword, iter)?;
                        Ok(Parsed::Statement(statement))
                    }

                    Token::If => {
                        let _ = iter.next();
                        let statement = Self::conditional(keyword, iter)?;
                        Ok(Parsed::Statement(statement))
                    }

                    Token::Else => {
                        let _ = iter.next();
                        if iter.peek().map(|t| t.token_ref()) == Some(&Token::If) {
                            let _ = iter.next();
                            let condition = Self::condition(&keyword, iter)?;
                            Ok(Parsed::Close(Close::ElseIf(condition), keyword))
                        } else {
                            Self::block_end(iter)?;
                            Ok(Parsed::Close(Close::Else, keyword))
                        }
                    }

                    Token::EndEach => {
                        let _ = iter.next();
                        Self::block_end(iter)?;
                        Ok(Parsed::Close(Close::EndEach, keyword))
                    }

                    Token::EndIf => {
                        let _ = iter.next();
                        Self::block_end(iter)?;
                        Ok(Parsed::Close(Close::EndIf, keyword))
                    }

                    Token::BlockEnd => Err(Error::ExpressionSyntax(keyword)),

                    _ => {
                        let expression = Expression::parse(iter)?;
                        Self::block_end(iter)?;
                        Ok(Parsed::Statement(Statement::Value(expression)))
                    }
                }
            }

            _ => Err(Error::Syntax(next)),
        }
    }

    // `each <expr> as <name>[, <index>]}}`, then the body up to `{{/each}}`.
    fn each(
        keyword: TokenWithContext,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Self, Error> {
        if iter.peek().map(|t| t.token_ref()) == Some(&Token::BlockEnd) {
            return Err(Error::Syntax(keyword));
        }

        let iterable = Expression::parse(iter)?;

        let as_ = iter.next().ok_or(Error::Eof("each"))?;
        if as_.token_ref() != &Token::As {
            return Err(Error::Syntax(as_));
        }

        let item = Self::binding(iter)?;
        let index = match iter.peek().map(|t| t.token_ref()) {
            Some(Token::Comma) => {
                let _ = iter.next();
                Some(Self::binding(iter)?)
            }
            _ => None,
        };
        Self::block_end(iter)?;

        let mut body = vec![];
        loop {
            match iter.peek() {
                Some(_) => (),
                None => return Err(Error::Unclosed(keyword)),
            }

            match Self::next(iter)? {
                Parsed::Statement(statement) => body.push(statement),
                Parsed::Close(Close::EndEach, _) => break,
                Parsed::Close(_, token) => return Err(Error::UnexpectedClose(token)),
            }
        }

        Ok(Statement::Each {
            iterable,
            item,
            index,
            body,
        })
    }

    // `if <expr>}}`, branches, up to `{{/if}}`.
    fn conditional(
        keyword: TokenWithContext,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Self, Error> {
        let mut branches = vec![];
        let mut otherwise: Option<Vec<Statement>> = None;

        let mut condition = Some(Self::condition(&keyword, iter)?);
        let mut body = vec![];

        loop {
            match iter.peek() {
                Some(_) => (),
                None => return Err(Error::Unclosed(keyword)),
            }

            match Self::next(iter)? {
                Parsed::Statement(statement) => body.push(statement),

                Parsed::Close(Close::ElseIf(next), token) => match condition.take() {
                    Some(previous) => {
                        branches.push((previous, std::mem::take(&mut body)));
                        condition = Some(next);
                    }
                    // `else if` after `else`.
                    None => return Err(Error::UnexpectedClose(token)),
                },

                Parsed::Close(Close::Else, token) => match condition.take() {
                    Some(previous) => {
                        branches.push((previous, std::mem::take(&mut body)));
                    }
                    None => return Err(Error::UnexpectedClose(token)),
                },

                Parsed::Close(Close::EndIf, _) => {
                    match condition.take() {
                        Some(previous) => branches.push((previous, body)),
                        None => otherwise = Some(body),
                    }
                    break;
                }

                Parsed::Close(Close::EndEach, token) => {
                    return Err(Error::UnexpectedClose(token))
                }
            }
        }

        Ok(Statement::If {
            branches,
            otherwise,
        })
    }

    fn condition(
        keyword: &TokenWithContext,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Expression, Error> {
        if iter.peek().map(|t| t.token_ref()) == Some(&Token::BlockEnd) {
            return Err(Error::Syntax(keyword.clone()));
        }
        let condition = Expression::parse(iter)?;
        Self::block_end(iter)?;
        Ok(condition)
    }

    fn binding(iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>) -> Result<String, Error> {
        let name = iter.next().ok_or(Error::Eof("each binding"))?;
        match name.token() {
            Token::Variable(name) => Ok(name),
            _ => Err(Error::Syntax(name)),
        }
    }

    fn block_end(iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>) -> Result<(), Error> {
        let next = iter.next().ok_or(Error::Eof("block end"))?;
        match next.token() {
            Token::BlockEnd => Ok(()),
            _ => Err(Error::ExpressionSyntax(next)),
        }
    }
}
