use super::{
    super::lexer::{Lexer, Token, TokenWithContext, Value},
    super::Context,
    super::Error,
    Function, Op, Term,
};
use crate::view::state::Scope;

use std::iter::{Iterator, Peekable};
use std::rc::Rc;

/// An expression, like `5 == 6` or `items.len > 0`,
/// which when evaluated produces a single value, e.g. `true`.
#[derive(Debug, Clone)]
pub enum Expression {
    // Standard `5 + 6`-style expression.
    // It's recursive, so you can have something like `(5 + 6) / (1 - 5)`.
    Binary {
        left: Box<Expression>,
        op: Op,
        right: Box<Expression>,
    },

    Unary {
        op: Op,
        operand: Box<Expression>,
    },

    // Base case for recursive expression parsing, which evaluates to the value
    // of the term, e.g. `5` evaluates to `5` or `variable_name` evaluates to whatever
    // the variable is set to in the context.
    Term {
        term: Term,
    },

    // `[1, 2, variable, "hello world"]`
    List {
        terms: Vec<Expression>,
    },

    // `{name: "bob", age: 5}`
    Hash {
        entries: Vec<(String, Expression)>,
    },

    // `user.name`, `items[0]`, `name.upcase` or `items.join(", ")`.
    // Hash keys win over methods of the same name.
    Member {
        term: Box<Expression>,
        name: Box<Expression>,
        args: Option<Vec<Expression>>,
    },

    // `increment()` or `default(name, "guest")`.
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },

    // `done ? "yes" : "no"`
    Ternary {
        condition: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },

    // `(a, b) => a + b`
    Lambda {
        params: Vec<String>,
        body: Rc<Expression>,
    },

    // `count = 5` or `count += 5`.
    Assign {
        name: String,
        op: Option<Op>,
        value: Box<Expression>,
    },

    // `count++`, `--count`.
    Update {
        name: String,
        op: Op,
        prefix: bool,
    },
}

impl Expression {
    /// Create new constant expression (term).
    pub fn constant(value: Value) -> Self {
        Self::Term {
            term: Term::constant(value),
        }
    }

    /// Create new variable expression (term).
    pub fn variable(variable: String) -> Self {
        Self::Term {
            term: Term::variable(variable),
        }
    }

    /// Evaluate the expression to a value given the context.
    pub fn evaluate(&self, context: &mut Context) -> Result<Value, Error> {
        match self {
            Expression::Term { term } => match term.evaluate(context) {
                Ok(value) => Ok(value),
                Err(Error::UndefinedVariable(name)) => {
                    // Global functions can be called without parentheses.
                    match Value::Interpreter.call(term.name(), &[], context.scope()) {
                        Ok(value) => Ok(value),
                        Err(Error::UnknownMethod(_, _)) => Err(Error::UndefinedVariable(name)),
                        Err(err) => Err(err),
                    }
                }
                Err(err) => Err(err),
            },

            Expression::Binary {
                left,
                op: Op::And,
                right,
            } => {
                let left = left.evaluate(context)?;
                if left.truthy() {
                    right.evaluate(context)
                } else {
                    Ok(left)
                }
            }

            Expression::Binary {
                left,
                op: Op::Or,
                right,
            } => {
                let left = left.evaluate(context)?;
                if left.truthy() {
                    Ok(left)
                } else {
                    right.evaluate(context)
                }
            }

            Expression::Binary { left, op, right } => {
                let left = left.evaluate(context)?;
                let right = right.evaluate(context)?;
                op.evaluate_binary(&left, &right)
            }

            Expression::Unary { op, operand } => {
                let operand = operand.evaluate(context)?;
                op.evaluate_unary(&operand)
            }

            Expression::List { terms } => {
                let mut list = vec![];
                for term in terms {
                    list.push(term.evaluate(context)?);
                }
                Ok(Value::List(list))
            }

            Expression::Hash { entries } => {
                let mut hash = std::collections::HashMap::new();
                for (key, value) in entries {
                    hash.insert(key.clone(), value.evaluate(context)?);
                }
                Ok(Value::Hash(hash))
            }

            Expression::Member { term, name, args } => {
                let value = term.evaluate(context)?;
                let name = match name.evaluate(context)? {
                    Value::String(name) => name,
                    Value::Integer(index) => index.to_string(),
                    name => {
                        return Err(Error::Runtime(format!(
                            "member name should be a string, got {} instead",
                            name
                        )))
                    }
                };

                match args {
                    None => match value.field(&name) {
                        Some(field) => Ok(field),
                        None => value.call(&name, &[], context.scope()),
                    },

                    Some(args) => {
                        let args = Self::arguments(args, context, false)?;
                        match value.field(&name) {
                            Some(Value::Function(function)) => {
                                function.call(context.scope(), &args)
                            }
                            Some(_) => Err(Error::NotCallable(name)),
                            None => value.call(&name, &args, context.scope()),
                        }
                    }
                }
            }

            Expression::Call { callee, args } => {
                if let Expression::Term {
                    term: Term::Variable(name),
                } = callee.as_ref()
                {
                    if context.get(name).is_none() {
                        // Allow to pass undefined variables to `default`.
                        // Typically that's not great, but the purpose of this function
                        // is to catch such cases and replace with a default value.
                        let allow_undefined = name == "default";
                        let args = Self::arguments(args, context, allow_undefined)?;
                        return match Value::Interpreter.call(name, &args, context.scope()) {
                            Err(Error::UnknownMethod(_, _)) => {
                                Err(Error::UndefinedVariable(name.clone()))
                            }
                            result => result,
                        };
                    }
                }

                match callee.evaluate(context)? {
                    Value::Function(function) => {
                        let args = Self::arguments(args, context, false)?;
                        function.call(context.scope(), &args)
                    }
                    value => Err(Error::NotCallable(value.to_string())),
                }
            }

            Expression::Ternary {
                condition,
                then,
                otherwise,
            } => {
                if condition.evaluate(context)?.truthy() {
                    then.evaluate(context)
                } else {
                    otherwise.evaluate(context)
                }
            }

            Expression::Lambda { params, body } => Ok(Value::Function(Function::Lambda {
                params: params.clone(),
                body: body.clone(),
                captured: context.locals().to_vec(),
            })),

            Expression::Assign { name, op, value } => {
                let mut value = value.evaluate(context)?;
                if let Some(op) = op {
                    let current = context
                        .get(name)
                        .ok_or_else(|| Error::UndefinedVariable(name.clone()))?;
                    value = op.evaluate_binary(&current, &value)?;
                }
                context.assign(name, value.clone())?;
                Ok(value)
            }

            Expression::Update { name, op, prefix } => {
                let current = context
                    .get(name)
                    .ok_or_else(|| Error::UndefinedVariable(name.clone()))?;
                let next = op.evaluate_binary(&current, &Value::Integer(1))?;
                context.assign(name, next.clone())?;
                Ok(if *prefix { next } else { current })
            }
        }
    }

    fn arguments(
        args: &[Expression],
        context: &mut Context,
        allow_undefined: bool,
    ) -> Result<Vec<Value>, Error> {
        args.iter()
            .map(|arg| match arg.evaluate(context) {
                Ok(value) => Ok(value),
                Err(Error::UndefinedVariable(_)) if allow_undefined => Ok(Value::Null),
                Err(e) => Err(e),
            })
            .collect()
    }

    /// Recursively parse the expression.
    ///
    /// Consumes language tokens automatically and stops at the first token
    /// that can't continue the expression, e.g. `}}`, `as` or `,`.
    pub fn parse(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Self, Error> {
        let left = Self::ternary(iter)?;

        let op = match iter.peek().map(|t| t.token_ref()) {
            Some(Token::Assign) => None,
            Some(Token::AddAssign) => Some(Op::Add),
            Some(Token::SubAssign) => Some(Op::Sub),
            Some(Token::MultAssign) => Some(Op::Mult),
            Some(Token::DivAssign) => Some(Op::Div),
            _ => return Ok(left),
        };
        let assign = iter.next().ok_or(Error::Eof("assignment"))?;

        let name = match left {
            Expression::Term {
                term: Term::Variable(name),
            } => name,
            _ => return Err(Error::ExpressionSyntax(assign)),
        };

        // Assignment is right-associative: `a = b = 5`.
        let value = Self::parse(iter)?;

        Ok(Expression::Assign {
            name,
            op,
            value: Box::new(value),
        })
    }

    fn ternary(iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>) -> Result<Self, Error> {
        let condition = Self::binary(iter, 0)?;

        if !matches!(iter.peek().map(|t| t.token_ref()), Some(Token::Question)) {
            return Ok(condition);
        }
        let _ = iter.next();

        let then = Self::parse(iter)?;
        let colon = iter.next().ok_or(Error::Eof("ternary"))?;
        if colon.token_ref() != &Token::Colon {
            let token = colon.token();
            return Err(Error::WrongToken(colon, token));
        }
        let otherwise = Self::parse(iter)?;

        Ok(Expression::Ternary {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    // Precedence climbing over binary operators.
    fn binary(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        min_precedence: u8,
    ) -> Result<Self, Error> {
        let mut left = Self::unary(iter)?;

        loop {
            let op = match iter.peek().and_then(|t| Op::from_token(t.token_ref())) {
                Some(op) if op.precedence() >= min_precedence => op,
                _ => return Ok(left),
            };
            let _ = iter.next();

            let right = Self::binary(iter, op.precedence() + 1)?;
            left = Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
    }

    fn unary(iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>) -> Result<Self, Error> {
        let op = match iter.peek().map(|t| t.token_ref()) {
            Some(Token::Not) => Some(Op::Not),
            Some(Token::Minus) => Some(Op::Sub),
            Some(Token::Plus) => Some(Op::Add),
            Some(Token::Increment) | Some(Token::Decrement) => {
                let token = iter.next().ok_or(Error::Eof("prefix update"))?;
                let op = if token.token_ref() == &Token::Increment {
                    Op::Add
                } else {
                    Op::Sub
                };
                let target = iter.next().ok_or(Error::Eof("prefix update target"))?;
                return match target.token() {
                    Token::Variable(name) => Ok(Expression::Update {
                        name,
                        op,
                        prefix: true,
                    }),
                    _ => Err(Error::ExpressionSyntax(target)),
                };
            }
            _ => None,
        };

        if let Some(op) = op {
            let _ = iter.next();
            let operand = Self::unary(iter)?;
            return Ok(Expression::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        let term = Self::term(iter)?;

        let op = match iter.peek().map(|t| t.token_ref()) {
            Some(Token::Increment) => Op::Add,
            Some(Token::Decrement) => Op::Sub,
            _ => return Ok(term),
        };

        match term {
            Expression::Term {
                term: Term::Variable(name),
            } => {
                let _ = iter.next();
                Ok(Expression::Update {
                    name,
                    op,
                    prefix: false,
                })
            }
            _ => Err(Error::ExpressionSyntax(
                iter.next().ok_or(Error::Eof("postfix update"))?,
            )),
        }
    }

    fn term(iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>) -> Result<Self, Error> {
        let next = iter.next().ok_or(Error::Eof("term"))?;

        let expr = match next.token() {
            Token::RoundBracketStart => {
                let items = Self::sequence(iter, Token::RoundBracketEnd)?;

                if matches!(iter.peek().map(|t| t.token_ref()), Some(Token::Arrow)) {
                    let mut params = vec![];
                    for item in items {
                        match item {
                            Expression::Term {
                                term: Term::Variable(name),
                            } => params.push(name),
                            _ => return Err(Error::ExpressionSyntax(next)),
                        }
                    }
                    return Self::lambda(params, iter);
                }

                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (Some(expr), None) => expr,
                    _ => return Err(Error::ExpressionSyntax(next)),
                }
            }

            Token::Variable(name) => {
                if matches!(iter.peek().map(|t| t.token_ref()), Some(Token::Arrow)) {
                    return Self::lambda(vec![name], iter);
                }
                Self::variable(name)
            }

            Token::Value(value) => Self::constant(value),

            Token::SquareBracketStart => Expression::List {
                terms: Self::sequence(iter, Token::SquareBracketEnd)?,
            },

            Token::CurlyBracketStart => Self::hash(iter)?,

            _ => return Err(Error::ExpressionSyntax(next)),
        };

        Self::accessor(expr, iter)
    }

    fn lambda(
        params: Vec<String>,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Self, Error> {
        let _ = iter.next(); // `=>`
        let body = Self::parse(iter)?;
        Ok(Expression::Lambda {
            params,
            body: Rc::new(body),
        })
    }

    // Comma-separated expressions up to and including `end`.
    fn sequence(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        end: Token,
    ) -> Result<Vec<Self>, Error> {
        let mut items = vec![];

        if iter.peek().map(|t| t.token_ref()) == Some(&end) {
            let _ = iter.next();
            return Ok(items);
        }

        loop {
            items.push(Self::parse(iter)?);
            let next = iter.next().ok_or(Error::Eof("list"))?;
            match next.token_ref() {
                Token::Comma => {
                    // Trailing comma.
                    if iter.peek().map(|t| t.token_ref()) == Some(&end) {
                        let _ = iter.next();
                        return Ok(items);
                    }
                }
                token if *token == end => return Ok(items),
                _ => return Err(Error::ExpressionSyntax(next)),
            }
        }
    }

    fn hash(iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>) -> Result<Self, Error> {
        let mut entries = vec![];

        loop {
            let key = iter.next().ok_or(Error::Eof("hash"))?;
            let key = match key.token() {
                Token::CurlyBracketEnd => break,
                Token::Variable(name) => name,
                Token::Value(Value::String(name)) => name,
                Token::Value(Value::Integer(n)) => n.to_string(),
                _ => return Err(Error::ExpressionSyntax(key)),
            };

            let value = match iter.peek().map(|t| t.token_ref()) {
                Some(Token::Colon) => {
                    let _ = iter.next();
                    Self::parse(iter)?
                }
                // Shorthand `{count}`.
                _ => Self::variable(key.clone()),
            };
            entries.push((key, value));

            let next = iter.next().ok_or(Error::Eof("hash"))?;
            match next.token_ref() {
                Token::Comma => continue,
                Token::CurlyBracketEnd => break,
                _ => return Err(Error::ExpressionSyntax(next)),
            }
        }

        Ok(Expression::Hash { entries })
    }

    fn function(
        name: &str,
        expr: Self,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Self, Error> {
        let args = match iter.peek().map(|t| t.token_ref()) {
            Some(Token::RoundBracketStart) => {
                let _ = iter.next();
                Some(Self::sequence(iter, Token::RoundBracketEnd)?)
            }
            _ => None,
        };

        Ok(Expression::Member {
            term: Box::new(expr),
            name: Box::new(Expression::constant(Value::String(name.to_string()))),
            args,
        })
    }

    fn accessor(
        mut expr: Self,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Self, Error> {
        loop {
            let accessor = iter.peek().map(|t| t.token());

            expr = match accessor {
                Some(Token::Dot) => {
                    let _ = iter.next().ok_or(Error::Eof("accessor dot"))?;
                    let name = iter.next().ok_or(Error::Eof("accessor name"))?;
                    match name.token() {
                        Token::Variable(name) => Self::function(&name, expr, iter)?,
                        Token::Value(Value::Integer(n)) => Self::function(&n.to_string(), expr, iter)?,
                        // Keywords are fine as member names, e.g. `options.if`.
                        Token::If | Token::Else | Token::Each | Token::As => {
                            let name = name.token().to_string();
                            Self::function(&name, expr, iter)?
                        }
                        _ => return Err(Error::ExpressionSyntax(name.clone())),
                    }
                }

                Some(Token::SquareBracketStart) => {
                    let _ = iter.next().ok_or(Error::Eof("accessor bracket"))?;
                    let name = Self::parse(iter)?;
                    let next = iter.next().ok_or(Error::Eof("expected closing bracket"))?;
                    match next.token() {
                        Token::SquareBracketEnd => (),
                        token => return Err(Error::WrongToken(next, token)),
                    }
                    Expression::Member {
                        term: Box::new(expr),
                        name: Box::new(name),
                        args: None,
                    }
                }

                Some(Token::RoundBracketStart) => {
                    let _ = iter.next();
                    Expression::Call {
                        callee: Box::new(expr),
                        args: Self::sequence(iter, Token::RoundBracketEnd)?,
                    }
                }

                Some(_) | None => return Ok(expr),
            };
        }
    }
}

pub trait Evaluate {
    fn evaluate(&self, scope: &Scope) -> Result<Value, Error>;
    fn evaluate_default(&self) -> Result<Value, Error> {
        self.evaluate(&Scope::default())
    }
}

impl Evaluate for &str {
    /// Evaluate a single `{{ expression }}` tag.
    fn evaluate(&self, scope: &Scope) -> Result<Value, Error> {
        let tokens = Lexer::new(self).tokens()?;
        let mut iter = tokens
            .into_iter()
            .skip_while(|t| t.token_ref() != &Token::BlockStart)
            .skip(1)
            .peekable();
        let expr = Expression::parse(&mut iter)?;
        match iter.next() {
            Some(next) if next.token_ref() != &Token::BlockEnd => {
                return Err(Error::ExpressionSyntax(next))
            }
            _ => (),
        }
        expr.evaluate(&mut Context::new(scope))
    }
}

impl Evaluate for String {
    fn evaluate(&self, scope: &Scope) -> Result<Value, Error> {
        self.as_str().evaluate(scope)
    }
}
