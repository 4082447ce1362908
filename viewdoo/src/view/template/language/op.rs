//! Mathematical and logical operations between values.
use super::super::lexer::{Token, Value};
use super::super::Error;

/// List of supported operations, e.g. addition, equality, etc.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Op {
    Not,
    And,
    Or,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterEqualThan,
    LessThan,
    LessEqualThan,
}

impl Op {
    /// Convert a language token to a binary op. If the token
    /// isn't an op, `None` is returned.
    pub fn from_token(token: &Token) -> Option<Self> {
        Some(match token {
            Token::And => Op::And,
            Token::Or => Op::Or,
            Token::Equals => Op::Equals,
            Token::NotEquals => Op::NotEquals,
            Token::GreaterThan => Op::GreaterThan,
            Token::GreaterEqualThan => Op::GreaterEqualThan,
            Token::LessThan => Op::LessThan,
            Token::LessEqualThan => Op::LessEqualThan,
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            Token::Mult => Op::Mult,
            Token::Div => Op::Div,
            Token::Mod => Op::Mod,
            _ => return None,
        })
    }

    /// Evaluate the operation on a value.
    pub fn evaluate_unary(&self, value: &Value) -> Result<Value, Error> {
        match self {
            Op::Not => Ok(Value::Boolean(!value.truthy())),
            Op::Sub => Ok(match value {
                Value::Integer(integer) => Value::Integer(-integer),
                Value::Float(float) => Value::Float(-float),
                _ => Value::Null,
            }),
            Op::Add => Ok(match value {
                Value::String(s) => match s.trim().parse::<i64>() {
                    Ok(i) => Value::Integer(i),
                    Err(_) => s
                        .trim()
                        .parse::<f64>()
                        .map(Value::Float)
                        .unwrap_or(Value::Null),
                },
                value => value.clone(),
            }),
            op => Err(Error::Runtime(format!("{:?} is not a unary operation", op))),
        }
    }

    /// Combine two values into one using the operation.
    ///
    /// `&&` and `||` short-circuit in [`super::Expression::evaluate`] and only
    /// reach this with both operands already evaluated.
    pub fn evaluate_binary(&self, left: &Value, right: &Value) -> Result<Value, Error> {
        match self {
            Op::Equals => Ok(Value::Boolean(left == right)),
            Op::NotEquals => Ok(Value::Boolean(left != right)),
            Op::LessThan => Ok(Value::Boolean(left < right)),
            Op::LessEqualThan => Ok(Value::Boolean(left <= right)),
            Op::GreaterThan => Ok(Value::Boolean(left > right)),
            Op::GreaterEqualThan => Ok(Value::Boolean(left >= right)),
            Op::And => Ok(if left.truthy() {
                right.clone()
            } else {
                left.clone()
            }),
            Op::Or => Ok(if left.truthy() {
                left.clone()
            } else {
                right.clone()
            }),
            Op::Add => Ok(left.add(right)),
            Op::Sub => Ok(left.sub(right)),
            Op::Mult => Ok(left.mul(right)),
            Op::Div => left.div(right),
            Op::Mod => left.rem(right),
            Op::Not => Err(Error::Runtime("! is not a binary operation".into())),
        }
    }

    /// Binding power of the operator; higher binds tighter.
    // Source: <https://en.cppreference.com/w/c/language/operator_precedence>
    pub fn precedence(&self) -> u8 {
        match self {
            Op::Or => 1,
            Op::And => 2,
            Op::Equals | Op::NotEquals => 3,
            Op::GreaterThan | Op::GreaterEqualThan | Op::LessThan | Op::LessEqualThan => 4,
            Op::Add | Op::Sub => 5,
            Op::Mult | Op::Div | Op::Mod => 6,
            Op::Not => 7,
        }
    }
}
