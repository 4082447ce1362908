use super::Value;

/// A template language token, e.g. `each` or `+`.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    // e.g. `<ul><li>`
    Text(String),
    // e.g. `{{ logged_in }}`
    Variable(String),
    // e.g. `{{ 5 }}` or `{{ "hello" }}`
    Value(Value),
    // `{{`
    BlockStart,
    // `}}`
    BlockEnd,
    // `{{each items as item}}`
    Each,
    As,
    // `{{if}}`
    If,
    // `{{else}}`
    Else,
    // `{{/each}}`
    EndEach,
    // `{{/if}}`
    EndIf,
    // `const`, `let` or `var` in a script.
    Declare,
    Dot,
    Comma,
    Colon,
    Question,
    Semicolon,
    Newline,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterEqualThan,
    LessThan,
    LessEqualThan,
    Assign,
    AddAssign,
    SubAssign,
    MultAssign,
    DivAssign,
    Increment,
    Decrement,
    Arrow,
    SquareBracketStart,
    SquareBracketEnd,
    RoundBracketStart,
    RoundBracketEnd,
    CurlyBracketStart,
    CurlyBracketEnd,
}

impl Token {
    /// Length of the token in source, used to underline it in error messages.
    pub fn len(&self) -> usize {
        match self {
            Token::Text(text) => text.chars().count(),
            Token::Variable(name) => name.chars().count(),
            Token::Value(Value::String(s)) => s.chars().count() + 2,
            Token::Value(value) => value.to_string().len(),
            Token::Each | Token::Else => 4,
            Token::As | Token::If | Token::BlockStart | Token::BlockEnd => 2,
            Token::EndEach => 5,
            Token::EndIf => 3,
            Token::Declare => 3,
            Token::Equals
            | Token::NotEquals
            | Token::And
            | Token::Or
            | Token::GreaterEqualThan
            | Token::LessEqualThan
            | Token::AddAssign
            | Token::SubAssign
            | Token::MultAssign
            | Token::DivAssign
            | Token::Increment
            | Token::Decrement
            | Token::Arrow => 2,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Token::Text(text) => return write!(f, "{}", text),
            Token::Variable(name) => return write!(f, "{}", name),
            Token::Value(Value::String(s)) => return write!(f, "\"{}\"", s),
            Token::Value(value) => return write!(f, "{}", value),
            Token::BlockStart => "{{",
            Token::BlockEnd => "}}",
            Token::Each => "each",
            Token::As => "as",
            Token::If => "if",
            Token::Else => "else",
            Token::EndEach => "/each",
            Token::EndIf => "/if",
            Token::Declare => "const",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Question => "?",
            Token::Semicolon => ";",
            Token::Newline => "newline",
            Token::And => "&&",
            Token::Or => "||",
            Token::Not => "!",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Mult => "*",
            Token::Div => "/",
            Token::Mod => "%",
            Token::Equals => "==",
            Token::NotEquals => "!=",
            Token::GreaterThan => ">",
            Token::GreaterEqualThan => ">=",
            Token::LessThan => "<",
            Token::LessEqualThan => "<=",
            Token::Assign => "=",
            Token::AddAssign => "+=",
            Token::SubAssign => "-=",
            Token::MultAssign => "*=",
            Token::DivAssign => "/=",
            Token::Increment => "++",
            Token::Decrement => "--",
            Token::Arrow => "=>",
            Token::SquareBracketStart => "[",
            Token::SquareBracketEnd => "]",
            Token::RoundBracketStart => "(",
            Token::RoundBracketEnd => ")",
            Token::CurlyBracketStart => "{",
            Token::CurlyBracketEnd => "}",
        };
        write!(f, "{}", symbol)
    }
}

/// Token with its position in the source, for error reporting.
#[derive(Debug, PartialEq, Clone)]
pub struct TokenWithContext {
    token: Token,
    line: usize,
    column: usize,
}

impl TokenWithContext {
    /// Create a token at `line` and `column`, both starting at 1.
    pub fn new(token: Token, line: usize, column: usize) -> Self {
        Self {
            token,
            line,
            column,
        }
    }

    pub fn token(&self) -> Token {
        self.token.clone()
    }

    pub fn token_ref(&self) -> &Token {
        &self.token
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }
}

impl std::fmt::Display for TokenWithContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token)
    }
}
