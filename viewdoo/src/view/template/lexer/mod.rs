//! Template and script lexer.
//!
//! In template mode, markup is passed through as [`Token::Text`] and only the inside
//! of `{{ ... }}` tags is tokenized. In script mode, the whole source is code and
//! line breaks separate statements.
pub mod token;
pub mod value;

pub use token::{Token, TokenWithContext};
pub use value::{ToValue, Value};

use super::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Template,
    Script,
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    mode: Mode,
    tokens: Vec<TokenWithContext>,
}

impl Lexer {
    /// Lexer for markup with `{{ }}` tags.
    pub fn new(source: &str) -> Self {
        Self::with_mode(source, Mode::Template)
    }

    /// Lexer for `<script>` blocks.
    pub fn script(source: &str) -> Self {
        Self::with_mode(source, Mode::Script)
    }

    fn with_mode(source: &str, mode: Mode) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            mode,
            tokens: vec![],
        }
    }

    pub fn tokens(mut self) -> Result<Vec<TokenWithContext>, Error> {
        match self.mode {
            Mode::Template => self.template()?,
            Mode::Script => {
                self.code(false)?;
            }
        }
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn push(&mut self, token: Token, line: usize, column: usize) {
        self.tokens.push(TokenWithContext::new(token, line, column));
    }

    fn template(&mut self) -> Result<(), Error> {
        let mut text = String::new();
        let (mut line, mut column) = (self.line, self.column);

        while let Some(c) = self.peek() {
            if c == '{' && self.peek_at(1) == Some('{') {
                if !text.is_empty() {
                    self.push(Token::Text(std::mem::take(&mut text)), line, column);
                }

                let (tag_line, tag_column) = (self.line, self.column);
                self.advance();
                self.advance();
                self.push(Token::BlockStart, tag_line, tag_column);
                self.tag(tag_line, tag_column)?;

                line = self.line;
                column = self.column;
            } else {
                text.push(c);
                self.advance();
            }
        }

        if !text.is_empty() {
            self.push(Token::Text(text), line, column);
        }

        Ok(())
    }

    // Inside `{{`, up to and including `}}`.
    fn tag(&mut self, line: usize, column: usize) -> Result<(), Error> {
        self.skip_whitespace();

        if self.peek() == Some('/') && self.peek_at(1).map(is_ident_start).unwrap_or(false) {
            let (l, c) = (self.line, self.column);
            self.advance();
            let name = self.identifier();
            let token = match name.as_str() {
                "each" => Token::EndEach,
                "if" => Token::EndIf,
                _ => {
                    return Err(Error::Syntax(TokenWithContext::new(
                        Token::Variable(format!("/{}", name)),
                        l,
                        c,
                    )))
                }
            };
            self.push(token, l, c);
        }

        if !self.code(true)? {
            return Err(Error::UnclosedTag(line, column));
        }

        Ok(())
    }

    /// Tokenize code. In a tag, stops after `}}` and returns whether it was found.
    fn code(&mut self, in_tag: bool) -> Result<bool, Error> {
        // Brackets of any kind join lines, only braces can hide the end of a tag.
        let mut depth = 0usize;
        let mut braces = 0usize;
        let mut first_word = in_tag;

        loop {
            self.skip_inline_whitespace(in_tag);

            let c = match self.peek() {
                Some(c) => c,
                None => return Ok(false),
            };
            let (line, column) = (self.line, self.column);

            if c == '\n' {
                self.advance();
                let continued = self
                    .tokens
                    .last()
                    .map(|t| continues_line(t.token_ref()))
                    .unwrap_or(true);
                if depth == 0 && !continued {
                    self.push(Token::Newline, line, column);
                }
                continue;
            }

            if in_tag && braces == 0 && c == '}' && self.peek_at(1) == Some('}') {
                self.advance();
                self.advance();
                self.push(Token::BlockEnd, line, column);
                return Ok(true);
            }

            if c.is_ascii_digit() {
                let value = self.number(line, column)?;
                self.push(Token::Value(value), line, column);
                first_word = false;
                continue;
            }

            if c == '"' || c == '\'' {
                let value = self.string(line, column)?;
                self.push(Token::Value(Value::String(value)), line, column);
                first_word = false;
                continue;
            }

            if is_ident_start(c) {
                let word = self.identifier();
                let after_else = matches!(
                    self.tokens.last().map(|t| t.token_ref()),
                    Some(Token::Else)
                );
                let token = match (self.mode, word.as_str()) {
                    (_, "true") => Token::Value(Value::Boolean(true)),
                    (_, "false") => Token::Value(Value::Boolean(false)),
                    (_, "null") | (_, "undefined") => Token::Value(Value::Null),
                    (Mode::Template, "each") if first_word => Token::Each,
                    (Mode::Template, "if") if first_word || after_else => Token::If,
                    (Mode::Template, "else") if first_word => Token::Else,
                    (Mode::Template, "as") => Token::As,
                    (Mode::Script, "const") | (Mode::Script, "let") | (Mode::Script, "var") => {
                        Token::Declare
                    }
                    _ => Token::Variable(word),
                };
                self.push(token, line, column);
                first_word = false;
                continue;
            }

            self.advance();
            let next = self.peek();
            let token = match (c, next) {
                ('=', Some('=')) => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                    }
                    Token::Equals
                }
                ('=', Some('>')) => {
                    self.advance();
                    Token::Arrow
                }
                ('=', _) => Token::Assign,
                ('!', Some('=')) => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                    }
                    Token::NotEquals
                }
                ('!', _) => Token::Not,
                ('&', Some('&')) => {
                    self.advance();
                    Token::And
                }
                ('|', Some('|')) => {
                    self.advance();
                    Token::Or
                }
                ('+', Some('+')) => {
                    self.advance();
                    Token::Increment
                }
                ('+', Some('=')) => {
                    self.advance();
                    Token::AddAssign
                }
                ('+', _) => Token::Plus,
                ('-', Some('-')) => {
                    self.advance();
                    Token::Decrement
                }
                ('-', Some('=')) => {
                    self.advance();
                    Token::SubAssign
                }
                ('-', _) => Token::Minus,
                ('*', Some('=')) => {
                    self.advance();
                    Token::MultAssign
                }
                ('*', _) => Token::Mult,
                ('/', Some('=')) => {
                    self.advance();
                    Token::DivAssign
                }
                ('/', Some('/')) if !in_tag => {
                    // Line comment.
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.advance();
                    }
                    continue;
                }
                ('/', _) => Token::Div,
                ('%', _) => Token::Mod,
                ('<', Some('=')) => {
                    self.advance();
                    Token::LessEqualThan
                }
                ('<', _) => Token::LessThan,
                ('>', Some('=')) => {
                    self.advance();
                    Token::GreaterEqualThan
                }
                ('>', _) => Token::GreaterThan,
                ('.', _) => Token::Dot,
                (',', _) => Token::Comma,
                (':', _) => Token::Colon,
                ('?', _) => Token::Question,
                (';', _) => Token::Semicolon,
                ('(', _) => {
                    depth += 1;
                    Token::RoundBracketStart
                }
                (')', _) => {
                    depth = depth.saturating_sub(1);
                    Token::RoundBracketEnd
                }
                ('[', _) => {
                    depth += 1;
                    Token::SquareBracketStart
                }
                (']', _) => {
                    depth = depth.saturating_sub(1);
                    Token::SquareBracketEnd
                }
                ('{', _) => {
                    depth += 1;
                    braces += 1;
                    Token::CurlyBracketStart
                }
                ('}', _) => {
                    depth = depth.saturating_sub(1);
                    braces = braces.saturating_sub(1);
                    Token::CurlyBracketEnd
                }
                (c, _) => return Err(Error::UnexpectedCharacter(c, line, column)),
            };

            self.push(token, line, column);
            first_word = false;
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    // Line breaks are significant in scripts.
    fn skip_inline_whitespace(&mut self, in_tag: bool) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() && (in_tag || c != '\n') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn identifier(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_ident_start(c) || c.is_ascii_digit() {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    fn number(&mut self, line: usize, column: usize) -> Result<Value, Error> {
        let mut digits = String::new();
        let mut float = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                if c != '_' {
                    digits.push(c);
                }
                self.advance();
            } else if c == '.'
                && !float
                && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
            {
                float = true;
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if float {
            digits
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| Error::UnexpectedCharacter('.', line, column))
        } else {
            match digits.parse::<i64>() {
                Ok(i) => Ok(Value::Integer(i)),
                Err(_) => digits
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| Error::UnexpectedCharacter('0', line, column)),
            }
        }
    }

    fn string(&mut self, line: usize, column: usize) -> Result<String, Error> {
        let quote = self.advance().ok_or(Error::UnterminatedString(line, column))?;
        let mut value = String::new();

        loop {
            let c = self
                .advance()
                .ok_or(Error::UnterminatedString(line, column))?;
            match c {
                '\\' => {
                    let escaped = self
                        .advance()
                        .ok_or(Error::UnterminatedString(line, column))?;
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                c if c == quote => break,
                c => value.push(c),
            }
        }

        Ok(value)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

// A line ending with one of these continues on the next line.
fn continues_line(token: &Token) -> bool {
    matches!(
        token,
        Token::Newline
            | Token::Semicolon
            | Token::Comma
            | Token::Arrow
            | Token::Assign
            | Token::AddAssign
            | Token::SubAssign
            | Token::MultAssign
            | Token::DivAssign
            | Token::And
            | Token::Or
            | Token::Not
            | Token::Plus
            | Token::Minus
            | Token::Mult
            | Token::Div
            | Token::Mod
            | Token::Equals
            | Token::NotEquals
            | Token::GreaterThan
            | Token::GreaterEqualThan
            | Token::LessThan
            | Token::LessEqualThan
            | Token::Question
            | Token::Colon
            | Token::Dot
    )
}

pub trait Tokenize {
    fn tokenize(&self) -> Result<Vec<TokenWithContext>, Error>;
}

impl Tokenize for &str {
    fn tokenize(&self) -> Result<Vec<TokenWithContext>, Error> {
        Lexer::new(self).tokens()
    }
}

impl Tokenize for String {
    fn tokenize(&self) -> Result<Vec<TokenWithContext>, Error> {
        self.as_str().tokenize()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        source
            .tokenize()
            .expect("tokenize")
            .into_iter()
            .map(|t| t.token())
            .collect()
    }

    #[test]
    fn test_text_and_tags() {
        assert_eq!(
            tokens(r#"<div class="{{foo}}">{{ bar }}</div>"#),
            vec![
                Token::Text(r#"<div class=""#.into()),
                Token::BlockStart,
                Token::Variable("foo".into()),
                Token::BlockEnd,
                Token::Text(r#"">"#.into()),
                Token::BlockStart,
                Token::Variable("bar".into()),
                Token::BlockEnd,
                Token::Text("</div>".into()),
            ]
        );
    }

    #[test]
    fn test_control_tags() {
        assert_eq!(
            tokens("{{each items as item, i}}{{/each}}"),
            vec![
                Token::BlockStart,
                Token::Each,
                Token::Variable("items".into()),
                Token::As,
                Token::Variable("item".into()),
                Token::Comma,
                Token::Variable("i".into()),
                Token::BlockEnd,
                Token::BlockStart,
                Token::EndEach,
                Token::BlockEnd,
            ]
        );

        assert_eq!(
            tokens("{{else if x === 2}}"),
            vec![
                Token::BlockStart,
                Token::Else,
                Token::If,
                Token::Variable("x".into()),
                Token::Equals,
                Token::Value(Value::Integer(2)),
                Token::BlockEnd,
            ]
        );

        // Keywords only count as the first word of a tag.
        assert_eq!(
            tokens("{{ eachItem }}{{ x + each }}")[1],
            Token::Variable("eachItem".into())
        );
        assert_eq!(
            tokens("{{ x + each }}")[3],
            Token::Variable("each".into())
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("{{ a !== b && c >= 1.5 || !d }}")[1..10].to_vec(),
            vec![
                Token::Variable("a".into()),
                Token::NotEquals,
                Token::Variable("b".into()),
                Token::And,
                Token::Variable("c".into()),
                Token::GreaterEqualThan,
                Token::Value(Value::Float(1.5)),
                Token::Or,
                Token::Not,
            ]
        );
        assert_eq!(
            tokens("{{ () => count++ }}")[1..6].to_vec(),
            vec![
                Token::RoundBracketStart,
                Token::RoundBracketEnd,
                Token::Arrow,
                Token::Variable("count".into()),
                Token::Increment,
            ]
        );
    }

    #[test]
    fn test_nested_braces() {
        let t = tokens("{{ json({a: {b: 1}}) }}");
        assert_eq!(t.last(), Some(&Token::BlockEnd));
        assert_eq!(
            t.iter().filter(|t| **t == Token::CurlyBracketEnd).count(),
            2
        );
    }

    #[test]
    fn test_unbalanced_paren_ends_tag() {
        let t = tokens("{{ (1 + 2 }}<p>x</p>");
        assert_eq!(
            t[t.len() - 2..].to_vec(),
            vec![Token::BlockEnd, Token::Text("<p>x</p>".into())]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokens(r#"{{ 'it\'s' + "}}" }}"#)[1..4].to_vec(),
            vec![
                Token::Value(Value::String("it's".into())),
                Token::Plus,
                Token::Value(Value::String("}}".into())),
            ]
        );
    }

    #[test]
    fn test_script_newlines() -> Result<(), Error> {
        let t = Lexer::script("const a = 1\nb = a +\n  2;\n\nc()")
            .tokens()?
            .into_iter()
            .map(|t| t.token())
            .collect::<Vec<_>>();

        assert_eq!(t.iter().filter(|t| **t == Token::Newline).count(), 1);
        assert_eq!(t.iter().filter(|t| **t == Token::Semicolon).count(), 1);
        assert_eq!(t[0], Token::Declare);
        Ok(())
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            "<p>{{ foo </p>".tokenize(),
            Err(Error::UnclosedTag(1, 4))
        ));
        assert!(matches!(
            "{{ 'abc }}".tokenize(),
            Err(Error::UnterminatedString(1, 4))
        ));
        assert!(matches!(
            "{{ a # b }}".tokenize(),
            Err(Error::UnexpectedCharacter('#', 1, 6))
        ));
        assert!(matches!("{{/for}}".tokenize(), Err(Error::Syntax(_))));
    }

    #[test]
    fn test_positions() -> Result<(), Error> {
        let t = "<p>\n  {{ foo }}".tokenize()?;
        assert_eq!((t[1].line(), t[1].column()), (2, 3));
        assert_eq!((t[2].line(), t[2].column()), (2, 6));
        Ok(())
    }
}
