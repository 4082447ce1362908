use super::{Token, TokenWithContext};
use crate::view::surface;
use thiserror::Error;

use std::path::Path;

#[derive(Error, Debug)]
pub enum Error {
    #[error("syntax error")]
    Syntax(TokenWithContext),

    #[error("expression syntax error")]
    ExpressionSyntax(TokenWithContext),

    #[error("expected a different token, but have token \"{1}\" instead")]
    WrongToken(TokenWithContext, Token),

    #[error("reached end of file while performing \"{0}\", did you forget a closing tag?")]
    Eof(&'static str),

    #[error("unexpected character '{0}' at line {1}, column {2}")]
    UnexpectedCharacter(char, usize, usize),

    #[error("unterminated string at line {0}, column {1}")]
    UnterminatedString(usize, usize),

    #[error("tag opened at line {0}, column {1} is missing its closing \"}}}}\"")]
    UnclosedTag(usize, usize),

    #[error("\"{0}\" doesn't close any open tag")]
    UnexpectedClose(TokenWithContext),

    #[error("\"{0}\" is never closed")]
    Unclosed(TokenWithContext),

    #[error("variable \"{0}\" is not defined or in scope")]
    UndefinedVariable(String),

    #[error("method \"{0}\" is not defined for {1}")]
    UnknownMethod(String, &'static str),

    #[error("\"{0}\" is not a function")]
    NotCallable(String),

    #[error("\"{0}\" can't be used in an each loop")]
    NotIterable(String),

    #[error("{0}")]
    Runtime(String),

    #[error("{0}")]
    Surface(#[from] surface::Error),

    #[error("{0}")]
    Pretty(String),
}

impl Error {
    // Where the error happened, if we know.
    fn position(&self) -> Option<(usize, usize, usize, &'static str)> {
        Some(match self {
            Error::Syntax(token) => (token.line(), token.column(), token.token_ref().len(), "syntax error"),
            Error::ExpressionSyntax(token) => (
                token.line(),
                token.column(),
                token.token_ref().len(),
                "expression syntax error",
            ),
            Error::WrongToken(token, _) => (
                token.line(),
                token.column(),
                token.token_ref().len(),
                "unexpected token",
            ),
            Error::UnexpectedClose(token) => (
                token.line(),
                token.column(),
                token.token_ref().len(),
                "no matching opening tag",
            ),
            Error::Unclosed(token) => (
                token.line(),
                token.column(),
                token.token_ref().len(),
                "never closed",
            ),
            Error::UnexpectedCharacter(_, line, column) => {
                (*line, *column, 1, "unexpected character")
            }
            Error::UnterminatedString(line, column) => (*line, *column, 1, "unterminated string"),
            Error::UnclosedTag(line, column) => (*line, *column, 2, "missing \"}}\""),
            _ => return None,
        })
    }

    /// Render the error with the offending source line and the token underlined.
    pub fn pretty(self, source: &str, path: Option<impl AsRef<Path> + Copy>) -> Self {
        let (line, column, len, error_msg) = match self.position() {
            Some(position) => position,
            None => {
                if let Some(path) = path {
                    let prefix = "---> ";
                    return Error::Pretty(format!(
                        "{}{}\n\n{}{}",
                        prefix,
                        path.as_ref().display(),
                        " ".repeat(prefix.len()),
                        self
                    ));
                } else {
                    return self;
                }
            }
        };

        let context = match source.lines().nth(std::cmp::max(1, line) - 1) {
            Some(context) => context,
            None => return self,
        };
        let leading_spaces = context.len() - context.trim_start().len();

        let underline = " ".repeat(column.saturating_sub(1 + leading_spaces))
            + &"^".repeat(std::cmp::max(1, len))
            + &format!(" {}", error_msg);

        let line_number = format!("{} | ", line);
        let underline_offset = " ".repeat(line.to_string().len()) + " | ";

        let path = if let Some(path) = path {
            format!("---> {}:{}:{}\n\n", path.as_ref().display(), line, column)
        } else {
            "".to_string()
        };

        Error::Pretty(format!(
            "{}{}\n{}{}\n{}{}",
            path,
            underline_offset,
            line_number,
            context.trim(),
            underline_offset,
            underline
        ))
    }

    pub fn pretty_from_path(self, path: impl AsRef<Path> + Copy) -> Self {
        let src = match std::fs::read_to_string(path) {
            Ok(src) => src,
            Err(_) => return self,
        };

        self.pretty(&src, Some(path))
    }

    /// Error found while compiling, as opposed to evaluating.
    pub fn is_syntax(&self) -> bool {
        self.position().is_some() || matches!(self, Error::Eof(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_underline() {
        let token = TokenWithContext::new(Token::If, 1, 4);
        let error = Error::Syntax(token);
        let pretty = error.pretty(
            "{{ if apples }}
    {{ if oranges are blue }}
",
            None::<&str>,
        );

        assert_eq!(
            pretty.to_string(),
            "  | \n1 | {{ if apples }}\n  |    ^^ syntax error"
        );
    }

    #[test]
    fn test_underline_indented() {
        let error = Error::UnclosedTag(2, 5);
        let pretty = error.pretty("<ul>\n    {{ item </ul>", Some("list.html"));

        assert_eq!(
            pretty.to_string(),
            "---> list.html:2:5\n\n  | \n2 | {{ item </ul>\n  | ^^ missing \"}}\""
        );
    }

    #[test]
    fn test_runtime_not_underlined() {
        let error = Error::UndefinedVariable("name".into());
        assert!(!error.is_syntax());
        let pretty = error.pretty("{{ name }}", None::<&str>);
        assert!(matches!(pretty, Error::UndefinedVariable(_)));
    }
}
