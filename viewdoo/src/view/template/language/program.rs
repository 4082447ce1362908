//! Executable template.
//!
//! A program is a list of statements. Evaluating it is stateless: the same scope
//! always produces the same segments and values.
use super::super::{Context, Error, TokenWithContext, Tokenize};
use super::statement::Rendered;
use super::Statement;

/// Executable program.
#[derive(Debug, Clone)]
pub struct Program {
    statements: Vec<Statement>,
}

impl Program {
    /// Evaluate the program given the context. The context contains variable definitions.
    pub fn evaluate(&self, context: &mut Context) -> Result<Rendered, Error> {
        let mut result = Rendered::default();
        for statement in &self.statements {
            statement.evaluate(context, &mut result)?;
        }

        Ok(result)
    }

    /// Parse the program from a list of tokens.
    pub fn parse(tokens: Vec<TokenWithContext>) -> Result<Self, Error> {
        let mut iter = tokens.into_iter().peekable();
        let mut statements = vec![];

        while iter.peek().is_some() {
            let statement = Statement::parse(&mut iter)?;
            statements.push(statement);
        }

        Ok(Program { statements })
    }

    /// Compile the program from source.
    pub fn from_str(source: &str) -> Result<Self, Error> {
        let tokens = source.tokenize()?;
        Program::parse(tokens)
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::view::state::Scope;
    use crate::view::template::{ToValue, Value};

    fn render(source: &str, scope: &Scope) -> Result<String, Error> {
        let program = Program::from_str(source)?;
        Ok(program.evaluate(&mut Context::new(scope))?.to_string())
    }

    #[test]
    fn test_basic_program() -> Result<(), Error> {
        let output = render(
            "<html><body>{{if 1 == 4}}world is great{{else}}not so much{{/if}}</body></html>",
            &Scope::new(),
        )?;
        assert_eq!("<html><body>not so much</body></html>", output);
        Ok(())
    }

    #[test]
    fn test_segments() -> Result<(), Error> {
        let scope = Scope::new();
        scope.set("foo", "abc".to_value()?)?;
        scope.set("bar", Value::Integer(123))?;

        let program = Program::from_str(r#"<div class="{{foo}}">{{bar}}</div>"#)?;
        let rendered = program.evaluate(&mut Context::new(&scope))?;

        assert_eq!(
            rendered.segments,
            vec![r#"<div class=""#, r#"">"#, "</div>"]
        );
        assert_eq!(
            rendered.values,
            vec![Value::String("abc".into()), Value::Integer(123)]
        );
        assert_eq!(rendered.to_string(), r#"<div class="abc">123</div>"#);

        // Stateless.
        let again = program.evaluate(&mut Context::new(&scope))?;
        assert_eq!(rendered, again);

        Ok(())
    }

    #[test]
    fn test_each() -> Result<(), Error> {
        let scope = Scope::new();
        scope.set("items", vec!["a", "b"].to_value()?)?;

        let output = render(
            "<ul>{{each items as item, i}}<li>{{i}}: {{item}}</li>{{/each}}</ul>",
            &scope,
        )?;
        assert_eq!(output, "<ul><li>0: a</li><li>1: b</li></ul>");

        // Bindings don't leak out of the loop.
        assert!(render("{{each items as item}}{{/each}}{{item}}", &scope).is_err());

        let nested = render(
            "{{each [[1, 2], [3]] as row, r}}{{each row as cell}}{{r}}{{cell}} {{/each}}{{/each}}",
            &scope,
        )?;
        assert_eq!(nested, "01 02 13 ");

        let empty = render("{{each [] as x}}never{{/each}}done", &scope)?;
        assert_eq!(empty, "done");

        Ok(())
    }

    #[test]
    fn test_conditionals() -> Result<(), Error> {
        let program = Program::from_str("{{if x===1}}A{{else if x===2}}B{{else}}C{{/if}}")?;
        let scope = Scope::new();

        for (x, expected) in [(1, "A"), (2, "B"), (99, "C")] {
            scope.set("x", Value::Integer(x))?;
            let output = program.evaluate(&mut Context::new(&scope))?.to_string();
            assert_eq!(output, expected);
        }

        let output = render("{{if false}}A{{else if false}}B{{/if}}", &scope)?;
        assert_eq!(output, "");

        Ok(())
    }

    #[test]
    fn test_malformed() {
        for source in [
            "{{each items}}{{/each}}",
            "{{each items as}}{{/each}}",
            "{{each as item}}{{/each}}",
            "{{if}}{{/if}}",
            "{{/if}}",
            "{{/each}}",
            "{{else}}",
            "{{if a}}",
            "{{each items as item}}",
            "{{if a}}{{/each}}",
            "{{each a as b}}{{/if}}",
            "{{if a}}{{else}}{{else if b}}{{/if}}",
            "{{if a}}{{else}}{{else}}{{/if}}",
            "{{ }}",
            "{{ a b }}",
        ] {
            assert!(Program::from_str(source).is_err(), "{}", source);
        }
    }

    #[test]
    fn test_runtime_error() -> Result<(), Error> {
        let program = Program::from_str("<p>{{ missing.name }}</p>")?;
        let scope = Scope::new();
        assert!(matches!(
            program.evaluate(&mut Context::new(&scope)),
            Err(Error::UndefinedVariable(_))
        ));
        Ok(())
    }

    #[test]
    fn test_multiline_tags() -> Result<(), Error> {
        let scope = Scope::new();
        scope.set("n", Value::Integer(2))?;
        let output = render("{{if n >\n 1}}many{{/if}}{{\n  n * 2\n}}", &scope)?;
        assert_eq!(output, "many4");
        Ok(())
    }
}
