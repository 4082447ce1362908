pub mod context;
pub mod error;
pub mod language;
pub mod lexer;

pub use context::Context;
pub use error::Error;
pub use language::{Function, Program, Rendered, Script};
pub use lexer::{Lexer, ToValue, Token, TokenWithContext, Tokenize, Value};

use crate::view::state::{Props, Scope};

use std::path::{Path, PathBuf};

/// Compiled markup.
#[derive(Clone, Debug)]
pub struct Template {
    program: Program,
    path: PathBuf,
}

impl Template {
    pub fn new(path: impl AsRef<Path> + Copy) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| Error::Runtime(format!("{}: {}", path.as_ref().display(), err)))?;

        Ok(Template {
            program: Program::from_str(&text).map_err(|err| err.pretty(&text, Some(path)))?,
            path: path.as_ref().to_owned(),
        })
    }

    pub fn from_str(template: &str) -> Result<Self, Error> {
        Ok(Template {
            program: Program::from_str(template)?,
            path: PathBuf::from("/dev/null"),
        })
    }

    /// Evaluate the template into segments and values.
    pub fn evaluate(&self, scope: &Scope) -> Result<Rendered, Error> {
        self.program.evaluate(&mut Context::new(scope))
    }

    /// Render the template to a string, without any reactivity.
    pub fn render(&self, props: impl TryInto<Props, Error = Error>) -> Result<String, Error> {
        let scope = Scope::from_props(props.try_into()?);
        Ok(self.evaluate(&scope)?.to_string())
    }

    pub fn render_default(&self) -> Result<String, Error> {
        Ok(self.evaluate(&Scope::default())?.to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn test_template() -> Result<(), Error> {
        let template = Template::from_str("<p>{{ greeting }}, {{ name.capitalize }}</p>")?;
        let output = template.render([("greeting", "hello"), ("name", "world")])?;
        assert_eq!(output, "<p>hello, World</p>");

        assert_eq!(Template::from_str("plain")?.render_default()?, "plain");
        Ok(())
    }

    #[test]
    fn test_template_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("viewdoo")?;
        let path = dir.path().join("broken.html");
        let mut file = std::fs::File::create(&path)?;
        file.write_all(b"<ul>\n  {{each items}}\n</ul>")?;

        match Template::new(&path) {
            Err(Error::Pretty(pretty)) => assert!(pretty.contains("broken.html:2")),
            other => panic!("expected pretty error, got {:?}", other.map(|_| ())),
        }
        Ok(())
    }
}
