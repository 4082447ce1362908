use std::path::Path;

use viewdoo::colors::MaybeColorize;
use viewdoo::view::{template, Document, Props, Source, View};
use viewdoo::Error;

use crate::logging;

/// Compile a view file. Template errors are pointed out in the markup.
pub fn compile(path: &Path) -> Result<View, Error> {
    let text = std::fs::read_to_string(path)?;

    View::compile(&text).map_err(|err| {
        let markup = Source::split(&text).markup;
        Error::View(err.pretty(&markup, Some(path)))
    })
}

pub fn props(json: Option<&str>) -> Result<Props, Error> {
    match json {
        Some(json) => {
            let value: serde_json::Value = serde_json::from_str(json)?;
            Ok(Props::try_from(value)?)
        }
        None => Ok(Props::new()),
    }
}

/// Render a view file into a fresh document and print it.
pub fn render(path: &Path, props: &Props) -> Result<(), Error> {
    let view = compile(path)?;
    let document = Document::new();
    let state = view.mount(&document, document.body(), props)?;

    for (attr, css) in document.stylesheets() {
        println!("{}", format!("/* {} */", attr).dimmed());
        println!("{}", css);
    }
    println!("{}", document.body().inner_html());

    logging::rendered(format!("{} {}", path.display(), state.to_json()));
    Ok(())
}

pub fn check(path: &Path) -> bool {
    match compile(path) {
        Ok(view) => {
            logging::ok(format!(
                "{} ({} statements{})",
                path.display(),
                view.program().statements().len(),
                match view.scope_attr() {
                    Some(attr) => format!(", scoped to {}", attr),
                    None => String::new(),
                }
            ));
            true
        }

        Err(Error::View(template::Error::Pretty(report))) => {
            eprintln!("{}", report);
            false
        }

        Err(err) => {
            logging::error(format!("{}: {}", path.display(), err));
            false
        }
    }
}
