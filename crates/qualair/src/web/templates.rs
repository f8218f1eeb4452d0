//! Page templates, compiled into the binary.

use minijinja::{Environment, Value};
use serde::Serialize;

use crate::error::Result;

const SOURCES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("apropos.html", include_str!("../../templates/apropos.html")),
    (
        "afficher_tables.html",
        include_str!("../../templates/afficher_tables.html"),
    ),
    ("filtre.html", include_str!("../../templates/filtre.html")),
    (
        "resultats_recherche.html",
        include_str!("../../templates/resultats_recherche.html"),
    ),
    (
        "histogramme.html",
        include_str!("../../templates/histogramme.html"),
    ),
    (
        "statistiques.html",
        include_str!("../../templates/statistiques.html"),
    ),
    ("error/404.html", include_str!("../../templates/error/404.html")),
];

/// The dashboard's template set.
///
/// Templates ending in `.html` are auto-escaped.
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Compile every page template.
    ///
    /// # Errors
    ///
    /// Returns an error if a template has a syntax error.
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for &(name, source) in SOURCES {
            env.add_template(name, source)?;
        }
        env.add_filter("cell", cell);
        Ok(Self { env })
    }

    /// Render the template called `name` with `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or fails to render.
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context)?)
    }
}

/// Database cell as text; nulls print as nothing.
fn cell(value: &Value) -> String {
    if value.is_none() || value.is_undefined() {
        String::new()
    } else {
        value.to_string()
    }
}
