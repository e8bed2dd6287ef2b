use std::collections::HashMap;
use std::fmt::Write as _;

use rust_embed::RustEmbed;
use serde::Serialize;
use upon::{Engine, Template, Value};

use crate::error::PortalError;

#[derive(RustEmbed)]
#[folder = "templates/"]
struct Sources;

/// Compiled HTML pages. Template sources are embedded in the binary and
/// compiled once at startup, so syntax errors surface before the server
/// accepts its first request.
pub struct Pages {
    engine: Engine<'static>,
    templates: HashMap<String, Template<'static>>,
}

impl Pages {
    pub fn load() -> Result<Self, PortalError> {
        let mut engine = Engine::new();
        engine.set_default_formatter(&escape_html);

        let mut templates = HashMap::new();
        for name in Sources::iter() {
            let file = Sources::get(&name).expect("embedded template listed but missing");
            let source = String::from_utf8_lossy(&file.data).into_owned();
            templates.insert(name.to_string(), engine.compile(source)?);
        }
        Ok(Self { engine, templates })
    }

    pub fn render(&self, name: &str, ctx: impl Serialize) -> Result<String, PortalError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| PortalError::MissingTemplate(name.to_string()))?;
        Ok(template.render(&self.engine, ctx).to_string()?)
    }
}

/// HTML-escapes string values; everything else renders with the stock
/// formatter. Pre-encoded URLs pass through untouched since `%` is not
/// escaped.
fn escape_html(f: &mut upon::fmt::Formatter<'_>, value: &Value) -> upon::fmt::Result {
    match value {
        Value::String(s) => {
            for c in s.chars() {
                match c {
                    '&' => f.write_str("&amp;")?,
                    '<' => f.write_str("&lt;")?,
                    '>' => f.write_str("&gt;")?,
                    '"' => f.write_str("&quot;")?,
                    '\'' => f.write_str("&#39;")?,
                    _ => f.write_char(c)?,
                }
            }
            Ok(())
        }
        other => upon::fmt::default(f, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct LoginCtx {
        has_error: bool,
        error: String,
    }

    #[test]
    fn embedded_templates_compile() {
        let pages = Pages::load().unwrap();
        let html = pages
            .render(
                "login.html",
                LoginCtx {
                    has_error: false,
                    error: String::new(),
                },
            )
            .unwrap();
        assert!(html.contains("name=\"username\""));
        assert!(html.contains("name=\"password\""));
    }

    #[test]
    fn string_values_are_html_escaped() {
        let pages = Pages::load().unwrap();
        let html = pages
            .render(
                "login.html",
                LoginCtx {
                    has_error: true,
                    error: "<script>alert(1)</script>".to_string(),
                },
            )
            .unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let pages = Pages::load().unwrap();
        let err = pages.render("missing.html", ()).unwrap_err();
        assert!(matches!(err, PortalError::MissingTemplate(_)));
    }
}
