//! Templated page rendering.
//!
//! The render environment is explicitly constructed and dependency-injected
//! into the server rather than living in process-wide mutable state: a
//! [`RenderContext`] is created once at startup and read-only thereafter.
//!
//! The engine itself sits behind the [`Renderer`] trait seam - the server
//! only ever supplies a template source and a data map. The built-in
//! [`TemplateEngine`] substitutes `{{ key }}` placeholders from a
//! `serde_json::Value` object, which is all the generic status pages need;
//! a richer engine can be injected without touching the pipeline.

use std::fmt::Write;
use std::path::PathBuf;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

use hfs_http::protocol::StatusCode;

/// The generic status page rendered when no error handler is registered.
pub const ERROR_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{{ status_code }} {{ status_text }}</title>
</head>
<body>
    <h1>{{ status_code }} {{ status_text }}</h1>
    <p>{{ message }}</p>
</body>
</html>
"#;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("unclosed placeholder at byte {at}")]
    UnclosedPlaceholder { at: usize },

    #[error("missing field in render data: {name}")]
    MissingField { name: String },

    #[error("no pages directory configured")]
    MissingPagesDir,

    #[error("can't load template {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// A template renderer: expands a template source against a data map.
pub trait Renderer: Send + Sync {
    fn render(&self, source: &str, data: &Value) -> Result<String, RenderError>;
}

/// The built-in `{{ key }}` substitution engine.
#[derive(Debug, Default)]
pub struct TemplateEngine;

impl Renderer for TemplateEngine {
    fn render(&self, source: &str, data: &Value) -> Result<String, RenderError> {
        let mut out = String::with_capacity(source.len());
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let end = after.find("}}").ok_or(RenderError::UnclosedPlaceholder { at: source.len() - rest.len() + start })?;
            let name = after[..end].trim();

            let value = data.get(name).ok_or_else(|| RenderError::MissingField { name: name.to_string() })?;
            match value {
                Value::String(s) => out.push_str(s),
                other => {
                    // numbers and the rest keep their json rendering
                    let _ = write!(out, "{other}");
                }
            }

            rest = &after[end + 2..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// The dependency-injected template environment.
///
/// Holds the engine and the directory templated pages are loaded from.
/// Created once at startup, read-only while serving.
pub struct RenderContext {
    engine: Box<dyn Renderer>,
    pages_dir: Option<PathBuf>,
}

impl RenderContext {
    pub fn new(engine: Box<dyn Renderer>, pages_dir: Option<PathBuf>) -> Self {
        Self { engine, pages_dir }
    }

    /// Renders an in-memory template source against `data`.
    pub fn render_str(&self, source: &str, data: &Value) -> Result<String, RenderError> {
        self.engine.render(source, data)
    }

    /// Loads a template from the pages directory and renders it.
    pub fn render_page(&self, name: &str, data: &Value) -> Result<String, RenderError> {
        let dir = self.pages_dir.as_ref().ok_or(RenderError::MissingPagesDir)?;

        let source = std::fs::read_to_string(dir.join(name))
            .map_err(|e| RenderError::Io { name: name.to_string(), source: e })?;

        self.engine.render(&source, data)
    }

    /// Renders the generic status page for `status` with `message`.
    ///
    /// Never fails: if the engine rejects the built-in template, a plain
    /// text page is produced instead.
    pub fn error_page(&self, status: StatusCode, message: &str) -> String {
        let data = json!({
            "status_code": status.code(),
            "status_text": status.reason(),
            "message": message,
        });

        self.render_str(ERROR_TEMPLATE, &data).unwrap_or_else(|e| {
            error!(cause = %e, "error template failed to render");
            format!("{} {}\n{message}\n", status.code(), status.reason())
        })
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(Box::new(TemplateEngine), None)
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext").field("pages_dir", &self.pages_dir).finish_non_exhaustive()
    }
}
