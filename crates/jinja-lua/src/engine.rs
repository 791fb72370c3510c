/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render session: owns a MiniJinja environment together with its mutable
 * delimiter and include configuration.
 *
 * Each session is an independent value. Callers that want shared state
 * (e.g. the Lua module) wrap a session in their own handle; nothing here
 * is process-global, so two sessions never observe each other's
 * configuration changes.
 */

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, ErrorKind};
use serde_json::Value as JsonValue;

use crate::errors::{RenderError, RenderResult};

/// Parse a JSON-encoded context string into a structured value.
///
/// Every operation that accepts "data" takes it as JSON text; malformed
/// input fails the call before any engine work happens.
pub fn parse_context(data: &str) -> RenderResult<JsonValue> {
    Ok(serde_json::from_str(data)?)
}

/// Delimiter configuration for expressions, statements, comments and
/// line statements. Defaults are the jinja2 defaults.
#[derive(Debug, Clone)]
pub struct Delimiters {
    pub expression: (String, String),
    pub statement: (String, String),
    pub comment: (String, String),
    pub line_statement: Option<String>,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            expression: ("{{".to_owned(), "}}".to_owned()),
            statement: ("{%".to_owned(), "%}".to_owned()),
            comment: ("{#".to_owned(), "#}".to_owned()),
            line_statement: None,
        }
    }
}

/// A template render session.
///
/// Wraps a [`minijinja::Environment`] and exposes the operations the Lua
/// module (and the CLI) need: rendering from strings and files, writing
/// rendered output, mutating delimiter/whitespace configuration, and
/// registering in-memory templates for `{% include %}` resolution.
///
/// Include resolution order for a name not registered in memory:
/// 1. If file search is enabled (the default) and the name is an existing
///    regular file, its contents are loaded.
/// 2. Otherwise the include is an error, unless missing-include errors
///    have been disabled, in which case it renders as empty.
///
/// The engine caches templates once resolved, so the include flags govern
/// names that have not yet been resolved in this session.
#[derive(Debug)]
pub struct RenderSession {
    env: Environment<'static>,
    delimiters: Delimiters,
    search_in_files: Arc<AtomicBool>,
    throw_at_missing_includes: Arc<AtomicBool>,
}

impl Default for RenderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSession {
    /// Create a session with default configuration: jinja2 delimiters,
    /// include file search enabled, missing includes are errors.
    pub fn new() -> Self {
        let search_in_files = Arc::new(AtomicBool::new(true));
        let throw_at_missing_includes = Arc::new(AtomicBool::new(true));

        let mut env = Environment::new();

        // The loader is only consulted for names that were not registered
        // with `include_template`. It reads the flags through shared
        // handles so toggles take effect without rebuilding the loader.
        let search = Arc::clone(&search_in_files);
        let throw = Arc::clone(&throw_at_missing_includes);
        env.set_loader(move |name| {
            if search.load(Ordering::Relaxed) {
                let path = Path::new(name);
                if path.is_file() {
                    return match fs::read_to_string(path) {
                        Ok(source) => Ok(Some(source)),
                        Err(err) => Err(minijinja::Error::new(
                            ErrorKind::TemplateNotFound,
                            format!("failed to read template file '{name}': {err}"),
                        )),
                    };
                }
            }
            if throw.load(Ordering::Relaxed) {
                Ok(None)
            } else {
                Ok(Some(String::new()))
            }
        });

        Self {
            env,
            delimiters: Delimiters::default(),
            search_in_files,
            throw_at_missing_includes,
        }
    }

    /// Crate version, fixed at compile time.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Render inline template text against the given context.
    pub fn render_str(&self, source: &str, ctx: &JsonValue) -> RenderResult<String> {
        Ok(self.env.render_str(source, ctx)?)
    }

    /// Read a template from disk and render it against the given context.
    pub fn render_file(&self, path: &Path, ctx: &JsonValue) -> RenderResult<String> {
        let source = fs::read_to_string(path).map_err(|source| RenderError::Read {
            path: path.to_owned(),
            source,
        })?;
        Ok(self
            .env
            .render_named_str(&path.to_string_lossy(), &source, ctx)?)
    }

    /// Render a template file with a context read from a JSON file.
    pub fn render_file_with_json_file(
        &self,
        path: &Path,
        ctx_path: &Path,
    ) -> RenderResult<String> {
        let data = fs::read_to_string(ctx_path).map_err(|source| RenderError::Read {
            path: ctx_path.to_owned(),
            source,
        })?;
        let ctx = parse_context(&data)?;
        self.render_file(path, &ctx)
    }

    /// Render and write the result to `out`, creating or truncating it.
    ///
    /// The first argument is either inline template text or the path of a
    /// template file; it is treated as a file when it names an existing
    /// regular file. Template text that happens to coincide with a real
    /// path is therefore rendered from that file — the chosen branch is
    /// logged at debug level.
    pub fn write(&self, template_or_path: &str, ctx: &JsonValue, out: &Path) -> RenderResult<()> {
        let path = Path::new(template_or_path);
        let rendered = if path.is_file() {
            tracing::debug!(
                template = template_or_path,
                "write: template argument names an existing file, rendering from disk"
            );
            self.render_file(path, ctx)?
        } else {
            tracing::debug!("write: rendering template argument as inline text");
            self.render_str(template_or_path, ctx)?
        };
        fs::write(out, rendered).map_err(|source| RenderError::Write {
            path: out.to_owned(),
            source,
        })
    }

    /// Render a template file with a context file and write the result.
    pub fn write_with_json_file(
        &self,
        template: &Path,
        ctx_path: &Path,
        out: &Path,
    ) -> RenderResult<()> {
        let rendered = self.render_file_with_json_file(template, ctx_path)?;
        fs::write(out, rendered).map_err(|source| RenderError::Write {
            path: out.to_owned(),
            source,
        })
    }

    /// Set the opener and closer for template expressions.
    pub fn set_expression(&mut self, open: &str, close: &str) -> RenderResult<()> {
        self.delimiters.expression = (open.to_owned(), close.to_owned());
        self.apply_syntax()
    }

    /// Set the opener and closer for template statements.
    pub fn set_statement(&mut self, open: &str, close: &str) -> RenderResult<()> {
        self.delimiters.statement = (open.to_owned(), close.to_owned());
        self.apply_syntax()
    }

    /// Set the opener and closer for template comments.
    pub fn set_comment(&mut self, open: &str, close: &str) -> RenderResult<()> {
        self.delimiters.comment = (open.to_owned(), close.to_owned());
        self.apply_syntax()
    }

    /// Set the opener for line statements.
    pub fn set_line_statement(&mut self, prefix: &str) -> RenderResult<()> {
        self.delimiters.line_statement = Some(prefix.to_owned());
        self.apply_syntax()
    }

    /// When enabled, include names not registered in memory are looked up
    /// on the filesystem.
    pub fn set_search_included_templates_in_files(&mut self, enabled: bool) {
        self.search_in_files.store(enabled, Ordering::Relaxed);
    }

    /// Remove the first newline after a block tag.
    pub fn set_trim_blocks(&mut self, enabled: bool) {
        self.env.set_trim_blocks(enabled);
    }

    /// Strip leading whitespace from the start of a line to a block tag.
    pub fn set_lstrip_blocks(&mut self, enabled: bool) {
        self.env.set_lstrip_blocks(enabled);
    }

    /// When disabled, an include that cannot be resolved renders as empty
    /// instead of failing. Applies to names not yet resolved in this
    /// session; resolved templates stay cached.
    pub fn set_throw_at_missing_includes(&mut self, enabled: bool) {
        self.throw_at_missing_includes.store(enabled, Ordering::Relaxed);
    }

    /// Parse `source` and register it under `name` in the in-memory
    /// template table, making it resolvable by `{% include "name" %}`.
    /// Syntax errors surface here, at registration time.
    pub fn include_template(&mut self, name: &str, source: &str) -> RenderResult<()> {
        Ok(self
            .env
            .add_template_owned(name.to_owned(), source.to_owned())?)
    }

    /// Rebuild the engine's syntax configuration from the delimiter
    /// record. Templates registered before a syntax change keep the
    /// syntax they were parsed with.
    fn apply_syntax(&mut self) -> RenderResult<()> {
        let d = &self.delimiters;
        let syntax = match &d.line_statement {
            Some(prefix) => SyntaxConfig::builder()
                .variable_delimiters(d.expression.0.clone(), d.expression.1.clone())
                .block_delimiters(d.statement.0.clone(), d.statement.1.clone())
                .comment_delimiters(d.comment.0.clone(), d.comment.1.clone())
                .line_statement_prefix(prefix.clone())
                .build()?,
            None => SyntaxConfig::builder()
                .variable_delimiters(d.expression.0.clone(), d.expression.1.clone())
                .block_delimiters(d.statement.0.clone(), d.statement.1.clone())
                .comment_delimiters(d.comment.0.clone(), d.comment.1.clone())
                .build()?,
        };
        self.env.set_syntax(syntax);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_str_basic() {
        let session = RenderSession::new();
        let ctx = json!({"name": "world"});
        let out = session.render_str("Hello {{ name }}!", &ctx).unwrap();
        assert_eq!(out, "Hello world!");
    }

    #[test]
    fn test_context_values_round_trip() {
        let session = RenderSession::new();
        let ctx = parse_context(r#"{"n": 42, "list": [1, 2, 3], "obj": {"key": "v"}, "flag": true}"#)
            .unwrap();
        let out = session
            .render_str("{{ n }} {{ list[1] }} {{ obj.key }} {{ flag }}", &ctx)
            .unwrap();
        assert_eq!(out, "42 2 v true");
    }

    #[test]
    fn test_malformed_context_fails() {
        let err = parse_context("not json").unwrap_err();
        assert!(matches!(err, RenderError::Context(_)));
    }

    #[test]
    fn test_template_syntax_error_fails() {
        let session = RenderSession::new();
        let ctx = json!({});
        let result = session.render_str("{% if %}", &ctx);
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn test_set_expression_changes_delimiters() {
        let mut session = RenderSession::new();
        session.set_expression("<%", "%>").unwrap();
        let ctx = json!({"x": 1});
        assert_eq!(session.render_str("<% x %>", &ctx).unwrap(), "1");
        // Old delimiters are no longer active
        assert_eq!(session.render_str("{{ x }}", &ctx).unwrap(), "{{ x }}");
    }

    #[test]
    fn test_set_statement_changes_delimiters() {
        let mut session = RenderSession::new();
        session.set_statement("<%", "%>").unwrap();
        let ctx = json!({"x": true});
        let out = session
            .render_str("<% if x %>yes<% endif %>", &ctx)
            .unwrap();
        assert_eq!(out, "yes");
    }

    #[test]
    fn test_set_comment_changes_delimiters() {
        let mut session = RenderSession::new();
        session.set_comment("/*", "*/").unwrap();
        let ctx = json!({});
        let out = session.render_str("a/* hidden */b", &ctx).unwrap();
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_line_statement() {
        let mut session = RenderSession::new();
        session.set_line_statement("##").unwrap();
        let ctx = json!({"x": true});
        let out = session
            .render_str("## if x\nyes\n## endif\n", &ctx)
            .unwrap();
        assert!(out.contains("yes"));
        assert!(!out.contains("##"));
    }

    #[test]
    fn test_include_template() {
        let mut session = RenderSession::new();
        session.include_template("greet", "Hi {{ name }}").unwrap();
        let ctx = json!({"name": "you"});
        let out = session
            .render_str(r#"{% include "greet" %}"#, &ctx)
            .unwrap();
        assert_eq!(out, "Hi you");
    }

    #[test]
    fn test_include_template_syntax_error() {
        let mut session = RenderSession::new();
        let result = session.include_template("bad", "{% if %}");
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn test_missing_include_is_error_by_default() {
        let session = RenderSession::new();
        let ctx = json!({});
        let result = session.render_str(r#"{% include "no-such-template" %}"#, &ctx);
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn test_missing_include_renders_empty_when_lenient() {
        let mut session = RenderSession::new();
        session.set_throw_at_missing_includes(false);
        let ctx = json!({});
        let out = session
            .render_str(r#"before {% include "also-missing" %}after"#, &ctx)
            .unwrap();
        assert_eq!(out, "before after");
    }

    #[test]
    fn test_include_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.txt");
        std::fs::write(&path, "from disk: {{ name }}").unwrap();

        let session = RenderSession::new();
        let ctx = json!({"name": "a"});
        let template = format!(r#"{{% include "{}" %}}"#, path.display());
        assert_eq!(session.render_str(&template, &ctx).unwrap(), "from disk: a");
    }

    #[test]
    fn test_include_file_search_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.txt");
        std::fs::write(&path, "from disk").unwrap();

        let mut session = RenderSession::new();
        session.set_search_included_templates_in_files(false);
        session.set_throw_at_missing_includes(false);
        let ctx = json!({});
        let template = format!(r#"{{% include "{}" %}}"#, path.display());
        assert_eq!(session.render_str(&template, &ctx).unwrap(), "");
    }

    #[test]
    fn test_trim_blocks() {
        let mut session = RenderSession::new();
        let ctx = json!({"x": true});
        let template = "{% if x %}\nhi{% endif %}";
        assert_eq!(session.render_str(template, &ctx).unwrap(), "\nhi");
        session.set_trim_blocks(true);
        assert_eq!(session.render_str(template, &ctx).unwrap(), "hi");
    }

    #[test]
    fn test_lstrip_blocks() {
        let mut session = RenderSession::new();
        let ctx = json!({"x": true});
        let template = "  {% if x %}hi{% endif %}";
        assert_eq!(session.render_str(template, &ctx).unwrap(), "  hi");
        session.set_lstrip_blocks(true);
        assert_eq!(session.render_str(template, &ctx).unwrap(), "hi");
    }

    #[test]
    fn test_render_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tpl");
        std::fs::write(&path, "hello {{ name }}").unwrap();

        let session = RenderSession::new();
        let ctx = json!({"name": "world"});
        assert_eq!(session.render_file(&path, &ctx).unwrap(), "hello world");
    }

    #[test]
    fn test_render_file_missing() {
        let session = RenderSession::new();
        let ctx = json!({});
        let result = session.render_file(Path::new("/no/such/file.tpl"), &ctx);
        assert!(matches!(result, Err(RenderError::Read { .. })));
    }

    #[test]
    fn test_render_file_with_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = dir.path().join("t.tpl");
        let data = dir.path().join("d.json");
        std::fs::write(&tpl, "hello {{ name }}").unwrap();
        std::fs::write(&data, r#"{"name": "world"}"#).unwrap();

        let session = RenderSession::new();
        assert_eq!(
            session.render_file_with_json_file(&tpl, &data).unwrap(),
            "hello world"
        );
    }

    #[test]
    fn test_render_file_with_malformed_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = dir.path().join("t.tpl");
        let data = dir.path().join("d.json");
        std::fs::write(&tpl, "hello").unwrap();
        std::fs::write(&data, "{ nope").unwrap();

        let session = RenderSession::new();
        let result = session.render_file_with_json_file(&tpl, &data);
        assert!(matches!(result, Err(RenderError::Context(_))));
    }

    #[test]
    fn test_write_dispatches_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = dir.path().join("t.tpl");
        let out_text = dir.path().join("out_text.txt");
        let out_file = dir.path().join("out_file.txt");
        std::fs::write(&tpl, "hello {{ name }}").unwrap();

        let session = RenderSession::new();
        let ctx = json!({"name": "world"});

        // Inline text branch
        session.write("hello {{ name }}", &ctx, &out_text).unwrap();
        assert_eq!(std::fs::read_to_string(&out_text).unwrap(), "hello world");

        // Existing-file branch, identical output
        session
            .write(&tpl.to_string_lossy(), &ctx, &out_file)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out_file).unwrap(), "hello world");
    }

    #[test]
    fn test_write_truncates_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        std::fs::write(&out, "previous contents that are longer").unwrap();

        let session = RenderSession::new();
        session.write("short", &json!({}), &out).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "short");
    }

    #[test]
    fn test_write_surfaces_output_errors() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing-dir").join("out.txt");

        let session = RenderSession::new();
        let result = session.write("text", &json!({}), &out);
        assert!(matches!(result, Err(RenderError::Write { .. })));
    }

    #[test]
    fn test_write_with_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = dir.path().join("t.tpl");
        let data = dir.path().join("d.json");
        let out = dir.path().join("out.txt");
        std::fs::write(&tpl, "{{ greeting }}, {{ name }}!").unwrap();
        std::fs::write(&data, r#"{"greeting": "hi", "name": "there"}"#).unwrap();

        let session = RenderSession::new();
        session.write_with_json_file(&tpl, &data, &out).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hi, there!");
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut a = RenderSession::new();
        let b = RenderSession::new();
        a.set_expression("<%", "%>").unwrap();
        let ctx = json!({"x": 1});
        assert_eq!(a.render_str("<% x %>", &ctx).unwrap(), "1");
        // b keeps the default syntax
        assert_eq!(b.render_str("{{ x }}", &ctx).unwrap(), "1");
    }

    #[test]
    fn test_version_is_semver() {
        let version = RenderSession::version();
        assert_eq!(version.split('.').count(), 3);
    }
}
