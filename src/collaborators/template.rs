//! Template engine collaborator (§6.4): `render_template`,
//! `template_exists`, `precompile_templates`, `get_dependencies_of`, plus
//! `get_template` for the scout thread to warm caches ahead of workers.
//! `ReferenceTemplateEngine` wraps `minijinja`; any conforming
//! `TemplateEngine` works (tests inject a stub).

use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub trait TemplateEngine: Send + Sync {
    fn render_template(&self, name: &str, context: &Value) -> anyhow::Result<String>;
    fn template_exists(&self, name: &str) -> bool;
    /// Force-compile each named template, returning how many succeeded.
    fn precompile_templates(&self, names: &[String]) -> usize;
    /// Statically-discovered `extends`/`include` targets of `name`.
    fn get_dependencies_of(&self, name: &str) -> Vec<String>;
}

static DEPENDENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{%-?\s*(?:extends|include)\s+["']([^"']+)["']"#).unwrap());

pub struct ReferenceTemplateEngine {
    env: minijinja::Environment<'static>,
    templates_dir: PathBuf,
}

impl ReferenceTemplateEngine {
    pub fn new(templates_dir: PathBuf) -> Self {
        let mut env = minijinja::Environment::new();
        let dir = templates_dir.clone();
        env.set_loader(move |name| match std::fs::read_to_string(dir.join(name)) {
            Ok(src) => Ok(Some(src)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string())),
        });
        Self { env, templates_dir }
    }

    fn source_of(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.templates_dir.join(name)).ok()
    }
}

impl TemplateEngine for ReferenceTemplateEngine {
    fn render_template(&self, name: &str, context: &Value) -> anyhow::Result<String> {
        let tmpl = self.env.get_template(name).map_err(|e| {
            anyhow::anyhow!(crate::error::BuildError::Render {
                path: crate::primitives::SourcePath::new(name),
                message: e.to_string(),
            })
        })?;
        let ctx = minijinja::Value::from_serialize(context);
        tmpl.render(ctx).map_err(|e| {
            anyhow::anyhow!(crate::error::BuildError::Render {
                path: crate::primitives::SourcePath::new(name),
                message: e.to_string(),
            })
        })
    }

    fn template_exists(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    fn precompile_templates(&self, names: &[String]) -> usize {
        names.iter().filter(|name| self.env.get_template(name).is_ok()).count()
    }

    fn get_dependencies_of(&self, name: &str) -> Vec<String> {
        let Some(src) = self.source_of(name) else {
            return Vec::new();
        };
        DEPENDENCY_RE.captures_iter(&src).filter_map(|c| c.get(1).map(|m| m.as_str().to_string())).collect()
    }
}

/// Transitive closure of `name`'s static `extends`/`include` targets, via
/// repeated `get_dependencies_of` calls — the "partial_paths" scout hints
/// need (§3.7).
pub fn transitive_dependencies(engine: &dyn TemplateEngine, name: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![name.to_string()];
    let mut out = Vec::new();
    while let Some(current) = stack.pop() {
        for dep in engine.get_dependencies_of(&current) {
            if seen.insert(dep.clone()) {
                out.push(dep.clone());
                stack.push(dep);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn renders_template_with_context() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "post.html", "<h1>{{ title }}</h1>");
        let engine = ReferenceTemplateEngine::new(dir.path().to_path_buf());
        let html = engine.render_template("post.html", &serde_json::json!({"title": "Hello"})).unwrap();
        assert_eq!(html, "<h1>Hello</h1>");
    }

    #[test]
    fn missing_template_does_not_exist() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = ReferenceTemplateEngine::new(dir.path().to_path_buf());
        assert!(!engine.template_exists("missing.html"));
    }

    #[test]
    fn dependencies_discovered_statically() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "post.html", "{% extends \"base.html\" %}{% include \"nav.html\" %}");
        let engine = ReferenceTemplateEngine::new(dir.path().to_path_buf());
        let mut deps = engine.get_dependencies_of("post.html");
        deps.sort();
        assert_eq!(deps, vec!["base.html".to_string(), "nav.html".to_string()]);
    }

    #[test]
    fn transitive_dependencies_follow_extends_chain() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "post.html", "{% extends \"base.html\" %}");
        write(dir.path(), "base.html", "{% include \"nav.html\" %}");
        write(dir.path(), "nav.html", "<nav></nav>");
        let engine = ReferenceTemplateEngine::new(dir.path().to_path_buf());
        let mut deps = transitive_dependencies(&engine, "post.html");
        deps.sort();
        assert_eq!(deps, vec!["base.html".to_string(), "nav.html".to_string()]);
    }
}
