//! Named template registry.

use std::sync::RwLock;

use serde::Serialize;
use tera::Tera;
use thiserror::Error;

/// Errors from loading or rendering templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{0}` not found")]
    NotFound(String),

    #[error("failed to load templates: {0}")]
    Load(#[source] tera::Error),

    #[error("failed to render template `{name}`: {source}")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },
}

/// Templates keyed by file name, compiled once at startup.
///
/// Rendering takes the read lock; [`TemplateRegistry::reload`] builds a fresh
/// set off to the side and swaps it in under the write lock, so a failed
/// reload keeps the previous templates.
pub struct TemplateRegistry {
    glob: Option<String>,
    tera: RwLock<Tera>,
}

impl TemplateRegistry {
    /// A registry with no templates. Every render reports `NotFound`.
    pub fn empty() -> Self {
        Self {
            glob: None,
            tera: RwLock::new(Tera::default()),
        }
    }

    /// Load every file matching `glob` (e.g. `templates/*.html`).
    /// A glob that matches nothing yields an empty registry.
    pub fn load(glob: &str) -> Result<Self, TemplateError> {
        let tera = Tera::new(glob).map_err(TemplateError::Load)?;
        let registry = Self {
            glob: Some(glob.to_string()),
            tera: RwLock::new(tera),
        };
        tracing::info!(glob, count = registry.names().len(), "Templates loaded");
        Ok(registry)
    }

    /// Build a registry from in-memory `(name, source)` pairs.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut tera = Tera::default();
        tera.add_raw_templates(sources).map_err(TemplateError::Load)?;
        Ok(Self {
            glob: None,
            tera: RwLock::new(tera),
        })
    }

    /// The glob this registry was loaded from, if any.
    pub fn glob(&self) -> Option<&str> {
        self.glob.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        let tera = self.tera.read().expect("template registry lock poisoned");
        let found = tera.get_template_names().any(|n| n == name);
        found
    }

    /// Registered template names, sorted.
    pub fn names(&self) -> Vec<String> {
        let tera = self.tera.read().expect("template registry lock poisoned");
        let mut names: Vec<String> = tera.get_template_names().map(str::to_string).collect();
        names.sort();
        names
    }

    /// Render `name` with `data` as the template context.
    pub fn render<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<String, TemplateError> {
        let render_err = |source| TemplateError::Render {
            name: name.to_string(),
            source,
        };

        let tera = self.tera.read().expect("template registry lock poisoned");
        if !tera.get_template_names().any(|n| n == name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        let context = tera::Context::from_serialize(data).map_err(render_err)?;
        tera.render(name, &context).map_err(render_err)
    }

    /// Make `function` callable from every template as `name(...)`.
    pub fn register_function<F: tera::Function + 'static>(&self, name: &str, function: F) {
        let mut tera = self.tera.write().expect("template registry lock poisoned");
        tera.register_function(name, function);
    }

    /// Re-read templates from disk. Registries not built from a glob are
    /// left untouched.
    pub fn reload(&self) -> Result<(), TemplateError> {
        if self.glob.is_none() {
            return Ok(());
        }

        // Write lock spans the reload; register_function waits for it.
        let mut tera = self.tera.write().expect("template registry lock poisoned");
        let mut fresh = tera.clone();
        fresh.full_reload().map_err(TemplateError::Load)?;

        let count = fresh.get_template_names().count();
        *tera = fresh;
        drop(tera);
        tracing::info!(count, "Templates reloaded");
        Ok(())
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_render_from_sources() {
        let registry = TemplateRegistry::from_sources([(
            "index.html",
            "<title>{{ title }}</title><p>{{ body }}</p>",
        )])
        .unwrap();

        let html = registry
            .render("index.html", &json!({ "title": "Home", "body": "Welcome" }))
            .unwrap();
        assert_eq!(html, "<title>Home</title><p>Welcome</p>");
        assert!(registry.contains("index.html"));
    }

    #[test]
    fn test_missing_template() {
        let registry = TemplateRegistry::empty();
        let err = registry.render("nope.html", &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(name) if name == "nope.html"));
    }

    #[test]
    fn test_html_is_escaped() {
        let registry = TemplateRegistry::from_sources([("page.html", "{{ v }}")]).unwrap();
        let html = registry.render("page.html", &json!({ "v": "<b>" })).unwrap();
        assert_eq!(html, "&lt;b&gt;");
    }

    #[test]
    fn test_registered_function() {
        let registry = TemplateRegistry::from_sources([("f.txt", "{{ shout(text=\"hi\") }}")]).unwrap();
        registry.register_function("shout", |args: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
            let text = args.get("text").and_then(|v| v.as_str()).unwrap_or_default();
            Ok(tera::Value::String(text.to_uppercase()))
        });
        assert_eq!(registry.render("f.txt", &json!({})).unwrap(), "HI");
    }

    #[test]
    fn test_load_and_reload_from_disk() {
        let dir = std::env::temp_dir().join(format!("trailhead-templates-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("greet.html"), "Hello {{ name }}").unwrap();

        let glob = format!("{}/*.html", dir.display());
        let registry = TemplateRegistry::load(&glob).unwrap();
        assert_eq!(registry.names(), vec!["greet.html".to_string()]);
        assert_eq!(registry.render("greet.html", &json!({ "name": "Ann" })).unwrap(), "Hello Ann");

        std::fs::write(dir.join("greet.html"), "Hi {{ name }}").unwrap();
        std::fs::write(dir.join("bye.html"), "Bye").unwrap();
        registry.reload().unwrap();
        assert_eq!(registry.render("greet.html", &json!({ "name": "Ann" })).unwrap(), "Hi Ann");
        assert!(registry.contains("bye.html"));

        std::fs::remove_dir_all(&dir).unwrap_or_default();
    }

    #[test]
    fn test_reload_keeps_registered_functions() {
        let dir = std::env::temp_dir().join(format!("trailhead-templates-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("f.txt"), "{{ shout(text=\"hi\") }}").unwrap();

        let registry = TemplateRegistry::load(&format!("{}/*.txt", dir.display())).unwrap();
        registry.register_function("shout", |args: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
            let text = args.get("text").and_then(|v| v.as_str()).unwrap_or_default();
            Ok(tera::Value::String(text.to_uppercase()))
        });

        std::fs::write(dir.join("f.txt"), "{{ shout(text=\"bye\") }}").unwrap();
        registry.reload().unwrap();
        assert_eq!(registry.render("f.txt", &json!({})).unwrap(), "BYE");

        std::fs::remove_dir_all(&dir).unwrap_or_default();
    }
}
