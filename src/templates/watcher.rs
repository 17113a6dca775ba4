//! Template directory watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::templates::TemplateRegistry;

/// Watches the directory behind a registry's glob and reloads on change.
pub struct TemplateWatcher {
    dir: PathBuf,
    registry: Arc<TemplateRegistry>,
}

impl TemplateWatcher {
    /// Returns `None` when the registry was not loaded from a glob.
    pub fn new(registry: Arc<TemplateRegistry>) -> Option<Self> {
        let dir = glob_root(registry.glob()?);
        Some(Self { dir, registry })
    }

    /// Start watching in a background thread.
    ///
    /// The returned watcher must be kept alive; dropping it stops the reloads.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let registry = self.registry.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        tracing::info!("Template change detected, reloading...");
                        if let Err(e) = registry.reload() {
                            tracing::error!("Failed to reload templates: {}. Keeping current set.", e);
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.dir, RecursiveMode::Recursive)?;

        tracing::info!(dir = ?self.dir, "Template watcher started");
        Ok(watcher)
    }
}

/// The directory part of a glob: everything before the first component
/// holding a glob metacharacter.
fn glob_root(glob: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for component in Path::new(glob).components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(['*', '?', '[', '{']) {
            break;
        }
        root.push(component);
    }
    if root.as_os_str().is_empty() {
        root.push(".");
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_root() {
        assert_eq!(glob_root("templates/*.html"), PathBuf::from("templates"));
        assert_eq!(glob_root("site/views/**/*"), PathBuf::from("site/views"));
        assert_eq!(glob_root("*.html"), PathBuf::from("."));
    }

    #[test]
    fn test_requires_glob_backed_registry() {
        let registry = Arc::new(TemplateRegistry::empty());
        assert!(TemplateWatcher::new(registry).is_none());
    }
}
