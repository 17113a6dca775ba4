//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and apply environment overrides
//! - Initialize logging and metrics
//! - Load templates and start the hot-reload watcher
//! - Bind the listener last, so traffic arrives only when ready

use std::path::Path;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::net::TcpListener;

use crate::config::{apply_env_overrides, load_config, AppConfig, ConfigError, TemplateConfig};
use crate::observability::{logging, metrics};
use crate::templates::{TemplateError, TemplateRegistry, TemplateWatcher};

/// Load `path` (or defaults when absent) and apply `APP_*` overrides.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Install the tracing subscriber and, if enabled, the metrics exporter.
pub fn init_observability(config: &AppConfig) {
    logging::init_tracing(&config.observability.log_level);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
}

/// Loaded templates plus the watcher keeping them fresh, if any.
pub struct Templates {
    pub registry: Arc<TemplateRegistry>,
    pub watcher: Option<RecommendedWatcher>,
}

/// Load templates per config. No pattern yields an empty registry.
pub fn load_templates(config: &TemplateConfig) -> Result<Templates, TemplateError> {
    let Some(pattern) = config.pattern.as_deref() else {
        return Ok(Templates {
            registry: Arc::new(TemplateRegistry::empty()),
            watcher: None,
        });
    };

    let registry = Arc::new(TemplateRegistry::load(pattern)?);
    let watcher = if config.hot_reload {
        match TemplateWatcher::new(registry.clone()).map(TemplateWatcher::run).transpose() {
            Ok(watcher) => watcher,
            Err(e) => {
                tracing::warn!(error = %e, "Template hot reload unavailable");
                None
            }
        }
    } else {
        None
    };

    Ok(Templates { registry, watcher })
}

/// Bind the configured listener.
pub async fn bind(config: &AppConfig) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");
    Ok(listener)
}
