//! trailhead demo server.
//!
//! Serves a rendered index page, a user lookup, a JSON echo and static files
//! using whatever the config file (and `APP_*` environment) turns on.

use std::path::PathBuf;

use axum::http::StatusCode;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::json;

use trailhead::http::{Context, HttpServer, Router};
use trailhead::lifecycle::{startup, wait_for_signal, Shutdown};

#[derive(Parser)]
#[command(name = "trailhead")]
#[command(about = "Trie-routed HTTP server with composable middleware", long_about = None)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NewUser {
    name: String,
    email: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = startup::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    startup::init_observability(&config);

    tracing::info!("trailhead v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        cors = config.cors.enabled,
        rate_limit = config.rate_limit.enabled,
        "Configuration loaded"
    );

    let templates = startup::load_templates(&config.templates)?;

    let mut router = Router::from_config(&config)?;
    router.set_templates(templates.registry.clone());
    router
        .get("/", index)?
        .get("/users/:id", show_user)?
        .post("/users", create_user)?
        .get("/health", health)?;

    let listener = startup::bind(&config).await?;
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, router.into_dispatcher());
    let server_shutdown = shutdown.subscribe();

    let server_task = tokio::spawn(server.run(listener, server_shutdown));
    wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    drop(templates.watcher);
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn index(mut ctx: Context) -> Context {
    ctx.render(
        StatusCode::OK,
        "index.html",
        &json!({
            "title": "Hello, World!",
            "body": "Welcome to trailhead!",
        }),
    );
    ctx
}

async fn show_user(mut ctx: Context) -> Context {
    let id = ctx.param("id").unwrap_or_default().to_string();
    ctx.string(StatusCode::OK, format_args!("User ID: {id}"));
    ctx
}

async fn create_user(mut ctx: Context) -> Context {
    match ctx.bind_json::<NewUser>() {
        Ok(user) => ctx.json(StatusCode::CREATED, &user),
        Err(e) => ctx.json(StatusCode::BAD_REQUEST, &json!({ "error": e.to_string() })),
    }
    ctx
}

async fn health(mut ctx: Context) -> Context {
    ctx.json(StatusCode::OK, &json!({ "status": "ok" }));
    ctx
}
