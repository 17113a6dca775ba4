//! Live-socket tests: the dispatcher behind axum, tower layers and shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use trailhead::http::{Context, Router};
use trailhead::AppConfig;

mod common;

#[tokio::test]
async fn test_serves_over_tcp_with_request_id() {
    let addr: SocketAddr = "127.0.0.1:28281".parse().unwrap();
    let mut router = Router::with_default_middleware();
    router
        .get("/users/:id", |mut ctx: Context| async move {
            let id = ctx.param("id").unwrap_or_default().to_string();
            ctx.json(StatusCode::OK, &serde_json::json!({ "id": id }));
            ctx
        })
        .unwrap();
    let shutdown = common::start_server(addr, AppConfig::default(), router.into_dispatcher()).await;

    let client = common::client();
    let res = client
        .get(format!("http://{addr}/users/42"))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["id"], "42");

    let res = client.get(format!("http://{addr}/nope")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limit_uses_peer_address() {
    let addr: SocketAddr = "127.0.0.1:28282".parse().unwrap();
    let mut config = AppConfig::default();
    config.rate_limit.enabled = true;
    config.rate_limit.max_requests = 2;

    let mut router = Router::from_config(&config).unwrap();
    router.get("/", common::text("ok")).unwrap();
    let shutdown = common::start_server(addr, config, router.into_dispatcher()).await;

    let client = common::client();
    for _ in 0..2 {
        let res = client.get(format!("http://{addr}/")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
    let res = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert_eq!(res.headers()["retry-after"], "60");

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_timeout() {
    let addr: SocketAddr = "127.0.0.1:28283".parse().unwrap();
    let mut config = AppConfig::default();
    config.timeouts.request_secs = 1;

    let mut router = Router::new();
    router
        .get("/slow", |ctx: Context| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            ctx
        })
        .unwrap();
    let shutdown = common::start_server(addr, config, router.into_dispatcher()).await;

    let res = common::client()
        .get(format!("http://{addr}/slow"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 408);

    shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown_stops_accepting() {
    let addr: SocketAddr = "127.0.0.1:28284".parse().unwrap();
    let mut router = Router::new();
    router.get("/", common::text("up")).unwrap();
    let shutdown = common::start_server(addr, AppConfig::default(), router.into_dispatcher()).await;

    let client = common::client();
    let res = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "up");

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = client
        .get(format!("http://{addr}/"))
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(result.is_err(), "server should refuse connections after shutdown");
}
