//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use trailhead::http::{Context, Dispatcher, HttpServer, IntoHandler};
use trailhead::lifecycle::Shutdown;
use trailhead::AppConfig;

/// Status and body text of one in-process dispatch.
pub struct Reply {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

/// Dispatch a request as if it came from `peer`.
pub async fn send(dispatcher: &Dispatcher, method: Method, uri: &str, peer: &str) -> Reply {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    collect(dispatcher.dispatch(request).await).await
}

pub async fn collect(response: axum::response::Response) -> Reply {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    Reply {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// Handler answering 200 with a fixed body.
pub fn text(body: &'static str) -> impl IntoHandler {
    move |mut ctx: Context| async move {
        ctx.string(StatusCode::OK, body);
        ctx
    }
}

/// A fresh directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("trailhead-{label}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Serve `dispatcher` on `addr` until the returned coordinator triggers.
pub async fn start_server(addr: SocketAddr, mut config: AppConfig, dispatcher: Dispatcher) -> Shutdown {
    config.listener.bind_address = addr.to_string();
    let shutdown = Shutdown::new();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let server = HttpServer::new(config, dispatcher);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
