//! Per-request context handed to handlers and middleware.
//!
//! # Responsibilities
//! - Expose the buffered request (method, path, headers, query, body)
//! - Expose the path parameters bound by the matcher
//! - Accumulate the response (status, headers, body) until dispatch returns
//!
//! # Design Decisions
//! - One context per request, moved through the chain by value
//! - Status is plain state: last write wins, nothing is flushed early
//! - Request data sits behind an `Arc` so recovery can rebuild a context
//!   after the handler that owned the original panicked

use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{request, Method, StatusCode, Uri, Version};
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use url::form_urlencoded;

use crate::http::request::X_REQUEST_ID;
use crate::routing::PathParams;
use crate::templates::{TemplateError, TemplateRegistry};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// Failure to decode the request body into a typed value.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("expected content type `{expected}`, got `{actual}`")]
    ContentType { expected: &'static str, actual: String },

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Immutable request data shared between a context and its snapshots.
#[derive(Debug)]
struct RequestData {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    body: Bytes,
}

/// Request/response state for a single dispatch.
pub struct Context {
    request: Arc<RequestData>,
    params: PathParams,
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
    templates: Arc<TemplateRegistry>,
}

impl Context {
    /// Build a context from request parts and the already-buffered body.
    pub fn new(parts: request::Parts, body: Bytes) -> Self {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            request: Arc::new(RequestData {
                method: parts.method,
                uri: parts.uri,
                version: parts.version,
                headers: parts.headers,
                remote_addr,
                body,
            }),
            params: PathParams::new(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::empty(),
            templates: Arc::new(TemplateRegistry::empty()),
        }
    }

    pub fn with_params(mut self, params: PathParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_templates(mut self, templates: Arc<TemplateRegistry>) -> Self {
        self.templates = templates;
        self
    }

    /// A fresh context for the same request that keeps the response status
    /// and headers written so far but none of the body.
    pub(crate) fn snapshot(&self) -> Self {
        Self {
            request: self.request.clone(),
            params: self.params.clone(),
            status: self.status,
            headers: self.headers.clone(),
            body: Body::empty(),
            templates: self.templates.clone(),
        }
    }

    // ---- request side ----

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn uri(&self) -> &Uri {
        &self.request.uri
    }

    pub fn path(&self) -> &str {
        self.request.uri.path()
    }

    pub fn version(&self) -> Version {
        self.request.version
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.request.headers
    }

    /// A request header as text; `None` if missing or not visible ASCII.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.request.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Peer address, when the transport supplied one.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.request.remote_addr
    }

    pub fn client_ip(&self) -> Option<IpAddr> {
        self.request.remote_addr.map(|addr| addr.ip())
    }

    /// The `x-request-id` assigned by the transport layer.
    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    /// Path parameter bound by the matched route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// First value of query parameter `key`, decoded.
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.request.uri.query()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// First value of form field `key` from an urlencoded request body.
    pub fn post_form(&self, key: &str) -> Option<String> {
        let content_type = self.header(header::CONTENT_TYPE)?;
        if !content_type.starts_with("application/x-www-form-urlencoded") {
            return None;
        }
        form_urlencoded::parse(&self.request.body)
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// The raw request body.
    pub fn body(&self) -> &Bytes {
        &self.request.body
    }

    /// Decode the request body as JSON into `T`.
    ///
    /// A missing content type is accepted; any other non-JSON type is not.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        if let Some(content_type) = self.header(header::CONTENT_TYPE) {
            if !content_type.starts_with(APPLICATION_JSON) {
                return Err(BindError::ContentType {
                    expected: APPLICATION_JSON,
                    actual: content_type.to_string(),
                });
            }
        }
        Ok(serde_json::from_slice(&self.request.body)?)
    }

    // ---- response side ----

    /// Current response status. Defaults to 200.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Replace the response body, keeping status and headers.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.write(status, APPLICATION_JSON, bytes),
            Err(e) => {
                tracing::error!(error = %e, path = %self.path(), "Failed to serialize JSON response");
                self.abort_with_status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    pub fn html(&mut self, status: StatusCode, html: impl Into<String>) {
        self.write(status, TEXT_HTML, html.into());
    }

    /// Plain text response. Accepts anything `Display`, including
    /// `format_args!("User ID: {id}")`.
    pub fn string(&mut self, status: StatusCode, text: impl Display) {
        self.write(status, TEXT_PLAIN, text.to_string());
    }

    pub fn redirect(&mut self, status: StatusCode, location: &str) {
        let Ok(value) = HeaderValue::from_str(location) else {
            tracing::error!(location, "Invalid redirect location");
            self.abort_with_status(StatusCode::INTERNAL_SERVER_ERROR);
            return;
        };
        self.headers.insert(header::LOCATION, value);
        self.status = status;

        if matches!(*self.method(), Method::GET | Method::HEAD) {
            let reason = status.canonical_reason().unwrap_or("Redirect");
            let link = format!("<a href=\"{}\">{}</a>.\n", escape_html(location), reason);
            self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
            self.body = Body::from(link);
        } else {
            self.body = Body::empty();
        }
    }

    /// Replace the response with `status` and its canonical reason phrase.
    pub fn abort_with_status(&mut self, status: StatusCode) {
        let reason = status.canonical_reason().unwrap_or("");
        self.write(status, TEXT_PLAIN, reason.to_string());
    }

    /// Render the named template as HTML.
    ///
    /// Unknown templates answer 404, rendering failures answer 500.
    pub fn render<T: Serialize + ?Sized>(&mut self, status: StatusCode, name: &str, data: &T) {
        match self.templates.render(name, data) {
            Ok(html) => self.html(status, html),
            Err(TemplateError::NotFound(_)) => {
                tracing::warn!(template = name, "Template not found");
                self.string(StatusCode::NOT_FOUND, "Template not found");
            }
            Err(e) => {
                tracing::error!(template = name, error = %e, "Template rendering failed");
                self.string(StatusCode::INTERNAL_SERVER_ERROR, "Template rendering error");
            }
        }
    }

    /// Adopt a response produced elsewhere (e.g. a tower service).
    /// Its headers are merged over the ones already set.
    pub fn set_response(&mut self, response: Response) {
        let (parts, body) = response.into_parts();
        self.status = parts.status;
        let mut current: Option<HeaderName> = None;
        for (name, value) in parts.headers {
            match name {
                Some(name) => {
                    self.headers.insert(name.clone(), value);
                    current = Some(name);
                }
                None => {
                    if let Some(name) = &current {
                        self.headers.append(name.clone(), value);
                    }
                }
            }
        }
        self.body = body;
    }

    /// Finish the request.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    fn write(&mut self, status: StatusCode, content_type: &'static str, body: impl Into<Body>) {
        self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.status = status;
        self.body = body.into();
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
