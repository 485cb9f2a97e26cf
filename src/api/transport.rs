/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::api::{ClientConfig, DailymotionError, Operation, RequestError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use std::error::Error as StdError;
use url::Url;

/// A fully built HTTP call, ready to hand to a [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub operation: Operation,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Value of the first header matching `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What came back from the server, whatever the status code.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: Bytes,
}

/// A failure below HTTP: nothing usable came back.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub kind: RequestError,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: RequestError, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Issues a single HTTP exchange. Redirects must NOT be followed here; the
/// request lifecycle applies its own bounded redirect policy.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    https_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, DailymotionError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            https_client: builder.build()?,
        })
    }

    /// Wraps an already configured client. It should have redirects disabled.
    pub fn from_client(https_client: reqwest::Client) -> Self {
        Self { https_client }
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").finish()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.operation {
            Operation::Get => reqwest::Method::GET,
            Operation::Post => reqwest::Method::POST,
            Operation::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .https_client
            .request(method, request.url.as_str())
            .header("Accept", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
        }

        let resp = builder.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

// Best effort mapping of reqwest's coarse error kinds onto the request taxonomy
fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    let message = error_chain(&err);
    let chain = message.to_lowercase();
    let kind = if err.is_timeout() {
        RequestError::Timeout
    } else if err.is_redirect() {
        RequestError::TooManyRedirects
    } else if err.is_connect() {
        if chain.contains("dns") || chain.contains("resolve") {
            RequestError::HostNotFound
        } else if chain.contains("certificate") || chain.contains("tls") || chain.contains("ssl")
        {
            RequestError::SslHandshakeFailed
        } else if chain.contains("proxy") {
            RequestError::ProxyConnectionRefused
        } else {
            RequestError::ConnectionRefused
        }
    } else if err.is_body() || err.is_decode() {
        RequestError::RemoteHostClosed
    } else if err.is_builder() {
        RequestError::ProtocolInvalidOperation
    } else {
        RequestError::UnknownNetworkError
    };
    TransportError::new(kind, message)
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}
