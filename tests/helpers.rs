/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use async_trait::async_trait;
use bytes::Bytes;
use dailymotion::api::{
    Client, ClientConfig, Creds, Filters, HttpRequest, HttpResponse, RequestError, Transport,
    TransportError,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};

pub(crate) type Reply = Result<HttpResponse, TransportError>;

enum Scripted {
    Now(Reply),
    Gated(oneshot::Receiver<()>, Reply),
    Never,
}

/// Transport answering from a script, recording everything sent
pub(crate) struct MockTransport {
    replies: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<HttpRequest>>,
    sent_count: watch::Sender<usize>,
}

#[allow(dead_code)]
impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            sent_count: watch::Sender::new(0),
        })
    }

    pub(crate) fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(Scripted::Now(reply));
    }

    /// The reply is held back until the returned sender fires
    pub(crate) fn push_gated(&self, reply: Reply) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Scripted::Gated(rx, reply));
        tx
    }

    /// A reply that never comes
    pub(crate) fn push_never(&self) {
        self.replies.lock().unwrap().push_back(Scripted::Never);
    }

    pub(crate) fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Resolves once `count` requests have reached the transport
    pub(crate) async fn wait_for_requests(&self, count: usize) {
        let mut rx = self.sent_count.subscribe();
        let _ = rx.wait_for(|sent| *sent >= count).await;
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.lock().unwrap().push(request);
        self.sent_count.send_modify(|sent| *sent += 1);
        let scripted = self.replies.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted::Now(reply)) => reply,
            Some(Scripted::Gated(gate, reply)) => {
                let _ = gate.await;
                reply
            }
            Some(Scripted::Never) => futures::future::pending().await,
            None => Err(TransportError::new(
                RequestError::UnknownNetworkError,
                "No scripted reply",
            )),
        }
    }
}

#[allow(dead_code)]
pub(crate) fn json_reply(status: u16, body: Value) -> Reply {
    Ok(HttpResponse {
        status,
        location: None,
        body: Bytes::from(body.to_string()),
    })
}

#[allow(dead_code)]
pub(crate) fn ok_json(body: Value) -> Reply {
    json_reply(200, body)
}

#[allow(dead_code)]
pub(crate) fn text_reply(status: u16, body: &str) -> Reply {
    Ok(HttpResponse {
        status,
        location: None,
        body: Bytes::from(body.to_string()),
    })
}

#[allow(dead_code)]
pub(crate) fn status_reply(status: u16) -> Reply {
    text_reply(status, "")
}

#[allow(dead_code)]
pub(crate) fn redirect(location: &str) -> Reply {
    Ok(HttpResponse {
        status: 302,
        location: Some(location.to_string()),
        body: Bytes::new(),
    })
}

#[allow(dead_code)]
pub(crate) fn network_error(kind: RequestError, message: &str) -> Reply {
    Err(TransportError::new(kind, message))
}

#[allow(dead_code)]
pub(crate) fn token_reply(access_token: &str, refresh_token: Option<&str>) -> Reply {
    let mut token = serde_json::json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 36000,
        "uid": "x1user",
    });
    if let Some(refresh_token) = refresh_token {
        token["refresh_token"] = refresh_token.into();
    }
    ok_json(token)
}

#[allow(dead_code)]
pub(crate) fn test_creds() -> Creds {
    Creds::from_tokens("client-id", Some("client-secret"), Some("old-token"), Some("refresh-token"))
}

#[allow(dead_code)]
pub(crate) fn mock_client(creds: Creds) -> (Client, Arc<MockTransport>) {
    let transport = MockTransport::new();
    let client = Client::with_transport(creds, ClientConfig::new().unwrap(), transport.clone());
    (client, transport)
}

#[allow(dead_code)]
pub(crate) fn filters(value: Value) -> Filters {
    value.as_object().cloned().unwrap_or_default()
}

/// Query pairs of a sent request
#[allow(dead_code)]
pub(crate) fn query(request: &HttpRequest) -> Vec<(String, String)> {
    request
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[allow(dead_code)]
pub(crate) fn query_value(request: &HttpRequest, key: &str) -> Option<String> {
    query(request).into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

#[allow(dead_code)]
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub(crate) fn get_auth_tokens() -> anyhow::Result<Creds> {
    Ok(Creds::from_env()?)
}
