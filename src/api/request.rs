/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::api::encoding::{encode_headers, encode_pairs};
use crate::api::parsers::{
    embedded_error, parse_api_response, ContentFailure, ResponseParser,
};
use crate::api::status::{classify_http_status, HttpClass};
use crate::api::{
    ClientConfig, Creds, DailymotionError, HttpRequest, HttpResponse, Operation, RequestError,
    Status, Transport, TransportError,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, oneshot};
use url::{Origin, Url};

/// Redirect hops followed within one call before giving up
pub const MAX_REDIRECTS: u32 = 8;

const EVENT_CAPACITY: usize = 64;

/// Notifications published by a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    StatusChanged(Status),
    /// Published exactly once per call, after the terminal state is set
    Finished(Status),
    AccessTokenChanged,
    RefreshTokenChanged,
}

/// How one call is issued and how its body is read.
#[derive(Clone, Copy)]
pub(crate) struct CallSpec {
    pub operation: Operation,
    pub auth_required: bool,
    /// Whether a 401 may be answered with a refresh-token exchange and one retry
    pub refreshable: bool,
    pub parser: ResponseParser,
}

impl CallSpec {
    pub fn api(operation: Operation) -> Self {
        Self {
            operation,
            auth_required: true,
            refreshable: true,
            parser: parse_api_response,
        }
    }
}

/// Where the next call goes. `None` fields keep the current value.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub url: Url,
    pub data: Option<String>,
    pub headers: Option<Map<String, Value>>,
}

impl Target {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            data: None,
            headers: None,
        }
    }

    pub fn with_data(mut self, data: String) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_headers(mut self, headers: Map<String, Value>) -> Self {
        self.headers = Some(headers);
        self
    }
}

// Terminal state of a call, applied in one step by `finish`
#[derive(Debug)]
struct Outcome {
    status: Status,
    error: RequestError,
    error_string: String,
    result: Value,
}

impl Outcome {
    fn ready(result: Value) -> Self {
        Self {
            status: Status::Ready,
            error: RequestError::NoError,
            error_string: String::new(),
            result,
        }
    }

    fn failed(error: RequestError, error_string: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            error,
            error_string: error_string.into(),
            result: Value::Null,
        }
    }

    fn canceled() -> Self {
        Self {
            status: Status::Canceled,
            error: RequestError::NoError,
            error_string: String::new(),
            result: Value::Null,
        }
    }
}

impl From<ContentFailure> for Outcome {
    fn from(failure: ContentFailure) -> Self {
        Outcome::failed(failure.error, failure.message)
    }
}

impl From<TransportError> for Outcome {
    fn from(err: TransportError) -> Self {
        if err.kind == RequestError::OperationCanceled {
            Outcome::canceled()
        } else {
            Outcome::failed(err.kind, err.message)
        }
    }
}

enum Transmission {
    Canceled,
    Failed(TransportError),
    Response(HttpResponse),
}

// The single live network operation of a request
struct InFlight {
    cancel: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct RequestState {
    creds: Creds,
    url: Option<Url>,
    headers: Map<String, Value>,
    data: Option<String>,
    operation: Operation,
    status: Status,
    error: RequestError,
    error_string: String,
    result: Value,
    redirects: u32,
    cancel_requested: bool,
    in_flight: Option<InFlight>,
}

/// One asynchronous operation against the Data API.
///
/// A request can be reused for any number of sequential calls, but only one
/// call is ever in flight: starting another while [`Status::Loading`] is a
/// no-op. When the server answers 401 and a refresh token is held, the access
/// token is refreshed and the call retried once before the outcome is
/// reported.
pub struct Request {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    state: Mutex<RequestState>,
    events: broadcast::Sender<RequestEvent>,
}

impl Request {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<ClientConfig>, creds: Creds) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            config,
            state: Mutex::new(RequestState {
                creds,
                ..Default::default()
            }),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RequestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: RequestEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    /// Subscribes to status, completion and token notifications
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.events.subscribe()
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn creds(&self) -> Creds {
        self.lock().creds.clone()
    }

    pub fn set_creds(&self, creds: Creds) {
        let (access_changed, refresh_changed) = {
            let mut state = self.lock();
            let changed = (
                state.creds.access_token != creds.access_token,
                state.creds.refresh_token != creds.refresh_token,
            );
            state.creds = creds;
            changed
        };
        self.emit_token_changes(access_changed, refresh_changed);
    }

    pub fn client_id(&self) -> String {
        self.lock().creds.client_id.clone()
    }

    pub fn set_client_id(&self, client_id: &str) {
        self.lock().creds.client_id = client_id.to_string();
    }

    pub fn client_secret(&self) -> String {
        self.lock().creds.client_secret.clone()
    }

    pub fn set_client_secret(&self, client_secret: &str) {
        self.lock().creds.client_secret = client_secret.to_string();
    }

    pub fn access_token(&self) -> String {
        self.lock().creds.access_token.clone()
    }

    pub fn set_access_token(&self, token: &str) {
        let changed = {
            let mut state = self.lock();
            let changed = state.creds.access_token != token;
            state.creds.access_token = token.to_string();
            changed
        };
        self.emit_token_changes(changed, false);
    }

    pub fn refresh_token(&self) -> String {
        self.lock().creds.refresh_token.clone()
    }

    pub fn set_refresh_token(&self, token: &str) {
        let changed = {
            let mut state = self.lock();
            let changed = state.creds.refresh_token != token;
            state.creds.refresh_token = token.to_string();
            changed
        };
        self.emit_token_changes(false, changed);
    }

    fn emit_token_changes(&self, access_changed: bool, refresh_changed: bool) {
        if access_changed {
            self.emit(RequestEvent::AccessTokenChanged);
        }
        if refresh_changed {
            self.emit(RequestEvent::RefreshTokenChanged);
        }
    }

    pub fn url(&self) -> Option<Url> {
        self.lock().url.clone()
    }

    pub fn set_url(&self, url: Url) {
        self.lock().url = Some(url);
    }

    pub fn headers(&self) -> Map<String, Value> {
        self.lock().headers.clone()
    }

    /// Extra headers merged into every call. Non-string values are sent as JSON text.
    pub fn set_headers(&self, headers: Map<String, Value>) {
        self.lock().headers = headers;
    }

    /// Body of the next POST
    pub fn data(&self) -> Option<String> {
        self.lock().data.clone()
    }

    pub fn set_data(&self, data: Option<String>) {
        self.lock().data = data;
    }

    pub fn operation(&self) -> Operation {
        self.lock().operation
    }

    pub fn status(&self) -> Status {
        self.lock().status
    }

    pub fn error(&self) -> RequestError {
        self.lock().error
    }

    pub fn error_string(&self) -> String {
        self.lock().error_string.clone()
    }

    /// Redirects followed by the current (or last) call
    pub fn redirects(&self) -> u32 {
        self.lock().redirects
    }

    /// Parsed response of the last call. Only meaningful when [`Status::Ready`].
    pub fn result(&self) -> Value {
        self.lock().result.clone()
    }

    /// Deserializes the last result into `T`
    pub fn result_as<T: DeserializeOwned>(&self) -> Result<T, DailymotionError> {
        Ok(serde_json::from_value(self.result())?)
    }

    /// Issues a GET to the current url
    pub async fn get(&self, auth_required: bool) -> Result<Status, DailymotionError> {
        let spec = CallSpec {
            auth_required,
            ..CallSpec::api(Operation::Get)
        };
        self.call(None, spec).await
    }

    /// Issues a POST of the current data to the current url
    pub async fn post(&self) -> Result<Status, DailymotionError> {
        self.call(None, CallSpec::api(Operation::Post)).await
    }

    /// Issues a DELETE to the current url
    pub async fn delete_resource(&self) -> Result<Status, DailymotionError> {
        self.call(None, CallSpec::api(Operation::Delete)).await
    }

    /// Aborts the call in flight, if any.
    ///
    /// The call still completes, with [`Status::Canceled`] and no error.
    pub fn cancel(&self) {
        let mut state = self.lock();
        if state.status != Status::Loading {
            return;
        }
        log::debug!("Canceling request");
        state.cancel_requested = true;
        if let Some(cancel) = state.in_flight.as_mut().and_then(|f| f.cancel.take()) {
            let _ = cancel.send(());
        }
    }

    pub(crate) async fn call(
        &self,
        target: Option<Target>,
        spec: CallSpec,
    ) -> Result<Status, DailymotionError> {
        match self.begin(target, spec)? {
            Some(pending) => Ok(pending.wait().await),
            None => Ok(Status::Loading),
        }
    }

    /// Moves to `Loading` and hands back the call to drive, or `None` when a
    /// call is already in flight.
    pub(crate) fn begin(
        &self,
        target: Option<Target>,
        spec: CallSpec,
    ) -> Result<Option<PendingCall<'_>>, DailymotionError> {
        {
            let mut state = self.lock();
            if state.status == Status::Loading {
                log::debug!("Request is already loading, ignoring new call");
                return Ok(None);
            }
            if let Some(target) = target {
                state.url = Some(target.url);
                state.data = target.data;
                if let Some(headers) = target.headers {
                    state.headers = headers;
                }
            }
            if state.url.is_none() {
                return Err(DailymotionError::UrlMissing());
            }
            state.operation = spec.operation;
            state.status = Status::Loading;
            state.error = RequestError::NoError;
            state.error_string.clear();
            state.result = Value::Null;
            state.redirects = 0;
            state.cancel_requested = false;
        }
        self.emit(RequestEvent::StatusChanged(Status::Loading));
        Ok(Some(PendingCall {
            request: self,
            spec,
            done: false,
        }))
    }

    async fn run(&self, spec: &CallSpec) -> Status {
        let mut refreshed = false;
        // Credentials only ever go to the origin the call started on
        let origin = self.lock().url.as_ref().map(Url::origin);
        loop {
            let Some(http) = self.build_http_request(spec, origin.as_ref()) else {
                return self.finish(Outcome::failed(
                    RequestError::ProtocolUnknown,
                    "No URL has been set for this request",
                ));
            };
            let url = http.url.clone();
            let same_origin = origin.as_ref() == Some(&url.origin());
            log::debug!("{} {}", http.operation, url);

            let resp = match self.dispatch(http).await {
                Transmission::Canceled => return self.finish(Outcome::canceled()),
                Transmission::Failed(err) => return self.finish(err.into()),
                Transmission::Response(resp) => resp,
            };

            match classify_http_status(resp.status) {
                HttpClass::Success => {
                    let outcome = match (spec.parser)(&resp.body) {
                        Ok(result) => Outcome::ready(result),
                        Err(failure) => failure.into(),
                    };
                    return self.finish(outcome);
                }
                HttpClass::Redirect => {
                    if let Err(outcome) = self.follow_redirect(&url, resp.location.as_deref()) {
                        return self.finish(outcome);
                    }
                }
                HttpClass::AuthenticationRequired => {
                    let can_refresh = self.lock().creds.can_refresh();
                    if spec.refreshable && same_origin && !refreshed && can_refresh {
                        refreshed = true;
                        if let Err(outcome) = self.refresh_access_token().await {
                            return self.finish(outcome);
                        }
                        log::debug!("Retrying {} {} with refreshed token", spec.operation, url);
                    } else {
                        return self.finish(Outcome::failed(
                            RequestError::AuthenticationRequired,
                            http_error_string(&url, resp.status),
                        ));
                    }
                }
                HttpClass::Failure(error) => {
                    if let Some(message) = api_error_message(&resp) {
                        log::debug!("API error body: {message}");
                    }
                    return self.finish(Outcome::failed(
                        error,
                        http_error_string(&url, resp.status),
                    ));
                }
            }
        }
    }

    fn build_http_request(&self, spec: &CallSpec, origin: Option<&Origin>) -> Option<HttpRequest> {
        let state = self.lock();
        let url = state.url.clone()?;
        let mut headers = encode_headers(&state.headers);
        let trusted = origin == Some(&url.origin());
        if spec.auth_required && trusted && !state.creds.access_token.is_empty() {
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", state.creds.access_token),
            ));
        }
        let body = match spec.operation {
            Operation::Post => Some(state.data.clone().unwrap_or_default()),
            _ => None,
        };
        Some(HttpRequest {
            operation: spec.operation,
            url,
            headers,
            body,
        })
    }

    // Owns the network operation for its whole life: installed before sending,
    // released as soon as the outcome is known.
    async fn dispatch(&self, http: HttpRequest) -> Transmission {
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        {
            let mut state = self.lock();
            if state.cancel_requested {
                return Transmission::Canceled;
            }
            state.in_flight = Some(InFlight {
                cancel: Some(cancel_tx),
            });
        }

        let transmission = tokio::select! {
            biased;
            Ok(()) = &mut cancel_rx => Transmission::Canceled,
            reply = self.transport.send(http) => match reply {
                Ok(resp) => Transmission::Response(resp),
                Err(err) => Transmission::Failed(err),
            },
        };

        self.lock().in_flight = None;
        transmission
    }

    fn follow_redirect(&self, current: &Url, location: Option<&str>) -> Result<(), Outcome> {
        let Some(location) = location else {
            return Err(Outcome::failed(
                RequestError::ProtocolFailure,
                format!("Redirect from {current} has no location"),
            ));
        };
        let target = current.join(location).map_err(|err| {
            Outcome::failed(
                RequestError::ProtocolFailure,
                format!("Invalid redirect location {location}: {err}"),
            )
        })?;

        let mut state = self.lock();
        if state.redirects >= MAX_REDIRECTS {
            log::warn!("Too many redirects, last hop {current} -> {target}");
            return Err(Outcome::failed(
                RequestError::TooManyRedirects,
                format!("Maximum number of redirects ({MAX_REDIRECTS}) exceeded"),
            ));
        }
        state.redirects += 1;
        log::debug!("Redirect {} -> {}", state.redirects, target);
        state.url = Some(target);
        Ok(())
    }

    // Exchanges the held refresh token for a new access token. Failure is
    // reported as the outcome of the call that triggered it.
    async fn refresh_access_token(&self) -> Result<(), Outcome> {
        let body = {
            let state = self.lock();
            encode_pairs(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", state.creds.refresh_token.as_str()),
                ("client_id", state.creds.client_id.as_str()),
                ("client_secret", state.creds.client_secret.as_str()),
            ])
        };
        let token_url = self.config.token_url.clone();
        log::debug!("Access token rejected, refreshing at {token_url}");

        let http = HttpRequest {
            operation: Operation::Post,
            url: token_url.clone(),
            headers: Vec::new(),
            body: Some(body),
        };
        let resp = match self.dispatch(http).await {
            Transmission::Canceled => return Err(Outcome::canceled()),
            Transmission::Failed(err) => return Err(err.into()),
            Transmission::Response(resp) => resp,
        };

        let error = match classify_http_status(resp.status) {
            HttpClass::Success => None,
            HttpClass::AuthenticationRequired => Some(RequestError::AuthenticationRequired),
            HttpClass::Redirect => Some(RequestError::ProtocolFailure),
            HttpClass::Failure(error) => Some(error),
        };
        if let Some(error) = error {
            let message = api_error_message(&resp)
                .unwrap_or_else(|| http_error_string(&token_url, resp.status));
            log::warn!("Access token refresh failed: {message}");
            return Err(Outcome::failed(error, message));
        }

        let token = parse_api_response(&resp.body)?;
        self.install_tokens(&token).map_err(Outcome::from)
    }

    /// Stores the tokens of an OAuth2 token response.
    ///
    /// A response without a refresh token keeps the current one.
    pub(crate) fn install_tokens(&self, token: &Value) -> Result<(), ContentFailure> {
        let access_token = token
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ContentFailure::content("Token response has no access token"))?;
        let refresh_token = token
            .get("refresh_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());
        let expires_in = token.get("expires_in").and_then(Value::as_i64);

        let (access_changed, refresh_changed) = {
            let mut state = self.lock();
            let access_changed = state.creds.access_token != access_token;
            state.creds.access_token = access_token.to_string();
            let refresh_changed = match refresh_token {
                Some(refresh) if refresh != state.creds.refresh_token => {
                    state.creds.refresh_token = refresh.to_string();
                    true
                }
                _ => false,
            };
            state.creds.set_expires_in(expires_in);
            (access_changed, refresh_changed)
        };
        self.emit_token_changes(access_changed, refresh_changed);
        Ok(())
    }

    fn finish(&self, outcome: Outcome) -> Status {
        let status = outcome.status;
        {
            let mut state = self.lock();
            state.in_flight = None;
            state.cancel_requested = false;
            state.status = outcome.status;
            state.error = outcome.error;
            state.error_string = outcome.error_string;
            state.result = outcome.result;

            match status {
                Status::Failed => {
                    log::warn!("Request failed: {}: {}", state.error, state.error_string)
                }
                _ => log::debug!("Request finished: {status}"),
            }
        }
        self.emit(RequestEvent::StatusChanged(status));
        self.emit(RequestEvent::Finished(status));
        status
    }

    // The caller stopped waiting: the call ends as canceled
    fn abandon(&self) {
        {
            let mut state = self.lock();
            if state.status != Status::Loading {
                return;
            }
            if let Some(cancel) = state.in_flight.as_mut().and_then(|f| f.cancel.take()) {
                let _ = cancel.send(());
            }
        }
        self.finish(Outcome::canceled());
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Request")
            .field("url", &state.url.as_ref().map(Url::as_str))
            .field("operation", &state.operation)
            .field("status", &state.status)
            .field("error", &state.error)
            .finish()
    }
}

/// A call that has been started on a [`Request`].
///
/// Dropping it before completion cancels the call.
pub(crate) struct PendingCall<'a> {
    request: &'a Request,
    spec: CallSpec,
    done: bool,
}

impl PendingCall<'_> {
    /// Drives the call to its terminal status
    pub async fn wait(mut self) -> Status {
        let status = self.request.run(&self.spec).await;
        self.done = true;
        status
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.request.abandon();
        }
    }
}

fn http_error_string(url: &Url, status: u16) -> String {
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    format!("Error transferring {url} - server replied: {reason}")
}

fn api_error_message(resp: &HttpResponse) -> Option<String> {
    serde_json::from_slice::<Value>(&resp.body)
        .ok()
        .and_then(|body| embedded_error(&body))
}
