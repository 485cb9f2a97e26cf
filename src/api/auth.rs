/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::api::encoding::encode_pairs;
use crate::api::parsers::{parse_api_response, parse_lenient_response, ContentFailure};
use crate::api::request::{CallSpec, Target};
use crate::api::resources::check_status;
use crate::api::{DailymotionError, Operation, Request, Scope, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// OAuth2 token response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Id of the user the token belongs to
    #[serde(default)]
    pub uid: Option<String>,
}

// A token response is only usable with an access token in it
fn parse_token_response(body: &[u8]) -> Result<Value, ContentFailure> {
    let token = parse_api_response(body)?;
    match token.get("access_token").and_then(Value::as_str) {
        Some(t) if !t.is_empty() => Ok(token),
        _ => Err(ContentFailure::content("Token response has no access token")),
    }
}

#[derive(Debug, Default)]
struct AuthSettings {
    redirect_uri: String,
    scopes: Vec<Scope>,
}

/// OAuth2 flows against the Dailymotion token endpoints.
///
/// Token exchanges are never retried with a refresh token. A successful
/// exchange stores the new tokens in this request's credentials.
pub struct Authentication {
    request: Request,
    settings: Mutex<AuthSettings>,
}

impl Authentication {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            settings: Mutex::new(AuthSettings::default()),
        }
    }

    fn settings(&self) -> MutexGuard<'_, AuthSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn redirect_uri(&self) -> String {
        self.settings().redirect_uri.clone()
    }

    pub fn set_redirect_uri(&self, uri: &str) {
        self.settings().redirect_uri = uri.to_string();
    }

    pub fn scopes(&self) -> Vec<Scope> {
        self.settings().scopes.clone()
    }

    pub fn set_scopes(&self, scopes: &[Scope]) {
        self.settings().scopes = scopes.to_vec();
    }

    fn scope_param(&self) -> String {
        self.settings()
            .scopes
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Page the user visits to grant access. The code it redirects back with
    /// goes to [`Authentication::exchange_code_for_access_token`].
    pub fn authorization_url(&self) -> Url {
        let mut url = self.request.config().authorize_url.clone();
        let scope = self.scope_param();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.request.client_id())
                .append_pair("redirect_uri", &self.redirect_uri());
            if !scope.is_empty() {
                query.append_pair("scope", scope.as_str());
            }
        }
        url
    }

    pub async fn exchange_code_for_access_token(
        &self,
        code: &str,
    ) -> Result<Status, DailymotionError> {
        let creds = self.request.creds();
        let redirect_uri = self.redirect_uri();
        let body = encode_pairs(&[
            ("code", code),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ]);
        self.exchange(body).await
    }

    pub async fn exchange_credentials_for_access_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Status, DailymotionError> {
        let creds = self.request.creds();
        let scope = self.scope_param();
        let body = encode_pairs(&[
            ("username", username),
            ("password", password),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("scope", scope.as_str()),
            ("grant_type", "password"),
        ]);
        self.exchange(body).await
    }

    /// Invalidates the current access token on the server
    pub async fn revoke_access_token(&self) -> Result<Status, DailymotionError> {
        let target = Target::new(self.request.config().revoke_url.clone());
        let spec = CallSpec {
            parser: parse_lenient_response,
            ..CallSpec::api(Operation::Get)
        };
        self.request.call(Some(target), spec).await
    }

    /// Token obtained by the last successful exchange
    pub fn token(&self) -> Result<AccessToken, DailymotionError> {
        check_status(&self.request, self.request.status())?;
        self.request.result_as()
    }

    async fn exchange(&self, body: String) -> Result<Status, DailymotionError> {
        let target = Target::new(self.request.config().token_url.clone()).with_data(body);
        let spec = CallSpec {
            operation: Operation::Post,
            auth_required: false,
            refreshable: false,
            parser: parse_token_response,
        };
        let status = self.request.call(Some(target), spec).await?;
        if status == Status::Ready {
            if let Err(failure) = self.request.install_tokens(&self.request.result()) {
                log::warn!("Token response not stored: {}", failure.message);
            }
        }
        Ok(status)
    }
}

impl Deref for Authentication {
    type Target = Request;

    fn deref(&self) -> &Self::Target {
        &self.request
    }
}

impl std::fmt::Debug for Authentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authentication")
            .field("request", &self.request)
            .field("settings", &*self.settings())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn token_responses_need_an_access_token() {
        assert!(parse_token_response(br#"{"access_token": "abc", "expires_in": 3600}"#).is_ok());
        let failure = parse_token_response(br#"{"token_type": "Bearer"}"#).unwrap_err();
        assert_eq!(failure.error, crate::api::RequestError::UnknownContentError);
        let failure =
            parse_token_response(br#"{"error": "invalid_grant", "error_description": "Bad code"}"#)
                .unwrap_err();
        assert_eq!(failure.message, "Bad code");
    }

    #[test]
    fn token_deserializes_with_optional_fields() {
        let token: AccessToken = serde_json::from_str(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.refresh_token, None);
    }
}
