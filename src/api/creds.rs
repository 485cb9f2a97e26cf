/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::api::DailymotionError;
use chrono::{DateTime, Duration, Utc};

pub const CLIENT_ID_ENV: &str = "DAILYMOTION_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "DAILYMOTION_CLIENT_SECRET";
pub const ACCESS_TOKEN_ENV: &str = "DAILYMOTION_ACCESS_TOKEN";
pub const REFRESH_TOKEN_ENV: &str = "DAILYMOTION_REFRESH_TOKEN";

/// OAuth2 credentials used when talking to the Data API.
///
/// The client id/secret are only needed when the access token has to be
/// refreshed or exchanged. Empty strings mean "not set".
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Creds {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Creds {
    pub fn from_tokens(
        client_id: &str,
        client_secret: Option<&str>,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.unwrap_or_default().into(),
            access_token: access_token.unwrap_or_default().into(),
            refresh_token: refresh_token.unwrap_or_default().into(),
            expires_at: None,
        }
    }

    /// Loads credentials from the `DAILYMOTION_*` environment variables.
    ///
    /// Only the client id is mandatory.
    pub fn from_env() -> Result<Self, DailymotionError> {
        let client_id = std::env::var(CLIENT_ID_ENV)
            .map_err(|_| DailymotionError::MissingConfig(CLIENT_ID_ENV.to_string()))?;
        let optional = |name: &str| std::env::var(name).ok();
        Ok(Self::from_tokens(
            &client_id,
            optional(CLIENT_SECRET_ENV).as_deref(),
            optional(ACCESS_TOKEN_ENV).as_deref(),
            optional(REFRESH_TOKEN_ENV).as_deref(),
        ))
    }

    /// A refresh can only be attempted with a refresh token in hand
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// True once the recorded expiry time has passed. Unknown expiry is never expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub(crate) fn set_expires_in(&mut self, seconds: Option<i64>) {
        self.expires_at = seconds.map(|s| Utc::now() + Duration::seconds(s));
    }
}

impl std::fmt::Debug for Creds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Creds")
            .field("client_id", &"xxx")
            .field("client_secret", &"xxx")
            .field("access_token", &"xxx")
            .field("refresh_token", &"xxx")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Creds::from_tokens("id", Some("secret"), Some("token"), Some("refresh"));
        let text = format!("{:?}", creds);
        assert!(!text.contains("\"secret\""));
        assert!(!text.contains("\"refresh\""));
        assert!(!text.contains("\"token\""));
    }

    #[test]
    fn expiry_tracking() {
        let mut creds = Creds::from_tokens("id", None, Some("token"), None);
        assert!(!creds.can_refresh());
        assert!(!creds.is_expired());
        creds.set_expires_in(Some(-10));
        assert!(creds.is_expired());
        creds.set_expires_in(Some(3600));
        assert!(!creds.is_expired());
    }
}
