/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::api::macros::resource_constructors;
use crate::api::{
    Authentication, Creds, DailymotionError, ListModel, Request, ResourceType, ResourcesRequest,
    ReqwestTransport, StreamsModel, StreamsRequest, Transport, TypedRequest,
};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const API_ORIGIN: &str = "https://api.dailymotion.com";
pub const TOKEN_PATH: &str = "/oauth/token";
pub const REVOKE_TOKEN_PATH: &str = "/logout";
pub const AUTHORIZE_URL: &str = "https://www.dailymotion.com/oauth/authorize";
pub const VIDEO_PAGE_URL: &str = "https://www.dailymotion.com/embed/video";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoints and transport settings shared by every request of a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,
    pub token_url: Url,
    pub revoke_url: Url,
    pub authorize_url: Url,
    /// Base of the embed pages read to resolve stream URLs
    pub video_page_url: Url,
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl ClientConfig {
    /// Configuration pointing at the public Dailymotion endpoints
    pub fn new() -> Result<Self, DailymotionError> {
        let mut config = Self::with_api_origin(API_ORIGIN)?;
        config.timeout = Some(DEFAULT_TIMEOUT);
        Ok(config)
    }

    /// Rebases the Data API and OAuth2 token endpoints onto `origin`
    pub fn with_api_origin(origin: &str) -> Result<Self, DailymotionError> {
        let api_url = Url::parse(origin)?;
        Ok(Self {
            token_url: api_url.join(TOKEN_PATH)?,
            revoke_url: api_url.join(REVOKE_TOKEN_PATH)?,
            api_url,
            authorize_url: Url::parse(AUTHORIZE_URL)?,
            video_page_url: Url::parse(VIDEO_PAGE_URL)?,
            timeout: None,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        })
    }
}

/// Entry point of the library: hands out requests and models that share a
/// transport, a configuration and a default set of credentials.
///
/// Every object created gets its own copy of the credentials, so a refresh
/// performed by one does not reach the others.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    creds: Creds,
}

impl Client {
    pub fn new(creds: Creds) -> Result<Self, DailymotionError> {
        Self::with_config(creds, ClientConfig::new()?)
    }

    pub fn with_config(creds: Creds, config: ClientConfig) -> Result<Self, DailymotionError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(creds, config, Arc::new(transport)))
    }

    /// Builds a client over any [`Transport`]
    pub fn with_transport(creds: Creds, config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: Arc::new(config),
            creds,
        }
    }

    pub fn creds(&self) -> &Creds {
        &self.creds
    }

    /// Credentials given to objects created from now on
    pub fn set_creds(&mut self, creds: Creds) {
        self.creds = creds;
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A bare request, for calls the typed helpers do not cover
    pub fn request(&self) -> Request {
        Request::new(self.transport.clone(), self.config.clone(), self.creds.clone())
    }

    pub fn resources(&self) -> ResourcesRequest {
        ResourcesRequest::new(self.transport.clone(), self.config.clone(), self.creds.clone())
    }

    /// Model over arbitrary resource paths, with fields taken from the data
    pub fn resources_model(&self) -> ListModel {
        ListModel::new(None, self.resources())
    }

    pub fn resource(&self, kind: ResourceType) -> TypedRequest {
        TypedRequest::new(kind, self.transport.clone(), self.config.clone(), self.creds.clone())
    }

    pub fn model(&self, kind: ResourceType) -> ListModel {
        ListModel::new(Some(kind), self.resources())
    }

    pub fn streams(&self) -> StreamsRequest {
        StreamsRequest::new(self.request())
    }

    pub fn streams_model(&self) -> StreamsModel {
        StreamsModel::new(self.streams())
    }

    pub fn authentication(&self) -> Authentication {
        Authentication::new(self.request())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("creds", &self.creds)
            .finish()
    }
}

resource_constructors! {
    Activities => activities, activities_model;
    Channels => channels, channels_model;
    Comments => comments, comments_model;
    Contests => contests, contests_model;
    Groups => groups, groups_model;
    Locales => locales, locales_model;
    Playlists => playlists, playlists_model;
    Reports => reports, reports_model;
    Strongtags => strongtags, strongtags_model;
    Subtitles => subtitles, subtitles_model;
    Users => users, users_model;
    Videos => videos, videos_model;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_endpoints() {
        let config = ClientConfig::new().unwrap();
        assert_eq!(config.api_url.as_str(), "https://api.dailymotion.com/");
        assert_eq!(config.token_url.as_str(), "https://api.dailymotion.com/oauth/token");
        assert_eq!(config.revoke_url.as_str(), "https://api.dailymotion.com/logout");
        assert_eq!(config.timeout, Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn rebased_endpoints() {
        let config = ClientConfig::with_api_origin("http://localhost:8080").unwrap();
        assert_eq!(config.token_url.as_str(), "http://localhost:8080/oauth/token");
        assert_eq!(config.authorize_url.as_str(), AUTHORIZE_URL);
    }
}
