/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::api::encoding::{api_url, append_query, encode_body, join_id, page_number};
use crate::api::request::{CallSpec, PendingCall, Target};
use crate::api::{
    ClientConfig, Creds, DailymotionError, InsertStyle, Operation, Request, ResourceAction,
    ResourceType, Status, Transport,
};
use async_stream::try_stream;
use futures::Stream;
use serde_json::{Map, Value};
use std::ops::Deref;
use std::sync::Arc;

/// One record of the Data API, as returned by the server
pub type Resource = Map<String, Value>;

/// Query parameters of a list call (`limit`, `page`, `search`, `sort`, ...)
pub type Filters = Map<String, Value>;

/// A call whose target has been resolved but which has not been issued yet.
pub(crate) struct PreparedCall {
    target: Target,
    spec: CallSpec,
}

/// One page of a list response
#[derive(Debug, Default)]
pub(crate) struct Page {
    pub items: Vec<Resource>,
    pub has_more: bool,
}

impl Page {
    pub fn from_result(result: &Value) -> Self {
        let has_more = result
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let items = result
            .get("list")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default();
        Self { items, has_more }
    }
}

/// Turns a terminal status into a Rust error, for callers that want `?`.
pub(crate) fn check_status(request: &Request, status: Status) -> Result<(), DailymotionError> {
    match status {
        Status::Ready => Ok(()),
        Status::Loading => Err(DailymotionError::Busy()),
        Status::Canceled => Err(DailymotionError::Canceled()),
        _ => Err(DailymotionError::ApiResponse {
            error: request.error(),
            message: request.error_string(),
        }),
    }
}

/// Access to any Data API resource by path.
///
/// ```text
/// list("/user/x1fz/videos", {"limit": 10}, ["id", "title"])
///   GET https://api.dailymotion.com/user/x1fz/videos?limit=10&fields=id,title
/// ```
pub struct ResourcesRequest {
    request: Request,
}

impl ResourcesRequest {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<ClientConfig>, creds: Creds) -> Self {
        Self {
            request: Request::new(transport, config, creds),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Lists the resources in `resource_path`
    pub async fn list(
        &self,
        resource_path: &str,
        filters: &Filters,
        fields: &[&str],
    ) -> Result<Status, DailymotionError> {
        let call = self.prepare_list(resource_path, filters, fields)?;
        self.run(call).await
    }

    /// Retrieves the single resource at `resource_path`
    pub async fn get(
        &self,
        resource_path: &str,
        filters: &Filters,
        fields: &[&str],
    ) -> Result<Status, DailymotionError> {
        let call = self.prepare_list(resource_path, filters, fields)?;
        self.run(call).await
    }

    /// Creates `resource` in `resource_path`
    pub async fn insert(
        &self,
        resource: &Resource,
        resource_path: &str,
    ) -> Result<Status, DailymotionError> {
        let call = self.prepare_insert(resource, resource_path)?;
        self.run(call).await
    }

    /// POST without a body, e.g. `/me/favorites/<video id>`
    pub async fn insert_at(&self, resource_path: &str) -> Result<Status, DailymotionError> {
        let call = self.prepare_insert_at(resource_path)?;
        self.run(call).await
    }

    pub async fn update(
        &self,
        resource_path: &str,
        resource: &Resource,
    ) -> Result<Status, DailymotionError> {
        let call = self.prepare_update(resource_path, resource)?;
        self.run(call).await
    }

    pub async fn del(&self, resource_path: &str) -> Result<Status, DailymotionError> {
        let call = self.prepare_del(resource_path)?;
        self.run(call).await
    }

    /// Streams every record of `resource_path`, walking the pages until the
    /// server reports no more.
    pub fn items<'a>(
        &'a self,
        resource_path: &'a str,
        filters: &'a Filters,
        fields: &'a [&'a str],
    ) -> impl Stream<Item = Result<Resource, DailymotionError>> + 'a {
        try_stream! {
            let mut filters = filters.clone();
            let mut page = filters.get("page").map_or(1, page_number).max(1);
            loop {
                filters.insert("page".to_string(), page.into());
                let call = self.prepare_list(resource_path, &filters, fields)?;
                let status = self.run(call).await?;
                check_status(&self.request, status)?;

                let Page { items, has_more } = Page::from_result(&self.request.result());
                for item in items {
                    yield item;
                }
                if !has_more {
                    break;
                }
                page += 1;
            }
        }
    }

    pub(crate) fn prepare_list(
        &self,
        resource_path: &str,
        filters: &Filters,
        fields: &[&str],
    ) -> Result<PreparedCall, DailymotionError> {
        let mut url = api_url(&self.request.config().api_url, resource_path)?;
        append_query(&mut url, filters, fields);
        Ok(PreparedCall {
            target: Target::new(url),
            spec: CallSpec::api(Operation::Get),
        })
    }

    pub(crate) fn prepare_insert(
        &self,
        resource: &Resource,
        resource_path: &str,
    ) -> Result<PreparedCall, DailymotionError> {
        let url = api_url(&self.request.config().api_url, resource_path)?;
        Ok(PreparedCall {
            target: Target::new(url).with_data(encode_body(resource)),
            spec: CallSpec::api(Operation::Post),
        })
    }

    pub(crate) fn prepare_insert_at(
        &self,
        resource_path: &str,
    ) -> Result<PreparedCall, DailymotionError> {
        let url = api_url(&self.request.config().api_url, resource_path)?;
        Ok(PreparedCall {
            target: Target::new(url),
            spec: CallSpec::api(Operation::Post),
        })
    }

    pub(crate) fn prepare_update(
        &self,
        resource_path: &str,
        resource: &Resource,
    ) -> Result<PreparedCall, DailymotionError> {
        self.prepare_insert(resource, resource_path)
    }

    pub(crate) fn prepare_del(&self, resource_path: &str) -> Result<PreparedCall, DailymotionError> {
        let url = api_url(&self.request.config().api_url, resource_path)?;
        Ok(PreparedCall {
            target: Target::new(url),
            spec: CallSpec::api(Operation::Delete),
        })
    }

    /// Starts a prepared call, or `None` if one is already in flight
    pub(crate) fn start(
        &self,
        call: PreparedCall,
    ) -> Result<Option<PendingCall<'_>>, DailymotionError> {
        self.request.begin(Some(call.target), call.spec)
    }

    async fn run(&self, call: PreparedCall) -> Result<Status, DailymotionError> {
        self.request.call(Some(call.target), call.spec).await
    }
}

impl Deref for ResourcesRequest {
    type Target = Request;

    fn deref(&self) -> &Self::Target {
        &self.request
    }
}

impl std::fmt::Debug for ResourcesRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ResourcesRequest").field(&self.request).finish()
    }
}

// Path resolution of the named resource types. Every method refuses an action
// the type does not support before anything is sent.
impl ResourceType {
    fn require(self, action: ResourceAction) -> Result<(), DailymotionError> {
        if self.supports(action) {
            Ok(())
        } else {
            Err(DailymotionError::UnsupportedOperation(self, action))
        }
    }

    fn singular(self, action: ResourceAction) -> Result<&'static str, DailymotionError> {
        self.singular_path()
            .ok_or(DailymotionError::UnsupportedOperation(self, action))
    }

    pub(crate) fn list_path(self, resource_path: Option<&str>) -> Result<String, DailymotionError> {
        self.require(ResourceAction::List)?;
        Ok(resource_path.unwrap_or(self.collection_path()).to_string())
    }

    pub(crate) fn get_path(self, id: &str) -> Result<String, DailymotionError> {
        self.require(ResourceAction::Get)?;
        Ok(join_id(self.singular(ResourceAction::Get)?, id))
    }

    pub(crate) fn insert_path(self, resource_path: Option<&str>) -> Result<String, DailymotionError> {
        self.require(ResourceAction::Insert)?;
        if self.insert_style() != InsertStyle::Body {
            return Err(DailymotionError::UnsupportedOperation(self, ResourceAction::Insert));
        }
        Ok(resource_path
            .or(self.default_insert_path())
            .unwrap_or(self.collection_path())
            .to_string())
    }

    pub(crate) fn relation_path(self, id: &str, resource_path: &str) -> Result<String, DailymotionError> {
        self.require(ResourceAction::Insert)?;
        if self.insert_style() != InsertStyle::Relation {
            return Err(DailymotionError::UnsupportedOperation(self, ResourceAction::Insert));
        }
        Ok(join_id(resource_path, id))
    }

    pub(crate) fn update_path(self, id: &str) -> Result<String, DailymotionError> {
        self.require(ResourceAction::Update)?;
        Ok(join_id(self.singular(ResourceAction::Update)?, id))
    }

    pub(crate) fn del_path(self, id: &str, resource_path: Option<&str>) -> Result<String, DailymotionError> {
        self.require(ResourceAction::Delete)?;
        match resource_path {
            Some(path) if !path.is_empty() => Ok(join_id(path, id)),
            _ => Ok(join_id(self.singular(ResourceAction::Delete)?, id)),
        }
    }

    /// Fields requested when the caller names none
    pub(crate) fn fields_or_default<'a>(self, fields: &'a [&'a str]) -> &'a [&'a str] {
        if fields.is_empty() {
            self.default_fields()
        } else {
            fields
        }
    }
}

/// A named resource type (videos, users, playlists, ...) over the generic
/// resource mechanics.
pub struct TypedRequest {
    kind: ResourceType,
    resources: ResourcesRequest,
}

impl TypedRequest {
    pub fn new(
        kind: ResourceType,
        transport: Arc<dyn Transport>,
        config: Arc<ClientConfig>,
        creds: Creds,
    ) -> Self {
        Self {
            kind,
            resources: ResourcesRequest::new(transport, config, creds),
        }
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    /// Lists `resource_path`, or the type's own collection when `None`.
    ///
    /// An empty `fields` requests the type's default fields.
    pub async fn list(
        &self,
        resource_path: Option<&str>,
        filters: &Filters,
        fields: &[&str],
    ) -> Result<Status, DailymotionError> {
        let path = self.kind.list_path(resource_path)?;
        let fields = self.kind.fields_or_default(fields);
        self.resources.list(&path, filters, fields).await
    }

    pub async fn get(
        &self,
        id: &str,
        filters: &Filters,
        fields: &[&str],
    ) -> Result<Status, DailymotionError> {
        let path = self.kind.get_path(id)?;
        let fields = self.kind.fields_or_default(fields);
        self.resources.get(&path, filters, fields).await
    }

    /// Creates `resource`, in `resource_path` or the type's default collection
    pub async fn insert(
        &self,
        resource: &Resource,
        resource_path: Option<&str>,
    ) -> Result<Status, DailymotionError> {
        let path = self.kind.insert_path(resource_path)?;
        self.resources.insert(resource, &path).await
    }

    /// Adds the existing resource `id` to the collection at `resource_path`
    pub async fn insert_relation(
        &self,
        id: &str,
        resource_path: &str,
    ) -> Result<Status, DailymotionError> {
        let path = self.kind.relation_path(id, resource_path)?;
        self.resources.insert_at(&path).await
    }

    pub async fn update(&self, id: &str, resource: &Resource) -> Result<Status, DailymotionError> {
        let path = self.kind.update_path(id)?;
        self.resources.update(&path, resource).await
    }

    /// Deletes `id`, or removes it from the relation at `resource_path`
    pub async fn del(&self, id: &str, resource_path: Option<&str>) -> Result<Status, DailymotionError> {
        let path = self.kind.del_path(id, resource_path)?;
        self.resources.del(&path).await
    }

    pub fn items<'a>(
        &'a self,
        resource_path: Option<&'a str>,
        filters: &'a Filters,
        fields: &'a [&'a str],
    ) -> impl Stream<Item = Result<Resource, DailymotionError>> + 'a {
        try_stream! {
            let path = self.kind.list_path(resource_path)?;
            let fields = self.kind.fields_or_default(fields);
            let items = self.resources.items(&path, filters, fields);
            futures::pin_mut!(items);
            while let Some(item) = futures::StreamExt::next(&mut items).await {
                yield item?;
            }
        }
    }
}

impl Deref for TypedRequest {
    type Target = Request;

    fn deref(&self) -> &Self::Target {
        &self.resources
    }
}

impl std::fmt::Debug for TypedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedRequest")
            .field("kind", &self.kind)
            .field("request", self.resources.request())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn pages_are_read_from_the_envelope() {
        let page = Page::from_result(&json!({
            "page": 1,
            "has_more": true,
            "list": [{"id": "v1"}, "junk", {"id": "v2"}]
        }));
        assert!(page.has_more);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].get("id"), Some(&json!("v2")));

        let page = Page::from_result(&json!({"id": "v1"}));
        assert!(!page.has_more);
        assert!(page.items.is_empty());
    }

    #[test]
    fn typed_paths() {
        assert_eq!(ResourceType::Videos.list_path(None).unwrap(), "/videos");
        assert_eq!(
            ResourceType::Videos.list_path(Some("/user/42/videos")).unwrap(),
            "/user/42/videos"
        );
        assert_eq!(ResourceType::Videos.get_path("x7").unwrap(), "/video/x7");
        assert_eq!(ResourceType::Videos.del_path("x7", None).unwrap(), "/video/x7");
        assert_eq!(
            ResourceType::Videos.del_path("x7", Some("/me/favorites")).unwrap(),
            "/me/favorites/x7"
        );
        assert_eq!(
            ResourceType::Users.relation_path("u1", "/me/following").unwrap(),
            "/me/following/u1"
        );
        assert_eq!(ResourceType::Playlists.insert_path(None).unwrap(), "/me/playlists");
        assert_eq!(
            ResourceType::Comments.insert_path(Some("/video/x7/comments")).unwrap(),
            "/video/x7/comments"
        );
    }

    #[test]
    fn unsupported_actions_are_refused() {
        assert!(matches!(
            ResourceType::Locales.get_path("fr"),
            Err(DailymotionError::UnsupportedOperation(ResourceType::Locales, ResourceAction::Get))
        ));
        assert!(matches!(
            ResourceType::Videos.insert_path(None),
            Err(DailymotionError::UnsupportedOperation(_, ResourceAction::Insert))
        ));
        assert!(matches!(
            ResourceType::Playlists.relation_path("p1", "/me/playlists"),
            Err(DailymotionError::UnsupportedOperation(_, ResourceAction::Insert))
        ));
        assert!(ResourceType::Channels.update_path("c1").is_err());
    }

    #[test]
    fn default_fields_fill_empty_projections() {
        assert_eq!(
            ResourceType::Users.fields_or_default(&[]),
            &["id", "screenname"]
        );
        assert_eq!(ResourceType::Users.fields_or_default(&["id", "avatar_url"]), &["id", "avatar_url"]);
    }
}
