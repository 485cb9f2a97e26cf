/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::api::encoding::{join_id, page_number};
use crate::api::parsers::identity_of;
use crate::api::resources::{Page, PreparedCall};
use crate::api::{
    DailymotionError, Filters, Request, RequestError, Resource, ResourceAction, ResourceType,
    ResourcesRequest, Status,
};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

const ID_FIELD: &str = "id";
const EVENT_CAPACITY: usize = 256;

/// Changes published by a [`ListModel`].
///
/// Row ranges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEvent {
    StatusChanged(Status),
    CountChanged(usize),
    RowsInserted { first: usize, last: usize },
    RowsRemoved { first: usize, last: usize },
    DataChanged { row: usize },
    /// All rows were dropped
    Reset,
}

#[derive(Debug, Default)]
struct ModelState {
    items: Vec<Resource>,
    field_names: Vec<String>,
    resource_path: String,
    filters: Filters,
    fields: Vec<String>,
    has_more: bool,
}

/// An ordered, paginated collection of resources kept in sync with the
/// Data API through a request it owns.
///
/// Only one call runs at a time: `list`, `fetch_more`, `reload` and the write
/// operations return `Ok(Status::Loading)` without doing anything while a
/// call is in flight. Write completions find their row again by `id`, so
/// rows may move or disappear while a write is pending.
pub struct ListModel {
    kind: Option<ResourceType>,
    resources: ResourcesRequest,
    state: Mutex<ModelState>,
    events: broadcast::Sender<ModelEvent>,
}

impl ListModel {
    /// A model of `kind` resources, or of any path when `kind` is `None`
    pub fn new(kind: Option<ResourceType>, resources: ResourcesRequest) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            kind,
            resources,
            state: Mutex::new(ModelState::default()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ModelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ModelEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModelEvent> {
        self.events.subscribe()
    }

    pub fn kind(&self) -> Option<ResourceType> {
        self.kind
    }

    /// The request the model drives
    pub fn request(&self) -> &Request {
        &self.resources
    }

    pub fn status(&self) -> Status {
        self.resources.status()
    }

    pub fn error(&self) -> RequestError {
        self.resources.error()
    }

    pub fn error_string(&self) -> String {
        self.resources.error_string()
    }

    pub fn client_id(&self) -> String {
        self.resources.client_id()
    }

    pub fn set_client_id(&self, client_id: &str) {
        self.resources.set_client_id(client_id)
    }

    pub fn client_secret(&self) -> String {
        self.resources.client_secret()
    }

    pub fn set_client_secret(&self, client_secret: &str) {
        self.resources.set_client_secret(client_secret)
    }

    pub fn access_token(&self) -> String {
        self.resources.access_token()
    }

    pub fn set_access_token(&self, token: &str) {
        self.resources.set_access_token(token)
    }

    pub fn refresh_token(&self) -> String {
        self.resources.refresh_token()
    }

    pub fn set_refresh_token(&self, token: &str) {
        self.resources.set_refresh_token(token)
    }

    pub fn count(&self) -> usize {
        self.lock().items.len()
    }

    pub fn get(&self, row: usize) -> Option<Resource> {
        self.lock().items.get(row).cloned()
    }

    /// Value of one field of one row
    pub fn data(&self, row: usize, field: &str) -> Option<Value> {
        self.lock().items.get(row)?.get(field).cloned()
    }

    pub fn items(&self) -> Vec<Resource> {
        self.lock().items.clone()
    }

    /// Ordered names of the fields exposed for each row
    pub fn field_names(&self) -> Vec<String> {
        self.lock().field_names.clone()
    }

    pub fn resource_path(&self) -> String {
        self.lock().resource_path.clone()
    }

    pub fn filters(&self) -> Filters {
        self.lock().filters.clone()
    }

    pub fn fields(&self) -> Vec<String> {
        self.lock().fields.clone()
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn can_fetch_more(&self) -> bool {
        self.status() != Status::Loading && self.has_more()
    }

    /// Replaces a row locally
    pub fn set(&self, row: usize, resource: Resource) -> Result<(), DailymotionError> {
        {
            let mut state = self.lock();
            let item = state
                .items
                .get_mut(row)
                .ok_or(DailymotionError::RowOutOfRange(row))?;
            *item = resource;
        }
        self.emit(ModelEvent::DataChanged { row });
        Ok(())
    }

    /// Appends rows locally
    pub fn append(&self, resources: Vec<Resource>) {
        if resources.is_empty() {
            return;
        }
        let (first, last) = {
            let mut state = self.lock();
            let first = state.items.len();
            state.items.extend(resources);
            (first, state.items.len() - 1)
        };
        self.emit(ModelEvent::RowsInserted { first, last });
        self.emit(ModelEvent::CountChanged(last + 1));
    }

    /// Removes a row locally
    pub fn remove(&self, row: usize) -> Result<Resource, DailymotionError> {
        let (removed, count) = {
            let mut state = self.lock();
            if row >= state.items.len() {
                return Err(DailymotionError::RowOutOfRange(row));
            }
            let removed = state.items.remove(row);
            (removed, state.items.len())
        };
        self.emit(ModelEvent::RowsRemoved {
            first: row,
            last: row,
        });
        self.emit(ModelEvent::CountChanged(count));
        Ok(removed)
    }

    /// Drops every row
    pub fn clear(&self) {
        let had_items = {
            let mut state = self.lock();
            state.has_more = false;
            let had_items = !state.items.is_empty();
            state.items.clear();
            had_items
        };
        self.emit(ModelEvent::Reset);
        if had_items {
            self.emit(ModelEvent::CountChanged(0));
        }
    }

    /// Loads the first page of `resource_path`, replacing the current rows.
    ///
    /// For typed models an empty `fields` selects the type's default fields.
    /// When fields are named, `id` is always requested as well.
    pub async fn list(
        &self,
        resource_path: &str,
        filters: &Filters,
        fields: &[&str],
    ) -> Result<Status, DailymotionError> {
        if self.status() == Status::Loading {
            return Ok(Status::Loading);
        }
        let path = match self.kind {
            Some(kind) => kind.list_path((!resource_path.is_empty()).then_some(resource_path))?,
            None => resource_path.to_string(),
        };
        let fields = self.projection(fields);
        self.run_list(path, filters.clone(), fields, true).await
    }

    /// Loads the next page, appending its rows.
    ///
    /// Does nothing unless [`ListModel::can_fetch_more`].
    pub async fn fetch_more(&self) -> Result<Status, DailymotionError> {
        let (path, mut filters, fields) = {
            let state = self.lock();
            if !state.has_more {
                return Ok(self.status());
            }
            (
                state.resource_path.clone(),
                state.filters.clone(),
                state.fields.clone(),
            )
        };
        if self.status() == Status::Loading {
            return Ok(Status::Loading);
        }
        let page = filters.get("page").map_or(0, page_number);
        let next = if page > 0 { page + 1 } else { 2 };
        filters.insert("page".to_string(), next.into());
        self.run_list(path, filters, fields, false).await
    }

    /// Lists the current path again from the first page
    pub async fn reload(&self) -> Result<Status, DailymotionError> {
        if self.status() == Status::Loading {
            return Ok(Status::Loading);
        }
        let (path, mut filters, fields) = {
            let state = self.lock();
            (
                state.resource_path.clone(),
                state.filters.clone(),
                state.fields.clone(),
            )
        };
        if path.is_empty() {
            return Err(DailymotionError::UrlMissing());
        }
        if filters.get("page").is_some_and(|p| !p.is_null()) {
            filters.insert("page".to_string(), 1.into());
        }
        self.run_list(path, filters, fields, true).await
    }

    /// Creates `resource` and, if it belongs to the listed collection, shows
    /// it as the first row.
    pub async fn insert(&self, resource: &Resource) -> Result<Status, DailymotionError> {
        if self.status() == Status::Loading {
            return Ok(Status::Loading);
        }
        let current = self.resource_path();
        let write_path = match self.kind {
            Some(kind) => {
                let path = (!current.is_empty()).then_some(current.as_str());
                kind.insert_path(kind.default_insert_path().or(path))?
            }
            None if current.is_empty() => return Err(DailymotionError::UrlMissing()),
            None => current,
        };
        let call = self.resources.prepare_insert(resource, &write_path)?;
        self.run_insert(call, write_path).await
    }

    /// Adds the resource at `row` to the collection at `resource_path`
    pub async fn insert_relation(
        &self,
        row: usize,
        resource_path: &str,
    ) -> Result<Status, DailymotionError> {
        if self.status() == Status::Loading {
            return Ok(Status::Loading);
        }
        let id = self.identity(row)?;
        let target = match self.kind {
            Some(kind) => kind.relation_path(&id, resource_path)?,
            None => join_id(resource_path, &id),
        };
        let call = self.resources.prepare_insert_at(&target)?;
        self.run_insert(call, resource_path.to_string()).await
    }

    /// Updates the resource at `row`. The row is located again by `id` when
    /// the server answers.
    pub async fn update(&self, row: usize, resource: &Resource) -> Result<Status, DailymotionError> {
        if self.status() == Status::Loading {
            return Ok(Status::Loading);
        }
        let id = self.identity(row)?;
        let target = match self.kind {
            Some(kind) => kind.update_path(&id)?,
            None => join_id(&self.active_path()?, &id),
        };
        let call = self.resources.prepare_update(&target, resource)?;
        let Some(pending) = self.resources.start(call)? else {
            return Ok(Status::Loading);
        };
        self.emit(ModelEvent::StatusChanged(Status::Loading));
        let status = pending.wait().await;

        if status == Status::Ready {
            if let Some(updated) = self.resources.result().as_object().filter(|r| !r.is_empty()) {
                self.replace_by_id(&id, updated.clone());
            }
        }
        self.emit(ModelEvent::StatusChanged(status));
        Ok(status)
    }

    /// Deletes the resource at `row`, or removes it from the relation at
    /// `resource_path`. The row is located again by `id` when the server
    /// answers.
    pub async fn del(
        &self,
        row: usize,
        resource_path: Option<&str>,
    ) -> Result<Status, DailymotionError> {
        if self.status() == Status::Loading {
            return Ok(Status::Loading);
        }
        let id = self.identity(row)?;
        let resource_path = resource_path.filter(|path| !path.is_empty());
        // `None`: the removal applies whatever is listed by then
        let (target, write_path) = match (self.kind, resource_path) {
            (Some(kind), None) => (kind.del_path(&id, None)?, None),
            (Some(kind), Some(path)) => (kind.del_path(&id, Some(path))?, Some(path.to_string())),
            (None, path) => {
                let path = match path {
                    Some(path) => path.to_string(),
                    None => self.active_path()?,
                };
                (join_id(&path, &id), Some(path))
            }
        };
        let call = self.resources.prepare_del(&target)?;
        let Some(pending) = self.resources.start(call)? else {
            return Ok(Status::Loading);
        };
        self.emit(ModelEvent::StatusChanged(Status::Loading));
        let status = pending.wait().await;

        if status == Status::Ready && self.is_current(write_path.as_deref()) {
            self.remove_by_id(&id);
        }
        self.emit(ModelEvent::StatusChanged(status));
        Ok(status)
    }

    pub fn cancel(&self) {
        self.resources.cancel()
    }

    fn projection(&self, fields: &[&str]) -> Vec<String> {
        let mut fields: Vec<String> = match self.kind {
            Some(kind) => kind.fields_or_default(fields),
            None => fields,
        }
        .iter()
        .map(|f| f.to_string())
        .collect();
        let addressable = self.kind.is_none_or(|k| k.supports(ResourceAction::Get));
        if addressable && !fields.is_empty() && !fields.iter().any(|f| f == ID_FIELD) {
            fields.push(ID_FIELD.to_string());
        }
        fields
    }

    fn identity(&self, row: usize) -> Result<String, DailymotionError> {
        let state = self.lock();
        let item = state
            .items
            .get(row)
            .ok_or(DailymotionError::RowOutOfRange(row))?;
        identity_of(item, ID_FIELD).ok_or(DailymotionError::MissingIdentity(row))
    }

    fn active_path(&self) -> Result<String, DailymotionError> {
        let path = self.resource_path();
        if path.is_empty() {
            Err(DailymotionError::UrlMissing())
        } else {
            Ok(path)
        }
    }

    fn is_current(&self, write_path: Option<&str>) -> bool {
        write_path.is_none_or(|path| self.lock().resource_path == path)
    }

    async fn run_list(
        &self,
        path: String,
        filters: Filters,
        fields: Vec<String>,
        replace: bool,
    ) -> Result<Status, DailymotionError> {
        let field_refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        let call = self.resources.prepare_list(&path, &filters, &field_refs)?;
        let Some(pending) = self.resources.start(call)? else {
            return Ok(Status::Loading);
        };

        // A next page only becomes the current query once it has arrived
        let mut next_page = None;
        let had_items = {
            let mut state = self.lock();
            let had_items = replace && !state.items.is_empty();
            if replace {
                state.items.clear();
                state.has_more = false;
                state.field_names = match self.kind {
                    Some(_) => fields.clone(),
                    None => Vec::new(),
                };
                state.resource_path = path;
                state.filters = filters;
                state.fields = fields;
            } else {
                next_page = Some(filters);
            }
            had_items
        };
        if replace {
            self.emit(ModelEvent::Reset);
        }
        if had_items {
            self.emit(ModelEvent::CountChanged(0));
        }
        self.emit(ModelEvent::StatusChanged(Status::Loading));

        let status = pending.wait().await;
        if status == Status::Ready {
            if let Some(filters) = next_page {
                self.lock().filters = filters;
            }
            self.append_page(Page::from_result(&self.resources.result()));
        }
        self.emit(ModelEvent::StatusChanged(status));
        Ok(status)
    }

    // One batch, one notification, whatever the page size
    fn append_page(&self, page: Page) {
        let inserted = {
            let mut state = self.lock();
            state.has_more = page.has_more;
            if page.items.is_empty() {
                None
            } else {
                if self.kind.is_none() && state.items.is_empty() {
                    state.field_names = page.items[0].keys().cloned().collect();
                }
                let first = state.items.len();
                state.items.extend(page.items);
                Some((first, state.items.len() - 1))
            }
        };
        if let Some((first, last)) = inserted {
            log::debug!("Model appended rows {first}..={last}");
            self.emit(ModelEvent::RowsInserted { first, last });
            self.emit(ModelEvent::CountChanged(last + 1));
        }
    }

    async fn run_insert(
        &self,
        call: PreparedCall,
        write_path: String,
    ) -> Result<Status, DailymotionError> {
        let Some(pending) = self.resources.start(call)? else {
            return Ok(Status::Loading);
        };
        self.emit(ModelEvent::StatusChanged(Status::Loading));
        let status = pending.wait().await;

        if status == Status::Ready {
            let created = self.resources.result().as_object().filter(|r| !r.is_empty()).cloned();
            if let Some(created) = created {
                self.prepend_if_current(&write_path, created);
            }
        }
        self.emit(ModelEvent::StatusChanged(status));
        Ok(status)
    }

    fn prepend_if_current(&self, write_path: &str, resource: Resource) {
        let count = {
            let mut state = self.lock();
            if state.resource_path != write_path {
                log::debug!("Dropping insert into {write_path}, model now lists {}", state.resource_path);
                return;
            }
            state.items.insert(0, resource);
            state.items.len()
        };
        self.emit(ModelEvent::RowsInserted { first: 0, last: 0 });
        self.emit(ModelEvent::CountChanged(count));
    }

    fn replace_by_id(&self, id: &str, resource: Resource) {
        let row = {
            let mut state = self.lock();
            let row = state
                .items
                .iter()
                .position(|item| identity_of(item, ID_FIELD).as_deref() == Some(id));
            if let Some(row) = row {
                state.items[row] = resource;
            }
            row
        };
        match row {
            Some(row) => self.emit(ModelEvent::DataChanged { row }),
            None => log::debug!("Updated resource {id} is no longer listed"),
        }
    }

    fn remove_by_id(&self, id: &str) {
        let removed = {
            let mut state = self.lock();
            let row = state
                .items
                .iter()
                .position(|item| identity_of(item, ID_FIELD).as_deref() == Some(id));
            row.map(|row| {
                state.items.remove(row);
                (row, state.items.len())
            })
        };
        match removed {
            Some((row, count)) => {
                self.emit(ModelEvent::RowsRemoved {
                    first: row,
                    last: row,
                });
                self.emit(ModelEvent::CountChanged(count));
            }
            None => log::debug!("Deleted resource {id} is no longer listed"),
        }
    }
}

impl std::fmt::Debug for ListModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ListModel")
            .field("kind", &self.kind)
            .field("resource_path", &state.resource_path)
            .field("count", &state.items.len())
            .field("has_more", &state.has_more)
            .finish()
    }
}
