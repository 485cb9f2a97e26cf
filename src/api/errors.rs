/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

use crate::api::{RequestError, ResourceAction, ResourceType};
use thiserror::Error;

/// Error conditions that can be returned before a call reaches the network,
/// or when a terminal request state has to be surfaced as a Rust error.
#[derive(Error, Debug)]
pub enum DailymotionError {
    #[error("Request network error")]
    Request(#[from] reqwest::Error),

    #[error("Deserialization error")]
    Deserialization(#[from] serde_json::Error),

    #[error("URL Parse error")]
    UrlParsing(#[from] url::ParseError),

    #[error("No URL has been set for this request")]
    UrlMissing(),

    #[error("{1} is not supported for {0} resources")]
    UnsupportedOperation(ResourceType, ResourceAction),

    #[error("Row {0} is out of range")]
    RowOutOfRange(usize),

    #[error("Row {0} has no identity field")]
    MissingIdentity(usize),

    #[error("Missing configuration value: {0}")]
    MissingConfig(String),

    #[error("API call failed: {error}, msg: {message}")]
    ApiResponse { error: RequestError, message: String },

    #[error("API call was canceled")]
    Canceled(),

    #[error("Another call is already in flight on this request")]
    Busy(),
}
