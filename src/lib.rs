/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

//! # Dailymotion
//!
//! This library was created for working with the Dailymotion Data API.
//!
//! For further details on the REST API refer to the [Dailymotion API Docs](https://developers.dailymotion.com/api/)
//!
//! ## Features
//!
//! - Requests against any resource path (list/get/insert/update/delete)
//! - Named resource types (videos, users, playlists, comments, ...)
//!     - Unsupported operations are refused before anything is sent
//! - Paginated list models
//!     - `fetch_more`/`reload` over the last listing
//!     - Writes find their row again by `id` when the server answers
//! - OAuth2
//!     - Authorization code and password exchanges, token revocation
//!     - Expired access tokens are refreshed and the call retried once
//! - Video stream URL resolution
//!
//! *Every call reports its outcome as a [`api::Status`] along with an
//! [`api::RequestError`] and an error string, the same way whether it was a
//! network, HTTP or content failure*
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! dailymotion = "0.1.0"
//! ```
//!
//! ## Usage
//!
//! **You will need a Dailymotion API key/secret to use authenticated endpoints**
//!
//! ```rust,no_run
//! use dailymotion::api::{Client, Creds, Filters, Status};
//! use serde_json::json;
//!
//! async fn print_titles(client_id: &str, access_token: &str, refresh_token: &str) -> anyhow::Result<()> {
//!     let client = Client::new(Creds::from_tokens(
//!         client_id,
//!         None,
//!         Some(access_token),
//!         Some(refresh_token),
//!     ))?;
//!
//!     let model = client.videos_model();
//!     let filters: Filters = json!({"search": "rust", "limit": 10})
//!         .as_object()
//!         .cloned()
//!         .unwrap_or_default();
//!
//!     // First page, then the rest
//!     let mut status = model.list("/videos", &filters, &["title"]).await?;
//!     while status == Status::Ready && model.can_fetch_more() {
//!         status = model.fetch_more().await?;
//!     }
//!     if status != Status::Ready {
//!         anyhow::bail!("{}: {}", model.error(), model.error_string());
//!     }
//!
//!     for video in model.items() {
//!         println!("{}", video["title"]);
//!     }
//!     Ok(())
//! }
//! ```
//!
pub mod api;
