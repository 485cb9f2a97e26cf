/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

mod encoding;
mod macros;
mod parsers;
pub mod auth;
pub mod client;
pub mod creds;
pub mod errors;
pub mod model;
pub mod properties;
pub mod request;
pub mod resources;
pub mod status;
pub mod streams;
pub mod transport;

pub use auth::*;
pub use client::*;
pub use creds::*;
pub use errors::*;
pub use model::*;
pub use properties::*;
pub use request::{Request, RequestEvent, MAX_REDIRECTS};
pub use resources::{Filters, Resource, ResourcesRequest, TypedRequest};
pub use status::{HttpStatusCodes, Operation, RequestError, Status};
pub use streams::*;
pub use transport::*;
