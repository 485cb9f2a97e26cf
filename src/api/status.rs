/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display, IntoStaticStr};

/// Lifecycle of a request (and of the models built on one).
///
/// A call moves `Null|Ready|Failed|Canceled -> Loading -> Ready|Failed|Canceled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
pub enum Status {
    #[default]
    Null,
    Loading,
    Ready,
    Failed,
    Canceled,
}

impl Status {
    /// True for the three terminal states of a call
    pub fn is_finished(self) -> bool {
        matches!(self, Status::Ready | Status::Failed | Status::Canceled)
    }
}

/// HTTP verb of the current call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
pub enum Operation {
    #[default]
    #[strum(to_string = "GET")]
    Get,
    #[strum(to_string = "POST")]
    Post,
    #[strum(to_string = "DELETE")]
    Delete,
}

/// Error kinds reported by a request.
///
/// Transport-level kinds mirror the usual network stack codes. `ParseError`
/// and `UnknownContentError` are content-level: the body was unreadable, or it
/// was readable but described a failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u32)]
pub enum RequestError {
    #[default]
    NoError = 0,

    // Network layer
    ConnectionRefused = 1,
    RemoteHostClosed = 2,
    HostNotFound = 3,
    Timeout = 4,
    OperationCanceled = 5,
    SslHandshakeFailed = 6,
    TemporaryNetworkFailure = 7,
    NetworkSessionFailed = 8,
    BackgroundRequestNotAllowed = 9,
    TooManyRedirects = 10,
    InsecureRedirect = 11,
    UnknownNetworkError = 99,

    // Proxy
    ProxyConnectionRefused = 101,
    ProxyConnectionClosed = 102,
    ProxyNotFound = 103,
    ProxyTimeout = 104,
    ProxyAuthenticationRequired = 105,
    UnknownProxyError = 199,

    // Content
    ContentAccessDenied = 201,
    ContentOperationNotPermitted = 202,
    ContentNotFound = 203,
    AuthenticationRequired = 204,
    ContentReSend = 205,
    ContentConflict = 206,
    ContentGone = 207,
    UnknownContentError = 299,

    // Protocol
    ProtocolUnknown = 301,
    ProtocolInvalidOperation = 302,
    ProtocolFailure = 399,

    // Server
    InternalServerError = 401,
    OperationNotImplemented = 402,
    ServiceUnavailable = 403,
    UnknownServerError = 499,

    // Body could not be read as structured data
    ParseError = 1000,
}

/// HTTP status codes the Data API is known to answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u16)]
pub enum HttpStatusCodes {
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    TemporaryRedirect = 307,
    PermanentRedirect = 308,

    BadRequest = 400,
    Unauthorized = 401,
    PaymentRequired = 402,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    NotAcceptable = 406,
    ProxyAuthenticationRequired = 407,
    Conflict = 409,
    Gone = 410,
    TooManyRequests = 429,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

/// How a finished HTTP exchange should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HttpClass {
    Success,
    Redirect,
    AuthenticationRequired,
    Failure(RequestError),
}

/// Classifies a raw HTTP status code.
pub(crate) fn classify_http_status(code: u16) -> HttpClass {
    use HttpStatusCodes as H;
    match HttpStatusCodes::try_from(code) {
        Ok(H::Ok | H::Created | H::Accepted | H::NoContent) => HttpClass::Success,
        Ok(
            H::MovedPermanently
            | H::Found
            | H::SeeOther
            | H::TemporaryRedirect
            | H::PermanentRedirect,
        ) => HttpClass::Redirect,
        Ok(H::Unauthorized) => HttpClass::AuthenticationRequired,
        Ok(H::Forbidden) => HttpClass::Failure(RequestError::ContentAccessDenied),
        Ok(H::NotFound) => HttpClass::Failure(RequestError::ContentNotFound),
        Ok(H::MethodNotAllowed) => HttpClass::Failure(RequestError::ContentOperationNotPermitted),
        Ok(H::ProxyAuthenticationRequired) => {
            HttpClass::Failure(RequestError::ProxyAuthenticationRequired)
        }
        Ok(H::Conflict) => HttpClass::Failure(RequestError::ContentConflict),
        Ok(H::Gone) => HttpClass::Failure(RequestError::ContentGone),
        Ok(H::InternalServerError) => HttpClass::Failure(RequestError::InternalServerError),
        Ok(H::NotImplemented) => HttpClass::Failure(RequestError::OperationNotImplemented),
        Ok(H::ServiceUnavailable) => HttpClass::Failure(RequestError::ServiceUnavailable),
        Ok(H::BadGateway) => HttpClass::Failure(RequestError::UnknownServerError),
        Ok(
            H::BadRequest | H::PaymentRequired | H::NotAcceptable | H::TooManyRequests,
        ) => HttpClass::Failure(RequestError::UnknownContentError),
        Err(_) => match code {
            200..=299 => HttpClass::Success,
            300..=399 => HttpClass::Failure(RequestError::ProtocolFailure),
            400..=499 => HttpClass::Failure(RequestError::UnknownContentError),
            500..=599 => HttpClass::Failure(RequestError::UnknownServerError),
            _ => HttpClass::Failure(RequestError::ProtocolUnknown),
        },
    }
}
