use http::{
    HeaderMap, HeaderValue, StatusCode,
    header::{self, HeaderName},
};
use hyper::body::Bytes;

use crate::{body::ResponseBody, stream::ChunkStream};

pub const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const OCTET_STREAM: &str = "application/octet-stream";
pub const IMAGE_PNG: &str = "image/png";

/// Response descriptor produced by the dispatcher.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    keep_alive: bool,
}

impl Response {
    pub fn new(status: StatusCode, body: ResponseBody) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
            keep_alive: true,
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, ResponseBody::empty())
    }

    pub fn bytes(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self::new(status, ResponseBody::full(body)).content_type(content_type)
    }

    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::bytes(status, TEXT_PLAIN, body)
    }

    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::bytes(status, crate::request::APPLICATION_JSON, value.to_string())
    }

    /// Streamed body with a `Content-Length` of the full planned size.
    pub fn stream(status: StatusCode, content_type: &'static str, stream: ChunkStream) -> Self {
        let total_size = stream.plan().total_size;
        Self::new(status, ResponseBody::from(stream))
            .content_type(content_type)
            .header(header::CONTENT_LENGTH, HeaderValue::from(total_size))
    }

    pub fn bad_request(why: impl Into<String>) -> Self {
        Self::bytes(StatusCode::BAD_REQUEST, TEXT_HTML, why.into())
    }

    pub fn not_found(target: &str) -> Self {
        Self::bytes(
            StatusCode::NOT_FOUND,
            TEXT_HTML,
            format!("The resource '{target}' was not found."),
        )
    }

    pub fn server_error(what: &str) -> Self {
        Self::bytes(
            StatusCode::INTERNAL_SERVER_ERROR,
            TEXT_HTML,
            format!("An error occurred: '{what}'"),
        )
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::text(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Request body exceeds {limit} bytes"),
        )
    }

    #[must_use]
    pub fn content_type(self, content_type: &'static str) -> Self {
        self.header(header::CONTENT_TYPE, HeaderValue::from_static(content_type))
    }

    /// Sets `name`, replacing earlier values.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds `name` without removing earlier values.
    #[must_use]
    pub fn append_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Finalizes framing headers and converts into a hyper response.
    pub fn into_http(self) -> hyper::Response<ResponseBody> {
        let Self {
            status,
            mut headers,
            body,
            keep_alive,
        } = self;

        headers.insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
        if let Some(len) = body.materialized_len() {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }
        if !keep_alive {
            headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        }

        let mut response = hyper::Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}
