use http::{HeaderMap, Method, Version, header, request::Parts};
use hyper::body::Bytes;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const APPLICATION_JSON: &str = "application/json";

/// A fully read request, as handed to the dispatcher.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: String,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    version: Version,
    keep_alive: bool,
}

impl Request {
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| parts.uri.path().to_owned());
        let query = parts.uri.query().map(parse_query).unwrap_or_default();
        let keep_alive = wants_keep_alive(parts.version, &parts.headers);

        Self {
            method: parts.method,
            target,
            path: parts.uri.path().to_owned(),
            query,
            headers: parts.headers,
            body,
            version: parts.version,
            keep_alive,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path and raw query exactly as received.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded query pairs in arrival order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First value of the query parameter `key`.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Media type of the body without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        let value = self.headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
        let media_type = value.split(';').next().unwrap_or_default().trim();
        Some(media_type.to_ascii_lowercase())
    }

    pub fn has_content_type(&self, media_type: &str) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.eq_ignore_ascii_case(media_type))
    }
}

pub fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// HTTP/1.1 persists unless `Connection: close`; HTTP/1.0 only with
/// `Connection: keep-alive`.
pub fn wants_keep_alive(version: Version, headers: &HeaderMap) -> bool {
    let has_token = |token: &str| {
        headers
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    };

    match version {
        Version::HTTP_09 | Version::HTTP_10 => has_token("keep-alive"),
        _ => !has_token("close"),
    }
}
