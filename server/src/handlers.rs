use std::{collections::HashMap, io, time::Duration};

use http::{HeaderValue, StatusCode, header};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::{
    dispatch::Dispatcher,
    request::{FORM_URLENCODED, Request},
    response::{IMAGE_PNG, OCTET_STREAM, Response},
    stream::{ChunkPlan, ChunkStream},
};

const STATUS_MESSAGE: &str = "Server is running smoothly!";
const FINAL_DESTINATION: &str = "Final destination reached!";
const CANONICAL_FORM: &str = "foo=42&bar=21&foo%20bar=23";
const EXPECTED_FORM: [(&str, &str); 3] = [("foo", "42"), ("bar", "21"), ("foo bar", "23")];
const EXPECTED_TEST_VALUE: &str = "test-value";

const BIGFILE_PARAMS: [&str; 3] = ["total_size", "chunk_size", "delay_ms"];

#[derive(Debug, Deserialize)]
struct TestKeyPayload {
    #[serde(rename = "test-key")]
    test_key: Option<String>,
}

/// True when the body is a JSON object whose `test-key` is the expected
/// string. Malformed JSON, other shapes and other values are all `false`.
fn has_expected_test_key(request: &Request) -> bool {
    serde_json::from_slice::<Map<String, Value>>(request.body())
        .ok()
        .and_then(|object| serde_json::from_value::<TestKeyPayload>(Value::Object(object)).ok())
        .is_some_and(|payload| payload.test_key.as_deref() == Some(EXPECTED_TEST_VALUE))
}

fn parse_form(request: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(request.body())
        .into_owned()
        .collect()
}

fn has_expected_form(request: &Request) -> bool {
    let form = parse_form(request);
    EXPECTED_FORM
        .iter()
        .all(|(key, value)| form.get(*key).is_some_and(|v| v == value))
}

/// `{"headers": {...}}` with one entry per header name; the last value wins.
fn headers_json(request: &Request) -> Value {
    let mut headers = Map::new();
    for (name, value) in request.headers() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers.insert(name.as_str().to_owned(), Value::String(value));
    }
    json!({ "headers": headers })
}

pub fn echo(_: &Dispatcher, request: &Request) -> Response {
    Response::text(StatusCode::OK, request.body().clone())
}

pub fn timestamp(_: &Dispatcher, _: &Request) -> Response {
    let now = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
    Response::text(StatusCode::OK, now.to_string())
}

pub fn status(_: &Dispatcher, _: &Request) -> Response {
    Response::text(StatusCode::OK, STATUS_MESSAGE)
}

/// Parses exactly `total_size`, `chunk_size` and `delay_ms`, each once.
pub fn parse_bigfile_params(query: &[(String, String)]) -> Result<ChunkPlan, String> {
    if query.len() != BIGFILE_PARAMS.len() {
        return Err("Invalid query string".to_owned());
    }

    let mut values: [Option<u64>; 3] = [None; 3];
    for (key, value) in query {
        let Some(slot) = BIGFILE_PARAMS.iter().position(|name| name == key) else {
            return Err(format!("Unknown parameter '{key}'"));
        };
        if values[slot].is_some() {
            return Err(format!("Duplicate parameter '{key}'"));
        }
        let parsed = value
            .parse::<u64>()
            .map_err(|_| format!("Invalid value for '{key}'"))?;
        values[slot] = Some(parsed);
    }

    let [Some(total_size), Some(chunk_size), Some(delay_ms)] = values else {
        return Err("Invalid query string".to_owned());
    };
    let chunk_size =
        usize::try_from(chunk_size).map_err(|_| "Invalid value for 'chunk_size'".to_owned())?;

    ChunkPlan::new(total_size, chunk_size, Duration::from_millis(delay_ms))
        .map_err(|err| err.to_string())
}

pub fn bigfile(_: &Dispatcher, request: &Request) -> Response {
    match parse_bigfile_params(request.query()) {
        Ok(plan) => Response::stream(StatusCode::OK, OCTET_STREAM, ChunkStream::new(plan)),
        Err(why) => Response::bad_request(why),
    }
}

pub fn headers(_: &Dispatcher, request: &Request) -> Response {
    Response::json(StatusCode::OK, &headers_json(request))
}

pub fn redirect_to(_: &Dispatcher, request: &Request) -> Response {
    let target = request.query_param("url").unwrap_or_default();
    let Ok(location) = HeaderValue::from_str(target) else {
        return Response::bad_request("Invalid redirect target");
    };

    let response = if target == "/get" {
        Response::json(StatusCode::FOUND, &headers_json(request))
    } else {
        Response::empty(StatusCode::FOUND)
    };
    response.header(header::LOCATION, location)
}

pub fn redirect(_: &Dispatcher, request: &Request) -> Response {
    let count = request.path().strip_prefix("/redirect/").unwrap_or_default();
    let Ok(count) = count.parse::<u64>() else {
        return Response::bad_request("Invalid redirect count");
    };

    if count == 0 {
        return Response::json(StatusCode::OK, &json!({ "message": FINAL_DESTINATION }));
    }

    let next = format!("/redirect/{}", count - 1);
    match HeaderValue::from_str(&next) {
        Ok(location) => Response::empty(StatusCode::FOUND).header(header::LOCATION, location),
        Err(_) => Response::server_error("invalid redirect location"),
    }
}

pub fn image(dispatcher: &Dispatcher, _: &Request) -> Response {
    match std::fs::read(dispatcher.image_path()) {
        Ok(bytes) => Response::bytes(StatusCode::OK, IMAGE_PNG, bytes),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Response::text(StatusCode::NOT_FOUND, "File not found")
        }
        Err(err) => {
            warn!(
                component = "dispatcher",
                path = %dispatcher.image_path().display(),
                error = %err,
                "Failed to read image asset"
            );
            Response::server_error(&err.to_string())
        }
    }
}

fn status_json(request: &Request) -> Response {
    if has_expected_test_key(request) {
        Response::json(StatusCode::OK, &json!({ "status": "success" }))
    } else {
        Response::json(StatusCode::BAD_REQUEST, &json!({ "status": "failure" }))
    }
}

pub fn delete(_: &Dispatcher, request: &Request) -> Response {
    status_json(request)
}

pub fn patch_json(_: &Dispatcher, request: &Request) -> Response {
    status_json(request)
}

pub fn patch_form(_: &Dispatcher, request: &Request) -> Response {
    let form: Map<String, Value> = parse_form(request)
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    Response::json(StatusCode::OK, &json!({ "status": "success", "form": form }))
}

fn validated_form(request: &Request) -> Response {
    if has_expected_form(request) {
        Response::bytes(StatusCode::OK, FORM_URLENCODED, CANONICAL_FORM)
    } else {
        Response::text(StatusCode::BAD_REQUEST, "Invalid form data")
    }
}

pub fn put_form(_: &Dispatcher, request: &Request) -> Response {
    validated_form(request)
}

pub fn post_form(_: &Dispatcher, request: &Request) -> Response {
    validated_form(request)
}

pub fn put_json(_: &Dispatcher, request: &Request) -> Response {
    if has_expected_test_key(request) {
        Response::json(StatusCode::OK, &json!({ "status": "success" }))
    } else {
        Response::text(StatusCode::BAD_REQUEST, "Invalid JSON data")
    }
}

pub fn post_json(_: &Dispatcher, request: &Request) -> Response {
    if has_expected_test_key(request) {
        Response::json(StatusCode::OK, &json!({ "message": "Data received" }))
    } else {
        Response::json(StatusCode::BAD_REQUEST, &json!({ "error": "Invalid JSON data" }))
    }
}

pub fn cookies_set(_: &Dispatcher, request: &Request) -> Response {
    let mut response = Response::json(
        StatusCode::OK,
        &json!({ "cookies": { "cookie-1": "foo", "cookie-2": "bar" } }),
    );

    for (name, value) in request.query() {
        let Ok(cookie) = HeaderValue::from_str(&format!("{name}={value}")) else {
            return Response::bad_request("Invalid cookie");
        };
        response = response.append_header(header::SET_COOKIE, cookie);
    }
    response
}

pub fn cookies_delete(_: &Dispatcher, request: &Request) -> Response {
    let Some((name, _)) = request.query().first() else {
        return Response::bad_request("Missing cookie name");
    };
    let Ok(cookie) = HeaderValue::from_str(&format!("{name}=; Max-Age=0")) else {
        return Response::bad_request("Invalid cookie");
    };

    Response::json(StatusCode::OK, &json!({ "deleted": name }))
        .header(header::SET_COOKIE, cookie)
}

pub fn cookies(_: &Dispatcher, _: &Request) -> Response {
    Response::json(StatusCode::OK, &json!({ "cookies": {} }))
}
