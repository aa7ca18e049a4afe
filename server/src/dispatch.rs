//! Ordered route table.
//!
//! Each [`Route`] pairs a predicate with a handler. Routes are tried in table
//! order and the first predicate that matches produces the response, so the
//! order of [`ROUTES`] is part of the external behavior.

use std::path::{Path, PathBuf};

use http::Method;
use tracing::info;

use crate::{
    handlers,
    request::{APPLICATION_JSON, FORM_URLENCODED, Request},
    response::Response,
};

pub const DEFAULT_IMAGE_PATH: &str = "requests-test.png";

pub type Predicate = fn(&Request) -> bool;
pub type Handler = fn(&Dispatcher, &Request) -> Response;

pub struct Route {
    pub name: &'static str,
    pub matches: Predicate,
    pub handle: Handler,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route").field("name", &self.name).finish()
    }
}

fn is(req: &Request, method: Method, path: &str) -> bool {
    *req.method() == method && req.path() == path
}

pub static ROUTES: &[Route] = &[
    Route {
        name: "echo",
        matches: |req| is(req, Method::POST, "/echo"),
        handle: handlers::echo,
    },
    Route {
        name: "timestamp",
        matches: |req| is(req, Method::GET, "/timestamp"),
        handle: handlers::timestamp,
    },
    Route {
        name: "status",
        matches: |req| is(req, Method::GET, "/status"),
        handle: handlers::status,
    },
    Route {
        name: "bigfile",
        matches: |req| req.target().starts_with("/bigfile"),
        handle: handlers::bigfile,
    },
    Route {
        name: "headers",
        matches: |req| is(req, Method::GET, "/headers"),
        handle: handlers::headers,
    },
    Route {
        name: "redirect-to",
        matches: |req| is(req, Method::GET, "/redirect-to") && req.query_param("url").is_some(),
        handle: handlers::redirect_to,
    },
    Route {
        name: "redirect",
        matches: |req| *req.method() == Method::GET && req.path().starts_with("/redirect/"),
        handle: handlers::redirect,
    },
    Route {
        name: "image",
        matches: |req| is(req, Method::GET, "/image"),
        handle: handlers::image,
    },
    Route {
        name: "delete",
        matches: |req| is(req, Method::DELETE, "/delete"),
        handle: handlers::delete,
    },
    Route {
        name: "patch-form",
        matches: |req| is(req, Method::PATCH, "/patch") && req.has_content_type(FORM_URLENCODED),
        handle: handlers::patch_form,
    },
    Route {
        name: "patch-json",
        matches: |req| is(req, Method::PATCH, "/patch"),
        handle: handlers::patch_json,
    },
    Route {
        name: "put-form",
        matches: |req| is(req, Method::PUT, "/put") && req.has_content_type(FORM_URLENCODED),
        handle: handlers::put_form,
    },
    Route {
        name: "put-json",
        matches: |req| is(req, Method::PUT, "/put") && req.has_content_type(APPLICATION_JSON),
        handle: handlers::put_json,
    },
    Route {
        name: "post-form",
        matches: |req| is(req, Method::POST, "/post") && req.has_content_type(FORM_URLENCODED),
        handle: handlers::post_form,
    },
    Route {
        name: "post-json",
        matches: |req| is(req, Method::POST, "/post") && req.has_content_type(APPLICATION_JSON),
        handle: handlers::post_json,
    },
    Route {
        name: "get",
        matches: |req| is(req, Method::GET, "/get"),
        handle: handlers::headers,
    },
    Route {
        name: "cookies-set",
        matches: |req| is(req, Method::GET, "/cookies/set"),
        handle: handlers::cookies_set,
    },
    Route {
        name: "cookies-delete",
        matches: |req| is(req, Method::GET, "/cookies/delete"),
        handle: handlers::cookies_delete,
    },
    Route {
        name: "cookies",
        matches: |req| is(req, Method::GET, "/cookies"),
        handle: handlers::cookies,
    },
];

/// Maps requests to responses. Holds only read-only configuration and is
/// shared by every session.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    image_path: PathBuf,
}

impl Dispatcher {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// The first route whose predicate accepts `request`.
    pub fn route(&self, request: &Request) -> Option<&'static Route> {
        ROUTES.iter().find(|route| (route.matches)(request))
    }

    pub fn dispatch(&self, request: &Request) -> Response {
        let route = self.route(request);
        info!(
            method = %request.method(),
            uri = request.target(),
            version = ?request.version(),
            route = route.map_or("not-found", |r| r.name),
            "Request"
        );

        let response = match route {
            Some(route) => (route.handle)(self, request),
            None => Response::not_found(request.target()),
        };

        response.with_keep_alive(request.keep_alive())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_PATH)
    }
}

#[cfg(test)]
mod tests {
    use hyper::body::Bytes;

    use super::*;

    fn request(method: Method, uri: &str, content_type: Option<&str>) -> Request {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        Request::from_parts(parts, Bytes::new())
    }

    fn route_name(method: Method, uri: &str, content_type: Option<&str>) -> Option<&'static str> {
        Dispatcher::default()
            .route(&request(method, uri, content_type))
            .map(|r| r.name)
    }

    #[test]
    fn test_route_names_are_unique() {
        let mut names: Vec<_> = ROUTES.iter().map(|r| r.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ROUTES.len());
    }

    #[test]
    fn test_exact_routes_require_method() {
        assert_eq!(route_name(Method::POST, "/echo", None), Some("echo"));
        assert_eq!(route_name(Method::GET, "/echo", None), None);
        assert_eq!(route_name(Method::GET, "/status", None), Some("status"));
        assert_eq!(route_name(Method::POST, "/status", None), None);
    }

    #[test]
    fn test_bigfile_matches_any_method_by_prefix() {
        assert_eq!(route_name(Method::GET, "/bigfile?total_size=1", None), Some("bigfile"));
        assert_eq!(route_name(Method::POST, "/bigfile", None), Some("bigfile"));
    }

    #[test]
    fn test_patch_form_takes_precedence_over_json() {
        assert_eq!(
            route_name(Method::PATCH, "/patch", Some("application/x-www-form-urlencoded")),
            Some("patch-form")
        );
        assert_eq!(
            route_name(Method::PATCH, "/patch", Some("application/json")),
            Some("patch-json")
        );
        assert_eq!(route_name(Method::PATCH, "/patch", None), Some("patch-json"));
    }

    #[test]
    fn test_put_and_post_require_known_content_type() {
        assert_eq!(
            route_name(Method::PUT, "/put", Some("application/json; charset=utf-8")),
            Some("put-json")
        );
        assert_eq!(route_name(Method::PUT, "/put", Some("text/plain")), None);
        assert_eq!(route_name(Method::POST, "/post", None), None);
    }

    #[test]
    fn test_redirect_to_requires_url_parameter() {
        assert_eq!(
            route_name(Method::GET, "/redirect-to?url=%2Fget", None),
            Some("redirect-to")
        );
        assert_eq!(route_name(Method::GET, "/redirect-to", None), None);
    }

    #[test]
    fn test_cookie_routes_are_distinct() {
        assert_eq!(route_name(Method::GET, "/cookies", None), Some("cookies"));
        assert_eq!(route_name(Method::GET, "/cookies/set?a=b", None), Some("cookies-set"));
        assert_eq!(
            route_name(Method::GET, "/cookies/delete?a=", None),
            Some("cookies-delete")
        );
    }

    #[test]
    fn test_dispatch_propagates_keep_alive() {
        let dispatcher = Dispatcher::default();

        let (parts, ()) = http::Request::builder()
            .uri("/status")
            .header("connection", "close")
            .body(())
            .unwrap()
            .into_parts();
        let response = dispatcher.dispatch(&Request::from_parts(parts, Bytes::new()));
        assert!(!response.keep_alive());

        let response = dispatcher.dispatch(&request(Method::GET, "/status", None));
        assert!(response.keep_alive());
    }

    #[test]
    fn test_unmatched_route_is_not_found() {
        let response = Dispatcher::default().dispatch(&request(Method::GET, "/nope", None));
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }
}
