pub mod body;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod listener;
pub mod request;
pub mod response;
pub mod service;
pub mod session;
pub mod stream;
pub mod timer;

pub use body::ResponseBody;
pub use client::{Client, ClientError, Response as ClientResponse, send_request};
pub use config::{Cli, ServerConfig};
pub use dispatch::{Dispatcher, ROUTES, Route};
pub use error::{ServerError, ServiceError, SessionError};
pub use executor::WorkerPool;
pub use listener::Listener;
pub use request::Request;
pub use response::Response;
pub use service::MockService;
pub use session::{SessionReport, SessionSettings, serve_session};
pub use stream::{ChunkPlan, ChunkStream, StreamError};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http_body_util::Full;
    use hyper::{StatusCode, body::Bytes, header};
    use serde_json::{Value, json};
    use shared::{TestSockets, create_test_sockets, write_test_asset};

    use crate::{Client, Dispatcher, SessionSettings, send_request, serve_session};

    fn get(uri: &str) -> hyper::Request<Full<Bytes>> {
        hyper::Request::get(uri).body(Full::new(Bytes::new())).unwrap()
    }

    fn with_body(
        method: &str,
        uri: &str,
        content_type: &str,
        body: &'static [u8],
    ) -> hyper::Request<Full<Bytes>> {
        hyper::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Full::new(Bytes::from_static(body)))
            .unwrap()
    }

    async fn roundtrip(
        dispatcher: Dispatcher,
        request: hyper::Request<Full<Bytes>>,
    ) -> crate::ClientResponse {
        let TestSockets {
            client_socket,
            server_socket,
        } = create_test_sockets().unwrap();

        let server_task = serve_session(
            server_socket,
            Arc::new(dispatcher),
            SessionSettings::default(),
        );
        let client_task = send_request(request, client_socket);

        let (server_result, client_result) = futures::join!(server_task, client_task);

        server_result.expect("Server task should complete");
        client_result.expect("Client task should complete")
    }

    #[test]
    fn test_echo_returns_request_body() {
        smol::block_on(async {
            let response = roundtrip(
                Dispatcher::default(),
                with_body("POST", "/echo", "text/plain", b"hello"),
            )
            .await;

            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.text(), "hello");
        });
    }

    #[test]
    fn test_redirect_chain_reaches_final_destination() {
        smol::block_on(async {
            let TestSockets {
                client_socket,
                server_socket,
            } = create_test_sockets().unwrap();

            let server_task = serve_session(
                server_socket,
                Arc::new(Dispatcher::default()),
                SessionSettings::default(),
            );

            let client_task = async move {
                let mut client = Client::handshake(client_socket).await.unwrap();
                let mut visited = Vec::new();
                let mut next = "/redirect/3".to_owned();

                let last = loop {
                    let response = client.send(get(&next)).await.unwrap();
                    if response.status != StatusCode::FOUND {
                        break response;
                    }
                    next = response.headers[header::LOCATION]
                        .to_str()
                        .unwrap()
                        .to_owned();
                    visited.push(next.clone());
                };
                client.close().await.unwrap();
                (visited, last)
            };

            let (server_result, (visited, last)) = futures::join!(server_task, client_task);

            assert_eq!(server_result.unwrap().requests_served, 4);
            assert_eq!(visited, ["/redirect/2", "/redirect/1", "/redirect/0"]);
            assert_eq!(last.status, StatusCode::OK);
            let body: Value = serde_json::from_slice(&last.body).unwrap();
            assert_eq!(body, json!({"message": "Final destination reached!"}));
        });
    }

    #[test]
    fn test_back_to_back_requests_share_one_connection() {
        smol::block_on(async {
            let TestSockets {
                client_socket,
                server_socket,
            } = create_test_sockets().unwrap();

            let server_task = serve_session(
                server_socket,
                Arc::new(Dispatcher::default()),
                SessionSettings::default(),
            );

            let client_task = async move {
                let mut client = Client::handshake(client_socket).await.unwrap();
                let mut statuses = Vec::new();
                for _ in 0..16 {
                    statuses.push(client.send(get("/status")).await.unwrap().status);
                }
                client.close().await.unwrap();
                statuses
            };

            let (server_result, statuses) = futures::join!(server_task, client_task);

            assert_eq!(server_result.unwrap().requests_served, 16);
            assert!(statuses.iter().all(|status| *status == StatusCode::OK));
        });
    }

    #[test]
    fn test_bigfile_streams_declared_length() {
        smol::block_on(async {
            let response = roundtrip(
                Dispatcher::default(),
                get("/bigfile?total_size=65537&chunk_size=4096&delay_ms=1"),
            )
            .await;

            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.headers[header::CONTENT_LENGTH], "65537");
            assert_eq!(response.body.len(), 65_537);
        });
    }

    #[test]
    fn test_bigfile_missing_parameter_is_bad_request() {
        smol::block_on(async {
            let response = roundtrip(
                Dispatcher::default(),
                get("/bigfile?total_size=10&chunk_size=5"),
            )
            .await;

            assert_eq!(response.status, StatusCode::BAD_REQUEST);
        });
    }

    #[test]
    fn test_delete_checks_test_key() {
        smol::block_on(async {
            let ok = roundtrip(
                Dispatcher::default(),
                with_body(
                    "DELETE",
                    "/delete",
                    "application/json",
                    br#"{"test-key": "test-value"}"#,
                ),
            )
            .await;
            assert_eq!(ok.status, StatusCode::OK);
            assert_eq!(
                serde_json::from_slice::<Value>(&ok.body).unwrap(),
                json!({"status": "success"})
            );

            let failed = roundtrip(
                Dispatcher::default(),
                with_body(
                    "DELETE",
                    "/delete",
                    "application/json",
                    br#"{"test-key": "other"}"#,
                ),
            )
            .await;
            assert_eq!(failed.status, StatusCode::BAD_REQUEST);
            assert_eq!(
                serde_json::from_slice::<Value>(&failed.body).unwrap(),
                json!({"status": "failure"})
            );
        });
    }

    #[test]
    fn test_put_form_roundtrip() {
        smol::block_on(async {
            let ok = roundtrip(
                Dispatcher::default(),
                with_body(
                    "PUT",
                    "/put",
                    "application/x-www-form-urlencoded",
                    b"foo=42&bar=21&foo%20bar=23",
                ),
            )
            .await;
            assert_eq!(ok.status, StatusCode::OK);
            assert_eq!(ok.text(), "foo=42&bar=21&foo%20bar=23");

            let failed = roundtrip(
                Dispatcher::default(),
                with_body(
                    "PUT",
                    "/put",
                    "application/x-www-form-urlencoded",
                    b"foo=43&bar=21&foo%20bar=23",
                ),
            )
            .await;
            assert_eq!(failed.status, StatusCode::BAD_REQUEST);
        });
    }

    #[test]
    fn test_image_is_served_from_configured_path() {
        let png = b"\x89PNG\r\n\x1a\nfake";
        let path = write_test_asset("requests-test.png", png).unwrap();

        smol::block_on(async {
            let response = roundtrip(Dispatcher::new(path), get("/image")).await;

            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.headers[header::CONTENT_TYPE], "image/png");
            assert_eq!(response.body, png);
        });
    }

    #[test]
    fn test_unknown_route_is_not_found() {
        smol::block_on(async {
            let response = roundtrip(Dispatcher::default(), get("/missing")).await;

            assert_eq!(response.status, StatusCode::NOT_FOUND);
            assert_eq!(
                response.text(),
                "The resource '/missing' was not found."
            );
        });
    }
}
