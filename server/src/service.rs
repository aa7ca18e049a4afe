use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
};

use futures::future::BoxFuture;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use tower::Service;
use tracing::debug;

use crate::{
    body::ResponseBody,
    dispatch::Dispatcher,
    error::{BoxError, ServiceError},
    request::Request,
    response::Response,
};

pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Bridges hyper requests to the [`Dispatcher`]: collects the body within
/// `max_body_bytes`, dispatches, and hands back the framed response.
#[derive(Clone, Debug)]
pub struct MockService {
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
    served: Arc<AtomicU64>,
}

impl MockService {
    pub fn new(dispatcher: Arc<Dispatcher>, max_body_bytes: usize) -> Self {
        Self {
            dispatcher,
            max_body_bytes,
            served: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Requests answered by this service and its clones.
    pub fn requests_served(&self) -> u64 {
        self.served.load(Ordering::SeqCst)
    }
}

impl<B> Service<hyper::Request<B>> for MockService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = hyper::Response<ResponseBody>;
    type Error = ServiceError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: hyper::Request<B>) -> Self::Future {
        let dispatcher = Arc::clone(&self.dispatcher);
        let served = Arc::clone(&self.served);
        let limit = self.max_body_bytes;

        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let body = match Limited::new(body, limit).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                    debug!(
                        component = "service",
                        uri = %parts.uri,
                        limit,
                        "Request body over limit"
                    );
                    served.fetch_add(1, Ordering::SeqCst);
                    return Ok(Response::payload_too_large(limit)
                        .with_keep_alive(false)
                        .into_http());
                }
                Err(err) => return Err(ServiceError::Body(err)),
            };

            let request = Request::from_parts(parts, body);
            let response = dispatcher.dispatch(&request);
            served.fetch_add(1, Ordering::SeqCst);
            Ok(response.into_http())
        })
    }
}
