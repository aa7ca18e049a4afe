//! One connection, from the first request to the half-close.

use std::{sync::Arc, time::Duration};

use async_compat::Compat;
use futures::{AsyncRead, AsyncWrite, AsyncWriteExt};
use hyper::{body::Incoming, server::conn::http1};
use hyper_util::rt::TokioIo;
use tower::Service;
use tracing::{debug, info};

use crate::{
    dispatch::Dispatcher,
    error::SessionError,
    service::{DEFAULT_MAX_BODY_BYTES, MockService},
    timer::SmolTimer,
};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-connection limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// How long a peer may take to deliver the next request head.
    pub idle_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub requests_served: u64,
}

/// Serves requests on `io` until the peer closes, a response ends the
/// connection, or the peer stays silent past the idle timeout.
///
/// Requests are handled strictly one at a time. On a clean end the write side
/// is closed so the peer observes EOF.
pub async fn serve_session<IO>(
    io: IO,
    dispatcher: Arc<Dispatcher>,
    settings: SessionSettings,
) -> Result<SessionReport, SessionError>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let tower_service = MockService::new(dispatcher, settings.max_body_bytes);
    let counter = tower_service.clone();

    let hyper_service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
        tower_service.clone().call(request)
    });

    debug!(component = "session", phase = "serve", status = "started");

    let result = http1::Builder::new()
        .keep_alive(true)
        .timer(SmolTimer)
        .header_read_timeout(settings.idle_timeout)
        .serve_connection(TokioIo::new(Compat::new(io)), hyper_service)
        .without_shutdown()
        .await;

    let report = SessionReport {
        requests_served: counter.requests_served(),
    };

    match result {
        Ok(parts) => {
            let mut io = parts.io.into_inner().into_inner();
            if let Err(err) = io.close().await {
                debug!(
                    component = "session",
                    phase = "shutdown",
                    error = %err,
                    "Half-close failed"
                );
            }
        }
        Err(err) if err.is_timeout() => {
            info!(
                component = "session",
                phase = "await_request",
                status = "idle_timeout",
                requests_served = report.requests_served,
            );
        }
        Err(err) => return Err(SessionError::Http(err)),
    }

    debug!(
        component = "session",
        phase = "serve",
        status = "finished",
        requests_served = report.requests_served,
    );
    Ok(report)
}
