use std::{
    future::Future, io, net::SocketAddr, panic::AssertUnwindSafe, sync::Arc, time::Duration,
};

use futures::{FutureExt, future};
use smol::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{
    config::ServerConfig,
    dispatch::Dispatcher,
    error::{ServerError, SessionError},
    executor::{WorkerPool, panic_message},
    session::{SessionSettings, serve_session},
};

/// Pause after a failed accept, so persistent failures such as descriptor
/// exhaustion do not spin the loop.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts connections and runs one session per connection on the pool.
#[derive(Debug)]
pub struct Listener {
    listener: TcpListener,
    pool: WorkerPool,
    dispatcher: Arc<Dispatcher>,
    settings: SessionSettings,
    drain_timeout: Duration,
}

impl Listener {
    pub async fn bind(config: &ServerConfig, pool: WorkerPool) -> Result<Self, ServerError> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        info!(
            component = "listener",
            phase = "bind",
            status = "listening",
            addr = %listener.local_addr()?,
            threads = pool.threads(),
        );

        Ok(Self {
            listener,
            pool,
            dispatcher: config.dispatcher(),
            settings: config.session_settings(),
            drain_timeout: config.drain_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the process exits.
    pub async fn serve(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(future::pending::<()>()).await
    }

    /// Accepts connections until `signal` resolves, then waits for live
    /// sessions, at most for the drain timeout.
    pub async fn serve_with_shutdown<S>(self, signal: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        let mut signal = std::pin::pin!(signal.fuse());

        loop {
            let accepted = futures::select! {
                () = signal => break,
                accepted = self.listener.accept().fuse() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => self.spawn_session(stream, peer),
                Err(err) => pause_after_accept_error(&err).await,
            }
        }

        info!(
            component = "listener",
            phase = "shutdown",
            status = "draining",
            active_sessions = self.pool.active_tasks(),
        );

        let drained = futures::select! {
            () = self.pool.wait().fuse() => true,
            _ = smol::Timer::after(self.drain_timeout).fuse() => false,
        };

        if drained {
            info!(component = "listener", phase = "shutdown", status = "drained");
        } else {
            warn!(
                component = "listener",
                phase = "shutdown",
                status = "drain_timeout",
                active_sessions = self.pool.active_tasks(),
            );
        }
        Ok(())
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let settings = self.settings;

        let session = async move {
            debug!(component = "session", status = "accepted");

            let outcome = AssertUnwindSafe(serve_session(stream, dispatcher, settings))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(SessionError::Panicked(panic_message(panic.as_ref()))));

            match outcome {
                Ok(report) => debug!(
                    component = "session",
                    status = "closed",
                    requests_served = report.requests_served,
                ),
                Err(SessionError::Panicked(message)) => {
                    error!(component = "session", panic = %message, "Session panicked")
                }
                Err(err) => warn!(component = "session", error = %err, "Session failed"),
            }
        }
        .instrument(info_span!("session", %peer));

        if !self.pool.spawn(session) {
            debug!(component = "listener", %peer, "Pool closed, dropping connection");
        }
    }
}

async fn pause_after_accept_error(err: &io::Error) {
    warn!(
        component = "listener",
        phase = "accept",
        error = %err,
        "Accept failed"
    );
    smol::Timer::after(ACCEPT_ERROR_BACKOFF).await;
}
