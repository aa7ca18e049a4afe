use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use clap::Parser;

use crate::{
    dispatch::{DEFAULT_IMAGE_PATH, Dispatcher},
    service::DEFAULT_MAX_BODY_BYTES,
    session::{DEFAULT_IDLE_TIMEOUT, SessionSettings},
};

pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Mock HTTP server for exercising HTTP clients.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "mock-http-server", version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on, e.g. 127.0.0.1 or ::1
    pub address: IpAddr,

    /// Port to listen on
    pub port: u16,

    /// Number of worker threads (values below 1 are raised to 1)
    pub threads: usize,

    /// File served by GET /image
    #[arg(long, env = "MOCK_SERVER_IMAGE", default_value = DEFAULT_IMAGE_PATH)]
    pub image: PathBuf,

    /// Seconds a connection may stay silent before it is closed
    #[arg(long, env = "MOCK_SERVER_IDLE_TIMEOUT_SECS", default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
    pub idle_timeout_secs: u64,

    /// Largest request body accepted, in bytes
    #[arg(long, env = "MOCK_SERVER_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

/// Immutable server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub threads: usize,
    pub image_path: PathBuf,
    pub idle_timeout: Duration,
    pub max_body_bytes: usize,
    pub drain_timeout: Duration,
}

impl ServerConfig {
    pub fn new(address: IpAddr, port: u16, threads: usize) -> Self {
        Self {
            address,
            port,
            threads: threads.max(1),
            image_path: PathBuf::from(DEFAULT_IMAGE_PATH),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_image_path(mut self, image_path: impl Into<PathBuf>) -> Self {
        self.image_path = image_path.into();
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            idle_timeout: self.idle_timeout,
            max_body_bytes: self.max_body_bytes,
        }
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::new(Dispatcher::new(self.image_path.clone()))
    }
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self::new(cli.address, cli.port, cli.threads)
            .with_image_path(cli.image)
            .with_idle_timeout(Duration::from_secs(cli.idle_timeout_secs))
            .with_max_body_bytes(cli.max_body_bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::try_parse_from(["mock-http-server", "127.0.0.1", "8080", "4"]).unwrap();
        let config = ServerConfig::from(cli);

        assert_eq!(
            config.socket_addr(),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080)
        );
        assert_eq!(config.threads, 4);
        assert_eq!(config.image_path, PathBuf::from(DEFAULT_IMAGE_PATH));
        assert_eq!(config.session_settings(), SessionSettings::default());
        assert_eq!(config.drain_timeout, DEFAULT_DRAIN_TIMEOUT);
    }

    #[test]
    fn test_zero_threads_is_clamped() {
        let cli = Cli::try_parse_from(["mock-http-server", "::1", "0", "0"]).unwrap();
        assert_eq!(ServerConfig::from(cli).threads, 1);
    }

    #[test]
    fn test_optional_flags() {
        let cli = Cli::try_parse_from([
            "mock-http-server",
            "0.0.0.0",
            "9000",
            "2",
            "--image",
            "/tmp/picture.png",
            "--idle-timeout-secs",
            "7",
            "--max-body-bytes",
            "1024",
        ])
        .unwrap();
        let config = ServerConfig::from(cli);

        assert_eq!(config.image_path, PathBuf::from("/tmp/picture.png"));
        assert_eq!(config.idle_timeout, Duration::from_secs(7));
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(
            config.dispatcher().image_path(),
            PathBuf::from("/tmp/picture.png").as_path()
        );
    }

    #[test]
    fn test_wrong_argument_count_is_rejected() {
        let err = Cli::try_parse_from(["mock-http-server", "127.0.0.1", "8080"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err =
            Cli::try_parse_from(["mock-http-server", "127.0.0.1", "8080", "1", "extra"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_unparsable_values_are_rejected() {
        let err = Cli::try_parse_from(["mock-http-server", "localhost", "8080", "1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = Cli::try_parse_from(["mock-http-server", "127.0.0.1", "70000", "1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
