//! Fixtures for exercising the server over in-memory connections.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use futures::{AsyncReadExt, AsyncWriteExt};
use smol::net::unix::UnixStream;

use crate::errors::FixtureError;

static ASSET_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Client and server ends of one connection.
pub struct TestSockets {
    pub client_socket: UnixStream,
    pub server_socket: UnixStream,
}

pub fn create_test_sockets() -> Result<TestSockets, FixtureError> {
    let (client_socket, server_socket) = UnixStream::pair()?;
    Ok(TestSockets {
        client_socket,
        server_socket,
    })
}

/// Writes `request` verbatim and reads until the peer closes the connection.
pub async fn exchange_raw(
    stream: &mut UnixStream,
    request: &[u8],
) -> Result<Vec<u8>, FixtureError> {
    stream.write_all(request).await?;
    stream.flush().await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(response)
}

/// Writes `bytes` to a fresh file under the system temp directory.
pub fn write_test_asset(name: &str, bytes: &[u8]) -> Result<PathBuf, FixtureError> {
    let unique = ASSET_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "mock-http-server-{}-{unique}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir)?;

    let path = dir.join(name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}

/// A path inside the temp directory that is guaranteed not to exist.
pub fn missing_test_asset(name: &str) -> PathBuf {
    let unique = ASSET_COUNTER.fetch_add(1, Ordering::SeqCst);
    Path::new(&std::env::temp_dir())
        .join(format!("mock-http-server-missing-{}-{unique}", std::process::id()))
        .join(name)
}
