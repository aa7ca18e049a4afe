use async_compat::Compat;
use futures::{AsyncRead, AsyncWrite};
use http_body_util::{BodyExt, Full};
use hyper::{HeaderMap, StatusCode, body::Bytes, client::conn::http1};
use hyper_util::rt::TokioIo;
use smol::Task;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP/1 handshake failed: {0}")]
    Handshake(hyper::Error),

    #[error("Request failed: {0}")]
    RequestFailed(hyper::Error),

    #[error("Response body collection failed: {0}")]
    BodyCollection(hyper::Error),

    #[error("Connection task failed: {0}")]
    ConnectionTask(#[from] hyper::Error),
}

/// A fully collected response.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP/1.1 client over a single connection, reused across requests.
pub struct Client {
    sender: http1::SendRequest<Full<Bytes>>,
    conn: Task<Result<(), hyper::Error>>,
}

impl Client {
    pub async fn handshake<IO>(cnx: IO) -> Result<Self, ClientError>
    where
        IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, conn) = http1::handshake(TokioIo::new(Compat::new(cnx)))
            .await
            .map_err(ClientError::Handshake)?;

        Ok(Self {
            sender,
            conn: smol::spawn(conn),
        })
    }

    /// Sends `request` once the previous exchange on this connection is done.
    pub async fn send(&mut self, request: hyper::Request<Full<Bytes>>) -> Result<Response, ClientError> {
        self.sender
            .ready()
            .await
            .map_err(ClientError::RequestFailed)?;

        let res = self
            .sender
            .send_request(request)
            .await
            .map_err(ClientError::RequestFailed)?;

        let status = res.status();
        let headers = res.headers().clone();
        let body = res
            .into_body()
            .collect()
            .await
            .map_err(ClientError::BodyCollection)?
            .to_bytes()
            .to_vec();

        debug!(component = "client", %status, body_len = body.len(), "Response received");
        Ok(Response {
            status,
            headers,
            body,
        })
    }

    /// Drops the sender and waits for the connection to wind down.
    pub async fn close(self) -> Result<(), ClientError> {
        drop(self.sender);
        self.conn.await?;
        Ok(())
    }
}

/// Sends one request on `cnx` and closes the connection.
pub async fn send_request<IO>(request: hyper::Request<Full<Bytes>>, cnx: IO) -> Result<Response, ClientError>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut client = Client::handshake(cnx).await?;
    let response = client.send(request).await?;
    client.close().await?;

    info!("Request sent successfully, status: {}", response.status);
    Ok(response)
}
