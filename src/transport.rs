//! Transport seam between the link and the network
//!
//! [`MatrixLink`](crate::MatrixLink) writes commands to its connection and
//! only reads from it to notice that the matrix has hung up, so a transport is
//! anything that can open an [`AsyncRead`] + [`AsyncWrite`] stream to an
//! [`Endpoint`]. Production code uses [`TcpConnector`].

use crate::endpoint::Endpoint;
use async_trait::async_trait;
use log::trace;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Opens connections to a matrix endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stream type produced by this connector
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Open a new connection to `endpoint`
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<Self::Stream>;
}

/// Plain TCP connector
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((endpoint.host(), endpoint.port())).await?;

        // Commands are tiny and latency matters more than batching
        if let Err(e) = stream.set_nodelay(true) {
            trace!("Could not set TCP_NODELAY on {}: {}", endpoint, e);
        }

        Ok(stream)
    }
}
