use crate::{
    command::{RouteCommand, LINE_TERMINATOR},
    endpoint::Endpoint,
    error::{Error, Result},
    transport::{Connector, TcpConnector},
    DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_PORT, DEFAULT_WRITE_TIMEOUT_SECS,
};
use log::{debug, error, info, trace};
use std::{
    fmt,
    future::poll_fn,
    pin::Pin,
    task::Poll,
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncWriteExt, ReadBuf},
    sync::Mutex,
    time,
};

/// How long a teardown waits for the peer before dropping the stream
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Link configuration
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Matrix address
    pub endpoint: Endpoint,

    /// Upper bound on a single connect attempt
    pub connect_timeout: Duration,

    /// Upper bound on writing and flushing one command
    pub write_timeout: Duration,
}

/// Builder for creating a matrix link
#[derive(Debug)]
pub struct MatrixLinkBuilder {
    host: String,
    port: u16,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl Default for MatrixLinkBuilder {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS),
        }
    }
}

impl MatrixLinkBuilder {
    /// Create a new link builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint from a string such as `10.0.0.2:5000` or `tcp://matrix.local`
    pub fn connection_string(self, conn_str: &str) -> Result<Self> {
        let endpoint = Endpoint::parse(conn_str)?;
        Ok(self.endpoint(endpoint))
    }

    /// Set the endpoint
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.host = endpoint.host().to_string();
        self.port = endpoint.port();
        self
    }

    /// Set the matrix host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the matrix port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Build a link that talks plain TCP
    pub fn build(self) -> Result<MatrixLink> {
        self.build_with_connector(TcpConnector)
    }

    /// Build a link that opens connections through `connector`
    pub fn build_with_connector<C: Connector>(self, connector: C) -> Result<MatrixLink<C>> {
        let config = LinkConfig {
            endpoint: Endpoint::new(self.host, self.port)?,
            connect_timeout: self.connect_timeout,
            write_timeout: self.write_timeout,
        };
        Ok(MatrixLink::with_connector(config, connector))
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No live connection; the next send opens one
    Disconnected,

    /// A connection is open and will be reused
    Connected,
}

/// Persistent-connection command sender for one matrix switch.
///
/// At most one connection is live at a time. It is opened lazily by the first
/// send and reused for every following send as long as the matrix has not
/// closed it. It is dropped on any write failure so that the next send
/// reconnects. All sends go through a single FIFO lock, so
/// commands from concurrent callers never interleave on the wire.
pub struct MatrixLink<C: Connector = TcpConnector> {
    /// Link configuration
    config: LinkConfig,

    /// Opens new connections
    connector: C,

    /// Current connection, guarded by the dispatch lock
    connection: Mutex<Option<C::Stream>>,
}

impl<C: Connector> fmt::Debug for MatrixLink<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixLink")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MatrixLink {
    /// Create a link to `host:port` with default timeouts
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::builder().host(host).port(port).build()
    }

    /// Create a new link builder
    pub fn builder() -> MatrixLinkBuilder {
        MatrixLinkBuilder::new()
    }
}

impl<C: Connector> MatrixLink<C> {
    /// Create a link from a configuration and connector
    pub fn with_connector(config: LinkConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            connection: Mutex::new(None),
        }
    }

    /// The matrix address
    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    /// Link configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Get the current connection state
    ///
    /// Waits for any in-flight send to finish first. A connection the matrix
    /// has closed still reports `Connected` until the next send notices.
    pub async fn state(&self) -> LinkState {
        if self.connection.lock().await.is_some() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        }
    }

    /// Check if a connection is currently open
    pub async fn is_connected(&self) -> bool {
        self.state().await == LinkState::Connected
    }

    /// Make sure a usable connection exists, opening one if needed
    pub async fn ensure_connection(&self) -> Result<()> {
        let mut slot = self.connection.lock().await;
        self.open_if_needed(&mut slot).await.map(|_| ())
    }

    /// Close the current connection, if any
    ///
    /// Close errors are ignored. Calling this with no open connection is a no-op.
    pub async fn teardown_connection(&self) {
        let mut slot = self.connection.lock().await;
        Self::teardown(&mut slot).await;
    }

    /// Route a 1-based input to a 1-based output
    pub async fn set_route(&self, output: u32, input: u32) -> Result<()> {
        let cmd = RouteCommand::new(output, input)?.encode();
        info!(
            "Route output {} <- input {} on {} ({:?})",
            output,
            input,
            self.config.endpoint,
            cmd
        );
        self.send(&cmd).await
    }

    /// Route a 1-based input to every output
    pub async fn set_route_all(&self, input: u32) -> Result<()> {
        let cmd = RouteCommand::all(input)?.encode();
        info!(
            "Route all outputs <- input {} on {} ({:?})",
            input,
            self.config.endpoint,
            cmd
        );
        self.send(&cmd).await
    }

    /// Send one command line over the persistent connection
    ///
    /// The terminator is appended here. The dispatch lock is held from the
    /// connection check until the write has been flushed.
    pub(crate) async fn send(&self, command: &str) -> Result<()> {
        let line = format!("{}{}", command, LINE_TERMINATOR);

        let mut slot = self.connection.lock().await;
        let stream = self.open_if_needed(&mut slot).await?;

        debug!("Sending to {}: {:?}", self.config.endpoint, line);

        let write = async {
            stream.write_all(line.as_bytes()).await?;
            stream.flush().await
        };

        let result = time::timeout(self.config.write_timeout, write).await;
        let failure = match result {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => Error::WriteFailed(e),
            Err(_) => Error::Timeout(format!(
                "Write to {} did not complete within {:?}",
                self.config.endpoint, self.config.write_timeout
            )),
        };

        error!(
            "Error sending command to {}, dropping connection: {}",
            self.config.endpoint, failure
        );
        Self::teardown(&mut slot).await;
        Err(failure)
    }

    /// Return the open connection, connecting first if there is none
    async fn open_if_needed<'a>(
        &self,
        slot: &'a mut Option<C::Stream>,
    ) -> Result<&'a mut C::Stream> {
        if let Some(stream) = slot.as_mut() {
            if Self::peer_closed(stream).await {
                info!(
                    "Connection to {} was closed by the matrix, reconnecting",
                    self.config.endpoint
                );
                Self::teardown(slot).await;
            }
        }

        let stream = match slot.take() {
            Some(stream) => stream,
            None => self.connect().await?,
        };
        Ok(slot.insert(stream))
    }

    /// Drain whatever the matrix has sent without waiting for more
    ///
    /// Returns true once the peer has closed its side or the socket has
    /// errored. Received bytes are discarded.
    async fn peer_closed(stream: &mut C::Stream) -> bool {
        let mut buf = [0u8; 512];
        poll_fn(|cx| loop {
            let mut read_buf = ReadBuf::new(&mut buf);
            match Pin::new(&mut *stream).poll_read(cx, &mut read_buf) {
                Poll::Pending => return Poll::Ready(false),
                Poll::Ready(Ok(())) if read_buf.filled().is_empty() => return Poll::Ready(true),
                Poll::Ready(Ok(())) => {
                    trace!("Discarding {} bytes from matrix", read_buf.filled().len());
                }
                Poll::Ready(Err(e)) => {
                    debug!("Connection error detected before send: {}", e);
                    return Poll::Ready(true);
                }
            }
        })
        .await
    }

    /// Open a fresh connection to the configured endpoint
    async fn connect(&self) -> Result<C::Stream> {
        let endpoint = &self.config.endpoint;
        info!("Opening persistent TCP connection to matrix at {}", endpoint);

        match time::timeout(self.config.connect_timeout, self.connector.connect(endpoint)).await {
            Ok(Ok(stream)) => {
                debug!("Connected to {}", endpoint);
                Ok(stream)
            }
            Ok(Err(e)) => {
                error!("Failed to connect to matrix at {}: {}", endpoint, e);
                Err(Error::ConnectFailed {
                    host: endpoint.host().to_string(),
                    port: endpoint.port(),
                    source: e,
                })
            }
            Err(_) => {
                error!(
                    "Connecting to matrix at {} timed out after {:?}",
                    endpoint, self.config.connect_timeout
                );
                Err(Error::Timeout(format!(
                    "Connection to {} timed out after {:?}",
                    endpoint, self.config.connect_timeout
                )))
            }
        }
    }

    /// Best-effort close of whatever is in `slot`, leaving it empty
    async fn teardown(slot: &mut Option<C::Stream>) {
        if let Some(mut stream) = slot.take() {
            match time::timeout(CLOSE_TIMEOUT, stream.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => trace!("Ignoring error while closing connection: {}", e),
                Err(_) => trace!("Gave up waiting for connection to close"),
            }
            debug!("Connection closed");
        }
    }
}
