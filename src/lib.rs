//! Matrix Link
//!
//! This library provides a client for HDMI matrix switches that accept raw
//! ASCII routing commands over TCP. It keeps one persistent connection per
//! device, opens it lazily, reopens it after a failure and serializes every
//! command so concurrent callers never interleave on the wire.

pub mod client;
pub mod command;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod matrix;
pub mod transport;

pub use client::{LinkConfig, LinkState, MatrixLink, MatrixLinkBuilder};
pub use command::{encode_route, encode_route_all, RouteCommand, Target};
pub use config::{Config, DeviceInfo, MatrixConfig};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use matrix::{Matrix, OutputPort};
pub use transport::{Connector, TcpConnector};

/// Default port for matrix connections
pub const DEFAULT_PORT: u16 = 5000;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;

/// Default write timeout in seconds
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 5;

/// Default number of inputs on a matrix
pub const DEFAULT_INPUTS: u32 = 8;

/// Default number of outputs on a matrix
pub const DEFAULT_OUTPUTS: u32 = 8;

/// Manufacturer reported in device metadata
pub const MANUFACTURER: &str = "J-Tech Digital";

/// Model reported in device metadata
pub const MODEL: &str = "Raw TCP Matrix";

/// Largest input or output count accepted in configuration
pub const MAX_PORTS: u32 = 32;

/// A simple example of using the matrix link:
///
/// ```rust,no_run
/// use matrix_link::MatrixLink;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let link = MatrixLink::new("192.168.1.50", 5000)?;
///
/// // Input 3 to output 1; connects on first use
/// link.set_route(1, 3).await?;
///
/// // Input 2 to every output, over the same connection
/// link.set_route_all(2).await?;
///
/// link.teardown_connection().await;
/// # Ok(())
/// # }
/// ```
#[doc(hidden)]
pub struct Examples;
