//! Per-output view of a configured matrix
//!
//! A [`Matrix`] wraps one shared [`MatrixLink`] and exposes each output as an
//! [`OutputPort`] that offers a named source list (`"Input 1"`, `"Input 2"`,
//! ...) and remembers the last input it routed. The device gives no routing
//! feedback, so the remembered source is only what this process last sent
//! successfully.

use crate::{
    client::MatrixLink,
    config::{DeviceInfo, MatrixConfig},
    error::{Error, Result},
    transport::{Connector, TcpConnector},
};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Parse a source name such as `"Input 3"` into its 1-based input number
///
/// Only the last whitespace-separated word is considered.
pub fn parse_source_name(name: &str) -> Result<u32> {
    name.split_whitespace()
        .last()
        .and_then(|word| word.parse::<u32>().ok())
        .filter(|&n| n >= 1)
        .ok_or_else(|| Error::InvalidSource(format!("{:?}", name)))
}

/// Name shown for a 1-based input
pub fn source_name(input: u32) -> String {
    format!("Input {}", input)
}

/// One output of a matrix
pub struct OutputPort<C: Connector = TcpConnector> {
    device_id: String,
    index: u32,
    inputs: u32,
    link: Arc<MatrixLink<C>>,
    current: RwLock<Option<u32>>,
}

impl<C: Connector> OutputPort<C> {
    fn new(device_id: String, index: u32, inputs: u32, link: Arc<MatrixLink<C>>) -> Self {
        Self {
            device_id,
            index,
            inputs,
            link,
            current: RwLock::new(None),
        }
    }

    /// 1-based output number
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Display name
    pub fn name(&self) -> String {
        format!("Output {}", self.index)
    }

    /// Stable identifier, unique across all configured matrices
    pub fn unique_id(&self) -> String {
        format!("{}_output_{}", self.device_id, self.index)
    }

    /// Names of every selectable input
    pub fn source_list(&self) -> Vec<String> {
        (1..=self.inputs).map(source_name).collect()
    }

    /// Last input routed to this output, if any
    pub async fn current_input(&self) -> Option<u32> {
        *self.current.read().await
    }

    /// Name of the last input routed to this output, if any
    pub async fn source(&self) -> Option<String> {
        self.current_input().await.map(source_name)
    }

    /// Route the input named `source` to this output
    ///
    /// Names that do not resolve to a configured input are rejected before
    /// anything is sent.
    pub async fn select_source(&self, source: &str) -> Result<()> {
        let input = match parse_source_name(source) {
            Ok(n) if n <= self.inputs => n,
            _ => {
                warn!("Invalid source name {:?} for {}", source, self.name());
                return Err(Error::InvalidSource(format!(
                    "{:?} is not one of {} inputs",
                    source, self.inputs
                )));
            }
        };

        self.select_input(input).await
    }

    /// Route a 1-based input to this output
    pub async fn select_input(&self, input: u32) -> Result<()> {
        info!("{} routing input {}", self.name(), input);
        self.link.set_route(self.index, input).await?;
        *self.current.write().await = Some(input);
        Ok(())
    }
}

/// A configured matrix: one link shared by all of its outputs
pub struct Matrix<C: Connector = TcpConnector> {
    config: MatrixConfig,
    link: Arc<MatrixLink<C>>,
    outputs: Vec<OutputPort<C>>,
}

impl Matrix {
    /// Create a matrix that talks TCP to the configured host
    pub fn new(config: MatrixConfig) -> Result<Self> {
        let link = MatrixLink::new(config.host.clone(), config.port)?;
        Self::with_link(config, link)
    }
}

impl<C: Connector> Matrix<C> {
    /// Create a matrix over an existing link
    pub fn with_link(config: MatrixConfig, link: MatrixLink<C>) -> Result<Self> {
        config.validate()?;

        let link = Arc::new(link);
        let outputs = (1..=config.outputs)
            .map(|index| {
                OutputPort::new(
                    config.unique_id(),
                    index,
                    config.inputs,
                    Arc::clone(&link),
                )
            })
            .collect();

        Ok(Self {
            config,
            link,
            outputs,
        })
    }

    /// Device configuration
    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    /// Display title
    pub fn title(&self) -> String {
        self.config.title()
    }

    /// Metadata for the device the outputs are grouped under
    pub fn device_info(&self) -> DeviceInfo {
        self.config.device_info()
    }

    /// Shared link
    pub fn link(&self) -> &MatrixLink<C> {
        &self.link
    }

    /// All outputs in order
    pub fn outputs(&self) -> &[OutputPort<C>] {
        &self.outputs
    }

    /// Output by 1-based number
    pub fn output(&self, index: u32) -> Option<&OutputPort<C>> {
        index
            .checked_sub(1)
            .and_then(|i| self.outputs.get(i as usize))
    }

    /// Route input `source` (by name) to a 1-based output
    pub async fn select_source(&self, output: u32, source: &str) -> Result<()> {
        self.port(output)?.select_source(source).await
    }

    /// Route a 1-based input to a 1-based output
    pub async fn route(&self, output: u32, input: u32) -> Result<()> {
        self.port(output)?.select_input(input).await
    }

    /// Route a 1-based input to every output
    pub async fn route_all(&self, input: u32) -> Result<()> {
        info!("{} routing input {} to all outputs", self.title(), input);
        self.link.set_route_all(input).await?;
        for port in &self.outputs {
            *port.current.write().await = Some(input);
        }
        Ok(())
    }

    fn port(&self, output: u32) -> Result<&OutputPort<C>> {
        self.output(output).ok_or_else(|| {
            Error::InvalidRoute(format!(
                "output {} does not exist on {} ({} outputs)",
                output,
                self.title(),
                self.config.outputs
            ))
        })
    }
}
