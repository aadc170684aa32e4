//! Routing command encoding
//!
//! The matrix speaks a line-oriented ASCII grammar with 0-based port numbers:
//!
//! ```text
//! #video_d out{output} source={input}
//! ```
//!
//! Callers use 1-based numbering throughout; the conversion happens here and
//! nowhere else. Line termination is left to the send pipeline.

use crate::error::{Error, Result};
use std::fmt;

/// Output field value that addresses every output at once
pub const ALL_OUTPUTS: u32 = 255;

/// Terminator appended to every command on the wire
pub const LINE_TERMINATOR: &str = "\r\n";

/// Which output(s) a routing command applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A single output, 1-based
    Output(u32),

    /// Every output
    AllOutputs,
}

impl Target {
    /// Value of the `out` field on the wire
    pub fn wire_index(&self) -> u32 {
        match self {
            Self::Output(n) => n.saturating_sub(1),
            Self::AllOutputs => ALL_OUTPUTS,
        }
    }
}

/// A single routing request: connect `source` to `target`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteCommand {
    target: Target,
    source: u32,
}

impl RouteCommand {
    /// Route a 1-based input to a 1-based output
    pub fn new(output: u32, input: u32) -> Result<Self> {
        check_index("output", output)?;
        check_index("input", input)?;
        Ok(Self {
            target: Target::Output(output),
            source: input,
        })
    }

    /// Route a 1-based input to every output
    pub fn all(input: u32) -> Result<Self> {
        check_index("input", input)?;
        Ok(Self {
            target: Target::AllOutputs,
            source: input,
        })
    }

    /// Target output(s)
    pub fn target(&self) -> Target {
        self.target
    }

    /// Source input, 1-based
    pub fn source(&self) -> u32 {
        self.source
    }

    /// Encode to the device's command text, without terminator
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RouteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#video_d out{} source={}",
            self.target.wire_index(),
            self.source - 1
        )
    }
}

/// Encode a route from a 1-based input to a 1-based output
pub fn encode_route(output: u32, input: u32) -> Result<String> {
    RouteCommand::new(output, input).map(|cmd| cmd.encode())
}

/// Encode a route from a 1-based input to all outputs
pub fn encode_route_all(input: u32) -> Result<String> {
    RouteCommand::all(input).map(|cmd| cmd.encode())
}

fn check_index(what: &str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidRoute(format!(
            "{} numbers start at 1, got 0",
            what
        )));
    }
    Ok(())
}
