//! Transport layer for the MCP server.
//!
//! Only stdio is provided: the bridge is launched as a child process by the
//! agent host and speaks JSON-RPC over its standard streams.

pub mod stdio;

pub use stdio::StdioTransport;
