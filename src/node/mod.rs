//! Node Module
//!
//! Client for untrusted, possibly unreachable UTXO-index servers speaking
//! newline-delimited JSON over TCP.

pub mod broadcast;
pub mod client;
pub mod protocol;
pub mod transport;

pub use broadcast::interpret_broadcast;
pub use client::NodeClient;
pub use protocol::{RpcRequest, RpcResponse};
pub use transport::{TcpTransport, Transport, TransportError};
