//! JSON-RPC 2.0 interface over line-delimited stdio.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::RpcServer;
pub use transport::LineTransport;
