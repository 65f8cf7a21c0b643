//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 over HTTP for the Kissan Plus back office. Every method
//! except `auth.login.v1` carries a session `token` next to its params.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use error::ServerError;
pub use server::{RpcServer, RpcServerConfig};
