//! RPC endpoint management for EtherVault.
//!
//! This module provides:
//! - A file-backed registry of named EVM RPC endpoints
//! - A minimal JSON-RPC client for the read methods the dashboard uses
//! - Concurrent liveness polling with partial-degradation reporting
//!
//! Nothing here touches wallet state; the vault only contributes
//! addresses for balance queries.

pub mod registry;
pub mod rpc;
pub mod status;

pub use registry::{Endpoint, EndpointRegistry};
pub use rpc::{format_ether, hex_to_decimal, RpcClient};
pub use status::{poll, poll_all, EndpointStatus};
