//! Ecumene Core - TTL-based service registry with random assignment
//!
//! This crate provides three cooperating services around a shared Redis
//! store:
//! - Heartbeat intake (workers announce liveness under a group key)
//! - Assignment lookup (clients draw one live endpoint, uniformly at random)
//! - Expiration sweeping (stale entries purged, empty groups pruned)
//!
//! The store is the sole coordination point; the services never talk to
//! each other directly. All cross-entry consistency is pushed onto the
//! store via atomic server-side scripts.

pub mod client;
pub mod error;
pub mod prng;
pub mod protocol;
pub mod service;
pub mod shutdown;
pub mod store;

pub use error::EcumeneError;
pub use shutdown::ShutdownSignal;

/// Wire protocol version; requests carrying anything else are dropped
pub const PROTOCOL_VERSION: u16 = 0;

/// Default liveness window in seconds
pub const DEFAULT_TTL_SECS: u64 = 10;

/// Default expiration sweep period in seconds
pub const DEFAULT_SWEEP_PERIOD_SECS: u64 = 12;

/// Default listen address for assignment request/reply
pub const DEFAULT_ASSIGNMENT_ADDR: &str = "tcp://0.0.0.0:23332";

/// Default listen address for heartbeat ingestion
pub const DEFAULT_HEARTBEAT_ADDR: &str = "tcp://0.0.0.0:23331";

/// Default store connection URL
pub const DEFAULT_STORE_URL: &str = "redis://127.0.0.1/";
