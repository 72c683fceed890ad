//! The three registry service loops
//!
//! Heartbeat intake, assignment lookup, and expiration sweeping. Each runs
//! as an independent single-threaded loop owning a private store connection;
//! the store's atomic scripts are the only coordination between them.

pub mod assignment;
pub mod expiration;
pub mod heartbeat;

pub use assignment::{AssignmentConfig, AssignmentService};
pub use expiration::{ExpirationConfig, ExpirationService};
pub use heartbeat::{HeartbeatConfig, HeartbeatService};
