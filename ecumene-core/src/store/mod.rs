//! Shared-store schema and key derivation
//!
//! The registry keeps no in-process state; Redis is the sole owner and
//! source of truth. Schema:
//!
//! - `ecm-keys`: set of group identifiers with at least one entry
//! - `ecm:<group>`: per-group sorted set, member = endpoint string,
//!   score = Unix seconds of the last heartbeat
//!
//! Invariant: a group is in `ecm-keys` iff its sorted set is non-empty,
//! maintained by the expiration sweep (transiently violated only inside the
//! atomic heartbeat script). The sweep relies on Redis deleting empty sorted
//! sets; a substitute store without that behavior would have to `DEL` the
//! empty collection key inside the sweep script.

pub mod script;

pub use script::ScriptCache;

use std::time::{SystemTime, UNIX_EPOCH};

/// Global set of active group identifiers
pub const GROUP_SET_KEY: &str = "ecm-keys";

/// Derive the per-group sorted-set key from a group identifier
pub fn group_key(ecumene_key: &str) -> String {
    format!("ecm:{ecumene_key}")
}

/// Current Unix time in seconds, used for heartbeat scores and cutoffs
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Liveness cutoff for a TTL window at time `now`. An entry is live iff
/// its score >= cutoff; the sweep purges everything strictly below it.
pub fn cutoff(now: u64, ttl_secs: u64) -> u64 {
    now.saturating_sub(ttl_secs)
}
