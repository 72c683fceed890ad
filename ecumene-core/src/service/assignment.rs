//! Assignment lookup service
//!
//! Answers client requests with one currently-live endpoint for a group,
//! chosen uniformly at random. The count-draw-fetch sequence runs as a
//! single atomic script on the store, so a lookup never observes a
//! half-updated group.

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tokio::sync::broadcast;
use tracing::{debug, info};
use zeromq::{RouterSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::error::{EcumeneError, Result};
use crate::prng::XorShift64;
use crate::protocol::{AssignmentReply, AssignmentRequest};
use crate::store::{self, ScriptCache};
use crate::{DEFAULT_ASSIGNMENT_ADDR, DEFAULT_STORE_URL, DEFAULT_TTL_SECS};

/// Counts live entries (score >= cutoff), draws an index from the uniform
/// value in ARGV[2], and fetches the entry at that index. Returns nil when
/// the live range is empty.
const LOOKUP_SCRIPT: &str = "\
local key = 'ecm:' .. KEYS[1]\n\
local cnt = redis.call('ZCOUNT', key, ARGV[1], '+inf')\n\
local idx = math.floor(cnt * ARGV[2])\n\
return redis.call('ZRANGEBYSCORE', key, ARGV[1], '+inf', 'LIMIT', idx, 1)[1]";

/// Configuration for the assignment service
#[derive(Debug, Clone)]
pub struct AssignmentConfig {
    /// Store connection URL
    pub store_url: String,
    /// Request/reply listen address
    pub listen_addr: String,
    /// Liveness window; entries older than this are never selected
    pub ttl: Duration,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.into(),
            listen_addr: DEFAULT_ASSIGNMENT_ADDR.into(),
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

/// Assignment lookup loop state
pub struct AssignmentService {
    config: AssignmentConfig,
    conn: MultiplexedConnection,
    script: ScriptCache,
    sock: RouterSocket,
    prng: XorShift64,
}

impl AssignmentService {
    /// Connect to the store, compile the lookup script, and bind the
    /// request/reply socket. Any failure aborts construction; resources
    /// already acquired for this attempt are released on drop.
    pub async fn new(config: AssignmentConfig) -> Result<Self> {
        let client = redis::Client::open(config.store_url.as_str()).map_err(|e| {
            EcumeneError::ConnectionFailed {
                endpoint: config.store_url.clone(),
                reason: e.to_string(),
            }
        })?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| EcumeneError::ConnectionFailed {
                endpoint: config.store_url.clone(),
                reason: e.to_string(),
            })?;

        let mut script = ScriptCache::new(LOOKUP_SCRIPT);
        script.load(&mut conn).await?;

        let mut sock = RouterSocket::new();
        sock.bind(&config.listen_addr)
            .await
            .map_err(|e| EcumeneError::BindFailed {
                endpoint: config.listen_addr.clone(),
                reason: e.to_string(),
            })?;

        info!(addr = %config.listen_addr, "assignment service listening");

        Ok(Self {
            conn,
            script,
            sock,
            prng: XorShift64::seeded_from_clock(),
            config,
        })
    }

    /// Process requests until shutdown is signaled or a store/socket
    /// failure ends the loop. Requests are handled strictly in arrival
    /// order; at most one store call is in flight at a time.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("assignment service stopping");
                    return Ok(());
                }
                msg = self.sock.recv() => {
                    let msg = msg.map_err(|e| EcumeneError::Transport {
                        message: e.to_string(),
                    })?;
                    self.handle_request(msg).await?;
                }
            }
        }
    }

    async fn handle_request(&mut self, msg: ZmqMessage) -> Result<()> {
        let frames = msg.into_vec();
        // First frame is the transport-assigned return address.
        let Some((identity, payload)) = frames.split_first() else {
            return Ok(());
        };
        let Some(request) = AssignmentRequest::parse(payload) else {
            debug!("dropping malformed assignment request");
            return Ok(());
        };

        let endpoint = self.select_endpoint(&request.ecumene_key).await?;
        debug!(
            key = %request.ecumene_key,
            endpoint = endpoint.as_deref().unwrap_or("<none>"),
            "assignment lookup"
        );

        let reply = AssignmentReply {
            request_id: request.request_id,
            ecumene_key: request.ecumene_key,
            endpoint,
        };

        let mut out = ZmqMessage::from(identity.clone());
        for frame in reply.to_frames() {
            out.push_back(frame);
        }
        self.sock.send(out).await.map_err(|e| EcumeneError::Transport {
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// One atomic count-draw-fetch against the store. The ordering of the
    /// per-group collection only implements the indexed fetch; selection is
    /// uniform over live entries, not weighted toward recency.
    async fn select_endpoint(&mut self, ecumene_key: &str) -> Result<Option<String>> {
        let cutoff = store::cutoff(store::unix_now(), self.config.ttl.as_secs());
        let u = self.prng.next_f64();
        self.script
            .invoke(
                &mut self.conn,
                &[ecumene_key],
                &[cutoff.to_string(), u.to_string()],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_script_counts_only_live_entries() {
        assert!(LOOKUP_SCRIPT.contains("ZCOUNT"));
        assert!(LOOKUP_SCRIPT.contains("ARGV[1], '+inf'"));
        assert!(LOOKUP_SCRIPT.contains("'ecm:' .. KEYS[1]"));
    }

    #[test]
    fn test_lookup_script_fetches_at_drawn_index() {
        assert!(LOOKUP_SCRIPT.contains("math.floor(cnt * ARGV[2])"));
        assert!(LOOKUP_SCRIPT.contains("'LIMIT', idx, 1"));
    }

    #[test]
    fn test_liveness_window_around_registration() {
        // Register at t=0 (score 0) with a 10s TTL: live at t=5, excluded
        // at t=15 even though the stale row still exists in the store.
        let score = 0u64;
        assert!(score >= store::cutoff(5, 10));
        assert!(score < store::cutoff(15, 10));
    }
}
