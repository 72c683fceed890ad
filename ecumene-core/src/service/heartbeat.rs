//! Heartbeat intake service
//!
//! One-way ingestion of worker liveness announcements. Register events add
//! the group to the global set and upsert the endpoint's score in one atomic
//! script; unregister events remove the endpoint only. No reply is ever
//! sent on this protocol.

use redis::aio::MultiplexedConnection;
use tokio::sync::broadcast;
use tracing::{debug, info};
use zeromq::{PullSocket, Socket, SocketRecv, ZmqMessage};

use crate::error::{EcumeneError, Result};
use crate::protocol::{Heartbeat, HeartbeatAction};
use crate::store::{self, ScriptCache};
use crate::{DEFAULT_HEARTBEAT_ADDR, DEFAULT_STORE_URL};

/// Adds the group to the global set and upserts (endpoint -> score) into
/// its collection as one atomic unit, so a lookup never sees a group whose
/// set membership and entries disagree.
const REGISTER_SCRIPT: &str = "\
redis.call('SADD', 'ecm-keys', KEYS[1])\n\
redis.call('ZADD', 'ecm:' .. KEYS[1], ARGV[1], ARGV[2])";

/// Configuration for the heartbeat service
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Store connection URL
    pub store_url: String,
    /// One-way ingestion listen address
    pub listen_addr: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.into(),
            listen_addr: DEFAULT_HEARTBEAT_ADDR.into(),
        }
    }
}

/// Heartbeat intake loop state
pub struct HeartbeatService {
    conn: MultiplexedConnection,
    script: ScriptCache,
    sock: PullSocket,
}

impl HeartbeatService {
    /// Connect to the store, compile the register script, and bind the
    /// ingestion socket
    pub async fn new(config: HeartbeatConfig) -> Result<Self> {
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

        let mut script = ScriptCache::new(REGISTER_SCRIPT);
        script.load(&mut conn).await?;

        let mut sock = PullSocket::new();
        sock.bind(&config.listen_addr)
            .await
            .map_err(|e| EcumeneError::BindFailed {
                endpoint: config.listen_addr.clone(),
                reason: e.to_string(),
            })?;

        info!(addr = %config.listen_addr, "heartbeat service listening");

        Ok(Self { conn, script, sock })
    }

    /// Process heartbeats until shutdown is signaled or a store/socket
    /// failure ends the loop
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("heartbeat service stopping");
                    return Ok(());
                }
                msg = self.sock.recv() => {
                    let msg = msg.map_err(|e| EcumeneError::Transport {
                        message: e.to_string(),
                    })?;
                    self.handle_heartbeat(msg).await?;
                }
            }
        }
    }

    async fn handle_heartbeat(&mut self, msg: ZmqMessage) -> Result<()> {
        let frames = msg.into_vec();
        let Some(heartbeat) = Heartbeat::parse(&frames) else {
            debug!("dropping malformed heartbeat");
            return Ok(());
        };

        match heartbeat.action {
            HeartbeatAction::Register => {
                debug!(
                    key = %heartbeat.ecumene_key,
                    endpoint = %heartbeat.endpoint,
                    "register heartbeat"
                );
                let score = store::unix_now();
                self.script
                    .invoke::<()>(
                        &mut self.conn,
                        &[heartbeat.ecumene_key.as_str()],
                        &[score.to_string(), heartbeat.endpoint.clone()],
                    )
                    .await?;
            }
            HeartbeatAction::Unregister => {
                debug!(
                    key = %heartbeat.ecumene_key,
                    endpoint = %heartbeat.endpoint,
                    "unregister heartbeat"
                );
                // The group stays in the global set even if it is now
                // empty; pruning belongs to the expiration sweep alone.
                let _: () = redis::cmd("ZREM")
                    .arg(store::group_key(&heartbeat.ecumene_key))
                    .arg(&heartbeat.endpoint)
                    .query_async(&mut self.conn)
                    .await
                    .map_err(|e| EcumeneError::Store {
                        message: e.to_string(),
                    })?;
            }
        }
        Ok(())
    }
}
