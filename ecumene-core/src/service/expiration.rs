//! Expiration sweep service
//!
//! A timer-driven loop with no inbound socket. Each sweep atomically purges
//! entries older than the TTL cutoff across every group and prunes groups
//! whose collection became empty from the global set. The next deadline is
//! computed after each sweep so execution time never accumulates drift.

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::error::{EcumeneError, Result};
use crate::store::ScriptCache;
use crate::{store, DEFAULT_STORE_URL, DEFAULT_SWEEP_PERIOD_SECS, DEFAULT_TTL_SECS};

/// Removes entries strictly below the cutoff from every registered group,
/// then drops groups whose collection no longer exists from the global set.
/// Relies on the store deleting empty sorted-set keys. Returns the total
/// number of removed entries.
const SWEEP_SCRIPT: &str = "\
local count = 0\n\
local keys = redis.call('SMEMBERS', 'ecm-keys')\n\
for i = 1, #keys do\n\
  local k = 'ecm:' .. keys[i]\n\
  count = count + redis.call('ZREMRANGEBYSCORE', k, '-inf', '(' .. ARGV[1])\n\
  if redis.call('EXISTS', k) == 0 then\n\
    redis.call('SREM', 'ecm-keys', keys[i])\n\
  end\n\
end\n\
return count";

/// Configuration for the expiration service
#[derive(Debug, Clone)]
pub struct ExpirationConfig {
    /// Store connection URL
    pub store_url: String,
    /// Liveness window; entries older than this are purged
    pub ttl: Duration,
    /// Time between sweeps
    pub period: Duration,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.into(),
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            period: Duration::from_secs(DEFAULT_SWEEP_PERIOD_SECS),
        }
    }
}

/// Expiration sweep loop state
pub struct ExpirationService {
    config: ExpirationConfig,
    conn: MultiplexedConnection,
    script: ScriptCache,
}

impl ExpirationService {
    /// Connect to the store and compile the sweep script
    pub async fn new(config: ExpirationConfig) -> Result<Self> {
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

        let mut script = ScriptCache::new(SWEEP_SCRIPT);
        script.load(&mut conn).await?;

        info!(
            ttl_secs = config.ttl.as_secs(),
            period_secs = config.period.as_secs(),
            "expiration service ready"
        );

        Ok(Self {
            conn,
            script,
            config,
        })
    }

    /// Sweep on an absolute-deadline schedule until shutdown is signaled.
    /// The wait multiplexes the deadline with the control channel, so a
    /// termination request never waits out the sweep period.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut deadline = Instant::now();
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("expiration service stopping");
                    return Ok(());
                }
                _ = time::sleep_until(deadline) => {
                    debug!("starting expiration sweep");
                    let removed = self.sweep().await?;
                    info!(removed, "expiration sweep complete");
                    deadline = Instant::now() + self.config.period;
                }
            }
        }
    }

    /// One atomic purge-and-prune pass; returns the removed-entry count
    async fn sweep(&mut self) -> Result<u64> {
        let cutoff = store::cutoff(store::unix_now(), self.config.ttl.as_secs());
        self.script
            .invoke(&mut self.conn, &[], &[cutoff.to_string()])
            .await
    }
}
