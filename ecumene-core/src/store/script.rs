//! Server-side script cache
//!
//! Owns one Lua script's source and its last-known compiled sha. Execution
//! goes by sha; when the store no longer recognizes it (restart, SCRIPT
//! FLUSH), the source is recompiled once and the call retried exactly once.
//! A failure after that retry propagates as fatal to the owning service.

use redis::aio::MultiplexedConnection;
use redis::{ErrorKind, FromRedisValue};
use tracing::debug;

use crate::error::{EcumeneError, Result};

/// One cached server-side script: source plus last-known sha
pub struct ScriptCache {
    source: &'static str,
    sha: Option<String>,
}

impl ScriptCache {
    /// Wrap a script source; no store round trip happens until first use
    pub fn new(source: &'static str) -> Self {
        Self { source, sha: None }
    }

    /// The sha recorded by the last successful load, if any
    pub fn sha(&self) -> Option<&str> {
        self.sha.as_deref()
    }

    /// Compile the source on the store and record the returned sha
    pub async fn load(&mut self, conn: &mut MultiplexedConnection) -> Result<()> {
        let sha: String = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(self.source)
            .query_async(conn)
            .await
            .map_err(|e| EcumeneError::ScriptLoad {
                message: e.to_string(),
            })?;
        debug!(sha = %sha, "loaded store script");
        self.sha = Some(sha);
        Ok(())
    }

    /// Execute by sha, recovering once from a store-side cache miss
    pub async fn invoke<T: FromRedisValue>(
        &mut self,
        conn: &mut MultiplexedConnection,
        keys: &[&str],
        argv: &[String],
    ) -> Result<T> {
        if self.sha.is_none() {
            self.load(conn).await?;
        }
        match self.eval(conn, keys, argv).await {
            Err(e) if e.kind() == ErrorKind::NoScriptError => {
                debug!("script missing from store cache, reloading");
                self.load(conn).await?;
                self.eval(conn, keys, argv).await.map_err(store_error)
            }
            Err(e) => Err(store_error(e)),
            Ok(value) => Ok(value),
        }
    }

    async fn eval<T: FromRedisValue>(
        &self,
        conn: &mut MultiplexedConnection,
        keys: &[&str],
        argv: &[String],
    ) -> redis::RedisResult<T> {
        let mut cmd = redis::cmd("EVALSHA");
        cmd.arg(self.sha.as_deref().unwrap_or("")).arg(keys.len());
        for key in keys {
            cmd.arg(*key);
        }
        for arg in argv {
            cmd.arg(arg.as_str());
        }
        cmd.query_async(conn).await
    }
}

fn store_error(e: redis::RedisError) -> EcumeneError {
    if e.kind() == ErrorKind::TypeError {
        EcumeneError::UnexpectedReply {
            message: e.to_string(),
        }
    } else {
        EcumeneError::Store {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cache_has_no_sha() {
        let cache = ScriptCache::new("return 1");
        assert!(cache.sha().is_none());
    }
}
