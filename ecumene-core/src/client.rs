//! Client halves of the two wire protocols
//!
//! [`EcumeneClient`] asks the assignment service for a live endpoint;
//! [`HeartbeatClient`] lets a worker announce or withdraw itself. The
//! registry drops malformed or version-mismatched requests without a reply,
//! so lookups carry a receive timeout.

use std::time::Duration;

use bytes::Bytes;
use tokio::time::{timeout_at, Instant};
use tracing::debug;
use zeromq::{DealerSocket, PushSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::error::{EcumeneError, Result};
use crate::protocol::{AssignmentReply, AssignmentRequest, Heartbeat, HeartbeatAction};

/// Configuration for registry clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Assignment service address
    pub assignment_addr: String,
    /// Heartbeat service address
    pub heartbeat_addr: String,
    /// How long a lookup waits before reporting the request dropped
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            assignment_addr: "tcp://127.0.0.1:23332".into(),
            heartbeat_addr: "tcp://127.0.0.1:23331".into(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

fn into_message(frames: Vec<Bytes>) -> Option<ZmqMessage> {
    let mut iter = frames.into_iter();
    let mut msg = ZmqMessage::from(iter.next()?);
    for frame in iter {
        msg.push_back(frame);
    }
    Some(msg)
}

/// Lookup client for the assignment request/reply protocol
pub struct EcumeneClient {
    sock: DealerSocket,
    request_timeout: Duration,
    next_request_id: u64,
}

impl EcumeneClient {
    /// Connect to the assignment service
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let mut sock = DealerSocket::new();
        sock.connect(&config.assignment_addr)
            .await
            .map_err(|e| EcumeneError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self {
            sock,
            request_timeout: config.request_timeout,
            next_request_id: 0,
        })
    }

    /// Ask for one live endpoint belonging to `ecumene_key`.
    ///
    /// Returns `Ok(None)` when the registry answered with status
    /// unavailable, and [`EcumeneError::Timeout`] when no reply arrived,
    /// which is how a silently-dropped request surfaces.
    pub async fn lookup(&mut self, ecumene_key: &str) -> Result<Option<String>> {
        let request_id = Bytes::from(self.next_request_id.to_string());
        self.next_request_id += 1;

        let request = AssignmentRequest {
            request_id: request_id.clone(),
            ecumene_key: ecumene_key.into(),
        };
        let msg = match into_message(request.to_frames()) {
            Some(msg) => msg,
            None => {
                return Err(EcumeneError::Transport {
                    message: "empty request message".into(),
                })
            }
        };
        self.sock.send(msg).await.map_err(|e| EcumeneError::Transport {
            message: e.to_string(),
        })?;

        let millis = self.request_timeout.as_millis() as u64;
        let deadline = Instant::now() + self.request_timeout;
        loop {
            let reply = timeout_at(deadline, self.sock.recv())
                .await
                .map_err(|_| EcumeneError::Timeout { millis })?
                .map_err(|e| EcumeneError::Transport {
                    message: e.to_string(),
                })?;

            let frames = reply.into_vec();
            let Some(reply) = AssignmentReply::parse(&frames) else {
                debug!("discarding malformed assignment reply");
                continue;
            };
            // A stale reply from a timed-out earlier request; keep waiting.
            if reply.request_id != request_id {
                debug!("discarding stale assignment reply");
                continue;
            }
            return Ok(reply.endpoint);
        }
    }
}

/// Fire-and-forget client for the heartbeat protocol
pub struct HeartbeatClient {
    sock: PushSocket,
}

impl HeartbeatClient {
    /// Connect to the heartbeat service
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let mut sock = PushSocket::new();
        sock.connect(&config.heartbeat_addr)
            .await
            .map_err(|e| EcumeneError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self { sock })
    }

    /// Announce (or refresh) an endpoint under a group key
    pub async fn register(&mut self, ecumene_key: &str, endpoint: &str) -> Result<()> {
        self.send(HeartbeatAction::Register, ecumene_key, endpoint)
            .await
    }

    /// Withdraw an endpoint from a group
    pub async fn unregister(&mut self, ecumene_key: &str, endpoint: &str) -> Result<()> {
        self.send(HeartbeatAction::Unregister, ecumene_key, endpoint)
            .await
    }

    async fn send(
        &mut self,
        action: HeartbeatAction,
        ecumene_key: &str,
        endpoint: &str,
    ) -> Result<()> {
        let heartbeat = Heartbeat {
            action,
            ecumene_key: ecumene_key.into(),
            endpoint: endpoint.into(),
        };
        let msg = match into_message(heartbeat.to_frames()) {
            Some(msg) => msg,
            None => {
                return Err(EcumeneError::Transport {
                    message: "empty heartbeat message".into(),
                })
            }
        };
        self.sock.send(msg).await.map_err(|e| EcumeneError::Transport {
            message: e.to_string(),
        })
    }
}
