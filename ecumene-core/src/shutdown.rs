//! Shutdown signaling for the service loops
//!
//! Each service loop holds one receiver and waits on it inside its
//! multiplexed select, so a termination request interrupts the loop at the
//! next iteration rather than waiting out a sweep period. At most one
//! in-flight store call is allowed to complete before teardown.

use tokio::sync::broadcast;

/// Broadcast-based termination signal shared by all service loops
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    /// Request termination of every subscribed loop
    pub fn shutdown(&self) {
        let _ = self.sender.send(());
    }

    /// Create a receiver for one service loop
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_reaches_subscriber() {
        let signal = ShutdownSignal::new();
        let mut rx = signal.subscribe();

        let task = tokio::spawn(async move { rx.recv().await.is_ok() });

        signal.shutdown();
        assert!(task.await.unwrap());
    }

    #[tokio::test]
    async fn test_all_subscribers_receive() {
        let signal = ShutdownSignal::new();
        let mut a = signal.subscribe();
        let mut b = signal.subscribe();

        signal.shutdown();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }
}
