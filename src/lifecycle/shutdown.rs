//! Shutdown coordination for a web host.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// The server loop and the session sweeper each hold a receiver; an
/// interrupt (or an explicit trigger) releases them all at once.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Move the coordinator into a background task that triggers it when the
    /// process receives an interrupt. Subscriptions must be taken first.
    pub fn trigger_on_interrupt(self) {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                self.trigger();
            }
        });
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_releases_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.subscribe();
        let mut sweeper = shutdown.subscribe();

        shutdown.trigger();

        assert!(server.recv().await.is_ok());
        assert!(sweeper.recv().await.is_ok());
    }
}
