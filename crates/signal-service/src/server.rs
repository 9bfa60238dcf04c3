//! Signaling server: accept loop and lifecycle.
//!
//! Owns the presence registry and spawns one [`handle_connection`] task
//! per accepted transport. On shutdown it stops accepting, then waits up
//! to [`SHUTDOWN_GRACE`] for in-flight connection tasks to drain before
//! dropping the remaining transports.

use crate::config::Config;
use crate::connection::{handle_connection, ConnectionContext};
use crate::registry::PresenceRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// How long draining connections get after a shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// The signaling server.
pub struct SignalServer {
    config: Config,
    registry: Arc<PresenceRegistry>,
}

impl SignalServer {
    /// Create a server with a fresh presence registry.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: Arc::new(PresenceRegistry::new()),
        }
    }

    /// The server's presence registry (shared with every connection).
    #[must_use]
    pub fn registry(&self) -> Arc<PresenceRegistry> {
        Arc::clone(&self.registry)
    }

    /// Bind the configured listen address.
    ///
    /// # Errors
    ///
    /// Propagates the bind failure.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(&self.config.bind_address).await
    }

    /// Run the accept loop until `shutdown` fires, then drain.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) {
        let tracker = TaskTracker::new();

        match listener.local_addr() {
            Ok(addr) => info!(target: "sb.server", %addr, "Signaling server listening"),
            Err(e) => warn!(target: "sb.server", error = %e, "Listener has no local address"),
        }

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!(target: "sb.server", "Shutdown signal received; no longer accepting");
                    break;
                }

                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            debug!(target: "sb.server", %peer_addr, "Accepted connection");
                            let ctx = ConnectionContext {
                                registry: Arc::clone(&self.registry),
                                signing_secret: self.config.signing_secret.clone(),
                                heartbeat_interval: self.config.heartbeat_interval(),
                                shutdown: shutdown.clone(),
                            };
                            tracker.spawn(handle_connection(stream, ctx));
                        }
                        Err(e) => {
                            warn!(target: "sb.server", error = %e, "Accept failed");
                        }
                    }
                }
            }
        }

        drop(listener);
        tracker.close();

        if tokio::time::timeout(SHUTDOWN_GRACE, tracker.wait())
            .await
            .is_err()
        {
            warn!(
                target: "sb.server",
                grace_seconds = SHUTDOWN_GRACE.as_secs(),
                "Shutdown grace expired with connections still draining"
            );
        }

        info!(target: "sb.server", "Signaling server stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_config() -> Config {
        let vars = HashMap::from([
            (
                "SIGNING_SECRET".to_string(),
                "test-signing-secret-0123456789abcdef".to_string(),
            ),
            (
                "SIGNALING_BIND_ADDRESS".to_string(),
                "127.0.0.1:0".to_string(),
            ),
        ]);
        Config::from_vars(&vars).unwrap()
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = SignalServer::new(test_config());
        let listener = server.bind().await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let server = SignalServer::new(test_config());
        let listener = server.bind().await.unwrap();
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(server.run(listener, shutdown.clone()));
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("server should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_registry_starts_empty() {
        let server = SignalServer::new(test_config());
        assert_eq!(server.registry().connection_count(), 0);
        assert_eq!(server.registry().room_count(), 0);
    }
}
