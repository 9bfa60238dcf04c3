//! In-process server harness for integration tests.
//!
//! # Example
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_call_flow() {
//!     let stack = TestStack::spawn().await;
//!     let app = stack.access.create_app("demo").await;
//!     let room_id = stack.access.create_room(&app, "r").await;
//!     let token = stack.access.issue_token(&app, &room_id, "alice", "host").await;
//!
//!     let mut alice = SignalClient::connect(&stack.signal.ws_url()).await;
//!     alice.join(&room_id, &token).await;
//!     let joined = alice.recv_type("joined").await;
//!     assert_eq!(joined["userId"], "alice");
//! }
//! ```

use crate::TEST_SIGNING_SECRET;
use common::secret::SecretString;
use grant_service::routes::{build_routes, AppState};
use signal_service::registry::PresenceRegistry;
use signal_service::server::SignalServer;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Credentials returned by app creation.
#[derive(Debug, Clone)]
pub struct CreatedApp {
    pub id: String,
    pub secret: String,
}

/// A real access-plane server on an ephemeral port.
pub struct TestAccessServer {
    addr: SocketAddr,
    client: reqwest::Client,
}

impl TestAccessServer {
    /// Spawn an access-plane server bound to a random port.
    pub async fn spawn() -> Self {
        let vars = HashMap::from([
            ("SIGNING_SECRET".to_string(), TEST_SIGNING_SECRET.to_string()),
            ("API_BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);
        let config = grant_service::config::Config::from_vars(&vars).unwrap();

        let state = Arc::new(AppState::new(config));
        let router = build_routes(state, None);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum_serve(listener, router).await;
        });

        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    /// Base URL of the server.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The underlying HTTP client, for requests the helpers do not cover.
    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Register an application and return its credentials.
    pub async fn create_app(&self, name: &str) -> CreatedApp {
        let response = self
            .client
            .post(format!("{}/apps", self.url()))
            .json(&serde_json::json!({"name": name}))
            .send()
            .await
            .expect("create_app request");
        assert_eq!(response.status(), 201, "create_app should return 201");

        let body: serde_json::Value = response.json().await.expect("create_app body");
        CreatedApp {
            id: body["id"].as_str().expect("app id").to_string(),
            secret: body["secret"].as_str().expect("app secret").to_string(),
        }
    }

    /// Create a room owned by `app` and return its id.
    pub async fn create_room(&self, app: &CreatedApp, name: &str) -> String {
        let response = self
            .client
            .post(format!("{}/rooms", self.url()))
            .header("x-app-id", &app.id)
            .header("x-app-secret", &app.secret)
            .json(&serde_json::json!({"name": name}))
            .send()
            .await
            .expect("create_room request");
        assert_eq!(response.status(), 201, "create_room should return 201");

        let body: serde_json::Value = response.json().await.expect("create_room body");
        body["id"].as_str().expect("room id").to_string()
    }

    /// Issue a grant for `user_id` in `room_id` with the default ttl.
    pub async fn issue_token(
        &self,
        app: &CreatedApp,
        room_id: &str,
        user_id: &str,
        role: &str,
    ) -> String {
        self.issue_token_with_ttl(app, room_id, user_id, role, None)
            .await
    }

    /// Issue a grant with an explicit `expiresIn`.
    pub async fn issue_token_with_ttl(
        &self,
        app: &CreatedApp,
        room_id: &str,
        user_id: &str,
        role: &str,
        expires_in: Option<&str>,
    ) -> String {
        let mut body = serde_json::json!({"userId": user_id, "role": role});
        if let Some(ttl) = expires_in {
            body["expiresIn"] = ttl.into();
        }

        let response = self
            .client
            .post(format!("{}/rooms/{room_id}/token", self.url()))
            .header("x-app-id", &app.id)
            .header("x-app-secret", &app.secret)
            .json(&body)
            .send()
            .await
            .expect("issue_token request");
        assert_eq!(response.status(), 201, "issue_token should return 201");

        let body: serde_json::Value = response.json().await.expect("issue_token body");
        body["token"].as_str().expect("token").to_string()
    }
}

async fn axum_serve(listener: TcpListener, router: axum::Router) {
    axum::serve(listener, router).await.expect("axum serve");
}

/// A real signaling server on an ephemeral port.
pub struct TestSignalServer {
    addr: SocketAddr,
    registry: Arc<PresenceRegistry>,
    shutdown: CancellationToken,
}

impl TestSignalServer {
    /// Spawn a signaling server with the default 30 s heartbeat.
    pub async fn spawn() -> Self {
        Self::spawn_with_heartbeat(30).await
    }

    /// Spawn a signaling server with a custom heartbeat interval, used by
    /// reap tests to keep wall-clock time down.
    pub async fn spawn_with_heartbeat(heartbeat_seconds: u64) -> Self {
        let vars = HashMap::from([
            ("SIGNING_SECRET".to_string(), TEST_SIGNING_SECRET.to_string()),
            (
                "SIGNALING_BIND_ADDRESS".to_string(),
                "127.0.0.1:0".to_string(),
            ),
            (
                "HEARTBEAT_INTERVAL_SECONDS".to_string(),
                heartbeat_seconds.to_string(),
            ),
        ]);
        let config = signal_service::config::Config::from_vars(&vars).unwrap();

        let server = SignalServer::new(config);
        let registry = server.registry();
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = CancellationToken::new();
        tokio::spawn(server.run(listener, shutdown.clone()));

        Self {
            addr,
            registry,
            shutdown,
        }
    }

    /// WebSocket URL of the server.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// The server's presence registry, for invariant assertions.
    #[must_use]
    pub fn registry(&self) -> Arc<PresenceRegistry> {
        Arc::clone(&self.registry)
    }

    /// Trigger server shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for TestSignalServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Both planes wired to one signing secret.
pub struct TestStack {
    pub access: TestAccessServer,
    pub signal: TestSignalServer,
}

impl TestStack {
    /// Spawn both servers with the default heartbeat.
    pub async fn spawn() -> Self {
        Self {
            access: TestAccessServer::spawn().await,
            signal: TestSignalServer::spawn().await,
        }
    }

    /// Spawn both servers with a custom signaling heartbeat.
    pub async fn spawn_with_heartbeat(heartbeat_seconds: u64) -> Self {
        Self {
            access: TestAccessServer::spawn().await,
            signal: TestSignalServer::spawn_with_heartbeat(heartbeat_seconds).await,
        }
    }
}

/// The harness secret as a `SecretString`, for direct grant construction
/// in tests that bypass the REST surface.
#[must_use]
pub fn signing_secret() -> SecretString {
    SecretString::from(TEST_SIGNING_SECRET)
}
