#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arcadia_netd::ServerState;
use arcadia_netd::config::ServerConfig;
use arcadia_netd::identity::{DidSyntaxResolver, IdentityResolver};
use arcadia_netd::net::inbound::next_conn_id;
use arcadia_netd::net::rate_limit::RateLimitConfig;
use arcadia_netd::proto_dispatch::ConnCtx;
use arcadia_netd::reward::{CredentialError, CredentialIssuer, LocalCredentialIssuer};
use arcadia_netproto::envelope::Envelope;
use arcadia_netproto::messages::credential::{CredentialRecord, CredentialSubject};
use arcadia_netproto::msg_type::MsgType;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Credential collaborator that always fails and counts calls.
#[derive(Default)]
pub struct FailingIssuer {
    pub calls: AtomicUsize,
}

impl CredentialIssuer for FailingIssuer {
    fn issue_credential(
        &self,
        _identity_ref: &str,
        _credential_type: &str,
        _subject: CredentialSubject,
    ) -> Result<CredentialRecord, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CredentialError::Unavailable("registry offline".into()))
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        rate_limit: RateLimitConfig::disabled(),
        ..ServerConfig::default()
    }
}

pub fn state_with(
    config: ServerConfig,
    credentials: Arc<dyn CredentialIssuer>,
) -> Arc<ServerState> {
    let identity: Arc<dyn IdentityResolver> = Arc::new(DidSyntaxResolver);
    Arc::new(ServerState::new(config, identity, credentials))
}

/// Server state with a working local issuer, returned alongside for
/// inspection.
pub fn local_state(config: ServerConfig) -> (Arc<ServerState>, Arc<LocalCredentialIssuer>) {
    let identity: Arc<dyn IdentityResolver> = Arc::new(DidSyntaxResolver);
    let issuer = Arc::new(LocalCredentialIssuer::new(
        "did:arcadia:issuer",
        Arc::clone(&identity),
    ));
    let state = Arc::new(ServerState::new(
        config,
        identity,
        Arc::clone(&issuer) as Arc<dyn CredentialIssuer>,
    ));
    (state, issuer)
}

/// A connection driven directly through its dispatcher.
pub struct TestConn {
    pub ctx: ConnCtx,
    pub rx: mpsc::Receiver<Message>,
}

impl TestConn {
    pub fn new(state: &Arc<ServerState>) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        Self {
            ctx: ConnCtx::new(Arc::clone(state), next_conn_id(), peer, tx),
            rx,
        }
    }

    pub async fn send(&mut self, msg_type: &str, data: Value) {
        let text = json!({ "type": msg_type, "data": data }).to_string();
        self.ctx.handle_text(&text).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ctx.handle_text(text).await;
    }

    /// Authenticate and return the assigned session id.
    pub async fn auth(&mut self, did: &str) -> String {
        self.send("auth", json!({ "did": did })).await;
        let reply = self.expect(MsgType::Auth);
        assert_eq!(reply.data["success"], true);
        reply.data["sessionId"].as_str().unwrap().to_string()
    }

    pub async fn join(&mut self, room_id: &str) -> Envelope {
        self.send("join_room", json!({ "roomId": room_id })).await;
        self.expect(MsgType::JoinRoom)
    }

    /// Everything delivered so far.
    pub fn drain(&mut self) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            let text = frame.to_text().unwrap();
            out.push(serde_json::from_str(text).unwrap());
        }
        out
    }

    /// Next envelope, which must be of `kind`.
    pub fn expect(&mut self, kind: MsgType) -> Envelope {
        let frame = self
            .rx
            .try_recv()
            .unwrap_or_else(|_| panic!("expected {kind} envelope, queue empty"));
        let env: Envelope = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(env.msg_type, kind, "unexpected envelope {env:?}");
        env
    }

    pub fn assert_empty(&mut self) {
        let rest = self.drain();
        assert!(rest.is_empty(), "unexpected envelopes: {rest:?}");
    }
}
