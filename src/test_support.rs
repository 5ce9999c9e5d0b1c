//! In-memory dialer that stands in for the game server in tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use protocol::{InboundMessage, RequestEnvelope, Response, ResponseEnvelope};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, timeout};

use crate::config::{ClientConfig, Credentials};
use crate::error::TransportError;
use crate::transport::{Dialer, Endpoint, Link};

pub(crate) const PLAYER_ID: u64 = 76_561_198_000_000_001;
pub(crate) const PLAYER_TOKEN: i32 = -1_234_567;

pub(crate) fn test_config() -> ClientConfig {
    ClientConfig::new(Credentials {
        server: "203.0.113.7".to_owned(),
        port: 28082,
        player_id: PLAYER_ID,
        player_token: PLAYER_TOKEN,
        use_facepunch_proxy: false,
    })
}

/// Server end of one accepted link.
pub(crate) struct ServerConn {
    pub(crate) from_client: mpsc::UnboundedReceiver<Vec<u8>>,
    pub(crate) to_client: mpsc::UnboundedSender<Result<Vec<u8>, TransportError>>,
}

impl ServerConn {
    /// Next request the client sent, decoded.
    pub(crate) async fn recv_request(&mut self) -> RequestEnvelope {
        let bytes = timeout(Duration::from_secs(1), self.from_client.recv())
            .await
            .expect("request receive timed out")
            .expect("client link closed");
        protocol::decode_request(&bytes).expect("client sent undecodable request")
    }

    pub(crate) fn send_message(&self, message: &InboundMessage) {
        self.send_raw(protocol::encode_message(message));
    }

    pub(crate) fn send_raw(&self, bytes: Vec<u8>) {
        self.to_client.send(Ok(bytes)).expect("client stream dropped");
    }

    pub(crate) fn respond(&self, seq: u32, payload: Response) {
        self.send_message(&response_message(seq, None, Some(payload)));
    }

    pub(crate) fn respond_error(&self, seq: u32, error: &str) {
        self.send_message(&response_message(seq, Some(error.to_owned()), None));
    }
}

pub(crate) fn response_message(seq: u32, error: Option<String>, payload: Option<Response>) -> InboundMessage {
    InboundMessage { response: Some(ResponseEnvelope { seq, error, payload }), broadcast: None }
}

/// Scriptable [`Dialer`]: counts dials, can fail or hold the next attempt.
pub(crate) struct MemoryDialer {
    dials: AtomicUsize,
    failures: Mutex<VecDeque<TransportError>>,
    holds: Mutex<VecDeque<oneshot::Receiver<()>>>,
    accepted: mpsc::UnboundedSender<ServerConn>,
}

impl MemoryDialer {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<ServerConn>) {
        let (accepted, accepted_rx) = mpsc::unbounded_channel();
        let dialer = Self {
            dials: AtomicUsize::new(0),
            failures: Mutex::new(VecDeque::new()),
            holds: Mutex::new(VecDeque::new()),
            accepted,
        };
        (dialer, accepted_rx)
    }

    pub(crate) fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Make the next dial fail with `error`.
    pub(crate) fn fail_next(&self, error: TransportError) {
        self.failures.lock().expect("failures mutex").push_back(error);
    }

    /// Hold the next dial until the returned sender fires (or is dropped).
    pub(crate) fn hold_next(&self) -> oneshot::Sender<()> {
        let (release, held) = oneshot::channel();
        self.holds.lock().expect("holds mutex").push_back(held);
        release
    }
}

#[async_trait]
impl Dialer for MemoryDialer {
    async fn dial(&self, _endpoint: &Endpoint) -> Result<Link, TransportError> {
        self.dials.fetch_add(1, Ordering::SeqCst);

        let held = self.holds.lock().expect("holds mutex").pop_front();
        if let Some(held) = held {
            let _ = held.await;
        }
        let failure = self.failures.lock().expect("failures mutex").pop_front();
        if let Some(error) = failure {
            return Err(error);
        }

        let (to_server, from_client) = mpsc::unbounded_channel::<Vec<u8>>();
        let (to_client, from_server) = mpsc::unbounded_channel::<Result<Vec<u8>, TransportError>>();
        let _ = self.accepted.send(ServerConn { from_client, to_client });

        let sink = futures_util::sink::unfold(to_server, |to_server, bytes: Vec<u8>| async move {
            to_server.send(bytes).map_err(|_| TransportError::Closed)?;
            Ok::<_, TransportError>(to_server)
        });
        let stream = futures_util::stream::unfold(from_server, |mut from_server| async move {
            from_server.recv().await.map(|item| (item, from_server))
        });

        Ok(Link { sink: Box::pin(sink), stream: Box::pin(stream) })
    }
}

/// Wait for the next accepted server connection.
pub(crate) async fn accept(accepted: &mut mpsc::UnboundedReceiver<ServerConn>) -> ServerConn {
    timeout(Duration::from_secs(1), accepted.recv())
        .await
        .expect("accept timed out")
        .expect("dialer dropped")
}
