//! Transport — one physical websocket link at a time.
//!
//! DESIGN
//! ======
//! `Transport::open` spawns a link task that dials, then pumps frames in both
//! directions until the link ends. Every lifecycle change is reported as a
//! [`TransportEvent`] on the supervisor's signal channel, tagged with the
//! generation of the link that produced it. `accept` drops signals from any
//! generation other than the active one, so a closed link can never flip the
//! state of its replacement.
//!
//! A dial that neither succeeds nor fails within `dial_timeout` is reported
//! as [`TransportError::DialTimeout`], so a stalled handshake cannot pin the
//! supervisor in `Connecting`.
//!
//! Dialing sits behind the [`Dialer`] trait. Production uses [`WsDialer`]
//! (tokio-tungstenite); tests plug in an in-memory dialer.
//!
//! RELAY MODE
//! ==========
//! With `use_facepunch_proxy`, the target becomes the companion relay and the
//! handshake carries the relay's origin and browser-like headers. Framing is
//! identical in both modes.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{CACHE_CONTROL, HeaderName, ORIGIN, PRAGMA, USER_AGENT};
use tracing::{debug, info};

use crate::config::Credentials;
use crate::error::TransportError;

const RELAY_HOST: &str = "companion-rust.facepunch.com";
const RELAY_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/119.0.0.0 Safari/537.36 rustmarkets/1.0";

// =============================================================================
// ENDPOINT
// =============================================================================

/// Where to dial and which extra handshake headers to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub origin: Option<String>,
    pub headers: Vec<(HeaderName, String)>,
}

impl Endpoint {
    /// Direct `ws://server:port`, or the relay path when the proxy flag is set.
    #[must_use]
    pub fn for_credentials(credentials: &Credentials) -> Self {
        if credentials.use_facepunch_proxy {
            return Self {
                url: format!("wss://{RELAY_HOST}/game/{}/{}", credentials.server, credentials.port),
                origin: Some(format!("https://{RELAY_HOST}")),
                headers: vec![
                    (USER_AGENT, RELAY_USER_AGENT.to_owned()),
                    (PRAGMA, "no-cache".to_owned()),
                    (CACHE_CONTROL, "no-cache".to_owned()),
                ],
            };
        }

        Self {
            url: format!("ws://{}:{}", credentials.server, credentials.port),
            origin: None,
            headers: Vec::new(),
        }
    }
}

// =============================================================================
// DIALER
// =============================================================================

pub type FrameSink = Pin<Box<dyn Sink<Vec<u8>, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// An established duplex link carrying opaque binary frames.
pub struct Link {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens physical links. One call per connect attempt.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    async fn dial(&self, endpoint: &Endpoint) -> Result<Link, TransportError>;
}

/// Websocket dialer over tokio-tungstenite with rustls.
pub struct WsDialer;

#[async_trait]
impl Dialer for WsDialer {
    async fn dial(&self, endpoint: &Endpoint) -> Result<Link, TransportError> {
        let mut request = endpoint.url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        if let Some(origin) = &endpoint.origin {
            headers.insert(ORIGIN, HeaderValue::from_str(origin)?);
        }
        for (name, value) in &endpoint.headers {
            headers.insert(name.clone(), HeaderValue::from_str(value)?);
        }

        let (socket, _) = connect_async(request).await?;
        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(TransportError::from)
            .with(|bytes: Vec<u8>| future::ready(Ok::<_, TransportError>(Message::Binary(bytes.into()))));
        // Text, ping and pong frames carry nothing for us; tungstenite answers pings itself.
        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Binary(bytes)) => Some(Ok(bytes.to_vec())),
                Ok(_) => None,
                Err(error) => Some(Err(TransportError::from(error))),
            })
        });

        Ok(Link { sink: Box::pin(sink), stream: Box::pin(stream) })
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Lifecycle notification from a link. No reply is expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connecting,
    Connected,
    Disconnected,
    Error(TransportError),
    Frame(Vec<u8>),
}

/// A [`TransportEvent`] tagged with the link generation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub generation: u64,
    pub event: TransportEvent,
}

// =============================================================================
// TRANSPORT
// =============================================================================

struct ActiveLink {
    generation: u64,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    connected: bool,
    task: JoinHandle<()>,
}

/// Owner of the single active link.
pub struct Transport {
    dialer: Arc<dyn Dialer>,
    signals: mpsc::UnboundedSender<Signal>,
    dial_timeout: Duration,
    generation: u64,
    active: Option<ActiveLink>,
}

impl Transport {
    #[must_use]
    pub fn new(dialer: Arc<dyn Dialer>, signals: mpsc::UnboundedSender<Signal>, dial_timeout: Duration) -> Self {
        Self { dialer, signals, dial_timeout, generation: 0, active: None }
    }

    /// Start a new link, terminating any existing one first.
    /// Returns the generation tag of the new link.
    pub fn open(&mut self, endpoint: Endpoint) -> u64 {
        self.close();
        self.generation += 1;
        let generation = self.generation;

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_link(
            Arc::clone(&self.dialer),
            endpoint,
            generation,
            self.dial_timeout,
            self.signals.clone(),
            outbound_rx,
        ));

        self.active = Some(ActiveLink { generation, outbound, connected: false, task });
        generation
    }

    /// Queue one frame on the active link.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] unless the active link has
    /// reported `Connected`, and [`TransportError::Closed`] if its task ended.
    pub fn send(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        match &self.active {
            Some(link) if link.connected => link.outbound.send(bytes).map_err(|_| TransportError::Closed),
            _ => Err(TransportError::NotConnected),
        }
    }

    /// Terminate the active link immediately. Its pending signals become stale.
    pub fn close(&mut self) {
        if let Some(link) = self.active.take() {
            debug!(generation = link.generation, "transport: closing link");
            link.task.abort();
        }
    }

    /// Filter a signal against the active link and update link bookkeeping.
    /// Returns `None` for signals from a stale generation.
    pub fn accept(&mut self, signal: Signal) -> Option<TransportEvent> {
        let link = self.active.as_mut()?;
        if link.generation != signal.generation {
            debug!(stale = signal.generation, active = link.generation, "transport: dropping stale signal");
            return None;
        }

        match &signal.event {
            TransportEvent::Connected => link.connected = true,
            TransportEvent::Disconnected => self.active = None,
            _ => {}
        }
        Some(signal.event)
    }

    /// True while a link exists, whether still dialing or established.
    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_link(
    dialer: Arc<dyn Dialer>,
    endpoint: Endpoint,
    generation: u64,
    dial_timeout: Duration,
    signals: mpsc::UnboundedSender<Signal>,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let emit = |event: TransportEvent| {
        // The supervisor may already be gone during shutdown.
        let _ = signals.send(Signal { generation, event });
    };

    emit(TransportEvent::Connecting);
    info!(generation, url = %endpoint.url, "transport: dialing");

    let dialed = tokio::time::timeout(dial_timeout, dialer.dial(&endpoint))
        .await
        .unwrap_or(Err(TransportError::DialTimeout(dial_timeout)));
    let Link { mut sink, mut stream } = match dialed {
        Ok(link) => link,
        Err(error) => {
            emit(TransportEvent::Error(error));
            emit(TransportEvent::Disconnected);
            return;
        }
    };
    emit(TransportEvent::Connected);

    loop {
        tokio::select! {
            outgoing = outbound.recv() => {
                let Some(bytes) = outgoing else { break };
                if let Err(error) = sink.send(bytes).await {
                    emit(TransportEvent::Error(error));
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(bytes)) => emit(TransportEvent::Frame(bytes)),
                Some(Err(error)) => {
                    emit(TransportEvent::Error(error));
                    break;
                }
                None => break,
            },
        }
    }

    emit(TransportEvent::Disconnected);
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
