//! Supervisor — the single task that owns the connection.
//!
//! DESIGN
//! ======
//! One spawned task exclusively owns the [`Transport`], the [`Sequencer`],
//! and the connection state. Client handles never touch them directly: they
//! send a [`Command`] and wait on a oneshot reply. Transport signals, command
//! arrivals, the reconnect timer, and request deadlines are all multiplexed
//! in one `select!` loop, so table and state mutations never race.
//!
//! STATE MACHINE
//! =============
//! `Disconnected -> Connecting -> Connected -> Disconnected`. Concurrent
//! connect calls while `Connecting` join the outstanding attempt. Every
//! transition into `Disconnected` that the caller did not ask for schedules a
//! reconnect after `reconnect_delay`. An explicit disconnect or shutdown
//! cancels it.
//!
//! In-flight requests are not failed when the link drops; they run out their
//! own deadlines.

use std::sync::Arc;

use protocol::{InboundMessage, Request};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};
use crate::sequencer::{Completion, Sequencer};
use crate::transport::{Dialer, Endpoint, Signal, Transport, TransportEvent};

/// Reply channel for a connect attempt.
pub type ConnectReply = oneshot::Sender<Result<(), ClientError>>;

/// Instruction from a client handle to the supervisor task.
pub enum Command {
    Connect { reply: ConnectReply },
    Submit { request: Request, deadline: Instant, reply: Completion },
    Disconnect,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Lifecycle and unsolicited traffic published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connecting,
    Connected,
    Disconnected,
    Error(String),
    /// Broadcasts, and responses that matched no pending request.
    Message(InboundMessage),
}

pub struct Supervisor {
    config: Arc<ClientConfig>,
    endpoint: Endpoint,
    transport: Transport,
    sequencer: Sequencer,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ClientEvent>,
    connect_waiters: Vec<ConnectReply>,
    reconnect_at: Option<Instant>,
}

impl Supervisor {
    /// Spawn the supervisor task. It runs until it receives
    /// [`Command::Shutdown`] or every command sender is dropped.
    pub fn spawn(
        config: Arc<ClientConfig>,
        dialer: Arc<dyn Dialer>,
        commands: mpsc::UnboundedReceiver<Command>,
        state: watch::Sender<ConnectionState>,
        events: broadcast::Sender<ClientEvent>,
    ) -> JoinHandle<()> {
        let (signals_tx, signals) = mpsc::unbounded_channel();
        let supervisor = Self {
            endpoint: Endpoint::for_credentials(&config.credentials),
            transport: Transport::new(dialer, signals_tx, config.request_timeout),
            config,
            sequencer: Sequencer::new(),
            state,
            events,
            connect_waiters: Vec::new(),
            reconnect_at: None,
        };
        tokio::spawn(supervisor.run(commands, signals))
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, mut signals: mpsc::UnboundedReceiver<Signal>) {
        loop {
            let reconnect_at = self.reconnect_at;
            let next_deadline = self.sequencer.next_deadline();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(signal) = signals.recv() => {
                    if let Some(event) = self.transport.accept(signal) {
                        self.handle_transport_event(event);
                    }
                }
                () = sleep_until_some(reconnect_at) => self.reconnect(),
                () = sleep_until_some(next_deadline) => {
                    self.sequencer.expire(Instant::now());
                }
            }
        }

        info!("supervisor: shutting down");
        self.reconnect_at = None;
        self.transport.close();
        self.fail_waiters(&ClientError::Closed);
        self.set_state(ConnectionState::Disconnected);
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { reply } => self.connect(reply),
            Command::Submit { request, deadline, reply } => {
                self.sequencer.prune_abandoned();
                let transport = &self.transport;
                let _ = self.sequencer.submit(&self.config.credentials, request, deadline, reply, |bytes| {
                    transport.send(bytes)
                });
            }
            Command::Disconnect => self.disconnect(),
            Command::Shutdown => {}
        }
    }

    fn connect(&mut self, reply: ConnectReply) {
        let state = *self.state.borrow();
        match state {
            ConnectionState::Connected => {
                let _ = reply.send(Ok(()));
            }
            ConnectionState::Connecting => {
                // Callers whose connect timed out leave closed senders behind.
                self.connect_waiters.retain(|waiter| !waiter.is_closed());
                debug!(waiters = self.connect_waiters.len() + 1, "supervisor: joining connect attempt");
                self.connect_waiters.push(reply);
            }
            ConnectionState::Disconnected => {
                self.connect_waiters.push(reply);
                self.begin_connect();
            }
        }
    }

    fn reconnect(&mut self) {
        self.reconnect_at = None;
        if *self.state.borrow() == ConnectionState::Disconnected {
            info!("supervisor: reconnecting");
            self.begin_connect();
        }
    }

    fn begin_connect(&mut self) {
        self.reconnect_at = None;
        self.set_state(ConnectionState::Connecting);
        self.transport.open(self.endpoint.clone());
    }

    fn disconnect(&mut self) {
        info!("supervisor: disconnect requested");
        self.reconnect_at = None;
        self.transport.close();
        self.fail_waiters(&ClientError::Transport(TransportError::Closed));
        if self.set_state(ConnectionState::Disconnected) != ConnectionState::Disconnected {
            self.emit(ClientEvent::Disconnected);
        }
    }

    // =========================================================================
    // TRANSPORT EVENTS
    // =========================================================================

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connecting => {
                self.set_state(ConnectionState::Connecting);
                self.emit(ClientEvent::Connecting);
            }
            TransportEvent::Connected => {
                info!(url = %self.endpoint.url, "supervisor: connected");
                self.set_state(ConnectionState::Connected);
                for waiter in self.connect_waiters.drain(..) {
                    let _ = waiter.send(Ok(()));
                }
                self.emit(ClientEvent::Connected);
            }
            TransportEvent::Error(error) => {
                warn!(error = %error, "supervisor: transport error");
                self.emit(ClientEvent::Error(error.to_string()));
                if *self.state.borrow() == ConnectionState::Connecting {
                    self.fail_waiters(&ClientError::Transport(error));
                }
            }
            TransportEvent::Disconnected => {
                self.set_state(ConnectionState::Disconnected);
                self.fail_waiters(&ClientError::Transport(TransportError::Closed));
                let delay = self.config.reconnect_delay;
                self.reconnect_at = Some(Instant::now() + delay);
                info!(?delay, "supervisor: disconnected, reconnect scheduled");
                self.emit(ClientEvent::Disconnected);
            }
            TransportEvent::Frame(bytes) => self.handle_frame(&bytes),
        }
    }

    fn handle_frame(&mut self, bytes: &[u8]) {
        let message = match protocol::decode_message(bytes) {
            Ok(message) => message,
            Err(error) => {
                warn!(error = %error, len = bytes.len(), "supervisor: dropping undecodable frame");
                self.emit(ClientEvent::Error(format!("decode error: {error}")));
                return;
            }
        };

        if let Some(unhandled) = self.sequencer.resolve(message) {
            self.emit(ClientEvent::Message(unhandled));
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn fail_waiters(&mut self, error: &ClientError) {
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Err(error.clone()));
        }
    }

    /// Publish `state`, returning the previous one.
    fn set_state(&self, state: ConnectionState) -> ConnectionState {
        self.state.send_replace(state)
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "supervisor_test.rs"]
mod tests;
