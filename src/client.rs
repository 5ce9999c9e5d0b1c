//! Request broker — the public async call surface.
//!
//! DESIGN
//! ======
//! [`Client`] is a cheap, cloneable handle onto one supervisor task. Every
//! call goes through the same pipeline: ensure connected, submit through the
//! supervisor with an absolute deadline, await the correlated response, then
//! strip the envelope. Server-side errors come back as
//! [`ClientError::Remote`]; timeouts as [`ClientError::Timeout`].
//!
//! Payloads are returned raw. Shaping, caching and persistence belong to the
//! caller.

use std::sync::Arc;
use std::time::Duration;

use protocol::{
    AppEntityInfo, AppFlag, AppInfo, AppMap, AppMapMarkers, AppTeamChat, AppTeamInfo, AppTime,
    Request, Response, ResponseEnvelope,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::supervisor::{ClientEvent, Command, ConnectionState, Supervisor};
use crate::transport::{Dialer, WsDialer};

const EVENT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<ClientEvent>,
    config: Arc<ClientConfig>,
}

impl Client {
    /// Build a client that dials real websockets. Must be called inside a
    /// tokio runtime. No connection is opened until the first call.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_dialer(config, Arc::new(WsDialer))
    }

    /// Build a client over a custom [`Dialer`].
    #[must_use]
    pub fn with_dialer(config: ClientConfig, dialer: Arc<dyn Dialer>) -> Self {
        let config = Arc::new(config);
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Supervisor::spawn(Arc::clone(&config), dialer, commands_rx, state_tx, events.clone());
        Self { commands, state, events, config }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Lifecycle events, broadcasts, and unmatched responses.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // CONNECTION
    // =========================================================================

    /// Connect, or join the attempt already in progress.
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] if the attempt fails,
    /// [`ClientError::ConnectTimeout`] if `timeout` elapses first, and
    /// [`ClientError::Closed`] after shutdown.
    pub async fn connect(&self, timeout: Duration) -> Result<(), ClientError> {
        if self.is_connected() {
            return Ok(());
        }

        let (reply, outcome) = oneshot::channel();
        self.commands.send(Command::Connect { reply }).map_err(|_| ClientError::Closed)?;

        // On timeout the attempt keeps running; only this caller stops waiting.
        match tokio::time::timeout(timeout, outcome).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::ConnectTimeout(timeout)),
        }
    }

    /// No-op when connected, otherwise [`Self::connect`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::connect`].
    pub async fn ensure_connected(&self, timeout: Duration) -> Result<(), ClientError> {
        if self.is_connected() {
            return Ok(());
        }
        self.connect(timeout).await
    }

    /// Close the link without scheduling a reconnect. The next call
    /// reconnects on demand.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Stop the supervisor. Later calls on any handle fail with
    /// [`ClientError::Closed`].
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    // =========================================================================
    // REQUESTS
    // =========================================================================

    /// Send `request` and return the raw response envelope, error field
    /// included.
    ///
    /// # Errors
    ///
    /// Connection errors from [`Self::ensure_connected`],
    /// [`ClientError::Timeout`] when no response arrives in time.
    pub async fn send_request(&self, request: Request, timeout: Duration) -> Result<ResponseEnvelope, ClientError> {
        self.ensure_connected(timeout).await?;

        let (reply, outcome) = oneshot::channel();
        let deadline = Instant::now() + timeout;
        self.commands
            .send(Command::Submit { request, deadline, reply })
            .map_err(|_| ClientError::Closed)?;

        outcome.await.map_err(|_| ClientError::Closed)?
    }

    /// Send `request` and return its payload, with the envelope stripped.
    ///
    /// # Errors
    ///
    /// [`ClientError::Remote`] when the server set its error field, plus
    /// everything [`Self::send_request`] returns.
    pub async fn request(&self, request: Request, timeout: Duration) -> Result<Option<Response>, ClientError> {
        let envelope = self.send_request(request, timeout).await?;
        match envelope.error {
            Some(error) => Err(ClientError::Remote(error)),
            None => Ok(envelope.payload),
        }
    }

    /// # Errors
    ///
    /// See [`Self::request`]; [`ClientError::MissingPayload`] when no info came back.
    pub async fn get_info(&self, timeout: Option<Duration>) -> Result<AppInfo, ClientError> {
        match self.request(Request::GetInfo, self.timeout_or_default(timeout)).await? {
            Some(Response::Info(info)) => Ok(info),
            _ => Err(ClientError::MissingPayload("info")),
        }
    }

    /// # Errors
    ///
    /// See [`Self::request`]; [`ClientError::MissingPayload`] when no map came back.
    pub async fn get_map_raw(&self, timeout: Option<Duration>) -> Result<AppMap, ClientError> {
        match self.request(Request::GetMap, self.timeout_or_default(timeout)).await? {
            Some(Response::Map(map)) => Ok(map),
            _ => Err(ClientError::MissingPayload("map")),
        }
    }

    /// Map markers payload. An absent payload reads as an empty marker list.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn get_map_markers_raw(&self, timeout: Option<Duration>) -> Result<AppMapMarkers, ClientError> {
        match self.request(Request::GetMapMarkers, self.timeout_or_default(timeout)).await? {
            Some(Response::MapMarkers(markers)) => Ok(markers),
            _ => Ok(AppMapMarkers::default()),
        }
    }

    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn get_time(&self, timeout: Option<Duration>) -> Result<AppTime, ClientError> {
        match self.request(Request::GetTime, self.timeout_or_default(timeout)).await? {
            Some(Response::Time(time)) => Ok(time),
            _ => Err(ClientError::MissingPayload("time")),
        }
    }

    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn get_team_info(&self, timeout: Option<Duration>) -> Result<AppTeamInfo, ClientError> {
        match self.request(Request::GetTeamInfo, self.timeout_or_default(timeout)).await? {
            Some(Response::TeamInfo(team)) => Ok(team),
            _ => Err(ClientError::MissingPayload("teamInfo")),
        }
    }

    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn get_team_chat(&self, timeout: Option<Duration>) -> Result<AppTeamChat, ClientError> {
        match self.request(Request::GetTeamChat, self.timeout_or_default(timeout)).await? {
            Some(Response::TeamChat(chat)) => Ok(chat),
            _ => Err(ClientError::MissingPayload("teamChat")),
        }
    }

    /// Post to team chat. The server acknowledges with an empty success.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn send_team_message(&self, message: &str, timeout: Option<Duration>) -> Result<(), ClientError> {
        let request = Request::SendTeamMessage { message: message.to_owned() };
        self.request(request, self.timeout_or_default(timeout)).await.map(|_| ())
    }

    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn get_entity_info(&self, entity_id: u32, timeout: Option<Duration>) -> Result<AppEntityInfo, ClientError> {
        match self.request(Request::GetEntityInfo { entity_id }, self.timeout_or_default(timeout)).await? {
            Some(Response::EntityInfo(info)) => Ok(info),
            _ => Err(ClientError::MissingPayload("entityInfo")),
        }
    }

    /// Switch a smart switch or similar entity on or off.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn set_entity_value(&self, entity_id: u32, value: bool, timeout: Option<Duration>) -> Result<(), ClientError> {
        let request = Request::SetEntityValue { entity_id, value };
        self.request(request, self.timeout_or_default(timeout)).await.map(|_| ())
    }

    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn check_subscription(&self, entity_id: u32, timeout: Option<Duration>) -> Result<AppFlag, ClientError> {
        match self.request(Request::CheckSubscription { entity_id }, self.timeout_or_default(timeout)).await? {
            Some(Response::Flag(flag)) => Ok(flag),
            _ => Err(ClientError::MissingPayload("flag")),
        }
    }

    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn set_subscription(&self, entity_id: u32, value: bool, timeout: Option<Duration>) -> Result<(), ClientError> {
        let request = Request::SetSubscription { entity_id, value };
        self.request(request, self.timeout_or_default(timeout)).await.map(|_| ())
    }

    fn timeout_or_default(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.config.request_timeout)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
