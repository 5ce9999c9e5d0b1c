//! Envelope model and protobuf codec for the Rust+ companion protocol.
//!
//! This crate owns the wire representation spoken by the game server over its
//! websocket. Every outbound frame is one `AppRequest`; every inbound frame is
//! one `AppMessage`, which carries either a response correlated by `seq` or an
//! unsolicited broadcast.
//!
//! DESIGN
//! ======
//! - Wire structs are private and mirror the server schema tag-for-tag.
//! - Callers work with [`RequestEnvelope`] / [`InboundMessage`], where the
//!   request kind and response payload are plain Rust enums.
//! - Payload bodies ([`AppInfo`], [`AppMap`], ...) are public and passed
//!   through untouched.

mod payloads;

use prost::Message;
use serde::Serialize;

pub use payloads::*;

/// Error returned by [`decode_message`] and [`decode_request`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf message.
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    /// A request frame carried no request kind.
    #[error("request seq {0} carries no request kind")]
    MissingRequestKind(u32),
}

// =============================================================================
// REQUESTS
// =============================================================================

/// One request kind. Exactly one is sent per envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    GetInfo,
    GetTime,
    GetMap,
    GetTeamInfo,
    GetTeamChat,
    SendTeamMessage { message: String },
    GetEntityInfo { entity_id: u32 },
    SetEntityValue { entity_id: u32, value: bool },
    CheckSubscription { entity_id: u32 },
    SetSubscription { entity_id: u32, value: bool },
    GetMapMarkers,
}

impl Request {
    /// Schema name of the request kind, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetInfo => "getInfo",
            Self::GetTime => "getTime",
            Self::GetMap => "getMap",
            Self::GetTeamInfo => "getTeamInfo",
            Self::GetTeamChat => "getTeamChat",
            Self::SendTeamMessage { .. } => "sendTeamMessage",
            Self::GetEntityInfo { .. } => "getEntityInfo",
            Self::SetEntityValue { .. } => "setEntityValue",
            Self::CheckSubscription { .. } => "checkSubscription",
            Self::SetSubscription { .. } => "setSubscription",
            Self::GetMapMarkers => "getMapMarkers",
        }
    }

    /// Target entity for entity-scoped kinds.
    #[must_use]
    pub fn entity_id(&self) -> Option<u32> {
        match self {
            Self::GetEntityInfo { entity_id }
            | Self::SetEntityValue { entity_id, .. }
            | Self::CheckSubscription { entity_id }
            | Self::SetSubscription { entity_id, .. } => Some(*entity_id),
            _ => None,
        }
    }
}

/// Outbound envelope: sequence id, credentials, and one request kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestEnvelope {
    pub seq: u32,
    pub player_id: u64,
    pub player_token: i32,
    pub request: Request,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Response payload, mirroring the request kinds.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Response {
    Success(AppSuccess),
    Info(AppInfo),
    Time(AppTime),
    Map(AppMap),
    TeamInfo(AppTeamInfo),
    TeamChat(AppTeamChat),
    EntityInfo(AppEntityInfo),
    Flag(AppFlag),
    MapMarkers(AppMapMarkers),
}

/// Inbound response correlated to a request by `seq`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub seq: u32,
    /// Server-reported failure. When set, `payload` should be ignored.
    pub error: Option<String>,
    /// Absent when the server sent no payload field at all.
    pub payload: Option<Response>,
}

/// Server-initiated push, never correlated to a request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Broadcast {
    TeamChanged(AppTeamChanged),
    TeamMessage(AppNewTeamMessage),
    EntityChanged(AppEntityChanged),
}

/// A decoded inbound frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InboundMessage {
    pub response: Option<ResponseEnvelope>,
    pub broadcast: Option<Broadcast>,
}

impl InboundMessage {
    /// Correlation id, or `None` for broadcasts and `seq == 0` responses.
    #[must_use]
    pub fn seq(&self) -> Option<u32> {
        self.response
            .as_ref()
            .map(|response| response.seq)
            .filter(|seq| *seq != 0)
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode a request envelope into protobuf bytes.
#[must_use]
pub fn encode_request(envelope: &RequestEnvelope) -> Vec<u8> {
    request_to_wire(envelope).encode_to_vec()
}

/// Decode protobuf bytes into a request envelope.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::MissingRequestKind`] when no kind field is present.
pub fn decode_request(bytes: &[u8]) -> Result<RequestEnvelope, CodecError> {
    let wire = WireRequest::decode(bytes)?;
    wire_to_request(wire)
}

/// Encode an inbound message. Used by servers and test doubles.
#[must_use]
pub fn encode_message(message: &InboundMessage) -> Vec<u8> {
    message_to_wire(message).encode_to_vec()
}

/// Decode protobuf bytes into an inbound message.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes.
pub fn decode_message(bytes: &[u8]) -> Result<InboundMessage, CodecError> {
    let wire = WireMessage::decode(bytes)?;
    Ok(wire_to_message(wire))
}

fn request_to_wire(envelope: &RequestEnvelope) -> WireRequest {
    let kind = match &envelope.request {
        Request::GetInfo => WireRequestKind::GetInfo(AppEmpty {}),
        Request::GetTime => WireRequestKind::GetTime(AppEmpty {}),
        Request::GetMap => WireRequestKind::GetMap(AppEmpty {}),
        Request::GetTeamInfo => WireRequestKind::GetTeamInfo(AppEmpty {}),
        Request::GetTeamChat => WireRequestKind::GetTeamChat(AppEmpty {}),
        Request::SendTeamMessage { message } => {
            WireRequestKind::SendTeamMessage(AppSendMessage { message: message.clone() })
        }
        Request::GetEntityInfo { .. } => WireRequestKind::GetEntityInfo(AppEmpty {}),
        Request::SetEntityValue { value, .. } => {
            WireRequestKind::SetEntityValue(AppSetEntityValue { value: *value })
        }
        Request::CheckSubscription { .. } => WireRequestKind::CheckSubscription(AppEmpty {}),
        Request::SetSubscription { value, .. } => {
            WireRequestKind::SetSubscription(AppFlag { value: *value })
        }
        Request::GetMapMarkers => WireRequestKind::GetMapMarkers(AppEmpty {}),
    };

    WireRequest {
        seq: envelope.seq,
        player_id: envelope.player_id,
        player_token: envelope.player_token,
        entity_id: envelope.request.entity_id(),
        kind: Some(kind),
    }
}

fn wire_to_request(wire: WireRequest) -> Result<RequestEnvelope, CodecError> {
    let Some(kind) = wire.kind else {
        return Err(CodecError::MissingRequestKind(wire.seq));
    };
    let entity_id = wire.entity_id.unwrap_or_default();

    let request = match kind {
        WireRequestKind::GetInfo(_) => Request::GetInfo,
        WireRequestKind::GetTime(_) => Request::GetTime,
        WireRequestKind::GetMap(_) => Request::GetMap,
        WireRequestKind::GetTeamInfo(_) => Request::GetTeamInfo,
        WireRequestKind::GetTeamChat(_) => Request::GetTeamChat,
        WireRequestKind::SendTeamMessage(body) => Request::SendTeamMessage { message: body.message },
        WireRequestKind::GetEntityInfo(_) => Request::GetEntityInfo { entity_id },
        WireRequestKind::SetEntityValue(body) => Request::SetEntityValue { entity_id, value: body.value },
        WireRequestKind::CheckSubscription(_) => Request::CheckSubscription { entity_id },
        WireRequestKind::SetSubscription(body) => Request::SetSubscription { entity_id, value: body.value },
        WireRequestKind::GetMapMarkers(_) => Request::GetMapMarkers,
    };

    Ok(RequestEnvelope {
        seq: wire.seq,
        player_id: wire.player_id,
        player_token: wire.player_token,
        request,
    })
}

fn message_to_wire(message: &InboundMessage) -> WireMessage {
    WireMessage {
        response: message.response.as_ref().map(|response| WireResponse {
            seq: response.seq,
            error: response.error.clone().map(|error| AppError { error }),
            payload: response.payload.clone().map(response_to_wire),
        }),
        broadcast: message.broadcast.clone().map(|broadcast| WireBroadcast {
            payload: Some(broadcast_to_wire(broadcast)),
        }),
    }
}

fn wire_to_message(wire: WireMessage) -> InboundMessage {
    InboundMessage {
        response: wire.response.map(|response| ResponseEnvelope {
            seq: response.seq,
            error: response.error.map(|error| error.error),
            payload: response.payload.map(wire_to_response),
        }),
        broadcast: wire
            .broadcast
            .and_then(|broadcast| broadcast.payload)
            .map(wire_to_broadcast),
    }
}

fn response_to_wire(response: Response) -> WireResponsePayload {
    match response {
        Response::Success(v) => WireResponsePayload::Success(v),
        Response::Info(v) => WireResponsePayload::Info(v),
        Response::Time(v) => WireResponsePayload::Time(v),
        Response::Map(v) => WireResponsePayload::Map(v),
        Response::TeamInfo(v) => WireResponsePayload::TeamInfo(v),
        Response::TeamChat(v) => WireResponsePayload::TeamChat(v),
        Response::EntityInfo(v) => WireResponsePayload::EntityInfo(v),
        Response::Flag(v) => WireResponsePayload::Flag(v),
        Response::MapMarkers(v) => WireResponsePayload::MapMarkers(v),
    }
}

fn wire_to_response(payload: WireResponsePayload) -> Response {
    match payload {
        WireResponsePayload::Success(v) => Response::Success(v),
        WireResponsePayload::Info(v) => Response::Info(v),
        WireResponsePayload::Time(v) => Response::Time(v),
        WireResponsePayload::Map(v) => Response::Map(v),
        WireResponsePayload::TeamInfo(v) => Response::TeamInfo(v),
        WireResponsePayload::TeamChat(v) => Response::TeamChat(v),
        WireResponsePayload::EntityInfo(v) => Response::EntityInfo(v),
        WireResponsePayload::Flag(v) => Response::Flag(v),
        WireResponsePayload::MapMarkers(v) => Response::MapMarkers(v),
    }
}

fn broadcast_to_wire(broadcast: Broadcast) -> WireBroadcastPayload {
    match broadcast {
        Broadcast::TeamChanged(v) => WireBroadcastPayload::TeamChanged(v),
        Broadcast::TeamMessage(v) => WireBroadcastPayload::TeamMessage(v),
        Broadcast::EntityChanged(v) => WireBroadcastPayload::EntityChanged(v),
    }
}

fn wire_to_broadcast(payload: WireBroadcastPayload) -> Broadcast {
    match payload {
        WireBroadcastPayload::TeamChanged(v) => Broadcast::TeamChanged(v),
        WireBroadcastPayload::TeamMessage(v) => Broadcast::TeamMessage(v),
        WireBroadcastPayload::EntityChanged(v) => Broadcast::EntityChanged(v),
    }
}

// =============================================================================
// WIRE SCHEMA
// =============================================================================

#[derive(Clone, PartialEq, Message)]
struct WireRequest {
    #[prost(uint32, required, tag = "1")]
    seq: u32,
    #[prost(uint64, required, tag = "2")]
    player_id: u64,
    #[prost(int32, required, tag = "3")]
    player_token: i32,
    #[prost(uint32, optional, tag = "4")]
    entity_id: Option<u32>,
    #[prost(
        oneof = "WireRequestKind",
        tags = "8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18"
    )]
    kind: Option<WireRequestKind>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
enum WireRequestKind {
    #[prost(message, tag = "8")]
    GetInfo(AppEmpty),
    #[prost(message, tag = "9")]
    GetTime(AppEmpty),
    #[prost(message, tag = "10")]
    GetMap(AppEmpty),
    #[prost(message, tag = "11")]
    GetTeamInfo(AppEmpty),
    #[prost(message, tag = "12")]
    GetTeamChat(AppEmpty),
    #[prost(message, tag = "13")]
    SendTeamMessage(AppSendMessage),
    #[prost(message, tag = "14")]
    GetEntityInfo(AppEmpty),
    #[prost(message, tag = "15")]
    SetEntityValue(AppSetEntityValue),
    #[prost(message, tag = "16")]
    CheckSubscription(AppEmpty),
    #[prost(message, tag = "17")]
    SetSubscription(AppFlag),
    #[prost(message, tag = "18")]
    GetMapMarkers(AppEmpty),
}

#[derive(Clone, PartialEq, Message)]
struct WireMessage {
    #[prost(message, optional, tag = "1")]
    response: Option<WireResponse>,
    #[prost(message, optional, tag = "2")]
    broadcast: Option<WireBroadcast>,
}

#[derive(Clone, PartialEq, Message)]
struct WireResponse {
    #[prost(uint32, tag = "1")]
    seq: u32,
    #[prost(message, optional, tag = "5")]
    error: Option<AppError>,
    #[prost(oneof = "WireResponsePayload", tags = "4, 6, 7, 8, 9, 10, 11, 12, 13")]
    payload: Option<WireResponsePayload>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
enum WireResponsePayload {
    #[prost(message, tag = "4")]
    Success(AppSuccess),
    #[prost(message, tag = "6")]
    Info(AppInfo),
    #[prost(message, tag = "7")]
    Time(AppTime),
    #[prost(message, tag = "8")]
    Map(AppMap),
    #[prost(message, tag = "9")]
    TeamInfo(AppTeamInfo),
    #[prost(message, tag = "10")]
    TeamChat(AppTeamChat),
    #[prost(message, tag = "11")]
    EntityInfo(AppEntityInfo),
    #[prost(message, tag = "12")]
    Flag(AppFlag),
    #[prost(message, tag = "13")]
    MapMarkers(AppMapMarkers),
}

#[derive(Clone, PartialEq, Message)]
struct WireBroadcast {
    #[prost(oneof = "WireBroadcastPayload", tags = "4, 5, 6")]
    payload: Option<WireBroadcastPayload>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
enum WireBroadcastPayload {
    #[prost(message, tag = "4")]
    TeamChanged(AppTeamChanged),
    #[prost(message, tag = "5")]
    TeamMessage(AppNewTeamMessage),
    #[prost(message, tag = "6")]
    EntityChanged(AppEntityChanged),
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
