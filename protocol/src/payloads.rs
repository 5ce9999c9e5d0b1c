//! Payload messages carried inside request and response envelopes.
//!
//! These mirror the server's protobuf schema field-for-field and are handed to
//! callers undecorated. Field tags are fixed by the remote server and must not
//! be renumbered.

use prost::Message;
use serde::Serialize;

// =============================================================================
// REQUEST PAYLOADS
// =============================================================================

/// Empty body used by request kinds that carry no arguments.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct AppEmpty {}

/// Team chat message body for `sendTeamMessage`.
#[derive(Clone, PartialEq, Message)]
pub struct AppSendMessage {
    #[prost(string, tag = "1")]
    pub message: String,
}

/// New value for a smart switch.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct AppSetEntityValue {
    #[prost(bool, tag = "1")]
    pub value: bool,
}

/// Generic boolean flag, used both as a request body and a response payload.
#[derive(Clone, Copy, PartialEq, Message, Serialize)]
pub struct AppFlag {
    #[prost(bool, tag = "1")]
    pub value: bool,
}

// =============================================================================
// RESPONSE PAYLOADS
// =============================================================================

/// Acknowledgement with no body.
#[derive(Clone, Copy, PartialEq, Message, Serialize)]
pub struct AppSuccess {}

/// Error reported by the server in place of a payload.
#[derive(Clone, PartialEq, Message)]
pub struct AppError {
    #[prost(string, tag = "1")]
    pub error: String,
}

/// Server metadata returned for `getInfo`.
#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub header_image: String,
    #[prost(string, tag = "3")]
    pub url: String,
    #[prost(string, tag = "4")]
    pub map: String,
    #[prost(uint32, tag = "5")]
    pub map_size: u32,
    #[prost(uint32, tag = "6")]
    pub wipe_time: u32,
    #[prost(uint32, tag = "7")]
    pub players: u32,
    #[prost(uint32, tag = "8")]
    pub max_players: u32,
    #[prost(uint32, tag = "9")]
    pub queued_players: u32,
    #[prost(uint32, optional, tag = "10")]
    pub seed: Option<u32>,
    #[prost(uint32, optional, tag = "11")]
    pub salt: Option<u32>,
    #[prost(string, optional, tag = "12")]
    pub logo_image: Option<String>,
}

/// In-game clock returned for `getTime`.
#[derive(Clone, Copy, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTime {
    #[prost(float, tag = "1")]
    pub day_length_minutes: f32,
    #[prost(float, tag = "2")]
    pub time_scale: f32,
    #[prost(float, tag = "3")]
    pub sunrise: f32,
    #[prost(float, tag = "4")]
    pub sunset: f32,
    #[prost(float, tag = "5")]
    pub time: f32,
}

/// Rendered world map returned for `getMap`.
#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMap {
    #[prost(uint32, tag = "1")]
    pub width: u32,
    #[prost(uint32, tag = "2")]
    pub height: u32,
    /// JPEG bytes. Skipped when serializing; write them out separately.
    #[prost(bytes = "vec", tag = "3")]
    #[serde(skip)]
    pub jpg_image: Vec<u8>,
    #[prost(int32, tag = "4")]
    pub ocean_margin: i32,
    #[prost(message, repeated, tag = "5")]
    pub monuments: Vec<Monument>,
    #[prost(string, optional, tag = "6")]
    pub background: Option<String>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct Monument {
    #[prost(string, tag = "1")]
    pub token: String,
    #[prost(float, tag = "2")]
    pub x: f32,
    #[prost(float, tag = "3")]
    pub y: f32,
}

/// Marker kinds reported in [`AppMarker::r#type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, prost::Enumeration, Serialize)]
#[repr(i32)]
pub enum AppMarkerType {
    Undefined = 0,
    Player = 1,
    Explosion = 2,
    VendingMachine = 3,
    Ch47 = 4,
    CargoShip = 5,
    Crate = 6,
    GenericRadius = 7,
    PatrolHelicopter = 8,
}

/// All map markers returned for `getMapMarkers`.
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct AppMapMarkers {
    #[prost(message, repeated, tag = "1")]
    pub markers: Vec<AppMarker>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMarker {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(enumeration = "AppMarkerType", tag = "2")]
    pub r#type: i32,
    #[prost(float, tag = "3")]
    pub x: f32,
    #[prost(float, tag = "4")]
    pub y: f32,
    #[prost(uint64, optional, tag = "5")]
    pub steam_id: Option<u64>,
    #[prost(float, optional, tag = "6")]
    pub rotation: Option<f32>,
    #[prost(float, optional, tag = "7")]
    pub radius: Option<f32>,
    #[prost(message, optional, tag = "8")]
    pub color1: Option<Vector4>,
    #[prost(message, optional, tag = "9")]
    pub color2: Option<Vector4>,
    #[prost(float, optional, tag = "10")]
    pub alpha: Option<f32>,
    #[prost(string, optional, tag = "11")]
    pub name: Option<String>,
    #[prost(bool, optional, tag = "12")]
    pub out_of_stock: Option<bool>,
    #[prost(message, repeated, tag = "13")]
    pub sell_orders: Vec<SellOrder>,
}

#[derive(Clone, Copy, PartialEq, Message, Serialize)]
pub struct Vector4 {
    #[prost(float, optional, tag = "1")]
    pub x: Option<f32>,
    #[prost(float, optional, tag = "2")]
    pub y: Option<f32>,
    #[prost(float, optional, tag = "3")]
    pub z: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub w: Option<f32>,
}

/// A single listing in a vending machine.
#[derive(Clone, Copy, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellOrder {
    #[prost(int32, tag = "1")]
    pub item_id: i32,
    #[prost(int32, tag = "2")]
    pub quantity: i32,
    #[prost(int32, tag = "3")]
    pub currency_id: i32,
    #[prost(int32, tag = "4")]
    pub cost_per_item: i32,
    #[prost(int32, optional, tag = "5")]
    pub amount_in_stock: Option<i32>,
    #[prost(bool, tag = "6")]
    pub item_is_blueprint: bool,
    #[prost(bool, tag = "7")]
    pub currency_is_blueprint: bool,
    #[prost(float, optional, tag = "8")]
    pub item_condition: Option<f32>,
    #[prost(float, optional, tag = "9")]
    pub item_condition_max: Option<f32>,
}

/// Team roster returned for `getTeamInfo` and carried by team broadcasts.
#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTeamInfo {
    #[prost(uint64, tag = "1")]
    pub leader_steam_id: u64,
    #[prost(message, repeated, tag = "2")]
    pub members: Vec<TeamMember>,
    #[prost(message, repeated, tag = "3")]
    pub map_notes: Vec<TeamNote>,
    #[prost(message, repeated, tag = "4")]
    pub leader_map_notes: Vec<TeamNote>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[prost(uint64, tag = "1")]
    pub steam_id: u64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(float, tag = "3")]
    pub x: f32,
    #[prost(float, tag = "4")]
    pub y: f32,
    #[prost(bool, tag = "5")]
    pub is_online: bool,
    #[prost(uint32, tag = "6")]
    pub spawn_time: u32,
    #[prost(bool, tag = "7")]
    pub is_alive: bool,
    #[prost(uint32, tag = "8")]
    pub death_time: u32,
}

#[derive(Clone, Copy, PartialEq, Message, Serialize)]
pub struct TeamNote {
    #[prost(int32, tag = "2")]
    pub r#type: i32,
    #[prost(float, tag = "3")]
    pub x: f32,
    #[prost(float, tag = "4")]
    pub y: f32,
}

/// Recent team chat returned for `getTeamChat`.
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct AppTeamChat {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<AppTeamMessage>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTeamMessage {
    #[prost(uint64, tag = "1")]
    pub steam_id: u64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub message: String,
    #[prost(string, tag = "4")]
    pub color: String,
    #[prost(uint32, tag = "5")]
    pub time: u32,
}

/// Entity kinds reported in [`AppEntityInfo::r#type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, prost::Enumeration, Serialize)]
#[repr(i32)]
pub enum AppEntityType {
    Unknown = 0,
    Switch = 1,
    Alarm = 2,
    StorageMonitor = 3,
}

/// State of a paired smart device returned for `getEntityInfo`.
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct AppEntityInfo {
    #[prost(enumeration = "AppEntityType", tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "3")]
    pub payload: Option<AppEntityPayload>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEntityPayload {
    #[prost(bool, optional, tag = "1")]
    pub value: Option<bool>,
    #[prost(message, repeated, tag = "2")]
    pub items: Vec<EntityItem>,
    #[prost(int32, optional, tag = "3")]
    pub capacity: Option<i32>,
    #[prost(bool, optional, tag = "4")]
    pub has_protection: Option<bool>,
    #[prost(uint32, optional, tag = "5")]
    pub protection_expiry: Option<u32>,
}

#[derive(Clone, Copy, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityItem {
    #[prost(int32, tag = "1")]
    pub item_id: i32,
    #[prost(int32, tag = "2")]
    pub quantity: i32,
    #[prost(bool, tag = "3")]
    pub item_is_blueprint: bool,
}

// =============================================================================
// BROADCAST PAYLOADS
// =============================================================================

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTeamChanged {
    #[prost(uint64, tag = "1")]
    pub player_id: u64,
    #[prost(message, optional, tag = "2")]
    pub team_info: Option<AppTeamInfo>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct AppNewTeamMessage {
    #[prost(message, optional, tag = "1")]
    pub message: Option<AppTeamMessage>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEntityChanged {
    #[prost(uint32, tag = "1")]
    pub entity_id: u32,
    #[prost(message, optional, tag = "2")]
    pub payload: Option<AppEntityPayload>,
}
