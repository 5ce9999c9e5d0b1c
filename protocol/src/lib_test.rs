use super::*;

fn envelope(seq: u32, request: Request) -> RequestEnvelope {
    RequestEnvelope {
        seq,
        player_id: 76_561_198_000_000_001,
        player_token: -1_234_567,
        request,
    }
}

fn sample_info() -> AppInfo {
    AppInfo {
        name: "Rusty Moose |US Monthly|".to_owned(),
        header_image: String::new(),
        url: "https://rustymoose.com".to_owned(),
        map: "Procedure Map".to_owned(),
        map_size: 4250,
        wipe_time: 1_700_000_000,
        players: 183,
        max_players: 250,
        queued_players: 0,
        seed: Some(1337),
        salt: None,
        logo_image: None,
    }
}

#[test]
fn request_round_trip_preserves_seq_and_credentials() {
    let original = envelope(42, Request::GetInfo);
    let decoded = decode_request(&encode_request(&original)).expect("decode should succeed");
    assert_eq!(decoded.seq, 42);
    assert_eq!(decoded.player_id, 76_561_198_000_000_001);
    assert_eq!(decoded.player_token, -1_234_567);
    assert_eq!(decoded, original);
}

#[test]
fn entity_requests_carry_entity_id_and_body() {
    let original = envelope(7, Request::SetEntityValue { entity_id: 991, value: true });
    let wire = WireRequest::decode(encode_request(&original).as_slice()).expect("wire");
    assert_eq!(wire.entity_id, Some(991));
    assert!(matches!(wire.kind, Some(WireRequestKind::SetEntityValue(AppSetEntityValue { value: true }))));

    let decoded = decode_request(&encode_request(&original)).expect("decode");
    assert_eq!(decoded.request, original.request);
}

#[test]
fn non_entity_requests_omit_entity_id() {
    let bytes = encode_request(&envelope(3, Request::GetMapMarkers));
    let wire = WireRequest::decode(bytes.as_slice()).expect("wire");
    assert_eq!(wire.entity_id, None);
    assert!(matches!(wire.kind, Some(WireRequestKind::GetMapMarkers(_))));
}

#[test]
fn request_kinds_use_server_field_tags() {
    // Field 8 (getInfo), wire type 2 => key byte 0x42, followed by a zero-length body.
    let bytes = encode_request(&envelope(1, Request::GetInfo));
    assert!(bytes.windows(2).any(|w| w == [0x42, 0x00]));

    // Field 18 (getMapMarkers) needs a two-byte key: 0x92 0x01.
    let bytes = encode_request(&envelope(1, Request::GetMapMarkers));
    assert!(bytes.windows(3).any(|w| w == [0x92, 0x01, 0x00]));
}

#[test]
fn decode_request_rejects_missing_kind() {
    let wire = WireRequest {
        seq: 9,
        player_id: 1,
        player_token: 2,
        entity_id: None,
        kind: None,
    };
    let err = decode_request(&wire.encode_to_vec()).expect_err("kind is required");
    assert!(matches!(err, CodecError::MissingRequestKind(9)));
}

#[test]
fn decode_message_recognizes_info_response() {
    let message = InboundMessage {
        response: Some(ResponseEnvelope {
            seq: 5,
            error: None,
            payload: Some(Response::Info(sample_info())),
        }),
        broadcast: None,
    };

    let decoded = decode_message(&encode_message(&message)).expect("decode");
    assert_eq!(decoded.seq(), Some(5));
    assert_eq!(decoded, message);
}

#[test]
fn decode_message_leaves_payload_absent_when_server_sends_none() {
    let wire = WireMessage {
        response: Some(WireResponse { seq: 11, error: None, payload: None }),
        broadcast: None,
    };

    let decoded = decode_message(&wire.encode_to_vec()).expect("decode");
    let response = decoded.response.expect("response");
    assert_eq!(response.seq, 11);
    assert_eq!(response.error, None);
    assert_eq!(response.payload, None);
}

#[test]
fn decode_message_surfaces_error_string() {
    let wire = WireMessage {
        response: Some(WireResponse {
            seq: 12,
            error: Some(AppError { error: "rate limited".to_owned() }),
            payload: None,
        }),
        broadcast: None,
    };

    let decoded = decode_message(&wire.encode_to_vec()).expect("decode");
    assert_eq!(decoded.response.and_then(|r| r.error).as_deref(), Some("rate limited"));
}

#[test]
fn broadcast_has_no_seq() {
    let message = InboundMessage {
        response: None,
        broadcast: Some(Broadcast::EntityChanged(AppEntityChanged {
            entity_id: 44,
            payload: Some(AppEntityPayload { value: Some(true), ..Default::default() }),
        })),
    };

    let decoded = decode_message(&encode_message(&message)).expect("decode");
    assert_eq!(decoded.seq(), None);
    assert_eq!(decoded, message);
}

#[test]
fn zero_seq_response_counts_as_unsolicited() {
    let message = InboundMessage {
        response: Some(ResponseEnvelope { seq: 0, error: None, payload: Some(Response::Success(AppSuccess {})) }),
        broadcast: None,
    };
    assert_eq!(message.seq(), None);
}

#[test]
fn decode_message_rejects_malformed_bytes() {
    let err = decode_message(&[0x0a, 0xff, 0xff, 0xff]).expect_err("bytes should fail");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn empty_frame_decodes_to_empty_message() {
    let decoded = decode_message(&[]).expect("empty message is valid protobuf");
    assert_eq!(decoded, InboundMessage::default());
}

#[test]
fn map_markers_preserve_vending_orders() {
    let markers = AppMapMarkers {
        markers: vec![AppMarker {
            id: 10,
            r#type: AppMarkerType::VendingMachine as i32,
            x: 1200.5,
            y: 880.0,
            name: Some("Scrap Shop".to_owned()),
            out_of_stock: Some(false),
            sell_orders: vec![SellOrder {
                item_id: -932_201_673,
                quantity: 1,
                currency_id: -1_581_843_485,
                cost_per_item: 50,
                amount_in_stock: Some(3),
                ..Default::default()
            }],
            ..Default::default()
        }],
    };
    let message = InboundMessage {
        response: Some(ResponseEnvelope { seq: 2, error: None, payload: Some(Response::MapMarkers(markers)) }),
        broadcast: None,
    };

    let decoded = decode_message(&encode_message(&message)).expect("decode");
    let Some(Response::MapMarkers(decoded_markers)) = decoded.response.and_then(|r| r.payload) else {
        panic!("expected map markers payload");
    };
    assert_eq!(decoded_markers.markers[0].r#type(), AppMarkerType::VendingMachine);
    assert_eq!(decoded_markers.markers[0].sell_orders[0].cost_per_item, 50);
}

#[test]
fn response_payload_serializes_with_camel_case_tag() {
    let json = serde_json::to_value(Response::Info(sample_info())).expect("serialize");
    assert_eq!(json["info"]["mapSize"], 4250);
    assert_eq!(json["info"]["maxPlayers"], 250);
}

#[test]
fn map_json_skips_raw_image_bytes() {
    let map = AppMap {
        width: 2048,
        height: 2048,
        jpg_image: vec![0xff, 0xd8, 0xff],
        ocean_margin: 500,
        monuments: vec![Monument { token: "airfield_display_name".to_owned(), x: 1.0, y: 2.0 }],
        background: Some("#12404D".to_owned()),
    };
    let json = serde_json::to_value(&map).expect("serialize");
    assert!(json.get("jpgImage").is_none());
    assert_eq!(json["oceanMargin"], 500);
    assert_eq!(json["monuments"][0]["token"], "airfield_display_name");
}

#[test]
fn request_names_match_schema_fields() {
    assert_eq!(Request::GetInfo.name(), "getInfo");
    assert_eq!(Request::GetMapMarkers.name(), "getMapMarkers");
    assert_eq!(Request::CheckSubscription { entity_id: 1 }.name(), "checkSubscription");
    assert_eq!(Request::GetMap.entity_id(), None);
    assert_eq!(Request::GetEntityInfo { entity_id: 8 }.entity_id(), Some(8));
}
