//! Decoding real-shaped directory responses through the JSON codec.

use mpn_netplay_protocol::{Codec, JsonCodec, LobbyListing, ProtocolError};

// =========================================================================
// Full entries
// =========================================================================

#[test]
fn test_decode_listing_with_all_fields() {
    let body = br#"{
        "status": "OK",
        "sessions": [
            {
                "server_id": "203.0.113.7",
                "name": "Kart night",
                "port": 2626,
                "game": "RMCP01",
                "player_count": 3,
                "in_game": false,
                "version": "MPN",
                "region": "EU",
                "method": "traversal",
                "password": true
            }
        ]
    }"#;

    let listing: LobbyListing = JsonCodec.decode(body).unwrap();

    assert!(listing.is_ok());
    assert_eq!(listing.sessions.len(), 1);
    let s = &listing.sessions[0];
    assert_eq!(s.server_id, "203.0.113.7");
    assert_eq!(s.port, 2626);
    assert_eq!(s.game_id, "RMCP01");
    assert_eq!(s.player_count, 3);
    assert!(!s.in_game);
    assert!(s.has_password);
    assert_eq!(s.region_display_name(), "Europe");
    assert_eq!(s.method_display_name(), "Traversal Server");
}

// =========================================================================
// Optional fields
// =========================================================================

#[test]
fn test_decode_entry_without_optional_fields_uses_defaults() {
    let body = br#"{"status":"OK","sessions":[
        {"server_id":"h","name":"n","port":1,"game":"G","player_count":0,"in_game":true}
    ]}"#;

    let listing: LobbyListing = JsonCodec.decode(body).unwrap();
    let s = &listing.sessions[0];

    assert_eq!(s.version, "");
    assert_eq!(s.region, "");
    assert_eq!(s.method, "");
    assert!(!s.has_password);
    assert!(s.in_game);
}

#[test]
fn test_decode_error_status_without_sessions() {
    let listing: LobbyListing =
        JsonCodec.decode(br#"{"status":"ERROR"}"#).unwrap();

    assert!(!listing.is_ok());
    assert!(listing.sessions.is_empty());
}

#[test]
fn test_decode_entry_missing_port_is_decode_error() {
    let body = br#"{"status":"OK","sessions":[
        {"server_id":"h","name":"n","game":"G","player_count":0,"in_game":false}
    ]}"#;

    let result: Result<LobbyListing, _> = JsonCodec.decode(body);

    assert!(matches!(result, Err(ProtocolError::Decode(_))));
}
