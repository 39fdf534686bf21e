//! Fuzz target for CBOR message decoding
//!
//! # Strategy
//!
//! - Random payload bytes decoded as both message directions
//! - Structured events built from arbitrary fields, encoded then decoded
//!
//! # Invariants
//!
//! - Malformed CBOR and unknown event names return `CborDecode`, never panic
//! - Any event the server can emit decodes back to the same value

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spinwheel_proto::{
    CancelRequest, ClientMessage, Frame, ParticipantEntry, ProtocolError, ServerMessage,
};

#[derive(Debug, Clone, Arbitrary)]
enum Input {
    RawPayload(Vec<u8>),
    Login { username: String, role: Option<String> },
    Join { index: i64, username: String },
    Cancel { username: String, index: Option<i64> },
    Stop(String),
    Roster(Vec<(i64, String)>),
}

fuzz_target!(|input: Input| {
    match input {
        Input::RawPayload(bytes) => {
            let frame = Frame::new(bytes);
            for result in [ClientMessage::from_frame(&frame).err(), ServerMessage::from_frame(&frame).err()] {
                if let Some(err) = result {
                    assert!(matches!(err, ProtocolError::CborDecode(_)), "unexpected error: {err}");
                }
            }
        },
        Input::Login { username, role } => round_trip_client(ClientMessage::Login { username, role }),
        Input::Join { index, username } => {
            round_trip_client(ClientMessage::UserJoin(ParticipantEntry::new(index, username)));
        },
        Input::Cancel { username, index } => {
            let request = CancelRequest { username, index };
            round_trip_client(ClientMessage::AdminManualCancel(request.clone()));
            round_trip_server(ServerMessage::ClientUpdateCancel(request));
        },
        Input::Stop(winner) => {
            round_trip_client(ClientMessage::AdminStopWheel(winner.clone()));
            round_trip_server(ServerMessage::ClientStopWheel(winner));
        },
        Input::Roster(entries) => {
            let entries = entries.into_iter().map(|(i, n)| ParticipantEntry::new(i, n)).collect();
            round_trip_server(ServerMessage::ParticipantUpdate(entries));
        },
    }
});

fn round_trip_client(message: ClientMessage) {
    let Ok(frame) = message.to_frame() else {
        return;
    };
    assert_eq!(ClientMessage::from_frame(&frame).expect("own encoding must decode"), message);
}

fn round_trip_server(message: ServerMessage) {
    let Ok(frame) = message.to_frame() else {
        return;
    };
    assert_eq!(ServerMessage::from_frame(&frame).expect("own encoding must decode"), message);
}
