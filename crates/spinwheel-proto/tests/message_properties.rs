//! Property-based tests for message framing.
//!
//! Usernames are free-form display names, so the strategies include unicode
//! and empty strings.

use proptest::prelude::*;
use spinwheel_proto::{
    CancelRequest, ClientMessage, Frame, FrameHeader, ParticipantEntry, ProtocolError,
    ServerMessage,
};

fn username() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-z]{1,12}", "\\PC{1,24}"]
}

fn entry() -> impl Strategy<Value = ParticipantEntry> {
    (any::<i64>(), username()).prop_map(|(index, username)| ParticipantEntry { index, username })
}

fn cancel() -> impl Strategy<Value = CancelRequest> {
    (username(), proptest::option::of(any::<i64>()))
        .prop_map(|(username, index)| CancelRequest { username, index })
}

fn client_message() -> impl Strategy<Value = ClientMessage> {
    prop_oneof![
        (username(), proptest::option::of("[a-z]{1,8}"))
            .prop_map(|(username, role)| ClientMessage::Login { username, role }),
        Just(ClientMessage::Logout),
        entry().prop_map(ClientMessage::UserJoin),
        cancel().prop_map(ClientMessage::UserCancel),
        entry().prop_map(ClientMessage::AdminManualJoin),
        cancel().prop_map(ClientMessage::AdminManualCancel),
        Just(ClientMessage::AdminStartWheel),
        username().prop_map(ClientMessage::AdminStopWheel),
        Just(ClientMessage::AdminResetParticipants),
        Just(ClientMessage::AdminRequestStats),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: a client event written to the wire decodes to the same event
    #[test]
    fn prop_client_message_survives_wire(message in client_message()) {
        let mut wire = Vec::new();
        message.to_frame()?.encode(&mut wire)?;

        let frame = Frame::decode(&wire)?;
        prop_assert_eq!(ClientMessage::from_frame(&frame)?, message);
    }

    /// Property: roster snapshots keep arrival order on the wire
    #[test]
    fn prop_roster_order_preserved(entries in prop::collection::vec(entry(), 0..32)) {
        let frame = ServerMessage::ParticipantUpdate(entries.clone()).to_frame()?;
        prop_assert_eq!(
            ServerMessage::from_frame(&frame)?,
            ServerMessage::ParticipantUpdate(entries)
        );
    }

    /// Property: random payload bytes never decode into a panic
    #[test]
    fn prop_random_payload_is_rejected_or_decoded(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let frame = Frame::new(bytes);
        match ClientMessage::from_frame(&frame) {
            Ok(_) | Err(ProtocolError::CborDecode(_)) => {},
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}

#[test]
fn frame_header_length_is_stable() {
    let frame = ClientMessage::Logout.to_frame().unwrap();
    let mut wire = Vec::new();
    frame.encode(&mut wire).unwrap();

    assert_eq!(&wire[..4], b"SPIN");
    assert_eq!(wire.len(), FrameHeader::SIZE + frame.payload.len());
}
