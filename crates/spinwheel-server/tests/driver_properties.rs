//! Property-based tests for ServerDriver
//!
//! Connection bookkeeping must stay consistent for arbitrary open, frame and
//! close sequences, using deterministic simulation (SimEnv) for
//! reproducibility.

use std::collections::HashSet;

use proptest::prelude::*;
use spinwheel_harness::SimEnv;
use spinwheel_proto::{ClientMessage, Frame, ParticipantEntry};
use spinwheel_server::{DriverConfig, DriverError, ServerAction, ServerDriver, ServerEvent};

#[derive(Debug, Clone)]
enum Event {
    Open(u64),
    Frame(u64, Vec<u8>),
    Join(u64, u8),
    Close(u64),
}

fn event() -> impl Strategy<Value = Event> {
    let id = 0u64..6;
    prop_oneof![
        id.clone().prop_map(Event::Open),
        (id.clone(), prop::collection::vec(any::<u8>(), 0..32))
            .prop_map(|(s, bytes)| Event::Frame(s, bytes)),
        (id.clone(), any::<u8>()).prop_map(|(s, n)| Event::Join(s, n)),
        id.prop_map(Event::Close),
    ]
}

fn driver(seed: u64, max_connections: usize) -> ServerDriver<SimEnv> {
    ServerDriver::new(SimEnv::with_seed(seed), DriverConfig {
        max_connections,
        ..DriverConfig::default()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the driver's connection set always equals the set of
    /// accepted, not yet closed sessions, and never exceeds the limit
    #[test]
    fn prop_connection_set_tracks_events(
        seed in any::<u64>(),
        max_connections in 1usize..5,
        events in prop::collection::vec(event(), 1..80),
    ) {
        let mut driver = driver(seed, max_connections);
        let mut open = HashSet::new();

        for event in events {
            match event {
                Event::Open(session_id) => {
                    let result = driver.process_event(ServerEvent::ConnectionAccepted { session_id });
                    if open.contains(&session_id) {
                        prop_assert_eq!(result.unwrap_err(), DriverError::SessionAlreadyExists(session_id));
                    } else if open.len() >= max_connections {
                        let actions = result?;
                        let closed = matches!(
                            actions.as_slice(),
                            [ServerAction::CloseConnection { session_id: s, .. }] if *s == session_id
                        );
                        prop_assert!(closed);
                    } else {
                        result?;
                        open.insert(session_id);
                    }
                },
                Event::Frame(session_id, bytes) => {
                    let frame = Frame::new(bytes);
                    let result = driver.process_event(ServerEvent::FrameReceived { session_id, frame });
                    prop_assert_eq!(result.is_ok(), open.contains(&session_id));
                },
                Event::Join(session_id, n) => {
                    let message = ClientMessage::UserJoin(ParticipantEntry::new(i64::from(n), format!("p{}", n % 4)));
                    let frame = message.to_frame().unwrap();
                    let result = driver.process_event(ServerEvent::FrameReceived { session_id, frame });
                    prop_assert_eq!(result.is_ok(), open.contains(&session_id));
                },
                Event::Close(session_id) => {
                    let result = driver.process_event(ServerEvent::ConnectionClosed {
                        session_id,
                        reason: "closed".into(),
                    });
                    prop_assert_eq!(result.is_ok(), open.remove(&session_id));
                },
            }

            prop_assert_eq!(driver.connection_count(), open.len());
            prop_assert!(driver.connection_count() <= max_connections);
            let ids: HashSet<u64> = driver.session_ids().collect();
            prop_assert_eq!(&ids, &open);
        }
    }

    /// Property: arbitrary payload bytes never fail the driver for a live
    /// session; at worst they are logged and dropped
    #[test]
    fn prop_garbage_payload_never_errors(
        seed in any::<u64>(),
        payload in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut driver = driver(seed, 4);
        driver.process_event(ServerEvent::ConnectionAccepted { session_id: 1 })?;

        let actions = driver.process_event(ServerEvent::FrameReceived {
            session_id: 1,
            frame: Frame::new(payload),
        })?;

        for action in &actions {
            let is_close = matches!(action, ServerAction::CloseConnection { .. });
            prop_assert!(!is_close);
        }
        prop_assert!(driver.has_connection(1));
    }
}
