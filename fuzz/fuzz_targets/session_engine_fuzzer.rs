//! Fuzz target for session engine operation sequences
//!
//! # Strategy
//!
//! - Arbitrary sequences of login, logout, roster, admin and disconnect
//!   operations over a small pool of connections and names
//! - Every operation also runs against the reference model
//!
//! # Invariants
//!
//! - Engine and model agree on every login outcome and on the final state
//! - Standard session invariants hold after every operation
//! - Never panic

#![no_main]

use std::collections::HashSet;

use libfuzzer_sys::fuzz_target;
use spinwheel_core::{EngineAction, EngineConfig, SessionEngine};
use spinwheel_harness::{
    ConnId, InvariantRegistry, ModelWorld, Operation, OperationResult, SystemSnapshot,
};
use spinwheel_proto::{CancelRequest, ClientMessage, ParticipantEntry, ServerMessage};

fuzz_target!(|ops: Vec<Operation>| {
    let mut engine = SessionEngine::<u64>::new(EngineConfig::default());
    let mut model = ModelWorld::new();
    let invariants = InvariantRegistry::standard();
    let mut open: HashSet<ConnId> = HashSet::new();

    for (now, op) in ops.iter().take(256).enumerate() {
        let now = now as u64;
        let conn = op.conn();
        let session_id = u64::from(conn);
        let outcome = model.apply(op);

        let actions = match message_for(op) {
            None => {
                if open.remove(&conn) {
                    engine.disconnect(session_id, now)
                } else {
                    Vec::new()
                }
            },
            Some(message) => {
                if open.insert(conn) {
                    engine.connect(session_id, now);
                }
                engine.handle(session_id, message, now)
            },
        };

        if let Operation::Login { .. } = op {
            let accepted = actions.iter().any(|a| {
                matches!(a, EngineAction::Reply { message: ServerMessage::LoginStatus { success: true, .. }, .. })
            });
            let expected = outcome == OperationResult::LoginAccepted;
            assert_eq!(accepted, expected, "login outcome diverged: {op:?}");
        }

        let snapshot = SystemSnapshot::from_state(engine.state());
        invariants.assert_all(&snapshot, &format!("after {op:?}"));
    }

    let state = engine.state();
    let expected = model.observable_state();
    let roster: Vec<_> = state.roster().entries().iter().map(|e| (e.index, e.username.clone())).collect();
    assert_eq!(roster, expected.roster);
    assert_eq!(state.session_count(), expected.logged_in.len());
    assert_eq!(state.presence().is_online(), expected.admin_online);
});

fn message_for(op: &Operation) -> Option<ClientMessage> {
    let message = match op {
        Operation::Login { name, .. } => ClientMessage::Login { username: name.as_string(), role: None },
        Operation::Logout { .. } => ClientMessage::Logout,
        Operation::Join { name, index, .. } => {
            ClientMessage::UserJoin(ParticipantEntry::new(i64::from(*index), name.as_string()))
        },
        Operation::Cancel { name, .. } => ClientMessage::UserCancel(CancelRequest::new(name.as_string())),
        Operation::ManualJoin { name, index, .. } => {
            ClientMessage::AdminManualJoin(ParticipantEntry::new(i64::from(*index), name.as_string()))
        },
        Operation::ManualCancel { name, .. } => {
            ClientMessage::AdminManualCancel(CancelRequest::new(name.as_string()))
        },
        Operation::StartWheel { .. } => ClientMessage::AdminStartWheel,
        Operation::StopWheel { winner, .. } => ClientMessage::AdminStopWheel(winner.as_string()),
        Operation::Reset { .. } => ClientMessage::AdminResetParticipants,
        Operation::RequestStats { .. } => ClientMessage::AdminRequestStats,
        Operation::Disconnect { .. } => return None,
    };
    Some(message)
}
