//! Deterministic simulation harness for the spinwheel server.
//!
//! Turmoil-backed server and client plus a seeded [`Environment`] so the
//! production executor can be driven reproducibly over a simulated network.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the session
//! rules. Operations are applied to both the model and the real driver, and
//! their outcomes and observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold after every
//! event regardless of history. Use [`InvariantRegistry::standard()`] for the
//! full set.
//!
//! [`Environment`]: spinwheel_core::Environment

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_client;
pub mod sim_env;
pub mod sim_server;

pub use invariants::{
    AdminPresenceMatchesBinding, AdminRoleReserved, Invariant, InvariantRegistry,
    InvariantResult, LedgerFollowsPresence, RosterUnique, SessionSnapshot, SessionsMatchBindings,
    SystemSnapshot, Violation,
};
pub use model::{
    CONNECTION_POOL, ConnId, MODEL_ADMIN, ModelName, ModelWorld, ObservableState, Operation,
    OperationResult,
};
pub use sim_client::SimClient;
pub use sim_env::SimEnv;
pub use sim_server::SimServer;
