//! Model-based testing support.
//!
//! [`ModelWorld`] is an oracle for the session rules. Tests apply the same
//! [`Operation`] sequence to the model and the real driver, then compare
//! each [`OperationResult`] and the final [`ObservableState`].

mod operation;
mod world;

pub use operation::{CONNECTION_POOL, ConnId, MODEL_ADMIN, ModelName, Operation, OperationResult};
pub use world::{ModelWorld, ObservableState};
