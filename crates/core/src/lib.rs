//! Face-swap job service domain logic.
//!
//! Pure types and rules shared by the store, engine, and API crates: the job
//! record and its state machine, the progress heuristic, the engine option
//! bag, and upload naming rules.

pub mod error;
pub mod job;
pub mod naming;
pub mod options;
pub mod progress;
pub mod types;
