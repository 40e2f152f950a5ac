//! Job execution: turns a submitted job into one supervised engine run and
//! keeps its record and subscribers up to date.

pub mod orchestrator;

pub use orchestrator::{JobOrchestrator, SubmitJob};
