//! In-memory job table with time-based expiry.
//!
//! [`JobStore`] is the single source of truth for job state. It is not
//! crash-surviving: records live only as long as the process and at most
//! one TTL past creation.

pub mod job_store;

pub use job_store::JobStore;
