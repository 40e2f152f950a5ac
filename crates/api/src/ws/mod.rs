//! WebSocket live channel.
//!
//! Provides the subscription registry, heartbeat task, and the HTTP upgrade
//! handlers used by the Axum routes.

mod handler;
mod heartbeat;
pub mod hub;

pub use handler::{ws_client_handler, ws_handler};
pub use heartbeat::start_heartbeat;
pub use hub::{SubscriptionHub, SubscriptionId};
