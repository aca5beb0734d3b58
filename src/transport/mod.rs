//! Websocket transport: connection lifecycle and reconnect policy.

pub mod channel;
pub mod policy;

pub use channel::{Notifier, TransportChannel, TransportEvent};
pub use policy::{ReconnectPolicy, RetryBudget};
