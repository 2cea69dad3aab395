//! Player Request Protocol.
//!
//! - `transport`: outbound boundary (`send` to a player, `broadcast` to a room)
//! - `broker`: correlated requests with deadlines and replay on reconnect
//! - `selection`: answer validation and the uniform random fallback

pub mod broker;
pub mod selection;
pub mod transport;

pub use broker::{Reply, RequestBroker};
pub use selection::{confirm, select, select_one, Selection};
pub use transport::{Outbound, RecordingTransport, Transport};
