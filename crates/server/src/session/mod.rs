//! Live game sessions: the wire protocol, the per-game connection registry
//! and the coordinator that applies commands.

pub mod coordinator;
pub mod messages;
pub mod registry;

pub use coordinator::SessionCoordinator;
pub use messages::{CommandType, Notification, ServerMessage, UserGameCommand};
pub use registry::{ConnectionRegistry, Outbound};
