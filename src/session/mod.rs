pub mod connection;
mod dispatcher;
mod engine;
mod handler;
pub mod protocol;
mod room;

pub use connection::{Connection, ConnectionId, Outbound};
pub use dispatcher::{deliver, Broadcaster, DeliveryReport};
pub use engine::{Binding, Progress, Role, SessionEngine};
pub use handler::SessionHandler;
pub use protocol::{EventEnvelope, InboundEvent, OutboundEvent, QuizSummary, StatusLabel};
pub use room::{ClosedRoom, Room, RoomRegistry, RoomStatus, SharedRoom};
