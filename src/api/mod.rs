mod quiz_routes;
mod quiz_websocket;

pub use quiz_routes::{quiz_health_check, quiz_websocket_route, routes};
pub use quiz_websocket::handle_quiz_websocket;
