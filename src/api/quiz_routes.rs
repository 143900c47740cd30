use std::sync::Arc;
use warp::Filter;

use super::quiz_websocket;
use crate::config::{Config, SessionConfig};
use crate::session::SessionEngine;

/// All HTTP and WebSocket routes under the configured base path
pub fn routes(
    engine: Arc<SessionEngine>,
    config: &Config,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let base = config.server.base_path.clone();

    quiz_websocket_route(engine.clone(), config.session.clone(), base.clone())
        .or(quiz_health_check(engine, base))
}

/// Creates the quiz session WebSocket route
pub fn quiz_websocket_route(
    engine: Arc<SessionEngine>,
    settings: SessionConfig,
    base: String,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path(base)
        .and(warp::path("ws"))
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_engine(engine))
        .and(warp::any().map(move || settings.clone()))
        .map(|ws: warp::ws::Ws, engine: Arc<SessionEngine>, settings: SessionConfig| {
            ws.on_upgrade(move |websocket| {
                quiz_websocket::handle_quiz_websocket(websocket, engine, settings)
            })
        })
}

pub fn quiz_health_check(
    engine: Arc<SessionEngine>,
    base: String,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path(base)
        .and(warp::path("health"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_engine(engine))
        .and_then(|engine: Arc<SessionEngine>| async move {
            let rooms = engine.registry().room_count().await;
            Ok::<_, warp::Rejection>(warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "Quizzy Live",
                "version": env!("CARGO_PKG_VERSION"),
                "rooms": rooms
            })))
        })
}

fn with_engine(
    engine: Arc<SessionEngine>,
) -> impl Filter<Extract = (Arc<SessionEngine>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || engine.clone())
}
