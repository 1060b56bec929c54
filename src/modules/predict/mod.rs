use axum::Router;
use axum::routing::post;
use crate::state::AppState;

pub mod dto;
pub mod events;
pub mod handler;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/predict/", post(handler::predict))
        .route("/predict", post(handler::predict))
}
