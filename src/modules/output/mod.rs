use axum::Router;
use axum::routing::get;
use crate::state::AppState;

pub mod handler;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/output/{filename}", get(handler::get_output))
        .route("/output/", get(handler::missing_output))
}
