//! Admin API Module
//!
//! Vendor-side switches and ban management. Last writer wins on settings.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/admin", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/settings",
            get(handler::get_settings).put(handler::update_settings),
        )
        .route("/shop", post(handler::toggle_shop))
        .route("/ban-system", post(handler::toggle_ban_system))
        .route("/bans", get(handler::list_bans).delete(handler::unban_all))
        .route(
            "/bans/{customer_id}",
            get(handler::ban_status).delete(handler::unban),
        )
}
