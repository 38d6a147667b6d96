//! Order API Module
//!
//! Commands go through the OrdersManager; the stream endpoints push whole
//! orders as Server-Sent Events from a SyncSession.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/active", get(handler::active))
        // Global event log (catch-up after reconnect)
        .route("/events", get(handler::events_since))
        // Vendor dashboard feed
        .route("/stream", get(handler::stream_all))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", post(handler::transition_status))
        .route("/{id}/payment", post(handler::set_payment_status))
        .route("/{id}/events", get(handler::order_events))
        .route("/{id}/verify", get(handler::verify))
        // Customer tracking feed
        .route("/{id}/stream", get(handler::stream_order))
}
