//! Order API Handlers

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use shared::order::{
    Actor, CreateOrderRequest, OrderEvent, OrderSnapshot, OrderStatus, PaymentStatus,
    SubscriptionScope,
};

use crate::api::run_blocking;
use crate::core::ServerState;
use crate::orders::OrderFilter;
use crate::utils::{AppError, AppResponse, AppResult, ok};

/// Status change request
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub to: OrderStatus,
    pub expected_version: u64,
    /// Set when the customer acts on their own order (cancel); vendor otherwise
    #[serde(default)]
    pub customer_id: Option<String>,
}

/// Payment flag request (vendor)
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub status: PaymentStatus,
    pub expected_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

/// Catch-up response: events after `since` plus the server epoch
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub epoch: String,
    pub current_sequence: u64,
    pub events: Vec<OrderEvent>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub order_id: String,
    pub consistent: bool,
}

fn actor_for(customer_id: Option<String>) -> Actor {
    match customer_id {
        Some(id) if !id.trim().is_empty() => Actor::customer(id),
        _ => Actor::Vendor,
    }
}

/// Place an order
pub async fn create(
    State(state): State<ServerState>,
    Json(request): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<AppResponse<OrderSnapshot>>)> {
    let order = run_blocking(&state, move |m| m.create_order(request)).await?;
    Ok((StatusCode::CREATED, ok(order)))
}

/// List orders (filter by status / customer / open only)
pub async fn list(
    State(state): State<ServerState>,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<AppResponse<Vec<OrderSnapshot>>>> {
    let orders = run_blocking(&state, move |m| m.query_orders(&filter)).await?;
    Ok(ok(orders))
}

/// Vendor queue, oldest first
pub async fn active(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<OrderSnapshot>>>> {
    let orders = run_blocking(&state, |m| m.get_active_orders()).await?;
    Ok(ok(orders))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<OrderSnapshot>>> {
    let lookup = id.clone();
    let order = run_blocking(&state, move |m| m.get_order(&lookup))
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", id)))?;
    Ok(ok(order))
}

/// Move an order along the lifecycle
pub async fn transition_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> AppResult<Json<AppResponse<OrderSnapshot>>> {
    let actor = actor_for(request.customer_id);
    let order = run_blocking(&state, move |m| {
        m.transition_status(actor, &id, request.to, request.expected_version)
    })
    .await?;
    Ok(ok(order))
}

/// Set the payment flag
pub async fn set_payment_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> AppResult<Json<AppResponse<OrderSnapshot>>> {
    let order = run_blocking(&state, move |m| {
        m.set_payment_status(Actor::Vendor, &id, request.status, request.expected_version)
    })
    .await?;
    Ok(ok(order))
}

/// Audit history of one order
pub async fn order_events(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Vec<OrderEvent>>>> {
    let events = run_blocking(&state, move |m| m.get_order_events(&id)).await?;
    Ok(ok(events))
}

/// Events after a global sequence
pub async fn events_since(
    State(state): State<ServerState>,
    Query(query): Query<EventsQuery>,
) -> AppResult<Json<AppResponse<EventsResponse>>> {
    let response = run_blocking(&state, move |m| {
        // Sequence first: events committed in between are included, never skipped
        let current_sequence = m.get_current_sequence()?;
        let events = m.get_events_since(query.since)?;
        Ok(EventsResponse {
            epoch: m.epoch().to_string(),
            current_sequence,
            events,
        })
    })
    .await?;
    Ok(ok(response))
}

/// Compare the stored snapshot with a replay of its events
pub async fn verify(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<VerifyResponse>>> {
    let order_id = id.clone();
    let consistent = run_blocking(&state, move |m| m.verify_order(&order_id)).await?;
    Ok(ok(VerifyResponse {
        order_id: id,
        consistent,
    }))
}

/// Every order, pushed as it changes
pub async fn stream_all(
    State(state): State<ServerState>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    open_stream(state, SubscriptionScope::All).await
}

/// One order, pushed as it changes
pub async fn stream_order(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let lookup = id.clone();
    if run_blocking(&state, move |m| m.get_order(&lookup))
        .await?
        .is_none()
    {
        return Err(AppError::not_found(format!("Order {} not found", id)));
    }
    open_stream(state, SubscriptionScope::order(id)).await
}

/// Current state first, then every newer version
async fn open_stream(
    state: ServerState,
    scope: SubscriptionScope,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = run_blocking(&state, move |m| m.subscribe(scope)).await?;
    tracing::debug!(scope = ?session.scope(), "Order stream opened");

    let initial = session.orders();
    let stream = futures::stream::iter(initial)
        .chain(session.into_stream())
        .filter_map(|order| async move { order_event(&order) })
        .map(Ok)
        .take_until(state.shutdown.clone().cancelled_owned());

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn order_event(order: &OrderSnapshot) -> Option<Event> {
    match Event::default()
        .event("order")
        .id(format!("{}:{}", order.order_id, order.version))
        .json_data(order)
    {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::error!(order_id = %order.order_id, error = %e, "Failed to encode order event");
            None
        }
    }
}
