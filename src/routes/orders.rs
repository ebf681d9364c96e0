//! Order placement and the orders query surface.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AdminUser, CurrentUser};
use crate::domain::{self, OrderStatus, PlaceOrder};
use crate::error::ApiError;
use crate::events;
use crate::models::{Order, OrderCustomer, OrderItem, OrderResponse};
use crate::AppState;

/// Places an order for the authenticated user. All-or-nothing: see
/// `domain::checkout`.
pub async fn create_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order_id = domain::place_order(&state, user.id, req).await?;
    let response = load_order(&state, order_id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// All orders with nested customer and items, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    if orders.is_empty() {
        return Ok(Json(vec![]));
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let user_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();

    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = ANY($1)",
    )
    .bind(&order_ids)
    .fetch_all(&state.db)
    .await?;
    let customers = sqlx::query_as::<_, OrderCustomer>(
        "SELECT id, name, email FROM users WHERE id = ANY($1)",
    )
    .bind(&user_ids)
    .fetch_all(&state.db)
    .await?;

    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        items_by_order.entry(item.order_id).or_default().push(item);
    }
    let customers_by_id: HashMap<Uuid, OrderCustomer> =
        customers.into_iter().map(|c| (c.id, c)).collect();

    let responses = orders
        .into_iter()
        .map(|order| {
            let customer = customers_by_id
                .get(&order.user_id)
                .cloned()
                .ok_or_else(|| ApiError::Internal("order without owning user".to_string()))?;
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            Ok(OrderResponse::assemble(order, customer, items))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(Json(responses))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = fetch_order(&state, id).await?;
    // owners see their own orders, admins see everything
    if order.user_id != user.id && !user.is_admin() {
        return Err(ApiError::NotFound("order".to_string()));
    }
    Ok(Json(load_order_parts(&state, order).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Administrative status overwrite; any state can follow any other.
pub async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<OrderResponse>, ApiError> {
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: domain::status::UnknownStatus| ApiError::Validation(e.to_string()))?;

    let updated = sqlx::query(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(status.as_str())
    .execute(&state.db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("order".to_string()));
    }

    events::publish_order_status_changed(&state, id, status.as_str()).await;
    Ok(Json(load_order(&state, id).await?))
}

async fn fetch_order(state: &AppState, id: Uuid) -> Result<Order, ApiError> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("order".to_string()))
}

pub(crate) async fn load_order(state: &AppState, id: Uuid) -> Result<OrderResponse, ApiError> {
    let order = fetch_order(state, id).await?;
    load_order_parts(state, order).await
}

async fn load_order_parts(state: &AppState, order: Order) -> Result<OrderResponse, ApiError> {
    let customer = sqlx::query_as::<_, OrderCustomer>(
        "SELECT id, name, email FROM users WHERE id = $1",
    )
    .bind(order.user_id)
    .fetch_one(&state.db)
    .await?;
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = $1",
    )
    .bind(order.id)
    .fetch_all(&state.db)
    .await?;
    Ok(OrderResponse::assemble(order, customer, items))
}
