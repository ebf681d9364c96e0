//! Per-user server-side cart.
//!
//! Cart contents are advisory: order placement takes its item list
//! explicitly in the request body, the cart just survives sessions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::models::CartItem;
use crate::AppState;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
}

pub async fn get_cart(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CartResponse>, ApiError> {
    let items = sqlx::query_as::<_, CartLine>(
        "SELECT ci.product_id, p.name, p.price, ci.quantity \
         FROM cart_items ci JOIN products p ON p.id = ci.product_id \
         WHERE ci.user_id = $1 ORDER BY ci.created_at",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    let subtotal = items
        .iter()
        .map(|line| line.price * Decimal::from(line.quantity))
        .sum();
    Ok(Json(CartResponse { items, subtotal }))
}

#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub product_id: Uuid,
    pub quantity: i32,
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AddToCart>,
) -> Result<(StatusCode, Json<CartItem>), ApiError> {
    if req.quantity < 1 {
        return Err(ApiError::Validation("quantity must be at least 1".to_string()));
    }
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM products WHERE id = $1 AND is_active = TRUE)",
    )
    .bind(req.product_id)
    .fetch_one(&state.db)
    .await?;
    if !exists {
        return Err(ApiError::NotFound("product".to_string()));
    }

    let item = sqlx::query_as::<_, CartItem>(
        "INSERT INTO cart_items (id, user_id, product_id, quantity) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (user_id, product_id) \
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user.id)
    .bind(req.product_id)
    .bind(req.quantity)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user.id)
        .bind(product_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("cart item".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_cart(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.id)
        .execute(&state.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
