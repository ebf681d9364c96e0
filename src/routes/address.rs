//! Address book, scoped to the authenticated user.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::models::Address;
use crate::AppState;

#[derive(Debug, serde::Deserialize, Validate)]
pub struct AddressPayload {
    pub name: Option<String>,
    #[validate(length(min = 1, message = "address_line is required"))]
    pub address_line: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "postal_code is required"))]
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

fn default_country() -> String {
    "Mexico".to_string()
}

pub async fn list_addresses(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Address>>, ApiError> {
    let addresses = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(addresses))
}

pub async fn create_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AddressPayload>,
) -> Result<(StatusCode, Json<Address>), ApiError> {
    req.validate()?;
    let address = sqlx::query_as::<_, Address>(
        "INSERT INTO addresses (id, user_id, name, address_line, city, state, postal_code, \
         country, phone, is_default) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user.id)
    .bind(&req.name)
    .bind(&req.address_line)
    .bind(&req.city)
    .bind(&req.state)
    .bind(&req.postal_code)
    .bind(&req.country)
    .bind(&req.phone)
    .bind(req.is_default)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn update_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AddressPayload>,
) -> Result<Json<Address>, ApiError> {
    req.validate()?;
    let address = sqlx::query_as::<_, Address>(
        "UPDATE addresses SET name = $3, address_line = $4, city = $5, state = $6, \
         postal_code = $7, country = $8, phone = $9, is_default = $10 \
         WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user.id)
    .bind(&req.name)
    .bind(&req.address_line)
    .bind(&req.city)
    .bind(&req.state)
    .bind(&req.postal_code)
    .bind(&req.country)
    .bind(&req.phone)
    .bind(req.is_default)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("address".to_string()))?;
    Ok(Json(address))
}

pub async fn delete_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("address".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
