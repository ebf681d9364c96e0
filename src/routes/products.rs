//! Public catalog reads and admin-gated catalog writes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::error::{conflict_on_constraint, ApiError};
use crate::models::Product;
use crate::AppState;

/// Active products, sorted by name.
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE is_active = TRUE ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("product".to_string()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProduct {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    req.validate()?;
    validate_price_and_stock(req.price, req.stock)?;

    let slug = generate_slug(&req.name);
    let sku = generate_sku();
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, slug, sku, description, category, price, stock, \
         image_url, is_active, is_featured) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.name)
    .bind(&slug)
    .bind(&sku)
    .bind(&req.description)
    .bind(&req.category)
    .bind(req.price)
    .bind(req.stock)
    .bind(&req.image_url)
    .bind(req.is_featured)
    .fetch_one(&state.db)
    .await
    .map_err(|e| conflict_on_constraint(e, "product slug or sku already exists"))?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// Partial update; absent fields keep their current value. Because the
/// update COALESCEs each column, a nullable field (`description`,
/// `image_url`) cannot be cleared back to NULL through this endpoint —
/// clients overwrite it with a new value instead.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProduct {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProduct>,
) -> Result<Json<Product>, ApiError> {
    req.validate()?;
    validate_price_and_stock(req.price.unwrap_or(Decimal::ZERO), req.stock.unwrap_or(0))?;

    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET \
           name = COALESCE($2, name), \
           description = COALESCE($3, description), \
           price = COALESCE($4, price), \
           stock = COALESCE($5, stock), \
           category = COALESCE($6, category), \
           image_url = COALESCE($7, image_url), \
           is_active = COALESCE($8, is_active), \
           is_featured = COALESCE($9, is_featured), \
           updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.price)
    .bind(req.stock)
    .bind(&req.category)
    .bind(&req.image_url)
    .bind(req.is_active)
    .bind(req.is_featured)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("product".to_string()))?;

    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(|e| conflict_on_constraint(e, "product is referenced by existing orders"))?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("product".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn validate_price_and_stock(price: Decimal, stock: i32) -> Result<(), ApiError> {
    if price < Decimal::ZERO {
        return Err(ApiError::Validation("price must not be negative".to_string()));
    }
    if stock < 0 {
        return Err(ApiError::Validation("stock must not be negative".to_string()));
    }
    Ok(())
}

pub(crate) fn generate_slug(name: &str) -> String {
    let base: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let base = base.trim_matches('-').to_string();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", base, &suffix[..6])
}

pub(crate) fn generate_sku() -> String {
    format!("SKU-{:08X}", rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_lowercase_with_unique_suffix() {
        let slug = generate_slug("Whey Protein 2kg");
        assert!(slug.starts_with("whey-protein-2kg-"));
        let (a, b) = (generate_slug("X"), generate_slug("X"));
        assert_ne!(a, b);
    }

    #[test]
    fn sku_format() {
        let sku = generate_sku();
        assert!(sku.starts_with("SKU-"));
        assert_eq!(sku.len(), 12);
    }

    #[test]
    fn negative_price_and_stock_rejected() {
        assert!(validate_price_and_stock(Decimal::new(-1, 2), 0).is_err());
        assert!(validate_price_and_stock(Decimal::ZERO, -1).is_err());
        assert!(validate_price_and_stock(Decimal::new(999, 2), 10).is_ok());
    }
}
