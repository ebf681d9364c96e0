//! Admin panel: full catalog listing, bulk import/export, and the
//! dashboard aggregations.
//!
//! Import and export speak typed JSON rows; spreadsheet parsing and image
//! storage live outside this service.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::domain::OrderStatus;
use crate::error::{conflict_on_constraint, ApiError};
use crate::models::Product;
use crate::routes::products::{generate_sku, generate_slug, validate_price_and_stock};
use crate::AppState;

/// Full catalog, inactive products included, newest first.
pub async fn list_products(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(products))
}

pub async fn export_products(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(products))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImportRow {
    /// Matched against existing products; rows without a SKU always insert.
    pub sku: Option<String>,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub category: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub imported: usize,
}

/// Bulk upsert keyed on SKU.
pub async fn import_products(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(rows): Json<Vec<ImportRow>>,
) -> Result<Json<ImportReport>, ApiError> {
    if rows.is_empty() {
        return Err(ApiError::Validation("import payload is empty".to_string()));
    }
    for row in &rows {
        row.validate()?;
        validate_price_and_stock(row.price, row.stock)?;
    }

    let mut tx = state.db.begin().await?;
    let mut imported = 0;
    for row in &rows {
        let sku = row.sku.clone().unwrap_or_else(generate_sku);
        sqlx::query(
            "INSERT INTO products (id, name, slug, sku, description, category, price, stock, \
             image_url, is_active, is_featured) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, FALSE) \
             ON CONFLICT (sku) DO UPDATE SET \
               name = EXCLUDED.name, \
               description = EXCLUDED.description, \
               category = EXCLUDED.category, \
               price = EXCLUDED.price, \
               stock = EXCLUDED.stock, \
               image_url = COALESCE(EXCLUDED.image_url, products.image_url), \
               updated_at = NOW()",
        )
        .bind(Uuid::now_v7())
        .bind(&row.name)
        .bind(generate_slug(&row.name))
        .bind(&sku)
        .bind(&row.description)
        .bind(&row.category)
        .bind(row.price)
        .bind(row.stock)
        .bind(&row.image_url)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_constraint(e, "conflicting product row in import"))?;
        imported += 1;
    }
    tx.commit().await?;

    tracing::info!(imported, "product import finished");
    Ok(Json(ImportReport { imported }))
}

#[derive(Debug, Serialize)]
pub struct DailySales {
    pub day: NaiveDate,
    pub orders: i64,
    pub revenue: Decimal,
}

const SALES_WINDOW_DAYS: i64 = 7;

/// Expands sparse per-day aggregates into a contiguous window ending at
/// `end`; days with no orders appear with zero counts.
fn fill_daily_series(
    end: NaiveDate,
    window_days: i64,
    sparse: &HashMap<NaiveDate, (i64, Decimal)>,
) -> Vec<DailySales> {
    (0..window_days)
        .rev()
        .map(|offset| {
            let day = end - chrono::Duration::days(offset);
            let (orders, revenue) = sparse.get(&day).copied().unwrap_or((0, Decimal::ZERO));
            DailySales { day, orders, revenue }
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecentOrder {
    pub id: Uuid,
    pub order_number: String,
    pub status: String,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub monthly_revenue: Decimal,
    pub orders_this_month: i64,
    pub new_customers_this_month: i64,
    pub daily_sales: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
    pub recent_orders: Vec<RecentOrder>,
    pub status_breakdown: Vec<StatusCount>,
}

/// Read-only reporting over orders/products/users. Pure queries, no side
/// effects.
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Dashboard>, ApiError> {
    let income: Vec<String> =
        OrderStatus::INCOME.iter().map(|s| s.as_str().to_string()).collect();

    let monthly_revenue = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(total_amount), 0) FROM orders \
         WHERE status = ANY($1) \
           AND date_trunc('month', created_at) = date_trunc('month', NOW())",
    )
    .bind(&income)
    .fetch_one(&state.db)
    .await?;

    let orders_this_month = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders \
         WHERE date_trunc('month', created_at) = date_trunc('month', NOW())",
    )
    .fetch_one(&state.db)
    .await?;

    let new_customers_this_month = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users \
         WHERE date_trunc('month', created_at) = date_trunc('month', NOW())",
    )
    .fetch_one(&state.db)
    .await?;

    let sparse: HashMap<NaiveDate, (i64, Decimal)> = sqlx::query_as::<_, (NaiveDate, i64, Decimal)>(
        "SELECT created_at::date AS day, COUNT(*), COALESCE(SUM(total_amount), 0) \
         FROM orders WHERE created_at::date > CURRENT_DATE - 7 \
         GROUP BY day",
    )
    .fetch_all(&state.db)
    .await?
    .into_iter()
    .map(|(day, orders, revenue)| (day, (orders, revenue)))
    .collect();
    let daily_sales =
        fill_daily_series(Utc::now().date_naive(), SALES_WINDOW_DAYS, &sparse);

    let top_products = sqlx::query_as::<_, (Uuid, String, i64, Decimal)>(
        "SELECT product_id, product_name, SUM(quantity)::BIGINT AS units, SUM(line_total) \
         FROM order_items GROUP BY product_id, product_name \
         ORDER BY units DESC LIMIT 5",
    )
    .fetch_all(&state.db)
    .await?
    .into_iter()
    .map(|(product_id, name, units_sold, revenue)| TopProduct {
        product_id,
        name,
        units_sold,
        revenue,
    })
    .collect();

    let recent_orders = sqlx::query_as::<_, RecentOrder>(
        "SELECT o.id, o.order_number, o.status, o.total_amount, o.created_at, \
                u.name AS customer_name \
         FROM orders o JOIN users u ON u.id = o.user_id \
         ORDER BY o.created_at DESC LIMIT 5",
    )
    .fetch_all(&state.db)
    .await?;

    let status_breakdown = sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM orders GROUP BY status ORDER BY status",
    )
    .fetch_all(&state.db)
    .await?
    .into_iter()
    .map(|(status, count)| StatusCount { status, count })
    .collect();

    Ok(Json(Dashboard {
        monthly_revenue,
        orders_this_month,
        new_customers_this_month,
        daily_sales,
        top_products,
        recent_orders,
        status_breakdown,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn daily_series_fills_zero_days() {
        let end = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let mut sparse = HashMap::new();
        sparse.insert(end - Duration::days(2), (3_i64, Decimal::new(4500, 2)));

        let series = fill_daily_series(end, SALES_WINDOW_DAYS, &sparse);

        assert_eq!(series.len(), 7);
        assert_eq!(series[0].day, end - Duration::days(6));
        assert_eq!(series[6].day, end);
        assert_eq!(series[4].orders, 3);
        assert_eq!(series[4].revenue, Decimal::new(4500, 2));
        assert_eq!(series.iter().filter(|d| d.orders == 0).count(), 6);
        assert_eq!(series[6].revenue, Decimal::ZERO);
    }

    #[test]
    fn daily_series_is_contiguous_and_ascending() {
        let end = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let series = fill_daily_series(end, SALES_WINDOW_DAYS, &HashMap::new());
        for pair in series.windows(2) {
            assert_eq!(pair[1].day - pair[0].day, Duration::days(1));
        }
    }
}
