//! Distinct category listing.

use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::AppState;

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let categories = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM products WHERE category IS NOT NULL ORDER BY category",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(categories))
}
