//! Order placement: validate cart lines, decrement stock, persist the order
//! and its line-item snapshots in one transaction.
//!
//! Stock decrements are conditional UPDATEs (`stock >= quantity` in the
//! WHERE clause), so concurrent placements against the same product are
//! serialized by the row lock and can never drive stock negative. Any
//! failure on any line rolls the whole transaction back: no partial orders,
//! no partial decrements.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::Acquire;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::events;
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlaceOrder {
    #[validate(length(min = 1, message = "payment_method is required"))]
    pub payment_method: String,
    #[validate(length(min = 1, message = "shipping_address is required"))]
    pub shipping_address: String,
    pub shipping_type: Option<String>,
    #[serde(default)]
    pub shipping_cost: Decimal,
    pub items: Vec<NewOrderItem>,
}

/// Runs the full placement workflow and returns the new order id.
pub async fn place_order(
    state: &AppState,
    user_id: Uuid,
    req: PlaceOrder,
) -> Result<Uuid, ApiError> {
    req.validate()?;
    validate_items(&req.items, req.shipping_cost)?;

    let mut tx = state.db.begin().await?;
    let mut total = req.shipping_cost;
    let mut lines: Vec<(NewOrderItem, String, Decimal)> = Vec::with_capacity(req.items.len());

    for item in &req.items {
        let product = sqlx::query_as::<_, (String, Decimal)>(
            "SELECT name, price FROM products WHERE id = $1",
        )
        .bind(item.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {}", item.product_id)))?;

        let (name, price) = product;

        let decremented = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = NOW() \
             WHERE id = $1 AND stock >= $2",
        )
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;
        if decremented.rows_affected() == 0 {
            // dropping the transaction rolls back earlier decrements
            return Err(ApiError::InsufficientStock(name));
        }

        total += price * Decimal::from(item.quantity);
        lines.push((item.clone(), name, price));
    }

    let order_id = Uuid::now_v7();

    // The generator is collision-resistant, not collision-free; the unique
    // constraint is authoritative. Each attempt runs inside a savepoint so a
    // conflicting insert doesn't abort the outer transaction (Postgres would
    // otherwise reject every later statement with 25P02). One retry with a
    // fresh token, then 409.
    let mut order_number = generate_order_number();
    for attempt in 0..2 {
        let mut savepoint = tx.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO orders (id, user_id, order_number, status, total_amount, \
             shipping_address, shipping_type, shipping_cost, payment_method) \
             VALUES ($1, $2, $3, 'PENDING', $4, $5, $6, $7, $8)",
        )
        .bind(order_id)
        .bind(user_id)
        .bind(&order_number)
        .bind(total)
        .bind(&req.shipping_address)
        .bind(&req.shipping_type)
        .bind(req.shipping_cost)
        .bind(&req.payment_method)
        .execute(&mut *savepoint)
        .await;

        match inserted {
            Ok(_) => {
                savepoint.commit().await?;
                break;
            }
            Err(err) if is_order_number_conflict(&err) => {
                savepoint.rollback().await?;
                if attempt == 0 {
                    order_number = generate_order_number();
                } else {
                    return Err(ApiError::Conflict(
                        "could not allocate order number".to_string(),
                    ));
                }
            }
            Err(err) => return Err(err.into()),
        }
    }

    for (item, name, price) in &lines {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, product_name, \
             product_price, quantity, line_total) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(item.product_id)
        .bind(name)
        .bind(price)
        .bind(item.quantity)
        .bind(line_total(*price, item.quantity))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(%order_id, %order_number, %total, "order placed");
    events::publish_order_created(state, order_id, &order_number, total).await;

    Ok(order_id)
}

fn validate_items(items: &[NewOrderItem], shipping_cost: Decimal) -> Result<(), ApiError> {
    if items.is_empty() {
        return Err(ApiError::Validation("order must contain at least one item".to_string()));
    }
    if items.iter().any(|i| i.quantity < 1) {
        return Err(ApiError::Validation("item quantity must be at least 1".to_string()));
    }
    if shipping_cost < Decimal::ZERO {
        return Err(ApiError::Validation("shipping_cost must not be negative".to_string()));
    }
    Ok(())
}

fn line_total(price: Decimal, quantity: i32) -> Decimal {
    price * Decimal::from(quantity)
}

/// Human-facing order number, e.g. `ORD-1A2B3C4D`.
fn generate_order_number() -> String {
    format!("ORD-{:08X}", rand::random::<u32>())
}

fn is_order_number_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.constraint())
        .is_some_and(|constraint| constraint.contains("order_number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i32) -> NewOrderItem {
        NewOrderItem { product_id: Uuid::now_v7(), quantity }
    }

    #[test]
    fn rejects_empty_item_list() {
        let err = validate_items(&[], Decimal::ZERO).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        assert!(validate_items(&[item(0)], Decimal::ZERO).is_err());
        assert!(validate_items(&[item(-3)], Decimal::ZERO).is_err());
        assert!(validate_items(&[item(1)], Decimal::ZERO).is_ok());
    }

    #[test]
    fn rejects_negative_shipping_cost() {
        assert!(validate_items(&[item(1)], Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn line_total_is_exact() {
        // price 10.00, qty 3 -> 30.00
        assert_eq!(line_total(Decimal::new(1000, 2), 3), Decimal::new(3000, 2));
    }

    #[test]
    fn example_scenario_total() {
        // stock=5, price=10.00, qty=3, shipping=2.00 -> 32.00
        let total = line_total(Decimal::new(1000, 2), 3) + Decimal::new(200, 2);
        assert_eq!(total, Decimal::new(3200, 2));
    }

    #[test]
    fn order_number_format() {
        let n = generate_order_number();
        assert!(n.starts_with("ORD-"));
        assert_eq!(n.len(), 12);
        assert!(n[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[derive(Debug)]
    struct FakeDbError(&'static str);

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
        }
    }

    impl std::error::Error for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }
        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }
        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }
        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }
        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn order_number_conflict_detected_by_constraint_name() {
        let conflict = sqlx::Error::Database(Box::new(FakeDbError("orders_order_number_key")));
        assert!(is_order_number_conflict(&conflict));

        let other_unique = sqlx::Error::Database(Box::new(FakeDbError("orders_pkey")));
        assert!(!is_order_number_conflict(&other_unique));
        assert!(!is_order_number_conflict(&sqlx::Error::RowNotFound));
    }
}
