//! Order lifecycle events over NATS.
//!
//! Publishing is fire-and-forget and only happens after commit; a missing or
//! failing broker is logged and never surfaces to the caller.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::AppState;

pub async fn publish_order_created(
    state: &AppState,
    order_id: Uuid,
    order_number: &str,
    total_amount: Decimal,
) {
    publish(
        state,
        "orders.created",
        serde_json::json!({
            "order_id": order_id,
            "order_number": order_number,
            "total_amount": total_amount,
        }),
    )
    .await;
}

pub async fn publish_order_status_changed(state: &AppState, order_id: Uuid, status: &str) {
    publish(
        state,
        "orders.status_changed",
        serde_json::json!({ "order_id": order_id, "status": status }),
    )
    .await;
}

async fn publish(state: &AppState, subject: &'static str, payload: serde_json::Value) {
    let Some(nats) = &state.nats else { return };
    let bytes = match serde_json::to_vec(&payload) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(subject, error = %err, "failed to encode event");
            return;
        }
    };
    if let Err(err) = nats.publish(subject, bytes.into()).await {
        tracing::warn!(subject, error = %err, "failed to publish event");
    }
}
