use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::payments::{CreatePaymentRequest, PaymentList, PaymentResponse},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders},
        payments::{
            self, ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel,
        },
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    external::snap::{
        Callbacks, CustomerDetails, ItemDetail, SnapTransactionRequest, TransactionDetails,
    },
    middleware::auth::AuthUser,
    models::{OrderStatus, Payment},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const PAYMENT_REUSE_WINDOW_HOURS: i64 = 24;

/// Start hosted checkout for a pending order. A pending payment younger than
/// the reuse window is returned as-is instead of opening a second gateway
/// transaction for the same order.
pub async fn create_payment(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<PaymentResponse>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(payload.order_id)
        .filter(OrderCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.status != OrderStatus::Pending.as_str() {
        return Err(AppError::BadRequest(
            "Order is not awaiting payment".into(),
        ));
    }

    let existing = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .order_by_desc(PaymentCol::CreatedAt)
        .one(&txn)
        .await?;
    if let Some(payment) = existing {
        if payment_reusable(
            &payment.status,
            payment.created_at.with_timezone(&Utc),
            Utc::now(),
        ) {
            // Nothing written; drop the transaction and hand back the token.
            return Ok(ApiResponse::success(
                "Payment pending",
                payment_response(&payment),
                Some(Meta::empty()),
            ));
        }
    }

    let buyer = Users::find_by_id(user.user_id).one(&txn).await?;
    let buyer = match buyer {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let gross = gross_amount(order.total, order.buyer_service_fee);

    let mut item_details: Vec<ItemDetail> = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|item| ItemDetail {
            id: item.product_id.to_string(),
            price: item.price,
            quantity: item.quantity,
            name: item.product_name,
        })
        .collect();
    if order.buyer_service_fee > Decimal::ZERO {
        item_details.push(ItemDetail {
            id: "buyer-service-fee".into(),
            price: order.buyer_service_fee,
            quantity: 1,
            name: "Buyer service fee".into(),
        });
    }

    let request = SnapTransactionRequest {
        transaction_details: TransactionDetails {
            // Timestamp suffix keeps retries from colliding at the gateway.
            order_id: format!("{}_{}", order.id, Utc::now().timestamp()),
            gross_amount: gross,
        },
        customer_details: CustomerDetails {
            first_name: buyer
                .email
                .split('@')
                .next()
                .unwrap_or("buyer")
                .to_string(),
            email: buyer.email.clone(),
        },
        item_details,
        callbacks: Callbacks {
            finish: format!("{}/orders/{}", state.config.app_base_url, order.id),
        },
    };

    // Gateway failure propagates here and the open transaction rolls back,
    // so no payment row exists without a gateway-side transaction.
    let snap = state.snap.create_transaction(&request).await?;

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        transaction_id: Set(snap.token),
        status: Set("pending".into()),
        gross_amount: Set(gross),
        redirect_url: Set(snap.redirect_url),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "payment_create",
        Some("payments"),
        Some(serde_json::json!({
            "order_id": order.id,
            "transaction_id": payment.transaction_id,
            "gross_amount": payment.gross_amount.to_string(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment created",
        payment_response(&payment),
        Some(Meta::empty()),
    ))
}

pub async fn list_payments(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PaymentList>> {
    let items = Payments::find()
        .join(JoinType::InnerJoin, payments::Relation::Orders.def())
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(PaymentCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(payment_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Payments",
        PaymentList { items },
        Some(Meta::empty()),
    ))
}

/// The amount charged at the gateway: order total plus the flat buyer fee,
/// rounded to whole currency units.
pub fn gross_amount(total: Decimal, buyer_service_fee: Decimal) -> Decimal {
    (total + buyer_service_fee).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

pub fn payment_reusable(status: &str, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    status == "pending" && now - created_at < Duration::hours(PAYMENT_REUSE_WINDOW_HOURS)
}

fn payment_response(payment: &PaymentModel) -> PaymentResponse {
    PaymentResponse {
        order_id: payment.order_id,
        transaction_id: payment.transaction_id.clone(),
        status: payment.status.clone(),
        gross_amount: payment.gross_amount,
        redirect_url: payment.redirect_url.clone(),
    }
}

fn payment_from_entity(model: PaymentModel) -> Payment {
    Payment {
        id: model.id,
        order_id: model.order_id,
        transaction_id: model.transaction_id,
        status: model.status,
        gross_amount: model.gross_amount,
        redirect_url: model.redirect_url,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn gross_amount_adds_buyer_fee_and_rounds_to_whole_units() {
        assert_eq!(
            gross_amount(dec!(25000.00), dec!(2000.00)).to_string(),
            "27000"
        );
        assert_eq!(gross_amount(dec!(99.50), dec!(0)).to_string(), "100");
        assert_eq!(gross_amount(dec!(99.49), dec!(0)).to_string(), "99");
    }

    #[test]
    fn pending_payment_is_reused_within_the_window() {
        let now = Utc::now();
        assert!(payment_reusable("pending", now - Duration::hours(1), now));
        assert!(payment_reusable(
            "pending",
            now - Duration::hours(23) - Duration::minutes(59),
            now
        ));
        assert!(!payment_reusable("pending", now - Duration::hours(25), now));
        assert!(!payment_reusable("settlement", now - Duration::hours(1), now));
        assert!(!payment_reusable("failed", now - Duration::hours(1), now));
    }
}
