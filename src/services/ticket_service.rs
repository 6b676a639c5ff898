use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use qrcode::QrCode;
use qrcode::render::svg;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::{
    dto::orders::{StoreOrderDto, StoreOrderList, TicketOrderDto, UpdateOrderStatusRequest},
    entity::{
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::Column as ProdCol,
        ticket_qrs::{
            ActiveModel as TicketQrActive, Column as TicketQrCol, Entity as TicketQrs,
            Model as TicketQrModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_TOURISM_MANAGER, ensure_role},
    models::{Order, TicketQr, to_money},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub const TICKET_PRODUCT_TYPE: &str = "ticket";

/// Issue one QR row per purchased ticket unit for a freshly paid order.
/// Every unit is rendered and inserted independently; a failure is logged
/// and skipped so the order stays paid with whatever QRs did land.
pub async fn issue_for_order<C: ConnectionTrait>(
    conn: &C,
    order: &OrderModel,
) -> AppResult<usize> {
    let ticket_items = OrderItems::find()
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .filter(OrderItemCol::OrderId.eq(order.id))
        .filter(ProdCol::ProductType.eq(TICKET_PRODUCT_TYPE))
        .all(conn)
        .await?;

    let mut issued = 0usize;
    for item in &ticket_items {
        for unit in 1..=item.quantity {
            let payload = qr_payload(order.id, item.id, &item.product_name, unit);
            let qr_image = match render_qr_data_url(&payload) {
                Ok(image) => image,
                Err(err) => {
                    tracing::warn!(
                        order_item_id = %item.id,
                        unit,
                        error = %err,
                        "QR render failed, skipping unit"
                    );
                    continue;
                }
            };

            let insert = TicketQrActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                order_item_id: Set(item.id),
                qr_image: Set(qr_image),
                is_used: Set(false),
                used_at: Set(None),
                created_at: NotSet,
            }
            .insert(conn)
            .await;

            match insert {
                Ok(_) => issued += 1,
                Err(err) => {
                    tracing::warn!(
                        order_item_id = %item.id,
                        unit,
                        error = %err,
                        "QR insert failed, skipping unit"
                    );
                }
            }
        }
    }

    Ok(issued)
}

pub fn qr_payload(order_id: Uuid, order_item_id: Uuid, product_name: &str, unit: i32) -> String {
    serde_json::json!({
        "order_id": order_id,
        "order_item_id": order_item_id,
        "product": product_name,
        "unit": unit,
    })
    .to_string()
}

pub fn render_qr_data_url(payload: &str) -> anyhow::Result<String> {
    let code = QrCode::new(payload.as_bytes())?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        BASE64.encode(image.as_bytes())
    ))
}

pub async fn list_ticket_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<StoreOrderList>> {
    ensure_role(user, ROLE_TOURISM_MANAGER)?;
    let store = order_service::store_of(&state.orm, user).await?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all()
        .add(OrderItemCol::StoreId.eq(store.id))
        .add(ProdCol::ProductType.eq(TICKET_PRODUCT_TYPE));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let finder = Orders::find()
        .join(JoinType::InnerJoin, orders::Relation::OrderItems.def())
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .filter(condition)
        .distinct()
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let order_models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let mut items = Vec::with_capacity(order_models.len());
    for order in order_models {
        let (lines, seller_total) = ticket_lines(&state.orm, order.id, store.id).await?;
        items.push(StoreOrderDto {
            order: order_service::order_from_entity(order),
            items: lines,
            seller_total,
        });
    }

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ticket orders",
        StoreOrderList { items },
        Some(meta),
    ))
}

pub async fn get_ticket_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<TicketOrderDto>> {
    ensure_role(user, ROLE_TOURISM_MANAGER)?;
    let store = order_service::store_of(&state.orm, user).await?;

    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let (items, seller_total) = ticket_lines(&state.orm, order.id, store.id).await?;
    if items.is_empty() {
        return Err(AppError::NotFound);
    }

    let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    let tickets = TicketQrs::find()
        .filter(TicketQrCol::OrderItemId.is_in(item_ids))
        .order_by_asc(TicketQrCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ticket_from_entity)
        .collect();

    let view = TicketOrderDto {
        order: order_service::order_from_entity(order),
        items,
        seller_total,
        tickets,
    };
    Ok(ApiResponse::success("Order", view, Some(Meta::empty())))
}

pub async fn update_ticket_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_role(user, ROLE_TOURISM_MANAGER)?;
    order_service::update_order_status(state, user, id, payload).await
}

/// Ticket-type lines of the manager's own store within one order.
async fn ticket_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    store_id: Uuid,
) -> AppResult<(Vec<crate::models::OrderItem>, Decimal)> {
    let items: Vec<_> = OrderItems::find()
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::StoreId.eq(store_id))
        .filter(ProdCol::ProductType.eq(TICKET_PRODUCT_TYPE))
        .all(conn)
        .await?
        .into_iter()
        .map(order_service::order_item_from_entity)
        .collect();

    let seller_total = to_money(
        items
            .iter()
            .map(|i| i.price * Decimal::from(i.quantity))
            .sum(),
    );

    Ok((items, seller_total))
}

fn ticket_from_entity(model: TicketQrModel) -> TicketQr {
    TicketQr {
        id: model.id,
        order_id: model.order_id,
        order_item_id: model.order_item_id,
        qr_image: model.qr_image,
        is_used: model.is_used,
        used_at: model.used_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_payload_carries_order_item_and_unit() {
        let order_id = Uuid::new_v4();
        let item_id = Uuid::new_v4();
        let payload = qr_payload(order_id, item_id, "City Tour Ticket", 2);

        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["order_id"], order_id.to_string());
        assert_eq!(value["order_item_id"], item_id.to_string());
        assert_eq!(value["product"], "City Tour Ticket");
        assert_eq!(value["unit"], 2);
    }

    #[test]
    fn qr_renders_to_svg_data_url() {
        let payload = qr_payload(Uuid::new_v4(), Uuid::new_v4(), "Museum Pass", 1);
        let url = render_qr_data_url(&payload).unwrap();

        let encoded = url
            .strip_prefix("data:image/svg+xml;base64,")
            .expect("data URL prefix");
        let decoded = BASE64.decode(encoded).unwrap();
        let svg_text = String::from_utf8(decoded).unwrap();
        assert!(svg_text.contains("<svg"));
    }
}
