use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, TicketQr};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub address_id: Uuid,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// Seller-facing view: only the caller's store's lines, plus their subtotal.
#[derive(Debug, Serialize, ToSchema)]
pub struct StoreOrderDto {
    pub order: Order,
    pub items: Vec<OrderItem>,
    #[schema(value_type = String)]
    pub seller_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreOrderList {
    pub items: Vec<StoreOrderDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketOrderDto {
    pub order: Order,
    pub items: Vec<OrderItem>,
    #[schema(value_type = String)]
    pub seller_total: Decimal,
    pub tickets: Vec<TicketQr>,
}
