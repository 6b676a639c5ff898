use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CreateOrderRequest, OrderList, OrderWithItems, StoreOrderDto, StoreOrderList,
        UpdateOrderStatusRequest,
    },
    entity::{
        addresses::{Column as AddressCol, Entity as Addresses},
        cart_items::{Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders,
            Model as OrderModel,
        },
        products::{self, Column as ProdCol, Entity as Products},
        stores::{Column as StoreCol, Entity as Stores, Model as StoreModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, to_money},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{settings_service, ticket_service},
    state::AppState,
};

/// Create an order from explicit (product, quantity) lines. Validation,
/// persistence, stock decrement and cart-line cleanup all happen inside one
/// transaction: either everything lands or nothing does.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }
    for line in &payload.items {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".into(),
            ));
        }
    }

    // Fee snapshot taken up front; a mid-flow settings change is invisible here.
    let fees = settings_service::checkout_fees(&state.pool).await?;

    let txn = state.orm.begin().await?;

    let address = Addresses::find_by_id(payload.address_id)
        .filter(AddressCol::UserId.eq(user.user_id))
        .one(&txn)
        .await?;
    let address = match address {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    // Lock every product row before checking stock, so two concurrent
    // checkouts of the same product cannot both pass the check.
    let mut total = Decimal::ZERO;
    let mut lines: Vec<(products::Model, i32)> = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let product = Products::find_by_id(line.product_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let product = match product {
            Some(p) => p,
            None => return Err(AppError::NotFound),
        };
        if product.status != "active" {
            return Err(AppError::BadRequest(format!(
                "Product {} is not available",
                product.name
            )));
        }
        if product.stock < line.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }
        total += product.price * Decimal::from(line.quantity);
        lines.push((product, line.quantity));
    }

    let total = to_money(total);
    let service_fee = fees.service_fee(total);
    let buyer_service_fee = to_money(fees.buyer_service_fee);

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        address_id: Set(address.id),
        status: Set(OrderStatus::Pending.as_str().into()),
        total: Set(total),
        service_fee: Set(service_fee),
        buyer_service_fee: Set(buyer_service_fee),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for (product, quantity) in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            store_id: Set(product.store_id),
            product_name: Set(product.name.clone()),
            price: Set(product.price),
            quantity: Set(*quantity),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        order_items.push(order_item_from_entity(item));

        // reduce stock
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(*quantity))
            .filter(ProdCol::Id.eq(product.id))
            .exec(&txn)
            .await?;
    }

    // Drop only the ordered lines from the cart; anything added concurrently
    // stays.
    if let Some(cart) = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&txn)
        .await?
    {
        let ordered_ids: Vec<Uuid> = lines.iter().map(|(p, _)| p.id).collect();
        CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart.id))
            .filter(CartItemCol::ProductId.is_in(ordered_ids))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_create",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total": order.total.to_string() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: order_from_entity(order),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    ensure_order_party(&state.orm, &order, user).await?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Transition an order along the status table. Moving to `paid` triggers
/// best-effort ticket QR issuance after the transition has committed.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let next = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest("Invalid order status".into()))?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    ensure_order_party(&txn, &order, user).await?;

    let current = OrderStatus::parse(&order.status)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("order has unknown status")))?;
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot move order from {} to {}",
            current.as_str(),
            next.as_str()
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if next == OrderStatus::Paid {
        // A QR failure must not undo the paid transition.
        match ticket_service::issue_for_order(&state.orm, &order).await {
            Ok(0) => {}
            Ok(issued) => tracing::info!(order_id = %order.id, issued, "ticket QR codes issued"),
            Err(err) => {
                tracing::warn!(order_id = %order.id, error = %err, "ticket QR issuance failed")
            }
        }
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_store_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<StoreOrderList>> {
    let store = store_of(&state.orm, user).await?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all().add(OrderItemCol::StoreId.eq(store.id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find()
        .join(JoinType::InnerJoin, orders::Relation::OrderItems.def())
        .filter(condition)
        .distinct();
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let order_models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let mut items = Vec::with_capacity(order_models.len());
    for order in order_models {
        items.push(store_order_view(&state.orm, order, store.id).await?);
    }

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        StoreOrderList { items },
        Some(meta),
    ))
}

pub async fn get_store_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<StoreOrderDto>> {
    let store = store_of(&state.orm, user).await?;

    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let view = store_order_view(&state.orm, order, store.id).await?;
    if view.items.is_empty() {
        // No line of this store in the order: indistinguishable from absence.
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success("Order", view, Some(Meta::empty())))
}

async fn store_order_view<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    store_id: Uuid,
) -> AppResult<StoreOrderDto> {
    let items: Vec<OrderItem> = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .filter(OrderItemCol::StoreId.eq(store_id))
        .all(conn)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    let seller_total = to_money(
        items
            .iter()
            .map(|i| i.price * Decimal::from(i.quantity))
            .sum(),
    );

    Ok(StoreOrderDto {
        order: order_from_entity(order),
        items,
        seller_total,
    })
}

pub(crate) async fn store_of<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
) -> AppResult<StoreModel> {
    Stores::find()
        .filter(StoreCol::UserId.eq(user.user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::BadRequest("You do not own a store".into()))
}

/// The buyer and any seller with a line in the order may see it. Everyone
/// else gets `NotFound`, never `Forbidden`.
async fn ensure_order_party<C: ConnectionTrait>(
    conn: &C,
    order: &OrderModel,
    user: &AuthUser,
) -> AppResult<()> {
    if order.user_id == user.user_id {
        return Ok(());
    }

    if let Some(store) = Stores::find()
        .filter(StoreCol::UserId.eq(user.user_id))
        .one(conn)
        .await?
    {
        let has_line = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .filter(OrderItemCol::StoreId.eq(store.id))
            .count(conn)
            .await?
            > 0;
        if has_line {
            return Ok(());
        }
    }

    Err(AppError::NotFound)
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        address_id: model.address_id,
        status: OrderStatus::parse(&model.status).unwrap_or(OrderStatus::Pending),
        total: model.total,
        service_fee: model.service_fee,
        buyer_service_fee: model.buyer_service_fee,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        store_id: model.store_id,
        product_name: model.product_name,
        price: model.price,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
