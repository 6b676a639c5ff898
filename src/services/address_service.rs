use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::addresses::{AddressList, CreateAddressRequest, UpdateAddressRequest},
    entity::{
        addresses::{
            ActiveModel as AddressActive, Column, Entity as Addresses, Model as AddressModel,
        },
        orders::{Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let items = Addresses::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_desc(Column::IsDefault)
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(address_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Addresses",
        AddressList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    if payload.is_default {
        clear_default(state, user.user_id).await?;
    }

    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        recipient: Set(payload.recipient),
        phone: Set(payload.phone),
        street: Set(payload.street),
        city: Set(payload.city),
        postal_code: Set(payload.postal_code),
        is_default: Set(payload.is_default),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Address created",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let existing = Addresses::find_by_id(id)
        .filter(Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    if payload.is_default == Some(true) && !existing.is_default {
        clear_default(state, user.user_id).await?;
    }

    let mut active: AddressActive = existing.into();
    if let Some(recipient) = payload.recipient {
        active.recipient = Set(recipient);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(phone);
    }
    if let Some(street) = payload.street {
        active.street = Set(street);
    }
    if let Some(city) = payload.city {
        active.city = Set(city);
    }
    if let Some(postal_code) = payload.postal_code {
        active.postal_code = Set(postal_code);
    }
    if let Some(is_default) = payload.is_default {
        active.is_default = Set(is_default);
    }

    let address = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Address updated",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = Addresses::find_by_id(id)
        .filter(Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    if existing.is_none() {
        return Err(AppError::NotFound);
    }

    // Orders reference addresses with RESTRICT; surface a clean error instead
    // of a constraint violation.
    let referenced = Orders::find()
        .filter(OrderCol::AddressId.eq(id))
        .count(&state.orm)
        .await?
        > 0;
    if referenced {
        return Err(AppError::BadRequest(
            "Address is used by existing orders".into(),
        ));
    }

    Addresses::delete_by_id(id).exec(&state.orm).await?;

    Ok(ApiResponse::success(
        "Address deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn clear_default(state: &AppState, user_id: Uuid) -> AppResult<()> {
    use sea_orm::sea_query::Expr;
    Addresses::update_many()
        .col_expr(Column::IsDefault, Expr::value(false))
        .filter(Column::UserId.eq(user_id))
        .filter(Column::IsDefault.eq(true))
        .exec(&state.orm)
        .await?;
    Ok(())
}

fn address_from_entity(model: AddressModel) -> Address {
    Address {
        id: model.id,
        user_id: model.user_id,
        recipient: model.recipient,
        phone: model.phone,
        street: model.street,
        city: model.city,
        postal_code: model.postal_code,
        is_default: model.is_default,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
