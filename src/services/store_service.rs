use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::stores::{CreateStoreRequest, StoreList, StoreWithProducts, UpdateStoreRequest},
    entity::{
        products::{Column as ProdCol, Entity as Products},
        stores::{ActiveModel as StoreActive, Column, Entity as Stores, Model as StoreModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Store,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::product_service::{self, STATUS_ACTIVE},
    state::AppState,
};

pub async fn create_store(
    state: &AppState,
    user: &AuthUser,
    payload: CreateStoreRequest,
) -> AppResult<ApiResponse<Store>> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("store name must not be empty".into()));
    }

    let existing = Stores::find()
        .filter(Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("You already have a store".into()));
    }

    let mut slug = slugify(&name);
    let slug_taken = Stores::find()
        .filter(Column::Slug.eq(slug.clone()))
        .one(&state.orm)
        .await?
        .is_some();
    if slug_taken {
        // Disambiguate with a short random suffix rather than failing.
        let suffix = Uuid::new_v4().to_string();
        slug = format!("{}-{}", slug, &suffix[..8]);
    }

    let store = StoreActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        name: Set(name),
        slug: Set(slug),
        description: Set(payload.description),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "store_create",
        Some("stores"),
        Some(serde_json::json!({ "store_id": store.id, "slug": store.slug })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Store created",
        store_from_entity(store),
        Some(Meta::empty()),
    ))
}

pub async fn list_stores(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<StoreList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Stores::find().order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(store_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Stores", StoreList { items }, Some(meta)))
}

pub async fn get_store_by_slug(
    state: &AppState,
    slug: &str,
) -> AppResult<ApiResponse<StoreWithProducts>> {
    let store = Stores::find()
        .filter(Column::Slug.eq(slug))
        .one(&state.orm)
        .await?;
    let store = match store {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let products = Products::find()
        .filter(ProdCol::StoreId.eq(store.id))
        .filter(ProdCol::Status.eq(STATUS_ACTIVE))
        .order_by_desc(ProdCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_service::product_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Store",
        StoreWithProducts {
            store: store_from_entity(store),
            products,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_my_store(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Store>> {
    let store = Stores::find()
        .filter(Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    let store = match store {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Store",
        store_from_entity(store),
        Some(Meta::empty()),
    ))
}

pub async fn update_my_store(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateStoreRequest,
) -> AppResult<ApiResponse<Store>> {
    let store = Stores::find()
        .filter(Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    let store = match store {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: StoreActive = store.into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("store name must not be empty".into()));
        }
        // The slug is permanent; renaming the store never breaks saved links.
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(Utc::now().into());

    let store = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Store updated",
        store_from_entity(store),
        Some(Meta::empty()),
    ))
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("store");
    }
    slug
}

fn store_from_entity(model: StoreModel) -> Store {
    Store {
        id: model.id,
        user_id: model.user_id,
        name: model.name,
        slug: model.slug,
        description: model.description,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_flattens_names() {
        assert_eq!(slugify("Bali Tour & Travel"), "bali-tour-travel");
        assert_eq!(slugify("  Warung  Sate  "), "warung-sate");
        assert_eq!(slugify("Ångström"), "ngstr-m");
        assert_eq!(slugify("!!!"), "store");
    }
}
