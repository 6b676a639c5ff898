use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::stores::{CreateStoreRequest, StoreList, StoreWithProducts, UpdateStoreRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Store,
    response::ApiResponse,
    routes::params::Pagination,
    services::store_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stores).post(create_store))
        .route("/me", get(get_my_store).put(update_my_store))
        .route("/{slug}", get(get_store_by_slug))
}

#[utoipa::path(
    get,
    path = "/api/stores",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List stores", body = ApiResponse<StoreList>)
    ),
    tag = "Stores"
)]
pub async fn list_stores(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<StoreList>>> {
    let resp = store_service::list_stores(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 200, description = "Create the caller's store", body = ApiResponse<Store>),
        (status = 400, description = "Caller already owns a store"),
    ),
    security(("bearer_auth" = [])),
    tag = "Stores"
)]
pub async fn create_store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateStoreRequest>,
) -> AppResult<Json<ApiResponse<Store>>> {
    let resp = store_service::create_store(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/stores/me",
    responses(
        (status = 200, description = "Get the caller's store", body = ApiResponse<Store>),
        (status = 404, description = "No store"),
    ),
    security(("bearer_auth" = [])),
    tag = "Stores"
)]
pub async fn get_my_store(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Store>>> {
    let resp = store_service::get_my_store(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/stores/me",
    request_body = UpdateStoreRequest,
    responses(
        (status = 200, description = "Update the caller's store", body = ApiResponse<Store>),
        (status = 404, description = "No store"),
    ),
    security(("bearer_auth" = [])),
    tag = "Stores"
)]
pub async fn update_my_store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateStoreRequest>,
) -> AppResult<Json<ApiResponse<Store>>> {
    let resp = store_service::update_my_store(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/stores/{slug}",
    params(
        ("slug" = String, Path, description = "Store slug")
    ),
    responses(
        (status = 200, description = "Public store profile with products", body = ApiResponse<StoreWithProducts>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Stores"
)]
pub async fn get_store_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<StoreWithProducts>>> {
    let resp = store_service::get_store_by_slug(&state, &slug).await?;
    Ok(Json(resp))
}
