use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, Store};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStoreRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStoreRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreList {
    pub items: Vec<Store>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreWithProducts {
    pub store: Store,
    pub products: Vec<Product>,
}
