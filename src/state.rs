use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    external::snap::SnapClient,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: AppConfig,
    pub snap: SnapClient,
}
