use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Public base URL of the storefront, used for the gateway finish callback.
    pub app_base_url: String,
    pub snap_server_key: String,
    pub snap_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let app_base_url =
            env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let snap_server_key = env::var("SNAP_SERVER_KEY").unwrap_or_default();
        let snap_base_url = env::var("SNAP_BASE_URL")
            .unwrap_or_else(|_| "https://app.sandbox.midtrans.com/snap/v1".to_string());
        Ok(Self {
            database_url,
            host,
            port,
            app_base_url,
            snap_server_key,
            snap_base_url,
        })
    }
}
