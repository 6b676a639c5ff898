use rust_decimal::Decimal;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::admin::SettingsDto,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::to_money,
    response::{ApiResponse, Meta},
};

pub const KEY_SERVICE_FEE_PERCENTAGE: &str = "service_fee_percentage";
pub const KEY_BUYER_SERVICE_FEE: &str = "buyer_service_fee";

/// Fee values captured once at the start of checkout. A concurrent settings
/// change never affects an order creation already in flight.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutFees {
    pub service_fee_percentage: Decimal,
    pub buyer_service_fee: Decimal,
}

impl CheckoutFees {
    pub fn service_fee(&self, total: Decimal) -> Decimal {
        to_money(total * self.service_fee_percentage / Decimal::from(100))
    }
}

pub async fn checkout_fees(pool: &DbPool) -> AppResult<CheckoutFees> {
    Ok(CheckoutFees {
        service_fee_percentage: read_decimal(pool, KEY_SERVICE_FEE_PERCENTAGE).await?,
        buyer_service_fee: read_decimal(pool, KEY_BUYER_SERVICE_FEE).await?,
    })
}

async fn read_decimal(pool: &DbPool, key: &str) -> AppResult<Decimal> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT value FROM system_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    // Missing or malformed values fall back to a zero fee.
    Ok(row
        .and_then(|(value,)| value.trim().parse::<Decimal>().ok())
        .unwrap_or(Decimal::ZERO))
}

pub async fn get_settings(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<SettingsDto>> {
    ensure_admin(user)?;
    let fees = checkout_fees(pool).await?;
    let data = SettingsDto {
        service_fee_percentage: fees.service_fee_percentage.to_string(),
        buyer_service_fee: fees.buyer_service_fee.to_string(),
    };
    Ok(ApiResponse::success("Settings", data, Some(Meta::empty())))
}

pub async fn update_settings(
    pool: &DbPool,
    user: &AuthUser,
    payload: SettingsDto,
) -> AppResult<ApiResponse<SettingsDto>> {
    ensure_admin(user)?;

    let percentage = parse_fee(&payload.service_fee_percentage, KEY_SERVICE_FEE_PERCENTAGE)?;
    let flat_fee = parse_fee(&payload.buyer_service_fee, KEY_BUYER_SERVICE_FEE)?;

    upsert(pool, KEY_SERVICE_FEE_PERCENTAGE, &percentage.to_string()).await?;
    upsert(pool, KEY_BUYER_SERVICE_FEE, &flat_fee.to_string()).await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "settings_update",
        Some("system_settings"),
        Some(serde_json::json!({
            KEY_SERVICE_FEE_PERCENTAGE: percentage.to_string(),
            KEY_BUYER_SERVICE_FEE: flat_fee.to_string(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let data = SettingsDto {
        service_fee_percentage: percentage.to_string(),
        buyer_service_fee: flat_fee.to_string(),
    };
    Ok(ApiResponse::success(
        "Settings updated",
        data,
        Some(Meta::empty()),
    ))
}

fn parse_fee(value: &str, key: &str) -> AppResult<Decimal> {
    let parsed = value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| AppError::BadRequest(format!("{key} must be a decimal number")))?;
    if parsed < Decimal::ZERO {
        return Err(AppError::BadRequest(format!("{key} must not be negative")));
    }
    Ok(parsed)
}

async fn upsert(pool: &DbPool, key: &str, value: &str) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO system_settings (key, value, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn service_fee_is_percentage_of_total() {
        let fees = CheckoutFees {
            service_fee_percentage: dec!(5),
            buyer_service_fee: dec!(2000),
        };
        assert_eq!(fees.service_fee(dec!(25000.00)).to_string(), "1250.00");
        assert_eq!(fees.service_fee(Decimal::ZERO).to_string(), "0.00");
    }

    #[test]
    fn fee_parsing_rejects_garbage_and_negatives() {
        assert!(parse_fee("5", KEY_SERVICE_FEE_PERCENTAGE).is_ok());
        assert!(parse_fee(" 2000 ", KEY_BUYER_SERVICE_FEE).is_ok());
        assert!(parse_fee("five", KEY_SERVICE_FEE_PERCENTAGE).is_err());
        assert!(parse_fee("-1", KEY_BUYER_SERVICE_FEE).is_err());
    }
}
