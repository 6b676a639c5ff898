use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct TransactionDetails {
    pub order_id: String,
    pub gross_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ItemDetail {
    pub id: String,
    pub price: Decimal,
    pub quantity: i32,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct Callbacks {
    pub finish: String,
}

#[derive(Debug, Serialize)]
pub struct SnapTransactionRequest {
    pub transaction_details: TransactionDetails,
    pub customer_details: CustomerDetails,
    pub item_details: Vec<ItemDetail>,
    pub callbacks: Callbacks,
}

#[derive(Debug, Deserialize)]
pub struct SnapTransactionResponse {
    pub token: String,
    pub redirect_url: String,
}

/// Hosted-checkout client. Creates a Snap transaction and hands back the
/// token plus the redirect URL the buyer is sent to.
#[derive(Clone)]
pub struct SnapClient {
    client: Client,
    server_key: String,
    base_url: String,
}

impl SnapClient {
    pub fn new(server_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            server_key: server_key.into(),
            base_url: base_url.into(),
        }
    }

    pub async fn create_transaction(
        &self,
        request: &SnapTransactionRequest,
    ) -> AppResult<SnapTransactionResponse> {
        let url = format!("{}/transactions", self.base_url);

        let response = self
            .client
            .post(&url)
            // Snap authenticates with the server key as a basic-auth username.
            .basic_auth(&self.server_key, Some(""))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        if response.status().is_success() {
            let parsed: SnapTransactionResponse = response
                .json()
                .await
                .map_err(|e| AppError::Gateway(e.to_string()))?;
            Ok(parsed)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown gateway error".to_string());
            Err(AppError::Gateway(error_text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn transaction_request_serializes_gateway_shape() {
        let request = SnapTransactionRequest {
            transaction_details: TransactionDetails {
                order_id: "8c5a9f2e_1722945600".into(),
                gross_amount: dec!(27000),
            },
            customer_details: CustomerDetails {
                first_name: "buyer".into(),
                email: "buyer@example.com".into(),
            },
            item_details: vec![ItemDetail {
                id: "item-1".into(),
                price: dec!(10000.00),
                quantity: 2,
                name: "City Tour Ticket".into(),
            }],
            callbacks: Callbacks {
                finish: "https://shop.example.com/orders/8c5a9f2e".into(),
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["transaction_details"]["gross_amount"], "27000");
        assert_eq!(value["item_details"][0]["quantity"], 2);
        assert_eq!(
            value["callbacks"]["finish"],
            "https://shop.example.com/orders/8c5a9f2e"
        );
    }
}
