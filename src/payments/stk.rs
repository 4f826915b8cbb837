use serde::{Deserialize, Serialize};

/// Client for the STK-push payment-initiation endpoint. The endpoint is an
/// opaque collaborator; all this crate sees is a success payload or a
/// non-2xx status.
#[derive(Debug, Clone)]
pub struct StkClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    pub invoice_id: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// Daraja-shaped acknowledgement returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription")]
    pub response_description: String,
    #[serde(rename = "CustomerMessage")]
    pub customer_message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StkError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Payment request rejected: {0}")]
    Api(String),
}

impl StkClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn initiate(&self, request: &StkPushRequest) -> Result<StkPushResponse, StkError> {
        let response = self
            .client
            .post(format!("{}/stk-push", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| StkError::Network(e.to_string()))?;

        self.handle_response(response).await
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<StkPushResponse, StkError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StkError::Api(format!("{status}: {body}")));
        }
        response
            .json::<StkPushResponse>()
            .await
            .map_err(|e| StkError::Network(e.to_string()))
    }
}
