use crate::config::AppConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug)]
pub enum DaimoError {
    Request(reqwest::Error),
    Api { status: u16, body: String },
}

impl fmt::Display for DaimoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaimoError::Request(e) => write!(f, "Request error: {}", e),
            DaimoError::Api { status, body } => {
                write!(f, "Daimo API error (status {}): {}", status, body)
            }
        }
    }
}

impl std::error::Error for DaimoError {}

impl From<reqwest::Error> for DaimoError {
    fn from(error: reqwest::Error) -> Self {
        DaimoError::Request(error)
    }
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentRequest<'a> {
    pub intent: &'a str,
    pub amount: String,
    pub currency: &'a str,
    #[serde(rename = "externalId")]
    pub external_id: &'a str,
    pub metadata: PaymentMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub struct PaymentMetadata<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    #[serde(rename = "planId")]
    pub plan_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct DaimoClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DaimoClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.daimo_api_url.trim_end_matches('/').to_string(),
            api_key: config.daimo_api_key.clone(),
        }
    }

    /// Creates a hosted checkout link. The returned id is the provider-side
    /// payment id that later webhook deliveries reference.
    pub async fn create_payment_link(
        &self,
        request: &CreatePaymentRequest<'_>,
    ) -> Result<PaymentLink, DaimoError> {
        let response = self
            .client
            .post(format!("{}/payment", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DaimoError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<PaymentLink>().await?)
    }

    /// Fetches the provider's view of a payment, passed through verbatim by
    /// the status proxy endpoint.
    pub async fn get_payment_status(
        &self,
        payment_id: &str,
    ) -> Result<serde_json::Value, DaimoError> {
        let response = self
            .client
            .get(format!("{}/payment/{}", self.base_url, payment_id))
            .header("Api-Key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DaimoError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<serde_json::Value>().await?)
    }
}
