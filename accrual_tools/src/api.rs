use std::{sync::Arc, time::Duration};

use gophermart_engine::{db_types::OrderNumber, AccrualOracle, AccrualVerdict, OracleError};
use log::*;
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};

use crate::{config::AccrualConfig, data_objects::AccrualResponse, AccrualApiError};

/// When the accrual system rate limits us without saying for how long.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AccrualApi {
    config: AccrualConfig,
    client: Arc<Client>,
}

impl std::fmt::Debug for AccrualApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccrualApi ({})", self.config.base_url)
    }
}

impl AccrualApi {
    pub fn new(config: AccrualConfig) -> Result<Self, AccrualApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AccrualApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &AccrualConfig {
        &self.config
    }

    /// Fetches the accrual system's view of the given order.
    ///
    /// Requests that fail before a response arrives are retried, with the wait doubling after every attempt. Any
    /// HTTP response, including an error status, is final for this call.
    pub async fn order_status(&self, number: &str) -> Result<AccrualVerdict, AccrualApiError> {
        let url = self.url(&format!("/api/orders/{number}"));
        let mut attempt = 0;
        let response = loop {
            trace!("🔮️ Querying accrual system: {url}");
            match self.client.get(&url).send().await {
                Ok(response) => break response,
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.config.retries => {
                    attempt += 1;
                    let wait = self.config.retry_delay(attempt);
                    warn!(
                        "🔮️ Could not reach the accrual system ({e}). Retry {attempt} in {}ms",
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                },
                Err(e) => return Err(AccrualApiError::Network(e.to_string())),
            }
        };
        self.handle_response(number, response).await
    }

    async fn handle_response(&self, number: &str, response: Response) -> Result<AccrualVerdict, AccrualApiError> {
        let status = response.status();
        match status {
            StatusCode::OK => {
                let body =
                    response.json::<AccrualResponse>().await.map_err(|e| AccrualApiError::JsonError(e.to_string()))?;
                trace!("🔮️ Order {number} is {:?} in the accrual system", body.status);
                body.into_verdict(number)
            },
            StatusCode::NO_CONTENT => {
                trace!("🔮️ Order {number} is not registered with the accrual system");
                Ok(AccrualVerdict::Unregistered)
            },
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_RETRY_AFTER);
                warn!("🔮️ The accrual system is rate limiting us. Backing off for {}s", retry_after.as_secs());
                Err(AccrualApiError::RateLimited { retry_after })
            },
            s if s.is_server_error() => {
                let message = response.text().await.unwrap_or_default();
                Err(AccrualApiError::ServerError { status: s.as_u16(), message })
            },
            s => {
                let message = response.text().await.unwrap_or_default();
                Err(AccrualApiError::UnexpectedStatus { status: s.as_u16(), message })
            },
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }
}

impl AccrualOracle for AccrualApi {
    async fn query(&self, number: &OrderNumber) -> Result<AccrualVerdict, OracleError> {
        self.order_status(number.as_str()).await.map_err(OracleError::from)
    }
}
