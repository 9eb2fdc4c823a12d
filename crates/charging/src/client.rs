//! reqwest implementation of [`ChargingModule`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use riverbill_shared::ChargingModuleConfig;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::ChargingModule;
use crate::envelope::RequestResult;
use crate::error::ChargingError;
use crate::models::{CreateBillRunRequest, CustomerChange, SROC_RULESET};
use crate::token::TokenProvider;

const BILL_RUNS_PATH: &str = "v3/wrls/bill-runs";

/// HTTP client for the Charging Module API.
#[derive(Clone)]
pub struct ChargingModuleClient {
    client: reqwest::Client,
    base_url: String,
    token: Arc<dyn TokenProvider>,
}

impl ChargingModuleClient {
    /// Builds a client with the configured base URL and request timeout.
    pub fn new(
        config: &ChargingModuleConfig,
        token: Arc<dyn TokenProvider>,
    ) -> Result<Self, ChargingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ChargingError::Client(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> RequestResult {
        let token = match self.token.token().await {
            Ok(token) => token,
            Err(err) => return RequestResult::error(err.to_string()),
        };

        let url = self.endpoint(path);
        debug!(%method, %url, "Charging Module request");

        let mut request = self.client.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        match request.send().await {
            Ok(response) => {
                let result = RequestResult::from_response(response).await;
                if !result.succeeded {
                    warn!(%url, status_code = ?result.status_code(), "Charging Module request did not succeed");
                }
                result
            }
            Err(err) => {
                warn!(error = %err, %url, "Charging Module request failed");
                RequestResult::error(err.to_string())
            }
        }
    }

    fn serialize<T: serde::Serialize>(body: &T) -> Result<Value, RequestResult> {
        serde_json::to_value(body)
            .map_err(|err| RequestResult::error(format!("failed to serialize request: {err}")))
    }
}

#[async_trait]
impl ChargingModule for ChargingModuleClient {
    async fn create_bill_run(&self, region_code: &str) -> RequestResult {
        let body = CreateBillRunRequest {
            region: region_code.to_string(),
            ruleset: SROC_RULESET.to_string(),
        };
        match Self::serialize(&body) {
            Ok(body) => self.request(Method::POST, BILL_RUNS_PATH, Some(body)).await,
            Err(result) => result,
        }
    }

    async fn create_customer_change(&self, change: &CustomerChange) -> RequestResult {
        match Self::serialize(change) {
            Ok(body) => {
                self.request(Method::POST, "v3/wrls/customer-changes", Some(body))
                    .await
            }
            Err(result) => result,
        }
    }

    async fn view_bill_run(&self, bill_run_id: Uuid) -> RequestResult {
        self.request(Method::GET, &format!("{BILL_RUNS_PATH}/{bill_run_id}"), None)
            .await
    }

    async fn view_bill_run_status(&self, bill_run_id: Uuid) -> RequestResult {
        self.request(
            Method::GET,
            &format!("{BILL_RUNS_PATH}/{bill_run_id}/status"),
            None,
        )
        .await
    }

    async fn approve_bill_run(&self, bill_run_id: Uuid) -> RequestResult {
        self.request(
            Method::PATCH,
            &format!("{BILL_RUNS_PATH}/{bill_run_id}/approve"),
            None,
        )
        .await
    }

    async fn send_bill_run(&self, bill_run_id: Uuid) -> RequestResult {
        self.request(
            Method::PATCH,
            &format!("{BILL_RUNS_PATH}/{bill_run_id}/send"),
            None,
        )
        .await
    }

    async fn reissue_bill(&self, bill_run_id: Uuid, invoice_id: Uuid) -> RequestResult {
        self.request(
            Method::PATCH,
            &format!("{BILL_RUNS_PATH}/{bill_run_id}/invoices/{invoice_id}/rebill"),
            None,
        )
        .await
    }

    async fn view_bill(&self, bill_run_id: Uuid, invoice_id: Uuid) -> RequestResult {
        self.request(
            Method::GET,
            &format!("{BILL_RUNS_PATH}/{bill_run_id}/invoices/{invoice_id}"),
            None,
        )
        .await
    }

    async fn view_customer_files(&self, days: u32) -> RequestResult {
        self.request(Method::GET, &format!("v3/wrls/customer-files/{days}"), None)
            .await
    }

    async fn view_health(&self) -> RequestResult {
        self.request(Method::GET, "status", None).await
    }
}
