//! Banking execution adapters
//!
//! The ledger lives in the banking back-end. [`HttpBankingExecutor`] hands
//! complete actions to it; [`DryRunExecutor`] echoes them back when
//! execution is disabled.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use bank_assistant_config::ExecutionConfig;
use bank_assistant_core::{
    BankingExecutor, Error, ExecutionOutcome, Intent, Parameters, Result, UserContext,
};

use crate::AgentError;

/// Executor selected by configuration
pub fn from_config(config: &ExecutionConfig) -> std::result::Result<Arc<dyn BankingExecutor>, AgentError> {
    match (&config.endpoint, config.enabled) {
        (Some(endpoint), true) => Ok(Arc::new(HttpBankingExecutor::new(
            endpoint,
            Duration::from_millis(config.timeout_ms),
        )?)),
        (None, true) => Err(AgentError::Initialization(
            "execution enabled without an endpoint".to_string(),
        )),
        (_, false) => Ok(Arc::new(DryRunExecutor)),
    }
}

/// Answers every action without touching any ledger
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunExecutor;

#[async_trait]
impl BankingExecutor for DryRunExecutor {
    async fn execute(
        &self,
        action: Intent,
        parameters: &Parameters,
        user: &UserContext,
    ) -> Result<ExecutionOutcome> {
        tracing::debug!(action = %action, user_id = %user.user_id, "Dry-run execution");
        Ok(ExecutionOutcome::ok(json!({
            "dry_run": true,
            "action": action,
            "user_id": user.user_id,
            "parameters": parameters,
        })))
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[derive(Serialize)]
struct ActionRequest<'a> {
    user_id: &'a str,
    parameters: &'a Parameters,
}

/// POSTs actions to `{endpoint}/actions/{action}`
pub struct HttpBankingExecutor {
    client: Client,
    endpoint: String,
}

impl HttpBankingExecutor {
    pub fn new(endpoint: &str, timeout: Duration) -> std::result::Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Initialization(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn action_url(&self, action: Intent) -> String {
        format!("{}/actions/{}", self.endpoint, action)
    }
}

#[async_trait]
impl BankingExecutor for HttpBankingExecutor {
    async fn execute(
        &self,
        action: Intent,
        parameters: &Parameters,
        user: &UserContext,
    ) -> Result<ExecutionOutcome> {
        let response = self
            .client
            .post(self.action_url(action))
            .json(&ActionRequest {
                user_id: &user.user_id,
                parameters,
            })
            .send()
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(action = %action, status = %status, "Banking back-end rejected action");
            return Ok(ExecutionOutcome::failed(format!("HTTP {}: {}", status, body)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Execution(format!("invalid back-end response: {}", e)))?;

        // The back-end may answer with a full outcome or with bare data
        if body.get("success").is_some_and(|v| v.is_boolean()) {
            serde_json::from_value(body).map_err(|e| Error::Execution(e.to_string()))
        } else {
            Ok(ExecutionOutcome::ok(body))
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
