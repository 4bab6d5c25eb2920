//! Application State
//!
//! Shared state across all handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use bank_assistant_agent::{BankingAssistant, SessionRegistry};
use bank_assistant_config::Settings;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub assistant: Arc<BankingAssistant>,
    /// Prometheus handle; `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Settings, assistant: BankingAssistant) -> Self {
        Self {
            config: Arc::new(config),
            assistant: Arc::new(assistant),
            metrics: None,
        }
    }

    /// Wire everything from settings: domain tables, LLM fallback, executor
    pub fn from_settings(config: Settings) -> Result<Self, bank_assistant_agent::AgentError> {
        let assistant = BankingAssistant::from_settings(&config)?;
        Ok(Self::new(config, assistant))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        self.assistant.sessions()
    }
}
