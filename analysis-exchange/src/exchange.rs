use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::prompt::{PromptPayload, compose_analysis, report_schema};
use crate::report::{AnalysisReport, AnalysisRequest};
use crate::validate::validate_report;

/// External model service, passed in explicitly so the exchange holds no
/// ambient state and is testable with substitutable fakes.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Schema-guided structured call: returns a candidate value claiming to
    /// conform to the supplied schema, or a distinct failure.
    async fn structured_completion(&self, payload: &PromptPayload, schema: &Value)
    -> Result<Value>;

    /// Free-text conversational call.
    async fn text_completion(&self, payload: &PromptPayload) -> Result<String>;
}

/// The structured analysis exchange: compose, invoke, validate.
///
/// One outstanding call per submission; no retries, queueing, cancellation
/// or timeouts at this layer.
#[derive(Clone)]
pub struct AnalysisExchange {
    model: Arc<dyn ModelClient>,
}

impl AnalysisExchange {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Run a full analysis round-trip. Input failures short-circuit before
    /// any call is dispatched; the response is accepted only if it matches
    /// the report shape wholesale.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        request.validate()?;

        let payload = compose_analysis(request);
        info!(
            attachments = payload.attachments.len(),
            seen_doctor = request.seen_doctor,
            "dispatching symptom analysis"
        );

        let candidate = self
            .model
            .structured_completion(&payload, &report_schema())
            .await?;

        let report = validate_report(&candidate).inspect_err(|e| {
            warn!(error = %e, "model response rejected by validator");
        })?;

        info!(
            condition = %report.disease_info.name,
            medicine_suggestions = report.recommended_medicine.len(),
            "analysis report validated"
        );
        Ok(report)
    }

    /// Dispatch an already-composed conversational payload.
    pub async fn follow_up(&self, payload: &PromptPayload) -> Result<String> {
        self.model.text_completion(payload).await
    }
}
