use analysis_exchange::{AnalysisReport, ConversationTurn, StoredReportRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeSymptomsRequest {
    pub symptoms: String,
    #[serde(default)]
    pub seen_doctor: bool,
    /// `data:<mime>;base64,<payload>` string, present only when the user
    /// attached a photo of the affected area.
    pub affected_area_image: Option<String>,
    /// Encoded photo of a prior doctor's report.
    pub doctor_report_image: Option<String>,
    /// Authenticated owner identity, supplied by the upstream identity
    /// provider. When present the validated report is persisted for the
    /// dashboard.
    pub owner_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeSymptomsResponse {
    pub report: AnalysisReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportHistoryResponse {
    pub owner_id: String,
    pub reports: Vec<StoredReportRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Omitted on the first message; a fresh session is created and its id
    /// returned.
    pub session_id: Option<String>,
    pub message: String,
    /// Optional report to anchor a new session to. Ignored for existing
    /// sessions.
    pub report_context: Option<AnalysisReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResponse {
    pub session_id: String,
    pub context_attached: bool,
    pub turns: Vec<ConversationTurn>,
}
