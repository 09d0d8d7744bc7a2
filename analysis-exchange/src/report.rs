use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Self-describing encoded media payload: a media type plus base64 bytes,
/// carried inline as a `data:<mime>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    media_type: String,
    data: String,
}

impl EncodedImage {
    pub fn new(media_type: impl Into<String>, base64_data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: base64_data.into(),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` string.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| AnalysisError::Input("not a data URI".to_string()))?;
        let (media_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| AnalysisError::Input("data URI is not base64-encoded".to_string()))?;
        if media_type.is_empty() {
            return Err(AnalysisError::Input("data URI has no media type".to_string()));
        }
        STANDARD
            .decode(payload)
            .map_err(|e| AnalysisError::Input(format!("invalid base64 payload: {e}")))?;
        Ok(Self::new(media_type, payload))
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// The outbound unit: everything the user supplied for one analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub symptoms: String,
    pub affected_area_image: Option<EncodedImage>,
    pub seen_doctor: bool,
    pub doctor_report_image: Option<EncodedImage>,
}

impl AnalysisRequest {
    /// Local precondition check. Runs before any payload is composed; a
    /// failure here means no external call is dispatched.
    pub fn validate(&self) -> Result<()> {
        if self.symptoms.trim().is_empty() {
            return Err(AnalysisError::Input(
                "Please describe your symptoms.".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseInfo {
    pub name: String,
    pub local_name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WhatToDoNow {
    pub immediate_steps: Vec<String>,
    pub emergency_advice: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRecommendation {
    pub name: String,
    pub local_name: String,
    pub dosage: String,
    pub timing: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FoodAndNutrition {
    pub foods_to_include: Vec<String>,
    pub hydration_tips: Vec<String>,
    pub foods_to_avoid: Vec<String>,
    pub lifestyle_guidelines: Vec<String>,
}

/// The inbound unit: a fixed structured report. Every field is required;
/// a response missing any of them is rejected wholesale. Immutable once
/// validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub disease_info: DiseaseInfo,
    pub what_to_do_now: WhatToDoNow,
    pub recommended_medicine: Vec<MedicineRecommendation>,
    pub food_and_nutrition: FoodAndNutrition,
    pub what_not_to_do: Vec<String>,
    pub recovery_estimate: String,
    pub additional_info: String,
}

/// Persisted shape for the report history. Write-only output of the core;
/// the dashboard reads it back through the store, never through us.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReportRecord {
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub symptoms_text: String,
    pub seen_doctor: bool,
    pub report: AnalysisReport,
}

impl StoredReportRecord {
    pub fn new(owner_id: impl Into<String>, request: &AnalysisRequest, report: AnalysisReport) -> Self {
        Self {
            owner_id: owner_id.into(),
            created_at: Utc::now(),
            symptoms_text: request.symptoms.clone(),
            seen_doctor: request.seen_doctor,
            report,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One entry in a chat transcript. Held in memory per session only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}
