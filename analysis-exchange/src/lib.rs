pub mod chat;
pub mod error;
pub mod exchange;
pub mod prompt;
pub mod report;
pub mod store;
pub mod validate;

// Re-export commonly used types
pub use chat::{ASSISTANT_APOLOGY, ChatSession, ChatState};
pub use error::{AnalysisError, GENERIC_FAILURE_MESSAGE, Result};
pub use exchange::{AnalysisExchange, ModelClient};
pub use prompt::{
    GENERAL_DISCLAIMER, NON_PRESCRIPTION_DISCLAIMER, PromptPayload, compose_analysis,
    compose_chat, report_schema,
};
pub use report::{
    AnalysisReport, AnalysisRequest, ConversationTurn, DiseaseInfo, EncodedImage,
    FoodAndNutrition, MedicineRecommendation, StoredReportRecord, TurnRole, WhatToDoNow,
};
pub use store::{InMemoryReportStore, ReportStore};
pub use validate::validate_report;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct EchoModel;

    #[async_trait]
    impl ModelClient for EchoModel {
        async fn structured_completion(
            &self,
            _payload: &PromptPayload,
            _schema: &Value,
        ) -> Result<Value> {
            Ok(json!({
                "diseaseInfo": {
                    "name": "Seasonal allergy",
                    "localName": "Hay fever",
                    "description": "Immune response to pollen."
                },
                "whatToDoNow": {
                    "immediateSteps": ["Avoid outdoor exposure during high pollen counts"],
                    "emergencyAdvice": "Seek care for breathing difficulty."
                },
                "recommendedMedicine": [],
                "foodAndNutrition": {
                    "foodsToInclude": [],
                    "hydrationTips": ["Stay hydrated"],
                    "foodsToAvoid": [],
                    "lifestyleGuidelines": ["Keep windows closed in the morning"]
                },
                "whatNotToDo": ["Do not rub your eyes"],
                "recoveryEstimate": "Symptoms subside as pollen levels drop",
                "additionalInfo": ""
            }))
        }

        async fn text_completion(&self, payload: &PromptPayload) -> Result<String> {
            Ok(format!("echo: {}", payload.instructions.len()))
        }
    }

    #[tokio::test]
    async fn analysis_then_follow_up_round_trip() {
        let exchange = AnalysisExchange::new(Arc::new(EchoModel));

        let request = AnalysisRequest {
            symptoms: "sneezing and itchy eyes every morning".to_string(),
            affected_area_image: None,
            seen_doctor: false,
            doctor_report_image: None,
        };

        let report = exchange.analyze(&request).await.unwrap();
        assert_eq!(report.disease_info.name, "Seasonal allergy");

        // anchor a chat session to the produced report
        let mut session = ChatSession::with_report(&report);
        let payload = session.begin_turn("should I see an allergist?").unwrap();
        assert!(payload.instructions.contains("Seasonal allergy"));

        let reply = exchange.follow_up(&payload).await;
        let turn = session.complete_turn(reply);
        assert!(turn.content.starts_with("echo:"));
        assert!(!session.is_awaiting_reply());
    }

    #[tokio::test]
    async fn validated_report_persists_as_stored_record() {
        let exchange = AnalysisExchange::new(Arc::new(EchoModel));
        let store = InMemoryReportStore::new();

        let request = AnalysisRequest {
            symptoms: "sneezing".to_string(),
            affected_area_image: None,
            seen_doctor: true,
            doctor_report_image: None,
        };
        let report = exchange.analyze(&request).await.unwrap();

        store
            .create(StoredReportRecord::new("owner-1", &request, report))
            .await
            .unwrap();

        let history = store.recent_for_owner("owner-1", 5).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].seen_doctor);
        assert_eq!(history[0].symptoms_text, "sneezing");
    }
}
