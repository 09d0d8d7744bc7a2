use serde_json::{Value, json};

use crate::report::{AnalysisRequest, EncodedImage};

/// Fixed framing attached to every medication suggestion.
pub const NON_PRESCRIPTION_DISCLAIMER: &str =
    "This is not a prescription. Consult a doctor before taking any medication.";

/// General framing attached to every report.
pub const GENERAL_DISCLAIMER: &str =
    "This is an AI-generated preliminary analysis and not a substitute for professional medical advice.";

/// Opaque instruction payload ready for dispatch: the rendered template plus
/// any encoded media to attach alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPayload {
    pub instructions: String,
    pub attachments: Vec<EncodedImage>,
}

/// Project an [`AnalysisRequest`] into the instruction payload.
///
/// Pure and deterministic: composing twice from the same request yields
/// byte-identical payloads. Optional images contribute exactly one reference
/// line each when present and nothing at all when absent.
pub fn compose_analysis(request: &AnalysisRequest) -> PromptPayload {
    let mut attachments = Vec::new();
    let mut instructions = String::new();

    instructions.push_str(
        "You are a medical AI assistant producing a preliminary, structured health analysis.\n\n",
    );
    instructions.push_str("Patient-described symptoms:\n");
    instructions.push_str(request.symptoms.trim());
    instructions.push_str("\n\nHas the patient already seen a doctor for this issue: ");
    instructions.push_str(if request.seen_doctor { "Yes" } else { "No" });
    instructions.push('\n');

    if let Some(image) = &request.affected_area_image {
        attachments.push(image.clone());
        instructions.push_str(&format!(
            "\nAttachment {}: a photo of the affected area ({}). Consider its visible signs in your analysis.\n",
            attachments.len(),
            image.media_type()
        ));
    }
    if let Some(image) = &request.doctor_report_image {
        attachments.push(image.clone());
        instructions.push_str(&format!(
            "\nAttachment {}: a photo of the doctor's report ({}). Treat its findings as prior clinical context.\n",
            attachments.len(),
            image.media_type()
        ));
    }

    instructions.push_str("\nProduce a structured report that:\n");
    instructions.push_str("1. Identifies the most likely condition: its medical name, a common local name, and a short plain-language description.\n");
    instructions.push_str("2. Lists immediate steps to take now, plus advice on when this becomes an emergency.\n");
    instructions.push_str(&format!(
        "3. Suggests over-the-counter medication only, with dosage, timing and notes. Frame every suggestion with: \"{NON_PRESCRIPTION_DISCLAIMER}\"\n",
    ));
    instructions.push_str("4. Gives food and nutrition guidance: foods to include, hydration tips, foods to avoid, and lifestyle guidelines.\n");
    instructions.push_str("5. Lists actions the patient should not take.\n");
    instructions.push_str("6. Estimates the expected recovery time.\n");
    instructions.push_str("7. Adds any other relevant notes.\n");
    instructions.push_str(&format!(
        "8. Includes this disclaimer: \"{GENERAL_DISCLAIMER}\"\n",
    ));
    instructions
        .push_str("\nRespond with a single JSON object matching the provided schema exactly.\n");

    PromptPayload {
        instructions,
        attachments,
    }
}

/// Build a single conversational instruction for a follow-up question.
///
/// Prior report context is included verbatim when present and omitted
/// cleanly when absent; no placeholder text survives either way.
pub fn compose_chat(message: &str, prior_context: Option<&str>) -> PromptPayload {
    let mut instructions = String::new();
    instructions.push_str(
        "You are a 24/7 AI medical assistant, tailored to understand user symptoms and guide them toward recovery. \
         Provide personalized advice and support, and remind users you are not a substitute for professional medical advice where relevant.\n",
    );

    if let Some(context) = prior_context {
        instructions.push_str(
            "\nThe user has just received the following analysis report. Use it as the primary context for the conversation.\n---\n",
        );
        instructions.push_str(context);
        instructions.push_str("\n---\n");
    }

    instructions.push_str("\nUser message: ");
    instructions.push_str(message);
    instructions.push('\n');

    PromptPayload {
        instructions,
        attachments: Vec::new(),
    }
}

/// JSON schema for [`crate::AnalysisReport`], handed to the model service
/// for schema-guided structured output.
pub fn report_schema() -> Value {
    let string_list = || json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "diseaseInfo",
            "whatToDoNow",
            "recommendedMedicine",
            "foodAndNutrition",
            "whatNotToDo",
            "recoveryEstimate",
            "additionalInfo"
        ],
        "properties": {
            "diseaseInfo": {
                "type": "object",
                "additionalProperties": false,
                "required": ["name", "localName", "description"],
                "properties": {
                    "name": { "type": "string" },
                    "localName": { "type": "string" },
                    "description": { "type": "string" }
                }
            },
            "whatToDoNow": {
                "type": "object",
                "additionalProperties": false,
                "required": ["immediateSteps", "emergencyAdvice"],
                "properties": {
                    "immediateSteps": string_list(),
                    "emergencyAdvice": { "type": "string" }
                }
            },
            "recommendedMedicine": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["name", "localName", "dosage", "timing", "notes"],
                    "properties": {
                        "name": { "type": "string" },
                        "localName": { "type": "string" },
                        "dosage": { "type": "string" },
                        "timing": { "type": "string" },
                        "notes": { "type": "string" }
                    }
                }
            },
            "foodAndNutrition": {
                "type": "object",
                "additionalProperties": false,
                "required": ["foodsToInclude", "hydrationTips", "foodsToAvoid", "lifestyleGuidelines"],
                "properties": {
                    "foodsToInclude": string_list(),
                    "hydrationTips": string_list(),
                    "foodsToAvoid": string_list(),
                    "lifestyleGuidelines": string_list()
                }
            },
            "whatNotToDo": string_list(),
            "recoveryEstimate": { "type": "string" },
            "additionalInfo": { "type": "string" }
        }
    })
}
