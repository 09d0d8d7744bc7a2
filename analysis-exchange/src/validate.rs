use serde_json::Value;

use crate::error::{AnalysisError, Result};
use crate::report::AnalysisReport;

/// Enforce that a candidate model response exactly matches the report shape.
///
/// Reject-whole-on-any-defect: the first missing or mismatched field fails
/// the entire response, named by dotted path. Empty lists are valid; a
/// missing field is not. Pure function, no I/O.
pub fn validate_report(candidate: &Value) -> Result<AnalysisReport> {
    let root = require_object(candidate, "")?;

    let disease = require_object(require_field(root, "", "diseaseInfo")?, "diseaseInfo")?;
    for field in ["name", "localName", "description"] {
        require_string(require_field(disease, "diseaseInfo", field)?, &path("diseaseInfo", field))?;
    }

    let actions = require_object(require_field(root, "", "whatToDoNow")?, "whatToDoNow")?;
    require_string_list(
        require_field(actions, "whatToDoNow", "immediateSteps")?,
        "whatToDoNow.immediateSteps",
    )?;
    require_string(
        require_field(actions, "whatToDoNow", "emergencyAdvice")?,
        "whatToDoNow.emergencyAdvice",
    )?;

    let medicine = require_list(
        require_field(root, "", "recommendedMedicine")?,
        "recommendedMedicine",
    )?;
    for (i, entry) in medicine.iter().enumerate() {
        let entry_path = format!("recommendedMedicine[{i}]");
        let entry = require_object(entry, &entry_path)?;
        for field in ["name", "localName", "dosage", "timing", "notes"] {
            require_string(
                require_field(entry, &entry_path, field)?,
                &path(&entry_path, field),
            )?;
        }
    }

    let nutrition = require_object(
        require_field(root, "", "foodAndNutrition")?,
        "foodAndNutrition",
    )?;
    for field in [
        "foodsToInclude",
        "hydrationTips",
        "foodsToAvoid",
        "lifestyleGuidelines",
    ] {
        require_string_list(
            require_field(nutrition, "foodAndNutrition", field)?,
            &path("foodAndNutrition", field),
        )?;
    }

    require_string_list(require_field(root, "", "whatNotToDo")?, "whatNotToDo")?;
    require_string(require_field(root, "", "recoveryEstimate")?, "recoveryEstimate")?;
    require_string(require_field(root, "", "additionalInfo")?, "additionalInfo")?;

    serde_json::from_value(candidate.clone()).map_err(|e| AnalysisError::Validation {
        field: "".to_string(),
        reason: format!("deserialization failed after structural check: {e}"),
    })
}

fn path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

fn failure(field: &str, reason: impl Into<String>) -> AnalysisError {
    AnalysisError::Validation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn require_object<'a>(
    value: &'a Value,
    at: &str,
) -> Result<&'a serde_json::Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| failure(at, "expected an object"))
}

fn require_field<'a>(
    object: &'a serde_json::Map<String, Value>,
    parent: &str,
    field: &str,
) -> Result<&'a Value> {
    object
        .get(field)
        .ok_or_else(|| failure(&path(parent, field), "missing required field"))
}

fn require_string(value: &Value, at: &str) -> Result<()> {
    value
        .as_str()
        .map(|_| ())
        .ok_or_else(|| failure(at, "expected a string"))
}

fn require_list<'a>(value: &'a Value, at: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| failure(at, "expected a list"))
}

fn require_string_list(value: &Value, at: &str) -> Result<()> {
    let items = require_list(value, at)?;
    for (i, item) in items.iter().enumerate() {
        require_string(item, &format!("{at}[{i}]"))?;
    }
    Ok(())
}
