//! Raw generation text to validated report.
//!
//! Two distinct failures: text that is not JSON at all is a parse error,
//! JSON that breaks the contract is a schema violation. Nothing is coerced;
//! a document wrapped in a Markdown code fence is rejected as unparsable.

use serde_json::Value;
use shield_shared::contract::ReportContract;
use shield_shared::error::{ShieldError, ShieldResult};
use shield_shared::report::{ReportMeta, StructuredReport};

/// Parse raw text as a single JSON document
pub fn parse(raw: &str) -> ShieldResult<Value> {
    serde_json::from_str(raw).map_err(|e| ShieldError::Parse(e.to_string()))
}

/// Parse, validate and attach session metadata
pub fn validate(raw: &str, meta: ReportMeta) -> ShieldResult<StructuredReport> {
    let value = parse(raw)?;
    let steps = ReportContract::validate_steps(&value)?;
    Ok(ReportContract::assemble(meta, steps)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shield_shared::contract::ViolationReason;
    use shield_shared::error::ErrorKind;
    use shield_shared::scenarios::{self, ScenarioKey};

    fn generated_text() -> String {
        let mut doc = scenarios::load(ScenarioKey::FacultyLeave).unwrap().to_json();
        let obj = doc.as_object_mut().unwrap();
        for key in ["id", "title", "issueText", "createdAt", "scenarioKey"] {
            obj.remove(key);
        }
        serde_json::to_string(&doc).unwrap()
    }

    fn meta() -> ReportMeta {
        ReportMeta::for_issue("Teacher wants sick days as vacation", Utc::now())
    }

    #[test]
    fn test_valid_document_becomes_report() {
        let report = validate(&generated_text(), meta()).unwrap();
        assert_eq!(report.title(), "Teacher wants sick days as vacation");
        assert_eq!(report.steps().len(), 6);
        assert!(report.scenario_key().is_none());
    }

    #[test]
    fn test_prose_is_parse_error() {
        let err = validate("Here is your analysis: ...", meta()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_code_fence_is_not_stripped() {
        let fenced = format!("```json\n{}\n```", generated_text());
        let err = validate(&fenced, meta()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_contract_violation_is_schema_error() {
        let err = validate(r#"{"step1": {"title": "Classify the Issue", "content": []}}"#, meta())
            .unwrap_err();
        match err {
            ShieldError::Schema(v) => {
                assert_eq!(v.step, Some(1));
                assert_eq!(v.reason, ViolationReason::EmptyArray);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }
}
