//! Report contract: the single gate between untrusted JSON and
//! [`StructuredReport`].
//!
//! Validation is strict. Every step must be present, every string must be
//! non-blank, arrays must be non-empty and unknown keys are rejected at every
//! level. The same rules produce [`ReportContract::schema_descriptor`], so the
//! generation service is told exactly what is checked here.

use crate::report::{
    step_key, ContentModel, KeyValueEntry, OptionDetail, OptionField, OptionKey, OptionSet,
    OptionSetKind, RecommendationBlock, ReportMeta, Step, StructuredReport, STEP_COUNT,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

/// Metadata keys allowed next to the step keys in a full report document
pub const META_KEYS: [&str; 5] = ["id", "title", "issueText", "createdAt", "scenarioKey"];

/// Fixed step titles, used by prompts and canned scenarios
pub const STEP_TITLES: [&str; 6] = [
    "Classify the Issue",
    "Match Handbook & Policies",
    "Initial Risk Assessment",
    "Administrator Response Options",
    "Projected Complainant Reactions",
    "Final Recommendation & Action Plan",
];

/// Why a candidate document was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ViolationReason {
    NotAnObject,
    MissingStep,
    UnexpectedStep,
    UnexpectedKey,
    MissingField,
    WrongType { expected: &'static str },
    Blank,
    EmptyArray,
    /// Content shape does not match what the step requires
    WrongVariant { expected: &'static str },
    OutOfOrder { expected: u8, found: u8 },
    InvalidTimestamp,
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationReason::NotAnObject => write!(f, "must be a JSON object"),
            ViolationReason::MissingStep => write!(f, "is missing"),
            ViolationReason::UnexpectedStep => write!(f, "is not one of step1..step6"),
            ViolationReason::UnexpectedKey => write!(f, "is not part of the report contract"),
            ViolationReason::MissingField => write!(f, "is required"),
            ViolationReason::WrongType { expected } => write!(f, "must be {}", expected),
            ViolationReason::Blank => write!(f, "must not be blank"),
            ViolationReason::EmptyArray => write!(f, "must not be empty"),
            ViolationReason::WrongVariant { expected } => {
                write!(f, "must have {} content", expected)
            }
            ViolationReason::OutOfOrder { expected, found } => {
                write!(f, "expected step {} but found step {}", expected, found)
            }
            ViolationReason::InvalidTimestamp => write!(f, "must be an RFC 3339 timestamp"),
        }
    }
}

/// First offending location of a rejected document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// Step number when the problem is inside a step
    pub step: Option<u8>,
    /// Dotted path, e.g. `step4.content.optionB.riskScore`
    pub field: String,
    #[serde(flatten)]
    pub reason: ViolationReason,
}

impl SchemaViolation {
    pub fn new(step: Option<u8>, field: impl Into<String>, reason: ViolationReason) -> Self {
        Self {
            step,
            field: field.into(),
            reason,
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(n) => write!(f, "step {}: `{}` {}", n, self.field, self.reason),
            None => write!(f, "`{}` {}", self.field, self.reason),
        }
    }
}

impl std::error::Error for SchemaViolation {}

type Checked<T> = Result<T, SchemaViolation>;

/// Validator and schema source for six-step reports
pub struct ReportContract;

impl ReportContract {
    /// Validate a full report document (steps plus metadata keys)
    pub fn validate(candidate: &Value) -> Checked<StructuredReport> {
        let obj = candidate
            .as_object()
            .ok_or_else(|| SchemaViolation::new(None, "$", ViolationReason::NotAnObject))?;

        let id = meta_string(obj, "id")?;
        let title = meta_string(obj, "title")?;
        let issue_text = meta_string(obj, "issueText")?;
        let created_raw = meta_string(obj, "createdAt")?;
        let created_at = DateTime::parse_from_rfc3339(&created_raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|_| {
                SchemaViolation::new(None, "createdAt", ViolationReason::InvalidTimestamp)
            })?;
        let scenario_key = match obj.get("scenarioKey") {
            None | Some(Value::Null) => None,
            Some(_) => Some(meta_string(obj, "scenarioKey")?),
        };

        let steps = validate_step_map(obj, &META_KEYS)?;
        let meta = ReportMeta {
            id,
            title,
            issue_text,
            created_at,
            scenario_key,
        };
        Ok(StructuredReport::from_validated(meta, steps))
    }

    /// Validate a generation response: exactly `step1`..`step6`, nothing else
    pub fn validate_steps(candidate: &Value) -> Checked<Vec<Step>> {
        let obj = candidate
            .as_object()
            .ok_or_else(|| SchemaViolation::new(None, "$", ViolationReason::NotAnObject))?;
        validate_step_map(obj, &[])
    }

    /// Check already-typed steps against the same rules as the wire form.
    ///
    /// Returns the steps as the wire form reads them back, so option field
    /// order and option-set kind are canonical.
    pub fn check_steps(steps: &[Step]) -> Checked<Vec<Step>> {
        let mut canonical = Vec::with_capacity(steps.len());
        for (pos, step) in steps.iter().enumerate() {
            let expected = pos as u8 + 1;
            if expected > STEP_COUNT {
                return Err(SchemaViolation::new(
                    Some(step.index()),
                    step_key(step.index()),
                    ViolationReason::UnexpectedStep,
                ));
            }
            if step.index() != expected {
                return Err(SchemaViolation::new(
                    Some(expected),
                    step_key(expected),
                    ViolationReason::OutOfOrder {
                        expected,
                        found: step.index(),
                    },
                ));
            }
            reject_duplicate_fields(step)?;
            canonical.push(validate_step(expected, &step.to_wire())?);
        }
        if steps.len() < STEP_COUNT as usize {
            let missing = steps.len() as u8 + 1;
            return Err(SchemaViolation::new(
                Some(missing),
                step_key(missing),
                ViolationReason::MissingStep,
            ));
        }
        Ok(canonical)
    }

    /// Build a report from typed steps, rejecting anything the wire form would reject
    pub fn assemble(meta: ReportMeta, steps: Vec<Step>) -> Checked<StructuredReport> {
        for (field, value) in [
            ("id", &meta.id),
            ("title", &meta.title),
            ("issueText", &meta.issue_text),
        ] {
            if value.trim().is_empty() {
                return Err(SchemaViolation::new(None, field, ViolationReason::Blank));
            }
        }
        if matches!(&meta.scenario_key, Some(k) if k.trim().is_empty()) {
            return Err(SchemaViolation::new(
                None,
                "scenarioKey",
                ViolationReason::Blank,
            ));
        }
        let steps = Self::check_steps(&steps)?;
        Ok(StructuredReport::from_validated(meta, steps))
    }

    /// Response schema handed to the generation service
    pub fn schema_descriptor() -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for index in 1..=STEP_COUNT {
            let content = match index {
                1..=3 => key_value_schema(),
                4 | 5 => match OptionSetKind::for_step(index) {
                    Some(kind) => option_set_schema(kind),
                    None => string_schema(),
                },
                _ => recommendation_schema(),
            };
            properties.insert(
                step_key(index),
                object_schema(
                    json!({ "title": string_schema(), "content": content }),
                    &["title", "content"],
                ),
            );
            required.push(Value::String(step_key(index)));
        }
        json!({
            "type": "OBJECT",
            "properties": Value::Object(properties),
            "required": required,
        })
    }
}

fn meta_string(obj: &Map<String, Value>, key: &str) -> Checked<String> {
    match obj.get(key) {
        None => Err(SchemaViolation::new(None, key, ViolationReason::MissingField)),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(SchemaViolation::new(None, key, ViolationReason::Blank))
        }
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(SchemaViolation::new(
            None,
            key,
            ViolationReason::WrongType { expected: "a string" },
        )),
    }
}

fn validate_step_map(obj: &Map<String, Value>, allowed_extra: &[&str]) -> Checked<Vec<Step>> {
    let mut steps = Vec::with_capacity(STEP_COUNT as usize);
    for index in 1..=STEP_COUNT {
        let key = step_key(index);
        let value = obj.get(&key).ok_or_else(|| {
            SchemaViolation::new(Some(index), key.clone(), ViolationReason::MissingStep)
        })?;
        steps.push(validate_step(index, value)?);
    }

    for key in obj.keys() {
        if allowed_extra.contains(&key.as_str()) || parse_step_key(key).is_some() {
            continue;
        }
        let reason = if key.starts_with("step") {
            ViolationReason::UnexpectedStep
        } else {
            ViolationReason::UnexpectedKey
        };
        let step = key
            .strip_prefix("step")
            .and_then(|n| n.parse::<u8>().ok());
        return Err(SchemaViolation::new(step, key.clone(), reason));
    }
    Ok(steps)
}

/// The wire form is a map, so a repeated option field would be collapsed
fn reject_duplicate_fields(step: &Step) -> Checked<()> {
    let ContentModel::OptionSet(set) = step.content() else {
        return Ok(());
    };
    for (key, detail) in set.iter() {
        let fields = detail.fields();
        for (i, (field, _)) in fields.iter().enumerate() {
            if fields[..i].iter().any(|(seen, _)| seen == field) {
                return Err(SchemaViolation::new(
                    Some(step.index()),
                    format!(
                        "{}.content.{}.{}",
                        step_key(step.index()),
                        key.wire_key(),
                        field.wire_key()
                    ),
                    ViolationReason::UnexpectedKey,
                ));
            }
        }
    }
    Ok(())
}

fn parse_step_key(key: &str) -> Option<u8> {
    let n: u8 = key.strip_prefix("step")?.parse().ok()?;
    if (1..=STEP_COUNT).contains(&n) && key == step_key(n) {
        Some(n)
    } else {
        None
    }
}

/// Field-path helper carrying the step number
struct At {
    step: u8,
}

impl At {
    fn fail(&self, path: impl Into<String>, reason: ViolationReason) -> SchemaViolation {
        SchemaViolation::new(Some(self.step), path, reason)
    }

    fn object<'a>(&self, value: &'a Value, path: &str) -> Checked<&'a Map<String, Value>> {
        value.as_object().ok_or_else(|| {
            self.fail(path, ViolationReason::WrongType { expected: "an object" })
        })
    }

    fn string(&self, obj: &Map<String, Value>, parent: &str, key: &str) -> Checked<String> {
        let path = format!("{}.{}", parent, key);
        match obj.get(key) {
            None => Err(self.fail(path, ViolationReason::MissingField)),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(self.fail(path, ViolationReason::Blank))
            }
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(self.fail(path, ViolationReason::WrongType { expected: "a string" })),
        }
    }

    fn only_keys(&self, obj: &Map<String, Value>, parent: &str, allowed: &[&str]) -> Checked<()> {
        match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(extra) => Err(self.fail(
                format!("{}.{}", parent, extra),
                ViolationReason::UnexpectedKey,
            )),
            None => Ok(()),
        }
    }
}

fn validate_step(index: u8, value: &Value) -> Checked<Step> {
    let at = At { step: index };
    let path = step_key(index);
    let obj = at.object(value, &path)?;
    let title = at.string(obj, &path, "title")?;
    let content_path = format!("{}.content", path);
    let content = obj
        .get("content")
        .ok_or_else(|| at.fail(content_path.clone(), ViolationReason::MissingField))?;
    at.only_keys(obj, &path, &["title", "content"])?;

    let content = match index {
        1..=3 => ContentModel::KeyValueList(key_value_list(&at, content, &content_path)?),
        4 | 5 => {
            let kind = OptionSetKind::for_step(index).ok_or_else(|| {
                at.fail(content_path.clone(), ViolationReason::UnexpectedStep)
            })?;
            ContentModel::OptionSet(option_set(&at, kind, content, &content_path)?)
        }
        _ => ContentModel::RecommendationBlock(recommendation(&at, content, &content_path)?),
    };
    Ok(Step::new(index, title, content))
}

fn key_value_list(at: &At, value: &Value, path: &str) -> Checked<Vec<KeyValueEntry>> {
    let items = value.as_array().ok_or_else(|| {
        at.fail(path, ViolationReason::WrongVariant { expected: "KeyValueList" })
    })?;
    if items.is_empty() {
        return Err(at.fail(path, ViolationReason::EmptyArray));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_path = format!("{}[{}]", path, i);
            let obj = at.object(item, &item_path)?;
            let header = at.string(obj, &item_path, "header")?;
            let text = at.string(obj, &item_path, "text")?;
            at.only_keys(obj, &item_path, &["header", "text"])?;
            Ok(KeyValueEntry { header, text })
        })
        .collect()
}

fn option_set(at: &At, kind: OptionSetKind, value: &Value, path: &str) -> Checked<OptionSet> {
    let obj = value.as_object().ok_or_else(|| {
        at.fail(path, ViolationReason::WrongVariant { expected: "OptionSet" })
    })?;
    let mut details = Vec::with_capacity(3);
    for key in OptionKey::ALL {
        let option_path = format!("{}.{}", path, key.wire_key());
        let raw = obj
            .get(key.wire_key())
            .ok_or_else(|| at.fail(option_path.clone(), ViolationReason::MissingField))?;
        details.push(option_detail(at, kind, raw, &option_path)?);
    }
    let allowed: Vec<&str> = OptionKey::ALL.iter().map(|k| k.wire_key()).collect();
    at.only_keys(obj, path, &allowed)?;

    let mut it = details.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(a), Some(b), Some(c)) => Ok(OptionSet::new(kind, a, b, c)),
        _ => Err(at.fail(path, ViolationReason::MissingField)),
    }
}

fn option_detail(at: &At, kind: OptionSetKind, value: &Value, path: &str) -> Checked<OptionDetail> {
    let obj = at.object(value, path)?;
    let title = at.string(obj, path, "title")?;
    let mut fields = Vec::with_capacity(kind.fields().len());
    for field in kind.fields() {
        fields.push((*field, at.string(obj, path, field.wire_key())?));
    }
    let mut allowed: Vec<&str> = kind.fields().iter().map(OptionField::wire_key).collect();
    allowed.push("title");
    at.only_keys(obj, path, &allowed)?;
    Ok(OptionDetail::new(title, fields))
}

fn recommendation(at: &At, value: &Value, path: &str) -> Checked<RecommendationBlock> {
    let obj = value.as_object().ok_or_else(|| {
        at.fail(path, ViolationReason::WrongVariant { expected: "RecommendationBlock" })
    })?;
    let summary = at.string(obj, path, "recommendationSummary")?;
    let steps_path = format!("{}.implementationSteps", path);
    let raw_steps = match obj.get("implementationSteps") {
        None => return Err(at.fail(steps_path, ViolationReason::MissingField)),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(at.fail(steps_path, ViolationReason::WrongType { expected: "an array" }))
        }
    };
    if raw_steps.is_empty() {
        return Err(at.fail(steps_path, ViolationReason::EmptyArray));
    }
    let mut implementation_steps = Vec::with_capacity(raw_steps.len());
    for (i, item) in raw_steps.iter().enumerate() {
        let item_path = format!("{}[{}]", steps_path, i);
        match item {
            Value::String(s) if s.trim().is_empty() => {
                return Err(at.fail(item_path, ViolationReason::Blank))
            }
            Value::String(s) => implementation_steps.push(s.clone()),
            _ => {
                return Err(at.fail(item_path, ViolationReason::WrongType { expected: "a string" }))
            }
        }
    }
    at.only_keys(obj, path, &["recommendationSummary", "implementationSteps"])?;
    Ok(RecommendationBlock {
        summary,
        implementation_steps,
    })
}

fn string_schema() -> Value {
    json!({ "type": "STRING" })
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({ "type": "OBJECT", "properties": properties, "required": required })
}

fn key_value_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": object_schema(
            json!({ "header": string_schema(), "text": string_schema() }),
            &["header", "text"],
        ),
    })
}

fn option_set_schema(kind: OptionSetKind) -> Value {
    let mut detail_props = Map::new();
    detail_props.insert("title".to_string(), string_schema());
    let mut detail_required = vec!["title"];
    for field in kind.fields() {
        detail_props.insert(field.wire_key().to_string(), string_schema());
        detail_required.push(field.wire_key());
    }
    let detail = object_schema(Value::Object(detail_props), &detail_required);

    let mut props = Map::new();
    for key in OptionKey::ALL {
        props.insert(key.wire_key().to_string(), detail.clone());
    }
    let required: Vec<&str> = OptionKey::ALL.iter().map(|k| k.wire_key()).collect();
    object_schema(Value::Object(props), &required)
}

fn recommendation_schema() -> Value {
    object_schema(
        json!({
            "recommendationSummary": string_schema(),
            "implementationSteps": { "type": "ARRAY", "items": string_schema() },
        }),
        &["recommendationSummary", "implementationSteps"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display_names_step_and_path() {
        let v = SchemaViolation::new(
            Some(4),
            "step4.content.optionB.riskScore",
            ViolationReason::Blank,
        );
        assert_eq!(
            v.to_string(),
            "step 4: `step4.content.optionB.riskScore` must not be blank"
        );
    }

    #[test]
    fn test_parse_step_key_rejects_padded_numbers() {
        assert_eq!(parse_step_key("step3"), Some(3));
        assert_eq!(parse_step_key("step03"), None);
        assert_eq!(parse_step_key("step7"), None);
        assert_eq!(parse_step_key("stepX"), None);
    }

    #[test]
    fn test_schema_requires_every_step() {
        let schema = ReportContract::schema_descriptor();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 6);
        assert_eq!(
            schema["properties"]["step5"]["properties"]["content"]["required"],
            json!(["optionA", "optionB", "optionC"])
        );
        let reaction_required =
            &schema["properties"]["step5"]["properties"]["content"]["properties"]["optionA"]["required"];
        assert_eq!(
            reaction_required,
            &json!(["title", "likelyResponse", "schoolRisk", "legalReference"])
        );
    }

    #[test]
    fn test_non_object_candidate() {
        let err = ReportContract::validate_steps(&json!([1, 2])).unwrap_err();
        assert_eq!(err.reason, ViolationReason::NotAnObject);
        assert_eq!(err.step, None);
    }
}
