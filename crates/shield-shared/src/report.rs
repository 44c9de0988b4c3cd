//! Six-step incident report model.
//!
//! A [`StructuredReport`] can only be obtained through the report contract
//! (see [`crate::contract`]), so every value of this type is valid and
//! immutable. Content shapes are an explicit tagged enum; nothing downstream
//! inspects raw JSON to decide how a step looks.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Number of steps in every report
pub const STEP_COUNT: u8 = 6;

/// Longest title derived from free-text issue descriptions
pub const MAX_DERIVED_TITLE_CHARS: usize = 80;

/// Wire key for step `index` ("step1" .. "step6")
pub fn step_key(index: u8) -> String {
    format!("step{}", index)
}

/// One of the three compared options in steps 4 and 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionKey {
    A,
    B,
    C,
}

impl OptionKey {
    /// Fixed display and wire order
    pub const ALL: [OptionKey; 3] = [OptionKey::A, OptionKey::B, OptionKey::C];

    pub fn wire_key(&self) -> &'static str {
        match self {
            OptionKey::A => "optionA",
            OptionKey::B => "optionB",
            OptionKey::C => "optionC",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OptionKey::A => "Option A",
            OptionKey::B => "Option B",
            OptionKey::C => "Option C",
        }
    }
}

/// Named string field of an [`OptionDetail`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionField {
    SuggestedLanguage,
    PolicyMatch,
    RiskScore,
    LegalReference,
    Recommendation,
    LikelyResponse,
    SchoolRisk,
}

impl OptionField {
    pub fn wire_key(&self) -> &'static str {
        match self {
            OptionField::SuggestedLanguage => "suggestedLanguage",
            OptionField::PolicyMatch => "policyMatch",
            OptionField::RiskScore => "riskScore",
            OptionField::LegalReference => "legalReference",
            OptionField::Recommendation => "recommendation",
            OptionField::LikelyResponse => "likelyResponse",
            OptionField::SchoolRisk => "schoolRisk",
        }
    }

    pub fn from_wire_key(key: &str) -> Option<Self> {
        match key {
            "suggestedLanguage" => Some(OptionField::SuggestedLanguage),
            "policyMatch" => Some(OptionField::PolicyMatch),
            "riskScore" => Some(OptionField::RiskScore),
            "legalReference" => Some(OptionField::LegalReference),
            "recommendation" => Some(OptionField::Recommendation),
            "likelyResponse" => Some(OptionField::LikelyResponse),
            "schoolRisk" => Some(OptionField::SchoolRisk),
            _ => None,
        }
    }
}

/// Which of the two option comparisons a set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionSetKind {
    /// Step 4: administrator response options
    ResponseOptions,
    /// Step 5: projected complainant reactions
    ProjectedReactions,
}

const RESPONSE_FIELDS: [OptionField; 5] = [
    OptionField::SuggestedLanguage,
    OptionField::PolicyMatch,
    OptionField::RiskScore,
    OptionField::LegalReference,
    OptionField::Recommendation,
];

const REACTION_FIELDS: [OptionField; 3] = [
    OptionField::LikelyResponse,
    OptionField::SchoolRisk,
    OptionField::LegalReference,
];

impl OptionSetKind {
    /// Required fields, in display order
    pub fn fields(&self) -> &'static [OptionField] {
        match self {
            OptionSetKind::ResponseOptions => &RESPONSE_FIELDS,
            OptionSetKind::ProjectedReactions => &REACTION_FIELDS,
        }
    }

    pub fn for_step(index: u8) -> Option<Self> {
        match index {
            4 => Some(OptionSetKind::ResponseOptions),
            5 => Some(OptionSetKind::ProjectedReactions),
            _ => None,
        }
    }

    pub fn step_index(&self) -> u8 {
        match self {
            OptionSetKind::ResponseOptions => 4,
            OptionSetKind::ProjectedReactions => 5,
        }
    }
}

/// `{header, text}` line used by steps 1-3
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueEntry {
    pub header: String,
    pub text: String,
}

impl KeyValueEntry {
    pub fn new(header: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            text: text.into(),
        }
    }
}

/// One option of a three-way comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDetail {
    title: String,
    fields: Vec<(OptionField, String)>,
}

impl OptionDetail {
    pub fn new(title: impl Into<String>, fields: Vec<(OptionField, String)>) -> Self {
        Self {
            title: title.into(),
            fields,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn get(&self, field: OptionField) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Fields in the order they were supplied
    pub fn fields(&self) -> &[(OptionField, String)] {
        &self.fields
    }

    fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("title".to_string(), Value::String(self.title.clone()));
        for (field, value) in &self.fields {
            map.insert(field.wire_key().to_string(), Value::String(value.clone()));
        }
        Value::Object(map)
    }
}

/// Exactly three options, always A, B, C
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    kind: OptionSetKind,
    options: [OptionDetail; 3],
}

impl OptionSet {
    pub fn new(kind: OptionSetKind, a: OptionDetail, b: OptionDetail, c: OptionDetail) -> Self {
        Self {
            kind,
            options: [a, b, c],
        }
    }

    pub fn kind(&self) -> OptionSetKind {
        self.kind
    }

    pub fn option(&self, key: OptionKey) -> &OptionDetail {
        match key {
            OptionKey::A => &self.options[0],
            OptionKey::B => &self.options[1],
            OptionKey::C => &self.options[2],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionKey, &OptionDetail)> {
        OptionKey::ALL.into_iter().zip(self.options.iter())
    }

    fn to_wire(&self) -> Value {
        let mut map = Map::new();
        for (key, detail) in self.iter() {
            map.insert(key.wire_key().to_string(), detail.to_wire());
        }
        Value::Object(map)
    }
}

/// Step 6 body: summary plus ordered implementation steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationBlock {
    pub summary: String,
    pub implementation_steps: Vec<String>,
}

/// Tagged body of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentModel {
    KeyValueList(Vec<KeyValueEntry>),
    OptionSet(OptionSet),
    RecommendationBlock(RecommendationBlock),
    PlainText(String),
    /// Failed generation, shown in place of the report
    Error(String),
}

impl ContentModel {
    pub fn variant_name(&self) -> &'static str {
        match self {
            ContentModel::KeyValueList(_) => "KeyValueList",
            ContentModel::OptionSet(_) => "OptionSet",
            ContentModel::RecommendationBlock(_) => "RecommendationBlock",
            ContentModel::PlainText(_) => "PlainText",
            ContentModel::Error(_) => "Error",
        }
    }

    /// JSON shape exchanged with the generation service and the archive
    pub fn to_wire(&self) -> Value {
        match self {
            ContentModel::KeyValueList(entries) => Value::Array(
                entries
                    .iter()
                    .map(|e| json!({ "header": e.header, "text": e.text }))
                    .collect(),
            ),
            ContentModel::OptionSet(set) => set.to_wire(),
            ContentModel::RecommendationBlock(block) => json!({
                "recommendationSummary": block.summary,
                "implementationSteps": block.implementation_steps,
            }),
            ContentModel::PlainText(text) => Value::String(text.clone()),
            ContentModel::Error(message) => json!({ "error": message }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    index: u8,
    title: String,
    content: ContentModel,
}

impl Step {
    pub fn new(index: u8, title: impl Into<String>, content: ContentModel) -> Self {
        Self {
            index,
            title: title.into(),
            content,
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &ContentModel {
        &self.content
    }

    pub fn to_wire(&self) -> Value {
        json!({ "title": self.title, "content": self.content.to_wire() })
    }
}

/// Report metadata, supplied by whoever requested the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMeta {
    pub id: String,
    pub title: String,
    pub issue_text: String,
    pub created_at: DateTime<Utc>,
    pub scenario_key: Option<String>,
}

impl ReportMeta {
    /// Metadata for a live generation: fresh id, title derived from the issue
    pub fn for_issue(issue_text: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: derive_title(issue_text),
            issue_text: issue_text.trim().to_string(),
            created_at,
            scenario_key: None,
        }
    }
}

/// First line of the issue, shortened for archive listings
pub fn derive_title(issue_text: &str) -> String {
    let first_line = issue_text.trim().lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= MAX_DERIVED_TITLE_CHARS {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(MAX_DERIVED_TITLE_CHARS).collect();
    format!("{}...", cut.trim_end())
}

/// Validated six-step report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredReport {
    meta: ReportMeta,
    steps: Vec<Step>,
}

impl StructuredReport {
    /// Only the contract constructs reports, after checking every step
    pub(crate) fn from_validated(meta: ReportMeta, steps: Vec<Step>) -> Self {
        Self { meta, steps }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn title(&self) -> &str {
        &self.meta.title
    }

    pub fn issue_text(&self) -> &str {
        &self.meta.issue_text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.meta.created_at
    }

    pub fn scenario_key(&self) -> Option<&str> {
        self.meta.scenario_key.as_deref()
    }

    pub fn meta(&self) -> &ReportMeta {
        &self.meta
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: u8) -> Option<&Step> {
        self.steps.iter().find(|s| s.index == index)
    }

    pub fn summary(&self) -> ArchiveSummary {
        ArchiveSummary {
            id: self.meta.id.clone(),
            title: self.meta.title.clone(),
            date: self.meta.created_at,
        }
    }

    /// Serialized form: step keys plus metadata keys
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.meta.id.clone()));
        map.insert("title".to_string(), Value::String(self.meta.title.clone()));
        map.insert(
            "issueText".to_string(),
            Value::String(self.meta.issue_text.clone()),
        );
        map.insert(
            "createdAt".to_string(),
            Value::String(
                self.meta
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
        );
        if let Some(key) = &self.meta.scenario_key {
            map.insert("scenarioKey".to_string(), Value::String(key.clone()));
        }
        for step in &self.steps {
            map.insert(step_key(step.index), step.to_wire());
        }
        Value::Object(map)
    }
}

impl Serialize for StructuredReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Deserialization always goes through the contract
impl<'de> Deserialize<'de> for StructuredReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        crate::contract::ReportContract::validate(&value).map_err(serde::de::Error::custom)
    }
}

/// Archive listing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
}

impl ArchiveSummary {
    /// Long-form date, e.g. "August 12, 2025"
    pub fn date_label(&self) -> String {
        format_report_date(self.date)
    }
}

pub fn format_report_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}
