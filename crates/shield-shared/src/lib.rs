//! Shared types for Shield: the six-step report model, its contract,
//! rendering and the canned scenarios. No I/O lives here.

pub mod contract;
pub mod error;
pub mod render;
pub mod report;
pub mod scenarios;
pub mod ui;

pub use contract::{ReportContract, SchemaViolation, ViolationReason, STEP_TITLES};
pub use error::{ErrorKind, ShieldError, ShieldResult};
pub use render::{render, render_report, render_step, DisplayNode, DisplayTree, Span};
pub use report::{
    ArchiveSummary, ContentModel, KeyValueEntry, OptionDetail, OptionField, OptionKey, OptionSet,
    OptionSetKind, RecommendationBlock, ReportMeta, Step, StructuredReport, STEP_COUNT,
};
pub use scenarios::ScenarioKey;

/// Version of the shared crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
