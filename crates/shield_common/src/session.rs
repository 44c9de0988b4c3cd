//! Session controller: submit, supersession, scenarios and reveal.
//!
//! A submit is split in three so the network call never holds the session:
//! [`Session::begin_submit`] moves to `Generating` and hands out a
//! [`GenerationTicket`], [`GenerationTicket::run`] performs the call with
//! timeout and retries, and [`Session::resolve`] applies the outcome only if
//! its token is still the current one. Last request wins, not last arrival.

use crate::config::GenerationSettings;
use crate::corpus::ReferenceCorpus;
use crate::generation_client::{GenerationClient, GenerationError, GenerationRequest};
use crate::prompts::PromptBuilder;
use crate::response_validator;
use crate::reveal::{Clock, RevealState, StepReveal};
use chrono::Utc;
use shield_shared::contract::ReportContract;
use shield_shared::error::{ShieldError, ShieldResult};
use shield_shared::render::{render_slot, DisplayNode};
use shield_shared::report::{ContentModel, ReportMeta, StructuredReport};
use shield_shared::scenarios::{self, ScenarioKey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Title of the slot that shows a failed generation
pub const ERROR_SLOT_TITLE: &str = "Error";

/// Everything a session needs from its surroundings
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub operator: String,
    pub corpus: Arc<ReferenceCorpus>,
    pub generation: GenerationSettings,
    pub reveal_delay: Duration,
}

impl SessionContext {
    pub fn new(
        operator: impl Into<String>,
        corpus: Arc<ReferenceCorpus>,
        generation: GenerationSettings,
        reveal_delay: Duration,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            operator: operator.into(),
            corpus,
            generation,
            reveal_delay,
        }
    }
}

/// Identifies one submit; later submits always carry larger tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Generating {
        token: RequestToken,
        issue_text: String,
    },
    Complete(StructuredReport),
    DemoComplete(StructuredReport),
    Failed {
        issue_text: String,
        error: ShieldError,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Generating { .. } => "generating",
            SessionState::Complete(_) => "complete",
            SessionState::DemoComplete(_) => "demo_complete",
            SessionState::Failed { .. } => "failed",
        }
    }
}

/// Whether a generation outcome was applied to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Superseded,
}

/// Result of one ticket run, tagged with the token that requested it
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub token: RequestToken,
    pub result: ShieldResult<StructuredReport>,
    pub attempts: u32,
}

/// Self-contained generation job; holds no reference to the session
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    token: RequestToken,
    request: GenerationRequest,
    meta: ReportMeta,
    settings: GenerationSettings,
}

impl GenerationTicket {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    /// Call the service, validate, retry network failures per the settings
    pub async fn run(self, client: &dyn GenerationClient) -> GenerationOutcome {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let timeout = self.settings.timeout();
            let result = match tokio::time::timeout(timeout, client.generate(&self.request)).await
            {
                Ok(Ok(raw)) => response_validator::validate(&raw, self.meta.clone()),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(GenerationError::Timeout(timeout).into()),
            };

            match result {
                Err(e) if e.is_retryable() && attempts <= self.settings.max_retries => {
                    let backoff = self.settings.backoff(attempts);
                    warn!(
                        "Generation attempt {} via {} failed ({}), retrying in {:?}",
                        attempts,
                        client.name(),
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                result => {
                    if let Err(e) = &result {
                        warn!("Generation request {} failed: {}", self.token.0, e);
                    }
                    return GenerationOutcome {
                        token: self.token,
                        result,
                        attempts,
                    };
                }
            }
        }
    }
}

/// One step slot as shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySlot {
    pub index: u8,
    pub title: String,
    pub content: ContentModel,
    pub reveal: RevealState,
}

impl DisplaySlot {
    pub fn render(&self) -> DisplayNode {
        render_slot(self.index, &self.title, &self.content)
    }
}

pub struct Session {
    ctx: SessionContext,
    state: SessionState,
    next_token: u64,
    current: Option<RequestToken>,
    reveal: StepReveal,
}

impl Session {
    pub fn new(ctx: SessionContext, clock: Arc<dyn Clock>) -> Self {
        let reveal = StepReveal::new(clock, ctx.reveal_delay);
        Self {
            ctx,
            state: SessionState::Idle,
            next_token: 0,
            current: None,
            reveal,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_token(&self) -> Option<RequestToken> {
        self.current
    }

    /// Report currently on display, live or canned
    pub fn report(&self) -> Option<&StructuredReport> {
        match &self.state {
            SessionState::Complete(r) | SessionState::DemoComplete(r) => Some(r),
            _ => None,
        }
    }

    fn transition(&mut self, next: SessionState) {
        info!(
            "Session {} ({}): {} -> {}",
            self.ctx.session_id,
            self.ctx.operator,
            self.state.name(),
            next.name()
        );
        self.state = next;
    }

    /// Start a generation. Blank input is rejected without touching state.
    pub fn begin_submit(&mut self, issue_text: &str) -> ShieldResult<GenerationTicket> {
        let issue = issue_text.trim();
        if issue.is_empty() {
            return Err(ShieldError::Input(
                "Describe the issue before analyzing.".to_string(),
            ));
        }

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        if let Some(previous) = self.current.replace(token) {
            debug!("Request {} superseded by {}", previous.0, token.0);
        }
        self.reveal.close_all();
        self.transition(SessionState::Generating {
            token,
            issue_text: issue.to_string(),
        });

        let instruction = PromptBuilder::build(issue, &self.ctx.corpus);
        debug!("Instruction for request {}: {} chars", token.0, instruction.text.len());
        let settings = &self.ctx.generation;
        Ok(GenerationTicket {
            token,
            request: GenerationRequest {
                instruction: instruction.text,
                schema: ReportContract::schema_descriptor(),
                temperature: settings.temperature,
            },
            meta: ReportMeta::for_issue(issue, Utc::now()),
            settings: settings.clone(),
        })
    }

    /// Apply an outcome if it belongs to the latest request
    pub fn resolve(&mut self, outcome: GenerationOutcome) -> Resolution {
        if self.current != Some(outcome.token) {
            debug!(
                "Discarding stale result for request {} (current: {:?})",
                outcome.token.0,
                self.current.map(|t| t.0)
            );
            return Resolution::Superseded;
        }
        self.current = None;

        let issue_text = match &self.state {
            SessionState::Generating { issue_text, .. } => issue_text.clone(),
            _ => String::new(),
        };
        self.reveal.close_all();
        match outcome.result {
            Ok(report) => self.transition(SessionState::Complete(report)),
            Err(error) => {
                // error slot opens at once
                self.reveal.open_now(1);
                self.transition(SessionState::Failed { issue_text, error });
            }
        }
        Resolution::Applied
    }

    /// begin_submit, run and resolve in one call
    pub async fn submit(
        &mut self,
        issue_text: &str,
        client: &dyn GenerationClient,
    ) -> ShieldResult<Resolution> {
        let ticket = self.begin_submit(issue_text)?;
        let outcome = ticket.run(client).await;
        Ok(self.resolve(outcome))
    }

    /// Show a canned report at once, abandoning any in-flight request
    pub fn select_scenario(&mut self, key: &str) -> ShieldResult<&StructuredReport> {
        let key: ScenarioKey = key.parse()?;
        let report = scenarios::load(key)?;
        if let Some(stale) = self.current.take() {
            debug!("Request {} abandoned for scenario {}", stale.0, key);
        }
        self.reveal.open_all();
        self.transition(SessionState::DemoComplete(report));
        match &self.state {
            SessionState::DemoComplete(r) => Ok(r),
            _ => Err(ShieldError::Internal(
                "scenario state was not applied".to_string(),
            )),
        }
    }

    /// Slots to display: six steps, a single error slot, or nothing
    pub fn slots(&self) -> Vec<DisplaySlot> {
        match &self.state {
            SessionState::Complete(report) | SessionState::DemoComplete(report) => report
                .steps()
                .iter()
                .map(|step| DisplaySlot {
                    index: step.index(),
                    title: step.title().to_string(),
                    content: step.content().clone(),
                    reveal: self
                        .reveal
                        .state(step.index())
                        .unwrap_or(RevealState::Closed),
                })
                .collect(),
            SessionState::Failed { error, .. } => vec![DisplaySlot {
                index: 1,
                title: ERROR_SLOT_TITLE.to_string(),
                content: ContentModel::Error(error.user_message()),
                reveal: self.reveal.state(1).unwrap_or(RevealState::Closed),
            }],
            SessionState::Idle | SessionState::Generating { .. } => Vec::new(),
        }
    }

    /// Toggle a step's reveal; only meaningful while something is displayed
    pub fn toggle_step(&mut self, index: u8) -> ShieldResult<RevealState> {
        let available = self.slots().iter().any(|s| s.index == index);
        if !available {
            return Err(ShieldError::Input(format!(
                "step {} is not on display",
                index
            )));
        }
        self.reveal.toggle(index)
    }

    pub fn reveal(&self) -> &StepReveal {
        &self.reveal
    }

    pub fn reveal_mut(&mut self) -> &mut StepReveal {
        &mut self.reveal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reveal::ManualClock;

    fn session() -> Session {
        let ctx = SessionContext::new(
            "tester",
            Arc::new(ReferenceCorpus::empty()),
            GenerationSettings::default(),
            Duration::from_millis(750),
        );
        Session::new(ctx, Arc::new(ManualClock::new()))
    }

    #[test]
    fn test_blank_submit_keeps_state() {
        let mut s = session();
        let err = s.begin_submit("   \n").unwrap_err();
        assert!(matches!(err, ShieldError::Input(_)));
        assert_eq!(s.state(), &SessionState::Idle);
        assert!(s.current_token().is_none());
    }

    #[test]
    fn test_tokens_increase() {
        let mut s = session();
        let a = s.begin_submit("first").unwrap().token();
        let b = s.begin_submit("second").unwrap().token();
        assert!(b > a);
        assert_eq!(s.current_token(), Some(b));
    }

    #[test]
    fn test_ticket_carries_schema_and_temperature() {
        let mut s = session();
        let ticket = s.begin_submit("Parent complaint").unwrap();
        assert_eq!(ticket.request().schema, ReportContract::schema_descriptor());
        assert!((ticket.request().temperature - 0.2).abs() < f32::EPSILON);
        assert!(ticket
            .request()
            .instruction
            .ends_with("User-Provided Scenario: \"Parent complaint\""));
    }

    #[test]
    fn test_unknown_scenario_is_not_found() {
        let mut s = session();
        let err = s.select_scenario("field-trip").unwrap_err();
        assert!(matches!(err, ShieldError::NotFound(_)));
        assert_eq!(s.state(), &SessionState::Idle);
    }

    #[test]
    fn test_scenario_opens_every_step() {
        let mut s = session();
        s.select_scenario("parent-complaint").unwrap();
        let slots = s.slots();
        assert_eq!(slots.len(), 6);
        assert!(slots.iter().all(|slot| slot.reveal == RevealState::Open));
    }

    #[test]
    fn test_toggle_without_display_is_rejected() {
        let mut s = session();
        assert!(s.toggle_step(1).is_err());
    }
}
