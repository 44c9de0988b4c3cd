//! Shield runtime: configuration, reference corpus, prompt building,
//! generation client, response validation, sessions and the report archive.

pub mod config;
pub mod corpus;
pub mod generation_client;
pub mod logging;
pub mod prompts;
pub mod report_store;
pub mod response_validator;
pub mod reveal;
pub mod session;

pub use config::{Backend, GenerationSettings, ShieldConfig};
pub use corpus::ReferenceCorpus;
pub use generation_client::{
    FakeGenerationClient, FakeResponse, GenerationClient, GenerationError, GenerationRequest,
    HttpGenerationClient,
};
pub use prompts::{Instruction, PromptBuilder};
pub use report_store::ReportStore;
pub use reveal::{Clock, ManualClock, RevealState, StepReveal, SystemClock};
pub use session::{
    GenerationOutcome, GenerationTicket, RequestToken, Resolution, Session, SessionContext,
    SessionState,
};
