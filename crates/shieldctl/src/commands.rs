//! Command handlers for shieldctl.

use anyhow::{Context, Result};
use shield_common::config::ShieldConfig;
use shield_common::corpus::ReferenceCorpus;
use shield_common::generation_client::{
    FakeGenerationClient, GenerationClient, HttpGenerationClient,
};
use shield_common::prompts::PromptBuilder;
use shield_common::report_store::ReportStore;
use shield_common::reveal::SystemClock;
use shield_common::session::{Resolution, Session, SessionContext, SessionState};
use shield_shared::contract::ReportContract;
use shield_shared::render::render_report;
use shield_shared::ui;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::display;

pub struct AnalyzeOptions {
    pub corpus: Option<PathBuf>,
    pub offline: Option<PathBuf>,
    pub archive: bool,
    pub open_all: bool,
}

fn operator_name() -> String {
    std::env::var("USER").unwrap_or_else(|_| "operator".to_string())
}

/// Corpus from the flag, then the config file, else empty
fn load_corpus(config: &ShieldConfig, flag: Option<PathBuf>) -> Result<ReferenceCorpus> {
    match flag.or_else(|| config.corpus.path.clone()) {
        Some(path) => Ok(ReferenceCorpus::load(&path)?),
        None => {
            warn!("No reference corpus configured; the analysis will not cite handbook sections");
            Ok(ReferenceCorpus::empty())
        }
    }
}

fn open_store(config: &ShieldConfig) -> Result<ReportStore> {
    let path = config.store.resolved_path();
    let store = ReportStore::open(&path)?;
    let seeded = store.seed_scenarios()?;
    if seeded > 0 {
        info!("Seeded {} scenario reports into {}", seeded, path.display());
    }
    Ok(store)
}

fn new_session(config: &ShieldConfig, corpus: ReferenceCorpus) -> Session {
    let ctx = SessionContext::new(
        operator_name(),
        Arc::new(corpus),
        config.generation.clone(),
        config.reveal.delay(),
    );
    Session::new(ctx, Arc::new(SystemClock))
}

/// Reveal steps one at a time, each after its delay
async fn reveal_progressively(session: &mut Session) -> Result<()> {
    for slot in session.slots() {
        let state = session.toggle_step(slot.index)?;
        display::print_slot_status(&slot, state);
        if let Some(wait) = session.reveal().remaining(slot.index)? {
            tokio::time::sleep(wait).await;
        }
        session.reveal_mut().tick();
        display::print_slot(&slot);
        display::print_rule();
    }
    Ok(())
}

pub async fn analyze(config_path: Option<&Path>, issue: &str, opts: AnalyzeOptions) -> Result<()> {
    let config = ShieldConfig::load(config_path)?;
    let corpus = load_corpus(&config, opts.corpus)?;
    let mut session = new_session(&config, corpus);

    let client: Box<dyn GenerationClient> = match &opts.offline {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Box::new(FakeGenerationClient::always(raw))
        }
        None => Box::new(HttpGenerationClient::new(config.generation.clone())?),
    };

    let ticket = session.begin_submit(issue)?;
    let spinner = display::generation_spinner(&format!("Analyzing via {}...", client.name()));
    let outcome = ticket.run(client.as_ref()).await;
    spinner.finish_and_clear();

    if session.resolve(outcome) == Resolution::Superseded {
        anyhow::bail!("generation result was superseded");
    }

    match session.state() {
        SessionState::Failed { error, .. } => {
            let kind = error.kind();
            display::print_failure(&error.user_message());
            for slot in session.slots() {
                display::print_slot(&slot);
            }
            anyhow::bail!("generation failed ({})", kind);
        }
        SessionState::Complete(report) => {
            if opts.archive {
                let store = open_store(&config)?;
                let id = store.append(report)?;
                ui::print_ok(&format!("Archived as {}", id));
            }
        }
        _ => {}
    }

    if opts.open_all {
        session.reveal_mut().open_all();
        for slot in session.slots() {
            display::print_slot(&slot);
        }
    } else {
        reveal_progressively(&mut session).await?;
    }
    Ok(())
}

pub fn scenario(config_path: Option<&Path>, key: &str, archive: bool) -> Result<()> {
    let config = ShieldConfig::load(config_path)?;
    let mut session = new_session(&config, ReferenceCorpus::empty());
    let report = session.select_scenario(key)?.clone();

    ui::print_header(report.title(), shield_shared::VERSION);
    for slot in session.slots() {
        display::print_slot(&slot);
    }

    if archive {
        let store = open_store(&config)?;
        let id = store.append(&report)?;
        ui::print_ok(&format!("Archived as {}", id));
    }
    Ok(())
}

pub fn reports_list(config_path: Option<&Path>) -> Result<()> {
    let config = ShieldConfig::load(config_path)?;
    let store = open_store(&config)?;
    display::print_archive(&store.list()?);
    Ok(())
}

pub fn reports_show(config_path: Option<&Path>, id: &str) -> Result<()> {
    let config = ShieldConfig::load(config_path)?;
    let store = open_store(&config)?;
    let report = store.get(id)?;
    display::print_tree(&render_report(&report));
    Ok(())
}

pub fn schema() -> Result<()> {
    let schema = ReportContract::schema_descriptor();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

pub fn prompt(config_path: Option<&Path>, issue: &str, corpus: Option<PathBuf>) -> Result<()> {
    if issue.trim().is_empty() {
        anyhow::bail!("issue text must not be blank");
    }
    let config = ShieldConfig::load(config_path)?;
    let corpus = load_corpus(&config, corpus)?;
    println!("{}", PromptBuilder::build(issue, &corpus));
    Ok(())
}
