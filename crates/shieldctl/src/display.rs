//! Terminal presentation for shieldctl.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use shield_common::reveal::RevealState;
use shield_common::session::DisplaySlot;
use shield_shared::render::{step_heading, DisplayTree};
use shield_shared::report::ArchiveSummary;
use shield_shared::ui::{self, HR};
use std::io::{self, IsTerminal};
use std::time::Duration;

pub fn use_color() -> bool {
    io::stdout().is_terminal()
}

/// Spinner shown while the generation service works
pub fn generation_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = if use_color() {
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
    } else {
        ProgressStyle::default_spinner()
            .tick_strings(&["-", "\\", "|", "/"])
            .template("{spinner} {msg}")
    };
    if let Ok(style) = style {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn print_tree(tree: &DisplayTree) {
    println!("{}", ui::format_tree(tree, use_color()));
}

/// Step heading with its reveal label, e.g. "Step 2: Match Handbook & Policies [Analyzing...]"
pub fn print_slot_status(slot: &DisplaySlot, state: RevealState) {
    let heading = step_heading(slot.index, &slot.title);
    let label = format!("[{}]", state.label());
    if use_color() {
        println!("{} {}", heading.bold(), label.dimmed());
    } else {
        println!("{} {}", heading, label);
    }
}

pub fn print_slot(slot: &DisplaySlot) {
    let tree = DisplayTree::from(vec![slot.render()]);
    print_tree(&tree);
}

pub fn print_archive(rows: &[ArchiveSummary]) {
    if rows.is_empty() {
        println!("No archived reports.");
        return;
    }
    let id_width = rows.iter().map(|r| r.id.len()).max().unwrap_or(0);
    for row in rows {
        let date = row.date_label();
        if use_color() {
            println!(
                "  {:width$}  {:18}  {}",
                row.id.cyan(),
                date.dimmed(),
                row.title,
                width = id_width
            );
        } else {
            println!("  {:width$}  {:18}  {}", row.id, date, row.title, width = id_width);
        }
    }
}

pub fn print_rule() {
    if use_color() {
        println!("{}", HR.dimmed());
    } else {
        println!("{}", HR);
    }
}

pub fn print_failure(message: &str) {
    if use_color() {
        eprintln!("{} {}", "error:".red().bold(), message);
    } else {
        eprintln!("error: {}", message);
    }
}
