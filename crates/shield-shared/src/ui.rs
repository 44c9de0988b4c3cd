//! Terminal output for display trees and status lines.

use crate::render::{DisplayNode, DisplayTree, Span};

/// ANSI color codes using true color (24-bit)
pub mod colors {
    pub const HEADER: &str = "\x1b[38;2;255;210;120m";
    pub const OK: &str = "\x1b[38;2;120;255;120m";
    pub const ERR: &str = "\x1b[38;2;255;100;100m";
    pub const DIM: &str = "\x1b[38;2;140;140;140m";
    pub const CYAN: &str = "\x1b[38;2;100;200;255m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

pub mod symbols {
    pub const OK: &str = "✓";
    pub const ERR: &str = "✗";
    pub const EXPANDED: &str = "▼";
    pub const BULLET: &str = "›";
}

/// Horizontal rule
pub const HR: &str =
    "──────────────────────────────────────────────────────────────────────────────";

/// Color palette, or nothing when output is not a terminal
#[derive(Debug, Clone, Copy)]
struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", code, text, colors::RESET)
        } else {
            text.to_string()
        }
    }
}

/// Print a styled header with version
pub fn print_header(name: &str, version: &str) {
    println!();
    println!("{}{} v{}{}", colors::HEADER, name, version, colors::RESET);
    println!("{}{}{}", colors::DIM, HR, colors::RESET);
}

pub fn print_ok(message: &str) {
    println!("  {}{}{} {}", colors::OK, symbols::OK, colors::RESET, message);
}

pub fn print_err(message: &str) {
    eprintln!("  {}{}{} {}", colors::ERR, symbols::ERR, colors::RESET, message);
}

/// Print a key-value pair with alignment
pub fn print_kv(key: &str, value: &str, key_width: usize) {
    println!("  {:width$} {}", key, value, width = key_width);
}

/// Lay out a display tree as indented terminal text
pub fn format_tree(tree: &DisplayTree, color: bool) -> String {
    let palette = Palette { enabled: color };
    let mut lines = Vec::new();
    for node in tree.nodes() {
        format_node(node, 0, palette, &mut lines);
    }
    lines.join("\n")
}

fn format_spans(spans: &[Span], palette: Palette) -> String {
    spans
        .iter()
        .map(|span| match span {
            Span::Plain(t) => t.clone(),
            Span::Emphasis(t) => palette.paint(colors::BOLD, t),
        })
        .collect()
}

fn format_node(node: &DisplayNode, depth: usize, palette: Palette, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match node {
        DisplayNode::Heading { text } => {
            lines.push(format!("{}{}", indent, palette.paint(colors::HEADER, text)));
        }
        DisplayNode::Line { spans } => {
            lines.push(format!("{}{}", indent, format_spans(spans, palette)));
        }
        DisplayNode::Field { label, value } => {
            lines.push(format!(
                "{}{} {}",
                indent,
                palette.paint(colors::BOLD, &format!("{}:", label)),
                value
            ));
        }
        DisplayNode::Quote { label, text } => {
            lines.push(format!(
                "{}{} {}",
                indent,
                palette.paint(colors::BOLD, &format!("{}:", label)),
                palette.paint(colors::DIM, &format!("\"{}\"", text))
            ));
        }
        DisplayNode::Collapsible { title, children } => {
            lines.push(format!(
                "{}{} {}",
                indent,
                symbols::EXPANDED,
                palette.paint(colors::CYAN, title)
            ));
            for child in children {
                format_node(child, depth + 1, palette, lines);
            }
        }
        DisplayNode::Divider => {
            lines.push(format!("{}{}", indent, palette.paint(colors::DIM, "────")));
        }
        DisplayNode::Message { text } => {
            lines.push(format!("{}{}", indent, palette.paint(colors::ERR, text)));
        }
        DisplayNode::Section { heading, children } => {
            lines.push(String::new());
            lines.push(format!(
                "{}{}",
                indent,
                palette.paint(colors::HEADER, heading)
            ));
            for child in children {
                format_node(child, depth + 1, palette, lines);
            }
        }
    }
}

/// Format milliseconds as "1.2s" or "850ms"
pub fn format_elapsed_ms(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}
