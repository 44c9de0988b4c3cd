//! Turns content models into a display tree.
//!
//! Rendering is total: every [`ContentModel`] value, including hand-built
//! ones that never went through the contract, yields a non-empty tree.

use crate::report::{format_report_date, ContentModel, Step, StructuredReport};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*.*?\*\*").unwrap());

/// Heading of the implementation steps list under a recommendation
pub const IMPLEMENTATION_HEADING: &str = "Implementation Steps:";

/// Heading of the issue section in a full report view
pub const ISSUE_HEADING: &str = "Initial Complaint / Issue";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Span {
    Plain(String),
    Emphasis(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Plain(t) | Span::Emphasis(t) => t,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum DisplayNode {
    Heading { text: String },
    Line { spans: Vec<Span> },
    /// Labelled value inside an option; rendered without emphasis parsing
    Field { label: String, value: String },
    /// Suggested language, shown as a quotation
    Quote { label: String, text: String },
    /// Option block, collapsed until the reader expands it
    Collapsible { title: String, children: Vec<DisplayNode> },
    Divider,
    /// Error text occupying a step slot
    Message { text: String },
    /// Titled step or report section
    Section { heading: String, children: Vec<DisplayNode> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayTree {
    nodes: Vec<DisplayNode>,
}

impl DisplayTree {
    fn from_nodes(mut nodes: Vec<DisplayNode>) -> Self {
        if nodes.is_empty() {
            nodes.push(DisplayNode::Line { spans: Vec::new() });
        }
        Self { nodes }
    }

    pub fn nodes(&self) -> &[DisplayNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<DisplayNode> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Concatenated text of every node, depth first
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            collect_text(node, &mut out);
        }
        out
    }
}

impl From<Vec<DisplayNode>> for DisplayTree {
    fn from(nodes: Vec<DisplayNode>) -> Self {
        Self::from_nodes(nodes)
    }
}

fn push_line(out: &mut String, s: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(s);
}

fn collect_text(node: &DisplayNode, out: &mut String) {
    match node {
        DisplayNode::Heading { text } | DisplayNode::Message { text } => push_line(out, text),
        DisplayNode::Line { spans } => {
            let line: String = spans.iter().map(Span::text).collect();
            push_line(out, &line);
        }
        DisplayNode::Field { label, value } => push_line(out, &format!("{}: {}", label, value)),
        DisplayNode::Quote { label, text } => {
            push_line(out, &format!("{}: \"{}\"", label, text))
        }
        DisplayNode::Divider => {}
        DisplayNode::Collapsible { title, children }
        | DisplayNode::Section {
            heading: title,
            children,
        } => {
            push_line(out, title);
            for child in children {
                collect_text(child, out);
            }
        }
    }
}

/// Split `**bold**` runs out of text. Unmatched markers stay literal.
pub fn parse_bold(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for m in BOLD_RE.find_iter(text) {
        if m.start() > last {
            spans.push(Span::Plain(text[last..m.start()].to_string()));
        }
        let inner = &m.as_str()[2..m.as_str().len() - 2];
        spans.push(Span::Emphasis(inner.to_string()));
        last = m.end();
    }
    if last < text.len() {
        spans.push(Span::Plain(text[last..].to_string()));
    }
    spans
}

/// `riskScore` becomes `Risk Score`
pub fn humanize_field_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
        } else {
            if c.is_ascii_uppercase() {
                out.push(' ');
            }
            out.push(c);
        }
    }
    out
}

fn text_lines(text: &str) -> Vec<DisplayNode> {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| DisplayNode::Line {
            spans: parse_bold(line),
        })
        .collect()
}

/// Render one content model
pub fn render(content: &ContentModel) -> DisplayTree {
    let nodes = match content {
        ContentModel::KeyValueList(entries) => entries
            .iter()
            .map(|entry| {
                let mut spans = vec![Span::Emphasis(entry.header.clone()), Span::Plain(" ".into())];
                spans.extend(parse_bold(&entry.text));
                DisplayNode::Line { spans }
            })
            .collect(),
        ContentModel::OptionSet(set) => set
            .iter()
            .map(|(key, detail)| {
                let children = detail
                    .fields()
                    .iter()
                    .map(|(field, value)| {
                        let label = humanize_field_name(field.wire_key());
                        if *field == crate::report::OptionField::SuggestedLanguage {
                            DisplayNode::Quote {
                                label,
                                text: value.clone(),
                            }
                        } else {
                            DisplayNode::Field {
                                label,
                                value: value.clone(),
                            }
                        }
                    })
                    .collect();
                let title = if detail.title().trim().is_empty() {
                    key.wire_key()
                } else {
                    detail.title()
                };
                DisplayNode::Collapsible {
                    title: title.to_string(),
                    children,
                }
            })
            .collect(),
        ContentModel::RecommendationBlock(block) => {
            let mut nodes = text_lines(&block.summary);
            nodes.push(DisplayNode::Divider);
            nodes.push(DisplayNode::Heading {
                text: IMPLEMENTATION_HEADING.to_string(),
            });
            nodes.extend(block.implementation_steps.iter().map(|s| DisplayNode::Line {
                spans: parse_bold(s),
            }));
            nodes
        }
        ContentModel::PlainText(text) => text_lines(text),
        ContentModel::Error(message) => vec![DisplayNode::Message {
            text: message.clone(),
        }],
    };
    DisplayTree::from_nodes(nodes)
}

/// Heading used for a step slot, e.g. "Step 4: Administrator Response Options"
pub fn step_heading(index: u8, title: &str) -> String {
    format!("Step {}: {}", index, title)
}

/// Render a titled slot; also used for the error slot of a failed session
pub fn render_slot(index: u8, title: &str, content: &ContentModel) -> DisplayNode {
    DisplayNode::Section {
        heading: step_heading(index, title),
        children: render(content).into_nodes(),
    }
}

pub fn render_step(step: &Step) -> DisplayNode {
    render_slot(step.index(), step.title(), step.content())
}

/// Archive view: title, date, issue text, then all six steps
pub fn render_report(report: &StructuredReport) -> DisplayTree {
    let mut nodes = vec![
        DisplayNode::Heading {
            text: report.title().to_string(),
        },
        DisplayNode::Line {
            spans: vec![
                Span::Emphasis("Date Generated:".into()),
                Span::Plain(format!(" {}", format_report_date(report.created_at()))),
            ],
        },
        DisplayNode::Section {
            heading: ISSUE_HEADING.to_string(),
            children: vec![DisplayNode::Line {
                spans: vec![Span::Plain(report.issue_text().to_string())],
            }],
        },
    ];
    nodes.extend(report.steps().iter().map(render_step));
    DisplayTree::from_nodes(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bold_mixed() {
        assert_eq!(
            parse_bold("**Why:** it is clear"),
            vec![
                Span::Emphasis("Why:".into()),
                Span::Plain(" it is clear".into())
            ]
        );
    }

    #[test]
    fn test_parse_bold_unmatched_marker_is_literal() {
        assert_eq!(
            parse_bold("a **dangling marker"),
            vec![Span::Plain("a **dangling marker".into())]
        );
    }

    #[test]
    fn test_parse_bold_does_not_span_lines() {
        let spans = parse_bold("**open\nclose**");
        assert_eq!(spans, vec![Span::Plain("**open\nclose**".into())]);
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize_field_name("riskScore"), "Risk Score");
        assert_eq!(humanize_field_name("suggestedLanguage"), "Suggested Language");
        assert_eq!(humanize_field_name("recommendation"), "Recommendation");
        assert_eq!(humanize_field_name(""), "");
    }

    #[test]
    fn test_error_renders_single_message() {
        let tree = render(&ContentModel::Error("boom".into()));
        assert_eq!(
            tree.nodes(),
            &[DisplayNode::Message {
                text: "boom".into()
            }]
        );
    }

    #[test]
    fn test_blank_plain_text_still_renders() {
        let tree = render(&ContentModel::PlainText("  \n ".into()));
        assert_eq!(tree.len(), 1);
    }
}
