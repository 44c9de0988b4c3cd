//! Reference corpus: ordered handbook sections quoted into every prompt.

use serde::Deserialize;
use shield_shared::error::{ShieldError, ShieldResult};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusSection {
    pub title: String,
    pub text: String,
}

/// Read-only, ordered mapping of section title to full text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCorpus {
    sections: Vec<CorpusSection>,
}

#[derive(Deserialize)]
struct CorpusFile {
    #[serde(default)]
    section: Vec<RawSection>,
}

#[derive(Deserialize)]
struct RawSection {
    title: String,
    text: String,
}

impl ReferenceCorpus {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from (title, text) pairs, keeping their order
    pub fn from_sections<I, T, U>(sections: I) -> ShieldResult<Self>
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<String>,
    {
        let mut out: Vec<CorpusSection> = Vec::new();
        for (title, text) in sections {
            let title = title.into().trim().to_string();
            if title.is_empty() {
                return Err(ShieldError::Input(
                    "corpus section title must not be blank".to_string(),
                ));
            }
            if out.iter().any(|s| s.title == title) {
                return Err(ShieldError::Input(format!(
                    "duplicate corpus section '{}'",
                    title
                )));
            }
            out.push(CorpusSection {
                title,
                text: text.into(),
            });
        }
        Ok(Self { sections: out })
    }

    /// Parse `[[section]]` tables with `title` and `text`
    pub fn from_toml(contents: &str) -> ShieldResult<Self> {
        let file: CorpusFile = toml::from_str(contents)
            .map_err(|e| ShieldError::Input(format!("invalid corpus file: {}", e)))?;
        Self::from_sections(file.section.into_iter().map(|s| (s.title, s.text)))
    }

    pub fn load(path: &Path) -> ShieldResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ShieldError::Input(format!("cannot read corpus {}: {}", path.display(), e))
        })?;
        let corpus = Self::from_toml(&contents)?;
        tracing::debug!(
            "Loaded {} corpus sections from {}",
            corpus.len(),
            path.display()
        );
        Ok(corpus)
    }

    pub fn sections(&self) -> &[CorpusSection] {
        &self.sections
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
