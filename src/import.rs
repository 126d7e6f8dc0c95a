//! Flashcard and note sets produced by the content generator.
//!
//! The generator answers with `{"header": "...", "flashcards": [...]}` or
//! `{"header": "...", "notes": [...]}`. We only parse and check those
//! payloads here; storing them is `Database::import_set` / `import_notes`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedSet {
    /// Title in the form "BroadTopic: SpecificConcept".
    pub header: String,
    pub flashcards: Vec<GeneratedCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedCard {
    pub front: String,
    pub back: String,
    /// Excerpt of the source material the card came from.
    #[serde(default)]
    pub data: Option<String>,
}

pub fn parse_set(json: &str) -> Result<GeneratedSet> {
    let set: GeneratedSet = serde_json::from_str(strip_code_fence(json))?;

    if set.header.trim().is_empty() {
        return Err(Error::InvalidInput("flashcard set has an empty header".into()));
    }
    if set.flashcards.is_empty() {
        return Err(Error::InvalidInput("flashcard set contains no cards".into()));
    }
    if let Some(i) = set
        .flashcards
        .iter()
        .position(|c| c.front.trim().is_empty() || c.back.trim().is_empty())
    {
        return Err(Error::InvalidInput(format!(
            "flashcard {} has an empty front or back",
            i + 1
        )));
    }

    debug!(header = %set.header, cards = set.flashcards.len(), "parsed flashcard set");
    Ok(set)
}

pub fn load_set<P: AsRef<Path>>(path: P) -> Result<GeneratedSet> {
    let contents = fs::read_to_string(path)?;
    parse_set(&contents)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedNotes {
    pub header: String,
    pub notes: Vec<GeneratedNote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedNote {
    /// Markdown heading.
    pub title: String,
    /// Markdown body.
    pub content: String,
    #[serde(default)]
    pub data: Option<String>,
}

pub fn parse_notes(json: &str) -> Result<GeneratedNotes> {
    let set: GeneratedNotes = serde_json::from_str(strip_code_fence(json))?;

    if set.header.trim().is_empty() {
        return Err(Error::InvalidInput("note set has an empty header".into()));
    }
    if set.notes.is_empty() {
        return Err(Error::InvalidInput("note set contains no notes".into()));
    }
    if let Some(i) = set.notes.iter().position(|n| n.title.trim().is_empty()) {
        return Err(Error::InvalidInput(format!("note {} has an empty title", i + 1)));
    }

    debug!(header = %set.header, notes = set.notes.len(), "parsed note set");
    Ok(set)
}

pub fn load_notes<P: AsRef<Path>>(path: P) -> Result<GeneratedNotes> {
    let contents = fs::read_to_string(path)?;
    parse_notes(&contents)
}

// Model output is often wrapped in a ```json fence
fn strip_code_fence(s: &str) -> &str {
    let trimmed = s.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}
