//! Recommendation-block parser: turns a five-section intelligence report
//! into an ordered list of typed recommendation records.
//!
//! Three-stage pipeline: section isolation → block segmentation → per-block
//! field extraction. Every stage is an explicit find-based scan; terminator
//! precedence and minimal matching are stated policy, not pattern side
//! effects.

pub mod blocks;
pub mod extract;
pub mod section;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use extract::BlockOutcome;

/// Recommendation priority. The report writes HIGH/MEDIUM/LOW; a missing or
/// unrecognized value falls back to Medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }

    /// Exact token match, any case ("high" → High). `None` for anything
    /// outside the three-value vocabulary.
    pub fn from_token(token: &str) -> Option<Self> {
        [Priority::High, Priority::Medium, Priority::Low]
            .into_iter()
            .find(|p| token.eq_ignore_ascii_case(p.as_str()))
    }
}

/// One parsed decision recommendation.
///
/// `statement` is the only mandatory field; blocks without one never become
/// records. `status` is kept verbatim (the report writes variants like
/// "BLOCKED – INSUFFICIENT DATA"), `facts` and `sources` default to empty
/// strings when their labels are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub priority: Priority,
    pub statement: String,
    pub status: String,
    pub facts: String,
    pub sources: String,
}

impl Recommendation {
    /// Card marker keyed on status substring, most decisive wins:
    /// APPROVED, then BLOCKED, then INSUFFICIENT, then unknown.
    pub fn status_icon(&self) -> char {
        if self.status.contains("APPROVED") {
            '✓'
        } else if self.status.contains("BLOCKED") {
            '✗'
        } else if self.status.contains("INSUFFICIENT") {
            '!'
        } else {
            '?'
        }
    }
}

/// Parse every recommendation out of a report.
///
/// Pure and deterministic. Structural absence is never an error: a missing
/// section, missing labels or malformed blocks narrow the result toward an
/// empty Vec. Output order follows block order in the source text.
pub fn parse(document: &str) -> Vec<Recommendation> {
    let Some(section) = section::recommendations_section(document) else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for block in blocks::candidate_blocks(section) {
        match extract::extract_block(block) {
            BlockOutcome::Record(rec) => records.push(rec),
            BlockOutcome::Skip { id } => {
                debug!("Dropping block {}: no decision statement", id);
            }
        }
    }
    records
}

// ── Tests ──
