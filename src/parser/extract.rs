//! Per-block field extraction.
//!
//! Each field is captured by an explicit scan: find the label, then cut the
//! value at the earliest following terminator. The terminator sets must stay
//! in sync with the label vocabulary; the id label is absent from every set
//! because segmentation already consumed it.

use super::{Priority, Recommendation};

/// Sentinel id for a block whose first line carries no text.
pub const UNKNOWN_ID: &str = "Unknown";

const PRIORITY_LABEL: &str = "- Priority:";
const STATEMENT_LABEL: &str = "- Decision Statement:";
const FACTS_LABEL: &str = "- Supporting Facts (Fact IDs):";
const SOURCES_LABEL: &str = "- Source(s):";
const STATUS_LABEL: &str = "- Status:";

// Terminators carry a leading newline so a label word inside a value line
// does not cut the capture short.
const STATEMENT_ENDS: &[&str] = &["\n- Supporting Facts", "\n- Source", "\n- Status"];
const FACTS_ENDS: &[&str] = &["\n- Source", "\n- Status"];
const SOURCES_ENDS: &[&str] = &["\n- Status"];
const STATUS_ENDS: &[&str] = &["\n"];

/// What became of one candidate block: either a full record, or a skip
/// (no usable decision statement) carrying the id for the caller to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Record(Recommendation),
    Skip { id: String },
}

/// Extract one recommendation from a candidate block. The decision statement
/// is the gate: without one the block is skipped. Every other field degrades
/// to its default.
pub fn extract_block(block: &str) -> BlockOutcome {
    let id = block_id(block);

    let statement = match capture(block, STATEMENT_LABEL, STATEMENT_ENDS) {
        Some(s) if !s.is_empty() => s,
        _ => return BlockOutcome::Skip { id },
    };

    BlockOutcome::Record(Recommendation {
        id,
        priority: scan_priority(block),
        statement,
        status: capture(block, STATUS_LABEL, STATUS_ENDS).unwrap_or_default(),
        facts: capture(block, FACTS_LABEL, FACTS_ENDS).unwrap_or_default(),
        sources: capture(block, SOURCES_LABEL, SOURCES_ENDS).unwrap_or_default(),
    })
}

/// The id is whatever the first line holds, trimmed. An empty first line
/// (value pushed to the next line, or nothing at all) gets the sentinel.
fn block_id(block: &str) -> String {
    let first_line = block.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        UNKNOWN_ID.to_string()
    } else {
        first_line.to_string()
    }
}

/// Capture the text between `label` and the earliest terminator in `ends`,
/// trimmed. `None` when the label is absent; `Some("")` when a terminator
/// sits right after the label.
fn capture(block: &str, label: &str, ends: &[&str]) -> Option<String> {
    let start = block.find(label)? + label.len();
    let rest = &block[start..];
    let end = ends
        .iter()
        .filter_map(|t| rest.find(t))
        .min()
        .unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

/// Scan successive priority label occurrences until one is followed by a
/// recognized value. The value match is a case-insensitive prefix, so
/// "HIGHEST" reads as High; whitespace after the label may span lines.
/// No valid occurrence means Medium.
fn scan_priority(block: &str) -> Priority {
    let mut from = 0;
    while let Some(pos) = block[from..].find(PRIORITY_LABEL) {
        let after = from + pos + PRIORITY_LABEL.len();
        let value = block[after..].trim_start();
        for priority in [Priority::High, Priority::Medium, Priority::Low] {
            if starts_with_ignore_case(value, priority.as_str()) {
                return priority;
            }
        }
        from = after;
    }
    Priority::default()
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unwrap a block that must produce a record.
    fn record(block: &str) -> Recommendation {
        match extract_block(block) {
            BlockOutcome::Record(rec) => rec,
            BlockOutcome::Skip { id } => panic!("block {} was skipped", id),
        }
    }

    #[test]
    fn full_block() {
        let rec = record(
            " R-001\n\
             - Priority: HIGH\n\
             - Decision Statement: Launch the pilot program.\n\
             - Supporting Facts (Fact IDs): F-001, F-003\n\
             - Source(s): Market Survey 2025\n\
             - Status: APPROVED\n",
        );
        assert_eq!(rec.id, "R-001");
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.statement, "Launch the pilot program.");
        assert_eq!(rec.facts, "F-001, F-003");
        assert_eq!(rec.sources, "Market Survey 2025");
        assert_eq!(rec.status, "APPROVED");
    }

    #[test]
    fn missing_statement_is_skip() {
        let outcome = extract_block(" R-002\n- Priority: LOW\n- Status: APPROVED\n");
        assert_eq!(outcome, BlockOutcome::Skip { id: "R-002".into() });
    }

    #[test]
    fn statement_terminated_immediately_is_skip() {
        let outcome = extract_block(" R-003\n- Decision Statement:\n- Status: APPROVED\n");
        assert_eq!(outcome, BlockOutcome::Skip { id: "R-003".into() });
    }

    #[test]
    fn whitespace_statement_is_skip() {
        let outcome = extract_block(" R-004\n- Decision Statement:   \t\n- Status: APPROVED\n");
        assert_eq!(outcome, BlockOutcome::Skip { id: "R-004".into() });
    }

    #[test]
    fn empty_first_line_gets_sentinel_id() {
        let outcome = extract_block("\n- Decision Statement: Something.\n");
        match outcome {
            BlockOutcome::Record(rec) => assert_eq!(rec.id, UNKNOWN_ID),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn id_is_first_line_trimmed() {
        let rec = record("   REC-7  \n- Decision Statement: Do it.\n");
        assert_eq!(rec.id, "REC-7");
    }

    #[test]
    fn priority_defaults_to_medium_when_absent() {
        let rec = record(" R-001\n- Decision Statement: Do it.\n");
        assert_eq!(rec.priority, Priority::Medium);
    }

    #[test]
    fn priority_is_case_insensitive() {
        let rec = record(" R-001\n- Priority: low\n- Decision Statement: Do it.\n");
        assert_eq!(rec.priority, Priority::Low);
    }

    #[test]
    fn priority_prefix_match() {
        let rec = record(" R-001\n- Priority: HIGHEST\n- Decision Statement: Do it.\n");
        assert_eq!(rec.priority, Priority::High);
    }

    #[test]
    fn invalid_priority_value_falls_through_to_next_label() {
        let rec = record(
            " R-001\n\
             - Priority: URGENT\n\
             - Priority: low\n\
             - Decision Statement: Do it.\n",
        );
        assert_eq!(rec.priority, Priority::Low);
    }

    #[test]
    fn priority_label_is_case_sensitive() {
        let rec = record(" R-001\n- priority: HIGH\n- Decision Statement: Do it.\n");
        assert_eq!(rec.priority, Priority::Medium);
    }

    #[test]
    fn priority_value_on_next_line_still_matches() {
        let rec = record(" R-001\n- Priority:\nHIGH\n- Decision Statement: Do it.\n");
        assert_eq!(rec.priority, Priority::High);
    }

    #[test]
    fn status_is_line_bounded() {
        let rec = record(
            " R-001\n\
             - Decision Statement: Do it.\n\
             - Status: APPROVED\nTrailing prose on the next line.\n",
        );
        assert_eq!(rec.status, "APPROVED");
    }

    #[test]
    fn status_on_following_line_is_empty() {
        let rec = record(" R-001\n- Decision Statement: Do it.\n- Status:\nAPPROVED\n");
        assert_eq!(rec.status, "");
    }

    #[test]
    fn status_kept_verbatim() {
        let rec = record(
            " R-001\n\
             - Decision Statement: Do it.\n\
             - Status: BLOCKED – INSUFFICIENT DATA\n",
        );
        assert_eq!(rec.status, "BLOCKED – INSUFFICIENT DATA");
    }

    #[test]
    fn facts_and_sources_default_empty() {
        let rec = record(" R-001\n- Decision Statement: Do it.\n- Status: APPROVED\n");
        assert_eq!(rec.facts, "");
        assert_eq!(rec.sources, "");
    }

    #[test]
    fn statement_stops_at_earliest_terminator() {
        let rec = record(
            " R-001\n\
             - Decision Statement: Keep this.\n\
             - Status: APPROVED\n\
             - Source(s): Late source.\n",
        );
        assert_eq!(rec.statement, "Keep this.");
    }

    #[test]
    fn label_word_inside_statement_line_does_not_terminate() {
        let rec = record(
            " R-001\n\
             - Decision Statement: Review the - Status field conventions.\n\
             - Status: APPROVED\n",
        );
        assert_eq!(rec.statement, "Review the - Status field conventions.");
    }

    #[test]
    fn multiline_statement_captured_until_terminator() {
        let rec = record(
            " R-001\n\
             - Decision Statement: Start a pilot\nacross two regions.\n\
             - Status: APPROVED\n",
        );
        assert_eq!(rec.statement, "Start a pilot\nacross two regions.");
    }

    #[test]
    fn facts_stop_at_source_label() {
        let rec = record(
            " R-001\n\
             - Decision Statement: Do it.\n\
             - Supporting Facts (Fact IDs): F-001, F-002\n\
             - Source(s): Survey\n\
             - Status: APPROVED\n",
        );
        assert_eq!(rec.facts, "F-001, F-002");
    }

    #[test]
    fn sources_stop_at_status_label() {
        let rec = record(
            " R-001\n\
             - Decision Statement: Do it.\n\
             - Source(s): Survey, Annual Report\n\
             - Status: APPROVED\n",
        );
        assert_eq!(rec.sources, "Survey, Annual Report");
    }

    #[test]
    fn sources_run_to_end_without_status() {
        let rec = record(" R-001\n- Decision Statement: Do it.\n- Source(s): Survey\n");
        assert_eq!(rec.sources, "Survey");
        assert_eq!(rec.status, "");
    }
}
