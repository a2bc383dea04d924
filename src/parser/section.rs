//! Section isolation: slice the decision-recommendations section out of a
//! five-section intelligence report.
//!
//! Headings are exact literals from the report schema. If the schema prompt
//! ever changes its section titles, these markers must be updated with it.

/// Heading that opens the recommendations section.
pub const RECOMMENDATIONS_HEADING: &str = "SECTION 3 — DECISION RECOMMENDATIONS";

/// Markers that can follow the recommendations section. Matched as prefixes
/// so dash or caption variants after the section number still bound the
/// capture.
const SECTION_END_MARKERS: &[&str] = &["SECTION 4", "SECTION 5"];

/// Return the text between the recommendations heading and the next section
/// marker (or end of document). `None` means the report carries no
/// recommendations section at all, which is a normal input shape.
pub fn recommendations_section(document: &str) -> Option<&str> {
    let start = document.find(RECOMMENDATIONS_HEADING)? + RECOMMENDATIONS_HEADING.len();
    let rest = &document[start..];

    let end = SECTION_END_MARKERS
        .iter()
        .filter_map(|marker| rest.find(marker))
        .min()
        .unwrap_or(rest.len());

    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_by_next_section() {
        let doc = "SECTION 3 — DECISION RECOMMENDATIONS\nbody\nSECTION 4 — ASSUMPTIONS\nafter";
        assert_eq!(recommendations_section(doc), Some("\nbody\n"));
    }

    #[test]
    fn stops_at_section_5_when_4_absent() {
        let doc = "SECTION 3 — DECISION RECOMMENDATIONS\nbody\nSECTION 5 — AUDIT DECLARATION";
        assert_eq!(recommendations_section(doc), Some("\nbody\n"));
    }

    #[test]
    fn earliest_marker_wins() {
        let doc = "SECTION 3 — DECISION RECOMMENDATIONS\nbody\nSECTION 5 — AUDIT\nSECTION 4 — ASSUMPTIONS";
        assert_eq!(recommendations_section(doc), Some("\nbody\n"));
    }

    #[test]
    fn runs_to_end_without_following_marker() {
        let doc = "preamble\nSECTION 3 — DECISION RECOMMENDATIONS\ntail";
        assert_eq!(recommendations_section(doc), Some("\ntail"));
    }

    #[test]
    fn missing_heading_is_none() {
        assert_eq!(recommendations_section("SECTION 1 — VERIFIED FACTS\nonly facts"), None);
    }

    #[test]
    fn empty_document_is_none() {
        assert_eq!(recommendations_section(""), None);
    }

    #[test]
    fn heading_with_plain_hyphen_is_not_matched() {
        // The opening heading is an exact literal; dash variants are only
        // tolerated for the end markers.
        assert_eq!(recommendations_section("SECTION 3 - DECISION RECOMMENDATIONS\nbody"), None);
    }
}
