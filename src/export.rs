//! CSV export of a session's recommendations.
//!
//! Free-text columns (Statement, Supporting Facts, Sources) are always
//! quoted with embedded quotes doubled; ID, Priority and Status are
//! controlled vocabulary and stay bare.

use std::path::Path;

use anyhow::Result;

use crate::parser::Recommendation;

const HEADER: &str = "ID,Priority,Statement,Status,Supporting Facts,Sources";

pub fn to_csv(records: &[Recommendation]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(HEADER.to_string());
    for rec in records {
        lines.push(format!(
            "{},{},{},{},{},{}",
            rec.id,
            rec.priority.as_str(),
            quote(&rec.statement),
            rec.status,
            quote(&rec.facts),
            quote(&rec.sources),
        ));
    }
    lines.join("\n")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Write the CSV to a file path, or to stdout when no path is given.
pub fn write_csv(records: &[Recommendation], output: Option<&Path>) -> Result<()> {
    let csv = to_csv(records);
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &csv)?;
            eprintln!(
                "Exported {} recommendations to {}",
                records.len(),
                path.display()
            );
        }
        None => {
            println!("{}", csv);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Priority;

    fn rec(statement: &str, facts: &str, sources: &str) -> Recommendation {
        Recommendation {
            id: "R-001".to_string(),
            priority: Priority::High,
            statement: statement.to_string(),
            status: "APPROVED".to_string(),
            facts: facts.to_string(),
            sources: sources.to_string(),
        }
    }

    /// Quote-aware row reader used to check what a CSV consumer would see.
    fn read_rows(csv: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut row = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut chars = csv.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '"' if in_quotes => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                '"' => in_quotes = true,
                ',' if !in_quotes => {
                    row.push(std::mem::take(&mut field));
                }
                '\n' if !in_quotes => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
        row.push(field);
        rows.push(row);
        rows
    }

    #[test]
    fn header_row_matches_contract() {
        assert_eq!(to_csv(&[]), "ID,Priority,Statement,Status,Supporting Facts,Sources");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let csv = to_csv(&[rec("Launch the \"Dhaka pilot\" next quarter.", "", "")]);
        assert!(csv.contains("\"Launch the \"\"Dhaka pilot\"\" next quarter.\""));
    }

    #[test]
    fn round_trip_recovers_quotes() {
        let csv = to_csv(&[rec("He said \"go global\"", "F-001", "Survey")]);
        let rows = read_rows(&csv);
        assert_eq!(rows[1][2], "He said \"go global\"");
    }

    #[test]
    fn round_trip_recovers_commas_and_newlines() {
        let csv = to_csv(&[rec(
            "Expand to Dhaka, Chittagong\nand Sylhet.",
            "F-001, F-002",
            "Survey, Annual Report",
        )]);
        let rows = read_rows(&csv);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][2], "Expand to Dhaka, Chittagong\nand Sylhet.");
        assert_eq!(rows[1][4], "F-001, F-002");
        assert_eq!(rows[1][5], "Survey, Annual Report");
    }

    #[test]
    fn bare_fields_unquoted() {
        let csv = to_csv(&[rec("Do it.", "", "")]);
        let line = csv.lines().nth(1).unwrap();
        assert!(line.starts_with("R-001,HIGH,"));
        assert!(line.contains(",APPROVED,"));
    }
}
