mod db;
mod export;
mod gemini;
mod parser;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Parser)]
#[command(
    name = "decision_assistant",
    about = "Market intelligence decision assistant backed by Gemini"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a market analysis and save the parsed recommendations
    Analyze {
        /// Text context/request for the analysis
        context: Option<String>,
        /// Attach a file (repeatable)
        #[arg(short = 'f', long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,
        /// Session title (default: first line of the context)
        #[arg(short, long)]
        title: Option<String>,
    },
    /// List saved sessions
    List,
    /// Show one session with its recommendations and full report
    Show {
        id: i64,
        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a session and its recommendations
    Delete { id: i64 },
    /// Re-run the parser over stored raw reports
    Reparse {
        /// Max sessions to reparse (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show aggregate statistics
    Stats,
    /// Export a session's recommendations as CSV
    Export {
        id: i64,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze { context, files, title } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;

            let context = context.unwrap_or_default();
            if context.trim().is_empty() && files.is_empty() {
                anyhow::bail!("Please provide text context or attach files with --file.");
            }

            let attachments = files
                .iter()
                .map(|p| gemini::load_attachment(p))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let spinner = make_spinner("Generating market analysis (thinking + live search)...");
            let result = gemini::generate_report(&context, &attachments).await;
            spinner.finish_and_clear();
            let report = result?;

            let records = parser::parse(&report);
            let title = title.unwrap_or_else(|| derive_title(&context));
            let context_param = if context.trim().is_empty() {
                None
            } else {
                Some(context.as_str())
            };
            let session_id = db::save_session(&conn, &title, context_param, &report, &records)?;

            println!("Session {} saved: {}", session_id, title);
            if records.is_empty() {
                println!(
                    "No recommendations found in the report. View it with 'show {}'.",
                    session_id
                );
            } else {
                print_cards(&records);
            }
            Ok(())
        }
        Commands::List => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let sessions = db::list_sessions(&conn)?;
            if sessions.is_empty() {
                println!("No sessions yet. Run 'analyze' first.");
                return Ok(());
            }

            println!(
                "{:>4} | {:<44} | {:<19} | {:>4}",
                "ID", "Title", "Created", "Recs"
            );
            println!("{}", "-".repeat(80));
            for s in &sessions {
                println!(
                    "{:>4} | {:<44} | {:<19} | {:>4}",
                    s.id,
                    truncate(&s.title, 44),
                    s.created_at,
                    s.recommendations
                );
            }
            println!("\n{} sessions", sessions.len());
            Ok(())
        }
        Commands::Show { id, json } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let Some(session) = db::fetch_session(&conn, id)? else {
                anyhow::bail!("Session {} not found", id);
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
                return Ok(());
            }

            println!("Session {}: {}", session.id, session.title);
            println!("Created: {}", session.created_at);
            if let Some(context) = &session.context {
                let first_line = context.lines().next().unwrap_or("");
                println!("Context: {}", truncate(first_line, 72));
            }

            if session.recommendations.is_empty() {
                println!("\nNo recommendations were parsed from this report.");
            } else {
                print_cards(&session.recommendations);
            }

            println!("\n--- Full report ---\n{}", session.report);
            Ok(())
        }
        Commands::Delete { id } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            if db::delete_session(&conn, id)? {
                println!("Deleted session {}.", id);
            } else {
                println!("Session {} not found.", id);
            }
            Ok(())
        }
        Commands::Reparse { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let reports = db::fetch_reports(&conn, limit)?;
            if reports.is_empty() {
                println!("No sessions to reparse.");
                return Ok(());
            }
            println!("Reparsing {} sessions...", reports.len());
            let counts = reparse_sessions(&conn, &reports)?;
            counts.print();
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Sessions:        {}", s.sessions);
            println!("Recommendations: {}", s.recommendations);
            println!("  HIGH:          {}", s.high);
            println!("  MEDIUM:        {}", s.medium);
            println!("  LOW:           {}", s.low);
            if s.sessions > 0 {
                println!(
                    "Avg per session: {:.1}",
                    s.recommendations as f64 / s.sessions as f64
                );
            }
            if !s.monthly.is_empty() {
                println!("\n--- Monthly activity ---");
                for (month, count) in &s.monthly {
                    println!("  {}: {}", month_label(month), count);
                }
            }
            Ok(())
        }
        Commands::Export { id, output } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let Some(session) = db::fetch_session(&conn, id)? else {
                anyhow::bail!("Session {} not found", id);
            };
            if session.recommendations.is_empty() {
                println!("Session {} has no recommendations to export.", id);
                return Ok(());
            }
            export::write_csv(&session.recommendations, output.as_deref())?;
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn make_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} ({elapsed})")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_cards(records: &[parser::Recommendation]) {
    println!();
    for rec in records {
        if rec.status.is_empty() {
            println!("{} {} [{}]", rec.status_icon(), rec.id, rec.priority.as_str());
        } else {
            println!(
                "{} {} [{}] {}",
                rec.status_icon(),
                rec.id,
                rec.priority.as_str(),
                rec.status
            );
        }
        println!("    {}", rec.statement);
        if !rec.facts.is_empty() {
            println!("    Facts:   {}", rec.facts);
        }
        if !rec.sources.is_empty() {
            println!("    Sources: {}", rec.sources);
        }
    }
}

struct ReparseCounts {
    sessions: usize,
    records: usize,
}

impl ReparseCounts {
    fn print(&self) {
        println!(
            "Reparsed {} sessions, saved {} recommendations.",
            self.sessions, self.records,
        );
    }
}

fn reparse_sessions(
    conn: &rusqlite::Connection,
    reports: &[(i64, String)],
) -> anyhow::Result<ReparseCounts> {
    use rayon::prelude::*;

    let pb = ProgressBar::new(reports.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut counts = ReparseCounts {
        sessions: 0,
        records: 0,
    };

    for chunk in reports.chunks(100) {
        let parsed: Vec<_> = chunk
            .par_iter()
            .map(|(id, report)| (*id, parser::parse(report)))
            .collect();

        for (session_id, records) in parsed {
            db::replace_recommendations(conn, session_id, &records)?;
            counts.sessions += 1;
            counts.records += records.len();
            pb.inc(1);
        }
    }

    pb.finish_and_clear();
    Ok(counts)
}

/// Session title from the context: first non-empty line, clipped to 50 chars.
fn derive_title(context: &str) -> String {
    let first_line = context.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        "Untitled Session".to_string()
    } else {
        first_line.chars().take(50).collect()
    }
}

/// "2025-03" → "Mar 2025"; anything unparseable passes through.
fn month_label(ym: &str) -> String {
    chrono::NaiveDate::parse_from_str(&format!("{}-01", ym), "%Y-%m-%d")
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|_| ym.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
