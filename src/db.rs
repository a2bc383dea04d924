use std::path::Path;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::parser::{Priority, Recommendation};

const DB_PATH: &str = "data/decisions.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            id         INTEGER PRIMARY KEY,
            title      TEXT NOT NULL,
            context    TEXT,
            report     TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS recommendations (
            id         INTEGER PRIMARY KEY,
            session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            position   INTEGER NOT NULL,
            rec_id     TEXT NOT NULL,
            priority   TEXT NOT NULL CHECK(priority IN ('HIGH','MEDIUM','LOW')),
            statement  TEXT NOT NULL,
            status     TEXT NOT NULL,
            facts      TEXT NOT NULL,
            sources    TEXT NOT NULL,
            UNIQUE(session_id, position)
        );
        CREATE INDEX IF NOT EXISTS idx_recommendations_session
            ON recommendations(session_id);
        ",
    )?;
    Ok(())
}

// ── Sessions ──

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: i64,
    pub title: String,
    pub created_at: String,
    pub recommendations: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub id: i64,
    pub title: String,
    pub context: Option<String>,
    pub report: String,
    pub created_at: String,
    pub recommendations: Vec<Recommendation>,
}

/// Persist one analysis run: the session row plus its parsed records, in one
/// transaction. Returns the new session id.
pub fn save_session(
    conn: &Connection,
    title: &str,
    context: Option<&str>,
    report: &str,
    records: &[Recommendation],
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO sessions (title, context, report) VALUES (?1, ?2, ?3)",
        rusqlite::params![title, context, report],
    )?;
    let session_id = tx.last_insert_rowid();
    insert_records(&tx, session_id, records)?;
    tx.commit()?;
    Ok(session_id)
}

pub fn list_sessions(conn: &Connection) -> Result<Vec<SessionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.title, s.created_at, COUNT(r.id)
         FROM sessions s
         LEFT JOIN recommendations r ON r.session_id = s.id
         GROUP BY s.id
         ORDER BY s.created_at DESC, s.id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SessionSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                created_at: row.get(2)?,
                recommendations: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_session(conn: &Connection, id: i64) -> Result<Option<SessionDetail>> {
    let header = conn
        .query_row(
            "SELECT id, title, context, report, created_at FROM sessions WHERE id = ?1",
            [id],
            |row| {
                Ok(SessionDetail {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    context: row.get(2)?,
                    report: row.get(3)?,
                    created_at: row.get(4)?,
                    recommendations: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut session) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT rec_id, priority, statement, status, facts, sources
         FROM recommendations
         WHERE session_id = ?1
         ORDER BY position",
    )?;
    session.recommendations = stmt
        .query_map([id], |row| {
            let priority: String = row.get(1)?;
            Ok(Recommendation {
                id: row.get(0)?,
                priority: Priority::from_token(&priority).unwrap_or_default(),
                statement: row.get(2)?,
                status: row.get(3)?,
                facts: row.get(4)?,
                sources: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(session))
}

/// Delete a session; child records go with it via the cascade. Returns false
/// when the id does not exist.
pub fn delete_session(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
    Ok(changed > 0)
}

// ── Recommendations ──

fn insert_records(
    tx: &rusqlite::Transaction,
    session_id: i64,
    records: &[Recommendation],
) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO recommendations
         (session_id, position, rec_id, priority, statement, status, facts, sources)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for (position, rec) in records.iter().enumerate() {
        stmt.execute(rusqlite::params![
            session_id,
            position as i64,
            rec.id,
            rec.priority.as_str(),
            rec.statement,
            rec.status,
            rec.facts,
            rec.sources,
        ])?;
    }
    Ok(())
}

/// Swap a session's records for a freshly parsed set.
pub fn replace_recommendations(
    conn: &Connection,
    session_id: i64,
    records: &[Recommendation],
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM recommendations WHERE session_id = ?1",
        [session_id],
    )?;
    insert_records(&tx, session_id, records)?;
    tx.commit()?;
    Ok(())
}

/// Raw reports for reparsing, oldest first.
pub fn fetch_reports(conn: &Connection, limit: Option<usize>) -> Result<Vec<(i64, String)>> {
    let sql = match limit {
        Some(n) => format!("SELECT id, report FROM sessions ORDER BY id LIMIT {}", n),
        None => "SELECT id, report FROM sessions ORDER BY id".to_string(),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub sessions: i64,
    pub recommendations: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub monthly: Vec<(String, i64)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let sessions: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?;
    let recommendations: i64 =
        conn.query_row("SELECT COUNT(*) FROM recommendations", [], |r| r.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT strftime('%Y-%m', created_at) AS month, COUNT(*)
         FROM sessions
         GROUP BY month
         ORDER BY month",
    )?;
    let monthly = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stats {
        sessions,
        recommendations,
        high: count_priority(conn, "HIGH")?,
        medium: count_priority(conn, "MEDIUM")?,
        low: count_priority(conn, "LOW")?,
        monthly,
    })
}

fn count_priority(conn: &Connection, priority: &str) -> Result<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM recommendations WHERE priority = ?1",
        [priority],
        |r| r.get(0),
    )?;
    Ok(n)
}
