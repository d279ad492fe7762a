//! # Interview History Store
//!
//! SQLite-backed persistence for interview sessions and their Q&A pairs
//! behind a small CRUD surface: `create_session`, `end_session`, `add_qa`,
//! `get_session`, `list_sessions`, `delete_session`. The schema is created
//! on open, so history survives restarts with no migration step. Key points
//! are stored as a JSON array in a text column.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;

/// One persisted interview session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub id: i64,
    pub title: Option<String>,
    pub cv_filename: Option<String>,
    pub cv_text: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// One question/answer pair, many-to-one with its session.
#[derive(Debug, Clone, Serialize)]
pub struct QaRecord {
    pub id: i64,
    pub session_id: i64,
    pub question: String,
    pub answer: String,
    pub key_points: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Session summary for list views.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: i64,
    pub title: Option<String>,
    pub cv_filename: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub question_count: usize,
}

/// A session with its Q&A pairs, as returned by `get_session`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionWithQa {
    #[serde(flatten)]
    pub session: SessionRecord,
    pub qa_pairs: Vec<QaRecord>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS interview_sessions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT,
    cv_filename TEXT,
    cv_text     TEXT,
    started_at  TEXT NOT NULL,
    ended_at    TEXT
);
CREATE TABLE IF NOT EXISTS interview_qa (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id  INTEGER NOT NULL,
    question    TEXT NOT NULL,
    answer      TEXT NOT NULL,
    key_points  TEXT,
    timestamp   TEXT NOT NULL
);
";

/// Thread-safe interview history store.
///
/// Callers are short-lived CRUD operations, so a single connection behind a
/// mutex is enough; SQLite serializes writers anyway.
pub struct InterviewStore {
    conn: Mutex<Connection>,
}

impl InterviewStore {
    /// Open (creating if needed) the database at `path` and ensure the
    /// schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory store, used by tests and available for ephemeral runs.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new session and return its id.
    pub fn create_session(
        &self,
        title: Option<String>,
        cv_filename: Option<String>,
        cv_text: Option<String>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO interview_sessions (title, cv_filename, cv_text, started_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![title, cv_filename, cv_text, Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Mark a session as ended. Ending an already-ended session refreshes
    /// its `ended_at`.
    pub fn end_session(&self, session_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE interview_sessions SET ended_at = ?1 WHERE id = ?2",
            params![Utc::now(), session_id],
        )?;
        if changed == 0 {
            return Err(StoreError::SessionNotFound(session_id));
        }
        Ok(())
    }

    /// Append a Q&A pair to an active session.
    ///
    /// Q&A records are append-only while the session is active: a session
    /// whose `ended_at` is already set rejects new pairs.
    pub fn add_qa(
        &self,
        session_id: i64,
        question: String,
        answer: String,
        key_points: Vec<String>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock();

        let ended_at: Option<DateTime<Utc>> = conn
            .query_row(
                "SELECT ended_at FROM interview_sessions WHERE id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::SessionNotFound(session_id))?;
        if ended_at.is_some() {
            return Err(StoreError::SessionEnded(session_id));
        }

        let key_points_json =
            serde_json::to_string(&key_points).unwrap_or_else(|_| "[]".to_string());
        conn.execute(
            "INSERT INTO interview_qa (session_id, question, answer, key_points, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, question, answer, key_points_json, Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// A session and all its Q&A pairs in insertion order.
    pub fn get_session(&self, session_id: i64) -> Result<Option<SessionWithQa>, StoreError> {
        let conn = self.conn.lock();

        let session = conn
            .query_row(
                "SELECT id, title, cv_filename, cv_text, started_at, ended_at
                 FROM interview_sessions WHERE id = ?1",
                params![session_id],
                session_from_row,
            )
            .optional()?;
        let session = match session {
            Some(session) => session,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            "SELECT id, session_id, question, answer, key_points, timestamp
             FROM interview_qa WHERE session_id = ?1 ORDER BY timestamp, id",
        )?;
        let qa_pairs = stmt
            .query_map(params![session_id], qa_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(SessionWithQa { session, qa_pairs }))
    }

    /// All sessions with summary info, newest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.title, s.cv_filename, s.started_at, s.ended_at, COUNT(q.id)
             FROM interview_sessions s
             LEFT JOIN interview_qa q ON q.session_id = s.id
             GROUP BY s.id
             ORDER BY s.started_at DESC, s.id DESC",
        )?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    cv_filename: row.get(2)?,
                    started_at: row.get(3)?,
                    ended_at: row.get(4)?,
                    question_count: row.get::<_, i64>(5)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    /// Delete a session and, cascading, its Q&A pairs.
    pub fn delete_session(&self, session_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM interview_qa WHERE session_id = ?1",
            params![session_id],
        )?;
        let changed = conn.execute(
            "DELETE FROM interview_sessions WHERE id = ?1",
            params![session_id],
        )?;
        if changed == 0 {
            return Err(StoreError::SessionNotFound(session_id));
        }
        Ok(())
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        cv_filename: row.get(2)?,
        cv_text: row.get(3)?,
        started_at: row.get(4)?,
        ended_at: row.get(5)?,
    })
}

fn qa_from_row(row: &Row<'_>) -> rusqlite::Result<QaRecord> {
    let key_points: Option<String> = row.get(4)?;
    Ok(QaRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        key_points: key_points
            .map(|json| serde_json::from_str(&json).unwrap_or_default())
            .unwrap_or_default(),
        timestamp: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_session() {
        let store = InterviewStore::in_memory().unwrap();
        let id = store
            .create_session(
                Some("Interview Session".into()),
                Some("resume.txt".into()),
                Some("cv text".into()),
            )
            .unwrap();

        let session = store.get_session(id).unwrap().unwrap();
        assert_eq!(session.session.cv_filename.as_deref(), Some("resume.txt"));
        assert!(session.session.ended_at.is_none());
        assert!(session.qa_pairs.is_empty());
    }

    #[test]
    fn test_qa_appends_in_order() {
        let store = InterviewStore::in_memory().unwrap();
        let id = store.create_session(None, None, None).unwrap();

        store
            .add_qa(id, "Q1".into(), "A1".into(), vec!["p1".into()])
            .unwrap();
        store.add_qa(id, "Q2".into(), "A2".into(), vec![]).unwrap();

        let session = store.get_session(id).unwrap().unwrap();
        assert_eq!(session.qa_pairs.len(), 2);
        assert_eq!(session.qa_pairs[0].question, "Q1");
        assert_eq!(session.qa_pairs[1].question, "Q2");
        assert_eq!(session.qa_pairs[0].key_points, vec!["p1".to_string()]);
        assert!(session.qa_pairs[1].key_points.is_empty());
    }

    #[test]
    fn test_qa_rejected_after_end() {
        let store = InterviewStore::in_memory().unwrap();
        let id = store.create_session(None, None, None).unwrap();
        store.end_session(id).unwrap();

        let err = store.add_qa(id, "Q".into(), "A".into(), vec![]).unwrap_err();
        assert!(matches!(err, StoreError::SessionEnded(_)));
    }

    #[test]
    fn test_qa_on_missing_session() {
        let store = InterviewStore::in_memory().unwrap();
        let err = store.add_qa(99, "Q".into(), "A".into(), vec![]).unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(99)));
    }

    #[test]
    fn test_list_sessions_counts_questions_newest_first() {
        let store = InterviewStore::in_memory().unwrap();
        let first = store
            .create_session(Some("first".into()), None, None)
            .unwrap();
        let second = store
            .create_session(Some("second".into()), None, None)
            .unwrap();
        store.add_qa(first, "Q".into(), "A".into(), vec![]).unwrap();

        let list = store.list_sessions().unwrap();
        assert_eq!(list.len(), 2);
        // Tie on timestamp resolution falls back to id ordering.
        assert_eq!(list[0].id, second);
        assert_eq!(list[1].id, first);
        assert_eq!(list[1].question_count, 1);
        assert_eq!(list[0].question_count, 0);
    }

    #[test]
    fn test_delete_cascades() {
        let store = InterviewStore::in_memory().unwrap();
        let id = store.create_session(None, None, None).unwrap();
        store.add_qa(id, "Q".into(), "A".into(), vec![]).unwrap();

        store.delete_session(id).unwrap();
        assert!(store.get_session(id).unwrap().is_none());
        assert!(matches!(
            store.delete_session(id),
            Err(StoreError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_history_survives_reopen() {
        let dir = std::env::temp_dir().join(format!(
            "interview-store-test-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("history.db");

        let id = {
            let store = InterviewStore::open(&path).unwrap();
            let id = store
                .create_session(Some("persisted".into()), None, None)
                .unwrap();
            store
                .add_qa(id, "Q".into(), "A".into(), vec!["point".into()])
                .unwrap();
            store.end_session(id).unwrap();
            id
        };

        let reopened = InterviewStore::open(&path).unwrap();
        let session = reopened.get_session(id).unwrap().unwrap();
        assert_eq!(session.session.title.as_deref(), Some("persisted"));
        assert!(session.session.ended_at.is_some());
        assert_eq!(session.qa_pairs.len(), 1);
        assert_eq!(session.qa_pairs[0].key_points, vec!["point".to_string()]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
