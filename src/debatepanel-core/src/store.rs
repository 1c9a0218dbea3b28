//! SQLite-backed debate history.
//!
//! Schema:
//! - debates: one row per decisive debate
//! - arguments: persisted rebuttals, one per persona that delivered one
//! - argument_vectors: embedding of each persisted argument, keyed by persona
//!
//! Nearest-neighbour search is a brute-force cosine ranking over the
//! persona's vectors; the corpus is one row per persona per debate.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::embedding::cosine_similarity;
use crate::error::DebateError;

/// A rebuttal ready to be written, with its embedding.
#[derive(Debug, Clone)]
pub struct NewArgument {
    pub persona: String,
    pub model: String,
    pub phase: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A past argument returned by a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryMatch {
    pub argument_id: i64,
    pub debate_id: i64,
    pub is_winner: bool,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebateSummary {
    pub debate_id: i64,
    pub question: String,
    pub winning_persona: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArgument {
    pub argument_id: i64,
    pub persona: String,
    pub model: String,
    pub phase: String,
    pub text: String,
}

pub struct DebateStore {
    conn: Mutex<Connection>,
}

impl DebateStore {
    /// Open or create the database at `path`.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path.as_ref())?)
    }

    pub fn open_in_memory() -> Result<Self, DebateError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DebateError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS debates (
                debate_id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                winning_persona TEXT,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS arguments (
                argument_id INTEGER PRIMARY KEY AUTOINCREMENT,
                debate_id INTEGER NOT NULL,
                persona TEXT NOT NULL,
                model TEXT NOT NULL,
                phase TEXT NOT NULL,
                argument_text TEXT NOT NULL,
                FOREIGN KEY (debate_id) REFERENCES debates (debate_id)
            );

            CREATE TABLE IF NOT EXISTS argument_vectors (
                argument_id INTEGER PRIMARY KEY,
                persona TEXT NOT NULL,
                is_winner INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                FOREIGN KEY (argument_id) REFERENCES arguments (argument_id)
            );

            CREATE INDEX IF NOT EXISTS idx_vectors_persona ON argument_vectors(persona);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock still holds a usable connection.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a debate, its arguments, and their vectors in one transaction.
    pub fn record_debate(
        &self,
        question: &str,
        winning_persona: &str,
        arguments: &[NewArgument],
    ) -> Result<i64, DebateError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO debates (question, winning_persona) VALUES (?1, ?2)",
            params![question, winning_persona],
        )?;
        let debate_id = tx.last_insert_rowid();

        {
            let mut insert_arg = tx.prepare(
                "INSERT INTO arguments (debate_id, persona, model, phase, argument_text)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut insert_vec = tx.prepare(
                "INSERT INTO argument_vectors (argument_id, persona, is_winner, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for arg in arguments {
                insert_arg.execute(params![
                    debate_id,
                    &arg.persona,
                    &arg.model,
                    &arg.phase,
                    &arg.text
                ])?;
                let argument_id = tx.last_insert_rowid();
                insert_vec.execute(params![
                    argument_id,
                    &arg.persona,
                    arg.persona == winning_persona,
                    encode_vector(&arg.embedding)
                ])?;
            }
        }

        tx.commit()?;
        Ok(debate_id)
    }

    /// The `k` past arguments of `persona` most similar to `embedding`.
    pub fn nearest(
        &self,
        persona: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<HistoryMatch>, DebateError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT v.argument_id, a.debate_id, v.is_winner, v.embedding
             FROM argument_vectors v
             JOIN arguments a ON a.argument_id = v.argument_id
             WHERE v.persona = ?1",
        )?;

        let rows = stmt.query_map(params![persona], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let (argument_id, debate_id, is_winner, blob) = row?;
            let stored = decode_vector(&blob);
            // Vectors from a different embedder are not comparable.
            if stored.len() != embedding.len() {
                continue;
            }
            matches.push(HistoryMatch {
                argument_id,
                debate_id,
                is_winner,
                similarity: cosine_similarity(embedding, &stored),
            });
        }

        matches.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(b.argument_id.cmp(&a.argument_id))
        });
        matches.truncate(k);
        Ok(matches)
    }

    /// Most recent debates first.
    pub fn recent_debates(&self, limit: usize) -> Result<Vec<DebateSummary>, DebateError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT debate_id, question, winning_persona, COALESCE(timestamp, '')
             FROM debates ORDER BY debate_id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(DebateSummary {
                debate_id: row.get(0)?,
                question: row.get(1)?,
                winning_persona: row.get(2)?,
                timestamp: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn debate(&self, debate_id: i64) -> Result<Option<DebateSummary>, DebateError> {
        let conn = self.conn();
        let summary = conn
            .query_row(
                "SELECT debate_id, question, winning_persona, COALESCE(timestamp, '')
                 FROM debates WHERE debate_id = ?1",
                params![debate_id],
                |row| {
                    Ok(DebateSummary {
                        debate_id: row.get(0)?,
                        question: row.get(1)?,
                        winning_persona: row.get(2)?,
                        timestamp: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }

    pub fn arguments_for(&self, debate_id: i64) -> Result<Vec<StoredArgument>, DebateError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT argument_id, persona, model, phase, argument_text
             FROM arguments WHERE debate_id = ?1 ORDER BY argument_id",
        )?;
        let rows = stmt.query_map(params![debate_id], |row| {
            Ok(StoredArgument {
                argument_id: row.get(0)?,
                persona: row.get(1)?,
                model: row.get(2)?,
                phase: row.get(3)?,
                text: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn argument(persona: &str, text: &str, embedding: Vec<f32>) -> NewArgument {
        NewArgument {
            persona: persona.to_string(),
            model: "m".to_string(),
            phase: "rebuttal".to_string(),
            text: text.to_string(),
            embedding,
        }
    }

    #[test]
    fn test_record_and_list_debate() {
        let tmp = NamedTempFile::new().unwrap();
        let store = DebateStore::open_at(tmp.path()).unwrap();

        let id = store
            .record_debate(
                "Is tea better than coffee?",
                "A",
                &[
                    argument("A", "Tea wins.", vec![1.0, 0.0]),
                    argument("B", "Coffee wins.", vec![0.0, 1.0]),
                ],
            )
            .unwrap();

        let debates = store.recent_debates(10).unwrap();
        assert_eq!(debates.len(), 1);
        assert_eq!(debates[0].debate_id, id);
        assert_eq!(debates[0].winning_persona.as_deref(), Some("A"));
        assert!(!debates[0].timestamp.is_empty());

        let args = store.arguments_for(id).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].persona, "A");
        assert_eq!(args[1].text, "Coffee wins.");
        assert_eq!(store.debate(id).unwrap().unwrap().question, "Is tea better than coffee?");
        assert!(store.debate(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_nearest_filters_by_persona_and_ranks() {
        let store = DebateStore::open_in_memory().unwrap();
        store
            .record_debate(
                "q1",
                "A",
                &[
                    argument("A", "close", vec![1.0, 0.1]),
                    argument("B", "other persona", vec![1.0, 0.0]),
                ],
            )
            .unwrap();
        store
            .record_debate("q2", "B", &[argument("A", "far", vec![0.0, 1.0])])
            .unwrap();
        store
            .record_debate("q3", "B", &[argument("A", "closest", vec![1.0, 0.0])])
            .unwrap();

        let matches = store.nearest("A", &[1.0, 0.0], 2).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches[0].similarity >= matches[1].similarity);
        assert!(!matches[0].is_winner); // "closest" lost in q3
        assert!(matches[1].is_winner); // "close" won in q1

        assert!(store.nearest("Nobody", &[1.0, 0.0], 2).unwrap().is_empty());
    }

    #[test]
    fn test_nearest_skips_other_dimensions() {
        let store = DebateStore::open_in_memory().unwrap();
        store
            .record_debate("q", "A", &[argument("A", "three dims", vec![1.0, 0.0, 0.0])])
            .unwrap();
        assert!(store.nearest("A", &[1.0, 0.0], 2).unwrap().is_empty());
    }

    #[test]
    fn test_vector_encoding() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(decode_vector(&encode_vector(&v)), v);
    }
}
