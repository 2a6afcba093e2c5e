use std::path::Path;
use std::time::Instant;

use log::{error, info, warn};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::model::{Note, NoteDraft};

/// Bumped whenever `notes_table` changes shape. A mismatch drops and
/// recreates the table; there is no data migration.
pub const SCHEMA_VERSION: i64 = 1;

pub struct NoteDb {
    conn: Connection,
}

impl NoteDb {
    /// Open (or create) the notes database at the given file path.
    pub fn open(path: &Path) -> Result<Self> {
        let started_at = Instant::now();
        let conn = match Connection::open(path) {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=db_open module=store status=error mode=file error={}",
                    err
                );
                return Err(err.into());
            }
        };
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA busy_timeout=5000;",
        )?;
        let db = Self { conn };
        db.ensure_schema()?;
        info!(
            "event=db_open module=store status=ok mode=file duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.ensure_schema()?;
        info!("event=db_open module=store status=ok mode=memory");
        Ok(db)
    }

    fn ensure_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version == SCHEMA_VERSION {
            return Ok(());
        }

        let existing: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'notes_table'",
            [],
            |row| row.get(0),
        )?;
        if existing > 0 {
            warn!(
                "event=schema_reset module=store status=dropping from_version={} to_version={}",
                version, SCHEMA_VERSION
            );
        }

        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS notes_table;
             CREATE TABLE notes_table (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 title TEXT NOT NULL,
                 description TEXT NOT NULL,
                 timestamp INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_notes_timestamp ON notes_table(timestamp);
             PRAGMA user_version = {SCHEMA_VERSION};"
        ))?;
        Ok(())
    }

    /// Insert a note, replacing any row with the same id.
    pub fn insert(&self, draft: &NoteDraft) -> Result<Note> {
        self.conn.execute(
            "INSERT OR REPLACE INTO notes_table (id, title, description, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![draft.id, draft.title, draft.description, draft.timestamp],
        )?;
        let id = draft.id.unwrap_or_else(|| self.conn.last_insert_rowid());
        info!("event=note_insert module=store status=ok id={id}");
        Ok(Note {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            timestamp: draft.timestamp,
        })
    }

    /// Overwrite the row matched by `note.id`. Returns the number of rows changed.
    pub fn update(&self, note: &Note) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE notes_table SET title = ?1, description = ?2, timestamp = ?3 WHERE id = ?4",
            params![note.title, note.description, note.timestamp, note.id],
        )?;
        info!(
            "event=note_update module=store status=ok id={} rows={}",
            note.id, rows
        );
        Ok(rows)
    }

    /// Remove the row matched by `note.id`. Returns the number of rows removed.
    pub fn delete(&self, note: &Note) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM notes_table WHERE id = ?1", params![note.id])?;
        info!(
            "event=note_delete module=store status=ok id={} rows={}",
            note.id, rows
        );
        Ok(rows)
    }

    /// All notes, newest first. Equal timestamps fall back to id so the later
    /// insert still sorts first.
    pub fn list_all(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, timestamp FROM notes_table
             ORDER BY timestamp DESC, id DESC",
        )?;
        let rows = stmt.query_map([], row_to_note)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn get(&self, id: i64) -> Result<Option<Note>> {
        self.conn
            .query_row(
                "SELECT id, title, description, timestamp FROM notes_table WHERE id = ?1",
                params![id],
                row_to_note,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Expose the raw connection (for tests).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        timestamp: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn draft(title: &str, description: &str, timestamp: i64) -> NoteDraft {
        NoteDraft {
            id: None,
            title: title.into(),
            description: description.into(),
            timestamp,
        }
    }

    #[test]
    fn insert_assigns_unique_ids() {
        let db = NoteDb::open_memory().unwrap();
        let a = db.insert(&draft("Buy milk", "2%", 10)).unwrap();
        let b = db.insert(&draft("Call mom", "", 20)).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(db.get(a.id).unwrap().unwrap(), a);
        assert_eq!(db.get(b.id).unwrap().unwrap(), b);
    }

    #[test]
    fn list_all_orders_by_timestamp_desc() {
        let db = NoteDb::open_memory().unwrap();
        db.insert(&draft("middle", "", 20)).unwrap();
        db.insert(&draft("oldest", "", 10)).unwrap();
        db.insert(&draft("newest", "", 30)).unwrap();

        let titles: Vec<String> = db.list_all().unwrap().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn equal_timestamps_put_later_insert_first() {
        let db = NoteDb::open_memory().unwrap();
        db.insert(&draft("Buy milk", "2%", 5)).unwrap();
        db.insert(&draft("Call mom", "", 5)).unwrap();

        let notes = db.list_all().unwrap();
        assert_eq!(notes[0].title, "Call mom");
        assert_eq!(notes[1].title, "Buy milk");
    }

    #[test]
    fn insert_with_existing_id_replaces_row() {
        let db = NoteDb::open_memory().unwrap();
        let original = db.insert(&draft("first", "", 1)).unwrap();
        let replaced = db
            .insert(&NoteDraft {
                id: Some(original.id),
                title: "second".into(),
                description: "again".into(),
                timestamp: 2,
            })
            .unwrap();

        assert_eq!(replaced.id, original.id);
        let all = db.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "second");
    }

    #[test]
    fn update_matches_by_id() {
        let db = NoteDb::open_memory().unwrap();
        let mut note = db.insert(&draft("Buy milk", "2%", 7)).unwrap();
        note.description = "Whole".into();

        assert_eq!(db.update(&note).unwrap(), 1);
        let stored = db.get(note.id).unwrap().unwrap();
        assert_eq!(stored.description, "Whole");
        assert_eq!(stored.timestamp, 7);
    }

    #[test]
    fn update_missing_id_changes_nothing() {
        let db = NoteDb::open_memory().unwrap();
        let ghost = Note {
            id: 42,
            title: "ghost".into(),
            description: String::new(),
            timestamp: 1,
        };
        assert_eq!(db.update(&ghost).unwrap(), 0);
        assert!(db.list_all().unwrap().is_empty());
    }

    #[test]
    fn delete_removes_only_that_note() {
        let db = NoteDb::open_memory().unwrap();
        let a = db.insert(&draft("a", "", 1)).unwrap();
        let b = db.insert(&draft("b", "", 2)).unwrap();
        let c = db.insert(&draft("c", "", 3)).unwrap();

        assert_eq!(db.delete(&b).unwrap(), 1);
        let ids: Vec<i64> = db.list_all().unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![c.id, a.id]);
        assert!(db.get(b.id).unwrap().is_none());
        assert_eq!(db.delete(&b).unwrap(), 0);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let db = NoteDb::open_memory().unwrap();
        let a = db.insert(&draft("a", "", 1)).unwrap();
        db.delete(&a).unwrap();
        let b = db.insert(&draft("b", "", 2)).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn reopen_keeps_notes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.db");
        {
            let db = NoteDb::open(&path).unwrap();
            db.insert(&draft("kept", "", 1)).unwrap();
        }
        let db = NoteDb::open(&path).unwrap();
        assert_eq!(db.list_all().unwrap().len(), 1);
    }

    #[test]
    fn schema_version_mismatch_recreates_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.db");
        {
            let db = NoteDb::open(&path).unwrap();
            db.insert(&draft("doomed", "", 1)).unwrap();
            db.conn()
                .execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION + 1))
                .unwrap();
        }
        let db = NoteDb::open(&path).unwrap();
        assert!(db.list_all().unwrap().is_empty());
        let version: i64 = db
            .conn()
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
