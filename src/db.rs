use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::import::{GeneratedNotes, GeneratedSet};
use crate::models::{
    Card, Deck, DeckStats, DeckWithStats, Note, Notebook, NotebookStats, NotebookWithStats,
    ReviewRecord, INITIAL_EASE_FACTOR,
};
use crate::scheduler;

const NOTE_COLUMNS: &str = "id, notebook_id, title, content, source, repetitions, ease_factor, \
                            interval_days, due_date, last_reviewed";

// Columns that legacy card and note tables may be missing
const SCHEDULE_COLUMNS: [(&str, &str); 6] = [
    ("source", "TEXT"),
    ("repetitions", "INTEGER NOT NULL DEFAULT 0"),
    ("ease_factor", "REAL NOT NULL DEFAULT 2.5"),
    ("interval_days", "INTEGER NOT NULL DEFAULT 0"),
    ("due_date", "TEXT"),
    ("last_reviewed", "TEXT"),
];

const CARD_COLUMNS: &str = "id, deck_id, front, back, source, repetitions, ease_factor, \
                            interval_days, due_date, last_reviewed";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS decks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                deck_id INTEGER NOT NULL,
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                source TEXT,
                repetitions INTEGER NOT NULL DEFAULT 0,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                interval_days INTEGER NOT NULL DEFAULT 0,
                due_date TEXT NOT NULL DEFAULT (date('now', 'localtime')),
                last_reviewed TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS review_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id INTEGER NOT NULL,
                quality INTEGER NOT NULL CHECK(quality BETWEEN 0 AND 5),
                reviewed_on TEXT NOT NULL,
                interval_days INTEGER NOT NULL,
                ease_factor REAL NOT NULL,
                FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS notebooks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                notebook_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                source TEXT,
                repetitions INTEGER NOT NULL DEFAULT 0,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                interval_days INTEGER NOT NULL DEFAULT 0,
                due_date TEXT NOT NULL DEFAULT (date('now', 'localtime')),
                last_reviewed TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (notebook_id) REFERENCES notebooks(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS note_review_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                note_id INTEGER NOT NULL,
                quality INTEGER NOT NULL CHECK(quality BETWEEN 0 AND 5),
                reviewed_on TEXT NOT NULL,
                interval_days INTEGER NOT NULL,
                ease_factor REAL NOT NULL,
                FOREIGN KEY (note_id) REFERENCES notes(id) ON DELETE CASCADE
            );
            "#,
        )?;

        // Tables created by older versions may lack scheduling columns, so
        // migrate before indexing them
        self.migrate()?;

        self.conn.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id);
            CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(due_date);
            CREATE INDEX IF NOT EXISTS idx_history_card ON review_history(card_id);
            CREATE INDEX IF NOT EXISTS idx_notes_notebook ON notes(notebook_id);
            CREATE INDEX IF NOT EXISTS idx_notes_due ON notes(due_date);
            CREATE INDEX IF NOT EXISTS idx_note_history_note ON note_review_history(note_id);
            "#,
        )?;

        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        for table in ["cards", "notes"] {
            let columns = self.table_columns(table)?;
            for (name, definition) in SCHEDULE_COLUMNS {
                if !columns.iter().any(|c| c == name) {
                    info!(table, column = name, "adding missing column");
                    self.conn.execute_batch(&format!(
                        "ALTER TABLE {} ADD COLUMN {} {};",
                        table, name, definition
                    ))?;
                }
            }
            // ALTER TABLE cannot add a column with an expression default
            self.conn.execute(
                &format!(
                    "UPDATE {} SET due_date = date('now', 'localtime') WHERE due_date IS NULL",
                    table
                ),
                [],
            )?;
        }
        Ok(())
    }

    fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // Deck operations
    pub fn add_deck(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("deck name must not be empty".into()));
        }
        self.conn
            .execute("INSERT INTO decks (name) VALUES (?1)", params![name])?;
        let id = self.conn.last_insert_rowid();
        info!(deck_id = id, name, "created deck");
        Ok(id)
    }

    pub fn get_deck(&self, id: i64) -> Result<Option<Deck>> {
        let deck = self
            .conn
            .query_row(
                r#"
                SELECT d.id, d.name, d.created_at, COUNT(c.id)
                FROM decks d
                LEFT JOIN cards c ON c.deck_id = d.id
                WHERE d.id = ?1
                GROUP BY d.id
                "#,
                params![id],
                deck_from_row,
            )
            .optional()?;
        Ok(deck)
    }

    pub fn find_deck_by_name(&self, name: &str) -> Result<Option<Deck>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM decks WHERE name = ?1",
                params![name.trim()],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => self.get_deck(id),
            None => Ok(None),
        }
    }

    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT d.id, d.name, d.created_at, COUNT(c.id)
            FROM decks d
            LEFT JOIN cards c ON c.deck_id = d.id
            GROUP BY d.id
            ORDER BY d.name
            "#,
        )?;
        let rows = stmt.query_map([], deck_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_decks_with_stats(&self, today: NaiveDate) -> Result<Vec<DeckWithStats>> {
        self.list_decks()?
            .into_iter()
            .map(|deck| {
                let stats = self.deck_stats(deck.id, today)?;
                Ok(DeckWithStats { deck, stats })
            })
            .collect()
    }

    pub fn rename_deck(&self, id: i64, new_name: &str) -> Result<bool> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(Error::InvalidInput("deck name must not be empty".into()));
        }
        let rows = self.conn.execute(
            "UPDATE decks SET name = ?1 WHERE id = ?2",
            params![new_name, id],
        )?;
        Ok(rows > 0)
    }

    /// Deletes the deck and, through the cascade, its cards and their history.
    pub fn delete_deck(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        if rows > 0 {
            info!(deck_id = id, "deleted deck");
        }
        Ok(rows > 0)
    }

    /// Put every card in the deck back to the new-card state. Returns the
    /// number of cards reset.
    pub fn reset_deck(&self, id: i64, today: NaiveDate) -> Result<usize> {
        if self.get_deck(id)?.is_none() {
            return Err(Error::deck_not_found(id));
        }
        let rows = self.conn.execute(
            r#"
            UPDATE cards
            SET repetitions = 0,
                ease_factor = ?1,
                interval_days = 0,
                due_date = ?2,
                last_reviewed = NULL
            WHERE deck_id = ?3
            "#,
            params![INITIAL_EASE_FACTOR, today, id],
        )?;
        info!(deck_id = id, cards = rows, "reset deck schedule");
        Ok(rows)
    }

    pub fn deck_stats(&self, id: i64, today: NaiveDate) -> Result<DeckStats> {
        let stats = self.conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN last_reviewed IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN last_reviewed IS NOT NULL AND due_date > ?2 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN last_reviewed IS NOT NULL AND due_date <= ?2 THEN 1 ELSE 0 END), 0),
                COUNT(*)
            FROM cards
            WHERE deck_id = ?1
            "#,
            params![id, today],
            |row| {
                Ok(DeckStats {
                    new: row.get(0)?,
                    learning: row.get(1)?,
                    due: row.get(2)?,
                    total: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    // Card operations
    pub fn add_card(
        &self,
        deck_id: i64,
        front: &str,
        back: &str,
        source: Option<&str>,
        today: NaiveDate,
    ) -> Result<i64> {
        if self.get_deck(deck_id)?.is_none() {
            return Err(Error::deck_not_found(deck_id));
        }
        self.insert_card(deck_id, front, back, source, today)
    }

    fn insert_card(
        &self,
        deck_id: i64,
        front: &str,
        back: &str,
        source: Option<&str>,
        today: NaiveDate,
    ) -> Result<i64> {
        if front.trim().is_empty() || back.trim().is_empty() {
            return Err(Error::InvalidInput(
                "card front and back must not be empty".into(),
            ));
        }
        self.conn.execute(
            r#"
            INSERT INTO cards (deck_id, front, back, source, repetitions, ease_factor, interval_days, due_date)
            VALUES (?1, ?2, ?3, ?4, 0, ?5, 0, ?6)
            "#,
            params![deck_id, front, back, source, INITIAL_EASE_FACTOR, today],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(card_id = id, deck_id, "added card");
        Ok(id)
    }

    pub fn get_card(&self, id: i64) -> Result<Option<Card>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS),
                params![id],
                raw_card_from_row,
            )
            .optional()?;
        raw.map(RawCard::into_card).transpose()
    }

    pub fn list_cards(&self, deck_id: i64) -> Result<Vec<Card>> {
        self.query_cards(
            &format!("SELECT {} FROM cards WHERE deck_id = ?1 ORDER BY id", CARD_COLUMNS),
            params![deck_id],
        )
    }

    /// Edit the card text. Scheduling fields are left alone.
    pub fn update_card_text(
        &self,
        id: i64,
        front: Option<&str>,
        back: Option<&str>,
    ) -> Result<bool> {
        if front.is_some_and(|f| f.trim().is_empty()) || back.is_some_and(|b| b.trim().is_empty())
        {
            return Err(Error::InvalidInput(
                "card front and back must not be empty".into(),
            ));
        }
        let rows = self.conn.execute(
            r#"
            UPDATE cards
            SET front = COALESCE(?1, front),
                back = COALESCE(?2, back)
            WHERE id = ?3
            "#,
            params![front, back, id],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_card(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM cards WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Cards due on or before `as_of`, oldest due date first, ties by id.
    pub fn due_cards(&self, deck_id: Option<i64>, as_of: NaiveDate) -> Result<Vec<Card>> {
        match deck_id {
            Some(deck_id) => self.query_cards(
                &format!(
                    "SELECT {} FROM cards WHERE deck_id = ?1 AND due_date <= ?2 \
                     ORDER BY due_date ASC, id ASC",
                    CARD_COLUMNS
                ),
                params![deck_id, as_of],
            ),
            None => self.query_cards(
                &format!(
                    "SELECT {} FROM cards WHERE due_date <= ?1 ORDER BY due_date ASC, id ASC",
                    CARD_COLUMNS
                ),
                params![as_of],
            ),
        }
    }

    fn query_cards(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, raw_card_from_row)?;
        let cards = rows
            .map(|raw| raw?.into_card())
            .collect::<Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Grade a card and persist the outcome in one transaction.
    ///
    /// An invalid grade or a missing card leaves the database untouched.
    pub fn review_card(&self, card_id: i64, quality: i64, today: NaiveDate) -> Result<Card> {
        let tx = self.conn.unchecked_transaction()?;

        let card = self
            .get_card(card_id)?
            .ok_or_else(|| Error::card_not_found(card_id))?;
        let next = scheduler::grade(&card, quality, today)?;

        tx.execute(
            r#"
            UPDATE cards
            SET repetitions = ?1,
                ease_factor = ?2,
                interval_days = ?3,
                due_date = ?4,
                last_reviewed = ?5
            WHERE id = ?6
            "#,
            params![
                next.repetitions,
                next.ease_factor,
                next.interval_days,
                next.due_date,
                next.last_reviewed,
                card_id
            ],
        )?;
        tx.execute(
            r#"
            INSERT INTO review_history (card_id, quality, reviewed_on, interval_days, ease_factor)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![card_id, quality, today, next.interval_days, next.ease_factor],
        )?;
        tx.commit()?;

        info!(
            card_id,
            quality,
            due_date = %next.due_date,
            "recorded review"
        );
        Ok(next)
    }

    pub fn review_history(&self, card_id: i64) -> Result<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, card_id, quality, reviewed_on, interval_days, ease_factor
            FROM review_history
            WHERE card_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![card_id], |row| {
            Ok(ReviewRecord {
                id: row.get(0)?,
                item_id: row.get(1)?,
                quality: row.get(2)?,
                reviewed_on: row.get(3)?,
                interval_days: row.get(4)?,
                ease_factor: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Store a generated flashcard set. Cards go into `deck_name` (created if
    /// missing), or a deck named after the set header. All or nothing.
    pub fn import_set(
        &self,
        set: &GeneratedSet,
        deck_name: Option<&str>,
        today: NaiveDate,
    ) -> Result<(i64, usize)> {
        let name = deck_name.unwrap_or(&set.header);
        let tx = self.conn.unchecked_transaction()?;

        let deck_id = match self.find_deck_by_name(name)? {
            Some(deck) => deck.id,
            None => self.add_deck(name)?,
        };
        for card in &set.flashcards {
            self.insert_card(deck_id, &card.front, &card.back, card.data.as_deref(), today)?;
        }
        tx.commit()?;

        info!(deck_id, cards = set.flashcards.len(), "imported flashcard set");
        Ok((deck_id, set.flashcards.len()))
    }

    // Notebook operations
    pub fn add_notebook(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("notebook name must not be empty".into()));
        }
        self.conn
            .execute("INSERT INTO notebooks (name) VALUES (?1)", params![name])?;
        let id = self.conn.last_insert_rowid();
        info!(notebook_id = id, name, "created notebook");
        Ok(id)
    }

    pub fn get_notebook(&self, id: i64) -> Result<Option<Notebook>> {
        let notebook = self
            .conn
            .query_row(
                r#"
                SELECT b.id, b.name, b.created_at, COUNT(n.id)
                FROM notebooks b
                LEFT JOIN notes n ON n.notebook_id = b.id
                WHERE b.id = ?1
                GROUP BY b.id
                "#,
                params![id],
                notebook_from_row,
            )
            .optional()?;
        Ok(notebook)
    }

    pub fn find_notebook_by_name(&self, name: &str) -> Result<Option<Notebook>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM notebooks WHERE name = ?1",
                params![name.trim()],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => self.get_notebook(id),
            None => Ok(None),
        }
    }

    pub fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT b.id, b.name, b.created_at, COUNT(n.id)
            FROM notebooks b
            LEFT JOIN notes n ON n.notebook_id = b.id
            GROUP BY b.id
            ORDER BY b.name
            "#,
        )?;
        let rows = stmt.query_map([], notebook_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_notebooks_with_stats(&self, today: NaiveDate) -> Result<Vec<NotebookWithStats>> {
        self.list_notebooks()?
            .into_iter()
            .map(|notebook| {
                let stats = self.notebook_stats(notebook.id, today)?;
                Ok(NotebookWithStats { notebook, stats })
            })
            .collect()
    }

    pub fn rename_notebook(&self, id: i64, new_name: &str) -> Result<bool> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(Error::InvalidInput("notebook name must not be empty".into()));
        }
        let rows = self.conn.execute(
            "UPDATE notebooks SET name = ?1 WHERE id = ?2",
            params![new_name, id],
        )?;
        Ok(rows > 0)
    }

    /// Deletes the notebook together with its notes and their history.
    pub fn delete_notebook(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM notebooks WHERE id = ?1", params![id])?;
        if rows > 0 {
            info!(notebook_id = id, "deleted notebook");
        }
        Ok(rows > 0)
    }

    pub fn notebook_stats(&self, id: i64, today: NaiveDate) -> Result<NotebookStats> {
        let stats = self.conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN last_reviewed IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN last_reviewed IS NOT NULL AND due_date > ?2 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN last_reviewed IS NOT NULL AND due_date <= ?2 THEN 1 ELSE 0 END), 0),
                COUNT(*)
            FROM notes
            WHERE notebook_id = ?1
            "#,
            params![id, today],
            |row| {
                Ok(NotebookStats {
                    new: row.get(0)?,
                    learning: row.get(1)?,
                    due: row.get(2)?,
                    total: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    // Note operations
    pub fn add_note(
        &self,
        notebook_id: i64,
        title: &str,
        content: &str,
        source: Option<&str>,
        today: NaiveDate,
    ) -> Result<i64> {
        if self.get_notebook(notebook_id)?.is_none() {
            return Err(Error::notebook_not_found(notebook_id));
        }
        self.insert_note(notebook_id, title, content, source, today)
    }

    fn insert_note(
        &self,
        notebook_id: i64,
        title: &str,
        content: &str,
        source: Option<&str>,
        today: NaiveDate,
    ) -> Result<i64> {
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("note title must not be empty".into()));
        }
        self.conn.execute(
            r#"
            INSERT INTO notes (notebook_id, title, content, source, repetitions, ease_factor, interval_days, due_date)
            VALUES (?1, ?2, ?3, ?4, 0, ?5, 0, ?6)
            "#,
            params![notebook_id, title, content, source, INITIAL_EASE_FACTOR, today],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(note_id = id, notebook_id, "added note");
        Ok(id)
    }

    pub fn get_note(&self, id: i64) -> Result<Option<Note>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
                params![id],
                raw_note_from_row,
            )
            .optional()?;
        raw.map(RawNote::into_note).transpose()
    }

    pub fn list_notes(&self, notebook_id: i64) -> Result<Vec<Note>> {
        self.query_notes(
            &format!("SELECT {} FROM notes WHERE notebook_id = ?1 ORDER BY id", NOTE_COLUMNS),
            params![notebook_id],
        )
    }

    /// Edit the note title or content. Scheduling fields are left alone.
    pub fn update_note(&self, id: i64, title: Option<&str>, content: Option<&str>) -> Result<bool> {
        if title.is_some_and(|t| t.trim().is_empty()) {
            return Err(Error::InvalidInput("note title must not be empty".into()));
        }
        let rows = self.conn.execute(
            r#"
            UPDATE notes
            SET title = COALESCE(?1, title),
                content = COALESCE(?2, content)
            WHERE id = ?3
            "#,
            params![title, content, id],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_note(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Notes due on or before `as_of`, oldest due date first, ties by id.
    pub fn due_notes(&self, notebook_id: Option<i64>, as_of: NaiveDate) -> Result<Vec<Note>> {
        match notebook_id {
            Some(notebook_id) => self.query_notes(
                &format!(
                    "SELECT {} FROM notes WHERE notebook_id = ?1 AND due_date <= ?2 \
                     ORDER BY due_date ASC, id ASC",
                    NOTE_COLUMNS
                ),
                params![notebook_id, as_of],
            ),
            None => self.query_notes(
                &format!(
                    "SELECT {} FROM notes WHERE due_date <= ?1 ORDER BY due_date ASC, id ASC",
                    NOTE_COLUMNS
                ),
                params![as_of],
            ),
        }
    }

    fn query_notes(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, raw_note_from_row)?;
        let notes = rows
            .map(|raw| raw?.into_note())
            .collect::<Result<Vec<_>>>()?;
        Ok(notes)
    }

    /// Grade a note and persist the outcome in one transaction.
    pub fn review_note(&self, note_id: i64, quality: i64, today: NaiveDate) -> Result<Note> {
        let tx = self.conn.unchecked_transaction()?;

        let note = self
            .get_note(note_id)?
            .ok_or_else(|| Error::note_not_found(note_id))?;
        let next = scheduler::grade(&note, quality, today)?;

        tx.execute(
            r#"
            UPDATE notes
            SET repetitions = ?1,
                ease_factor = ?2,
                interval_days = ?3,
                due_date = ?4,
                last_reviewed = ?5
            WHERE id = ?6
            "#,
            params![
                next.repetitions,
                next.ease_factor,
                next.interval_days,
                next.due_date,
                next.last_reviewed,
                note_id
            ],
        )?;
        tx.execute(
            r#"
            INSERT INTO note_review_history (note_id, quality, reviewed_on, interval_days, ease_factor)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![note_id, quality, today, next.interval_days, next.ease_factor],
        )?;
        tx.commit()?;

        info!(note_id, quality, due_date = %next.due_date, "recorded note review");
        Ok(next)
    }

    pub fn note_review_history(&self, note_id: i64) -> Result<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, note_id, quality, reviewed_on, interval_days, ease_factor
            FROM note_review_history
            WHERE note_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![note_id], |row| {
            Ok(ReviewRecord {
                id: row.get(0)?,
                item_id: row.get(1)?,
                quality: row.get(2)?,
                reviewed_on: row.get(3)?,
                interval_days: row.get(4)?,
                ease_factor: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Store a generated note set in `notebook_name` (created if missing) or
    /// a notebook named after the header. All or nothing.
    pub fn import_notes(
        &self,
        set: &GeneratedNotes,
        notebook_name: Option<&str>,
        today: NaiveDate,
    ) -> Result<(i64, usize)> {
        let name = notebook_name.unwrap_or(&set.header);
        let tx = self.conn.unchecked_transaction()?;

        let notebook_id = match self.find_notebook_by_name(name)? {
            Some(notebook) => notebook.id,
            None => self.add_notebook(name)?,
        };
        for note in &set.notes {
            self.insert_note(notebook_id, &note.title, &note.content, note.data.as_deref(), today)?;
        }
        tx.commit()?;

        info!(notebook_id, notes = set.notes.len(), "imported note set");
        Ok((notebook_id, set.notes.len()))
    }

    pub fn get_stats(&self, today: NaiveDate) -> Result<Stats> {
        let total_decks: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM decks", [], |row| row.get(0))?;

        let total_cards: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;

        let total_reviews: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM review_history", [], |row| row.get(0))?;

        let new_cards: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE last_reviewed IS NULL",
            [],
            |row| row.get(0),
        )?;

        let due_now: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE due_date <= ?1",
            params![today],
            |row| row.get(0),
        )?;

        let avg_ease_factor: f64 = self.conn.query_row(
            "SELECT COALESCE(AVG(ease_factor), 0.0) FROM cards",
            [],
            |row| row.get(0),
        )?;

        let total_notebooks: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notebooks", [], |row| row.get(0))?;

        let total_notes: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;

        let notes_due: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE due_date <= ?1",
            params![today],
            |row| row.get(0),
        )?;

        Ok(Stats {
            total_decks,
            total_cards,
            total_reviews,
            new_cards,
            due_now,
            avg_ease_factor,
            total_notebooks,
            total_notes,
            notes_due,
        })
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Stats {
    pub total_decks: i64,
    pub total_cards: i64,
    pub total_reviews: i64,
    pub new_cards: i64,
    pub due_now: i64,
    pub avg_ease_factor: f64,
    pub total_notebooks: i64,
    pub total_notes: i64,
    pub notes_due: i64,
}

fn notebook_from_row(row: &Row) -> rusqlite::Result<Notebook> {
    Ok(Notebook {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        note_count: row.get(3)?,
    })
}

fn deck_from_row(row: &Row) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        card_count: row.get(3)?,
    })
}

// Card row as stored, before the invariants are checked.
struct RawCard {
    id: i64,
    deck_id: i64,
    front: String,
    back: String,
    source: Option<String>,
    repetitions: i64,
    ease_factor: f64,
    interval_days: i64,
    due_date: NaiveDate,
    last_reviewed: Option<NaiveDate>,
}

fn raw_card_from_row(row: &Row) -> rusqlite::Result<RawCard> {
    Ok(RawCard {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        source: row.get(4)?,
        repetitions: row.get(5)?,
        ease_factor: row.get(6)?,
        interval_days: row.get(7)?,
        due_date: row.get(8)?,
        last_reviewed: row.get(9)?,
    })
}

fn counter(name: &str, value: i64) -> std::result::Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{} {} is out of range", name, value))
}

impl RawCard {
    fn into_card(self) -> Result<Card> {
        let id = self.id;
        let invalid = |reason: String| Error::InvalidCard { id, reason };
        let repetitions = counter("repetitions", self.repetitions).map_err(invalid)?;
        let interval_days = counter("interval_days", self.interval_days).map_err(invalid)?;

        Card {
            id: self.id,
            deck_id: self.deck_id,
            front: self.front,
            back: self.back,
            source: self.source,
            repetitions,
            ease_factor: self.ease_factor,
            interval_days,
            due_date: self.due_date,
            last_reviewed: self.last_reviewed,
        }
        .validate()
    }
}

// Note row as stored, before the invariants are checked.
struct RawNote {
    id: i64,
    notebook_id: i64,
    title: String,
    content: String,
    source: Option<String>,
    repetitions: i64,
    ease_factor: f64,
    interval_days: i64,
    due_date: NaiveDate,
    last_reviewed: Option<NaiveDate>,
}

fn raw_note_from_row(row: &Row) -> rusqlite::Result<RawNote> {
    Ok(RawNote {
        id: row.get(0)?,
        notebook_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        source: row.get(4)?,
        repetitions: row.get(5)?,
        ease_factor: row.get(6)?,
        interval_days: row.get(7)?,
        due_date: row.get(8)?,
        last_reviewed: row.get(9)?,
    })
}

impl RawNote {
    fn into_note(self) -> Result<Note> {
        let id = self.id;
        let invalid = |reason: String| Error::InvalidNote { id, reason };
        let repetitions = counter("repetitions", self.repetitions).map_err(invalid)?;
        let interval_days = counter("interval_days", self.interval_days).map_err(invalid)?;

        Note {
            id: self.id,
            notebook_id: self.notebook_id,
            title: self.title,
            content: self.content,
            source: self.source,
            repetitions,
            ease_factor: self.ease_factor,
            interval_days,
            due_date: self.due_date,
            last_reviewed: self.last_reviewed,
        }
        .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::import::GeneratedCard;

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn deck_with_card(db: &Database) -> (i64, i64) {
        let deck = db.add_deck("Rust").unwrap();
        let card = db
            .add_card(deck, "What is ownership?", "A set of rules", None, day("2024-01-01"))
            .unwrap();
        (deck, card)
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            for table in [
                "decks",
                "cards",
                "review_history",
                "notebooks",
                "notes",
                "note_review_history",
            ] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })
                    .unwrap_or_else(|_| panic!("{} table should exist", table));
                assert_eq!(count, 0);
            }
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            deck_with_card(&db);

            db.init().expect("Re-init should succeed");

            assert_eq!(db.list_decks().unwrap().len(), 1);
            assert_eq!(db.get_stats(day("2024-01-01")).unwrap().total_cards, 1);
        }

        #[test]
        fn migrate_adds_missing_columns() {
            let db = Database::open(":memory:").unwrap();
            db.conn
                .execute_batch(
                    r#"
                    CREATE TABLE decks (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE,
                        created_at TEXT NOT NULL DEFAULT (datetime('now')));
                    CREATE TABLE cards (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        deck_id INTEGER NOT NULL,
                        front TEXT NOT NULL,
                        back TEXT NOT NULL,
                        repetitions INTEGER NOT NULL DEFAULT 0,
                        ease_factor REAL NOT NULL DEFAULT 2.5,
                        interval_days INTEGER NOT NULL DEFAULT 0,
                        due_date TEXT NOT NULL,
                        created_at TEXT NOT NULL DEFAULT (datetime('now'))
                    );
                    INSERT INTO decks (name) VALUES ('Old');
                    INSERT INTO cards (deck_id, front, back, due_date) VALUES (1, 'q', 'a', '2024-01-01');
                    "#,
                )
                .unwrap();

            db.init().unwrap();

            let card = db.get_card(1).unwrap().unwrap();
            assert!(card.source.is_none());
            assert!(card.last_reviewed.is_none());
        }

        #[test]
        fn migrate_adds_scheduling_columns_to_plain_card_table() {
            let db = Database::open(":memory:").unwrap();
            db.conn
                .execute_batch(
                    r#"
                    CREATE TABLE decks (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE,
                        created_at TEXT NOT NULL DEFAULT (datetime('now')));
                    CREATE TABLE cards (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        deck_id INTEGER NOT NULL,
                        front TEXT NOT NULL,
                        back TEXT NOT NULL
                    );
                    INSERT INTO decks (name) VALUES ('Old');
                    INSERT INTO cards (deck_id, front, back) VALUES (1, 'q', 'a');
                    "#,
                )
                .unwrap();

            db.init().unwrap();

            let card = db.get_card(1).unwrap().unwrap();
            assert_eq!(card.repetitions, 0);
            assert_eq!(card.ease_factor, INITIAL_EASE_FACTOR);
            assert_eq!(card.interval_days, 0);
            assert!(card.is_new());

            // The migrated card can be listed and graded like any other
            let today = card.due_date;
            assert_eq!(db.due_cards(Some(1), today).unwrap().len(), 1);
            let next = db.review_card(1, 4, today).unwrap();
            assert_eq!(next.repetitions, 1);
            assert_eq!(db.get_card(1).unwrap().unwrap(), next);
        }
    }

    mod deck_tests {
        use super::*;

        #[test]
        fn add_and_get_deck() {
            let db = setup_db();
            let id = db.add_deck("Biology").unwrap();
            let deck = db.get_deck(id).unwrap().unwrap();
            assert_eq!(deck.name, "Biology");
            assert_eq!(deck.card_count, 0);
        }

        #[test]
        fn add_deck_duplicate_name_fails() {
            let db = setup_db();
            db.add_deck("Biology").unwrap();
            assert!(matches!(db.add_deck("Biology"), Err(Error::Database(_))));
        }

        #[test]
        fn add_deck_empty_name_fails() {
            let db = setup_db();
            assert!(matches!(db.add_deck("  "), Err(Error::InvalidInput(_))));
        }

        #[test]
        fn list_decks_sorted_with_counts() {
            let db = setup_db();
            let z = db.add_deck("Zoology").unwrap();
            db.add_deck("Art").unwrap();
            db.add_card(z, "q", "a", None, day("2024-01-01")).unwrap();

            let decks = db.list_decks().unwrap();
            assert_eq!(decks[0].name, "Art");
            assert_eq!(decks[0].card_count, 0);
            assert_eq!(decks[1].name, "Zoology");
            assert_eq!(decks[1].card_count, 1);
        }

        #[test]
        fn rename_deck() {
            let db = setup_db();
            let id = db.add_deck("Old").unwrap();
            assert!(db.rename_deck(id, "New").unwrap());
            assert_eq!(db.get_deck(id).unwrap().unwrap().name, "New");
            assert!(!db.rename_deck(999, "Other").unwrap());
        }

        #[test]
        fn delete_deck_cascades_cards_and_history() {
            let db = setup_db();
            let (deck, card) = deck_with_card(&db);
            db.review_card(card, 4, day("2024-01-01")).unwrap();

            assert!(db.delete_deck(deck).unwrap());
            assert!(db.get_card(card).unwrap().is_none());
            assert!(db.review_history(card).unwrap().is_empty());
            assert!(!db.delete_deck(deck).unwrap());
        }

        #[test]
        fn find_deck_by_name() {
            let db = setup_db();
            let id = db.add_deck("Chemistry").unwrap();
            assert_eq!(db.find_deck_by_name("Chemistry").unwrap().unwrap().id, id);
            assert!(db.find_deck_by_name("Physics").unwrap().is_none());
        }

        #[test]
        fn reset_deck_restores_new_state() {
            let db = setup_db();
            let (deck, card) = deck_with_card(&db);
            db.review_card(card, 5, day("2024-01-01")).unwrap();
            db.review_card(card, 5, day("2024-01-02")).unwrap();

            let n = db.reset_deck(deck, day("2024-01-05")).unwrap();
            assert_eq!(n, 1);

            let c = db.get_card(card).unwrap().unwrap();
            assert_eq!(c.repetitions, 0);
            assert_eq!(c.ease_factor, INITIAL_EASE_FACTOR);
            assert_eq!(c.interval_days, 0);
            assert_eq!(c.due_date, day("2024-01-05"));
            assert!(c.last_reviewed.is_none());
        }

        #[test]
        fn reset_missing_deck_fails() {
            let db = setup_db();
            assert!(matches!(
                db.reset_deck(42, day("2024-01-01")),
                Err(Error::NotFound { .. })
            ));
        }

        #[test]
        fn deck_stats_splits_new_learning_due() {
            let db = setup_db();
            let deck = db.add_deck("Stats").unwrap();
            let today = day("2024-01-10");
            let _new = db.add_card(deck, "n", "n", None, today).unwrap();
            let learning = db.add_card(deck, "l", "l", None, today).unwrap();
            let due = db.add_card(deck, "d", "d", None, today).unwrap();

            db.review_card(learning, 5, today).unwrap(); // due tomorrow
            db.review_card(due, 1, day("2024-01-08")).unwrap(); // due 01-09

            let stats = db.deck_stats(deck, today).unwrap();
            assert_eq!(
                stats,
                DeckStats {
                    new: 1,
                    learning: 1,
                    due: 1,
                    total: 3
                }
            );
        }

        #[test]
        fn deck_stats_empty_deck() {
            let db = setup_db();
            let deck = db.add_deck("Empty").unwrap();
            assert_eq!(db.deck_stats(deck, day("2024-01-01")).unwrap(), DeckStats::default());
        }
    }

    mod card_tests {
        use super::*;

        #[test]
        fn add_card_starts_new_and_due() {
            let db = setup_db();
            let (_, id) = deck_with_card(&db);
            let card = db.get_card(id).unwrap().unwrap();
            assert_eq!(card.repetitions, 0);
            assert_eq!(card.ease_factor, 2.5);
            assert_eq!(card.interval_days, 0);
            assert_eq!(card.due_date, day("2024-01-01"));
            assert!(card.last_reviewed.is_none());
        }

        #[test]
        fn add_card_to_missing_deck_fails() {
            let db = setup_db();
            let result = db.add_card(99, "q", "a", None, day("2024-01-01"));
            assert!(matches!(result, Err(Error::NotFound { kind: "Deck", id: 99 })));
        }

        #[test]
        fn add_card_rejects_blank_text() {
            let db = setup_db();
            let deck = db.add_deck("D").unwrap();
            assert!(db.add_card(deck, " ", "a", None, day("2024-01-01")).is_err());
            assert!(db.add_card(deck, "q", "", None, day("2024-01-01")).is_err());
        }

        #[test]
        fn get_card_not_found() {
            let db = setup_db();
            assert!(db.get_card(999).unwrap().is_none());
        }

        #[test]
        fn list_cards_by_deck() {
            let db = setup_db();
            let a = db.add_deck("A").unwrap();
            let b = db.add_deck("B").unwrap();
            db.add_card(a, "1", "1", None, day("2024-01-01")).unwrap();
            db.add_card(b, "2", "2", None, day("2024-01-01")).unwrap();
            db.add_card(a, "3", "3", None, day("2024-01-01")).unwrap();

            let fronts: Vec<String> = db.list_cards(a).unwrap().into_iter().map(|c| c.front).collect();
            assert_eq!(fronts, vec!["1", "3"]);
        }

        #[test]
        fn update_card_text_keeps_schedule() {
            let db = setup_db();
            let (_, id) = deck_with_card(&db);
            let graded = db.review_card(id, 5, day("2024-01-01")).unwrap();

            assert!(db.update_card_text(id, None, Some("Rules about memory")).unwrap());

            let card = db.get_card(id).unwrap().unwrap();
            assert_eq!(card.front, "What is ownership?");
            assert_eq!(card.back, "Rules about memory");
            assert_eq!(card.repetitions, graded.repetitions);
            assert_eq!(card.due_date, graded.due_date);
        }

        #[test]
        fn update_missing_card() {
            let db = setup_db();
            assert!(!db.update_card_text(5, Some("x"), None).unwrap());
        }

        #[test]
        fn delete_card() {
            let db = setup_db();
            let (_, id) = deck_with_card(&db);
            assert!(db.delete_card(id).unwrap());
            assert!(!db.delete_card(id).unwrap());
        }

        #[test]
        fn stored_card_below_floor_is_rejected() {
            let db = setup_db();
            let (_, id) = deck_with_card(&db);
            db.conn
                .execute("UPDATE cards SET ease_factor = 1.0 WHERE id = ?1", params![id])
                .unwrap();
            assert!(matches!(db.get_card(id), Err(Error::InvalidCard { .. })));
        }

        #[test]
        fn stored_negative_counter_is_rejected() {
            let db = setup_db();
            let (_, id) = deck_with_card(&db);
            db.conn
                .execute("UPDATE cards SET repetitions = -2 WHERE id = ?1", params![id])
                .unwrap();
            assert!(matches!(db.get_card(id), Err(Error::InvalidCard { .. })));
        }
    }

    mod review_tests {
        use super::*;

        #[test]
        fn review_persists_schedule() {
            let db = setup_db();
            let (_, id) = deck_with_card(&db);

            let next = db.review_card(id, 5, day("2024-01-01")).unwrap();
            let stored = db.get_card(id).unwrap().unwrap();
            assert_eq!(stored, next);
            assert_eq!(stored.repetitions, 1);
            assert_eq!(stored.interval_days, 1);
            assert_eq!(stored.due_date, day("2024-01-02"));
            assert_eq!(stored.last_reviewed, Some(day("2024-01-01")));
        }

        #[test]
        fn review_sequence_follows_sm2() {
            let db = setup_db();
            let (_, id) = deck_with_card(&db);

            db.review_card(id, 5, day("2024-01-01")).unwrap();
            let second = db.review_card(id, 5, day("2024-01-02")).unwrap();
            assert_eq!(second.repetitions, 2);
            assert_eq!(second.interval_days, 6);

            let failed = db.review_card(id, 2, day("2024-01-08")).unwrap();
            assert_eq!(failed.repetitions, 0);
            assert_eq!(failed.interval_days, 1);
            assert!(failed.ease_factor >= 1.3);
        }

        #[test]
        fn invalid_quality_changes_nothing() {
            let db = setup_db();
            let (_, id) = deck_with_card(&db);
            let before = db.get_card(id).unwrap().unwrap();

            for q in [-1, 6] {
                let result = db.review_card(id, q, day("2024-01-01"));
                assert!(matches!(result, Err(Error::InvalidInput(_))));
            }

            assert_eq!(db.get_card(id).unwrap().unwrap(), before);
            assert!(db.review_history(id).unwrap().is_empty());
        }

        #[test]
        fn review_missing_card() {
            let db = setup_db();
            assert!(matches!(
                db.review_card(7, 4, day("2024-01-01")),
                Err(Error::NotFound { kind: "Card", id: 7 })
            ));
        }

        #[test]
        fn review_records_history() {
            let db = setup_db();
            let (_, id) = deck_with_card(&db);
            db.review_card(id, 4, day("2024-01-01")).unwrap();
            db.review_card(id, 0, day("2024-01-02")).unwrap();

            let history = db.review_history(id).unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(history[0].quality, 4);
            assert_eq!(history[0].reviewed_on, day("2024-01-01"));
            assert_eq!(history[1].quality, 0);
            assert_eq!(history[1].interval_days, 1);
        }
    }

    mod due_tests {
        use super::*;

        #[test]
        fn due_cards_ordered_and_filtered() {
            let db = setup_db();
            let deck = db.add_deck("D").unwrap();
            let a = db.add_card(deck, "a", "a", None, day("2024-01-05")).unwrap();
            let b = db.add_card(deck, "b", "b", None, day("2024-01-01")).unwrap();
            let c = db.add_card(deck, "c", "c", None, day("2024-01-05")).unwrap();
            let _future = db.add_card(deck, "d", "d", None, day("2024-02-01")).unwrap();

            let due: Vec<i64> = db
                .due_cards(None, day("2024-01-10"))
                .unwrap()
                .into_iter()
                .map(|c| c.id)
                .collect();
            assert_eq!(due, vec![b, a, c]);
        }

        #[test]
        fn due_cards_match_scheduler_order() {
            let db = setup_db();
            let deck = db.add_deck("D").unwrap();
            for (i, d) in ["2024-01-03", "2024-01-01", "2024-01-03", "2024-01-02"].iter().enumerate() {
                db.add_card(deck, &format!("q{}", i), "a", None, day(d)).unwrap();
            }
            let as_of = day("2024-01-02");
            let all = db.list_cards(deck).unwrap();
            let expected: Vec<i64> = scheduler::due_cards(&all, as_of).map(|c| c.id).collect();
            let actual: Vec<i64> = db
                .due_cards(Some(deck), as_of)
                .unwrap()
                .into_iter()
                .map(|c| c.id)
                .collect();
            assert_eq!(actual, expected);
        }

        #[test]
        fn due_cards_filter_by_deck() {
            let db = setup_db();
            let a = db.add_deck("A").unwrap();
            let b = db.add_deck("B").unwrap();
            db.add_card(a, "a", "a", None, day("2024-01-01")).unwrap();
            let in_b = db.add_card(b, "b", "b", None, day("2024-01-01")).unwrap();

            let due = db.due_cards(Some(b), day("2024-01-01")).unwrap();
            assert_eq!(due.len(), 1);
            assert_eq!(due[0].id, in_b);
        }

        #[test]
        fn reviewed_card_leaves_due_list() {
            let db = setup_db();
            let (_, id) = deck_with_card(&db);
            let today = day("2024-01-01");
            assert_eq!(db.due_cards(None, today).unwrap().len(), 1);
            db.review_card(id, 4, today).unwrap();
            assert!(db.due_cards(None, today).unwrap().is_empty());
            assert_eq!(db.due_cards(None, day("2024-01-02")).unwrap().len(), 1);
        }
    }

    mod import_tests {
        use super::*;

        fn set(header: &str, cards: &[(&str, &str)]) -> GeneratedSet {
            GeneratedSet {
                header: header.to_string(),
                flashcards: cards
                    .iter()
                    .map(|(f, b)| GeneratedCard {
                        front: f.to_string(),
                        back: b.to_string(),
                        data: Some(format!("source of {}", f)),
                    })
                    .collect(),
            }
        }

        #[test]
        fn import_creates_deck_from_header() {
            let db = setup_db();
            let s = set("Java: Identifiers", &[("q1", "a1"), ("q2", "a2")]);
            let (deck_id, n) = db.import_set(&s, None, day("2024-01-01")).unwrap();
            assert_eq!(n, 2);

            let deck = db.get_deck(deck_id).unwrap().unwrap();
            assert_eq!(deck.name, "Java: Identifiers");
            let cards = db.list_cards(deck_id).unwrap();
            assert_eq!(cards[0].source.as_deref(), Some("source of q1"));
            assert!(cards.iter().all(|c| c.is_new()));
        }

        #[test]
        fn import_into_existing_deck() {
            let db = setup_db();
            let existing = db.add_deck("Mine").unwrap();
            let (deck_id, _) = db
                .import_set(&set("Ignored", &[("q", "a")]), Some("Mine"), day("2024-01-01"))
                .unwrap();
            assert_eq!(deck_id, existing);
            assert!(db.find_deck_by_name("Ignored").unwrap().is_none());
        }

        #[test]
        fn failed_import_rolls_back() {
            let db = setup_db();
            let s = set("Broken", &[("q1", "a1"), ("q2", "")]);
            assert!(db.import_set(&s, None, day("2024-01-01")).is_err());
            assert!(db.find_deck_by_name("Broken").unwrap().is_none());
            assert_eq!(db.get_stats(day("2024-01-01")).unwrap().total_cards, 0);
        }
    }

    mod notebook_tests {
        use super::*;

        #[test]
        fn add_list_rename_notebook() {
            let db = setup_db();
            let id = db.add_notebook("Chemistry").unwrap();
            db.add_notebook("Algebra").unwrap();

            let names: Vec<String> =
                db.list_notebooks().unwrap().into_iter().map(|n| n.name).collect();
            assert_eq!(names, vec!["Algebra", "Chemistry"]);

            assert!(db.rename_notebook(id, "Organic Chemistry").unwrap());
            assert_eq!(db.get_notebook(id).unwrap().unwrap().name, "Organic Chemistry");
            assert!(!db.rename_notebook(999, "Nope").unwrap());
        }

        #[test]
        fn blank_notebook_name_rejected() {
            let db = setup_db();
            assert!(matches!(db.add_notebook("  "), Err(Error::InvalidInput(_))));
        }

        #[test]
        fn delete_notebook_cascades_to_notes() {
            let db = setup_db();
            let nb = db.add_notebook("Temp").unwrap();
            let note = db.add_note(nb, "T", "C", None, day("2024-01-01")).unwrap();
            db.review_note(note, 4, day("2024-01-01")).unwrap();

            assert!(db.delete_notebook(nb).unwrap());
            assert!(db.get_note(note).unwrap().is_none());
            let history: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM note_review_history", [], |row| row.get(0))
                .unwrap();
            assert_eq!(history, 0);
        }

        #[test]
        fn notebook_stats_split_new_learning_due() {
            let db = setup_db();
            let nb = db.add_notebook("Stats").unwrap();
            let a = db.add_note(nb, "a", "", None, day("2024-01-01")).unwrap();
            let b = db.add_note(nb, "b", "", None, day("2024-01-01")).unwrap();
            db.add_note(nb, "c", "", None, day("2024-01-01")).unwrap();
            db.review_note(a, 5, day("2024-01-01")).unwrap(); // due 01-02
            db.review_note(b, 0, day("2023-12-20")).unwrap(); // due 12-21

            let stats = db.notebook_stats(nb, day("2024-01-01")).unwrap();
            assert_eq!(
                stats,
                NotebookStats {
                    new: 1,
                    learning: 1,
                    due: 1,
                    total: 3
                }
            );
            let listed = db.list_notebooks_with_stats(day("2024-01-01")).unwrap();
            assert_eq!(listed[0].stats, stats);
            assert_eq!(listed[0].notebook.note_count, 3);
        }
    }

    mod note_tests {
        use super::*;

        fn notebook_with_note(db: &Database) -> (i64, i64) {
            let nb = db.add_notebook("Rust").unwrap();
            let note = db
                .add_note(
                    nb,
                    "Lifetimes",
                    "References must not outlive data",
                    Some("ch. 10"),
                    day("2024-01-01"),
                )
                .unwrap();
            (nb, note)
        }

        #[test]
        fn add_and_get_note() {
            let db = setup_db();
            let (nb, id) = notebook_with_note(&db);
            let note = db.get_note(id).unwrap().unwrap();
            assert_eq!(note.notebook_id, nb);
            assert_eq!(note.title, "Lifetimes");
            assert_eq!(note.source.as_deref(), Some("ch. 10"));
            assert_eq!(note.ease_factor, INITIAL_EASE_FACTOR);
            assert!(note.is_new());
        }

        #[test]
        fn add_note_to_missing_notebook() {
            let db = setup_db();
            assert!(matches!(
                db.add_note(42, "T", "C", None, day("2024-01-01")),
                Err(Error::NotFound { kind: "Notebook", id: 42 })
            ));
        }

        #[test]
        fn update_note_keeps_schedule() {
            let db = setup_db();
            let (_, id) = notebook_with_note(&db);
            let reviewed = db.review_note(id, 5, day("2024-01-01")).unwrap();

            assert!(db.update_note(id, None, Some("Updated body")).unwrap());
            let note = db.get_note(id).unwrap().unwrap();
            assert_eq!(note.title, "Lifetimes");
            assert_eq!(note.content, "Updated body");
            assert_eq!(note.due_date, reviewed.due_date);
            assert!(matches!(db.update_note(id, Some(""), None), Err(Error::InvalidInput(_))));
        }

        #[test]
        fn review_note_persists_and_logs_history() {
            let db = setup_db();
            let (_, id) = notebook_with_note(&db);
            db.review_note(id, 5, day("2024-01-01")).unwrap();
            let second = db.review_note(id, 5, day("2024-01-02")).unwrap();

            assert_eq!(second.repetitions, 2);
            assert_eq!(second.interval_days, 6);
            assert_eq!(second.due_date, day("2024-01-08"));
            assert_eq!(db.get_note(id).unwrap().unwrap(), second);

            let history = db.note_review_history(id).unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(history[1].item_id, id);
            assert_eq!(history[1].interval_days, 6);
        }

        #[test]
        fn invalid_grade_leaves_note_untouched() {
            let db = setup_db();
            let (_, id) = notebook_with_note(&db);
            let before = db.get_note(id).unwrap().unwrap();
            for q in [-1, 6] {
                assert!(matches!(
                    db.review_note(id, q, day("2024-01-01")),
                    Err(Error::InvalidInput(_))
                ));
            }
            assert_eq!(db.get_note(id).unwrap().unwrap(), before);
            assert!(db.note_review_history(id).unwrap().is_empty());
        }

        #[test]
        fn review_missing_note() {
            let db = setup_db();
            assert!(matches!(
                db.review_note(7, 4, day("2024-01-01")),
                Err(Error::NotFound { kind: "Note", id: 7 })
            ));
        }

        #[test]
        fn due_notes_ordered_and_filtered() {
            let db = setup_db();
            let nb = db.add_notebook("A").unwrap();
            let other = db.add_notebook("B").unwrap();
            let first = db.add_note(nb, "1", "", None, day("2024-01-05")).unwrap();
            let second = db.add_note(nb, "2", "", None, day("2024-01-03")).unwrap();
            db.add_note(nb, "3", "", None, day("2024-02-01")).unwrap();
            let elsewhere = db.add_note(other, "4", "", None, day("2024-01-01")).unwrap();

            let ids: Vec<i64> = db
                .due_notes(Some(nb), day("2024-01-10"))
                .unwrap()
                .iter()
                .map(|n| n.id)
                .collect();
            assert_eq!(ids, vec![second, first]);

            let all: Vec<i64> = db
                .due_notes(None, day("2024-01-10"))
                .unwrap()
                .iter()
                .map(|n| n.id)
                .collect();
            assert_eq!(all, vec![elsewhere, second, first]);
        }

        #[test]
        fn corrupt_note_row_is_rejected() {
            let db = setup_db();
            let (_, id) = notebook_with_note(&db);
            db.conn
                .execute("UPDATE notes SET ease_factor = 0.5 WHERE id = ?1", params![id])
                .unwrap();
            assert!(matches!(db.get_note(id), Err(Error::InvalidNote { .. })));
        }

        #[test]
        fn delete_note() {
            let db = setup_db();
            let (_, id) = notebook_with_note(&db);
            assert!(db.delete_note(id).unwrap());
            assert!(!db.delete_note(id).unwrap());
        }
    }

    mod note_import_tests {
        use super::*;
        use crate::import::GeneratedNote;

        fn notes(header: &str, items: &[(&str, &str)]) -> GeneratedNotes {
            GeneratedNotes {
                header: header.to_string(),
                notes: items
                    .iter()
                    .map(|(t, c)| GeneratedNote {
                        title: t.to_string(),
                        content: c.to_string(),
                        data: None,
                    })
                    .collect(),
            }
        }

        #[test]
        fn import_creates_notebook_from_header() {
            let db = setup_db();
            let set = notes("Biology: Cells", &[("Mitosis", "..."), ("Meiosis", "...")]);
            let (nb, n) = db.import_notes(&set, None, day("2024-01-01")).unwrap();
            assert_eq!(n, 2);
            assert_eq!(db.get_notebook(nb).unwrap().unwrap().name, "Biology: Cells");
            assert_eq!(db.list_notes(nb).unwrap().len(), 2);
        }

        #[test]
        fn failed_import_rolls_back() {
            let db = setup_db();
            let set = notes("Broken", &[("ok", "body"), (" ", "body")]);
            assert!(db.import_notes(&set, None, day("2024-01-01")).is_err());
            assert!(db.find_notebook_by_name("Broken").unwrap().is_none());
        }
    }

    mod stats_tests {
        use super::*;

        #[test]
        fn stats_empty_db() {
            let db = setup_db();
            let stats = db.get_stats(day("2024-01-01")).unwrap();
            assert_eq!(stats.total_decks, 0);
            assert_eq!(stats.total_cards, 0);
            assert_eq!(stats.total_reviews, 0);
            assert_eq!(stats.due_now, 0);
            assert_eq!(stats.avg_ease_factor, 0.0);
        }

        #[test]
        fn stats_counts_everything() {
            let db = setup_db();
            let (deck, card) = deck_with_card(&db);
            db.add_card(deck, "q2", "a2", None, day("2024-01-01")).unwrap();
            db.review_card(card, 5, day("2024-01-01")).unwrap();

            let stats = db.get_stats(day("2024-01-01")).unwrap();
            assert_eq!(stats.total_decks, 1);
            assert_eq!(stats.total_cards, 2);
            assert_eq!(stats.total_reviews, 1);
            assert_eq!(stats.new_cards, 1);
            assert_eq!(stats.due_now, 1);
            assert!((stats.avg_ease_factor - 2.55).abs() < 1e-9);
        }

        #[test]
        fn stats_count_notes() {
            let db = setup_db();
            let nb = db.add_notebook("N").unwrap();
            let note = db.add_note(nb, "a", "", None, day("2024-01-01")).unwrap();
            db.add_note(nb, "b", "", None, day("2024-01-01")).unwrap();
            db.review_note(note, 4, day("2024-01-01")).unwrap();

            let stats = db.get_stats(day("2024-01-01")).unwrap();
            assert_eq!(stats.total_notebooks, 1);
            assert_eq!(stats.total_notes, 2);
            assert_eq!(stats.notes_due, 1);
            assert_eq!(stats.total_reviews, 0);
        }
    }
}
