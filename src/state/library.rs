use chrono::{NaiveDate, Utc};
use log::{debug, info};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use super::data::{Book, Language};
use super::sync::{mutation_channel, Mutation, MutationKind, MutationReceiver, MutationSender};
use crate::config::AppConfig;
use crate::error::{LibraryError, Result};

/// Column list shared by every book query, in `book_from_row` order
const BOOK_COLUMNS: &str = "id, title, language_name, is_local, is_no_pic, favicon, \
     file_size, article_count, date, creator, description";

/// Outcome of applying a catalog feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

/// The Library manages the SQLite catalog database.
/// It stores the books of the online catalog, their download state and the
/// user's language preferences. Every committed change to a book is announced
/// as a `Mutation` on the subscribed channel.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
    notifier: Option<MutationSender>,
}

impl Library {
    /// Open (or create) the catalog database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        info!("Catalog database opened at {}", db_path.display());

        let library = Library { conn, db_path, notifier: None };
        library.init_schema()?;
        Ok(library)
    }

    /// Open the database in the configured data directory:
    /// - Linux: ~/.local/share/kiwix-library/library.db
    /// - macOS: ~/Library/Application Support/kiwix-library/library.db
    /// - Windows: %APPDATA%\kiwix-library\library.db
    pub fn open_default(config: &AppConfig) -> Result<Self> {
        Self::open(config.database_path()?)
    }

    /// Throwaway database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let library = Library {
            conn,
            db_path: PathBuf::from(":memory:"),
            notifier: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS books (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                language_name   TEXT,
                is_local        INTEGER NOT NULL DEFAULT 0,
                is_no_pic       INTEGER,
                favicon         BLOB,
                file_size       INTEGER NOT NULL DEFAULT 0,
                article_count   INTEGER,
                date            TEXT,
                creator         TEXT,
                description     TEXT,
                updated_at      INTEGER NOT NULL
            )",
            [],
        )?;

        // User preference: which languages the online list shows
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS languages (
                name            TEXT PRIMARY KEY,
                is_displayed    INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        // Matches the canonical list order (language, title, id)
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_books_order
             ON books(language_name, title, id)",
            [],
        )?;

        debug!("Catalog schema initialized");
        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Start receiving mutation notifications. A new subscription replaces
    /// the previous one.
    pub fn subscribe(&mut self) -> MutationReceiver {
        let (sender, receiver) = mutation_channel();
        self.notifier = Some(sender);
        receiver
    }

    fn emit(&self, mutation: Mutation) {
        if let Some(sender) = &self.notifier {
            if sender.send(mutation).is_err() {
                debug!("Mutation receiver dropped, notification discarded");
            }
        }
    }

    /// Get a count of books in the catalog
    pub fn book_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_book(&self, id: &str) -> Result<Option<Book>> {
        read_book(&self.conn, id)
    }

    /// All books in canonical order: language name, title, id
    pub fn query_sorted(&self) -> Result<Vec<Book>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM books ORDER BY language_name, title, id",
            BOOK_COLUMNS
        ))?;
        let books = stmt
            .query_map([], book_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    /// Add a new book. Fails if the id already exists.
    pub fn insert_book(&self, book: &Book) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO books ({}, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                BOOK_COLUMNS
            ),
            params_from_iter(book_params(book)),
        )?;
        register_language(&self.conn, book)?;
        self.emit(Mutation::insert(book.clone()));
        Ok(())
    }

    /// Insert or replace a book, reporting how the change affects ordering
    pub fn upsert_book(&self, book: &Book) -> Result<MutationKind> {
        let kind = upsert(&self.conn, book)?;
        self.emit(Mutation { kind, book: book.clone() });
        Ok(kind)
    }

    /// Delete a book. Returns false if it did not exist.
    pub fn delete_book(&self, id: &str) -> Result<bool> {
        let Some(book) = read_book(&self.conn, id)? else {
            return Ok(false);
        };
        self.conn
            .execute("DELETE FROM books WHERE id = ?1", params![id])?;
        self.emit(Mutation::delete(book));
        Ok(true)
    }

    /// Mark a book as present (or no longer present) on the device.
    /// Returns false if the flag already had that value.
    pub fn set_local(&self, id: &str, is_local: bool) -> Result<bool> {
        let mut book = read_book(&self.conn, id)?
            .ok_or_else(|| LibraryError::BookNotFound(id.to_string()))?;
        if book.is_local == is_local {
            return Ok(false);
        }
        self.conn.execute(
            "UPDATE books SET is_local = ?1, updated_at = ?2 WHERE id = ?3",
            params![is_local, Utc::now().timestamp(), id],
        )?;
        book.is_local = is_local;
        self.emit(Mutation::update(book));
        Ok(true)
    }

    /// Replace the online catalog with the books of a feed.
    ///
    /// Known books keep their local flag; books that vanished from the feed
    /// are removed unless they are on the device.
    pub fn apply_feed(&self, books: Vec<Book>) -> Result<RefreshSummary> {
        let tx = self.conn.unchecked_transaction()?;
        let mut summary = RefreshSummary::default();
        let mut pending = Vec::new();
        let mut in_feed = HashSet::new();

        for mut book in books {
            if !in_feed.insert(book.id.clone()) {
                debug!("Skipping duplicate feed entry {}", book.id);
                continue;
            }
            let existing = read_book(&tx, &book.id)?;
            if let Some(existing) = &existing {
                book.is_local = existing.is_local;
                if existing == &book {
                    continue;
                }
            }
            let kind = upsert(&tx, &book)?;
            match kind {
                MutationKind::Insert => summary.inserted += 1,
                _ => summary.updated += 1,
            }
            pending.push(Mutation { kind, book });
        }

        let stale: Vec<Book> = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM books WHERE is_local = 0 ORDER BY id",
                BOOK_COLUMNS
            ))?;
            let rows = stmt.query_map([], book_from_row)?;
            let mut stale = Vec::new();
            for book in rows {
                let book = book?;
                if !in_feed.contains(&book.id) {
                    stale.push(book);
                }
            }
            stale
        };
        for book in stale {
            tx.execute("DELETE FROM books WHERE id = ?1", params![book.id])?;
            summary.removed += 1;
            pending.push(Mutation::delete(book));
        }

        tx.commit()?;
        for mutation in pending {
            self.emit(mutation);
        }

        info!(
            "Catalog refreshed: {} new, {} updated, {} removed",
            summary.inserted, summary.updated, summary.removed
        );
        Ok(summary)
    }

    /// All known languages with their display preference and book counts
    pub fn languages(&self) -> Result<Vec<Language>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.name, l.is_displayed, COUNT(b.id)
             FROM languages l LEFT JOIN books b ON b.language_name = l.name
             GROUP BY l.name, l.is_displayed
             ORDER BY l.name",
        )?;
        let languages = stmt
            .query_map([], |row| {
                Ok(Language {
                    name: row.get(0)?,
                    is_displayed: row.get(1)?,
                    book_count: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(languages)
    }

    /// Languages the user chose to display. Empty means "show everything".
    pub fn displayed_languages(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM languages WHERE is_displayed = 1")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<String>>>()?;
        Ok(names)
    }

    pub fn set_language_displayed(&self, name: &str, displayed: bool) -> Result<()> {
        self.conn.execute(
            "INSERT INTO languages (name, is_displayed) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET is_displayed = excluded.is_displayed",
            params![name, displayed],
        )?;
        debug!("Language {} displayed: {}", name, displayed);
        Ok(())
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .field("subscribed", &self.notifier.is_some())
            .finish()
    }
}

fn read_book(conn: &Connection, id: &str) -> Result<Option<Book>> {
    let book = conn
        .query_row(
            &format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS),
            params![id],
            book_from_row,
        )
        .optional()?;
    Ok(book)
}

fn upsert(conn: &Connection, book: &Book) -> Result<MutationKind> {
    let kind = match read_book(conn, &book.id)? {
        None => MutationKind::Insert,
        Some(existing) if existing.same_position_key(book) => MutationKind::Update,
        Some(_) => MutationKind::Move,
    };
    conn.execute(
        &format!(
            "INSERT INTO books ({}, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                language_name = excluded.language_name,
                is_local = excluded.is_local,
                is_no_pic = excluded.is_no_pic,
                favicon = excluded.favicon,
                file_size = excluded.file_size,
                article_count = excluded.article_count,
                date = excluded.date,
                creator = excluded.creator,
                description = excluded.description,
                updated_at = excluded.updated_at",
            BOOK_COLUMNS
        ),
        params_from_iter(book_params(book)),
    )?;
    register_language(conn, book)?;
    Ok(kind)
}

fn register_language(conn: &Connection, book: &Book) -> Result<()> {
    if let Some(name) = book.section_name() {
        conn.execute(
            "INSERT OR IGNORE INTO languages (name) VALUES (?1)",
            params![name],
        )?;
    }
    Ok(())
}

fn book_params(book: &Book) -> Vec<Box<dyn rusqlite::ToSql>> {
    vec![
        Box::new(book.id.clone()),
        Box::new(book.title.clone()),
        Box::new(book.language.clone()),
        Box::new(book.is_local),
        Box::new(book.is_no_pic),
        Box::new(book.favicon.clone()),
        Box::new(book.file_size as i64),
        Box::new(book.article_count.map(|count| count as i64)),
        Box::new(book.date.map(|date| date.format("%Y-%m-%d").to_string())),
        Box::new(book.creator.clone()),
        Box::new(book.description.clone()),
        Box::new(Utc::now().timestamp()),
    ]
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let date: Option<String> = row.get(8)?;
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        language: row.get(2)?,
        is_local: row.get(3)?,
        is_no_pic: row.get(4)?,
        favicon: row.get(5)?,
        file_size: row.get::<_, i64>(6)? as u64,
        article_count: row.get::<_, Option<i64>>(7)?.map(|count| count as u64),
        date: date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        creator: row.get(9)?,
        description: row.get(10)?,
    })
}
