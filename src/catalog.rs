/// Catalog feed loading
///
/// The online catalog is distributed as a JSON document listing every
/// downloadable book. Parsing happens on a blocking task; the parsed books are
/// handed back to the owning thread, which writes them with
/// `Library::apply_feed` so the changes reach the synchronizer as mutations.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;
use tokio::task;

use crate::error::Result;
use crate::state::data::Book;

/// Top-level feed document
#[derive(Debug, Deserialize)]
pub struct CatalogFeed {
    pub books: Vec<Book>,
}

/// Parse a feed, dropping entries without an id
pub fn parse_feed(json: &str) -> Result<Vec<Book>> {
    let feed: CatalogFeed = serde_json::from_str(json)?;
    let total = feed.books.len();
    let books: Vec<Book> = feed
        .books
        .into_iter()
        .filter_map(|mut book| {
            book.id = book.id.trim().to_string();
            if book.id.is_empty() {
                return None;
            }
            // Only the device decides what is local
            book.is_local = false;
            Some(book)
        })
        .collect();
    if books.len() < total {
        warn!("Dropped {} feed entries without an id", total - books.len());
    }
    Ok(books)
}

/// Read and parse a feed file in the background
pub async fn load_feed(path: PathBuf) -> Result<Vec<Book>> {
    task::spawn_blocking(move || load_feed_blocking(&path)).await?
}

fn load_feed_blocking(path: &Path) -> Result<Vec<Book>> {
    let json = std::fs::read_to_string(path)?;
    let books = parse_feed(&json)?;
    info!("Loaded {} books from {}", books.len(), path.display());
    Ok(books)
}
