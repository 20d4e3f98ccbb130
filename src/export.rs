use crate::config::{
    book_file_name, book_file_name_by_id, COLLECTION_FILE, KEYWORDS_FILE, PEOPLE_FILE, PLACES_FILE, SOURCES_FILE,
};
use crate::models::{Book, Keyword, Page};
use crate::pipeline::Archive;
use crate::records::Collection;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct BookDocument<'a> {
    book: &'a Book,
    pages: Vec<&'a Page>,
}

#[derive(Serialize)]
struct KeywordDocument<'a> {
    ids: &'a Collection<Keyword>,
    keywords: &'a BTreeMap<String, String>,
}

/// Serializes `value` to a temporary sibling of `path`, then renames it into place.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp output file: {:?}", tmp_path))?;
    let mut writer = BufWriter::new(file);

    let serialized = if pretty {
        serde_json::to_writer_pretty(&mut writer, value)
    } else {
        serde_json::to_writer(&mut writer, value)
    };
    serialized.with_context(|| format!("Failed to serialize {:?}", path))?;

    writer
        .flush()
        .with_context(|| format!("Failed to flush temp output file: {:?}", tmp_path))?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to rename temp output file to: {:?}", path))?;

    debug!(path = ?path, "Wrote document");
    Ok(())
}

pub(crate) fn make_progress_bar(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "    {label:<10} [{{bar:30.cyan/blue}}] {{pos}}/{{len}}"
        ))
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

struct Exporter<'a> {
    dir: &'a Path,
    pretty: bool,
    written: Vec<PathBuf>,
}

impl Exporter<'_> {
    fn emit<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        write_json(&path, value, self.pretty)?;
        self.written.push(path);
        Ok(())
    }
}

/// Names a book's document after its number. A blank number, or one already
/// used by an earlier book, falls back to the book's identifier.
fn book_document_name(book: &Book, taken: &mut FxHashSet<String>) -> String {
    if !book.number.trim().is_empty() {
        let name = book_file_name(&book.number);
        if taken.insert(name.clone()) {
            return name;
        }
        warn!(
            book = book.id.as_str(),
            number = book.number.as_str(),
            "Book number already used, naming by ID"
        );
    } else {
        warn!(book = book.id.as_str(), "Book has no number, naming by ID");
    }
    let name = book_file_name_by_id(&book.id);
    taken.insert(name.clone());
    name
}

/// Writes every output document of a built archive and returns their paths.
pub fn export_archive(archive: &Archive, output_dir: &Path, pretty: bool) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut out = Exporter {
        dir: output_dir,
        pretty,
        written: Vec::new(),
    };

    out.emit(COLLECTION_FILE, &archive.collection)?;

    let books: Vec<&Book> = archive.books.indexed().collect();
    let pb = make_progress_bar(books.len() as u64, "books");
    let mut taken = FxHashSet::default();
    for book in books {
        let document = BookDocument {
            book,
            pages: archive.pages_of(book).collect(),
        };
        out.emit(&book_document_name(book, &mut taken), &document)?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    out.emit(PEOPLE_FILE, &archive.people)?;
    out.emit(PLACES_FILE, &archive.places)?;
    out.emit(SOURCES_FILE, &archive.sources)?;
    out.emit(
        KEYWORDS_FILE,
        &KeywordDocument {
            ids: &archive.keywords,
            keywords: archive.collection.keywords.keywords_to_ids(),
        },
    )?;

    info!(documents = out.written.len(), dir = ?output_dir, "Export complete");
    Ok(out.written)
}
