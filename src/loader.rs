use crate::config::{
    BOOKS_STEM, PAGES_STEM, PAGE_PEOPLE_JOIN_STEM, PAGE_PLACES_JOIN_STEM, PAGE_SOURCES_JOIN_STEM,
    PEOPLE_STEM, PLACES_STEM, SOURCES_STEM, SOURCE_PEOPLE_JOIN_STEM,
};
use crate::records::RecordSet;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Every record set the archive is built from, as exported.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub books: RecordSet,
    pub pages: RecordSet,
    pub people: RecordSet,
    pub places: RecordSet,
    pub sources: RecordSet,
    pub page_people: RecordSet,
    pub page_places: RecordSet,
    pub page_sources: RecordSet,
    pub source_people: RecordSet,
}

/// `<dir>/<stem>_<date>.json`, or `<dir>/<stem>.json` without a date.
pub fn input_path(dir: &Path, stem: &str, date: Option<&str>) -> PathBuf {
    match date {
        Some(date) => dir.join(format!("{}_{}.json", stem, date)),
        None => dir.join(format!("{}.json", stem)),
    }
}

pub fn read_record_set(path: &Path, name: &str) -> Result<RecordSet> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read record set '{}': {:?}", name, path))?;
    let set = RecordSet::from_json(name, &text)
        .with_context(|| format!("Failed to parse record set '{}': {:?}", name, path))?;
    info!(record_set = name, records = set.len(), "Read record set");
    Ok(set)
}

fn read_optional(path: &Path, name: &str) -> Result<RecordSet> {
    if !path.exists() {
        warn!(record_set = name, path = ?path, "Join export missing, treating as empty");
        return Ok(RecordSet::empty(name));
    }
    read_record_set(path, name)
}

impl RawInputs {
    /// Entity exports are required; join exports may be absent.
    pub fn load(dir: &Path, date: Option<&str>) -> Result<Self> {
        let entity = |stem: &str, name: &str| read_record_set(&input_path(dir, stem, date), name);
        let join = |stem: &str, name: &str| read_optional(&input_path(dir, stem, date), name);

        Ok(Self {
            books: entity(BOOKS_STEM, "books")?,
            pages: entity(PAGES_STEM, "pages")?,
            people: entity(PEOPLE_STEM, "people")?,
            places: entity(PLACES_STEM, "places")?,
            sources: entity(SOURCES_STEM, "sources")?,
            page_people: join(PAGE_PEOPLE_JOIN_STEM, "page_people_join")?,
            page_places: join(PAGE_PLACES_JOIN_STEM, "page_places_join")?,
            page_sources: join(PAGE_SOURCES_JOIN_STEM, "page_sources_join")?,
            source_people: join(SOURCE_PEOPLE_JOIN_STEM, "source_people_join")?,
        })
    }
}
