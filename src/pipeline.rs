use crate::cooccurrence::{self, Located};
use crate::describe::DescriptionFormatter;
use crate::joins::{self, JoinOutcome};
use crate::keywords;
use crate::loader::RawInputs;
use crate::models::{Book, CollectionStats, Keyword, Page, Person, Place, Source};
use crate::records::{Collection, Entity, RecordSet};
use crate::stats;
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Problems found in the input that the build tolerates.
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    /// Record set name and the identifiers it repeats
    pub duplicates: Vec<(String, Vec<String>)>,
    pub joins: Vec<(&'static str, JoinOutcome)>,
    /// Pages whose `book_id` names no book
    pub orphan_pages: Vec<String>,
}

impl IntegrityReport {
    pub fn has_orphans(&self) -> bool {
        !self.orphan_pages.is_empty()
    }

    pub fn dangling_rows(&self) -> usize {
        self.joins.iter().map(|(_, outcome)| outcome.dangling).sum()
    }

    pub fn duplicate_ids(&self) -> usize {
        self.duplicates.iter().map(|(_, ids)| ids.len()).sum()
    }

    fn note_duplicates<T>(&mut self, name: &str, collection: &Collection<T>) {
        if !collection.duplicates().is_empty() {
            self.duplicates
                .push((name.to_string(), collection.duplicates().to_vec()));
        }
    }
}

/// Every entity collection plus the collection-level rollups.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    pub books: Collection<Book>,
    pub pages: Collection<Page>,
    pub people: Collection<Person>,
    pub places: Collection<Place>,
    pub sources: Collection<Source>,
    pub keywords: Collection<Keyword>,
    pub collection: CollectionStats,
    pub report: IntegrityReport,
}

fn load<T>(set: &RecordSet) -> Result<Collection<T>>
where
    T: crate::records::FromRecord + Entity,
{
    Collection::load(set).with_context(|| format!("Load phase failed for '{}'", set.name()))
}

impl Archive {
    /// Loads every record set, formats page descriptions and wires the joins.
    pub fn assemble(inputs: &RawInputs, formatter: &dyn DescriptionFormatter) -> Result<Self> {
        let books: Collection<Book> = load(&inputs.books)?;
        let mut pages: Collection<Page> = load(&inputs.pages)?;
        let people: Collection<Person> = load(&inputs.people)?;
        let places: Collection<Place> = load(&inputs.places)?;
        let mut sources: Collection<Source> = load(&inputs.sources)?;

        for page in pages.iter_mut() {
            page.desc = formatter.format(&page.desc);
        }

        let mut report = IntegrityReport::default();
        report.note_duplicates(inputs.books.name(), &books);
        report.note_duplicates(inputs.pages.name(), &pages);
        report.note_duplicates(inputs.people.name(), &people);
        report.note_duplicates(inputs.places.name(), &places);
        report.note_duplicates(inputs.sources.name(), &sources);

        let join_phase = |set: &RecordSet| format!("Join phase failed for '{}'", set.name());
        report.joins = vec![
            (
                joins::PAGE_PEOPLE.name,
                joins::link_people(&mut pages, &inputs.page_people)
                    .with_context(|| join_phase(&inputs.page_people))?,
            ),
            (
                joins::PAGE_PLACES.name,
                joins::link_places(&mut pages, &inputs.page_places)
                    .with_context(|| join_phase(&inputs.page_places))?,
            ),
            (
                joins::PAGE_SOURCES.name,
                joins::link_sources(&mut pages, &inputs.page_sources)
                    .with_context(|| join_phase(&inputs.page_sources))?,
            ),
            (
                joins::SOURCE_CREATORS.name,
                joins::link_creators(&mut sources, &inputs.source_people)
                    .with_context(|| join_phase(&inputs.source_people))?,
            ),
        ];

        report.orphan_pages = pages
            .iter()
            .filter(|page| !books.contains(&page.book_id))
            .map(|page| page.id.clone())
            .collect();
        if report.has_orphans() {
            warn!(pages = report.orphan_pages.len(), "Pages reference missing books");
        }

        info!(
            books = books.len(),
            pages = pages.len(),
            people = people.len(),
            places = places.len(),
            sources = sources.len(),
            "Archive assembled"
        );

        Ok(Self {
            books,
            pages,
            people,
            places,
            sources,
            keywords: Collection::default(),
            collection: CollectionStats::default(),
            report,
        })
    }

    /// Runs every aggregation phase in dependency order.
    pub fn aggregate(&mut self) -> Result<()> {
        stats::page_stats(&mut self.pages, &self.people, &self.places, &self.sources);
        stats::book_stats(&mut self.books, &self.pages);
        self.collection = stats::collection_stats(&self.books);

        stats::source_types(&mut self.books, &self.sources, &mut self.collection);
        stats::people_roles(&mut self.books, &self.pages, &mut self.collection);
        stats::continent_totals(&self.books, &mut self.collection);
        stats::check_rollups(&self.books, &self.pages, &self.collection)
            .context("Stats phase failed")?;

        locate(&mut self.people, &self.pages);
        locate(&mut self.places, &self.pages);
        locate(&mut self.sources, &self.pages);
        info!("Co-occurrence computed");

        self.keywords = keywords::build_index(&self.collection.keywords, &self.books, &self.pages);
        Ok(())
    }

    pub fn build(inputs: &RawInputs, formatter: &dyn DescriptionFormatter) -> Result<Self> {
        let mut archive = Self::assemble(inputs, formatter)?;
        archive.aggregate()?;
        Ok(archive)
    }

    /// Pages of one book, in collection order.
    pub fn pages_of<'a>(&'a self, book: &'a Book) -> impl Iterator<Item = &'a Page> + 'a {
        self.pages.iter().filter(move |page| page.book_id == book.id)
    }
}

fn locate<T: Located>(subjects: &mut Collection<T>, pages: &Collection<Page>) {
    cooccurrence::compute(subjects, pages);
    cooccurrence::collect_keywords(subjects, pages);
    cooccurrence::collect_books_and_pages(subjects, pages);
}
