use crate::cooccurrence;
use crate::export::make_progress_bar;
use crate::models::{Book, Keyword, Page};
use crate::records::{dedup_ids, pages_by_book, Collection};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Stable keyword IDs, kept as two inverse maps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeywordRegistry {
    keywords_to_ids: BTreeMap<String, String>,
    ids_to_keywords: BTreeMap<u32, String>,
}

impl KeywordRegistry {
    /// Numbers keywords from 1 in iteration order. A repeated keyword keeps its first ID.
    pub fn assign<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::default();
        let mut next_id = 1u32;
        for keyword in keywords {
            let keyword = keyword.as_ref();
            if registry.keywords_to_ids.contains_key(keyword) {
                continue;
            }
            registry
                .keywords_to_ids
                .insert(keyword.to_string(), next_id.to_string());
            registry.ids_to_keywords.insert(next_id, keyword.to_string());
            next_id += 1;
        }
        registry
    }

    pub fn id_of(&self, keyword: &str) -> Option<&str> {
        self.keywords_to_ids.get(keyword).map(String::as_str)
    }

    pub fn keyword_of(&self, id: &str) -> Option<&str> {
        let id: u32 = id.parse().ok()?;
        self.ids_to_keywords.get(&id).map(String::as_str)
    }

    /// `(id, keyword)` pairs in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.ids_to_keywords
            .iter()
            .map(|(id, keyword)| (*id, keyword.as_str()))
    }

    pub fn keywords_to_ids(&self) -> &BTreeMap<String, String> {
        &self.keywords_to_ids
    }

    pub fn len(&self) -> usize {
        self.ids_to_keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids_to_keywords.is_empty()
    }
}

/// Builds one entry per registered keyword: the books, pages, people, places
/// and sources it is attached to, then its co-occurrence stats.
pub fn build_index(
    registry: &KeywordRegistry,
    books: &Collection<Book>,
    pages: &Collection<Page>,
) -> Collection<Keyword> {
    let mut keywords: Vec<Keyword> = registry
        .iter()
        .map(|(id, keyword)| Keyword::new(id.to_string(), keyword.to_string()))
        .collect();
    let positions: FxHashMap<&str, usize> = registry
        .iter()
        .enumerate()
        .map(|(pos, (_, keyword))| (keyword, pos))
        .collect();

    let mut matched: Vec<Vec<&Page>> = vec![Vec::new(); keywords.len()];

    let grouped = pages_by_book(pages);
    let pb = make_progress_bar(books.len() as u64, "keywords");

    for book in books.indexed() {
        for page in grouped.get(book.id.as_str()).into_iter().flatten() {
            let mut seen = FxHashSet::default();
            for keyword in page.keywords.iter().filter(|k| seen.insert(k.as_str())) {
                let Some(&pos) = positions.get(keyword.as_str()) else {
                    continue;
                };
                matched[pos].push(*page);
                let entry = &mut keywords[pos];
                entry.books.push(book.number.clone());
                entry.pages.push(page.id.clone());
                entry.people.extend(page.people_ids.iter().cloned());
                entry.places.extend(page.places_ids.iter().cloned());
                entry.sources.extend(page.sources_ids.iter().cloned());
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    // Stats come from the same pages as the association lists, so pages of
    // missing books stay out of both.
    for (entry, on_pages) in keywords.iter_mut().zip(&matched) {
        dedup_ids(&mut entry.books);
        dedup_ids(&mut entry.pages);
        dedup_ids(&mut entry.people);
        dedup_ids(&mut entry.places);
        dedup_ids(&mut entry.sources);
        cooccurrence::compute_from(entry, on_pages.iter().copied());
        link_keywords(entry, on_pages, registry);
    }

    let index = Collection::from_entities("keywords", keywords);
    info!(keywords = index.len(), "Keyword index built");
    index
}

/// Lists the IDs of other keywords found on a keyword's pages.
fn link_keywords(keyword: &mut Keyword, pages: &[&Page], registry: &KeywordRegistry) {
    let mut related = Vec::new();
    for page in pages {
        related.extend(
            page.keywords
                .iter()
                .filter_map(|k| registry.id_of(k))
                .filter(|id| *id != keyword.id)
                .map(str::to_string),
        );
    }
    dedup_ids(&mut related);
    keyword.stats.keyword_ids = related;
}
