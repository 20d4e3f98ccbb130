use crate::config::{AVERAGE_SCALE, MATERIAL_ABSENT, MATERIAL_PRESENT};
use crate::error::{ArchiveError, ArchiveResult};
use crate::keywords::KeywordRegistry;
use crate::models::{
    Book, BookStats, CollectionStats, FrequencyTable, IdIndex, Page, PageStats, Person, Place,
    Source,
};
use crate::records::{dedup_ids, pages_by_book, Collection};
use bigdecimal::{BigDecimal, RoundingMode};
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

/// Counts one occurrence of `key`; blank keys are not counted.
pub fn tally(table: &mut FrequencyTable, key: &str) {
    add_count(table, key, 1);
}

fn add_count(table: &mut FrequencyTable, key: &str, count: u64) {
    if key.trim().is_empty() {
        return;
    }
    *table.entry(key.to_string()).or_insert(0) += count;
}

fn merge_counts(into: &mut FrequencyTable, from: &FrequencyTable) {
    for (key, count) in from {
        add_count(into, key, *count);
    }
}

fn count_ids(ids: &[String]) -> FrequencyTable {
    let mut table = FrequencyTable::new();
    for id in ids {
        tally(&mut table, id);
    }
    table
}

/// `total / count` rounded half-up to two decimal places in base 10.
pub fn average(total: u64, count: u64, scope: &str) -> ArchiveResult<String> {
    if count == 0 {
        return Err(ArchiveError::DivisionByZero {
            scope: scope.to_string(),
        });
    }
    let mean = BigDecimal::from(total) / BigDecimal::from(count);
    Ok(mean
        .with_scale_round(AVERAGE_SCALE, RoundingMode::HalfUp)
        .to_string())
}

/// An empty scope has no average; it is reported and left as `None`.
fn average_or_none(total: u64, count: u64, scope: &str) -> Option<String> {
    match average(total, count, scope) {
        Ok(avg) => Some(avg),
        Err(e) => {
            warn!(error = %e, "Average left empty");
            None
        }
    }
}

/// Distinct identifiers in first-seen order.
fn distinct(ids: &[String]) -> impl Iterator<Item = &str> {
    let mut seen = FxHashSet::default();
    ids.iter()
        .map(String::as_str)
        .filter(move |id| seen.insert(*id))
}

/// Page level: attribute tallies over the people, sources and places on each page.
pub fn page_stats(
    pages: &mut Collection<Page>,
    people: &Collection<Person>,
    places: &Collection<Place>,
    sources: &Collection<Source>,
) {
    for page in pages.iter_mut() {
        let mut stats = PageStats::default();

        for person in distinct(&page.people_ids).filter_map(|id| people.get(id)) {
            tally(&mut stats.people_nationalities, &person.nationality);
            tally(&mut stats.people_genders, &person.gender);
            tally(&mut stats.people_epithets, &person.epithets);
        }

        for source in distinct(&page.sources_ids).filter_map(|id| sources.get(id)) {
            tally(&mut stats.sources_places, &source.place);
            tally(&mut stats.sources_rights_holders, &source.rights_holder);
        }

        for place in distinct(&page.places_ids).filter_map(|id| places.get(id)) {
            tally(&mut stats.continent_counts, &place.continent);
        }

        page.stats = stats;
    }
    info!(pages = pages.len(), "Page stats computed");
}

/// Book level: folds each book's pages. Returns the number of pages whose
/// book does not exist.
pub fn book_stats(books: &mut Collection<Book>, pages: &Collection<Page>) -> usize {
    let grouped = pages_by_book(pages);

    let orphans: usize = grouped
        .iter()
        .filter(|(book_id, _)| !books.contains(book_id))
        .map(|(book_id, orphaned)| {
            warn!(book_id = *book_id, pages = orphaned.len(), "Pages reference a missing book");
            orphaned.len()
        })
        .sum();

    for book in books.iter_mut() {
        let book_pages = grouped
            .get(book.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        book.stats = fold_book(&book.id, book_pages);
    }

    info!(books = books.len(), orphans, "Book stats computed");
    orphans
}

fn fold_book(book_id: &str, pages: &[&Page]) -> BookStats {
    let mut stats = BookStats::default();
    let mut people = Vec::new();
    let mut places = Vec::new();
    let mut sources = Vec::new();

    for page in pages {
        stats.pages += 1;

        if page.is_foldout() {
            stats.pages_foldouts += 1;
            stats.pages_foldouts_list.push(page.id.clone());
        }

        stats.clippings += u64::from(page.clippings.unwrap_or(0));
        stats.clippings_w_metadata += u64::from(page.clippings_w_metadata.unwrap_or(0));

        for keyword in &page.keywords {
            tally(&mut stats.keyword_count_dict, keyword);
            stats
                .keyword_to_page_dict
                .entry(keyword.clone())
                .or_default()
                .push(page.id.clone());
        }

        for orientation in &page.orientations {
            tally(&mut stats.clipping_orientation_page_counts, orientation);
            stats
                .clipping_orientation_to_page_dict
                .entry(orientation.clone())
                .or_default()
                .push(page.id.clone());
        }

        if !page.orig_material.is_empty() {
            tally(&mut stats.orig_material_counts, &page.orig_material);
            let partition = &mut stats.pages_w_orig_material_dict;
            match page.orig_material.as_str() {
                MATERIAL_PRESENT => partition.present.push(page.id.clone()),
                MATERIAL_ABSENT => partition.absent.push(page.id.clone()),
                other => debug!(page = page.id.as_str(), flag = other, "Unknown original material flag"),
            }
        }

        people.extend(page.people_ids.iter().cloned());
        places.extend(page.places_ids.iter().cloned());
        sources.extend(page.sources_ids.iter().cloned());

        merge_counts(&mut stats.continent_counts, &page.stats.continent_counts);
    }

    stats.avg_clipping_per_page = average_or_none(
        stats.clippings,
        stats.pages,
        &format!("clippings per page of book {}", book_id),
    );

    stats.people_ids_dict = count_ids(&people);
    stats.places_ids_dict = count_ids(&places);
    stats.sources_ids_dict = count_ids(&sources);

    dedup_ids(&mut people);
    dedup_ids(&mut places);
    dedup_ids(&mut sources);
    stats.people_ids = people;
    stats.places_ids = places;
    stats.sources_ids = sources;

    stats
}

/// Collection level: sums book counters, merges keyword and occurrence tables,
/// and assigns keyword IDs.
pub fn collection_stats(books: &Collection<Book>) -> CollectionStats {
    let mut stats = CollectionStats::default();
    let mut book_count = 0u64;
    let mut earliest: Option<i32> = None;
    let mut latest: Option<i32> = None;

    for book in books.indexed() {
        book_count += 1;
        stats.pages += book.stats.pages;
        stats.pages_foldouts += book.stats.pages_foldouts;
        stats.clippings += book.stats.clippings;
        stats.clippings_w_metadata += book.stats.clippings_w_metadata;

        for (keyword, count) in &book.stats.keyword_count_dict {
            add_count(&mut stats.keyword_count_dict, keyword, *count);
            stats
                .keyword_to_book_dict
                .entry(keyword.clone())
                .or_default()
                .push(book.number.clone());
        }

        merge_counts(&mut stats.people_ids_dict, &book.stats.people_ids_dict);
        merge_counts(&mut stats.places_ids_dict, &book.stats.places_ids_dict);
        merge_counts(&mut stats.sources_ids_dict, &book.stats.sources_ids_dict);

        if let Some(begin) = book.begin_date {
            earliest = Some(earliest.map_or(begin, |e| e.min(begin)));
        }
        if let Some(end) = book.end_date.or(book.begin_date) {
            latest = Some(latest.map_or(end, |l| l.max(end)));
        }
    }

    stats.avg_clippings_per_book =
        average_or_none(stats.clippings, book_count, "clippings per book of the collection");

    if let (Some(begin), Some(end)) = (earliest, latest) {
        stats.total_date_range = vec![begin, end];
    }

    stats.keywords = KeywordRegistry::assign(stats.keyword_count_dict.keys());

    info!(
        books = book_count,
        pages = stats.pages,
        keywords = stats.keywords.len(),
        "Collection stats computed"
    );
    stats
}

/// Source types per book, one count per source occurrence; the collection
/// table is the sum of the book tables.
pub fn source_types(
    books: &mut Collection<Book>,
    sources: &Collection<Source>,
    collection: &mut CollectionStats,
) {
    for book in books.iter_mut() {
        let mut table = FrequencyTable::new();
        for (source_id, count) in &book.stats.sources_ids_dict {
            match sources.get(source_id) {
                Some(source) => add_count(&mut table, &source.source_type, *count),
                None => warn!(
                    book_id = book.id.as_str(),
                    source_id = source_id.as_str(),
                    "Source on page is missing from the sources record set"
                ),
            }
        }
        book.stats.source_type_counts = table;
    }

    let mut total = FrequencyTable::new();
    for book in books.indexed() {
        merge_counts(&mut total, &book.stats.source_type_counts);
    }
    collection.source_type_counts = total;
}

/// Role labels per person and role-type counts, per book and for the collection.
pub fn people_roles(
    books: &mut Collection<Book>,
    pages: &Collection<Page>,
    collection: &mut CollectionStats,
) {
    let grouped = pages_by_book(pages);

    for book in books.iter_mut() {
        let mut counts = FrequencyTable::new();
        let mut roles = IdIndex::new();

        for page in grouped.get(book.id.as_str()).into_iter().flatten() {
            for (person_id, labels) in &page.people_roles {
                let person_roles = roles.entry(person_id.clone()).or_default();
                for label in labels {
                    tally(&mut counts, label);
                    person_roles.push(label.clone());
                }
            }
        }

        dedup_labels(&mut roles);
        book.stats.role_type_counts = counts;
        book.stats.roles_by_people_ids = roles;
    }

    let mut counts = FrequencyTable::new();
    let mut roles = IdIndex::new();
    for book in books.indexed() {
        merge_counts(&mut counts, &book.stats.role_type_counts);
        for (person_id, labels) in &book.stats.roles_by_people_ids {
            roles
                .entry(person_id.clone())
                .or_default()
                .extend(labels.iter().cloned());
        }
    }
    dedup_labels(&mut roles);
    collection.role_type_counts = counts;
    collection.roles_by_people_ids = roles;
}

fn dedup_labels(roles: &mut IdIndex) {
    for labels in roles.values_mut() {
        labels.sort();
        labels.dedup();
    }
}

pub fn continent_totals(books: &Collection<Book>, collection: &mut CollectionStats) {
    let mut total = FrequencyTable::new();
    for book in books.indexed() {
        merge_counts(&mut total, &book.stats.continent_counts);
    }
    collection.continent_counts = total;
}

/// Re-derives page and clipping totals from the pages and fails if any rollup disagrees.
pub fn check_rollups(
    books: &Collection<Book>,
    pages: &Collection<Page>,
    collection: &CollectionStats,
) -> ArchiveResult<()> {
    let grouped = pages_by_book(pages);
    let mut sums = [0u64; 3];

    for book in books.indexed() {
        let book_pages = grouped.get(book.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
        let expected = [
            book_pages.len() as u64,
            book_pages
                .iter()
                .map(|p| u64::from(p.clippings.unwrap_or(0)))
                .sum(),
            book_pages
                .iter()
                .map(|p| u64::from(p.clippings_w_metadata.unwrap_or(0)))
                .sum(),
        ];
        let actual = [
            book.stats.pages,
            book.stats.clippings,
            book.stats.clippings_w_metadata,
        ];
        for (i, name) in ["pages", "clippings", "clippings_w_metadata"].iter().enumerate() {
            ensure_equal(&format!("book {} {}", book.id, name), expected[i], actual[i])?;
            sums[i] += actual[i];
        }
    }

    ensure_equal("collection pages", sums[0], collection.pages)?;
    ensure_equal("collection clippings", sums[1], collection.clippings)?;
    ensure_equal(
        "collection clippings_w_metadata",
        sums[2],
        collection.clippings_w_metadata,
    )
}

fn ensure_equal(stat: &str, expected: u64, actual: u64) -> ArchiveResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ArchiveError::RollupMismatch {
            stat: stat.to_string(),
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{book, page, pages, person, place, source};

    fn books(items: Vec<Book>) -> Collection<Book> {
        Collection::from_entities("books", items)
    }

    #[test]
    fn tally_ignores_blank_keys() {
        let mut table = FrequencyTable::new();
        tally(&mut table, "Scottish");
        tally(&mut table, "Scottish");
        tally(&mut table, "  ");
        tally(&mut table, "");
        assert_eq!(table.len(), 1);
        assert_eq!(table["Scottish"], 2);
    }

    #[test]
    fn average_rounds_to_two_places() {
        assert_eq!(average(14, 3, "t").unwrap(), "4.67");
        assert_eq!(average(8, 2, "t").unwrap(), "4.00");
    }

    #[test]
    fn average_rounds_half_up_in_decimal() {
        // 2.675 is below the midpoint as a binary float.
        assert_eq!(average(107, 40, "t").unwrap(), "2.68");
        assert_eq!(average(1, 8, "t").unwrap(), "0.13");
    }

    #[test]
    fn average_over_nothing_is_division_by_zero() {
        let err = average(5, 0, "clippings per page of book 9").unwrap_err();
        match err {
            ArchiveError::DivisionByZero { scope } => {
                assert_eq!(scope, "clippings per page of book 9")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn page_stats_count_each_entity_once_per_page() {
        let mut p = page("1", "1", 3, &[]);
        p.people_ids = vec!["1".into(), "1".into(), "2".into(), "404".into()];
        p.places_ids = vec!["10".into(), "11".into()];
        p.sources_ids = vec!["20".into()];
        let mut pages = pages(vec![p]);

        let people = Collection::from_entities(
            "people",
            vec![person("1", "Scottish", "Male"), person("2", "Scottish", "")],
        );
        let places = Collection::from_entities(
            "places",
            vec![place("10", "Europe"), place("11", "Europe")],
        );
        let mut s = source("20", "Poem");
        s.place = "London".into();
        let sources = Collection::from_entities("sources", vec![s]);

        page_stats(&mut pages, &people, &places, &sources);

        let stats = &pages.get("1").unwrap().stats;
        assert_eq!(stats.people_nationalities["Scottish"], 2);
        assert_eq!(stats.people_genders["Male"], 1);
        assert!(!stats.people_genders.contains_key(""));
        assert_eq!(stats.continent_counts["Europe"], 2);
        assert_eq!(stats.sources_places["London"], 1);
        assert!(stats.sources_rights_holders.is_empty());
    }

    #[test]
    fn book_folds_its_pages() {
        let mut a = page("1", "1", 3, &["Bear", "Art"]);
        a.people_ids = vec!["1".into()];
        a.foldout = "Y".into();
        a.orig_material = "Y".into();
        a.orientations = vec!["portrait".into()];
        a.clippings_w_metadata = Some(2);
        a.stats.continent_counts.insert("Europe".into(), 2);
        let mut b = page("2", "1", 5, &["Art"]);
        b.orig_material = "N".into();
        b.orientations = vec!["portrait".into(), "landscape".into()];
        b.stats.continent_counts.insert("Europe".into(), 1);
        let pages = pages(vec![a, b]);
        let mut books = books(vec![book("1")]);

        let orphans = book_stats(&mut books, &pages);
        assert_eq!(orphans, 0);

        let stats = &books.get("1").unwrap().stats;
        assert_eq!(stats.pages, 2);
        assert_eq!(stats.clippings, 8);
        assert_eq!(stats.clippings_w_metadata, 2);
        assert_eq!(stats.avg_clipping_per_page.as_deref(), Some("4.00"));
        assert_eq!(stats.keyword_count_dict["Bear"], 1);
        assert_eq!(stats.keyword_count_dict["Art"], 2);
        assert_eq!(stats.keyword_to_page_dict["Art"], vec!["1", "2"]);
        assert_eq!(stats.pages_foldouts, 1);
        assert_eq!(stats.pages_foldouts_list, vec!["1"]);
        assert_eq!(stats.clipping_orientation_page_counts["portrait"], 2);
        assert_eq!(stats.clipping_orientation_to_page_dict["landscape"], vec!["2"]);
        assert_eq!(stats.orig_material_counts["Y"], 1);
        assert_eq!(stats.pages_w_orig_material_dict.present, vec!["1"]);
        assert_eq!(stats.pages_w_orig_material_dict.absent, vec!["2"]);
        assert_eq!(stats.people_ids, vec!["1"]);
        assert_eq!(stats.people_ids_dict["1"], 1);
        assert_eq!(stats.continent_counts["Europe"], 3);
    }

    #[test]
    fn empty_book_has_no_average() {
        let pages = pages(vec![page("1", "2", 4, &[])]);
        let mut books = books(vec![book("1"), book("2")]);

        book_stats(&mut books, &pages);

        let empty = &books.get("1").unwrap().stats;
        assert_eq!(empty.pages, 0);
        assert_eq!(empty.avg_clipping_per_page, None);
        assert_eq!(
            books.get("2").unwrap().stats.avg_clipping_per_page.as_deref(),
            Some("4.00")
        );
    }

    #[test]
    fn orphan_pages_are_counted() {
        let pages = pages(vec![page("1", "1", 4, &[]), page("2", "7", 1, &[])]);
        let mut books = books(vec![book("1")]);

        assert_eq!(book_stats(&mut books, &pages), 1);
    }

    #[test]
    fn collection_sums_books_and_assigns_keyword_ids() {
        let mut a = page("1", "1", 7, &["Bear", "Art"]);
        a.people_ids = vec!["1".into()];
        let mut b = page("2", "1", 2, &["Art"]);
        b.people_ids = vec!["1".into()];
        let mut c = page("3", "2", 5, &["Art", "Zoo"]);
        c.people_ids = vec!["1".into(), "2".into()];
        let pages = pages(vec![a, b, c]);

        let mut first = book("1");
        first.begin_date = Some(1931);
        first.end_date = Some(1953);
        let mut second = book("2");
        second.begin_date = Some(1925);
        second.end_date = Some(1940);
        let mut books = books(vec![first, second]);

        book_stats(&mut books, &pages);
        let stats = collection_stats(&books);

        assert_eq!(stats.pages, 3);
        assert_eq!(stats.clippings, 14);
        assert_eq!(stats.avg_clippings_per_book.as_deref(), Some("7.00"));
        assert_eq!(stats.keyword_count_dict["Art"], 3);
        assert_eq!(stats.keyword_to_book_dict["Art"], vec!["1", "2"]);
        assert_eq!(stats.people_ids_dict["1"], 3);
        assert_eq!(stats.people_ids_dict["2"], 1);
        assert_eq!(stats.total_date_range, vec![1925, 1953]);

        assert_eq!(stats.keywords.id_of("Art"), Some("1"));
        assert_eq!(stats.keywords.id_of("Bear"), Some("2"));
        assert_eq!(stats.keywords.id_of("Zoo"), Some("3"));

        check_rollups(&books, &pages, &stats).unwrap();
    }

    #[test]
    fn collection_without_books_has_no_average() {
        let stats = collection_stats(&books(Vec::new()));
        assert_eq!(stats.avg_clippings_per_book, None);
        assert!(stats.total_date_range.is_empty());
    }

    #[test]
    fn source_types_are_counted_per_book() {
        let mut a = page("1", "1", 1, &[]);
        a.sources_ids = vec!["20".into(), "21".into()];
        let mut b = page("2", "1", 1, &[]);
        b.sources_ids = vec!["20".into(), "99".into()];
        let mut c = page("3", "2", 1, &[]);
        c.sources_ids = vec!["21".into()];
        let pages = pages(vec![a, b, c]);
        let sources = Collection::from_entities(
            "sources",
            vec![source("20", "Newspaper"), source("21", "Poem")],
        );
        let mut books = books(vec![book("1"), book("2")]);

        book_stats(&mut books, &pages);
        let mut collection = collection_stats(&books);
        source_types(&mut books, &sources, &mut collection);

        let first = &books.get("1").unwrap().stats.source_type_counts;
        assert_eq!(first["Newspaper"], 2);
        assert_eq!(first["Poem"], 1);
        let second = &books.get("2").unwrap().stats.source_type_counts;
        assert_eq!(second.get("Newspaper"), None);
        assert_eq!(second["Poem"], 1);
        assert_eq!(collection.source_type_counts["Poem"], 2);
        assert_eq!(collection.source_type_counts["Newspaper"], 2);
    }

    #[test]
    fn roles_are_deduplicated_per_person() {
        let mut a = page("1", "1", 1, &[]);
        a.people_roles.insert("5".into(), vec!["Author".into()]);
        let mut b = page("2", "1", 1, &[]);
        b.people_roles
            .insert("5".into(), vec!["Author".into(), "Subject".into()]);
        let mut c = page("3", "2", 1, &[]);
        c.people_roles.insert("5".into(), vec!["Author".into()]);
        let pages = pages(vec![a, b, c]);
        let mut books = books(vec![book("1"), book("2")]);

        book_stats(&mut books, &pages);
        let mut collection = collection_stats(&books);
        people_roles(&mut books, &pages, &mut collection);

        let first = &books.get("1").unwrap().stats;
        assert_eq!(first.roles_by_people_ids["5"], vec!["Author", "Subject"]);
        assert_eq!(first.role_type_counts["Author"], 2);
        assert_eq!(books.get("2").unwrap().stats.role_type_counts["Author"], 1);

        assert_eq!(collection.roles_by_people_ids["5"], vec!["Author", "Subject"]);
        assert_eq!(collection.role_type_counts["Author"], 3);
    }

    #[test]
    fn continents_roll_up_from_books() {
        let mut a = page("1", "1", 1, &[]);
        a.stats.continent_counts.insert("Asia".into(), 1);
        let mut b = page("2", "2", 1, &[]);
        b.stats.continent_counts.insert("Asia".into(), 2);
        b.stats.continent_counts.insert("Europe".into(), 1);
        let pages = pages(vec![a, b]);
        let mut books = books(vec![book("1"), book("2")]);

        book_stats(&mut books, &pages);
        let mut collection = collection_stats(&books);
        continent_totals(&books, &mut collection);

        assert_eq!(collection.continent_counts["Asia"], 3);
        assert_eq!(collection.continent_counts["Europe"], 1);
    }

    #[test]
    fn check_rollups_reports_mismatch() {
        let pages = pages(vec![page("1", "1", 4, &[])]);
        let mut books = books(vec![book("1")]);
        book_stats(&mut books, &pages);
        let mut collection = collection_stats(&books);
        collection.clippings += 1;

        let err = check_rollups(&books, &pages, &collection).unwrap_err();
        assert!(matches!(err, ArchiveError::RollupMismatch { .. }));
    }
}
