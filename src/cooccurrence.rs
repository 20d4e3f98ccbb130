use crate::models::{Cooccurrence, EntityStats, IdIndex, Keyword, Page, PageField, Person, Place, Source};
use crate::records::{dedup_ids, Collection, Entity};

/// An entity whose presence on a page is read from one of the page's lists.
pub trait Subject: Entity {
    const FIELD: PageField;

    /// Value looked for in the page's `FIELD` list.
    fn membership_key(&self) -> &str {
        self.id()
    }

    fn cooccurrence_mut(&mut self) -> &mut Cooccurrence;
}

/// A subject carrying keyword and book/page locator stats.
pub trait Located: Subject {
    fn entity_stats_mut(&mut self) -> &mut EntityStats;
}

impl Subject for Person {
    const FIELD: PageField = PageField::People;

    fn cooccurrence_mut(&mut self) -> &mut Cooccurrence {
        &mut self.stats.cooccurrence
    }
}

impl Located for Person {
    fn entity_stats_mut(&mut self) -> &mut EntityStats {
        &mut self.stats
    }
}

impl Subject for Place {
    const FIELD: PageField = PageField::Places;

    fn cooccurrence_mut(&mut self) -> &mut Cooccurrence {
        &mut self.stats.cooccurrence
    }
}

impl Located for Place {
    fn entity_stats_mut(&mut self) -> &mut EntityStats {
        &mut self.stats
    }
}

impl Subject for Source {
    const FIELD: PageField = PageField::Sources;

    fn cooccurrence_mut(&mut self) -> &mut Cooccurrence {
        &mut self.stats.entity.cooccurrence
    }
}

impl Located for Source {
    fn entity_stats_mut(&mut self) -> &mut EntityStats {
        &mut self.stats.entity
    }
}

impl Subject for Keyword {
    const FIELD: PageField = PageField::Keywords;

    fn membership_key(&self) -> &str {
        &self.keyword
    }

    fn cooccurrence_mut(&mut self) -> &mut Cooccurrence {
        &mut self.stats.cooccurrence
    }
}

impl Cooccurrence {
    fn absorb(&mut self, page: &Page) {
        record(&mut self.people_ids, &mut self.people_on_pages, &page.people_ids, &page.id);
        record(&mut self.places_ids, &mut self.places_on_pages, &page.places_ids, &page.id);
        record(&mut self.sources_ids, &mut self.sources_on_pages, &page.sources_ids, &page.id);
    }

    fn finish(&mut self, field: PageField, own_key: &str) {
        dedup_ids(&mut self.people_ids);
        dedup_ids(&mut self.places_ids);
        dedup_ids(&mut self.sources_ids);

        for index in [
            &mut self.people_on_pages,
            &mut self.places_on_pages,
            &mut self.sources_on_pages,
        ] {
            // Pages are absorbed in order, so repeats from one page are adjacent.
            index.values_mut().for_each(Vec::dedup);
        }

        let own_list = match field {
            PageField::People => &mut self.people_ids,
            PageField::Places => &mut self.places_ids,
            PageField::Sources => &mut self.sources_ids,
            PageField::Keywords => return,
        };
        own_list.retain(|id| id != own_key);
    }
}

fn record(ids: &mut Vec<String>, on_pages: &mut IdIndex, page_ids: &[String], page_id: &str) {
    ids.extend(page_ids.iter().cloned());
    for id in page_ids {
        on_pages
            .entry(id.clone())
            .or_default()
            .push(page_id.to_string());
    }
}

fn appears_on<T: Subject>(subject: &T, page: &Page) -> bool {
    let key = subject.membership_key();
    page.ids(T::FIELD).iter().any(|id| id == key)
}

/// Rebuilds every subject's co-occurrence lists from the pages it appears on.
///
/// Lists are de-duplicated and a subject never lists itself. Running this
/// again over the same pages produces the same stats.
pub fn compute<T: Subject>(subjects: &mut Collection<T>, pages: &Collection<Page>) {
    for subject in subjects.iter_mut() {
        compute_from(subject, pages.iter());
    }
}

/// Rebuilds one subject's co-occurrence lists from the given pages only.
/// Pages the subject is not on are skipped.
pub fn compute_from<'a, T, I>(subject: &mut T, pages: I)
where
    T: Subject,
    I: IntoIterator<Item = &'a Page>,
{
    let mut found = Cooccurrence::default();
    for page in pages.into_iter().filter(|page| appears_on(&*subject, page)) {
        found.absorb(page);
    }
    found.finish(T::FIELD, subject.membership_key());
    *subject.cooccurrence_mut() = found;
}

/// Gathers the free-text and controlled-vocabulary keywords of every page a
/// subject appears on. Repeats are kept.
pub fn collect_keywords<T: Located>(subjects: &mut Collection<T>, pages: &Collection<Page>) {
    for subject in subjects.iter_mut() {
        let mut keywords = Vec::new();
        let mut ukat_keywords = Vec::new();
        for page in pages.iter().filter(|page| appears_on(&*subject, page)) {
            keywords.extend(page.keywords.iter().cloned());
            ukat_keywords.extend(page.ukat_keywords.iter().cloned());
        }
        let stats = subject.entity_stats_mut();
        stats.keywords_ids = keywords;
        stats.ukat_keywords_ids = ukat_keywords;
    }
}

/// Maps each book a subject appears in to the pages it appears on.
pub fn collect_books_and_pages<T: Located>(subjects: &mut Collection<T>, pages: &Collection<Page>) {
    for subject in subjects.iter_mut() {
        let mut located = IdIndex::new();
        for page in pages.iter().filter(|page| appears_on(&*subject, page)) {
            located
                .entry(page.book_id.clone())
                .or_default()
                .push(page.id.clone());
        }
        subject.entity_stats_mut().book_and_page_ids = located;
    }
}
