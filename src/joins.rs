use crate::error::ArchiveResult;
use crate::models::{Page, Source};
use crate::records::{Collection, Entity, RecordSet};
use tracing::{debug, info};

/// Field layout of one association export.
#[derive(Debug, Clone, Copy)]
pub struct JoinSpec {
    pub name: &'static str,
    /// Foreign key naming the entity that receives the edge
    pub target_key: &'static str,
    /// Foreign key of the entity being linked in
    pub related_key: &'static str,
    /// Optional edge attribute (role label, notes)
    pub edge_key: Option<&'static str>,
}

pub const PAGE_PEOPLE: JoinSpec = JoinSpec {
    name: "page_people_join",
    target_key: "Page_Id_Join",
    related_key: "Associated_Person_Id_Join",
    edge_key: Some("Associated_Person_Role"),
};

pub const PAGE_PLACES: JoinSpec = JoinSpec {
    name: "page_places_join",
    target_key: "Page_Id_Join_5",
    related_key: "Places_Named_Id_Join",
    edge_key: None,
};

pub const PAGE_SOURCES: JoinSpec = JoinSpec {
    name: "page_sources_join",
    target_key: "Page_Id_Join_2",
    related_key: "Associated_Sources_Id_Join",
    edge_key: None,
};

pub const SOURCE_CREATORS: JoinSpec = JoinSpec {
    name: "source_people_join",
    target_key: "Associated_Sources_Id_Join_2",
    related_key: "Associated_Person_Id_Join_2",
    edge_key: Some("Sources_Person_Join_notes"),
};

/// What happened to the rows of one join export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinOutcome {
    pub linked: usize,
    /// Rows whose target identifier matched nothing
    pub dangling: usize,
    /// Rows with an empty related identifier
    pub blank: usize,
}

/// Resolves each join row against the target index and hands the related
/// identifier (and edge attribute, or `""`) to `link`.
///
/// When targets share an identifier the row goes to the first one in
/// collection order. Dangling rows and rows with a blank related identifier leave the target untouched.
pub fn apply<T, F>(
    records: &RecordSet,
    target: &mut Collection<T>,
    spec: &JoinSpec,
    mut link: F,
) -> ArchiveResult<JoinOutcome>
where
    T: Entity,
    F: FnMut(&mut T, String, String),
{
    let mut outcome = JoinOutcome::default();

    for row in records.rows() {
        let target_id = row.required(spec.target_key)?;
        let related_id = row.required(spec.related_key)?;

        if related_id.trim().is_empty() {
            outcome.blank += 1;
            continue;
        }

        let edge = spec.edge_key.map(|key| row.text(key)).unwrap_or_default();

        match target.first_mut(&target_id) {
            Some(entity) => {
                link(entity, related_id, edge);
                outcome.linked += 1;
            }
            None => {
                debug!(
                    join = spec.name,
                    target = target_id,
                    related = related_id,
                    "Dropping join row with no matching target"
                );
                outcome.dangling += 1;
            }
        }
    }

    info!(
        join = spec.name,
        linked = outcome.linked,
        dangling = outcome.dangling,
        blank = outcome.blank,
        "Join applied"
    );

    Ok(outcome)
}

/// Adds people to pages, recording each role label under the person.
pub fn link_people(pages: &mut Collection<Page>, records: &RecordSet) -> ArchiveResult<JoinOutcome> {
    apply(records, pages, &PAGE_PEOPLE, |page, person_id, role| {
        page.people_ids.push(person_id.clone());
        let roles = page.people_roles.entry(person_id).or_default();
        if !role.trim().is_empty() {
            roles.push(role);
        }
    })
}

pub fn link_places(pages: &mut Collection<Page>, records: &RecordSet) -> ArchiveResult<JoinOutcome> {
    apply(records, pages, &PAGE_PLACES, |page, place_id, _| {
        page.places_ids.push(place_id);
    })
}

pub fn link_sources(
    pages: &mut Collection<Page>,
    records: &RecordSet,
) -> ArchiveResult<JoinOutcome> {
    apply(records, pages, &PAGE_SOURCES, |page, source_id, _| {
        page.sources_ids.push(source_id);
    })
}

/// Adds creators to sources; non-empty join notes are kept alongside.
pub fn link_creators(
    sources: &mut Collection<Source>,
    records: &RecordSet,
) -> ArchiveResult<JoinOutcome> {
    apply(records, sources, &SOURCE_CREATORS, |source, person_id, notes| {
        source.stats.creators.push(person_id);
        if !notes.is_empty() {
            source.stats.creators_notes.push(notes);
        }
    })
}
