use crate::config::{LIST_SEPARATOR, RECORDS_KEY};
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{
    Book, BookStats, EntityStats, Keyword, Page, PageStats, Person, Place, Source, SourceStats,
};
use rustc_hash::FxHashMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{info, warn};

/// One flat row of a database export, every value coerced to a string.
pub type RawRecord = FxHashMap<String, String>;

/// A named list of raw records, as read from one export file.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    name: String,
    records: Vec<RawRecord>,
}

impl RecordSet {
    pub fn new(name: &str, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.to_string(),
            records,
        }
    }

    pub fn empty(name: &str) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn from_json(name: &str, text: &str) -> ArchiveResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(name, value)
    }

    /// Accepts `{"RECORDS": [...]}`, or any object whose single key holds the record list.
    pub fn from_value(name: &str, value: Value) -> ArchiveResult<Self> {
        let malformed = |reason: String| ArchiveError::MalformedRecordSet {
            record_set: name.to_string(),
            reason,
        };

        let Value::Object(mut top) = value else {
            return Err(malformed("top level is not an object".to_string()));
        };

        let list = match top.remove(RECORDS_KEY) {
            Some(list) => list,
            None if top.len() == 1 => top
                .into_iter()
                .next()
                .map(|(_, v)| v)
                .unwrap_or(Value::Null),
            None => return Err(malformed(format!("no '{}' list", RECORDS_KEY))),
        };

        let Value::Array(rows) = list else {
            return Err(malformed("record list is not an array".to_string()));
        };

        let mut records = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let Value::Object(fields) = row else {
                return Err(malformed(format!("record {} is not an object", index)));
            };
            let record: RawRecord = fields
                .into_iter()
                .map(|(k, v)| (k, coerce_to_string(v)))
                .collect();
            records.push(record);
        }

        Ok(Self::new(name, records))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Field accessors for every record, paired with its position.
    pub fn rows(&self) -> impl Iterator<Item = Fields<'_>> {
        self.records
            .iter()
            .enumerate()
            .map(move |(index, record)| Fields {
                record_set: &self.name,
                index,
                record,
            })
    }
}

fn coerce_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// True if the text holds at least one decimal digit.
pub fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Splits a `, `-separated export field, dropping blank segments.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(LIST_SEPARATOR)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Typed access to the fields of one raw record.
pub struct Fields<'a> {
    record_set: &'a str,
    index: usize,
    record: &'a RawRecord,
}

impl<'a> Fields<'a> {
    /// Identifying field; absence fails the whole record set.
    pub fn required(&self, field: &str) -> ArchiveResult<String> {
        self.record
            .get(field)
            .cloned()
            .ok_or_else(|| ArchiveError::MalformedInput {
                record_set: self.record_set.to_string(),
                index: self.index,
                field: field.to_string(),
            })
    }

    pub fn text(&self, field: &str) -> String {
        self.record.get(field).cloned().unwrap_or_default()
    }

    pub fn list(&self, field: &str) -> Vec<String> {
        split_list(self.record.get(field).map(String::as_str).unwrap_or(""))
    }

    pub fn number<T>(&self, field: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.record.get(field).map(String::as_str).unwrap_or("");
        self.parse_number(field, raw)
    }

    /// `"1931-1953"` → `(Some(1931), Some(1953))`; blank halves stay `None`.
    pub fn range(&self, field: &str) -> (Option<i32>, Option<i32>) {
        let raw = self.record.get(field).map(String::as_str).unwrap_or("");
        if !has_digit(raw) {
            return (None, None);
        }
        let mut parts = raw.splitn(2, '-');
        let begin = parts.next().and_then(|p| self.parse_number(field, p));
        let end = parts.next().and_then(|p| self.parse_number(field, p));
        (begin, end)
    }

    fn parse_number<T>(&self, field: &str, raw: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        if !has_digit(raw) {
            return None;
        }
        match raw.trim().parse::<T>() {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(
                    record_set = self.record_set,
                    index = self.index,
                    field,
                    value = raw,
                    error = %e,
                    "Unparseable numeric field left blank"
                );
                None
            }
        }
    }
}

/// An entity addressable by its primary identifier.
pub trait Entity {
    fn id(&self) -> &str;

    /// Identifier the collection is ordered by, compared as a base-10 integer.
    fn order_key(&self) -> &str {
        self.id()
    }
}

/// Maps one raw export record onto a canonical entity with zeroed stats.
pub trait FromRecord: Sized {
    fn from_record(fields: &Fields<'_>) -> ArchiveResult<Self>;
}

/// Integer ordering for identifiers; non-numeric identifiers sort last.
pub fn numeric_order(id: &str) -> (bool, i64) {
    match id.trim().parse::<i64>() {
        Ok(n) => (false, n),
        Err(_) => (true, 0),
    }
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    numeric_order(a)
        .cmp(&numeric_order(b))
        .then_with(|| a.cmp(b))
}

/// Sorts identifiers in numeric order and removes repeats.
pub fn dedup_ids(ids: &mut Vec<String>) {
    ids.sort_by(|a, b| compare_ids(a, b));
    ids.dedup();
}

/// Entities in identifier order, plus an identifier index.
///
/// When two entities share an identifier both stay in the ordered list, but
/// the index (and the keyed document form) resolves to the later one.
/// `first_mut` reaches the earlier one instead.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
    index: FxHashMap<String, usize>,
    first: FxHashMap<String, usize>,
    duplicates: Vec<String>,
}

impl<T: Entity> Collection<T> {
    pub fn from_entities(kind: &str, mut items: Vec<T>) -> Self {
        // Stable: ties keep input order.
        items.sort_by_key(|item| numeric_order(item.order_key()));

        let mut index = FxHashMap::default();
        index.reserve(items.len());
        let mut first = FxHashMap::default();
        let mut duplicates = Vec::new();

        for (pos, item) in items.iter().enumerate() {
            first.entry(item.id().to_string()).or_insert(pos);
            if index.insert(item.id().to_string(), pos).is_some() {
                warn!(kind, id = item.id(), "Duplicate identifier, later record wins");
                duplicates.push(item.id().to_string());
            }
        }

        Self {
            items,
            index,
            first,
            duplicates,
        }
    }

    pub fn load(set: &RecordSet) -> ArchiveResult<Self>
    where
        T: FromRecord,
    {
        let items = set
            .rows()
            .map(|fields| T::from_record(&fields))
            .collect::<ArchiveResult<Vec<T>>>()?;
        info!(record_set = set.name(), records = items.len(), "Loaded record set");
        Ok(Self::from_entities(set.name(), items))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        match self.index.get(id) {
            Some(&pos) => self.items.get_mut(pos),
            None => None,
        }
    }

    /// The first entity with this identifier in collection order.
    pub fn first_mut(&mut self, id: &str) -> Option<&mut T> {
        match self.first.get(id) {
            Some(&pos) => self.items.get_mut(pos),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Entities the identifier index resolves to, in collection order.
    pub fn indexed(&self) -> impl Iterator<Item = &T> {
        self.items
            .iter()
            .enumerate()
            .filter(move |(pos, item)| self.index.get(item.id()) == Some(pos))
            .map(|(_, item)| item)
    }
}

impl<T> Collection<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self::from_entities("empty", Vec::new())
    }
}

/// Serializes as an identifier-keyed object.
impl<T: Entity + Serialize> Serialize for Collection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.index.len()))?;
        for item in self.indexed() {
            map.serialize_entry(item.id(), item)?;
        }
        map.end()
    }
}

/// Pages grouped under their book identifier, in collection order.
pub fn pages_by_book(pages: &Collection<Page>) -> FxHashMap<&str, Vec<&Page>> {
    let mut grouped: FxHashMap<&str, Vec<&Page>> = FxHashMap::default();
    for page in pages.iter() {
        grouped.entry(page.book_id.as_str()).or_default().push(page);
    }
    grouped
}

impl Entity for Book {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Page {
    fn id(&self) -> &str {
        &self.id
    }

    fn order_key(&self) -> &str {
        &self.book_id
    }
}

impl Entity for Person {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Place {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Source {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Keyword {
    fn id(&self) -> &str {
        &self.id
    }
}

impl FromRecord for Book {
    fn from_record(f: &Fields<'_>) -> ArchiveResult<Self> {
        let (begin_date, end_date) = f.range("Scrapbook_date_range");
        Ok(Self {
            id: f.required("Scrapbook_Id")?,
            number: f.text("Scrapbook_number"),
            page_range: f.text("Scrapbook_pg_range"),
            begin_date,
            end_date,
            height: f.number("Scrapbook_height_cm"),
            width: f.number("Scrapbook_width_cm"),
            depth: f.number("Scrapbook_depth_cm"),
            materiality_desc: f.text("Scrapbook_materiality_desc"),
            notes: f.text("Scrapbook_notes"),
            stats: BookStats::default(),
        })
    }
}

impl FromRecord for Page {
    fn from_record(f: &Fields<'_>) -> ArchiveResult<Self> {
        Ok(Self {
            id: f.required("Page_Id")?,
            number: f.text("Page_number"),
            suffix: f.text("Page_Number_suffix"),
            book_id: f.required("Scrapbook_Id")?,
            desc: f.text("Page_desc"),
            foldout: f.text("Page_foldout"),
            clippings: f.number("Page_clipping_count"),
            clippings_w_metadata: f.number("Page_clipping_w_metadata_count"),
            keywords: f.list("Page_keywords"),
            ukat_keywords: f.list("Page_UKAT_keyword"),
            orientations: f.list("Page_clipping_orientations"),
            orig_material: f.text("Page_original_material"),
            notes: f.text("Page_notes"),
            people_ids: Vec::new(),
            places_ids: Vec::new(),
            sources_ids: Vec::new(),
            people_roles: Default::default(),
            stats: PageStats::default(),
        })
    }
}

impl FromRecord for Person {
    fn from_record(f: &Fields<'_>) -> ArchiveResult<Self> {
        let name = format!(
            "{} {}",
            f.text("Associated_Person_first_name"),
            f.text("Associated_Person_last_name")
        );
        Ok(Self {
            id: f.required("Associated_Person_Id")?,
            name: name.trim().to_string(),
            birth: f.text("Associated_Person_dob"),
            death: f.text("Associated_Person_dod"),
            nationality: f.text("Associated_Person_nationality"),
            gender: f.text("Associated_Person_gender"),
            epithets: f.text("Associated_Person_epithets"),
            addl_names: f.text("Associated_Person_alternate_names"),
            link: f.text("Associated_Person_link"),
            viaf: f.text("Associated_Person_viaf"),
            stats: EntityStats::default(),
        })
    }
}

impl FromRecord for Place {
    fn from_record(f: &Fields<'_>) -> ArchiveResult<Self> {
        Ok(Self {
            id: f.required("Place_Id")?,
            name: f.text("Place_name"),
            addl_names: f.text("Place_name_variations"),
            countries: f.text("Place_name_countries"),
            continent: f.text("Place_name_continents"),
            woeid: f.text("Place_name_WOEID"),
            lat: f.text("Place_name_geonames_lat"),
            long: f.text("Place_name_geonames_long"),
            geolink: f.text("Place_name_geoname_link"),
            stats: EntityStats::default(),
        })
    }
}

impl FromRecord for Source {
    fn from_record(f: &Fields<'_>) -> ArchiveResult<Self> {
        Ok(Self {
            id: f.required("Page_Associated_Sources_Id")?,
            name: f.text("Page_Associated_Sources_name"),
            place: f.text("Page_Associated_Sources_associated_place"),
            date: f.text("Page_Associated_Sources_date"),
            rights_holder: f.text("Page_Associated_Source_rights_holder"),
            source_type: f.text("Page_Associated_Sources_type_of_source"),
            link: f.text("Page_Associated_Sources_link"),
            notes: f.text("Page_Associated_Sources_notes"),
            stats: SourceStats::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person_set(rows: Value) -> RecordSet {
        RecordSet::from_value("people", json!({ "RECORDS": rows })).unwrap()
    }

    #[test]
    fn from_value_reads_records_key() {
        let set = person_set(json!([{ "Associated_Person_Id": "1" }]));
        assert_eq!(set.len(), 1);
        assert_eq!(set.name(), "people");
    }

    #[test]
    fn from_value_accepts_single_other_key() {
        let set = RecordSet::from_value("people", json!({ "rows": [{ "a": "b" }] })).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn from_value_rejects_non_object_rows() {
        let err = RecordSet::from_value("people", json!({ "RECORDS": [1] })).unwrap_err();
        assert!(matches!(err, ArchiveError::MalformedRecordSet { .. }));
    }

    #[test]
    fn from_value_rejects_ambiguous_top_level() {
        let err = RecordSet::from_value("people", json!({ "a": [], "b": [] })).unwrap_err();
        assert!(matches!(err, ArchiveError::MalformedRecordSet { .. }));
    }

    #[test]
    fn non_string_values_are_coerced() {
        let set = RecordSet::from_value(
            "pages",
            json!({ "RECORDS": [{ "Page_clipping_count": 7, "Page_notes": null }] }),
        )
        .unwrap();
        let record = &set.records()[0];
        assert_eq!(record["Page_clipping_count"], "7");
        assert_eq!(record["Page_notes"], "");
    }

    #[test]
    fn split_list_drops_blank_segments() {
        assert_eq!(split_list("Bear, Art"), vec!["Bear", "Art"]);
        assert!(split_list("").is_empty());
        assert_eq!(split_list("Bear, , Art"), vec!["Bear", "Art"]);
    }

    #[test]
    fn numbers_without_digits_stay_blank() {
        let set = RecordSet::from_value(
            "books",
            json!({ "RECORDS": [{
                "Scrapbook_Id": "1",
                "Scrapbook_height_cm": "",
                "Scrapbook_width_cm": "20.5",
                "Scrapbook_depth_cm": "c.4cm",
                "Scrapbook_date_range": "1931-1953"
            }] }),
        )
        .unwrap();
        let books: Collection<Book> = Collection::load(&set).unwrap();
        let book = books.get("1").unwrap();
        assert_eq!(book.height, None);
        assert_eq!(book.width, Some(20.5));
        assert_eq!(book.depth, None);
        assert_eq!(book.begin_date, Some(1931));
        assert_eq!(book.end_date, Some(1953));
    }

    #[test]
    fn missing_required_field_fails_the_set() {
        let set = person_set(json!([
            { "Associated_Person_Id": "1" },
            { "Associated_Person_first_name": "Edwin" }
        ]));
        let err = Collection::<Person>::load(&set).unwrap_err();
        match err {
            ArchiveError::MalformedInput { index, field, .. } => {
                assert_eq!(index, 1);
                assert_eq!(field, "Associated_Person_Id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn collection_sorts_numerically() {
        let set = person_set(json!([
            { "Associated_Person_Id": "10" },
            { "Associated_Person_Id": "2" },
            { "Associated_Person_Id": "1" }
        ]));
        let people: Collection<Person> = Collection::load(&set).unwrap();
        let ids: Vec<&str> = people.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
    }

    #[test]
    fn duplicate_identifier_later_record_wins() {
        let set = person_set(json!([
            { "Associated_Person_Id": "1", "Associated_Person_first_name": "First" },
            { "Associated_Person_Id": "1", "Associated_Person_first_name": "Second" }
        ]));
        let people: Collection<Person> = Collection::load(&set).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people.duplicates().to_vec(), vec!["1".to_string()]);
        assert_eq!(people.get("1").unwrap().name, "Second");
        assert_eq!(people.indexed().count(), 1);
    }

    #[test]
    fn pages_sort_by_book_keeping_input_order() {
        let set = RecordSet::from_value(
            "pages",
            json!({ "RECORDS": [
                { "Page_Id": "3", "Scrapbook_Id": "2" },
                { "Page_Id": "9", "Scrapbook_Id": "1" },
                { "Page_Id": "4", "Scrapbook_Id": "1" }
            ] }),
        )
        .unwrap();
        let pages: Collection<Page> = Collection::load(&set).unwrap();
        let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["9", "4", "3"]);

        let grouped = pages_by_book(&pages);
        assert_eq!(grouped["1"].len(), 2);
        assert_eq!(grouped["2"][0].id, "3");
    }

    #[test]
    fn dedup_ids_orders_numerically() {
        let mut ids = vec!["10".to_string(), "2".to_string(), "10".to_string()];
        dedup_ids(&mut ids);
        assert_eq!(ids, vec!["2", "10"]);
    }

    #[test]
    fn collection_serializes_as_keyed_object() {
        let set = person_set(json!([
            { "Associated_Person_Id": "2", "Associated_Person_first_name": "B" },
            { "Associated_Person_Id": "1", "Associated_Person_first_name": "A" }
        ]));
        let people: Collection<Person> = Collection::load(&set).unwrap();
        let value = serde_json::to_value(&people).unwrap();
        assert_eq!(value["1"]["name"], "A");
        assert_eq!(value["2"]["id"], "2");
        assert!(value["1"]["stats"]["people_on_pages_dict"].is_object());
    }
}
