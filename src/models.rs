use crate::keywords::KeywordRegistry;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Value → occurrence count, emitted in key order
pub type FrequencyTable = BTreeMap<String, u64>;

/// Key → identifier list, emitted in key order
pub type IdIndex = BTreeMap<String, Vec<String>>;

/// Serializes a coerced numeric field, writing `""` where the export held no number.
pub fn blank_if_none<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

/// Identifier list on a page that a subject can be matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageField {
    People,
    Places,
    Sources,
    Keywords,
}

/// People, places and sources seen on the same pages as a subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cooccurrence {
    pub people_ids: Vec<String>,
    pub places_ids: Vec<String>,
    pub sources_ids: Vec<String>,
    #[serde(rename = "people_on_pages_dict")]
    pub people_on_pages: IdIndex,
    #[serde(rename = "places_on_pages_dict")]
    pub places_on_pages: IdIndex,
    #[serde(rename = "sources_on_pages_dict")]
    pub sources_on_pages: IdIndex,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityStats {
    #[serde(flatten)]
    pub cooccurrence: Cooccurrence,
    pub keywords_ids: Vec<String>,
    pub ukat_keywords_ids: Vec<String>,
    pub book_and_page_ids: IdIndex,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceStats {
    #[serde(flatten)]
    pub entity: EntityStats,
    pub creators: Vec<String>,
    pub creators_notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub birth: String,
    pub death: String,
    pub nationality: String,
    pub gender: String,
    pub epithets: String,
    pub addl_names: String,
    pub link: String,
    pub viaf: String,
    pub stats: EntityStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub addl_names: String,
    pub countries: String,
    pub continent: String,
    pub woeid: String,
    pub lat: String,
    pub long: String,
    pub geolink: String,
    pub stats: EntityStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub place: String,
    pub date: String,
    pub rights_holder: String,
    pub source_type: String,
    pub link: String,
    pub notes: String,
    pub stats: SourceStats,
}

/// Attribute tallies over the people, places and sources on one page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageStats {
    pub people_nationalities: FrequencyTable,
    pub people_genders: FrequencyTable,
    pub people_epithets: FrequencyTable,
    pub sources_places: FrequencyTable,
    pub sources_rights_holders: FrequencyTable,
    pub continent_counts: FrequencyTable,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub id: String,
    pub number: String,
    pub suffix: String,
    pub book_id: String,
    pub desc: String,
    pub foldout: String,
    #[serde(serialize_with = "blank_if_none")]
    pub clippings: Option<u32>,
    #[serde(serialize_with = "blank_if_none")]
    pub clippings_w_metadata: Option<u32>,
    pub keywords: Vec<String>,
    pub ukat_keywords: Vec<String>,
    pub orientations: Vec<String>,
    pub orig_material: String,
    pub notes: String,
    pub people_ids: Vec<String>,
    pub places_ids: Vec<String>,
    pub sources_ids: Vec<String>,
    pub people_roles: IdIndex,
    pub stats: PageStats,
}

impl Page {
    pub fn ids(&self, field: PageField) -> &[String] {
        match field {
            PageField::People => &self.people_ids,
            PageField::Places => &self.places_ids,
            PageField::Sources => &self.sources_ids,
            PageField::Keywords => &self.keywords,
        }
    }

    pub fn is_foldout(&self) -> bool {
        self.foldout == crate::config::FOLDOUT
    }
}

/// Pages split by their original-material flag.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaterialPartition {
    #[serde(rename = "Y")]
    pub present: Vec<String>,
    #[serde(rename = "N")]
    pub absent: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BookStats {
    pub pages: u64,
    pub pages_foldouts: u64,
    pub pages_foldouts_list: Vec<String>,
    /// `None` when the book has no pages to average over
    pub avg_clipping_per_page: Option<String>,
    pub clippings: u64,
    pub clippings_w_metadata: u64,
    pub keyword_count_dict: FrequencyTable,
    pub keyword_to_page_dict: IdIndex,
    pub clipping_orientation_to_page_dict: IdIndex,
    pub clipping_orientation_page_counts: FrequencyTable,
    pub orig_material_counts: FrequencyTable,
    pub pages_w_orig_material_dict: MaterialPartition,

    pub people_ids: Vec<String>,
    pub places_ids: Vec<String>,
    pub sources_ids: Vec<String>,
    pub people_ids_dict: FrequencyTable,
    pub places_ids_dict: FrequencyTable,
    pub sources_ids_dict: FrequencyTable,

    pub role_type_counts: FrequencyTable,
    pub roles_by_people_ids: IdIndex,
    pub continent_counts: FrequencyTable,
    pub source_type_counts: FrequencyTable,
}

#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: String,
    pub number: String,
    #[serde(rename = "pages")]
    pub page_range: String,
    #[serde(serialize_with = "blank_if_none")]
    pub begin_date: Option<i32>,
    #[serde(serialize_with = "blank_if_none")]
    pub end_date: Option<i32>,
    #[serde(serialize_with = "blank_if_none")]
    pub height: Option<f64>,
    #[serde(serialize_with = "blank_if_none")]
    pub width: Option<f64>,
    #[serde(serialize_with = "blank_if_none")]
    pub depth: Option<f64>,
    pub materiality_desc: String,
    pub notes: String,
    pub stats: BookStats,
}

/// Rollups over every book in the collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionStats {
    pub pages: u64,
    pub pages_foldouts: u64,
    pub clippings: u64,
    pub clippings_w_metadata: u64,
    /// `None` when the collection has no books to average over
    pub avg_clippings_per_book: Option<String>,
    pub keyword_count_dict: FrequencyTable,
    pub keyword_to_book_dict: IdIndex,
    #[serde(flatten)]
    pub keywords: KeywordRegistry,
    pub total_date_range: Vec<i32>,
    pub people_ids_dict: FrequencyTable,
    pub places_ids_dict: FrequencyTable,
    pub sources_ids_dict: FrequencyTable,

    pub source_type_counts: FrequencyTable,
    pub role_type_counts: FrequencyTable,
    pub roles_by_people_ids: IdIndex,
    pub continent_counts: FrequencyTable,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct KeywordStats {
    #[serde(flatten)]
    pub cooccurrence: Cooccurrence,
    /// IDs of other keywords sharing a page with this one
    #[serde(rename = "keywords")]
    pub keyword_ids: Vec<String>,
}

/// A registered keyword and the books, pages and entities it is attached to.
#[derive(Debug, Clone, Serialize)]
pub struct Keyword {
    #[serde(skip)]
    pub id: String,
    pub keyword: String,
    pub books: Vec<String>,
    pub pages: Vec<String>,
    pub people: Vec<String>,
    pub places: Vec<String>,
    pub sources: Vec<String>,
    pub stats: KeywordStats,
}

impl Keyword {
    pub fn new(id: String, keyword: String) -> Self {
        Self {
            id,
            keyword,
            books: Vec::new(),
            pages: Vec::new(),
            people: Vec::new(),
            places: Vec::new(),
            sources: Vec::new(),
            stats: KeywordStats::default(),
        }
    }
}
