/// Key holding the record list in every database export
pub const RECORDS_KEY: &str = "RECORDS";

/// Separator for keyword, controlled-vocabulary and orientation lists
pub const LIST_SEPARATOR: &str = ", ";

/// Route prefix used when turning `|Name [id]|` tags into anchors
pub const PERSON_ROUTE: &str = "/collection/person";

/// Decimal places kept for displayed averages
pub const AVERAGE_SCALE: i64 = 2;

/// Flag values partitioning pages by original material presence
pub const MATERIAL_PRESENT: &str = "Y";
pub const MATERIAL_ABSENT: &str = "N";

/// Foldout flag value
pub const FOLDOUT: &str = "Y";

/// Input file stems, located as `<stem>_<date>.json`
pub const BOOKS_STEM: &str = "Scrapbook";
pub const PAGES_STEM: &str = "Scrapbook_Page";
pub const PEOPLE_STEM: &str = "Page_Associated_People";
pub const PLACES_STEM: &str = "Page_Places_Named";
pub const SOURCES_STEM: &str = "Page_Associated_Sources";
pub const PAGE_PEOPLE_JOIN_STEM: &str = "Page_People_Join";
pub const PAGE_PLACES_JOIN_STEM: &str = "Page_Places_Named_Join";
pub const PAGE_SOURCES_JOIN_STEM: &str = "Page_Associated_Sources_Join";
pub const SOURCE_PEOPLE_JOIN_STEM: &str = "Sources_People_Join";

/// Output document names
pub const COLLECTION_FILE: &str = "wfs_collection_overview.json";
pub const PEOPLE_FILE: &str = "wfs_people.json";
pub const PLACES_FILE: &str = "wfs_places.json";
pub const SOURCES_FILE: &str = "wfs_sources.json";
pub const KEYWORDS_FILE: &str = "wfs_keywords.json";

/// Per-book document name, zero-padded when the book number is numeric
pub fn book_file_name(number: &str) -> String {
    match number.trim().parse::<u32>() {
        Ok(n) => format!("wfs_scrapbook_{:02}.json", n),
        Err(_) => format!("wfs_scrapbook_{}.json", number.trim()),
    }
}

/// Per-book document name for books without a usable number
pub fn book_file_name_by_id(id: &str) -> String {
    format!("wfs_scrapbook_id_{}.json", id.trim())
}
