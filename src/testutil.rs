use crate::models::{Book, BookStats, EntityStats, Page, PageStats, Person, Place, Source, SourceStats};
use crate::records::Collection;

pub fn page(id: &str, book_id: &str, clippings: u32, keywords: &[&str]) -> Page {
    Page {
        id: id.to_string(),
        number: id.to_string(),
        suffix: String::new(),
        book_id: book_id.to_string(),
        desc: String::new(),
        foldout: "N".to_string(),
        clippings: Some(clippings),
        clippings_w_metadata: Some(0),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        ukat_keywords: Vec::new(),
        orientations: Vec::new(),
        orig_material: String::new(),
        notes: String::new(),
        people_ids: Vec::new(),
        places_ids: Vec::new(),
        sources_ids: Vec::new(),
        people_roles: Default::default(),
        stats: PageStats::default(),
    }
}

pub fn pages(items: Vec<Page>) -> Collection<Page> {
    Collection::from_entities("pages", items)
}

pub fn book(id: &str) -> Book {
    Book {
        id: id.to_string(),
        number: id.to_string(),
        page_range: String::new(),
        begin_date: None,
        end_date: None,
        height: None,
        width: None,
        depth: None,
        materiality_desc: String::new(),
        notes: String::new(),
        stats: BookStats::default(),
    }
}

pub fn person(id: &str, nationality: &str, gender: &str) -> Person {
    Person {
        id: id.to_string(),
        name: format!("Person {}", id),
        birth: String::new(),
        death: String::new(),
        nationality: nationality.to_string(),
        gender: gender.to_string(),
        epithets: String::new(),
        addl_names: String::new(),
        link: String::new(),
        viaf: String::new(),
        stats: EntityStats::default(),
    }
}

pub fn place(id: &str, continent: &str) -> Place {
    Place {
        id: id.to_string(),
        name: format!("Place {}", id),
        addl_names: String::new(),
        countries: String::new(),
        continent: continent.to_string(),
        woeid: String::new(),
        lat: String::new(),
        long: String::new(),
        geolink: String::new(),
        stats: EntityStats::default(),
    }
}

pub fn source(id: &str, source_type: &str) -> Source {
    Source {
        id: id.to_string(),
        name: format!("Source {}", id),
        place: String::new(),
        date: String::new(),
        rights_holder: String::new(),
        source_type: source_type.to_string(),
        link: String::new(),
        notes: String::new(),
        stats: SourceStats::default(),
    }
}
