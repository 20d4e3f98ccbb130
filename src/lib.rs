//! Scrapstats: join and statistics engine for a scrapbook archive
//!
//! This crate turns the flat JSON exports of a scrapbook collection database
//! (books, pages, people, places, sources and their join tables) into enriched,
//! denormalized JSON documents for a presentation layer:
//!
//! 1. **Load** -- Read each record set and map it onto canonical entities with zeroed stats
//! 2. **Join** -- Materialize page↔person (with roles), page↔place, page↔source and
//!    source↔creator edges as identifier lists on pages and sources
//! 3. **Aggregate** -- Fold page stats into book stats, book stats into collection
//!    stats, then the secondary source-type, role-type and continent tables
//! 4. **Co-occurrence** -- For every person, place and source, the other entities
//!    sharing a page with it and the pages they share
//! 5. **Keyword index** -- Stable keyword IDs and per-keyword association lists
//! 6. **Export** -- One overview document, one document per book, and the people,
//!    places, sources and keyword dictionaries
//!
//! # Invariants
//!
//! - Book counters equal the sum over the book's pages; collection counters equal
//!   the sum over books. [`stats::check_rollups`] re-derives them after aggregation.
//! - Co-occurrence lists are de-duplicated and never list the subject itself.
//! - Keyword IDs are assigned once, from 1, and the two keyword maps are inverses.
//!
//! # Key Modules
//!
//! - [`records`] -- Raw record sets, field coercion and identifier-indexed collections
//! - [`joins`] -- Join exports resolved through the identifier index
//! - [`cooccurrence`] -- Page-based co-occurrence for any subject type
//! - [`stats`] -- Page, book and collection rollups
//! - [`keywords`] -- Keyword registry and keyword index
//! - [`describe`] -- Page description formatters
//! - [`loader`] -- Input files by naming convention
//! - [`pipeline`] -- Phase ordering and the integrity report
//! - [`export`] -- Atomic JSON document writers
//! - [`models`] -- Entity and stats types
//! - [`error`] -- Core error taxonomy
//! - [`config`] -- Field keys, file names and other constants
//!
//! # Example Usage
//!
//! ```bash
//! # Build every document from the 2017-03-01 exports
//! scrapstats build -i exports/ -o site/data/ --date 20170301
//!
//! # Check joins and page/book references without writing anything
//! scrapstats validate -i exports/ --date 20170301
//! ```

pub mod config;
pub mod cooccurrence;
pub mod describe;
pub mod error;
pub mod export;
pub mod joins;
pub mod keywords;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod records;
pub mod stats;

#[cfg(test)]
pub(crate) mod testutil;
