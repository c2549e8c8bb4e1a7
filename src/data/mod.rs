//! Data ingestion and storage
//!
//! HTML table extraction, the sports-reference scraper and the season ledger.

pub mod ledger;
pub mod scrapers;
pub mod table;

pub use ledger::Ledger;
pub use scrapers::{SportsReferenceScraper, StatsSource};
