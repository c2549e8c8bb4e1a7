//! Web scrapers for free-throw data

pub mod sports_reference;

use crate::{Result, ScheduleRow, SeasonTotals};

pub use sports_reference::SportsReferenceScraper;

/// Anything that can supply the three pages the pipeline reads
pub trait StatsSource {
    /// Team free-throw totals for the season so far
    fn season_totals(&self, year: u16) -> Result<SeasonTotals>;

    /// Every scheduled game of the season, played or not, in site order
    fn schedule(&self, year: u16) -> Result<Vec<ScheduleRow>>;

    /// Team free-throw line for one game, given its box score link
    fn game_free_throws(&self, box_score_link: &str) -> Result<SeasonTotals>;
}

/// The last completed game in schedule order
pub fn last_completed(schedule: &[ScheduleRow]) -> Option<&ScheduleRow> {
    schedule.iter().rev().find(|row| row.is_completed())
}
