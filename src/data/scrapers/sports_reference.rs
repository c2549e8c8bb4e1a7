//! sports-reference.com scraper for college basketball free throws
//!
//! Reads three page kinds: the season page (team totals), the season schedule
//! and per-game box scores. Supports caching HTML files for offline runs.

use super::StatsSource;
use crate::data::table::{extract_table, TableLayout, TableRow, PLAYER_LABEL};
use crate::{CharityError, Result, ScheduleRow, SeasonTotals};
use regex::Regex;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};

pub const BASE_URL: &str = "https://www.sports-reference.com";

const TOTALS_TABLE: &str = "season-total_totals";
const SCHEDULE_TABLE: &str = "schedule";

/// Row label of the team line on the season totals table
const TEAM_ROW: &str = "Team";
/// Row label of the team line on a box score
const BOX_SCORE_TOTALS_ROW: &str = "School Totals";

/// On-disk snapshots of fetched pages, one file per URL.
///
/// Written on every online fetch; read back only by offline runs.
#[derive(Debug, Clone)]
struct PageSnapshots {
    dir: PathBuf,
}

impl PageSnapshots {
    /// `https://host/cbb/schools/x/men/2025.html` -> `host_cbb_schools_x_men_2025.html`
    fn file_for(&self, url: &str) -> PathBuf {
        let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        let name: String = without_scheme
            .chars()
            .map(|c| if matches!(c, '/' | '?' | '&' | '=') { '_' } else { c })
            .collect();
        self.dir.join(name)
    }

    fn read(&self, url: &str) -> Result<String> {
        let path = self.file_for(url);
        log::debug!("Reading snapshot {}", path.display());
        std::fs::read_to_string(&path).map_err(|e| {
            CharityError::Config(format!(
                "No usable snapshot of {} at {} (offline mode): {}",
                url,
                path.display(),
                e
            ))
        })
    }

    fn write(&self, url: &str, html: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.file_for(url);
        std::fs::write(&path, html)?;
        log::debug!("Wrote snapshot {}", path.display());
        Ok(())
    }
}

/// Scraper for sports-reference.com college basketball pages
pub struct SportsReferenceScraper {
    client: reqwest::blocking::Client,
    school: String,
    base_url: String,
    snapshots: Option<PageSnapshots>,
    /// Serve pages from snapshots only, never the network
    offline_only: bool,
}

impl SportsReferenceScraper {
    pub fn new(school: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("charity/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(SportsReferenceScraper {
            client,
            school: school.to_string(),
            base_url: BASE_URL.to_string(),
            snapshots: None,
            offline_only: false,
        })
    }

    /// Keep a snapshot of every fetched page in `dir`
    pub fn with_cache<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.snapshots = Some(PageSnapshots {
            dir: dir.as_ref().to_path_buf(),
        });
        self
    }

    /// Read pages from the snapshot directory instead of the network
    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    pub fn season_url(&self, year: u16) -> String {
        format!("{}/cbb/schools/{}/men/{}.html", self.base_url, self.school, year)
    }

    pub fn schedule_url(&self, year: u16) -> String {
        format!(
            "{}/cbb/schools/{}/men/{}-schedule.html",
            self.base_url, self.school, year
        )
    }

    /// Box score links on the schedule are site-relative
    pub fn box_score_url(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}{}", self.base_url, link)
        }
    }

    /// Page body from the network, or from snapshots in offline mode.
    ///
    /// Online runs never read snapshots, so change detection always sees the
    /// live page.
    fn fetch_page(&self, url: &str) -> Result<String> {
        if self.offline_only {
            let snapshots = self.snapshots.as_ref().ok_or_else(|| {
                CharityError::Config("Offline mode needs a cache directory".to_string())
            })?;
            return snapshots.read(url);
        }

        log::info!("Fetching {}", url);

        let response = self.client.get(url).send()?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(CharityError::Fetch {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response.text()?;

        if let Some(snapshots) = &self.snapshots {
            if let Err(e) = snapshots.write(url, &html) {
                log::warn!("Failed to snapshot {}: {}", url, e);
            }
        }

        Ok(html)
    }
}

impl StatsSource for SportsReferenceScraper {
    fn season_totals(&self, year: u16) -> Result<SeasonTotals> {
        let html = self.fetch_page(&self.season_url(year))?;
        let totals = parse_season_totals(&html)?;
        log::info!("Season {} free throws: {}", year, totals);
        Ok(totals)
    }

    fn schedule(&self, year: u16) -> Result<Vec<ScheduleRow>> {
        let html = self.fetch_page(&self.schedule_url(year))?;
        let rows = parse_schedule(&html)?;
        log::info!("Parsed {} scheduled games for {}", rows.len(), year);
        Ok(rows)
    }

    fn game_free_throws(&self, box_score_link: &str) -> Result<SeasonTotals> {
        let html = self.fetch_page(&self.box_score_url(box_score_link))?;
        parse_box_score(&html, &self.school)
    }
}

/// Team free-throw totals from the season page
pub fn parse_season_totals(html: &str) -> Result<SeasonTotals> {
    let rows = extract_table(html, TOTALS_TABLE, TableLayout::new(0, true))?;
    let team = find_player_row(&rows, TEAM_ROW, TOTALS_TABLE)?;
    SeasonTotals::new(parse_count(team, "FT")?, parse_count(team, "FTA")?)
}

/// Team free-throw line from a box score page
pub fn parse_box_score(html: &str, school: &str) -> Result<SeasonTotals> {
    let table_id = format!("box-score-basic-{}", school);
    // first row is the "Basic Box Score Stats" over-header
    let rows = extract_table(html, &table_id, TableLayout::new(1, true))?;
    let totals = find_player_row(&rows, BOX_SCORE_TOTALS_ROW, &table_id)?;
    SeasonTotals::new(parse_count(totals, "FT")?, parse_count(totals, "FTA")?)
}

/// Every game on the schedule page, in site order.
///
/// Header rows repeated inside the table body are skipped.
pub fn parse_schedule(html: &str) -> Result<Vec<ScheduleRow>> {
    let rows = extract_table(html, SCHEDULE_TABLE, TableLayout::new(0, false))?;

    if let Some(first) = rows.first() {
        for label in ["Date", "Opponent", "Tm", "Opp"] {
            if first.cell(label).is_none() {
                return Err(CharityError::Parse(format!(
                    "Schedule table has no {:?} column",
                    label
                )));
            }
        }
    }

    let iso_date = Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap();

    let mut schedule = Vec::new();
    for row in &rows {
        let display_date = row.text("Date").unwrap_or_default().to_string();
        if display_date.is_empty() || display_date == "Date" {
            continue;
        }

        let box_score_link = row.link("Date").map(str::to_string);
        let date = box_score_link
            .as_deref()
            .and_then(|link| iso_date.captures(link))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| display_date.clone());

        schedule.push(ScheduleRow {
            date,
            display_date,
            time: row.text("Time").unwrap_or_default().to_string(),
            opponent: row.text("Opponent").unwrap_or_default().to_string(),
            team_score: parse_score(row, "Tm")?,
            opponent_score: parse_score(row, "Opp")?,
            box_score_link,
        });
    }

    Ok(schedule)
}

fn find_player_row<'a>(rows: &'a [TableRow], player: &str, table_id: &str) -> Result<&'a TableRow> {
    rows.iter()
        .find(|row| row.text(PLAYER_LABEL) == Some(player))
        .ok_or_else(|| {
            CharityError::Parse(format!("No {:?} row in table #{}", player, table_id))
        })
}

fn parse_count(row: &TableRow, label: &str) -> Result<u32> {
    let text = row
        .text(label)
        .ok_or_else(|| CharityError::Parse(format!("Missing {:?} column", label)))?;
    text.parse()
        .map_err(|_| CharityError::Parse(format!("{:?} is not a count in column {:?}", text, label)))
}

/// Blank until the game is played
fn parse_score(row: &TableRow, label: &str) -> Result<Option<u32>> {
    match row.text(label) {
        None | Some("") => Ok(None),
        Some(_) => parse_count(row, label).map(Some),
    }
}
