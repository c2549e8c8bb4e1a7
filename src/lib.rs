//! Free-throw tracking for a college basketball team
//!
//! Scrapes season and game free-throw totals from sports-reference.com, keeps an
//! append-only ledger of season totals and posts an update whenever they change.

pub mod data;
pub mod features;
pub mod pipeline;
pub mod publish;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Season-to-date (or single game) free-throw counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonTotals {
    pub made: u32,
    pub attempted: u32,
}

impl SeasonTotals {
    /// Build totals, rejecting more makes than attempts
    pub fn new(made: u32, attempted: u32) -> Result<Self> {
        if made > attempted {
            return Err(CharityError::Parse(format!(
                "free throws made ({}) exceeds attempts ({})",
                made, attempted
            )));
        }
        Ok(SeasonTotals { made, attempted })
    }

    /// Fraction of attempts made (0.0 when nothing was attempted)
    pub fn rate(&self) -> f64 {
        features::free_throws::shooting_rate(self.made, self.attempted)
    }
}

impl fmt::Display for SeasonTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.made, self.attempted)
    }
}

/// One row of the season schedule table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    /// ISO date recovered from the box score link, or the verbose text when unavailable
    pub date: String,
    /// Date as displayed on the site, e.g. "Thu, Apr 3, 2025"
    pub display_date: String,
    pub time: String,
    pub opponent: String,
    pub team_score: Option<u32>,
    pub opponent_score: Option<u32>,
    pub box_score_link: Option<String>,
}

impl ScheduleRow {
    /// A game is completed once both scores are posted
    pub fn is_completed(&self) -> bool {
        self.team_score.is_some() && self.opponent_score.is_some()
    }
}

/// Most recent completed game with its free-throw line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub opponent: String,
    pub date: String,
    pub team_score: u32,
    pub opponent_score: u32,
    pub free_throws: SeasonTotals,
}

impl GameResult {
    /// Returns the score margin (positive = team won)
    pub fn margin(&self) -> i64 {
        self.team_score as i64 - self.opponent_score as i64
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum CharityError {
    #[error("Failed to fetch {url}: HTTP {status}")]
    Fetch { status: u16, url: String },

    #[error("Table not found: #{0}")]
    TableNotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unrecognized date format: {0:?}")]
    DateFormat(String),

    #[error("Missing credential: {0}")]
    Credential(String),

    #[error("Publishing failed with HTTP {status}: {body}")]
    Publish { status: u16, body: String },

    #[error("Rate limited by publishing API (resets at {})", reset.map(|r| r.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    RateLimited { reset: Option<i64> },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ledger error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CharityError>;

/// Application configuration loaded from charity.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub season: SeasonConfig,
    pub message: MessageConfig,
    pub data: DataConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    /// Season identified by the calendar year it ends in
    pub year: u16,
    /// sports-reference school slug, e.g. "cincinnati"
    pub school: String,
    /// Name used in posted messages
    pub team_name: String,
    pub goal_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Decimal places for percentages
    pub precision: usize,
    pub max_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub ledger_dir: String,
    /// Directory for page snapshots used by offline runs; empty disables them
    #[serde(default)]
    pub cache_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    pub api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            season: SeasonConfig {
                year: 2025,
                school: "cincinnati".to_string(),
                team_name: "UC".to_string(),
                goal_pct: 0.75,
            },
            message: MessageConfig {
                precision: 1,
                max_len: 280,
            },
            data: DataConfig {
                ledger_dir: "data".to_string(),
                cache_dir: String::new(),
            },
            publish: PublishConfig {
                api_base: "https://api.twitter.com".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CharityError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| CharityError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CharityError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let goal = self.season.goal_pct;
        if !(goal > 0.0 && goal < 1.0) {
            return Err(CharityError::Config(format!(
                "season.goal_pct must be strictly between 0 and 1, got {}",
                goal
            )));
        }
        if self.season.school.trim().is_empty() {
            return Err(CharityError::Config("season.school is empty".to_string()));
        }
        if self.message.max_len == 0 {
            return Err(CharityError::Config("message.max_len must be positive".to_string()));
        }
        Ok(())
    }
}
