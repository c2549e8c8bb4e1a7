//! Post text for a free-throw update

use crate::features::free_throws::{missed_opportunity_points, percentage};
use crate::{CharityError, Config, GameResult, Result, SeasonTotals};
use chrono::NaiveDate;

/// Date formats seen in the schedule: "Thu, Apr 3, 2025" and "2025-04-03"
const DATE_FORMATS: [&str; 2] = ["%a, %b %d, %Y", "%Y-%m-%d"];

/// Formatting knobs for composed messages
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSettings {
    pub team_name: String,
    pub goal_pct: f64,
    /// Decimal places for percentages
    pub precision: usize,
    /// Maximum message length in characters
    pub max_len: usize,
}

impl MessageSettings {
    pub fn from_config(config: &Config) -> Self {
        MessageSettings {
            team_name: config.season.team_name.clone(),
            goal_pct: config.season.goal_pct,
            precision: config.message.precision,
            max_len: config.message.max_len,
        }
    }

    /// Percentage of `made/attempted`, rounded to `precision` places (ties to even)
    fn pct(&self, totals: SeasonTotals) -> String {
        format!("{:.*}", self.precision, percentage(totals.made, totals.attempted))
    }

    /// Goal as a percentage, without decimals when it is a whole number
    fn goal(&self) -> String {
        let goal = self.goal_pct * 100.0;
        if (goal - goal.round()).abs() < 1e-9 {
            format!("{:.0}", goal)
        } else {
            format!("{:.*}", self.precision, goal)
        }
    }
}

/// Reformat a schedule date as "Apr 3"
pub fn format_game_date(date: &str) -> Result<String> {
    let date = date.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
        .map(|d| d.format("%b %-d").to_string())
        .ok_or_else(|| CharityError::DateFormat(date.to_string()))
}

/// What the game would have looked like had the team shot the goal rate.
///
/// Returns `None` when the team met the goal.
fn counterfactual(game: &GameResult, settings: &MessageSettings) -> Option<String> {
    let ft = game.free_throws;
    let magnitude = missed_opportunity_points(ft.made, ft.attempted, settings.goal_pct).abs();
    if magnitude == 0 {
        return None;
    }

    // the extra makes are added to the team's score, so a win only ever widens
    let margin = game.margin() + magnitude;
    let outcome = match margin {
        m if m > 0 => format!("would have won by {}", points(m)),
        m if m < 0 => format!("would have lost by {}", points(-m)),
        _ => "would have tied".to_string(),
    };

    Some(format!(
        " Had {} shot {}% from the line, they {}.",
        settings.team_name,
        settings.goal(),
        outcome
    ))
}

fn points(n: i64) -> String {
    if n == 1 {
        "1 point".to_string()
    } else {
        format!("{} points", n)
    }
}

/// Compose the update for the latest game and the season so far.
///
/// Drops the counterfactual sentence if the message would exceed
/// `settings.max_len`, and truncates with an ellipsis as a last resort.
pub fn compose(
    game: &GameResult,
    season: SeasonTotals,
    consecutive_makes: i64,
    settings: &MessageSettings,
) -> Result<String> {
    let date = format_game_date(&game.date)?;
    let team = &settings.team_name;
    let ft = game.free_throws;

    let mut message = if ft.rate() > settings.goal_pct {
        format!(
            "{} was money at the charity stripe, shooting {} ({}%) against {} on {}!",
            team,
            ft,
            settings.pct(ft),
            game.opponent,
            date
        )
    } else {
        format!(
            "{} shot {} ({}%) from the charity stripe against {} on {}.",
            team,
            ft,
            settings.pct(ft),
            game.opponent,
            date
        )
    };

    message.push_str(&format!(
        " {} has shot {} ({}%) on free throws this season.",
        team,
        season,
        settings.pct(season)
    ));

    if consecutive_makes > 0 {
        message.push_str(&format!(
            " They need to make {} consecutive free throws to reach {}% for the season.",
            consecutive_makes,
            settings.goal()
        ));
    } else {
        message.push_str(&format!(
            " They are at or above {}% for the season.",
            settings.goal()
        ));
    }

    if let Some(extra) = counterfactual(game, settings) {
        if message.chars().count() + extra.chars().count() <= settings.max_len {
            message.push_str(&extra);
        } else {
            log::debug!("Dropping counterfactual to stay within {} characters", settings.max_len);
        }
    }

    if message.chars().count() > settings.max_len {
        log::warn!(
            "Message is {} characters, truncating to {}",
            message.chars().count(),
            settings.max_len
        );
        message = message
            .chars()
            .take(settings.max_len.saturating_sub(1))
            .chain(std::iter::once('…'))
            .collect();
    }

    Ok(message)
}
