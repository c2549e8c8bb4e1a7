//! One periodic run: scrape, detect change, compose, publish, record

use crate::data::ledger::{has_changed, Ledger, LedgerEntry};
use crate::data::scrapers::{last_completed, StatsSource};
use crate::features::free_throws::consecutive_makes_needed;
use crate::publish::{compose, MessageSettings, PublishOutcome, Publisher};
use crate::{CharityError, Config, GameResult, Result, SeasonTotals};

/// A composed update, not yet published
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub season: SeasonTotals,
    pub game: GameResult,
    pub consecutive_makes: i64,
    pub message: String,
}

/// What a run did
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Season totals match the last ledger entry; nothing was fetched beyond them
    Unchanged(SeasonTotals),
    Published { id: String, message: String },
    /// The channel already had this message; the ledger was still updated
    Duplicate { message: String },
}

/// Most recent completed game with its box-score free throws
pub fn latest_game(source: &dyn StatsSource, year: u16) -> Result<GameResult> {
    let schedule = source.schedule(year)?;
    let row = last_completed(&schedule)
        .ok_or_else(|| CharityError::Parse(format!("No completed games in {} schedule", year)))?;

    let link = row.box_score_link.as_deref().ok_or_else(|| {
        CharityError::Parse(format!(
            "No box score link for {} game against {}",
            row.display_date, row.opponent
        ))
    })?;

    // is_completed guarantees both scores
    let (team_score, opponent_score) = match (row.team_score, row.opponent_score) {
        (Some(tm), Some(opp)) => (tm, opp),
        _ => return Err(CharityError::Parse("Completed game without scores".to_string())),
    };

    let free_throws = source.game_free_throws(link)?;
    log::info!(
        "Latest game: {} vs {} ({}-{}), free throws {}",
        row.date,
        row.opponent,
        team_score,
        opponent_score,
        free_throws
    );

    Ok(GameResult {
        opponent: row.opponent.clone(),
        date: row.date.clone(),
        team_score,
        opponent_score,
        free_throws,
    })
}

fn build_update(
    source: &dyn StatsSource,
    season: SeasonTotals,
    config: &Config,
    year: u16,
) -> Result<Update> {
    let settings = MessageSettings::from_config(config);
    let consecutive_makes =
        consecutive_makes_needed(season.made, season.attempted, settings.goal_pct);
    let game = latest_game(source, year)?;
    let message = compose(&game, season, consecutive_makes, &settings)?;

    Ok(Update {
        season,
        game,
        consecutive_makes,
        message,
    })
}

/// Fetch everything and compose the message without touching the ledger
pub fn preview(source: &dyn StatsSource, config: &Config, year: u16) -> Result<Update> {
    let season = source.season_totals(year)?;
    build_update(source, season, config, year)
}

/// Publish an update when season totals moved since the last ledger entry.
///
/// The ledger is appended only once the publisher reports success or a
/// duplicate, so a failed publish is retried by the next run.
pub fn run(
    source: &dyn StatsSource,
    ledger: &Ledger,
    publisher: &Publisher<'_>,
    config: &Config,
    year: u16,
) -> Result<RunOutcome> {
    let season = source.season_totals(year)?;
    let previous = ledger.read_last(year);

    if !has_changed(previous, season) {
        log::info!("No new data: season totals still {}", season);
        return Ok(RunOutcome::Unchanged(season));
    }

    match previous {
        Some(prev) => log::info!("Season totals changed: {} -> {}", prev, season),
        None => log::info!("No ledger entry for {}, recording {}", year, season),
    }

    let update = build_update(source, season, config, year)?;
    log::debug!("Composed: {}", update.message);

    let outcome = publisher.publish(&update.message)?;
    ledger.append(&LedgerEntry::now(season), year)?;

    Ok(match outcome {
        PublishOutcome::Published { id } => RunOutcome::Published {
            id,
            message: update.message,
        },
        PublishOutcome::Duplicate => RunOutcome::Duplicate {
            message: update.message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::{Channel, Notifier, PostReceipt};
    use crate::ScheduleRow;
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    const YEAR: u16 = 2025;

    struct FakeSource {
        season: Cell<SeasonTotals>,
        schedule: Vec<ScheduleRow>,
        box_score_requests: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn new(made: u32, attempted: u32) -> Self {
            FakeSource {
                season: Cell::new(SeasonTotals::new(made, attempted).unwrap()),
                schedule: vec![
                    schedule_row("2025-03-01", Some(70), Some(65), Some("/cbb/boxscores/2025-03-01-19-kansas.html")),
                    schedule_row("2025-03-04", Some(60), Some(71), Some("/cbb/boxscores/2025-03-04-19-cincinnati.html")),
                    schedule_row("Sat, Mar 8, 2025", None, None, None),
                ],
                box_score_requests: RefCell::new(Vec::new()),
            }
        }
    }

    fn schedule_row(date: &str, tm: Option<u32>, opp: Option<u32>, link: Option<&str>) -> ScheduleRow {
        ScheduleRow {
            date: date.to_string(),
            display_date: date.to_string(),
            time: "7:00p".to_string(),
            opponent: "Kansas".to_string(),
            team_score: tm,
            opponent_score: opp,
            box_score_link: link.map(String::from),
        }
    }

    impl StatsSource for FakeSource {
        fn season_totals(&self, _year: u16) -> Result<SeasonTotals> {
            Ok(self.season.get())
        }

        fn schedule(&self, _year: u16) -> Result<Vec<ScheduleRow>> {
            Ok(self.schedule.clone())
        }

        fn game_free_throws(&self, link: &str) -> Result<SeasonTotals> {
            self.box_score_requests.borrow_mut().push(link.to_string());
            SeasonTotals::new(12, 20)
        }
    }

    #[derive(Default)]
    struct FakeChannel {
        posts: RefCell<Vec<String>>,
        fail: bool,
    }

    impl Channel for FakeChannel {
        fn latest_post(&self) -> Result<Option<String>> {
            Ok(self.posts.borrow().last().cloned())
        }

        fn post(&self, text: &str) -> Result<PostReceipt> {
            if self.fail {
                return Err(CharityError::RateLimited { reset: Some(1741100000) });
            }
            self.posts.borrow_mut().push(text.to_string());
            Ok(PostReceipt {
                id: format!("post-{}", self.posts.borrow().len()),
            })
        }
    }

    struct BrokenNotifier;

    impl Notifier for BrokenNotifier {
        fn notify(&self, _text: &str) -> Result<()> {
            Err(CharityError::Publish {
                status: 502,
                body: "bad gateway".to_string(),
            })
        }
    }

    #[test]
    fn test_first_run_publishes_and_records() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path());
        let source = FakeSource::new(412, 571);
        let channel = FakeChannel::default();
        let publisher = Publisher::new(&channel);

        let outcome = run(&source, &ledger, &publisher, &Config::default(), YEAR).unwrap();
        match outcome {
            RunOutcome::Published { id, message } => {
                assert_eq!(id, "post-1");
                assert!(message.starts_with("UC shot 12/20 (60.0%) from the charity stripe against Kansas on Mar 4."));
            }
            other => panic!("expected a post, got {:?}", other),
        }

        assert_eq!(ledger.read_last(YEAR), Some(SeasonTotals::new(412, 571).unwrap()));
        assert_eq!(
            source.box_score_requests.borrow().as_slice(),
            ["/cbb/boxscores/2025-03-04-19-cincinnati.html"]
        );
    }

    #[test]
    fn test_unchanged_totals_do_nothing() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path());
        let source = FakeSource::new(412, 571);
        let channel = FakeChannel::default();
        let publisher = Publisher::new(&channel);

        run(&source, &ledger, &publisher, &Config::default(), YEAR).unwrap();
        let outcome = run(&source, &ledger, &publisher, &Config::default(), YEAR).unwrap();

        assert_eq!(outcome, RunOutcome::Unchanged(SeasonTotals::new(412, 571).unwrap()));
        assert_eq!(channel.posts.borrow().len(), 1);
        assert_eq!(ledger.entries(YEAR).unwrap().len(), 1);
        // only the first run looked at the box score
        assert_eq!(source.box_score_requests.borrow().len(), 1);
    }

    #[test]
    fn test_duplicate_message_still_records_totals() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path());
        let source = FakeSource::new(412, 571);
        let channel = FakeChannel::default();
        let publisher = Publisher::new(&channel);

        let update = preview(&source, &Config::default(), YEAR).unwrap();
        channel.posts.borrow_mut().push(update.message.clone());

        let outcome = run(&source, &ledger, &publisher, &Config::default(), YEAR).unwrap();
        assert_eq!(outcome, RunOutcome::Duplicate { message: update.message });
        assert_eq!(channel.posts.borrow().len(), 1);
        assert_eq!(ledger.entries(YEAR).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_publish_leaves_ledger_untouched() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path());
        let source = FakeSource::new(412, 571);
        let channel = FakeChannel {
            fail: true,
            ..Default::default()
        };
        let publisher = Publisher::new(&channel);

        let result = run(&source, &ledger, &publisher, &Config::default(), YEAR);
        assert!(matches!(result, Err(CharityError::RateLimited { reset: Some(_) })));
        assert!(ledger.read_last(YEAR).is_none());
    }

    #[test]
    fn test_notifier_failure_does_not_fail_run() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path());
        let source = FakeSource::new(412, 571);
        let channel = FakeChannel::default();
        let notifier = BrokenNotifier;
        let publisher = Publisher::new(&channel).with_notifier(&notifier);

        let outcome = run(&source, &ledger, &publisher, &Config::default(), YEAR).unwrap();
        assert!(matches!(outcome, RunOutcome::Published { .. }));
        assert!(ledger.read_last(YEAR).is_some());
    }

    #[test]
    fn test_changed_totals_publish_again() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path());
        let source = FakeSource::new(412, 571);
        let channel = FakeChannel::default();
        let publisher = Publisher::new(&channel);

        run(&source, &ledger, &publisher, &Config::default(), YEAR).unwrap();
        source.season.set(SeasonTotals::new(424, 591).unwrap());
        let outcome = run(&source, &ledger, &publisher, &Config::default(), YEAR).unwrap();

        assert!(matches!(outcome, RunOutcome::Published { .. }));
        assert_eq!(ledger.entries(YEAR).unwrap().len(), 2);
        assert_eq!(ledger.read_last(YEAR), Some(SeasonTotals::new(424, 591).unwrap()));
    }

    #[test]
    fn test_no_completed_game() {
        let mut source = FakeSource::new(0, 0);
        source.schedule = vec![schedule_row("Sat, Nov 8, 2025", None, None, None)];
        assert!(matches!(latest_game(&source, YEAR), Err(CharityError::Parse(_))));
    }
}
