//! Free-throw tracker CLI
//!
//! Scrapes the team's free-throw numbers and posts an update when they change.

use charity::{Config, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "charity")]
#[command(about = "Track a college basketball team's free throws and post updates", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "charity.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check for new data and publish an update
    Run {
        /// Season (year it ends in); defaults to the configured one
        #[arg(long)]
        year: Option<u16>,
        /// Log the message instead of posting it
        #[arg(long)]
        dry_run: bool,
        /// Read page snapshots instead of the network
        #[arg(long)]
        offline: bool,
        /// Directory for page snapshots (written online, read offline)
        #[arg(long)]
        cache: Option<String>,
    },
    /// Compose and print the message without publishing or recording
    Preview {
        #[arg(long)]
        year: Option<u16>,
        #[arg(long)]
        offline: bool,
        #[arg(long)]
        cache: Option<String>,
    },
    /// Show recorded season totals
    Ledger {
        #[arg(long)]
        year: Option<u16>,
    },
    /// Initialize a new project with default config
    Init,
}

fn main() {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Run {
            year,
            dry_run,
            offline,
            cache,
        } => commands::run(&config, year, dry_run, offline, cache),
        Commands::Preview {
            year,
            offline,
            cache,
        } => commands::preview(&config, year, offline, cache),
        Commands::Ledger { year } => commands::ledger(&config, year),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use charity::data::ledger::Ledger;
    use charity::data::scrapers::SportsReferenceScraper;
    use charity::pipeline::{self, RunOutcome};
    use charity::publish::{Channel, DryRunChannel, Publisher, TelegramNotifier, TwitterChannel};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.ledger_dir)?;
        println!("Created {}/ directory", config.data.ledger_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to pick the school and season", config_path);
        println!("  2. Run 'authorize' once and put the printed tokens in .env");
        println!("  3. Run 'charity preview' to check the message");
        println!("  4. Schedule 'charity run' to post updates");

        Ok(())
    }

    fn scraper(config: &Config, offline: bool, cache: Option<String>) -> Result<SportsReferenceScraper> {
        let mut scraper = SportsReferenceScraper::new(&config.season.school)?;

        let cache_dir = cache.or_else(|| {
            Some(config.data.cache_dir.clone()).filter(|dir| !dir.is_empty())
        });
        if let Some(dir) = cache_dir {
            println!("Page snapshots: {}", dir);
            scraper = scraper.with_cache(&dir);
        }

        if offline {
            println!("Offline mode: reading snapshots only");
            scraper = scraper.offline_only(true);
        }

        Ok(scraper)
    }

    pub fn run(
        config: &Config,
        year: Option<u16>,
        dry_run: bool,
        offline: bool,
        cache: Option<String>,
    ) -> Result<()> {
        let year = year.unwrap_or(config.season.year);
        let source = scraper(config, offline, cache)?;
        let ledger = Ledger::new(&config.data.ledger_dir).read_only(dry_run);

        let channel: Box<dyn Channel> = if dry_run {
            println!("Dry run: nothing will be posted");
            Box::new(DryRunChannel)
        } else {
            Box::new(TwitterChannel::from_env(&config.publish.api_base)?)
        };
        let notifier = if dry_run {
            None
        } else {
            TelegramNotifier::from_env()?
        };

        let mut publisher = Publisher::new(channel.as_ref());
        if let Some(n) = notifier.as_ref() {
            publisher = publisher.with_notifier(n);
        }

        match pipeline::run(&source, &ledger, &publisher, config, year)? {
            RunOutcome::Unchanged(totals) => {
                println!("No new data ({} for {})", totals, year);
            }
            RunOutcome::Published { id, message } => {
                println!("Published {}:", id);
                println!("  {}", message);
            }
            RunOutcome::Duplicate { message } => {
                println!("Duplicate, skipped:");
                println!("  {}", message);
            }
        }

        Ok(())
    }

    pub fn preview(
        config: &Config,
        year: Option<u16>,
        offline: bool,
        cache: Option<String>,
    ) -> Result<()> {
        let year = year.unwrap_or(config.season.year);
        let source = scraper(config, offline, cache)?;
        let update = pipeline::preview(&source, config, year)?;

        println!("Season:   {} ({:.1}%)", update.season, update.season.rate() * 100.0);
        println!(
            "Game:     {} vs {} ({}-{}), FT {}",
            update.game.date,
            update.game.opponent,
            update.game.team_score,
            update.game.opponent_score,
            update.game.free_throws
        );
        println!("Needed:   {} consecutive makes", update.consecutive_makes);
        println!("───────────────────────────────");
        println!("{}", update.message);
        println!("({} characters)", update.message.chars().count());

        Ok(())
    }

    pub fn ledger(config: &Config, year: Option<u16>) -> Result<()> {
        let year = year.unwrap_or(config.season.year);
        let ledger = Ledger::new(&config.data.ledger_dir);
        let entries = ledger.entries(year)?;

        println!("Ledger {}", ledger.path(year).display());
        println!("───────────────────────────────");
        if entries.is_empty() {
            println!("  No entries for {}", year);
            return Ok(());
        }

        for entry in &entries {
            println!("  {}  {}/{}", entry.timestamp, entry.made, entry.attempted);
        }
        println!("  {} entries", entries.len());

        Ok(())
    }
}
