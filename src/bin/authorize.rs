//! One-time OAuth authorization
//!
//! Walks the account owner through the PIN flow and prints the access token
//! pair for `.env`. Needs `TWITTER_API_KEY` and `TWITTER_API_SECRET`.

use charity::publish::oauth::{ConsumerKeys, PinFlow};
use charity::{Config, Result};
use clap::Parser;
use std::io::{BufRead, Write};

#[derive(Parser)]
#[command(name = "authorize")]
#[command(about = "Obtain an access token for posting free-throw updates", long_about = None)]
struct Cli {
    /// Config file path (for the API base URL)
    #[arg(short, long, default_value = "charity.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if let Err(e) = authorize(&cli.config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn authorize(config_path: &str) -> Result<()> {
    let config = if std::path::Path::new(config_path).exists() {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    let flow = PinFlow::new(ConsumerKeys::from_env()?, &config.publish.api_base)?;
    let request = flow.request_token()?;

    println!("Open this URL while logged in as the posting account:");
    println!("  {}", flow.authorize_url(&request));
    print!("\nPIN: ");
    std::io::stdout().flush()?;

    let mut pin = String::new();
    std::io::stdin().lock().read_line(&mut pin)?;
    if pin.trim().is_empty() {
        return Err(charity::CharityError::Credential("No PIN entered".to_string()));
    }

    let token = flow.access_token(&request, &pin)?;

    println!("\nAdd these to .env (or the job's environment):");
    println!("TWITTER_OAUTH_TOKEN={}", token.token);
    println!("TWITTER_OAUTH_TOKEN_SECRET={}", token.secret);

    Ok(())
}
