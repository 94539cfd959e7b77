mod analyze;
mod config;
mod enrich;
mod error;
mod fix;
mod models;
mod normalize;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::fix::Fixer;
use crate::models::Agency;
use crate::pipeline::Pipeline;
use crate::storage::Repository;

#[derive(Parser)]
#[command(name = "travel-offers", about = "Bulgarian travel agency offer scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape agencies into raw JSON files (all agencies when none given)
    Scrape {
        agencies: Vec<Agency>,

        /// Max offers per agency; 0 means no limit
        #[arg(short, long)]
        limit: Option<usize>,

        /// Skip Bohemia date enrichment
        #[arg(long)]
        no_enrich: bool,

        #[arg(long)]
        batch_size: Option<usize>,

        #[arg(long)]
        browser_concurrency: Option<usize>,

        /// Read ambiguous dot dates as MM.DD
        #[arg(long)]
        dot_mmdd: bool,

        /// Save fetched pages under the debug dir
        #[arg(long)]
        debug: bool,
    },

    /// Merge raw agency files into unified_offers.json
    Process,

    /// Rebuild the DuckDB offers table from unified_offers.json
    CreateDb,

    /// Data-quality report for one agency's raw file
    Analyze { agency: Agency },

    /// Repair the Aratour raw file
    Fix {
        /// Offline title-based fixes only
        #[arg(long = "final")]
        final_pass: bool,
    },

    /// Scrape every agency, process and load the database
    Run,

    /// Show database statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "bg_travel_offers=info,warn",
        1 => "bg_travel_offers=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Scrape {
            agencies,
            limit,
            no_enrich,
            batch_size,
            browser_concurrency,
            dot_mmdd,
            debug,
        } => {
            if let Some(limit) = limit {
                config.scraper.limit = limit;
            }
            if let Some(n) = batch_size {
                config.enrich.batch_size = n;
            }
            if let Some(n) = browser_concurrency {
                config.enrich.browser_concurrency = n;
            }
            config.enrich.enabled &= !no_enrich;
            config.enrich.dot_mmdd |= dot_mmdd;
            config.scraper.debug |= debug;

            let agencies = if agencies.is_empty() {
                Agency::ALL.to_vec()
            } else {
                agencies
            };
            let stats = Pipeline::new(config).scrape(&agencies).await?;
            info!(
                "Done: {} agencies, {} offers, {} errors",
                stats.agencies_scraped, stats.offers_scraped, stats.errors
            );
        }

        Command::Process => {
            let n = Pipeline::new(config).process()?;
            info!("Done: {} unified offers", n);
        }

        Command::CreateDb => {
            Pipeline::new(config).create_db()?;
        }

        Command::Analyze { agency } => {
            let report_path = config.output.dir.join(analyze::REPORT_FILE);
            analyze::run(&config.raw_path(agency), agency, &report_path)?;
        }

        Command::Fix { final_pass } => {
            let _t = utils::Timer::start("Fixing Aratour data");
            let fixer = Fixer::new(&config)?;
            if final_pass {
                let s = fixer.run_final()?;
                info!(
                    "Done: {} destinations, {} date ranges fixed, {} high prices to review",
                    s.destinations_fixed,
                    s.dates_fixed,
                    s.high_prices.len()
                );
            } else {
                let s = fixer.run().await?;
                info!(
                    "Done: {} refetched, {} ranges extended, {} destinations cleared, {} high prices to review",
                    s.refetched,
                    s.ranges_extended,
                    s.destinations_cleared,
                    s.high_prices.len()
                );
            }
        }

        Command::Run => {
            let _t = utils::Timer::start("Full pipeline");
            let stats = Pipeline::new(config).run_all().await?;
            info!("{:?}", stats);
        }

        Command::Stats => {
            let repo = Repository::open(&config.storage.db_path)?;
            let offers = repo.offer_count()?;
            let per_agency = repo.agency_counts()?;
            let (min, max) = repo.date_range().unwrap_or((None, None));
            println!("─────────────────────────────────");
            println!("  Travel offers — Database Stats");
            println!("─────────────────────────────────");
            println!("  Offers   : {}", utils::fmt_number(offers));
            for (agency, n) in &per_agency {
                println!(
                    "    {:<14}: {} ({})",
                    agency,
                    utils::fmt_number(*n),
                    utils::fmt_percent(*n as usize, offers as usize)
                );
            }
            println!("  From     : {}", min.map(|d| d.to_string()).unwrap_or("—".into()));
            println!("  To       : {}", max.map(|d| d.to_string()).unwrap_or("—".into()));
            println!("─────────────────────────────────");
        }
    }

    Ok(())
}
