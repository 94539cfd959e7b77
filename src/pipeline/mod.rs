//! Pipeline orchestrator: scrapers → raw JSON → unified JSON → DuckDB.
//!
//! ## Stages
//!
//! `scrape()` runs the selected agency scrapers concurrently (bounded by
//!   `scraper.concurrency`), enriches Bohemia offers with real dates and writes
//!   one raw JSON file per agency.
//!
//! `process()` merges whatever raw files exist into `unified_offers.json`.
//!
//! `create_db()` rebuilds the `offers` table from the unified file.
//!
//! `run_all()` chains the three for every agency.

use crate::config::AppConfig;
use crate::enrich::DateEnricher;
use crate::models::Agency;
use crate::normalize::{Normalizer, load_mappings, load_unified, save_unified};
use crate::scraper::{build_scraper, save_results};
use crate::storage::Repository;
use crate::utils::Timer;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn scrape(&self, agencies: &[Agency]) -> Result<PipelineStats> {
        let _t = Timer::start(format!("Scraping {} agencies", agencies.len()));
        let config = Arc::new(self.config.clone());
        let sem = Arc::new(Semaphore::new(self.config.scraper.concurrency.max(1)));
        let mut handles = Vec::new();

        for &agency in agencies {
            let config = Arc::clone(&config);
            let sem = Arc::clone(&sem);

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await?;
                let scraper = build_scraper(agency, &config)
                    .with_context(|| format!("Failed to build {} scraper", agency))?;
                info!("=== {} ===", scraper.agency());
                let mut offers = scraper
                    .scrape()
                    .await
                    .with_context(|| format!("{} scrape failed", agency))?;

                let mut enriched = 0;
                if agency == Agency::Bohemia && config.enrich.enabled && !offers.is_empty() {
                    let enricher = DateEnricher::new(&config.scraper, &config.enrich)?;
                    enriched = enricher.enrich_offers_with_dates(&mut offers).await.enriched();
                }

                save_results(&config.raw_path(agency), &offers)?;
                Ok::<(usize, usize), anyhow::Error>((offers.len(), enriched))
            });

            handles.push((agency, handle));
        }

        let mut stats = PipelineStats::default();
        for (agency, handle) in handles {
            match handle.await {
                Ok(Ok((n, enriched))) => {
                    stats.agencies_scraped += 1;
                    stats.offers_scraped += n;
                    stats.offers_enriched += enriched;
                }
                Ok(Err(e)) => {
                    warn!("{}: {:#}", agency, e);
                    stats.errors += 1;
                }
                Err(e) => {
                    error!("Task panic for {}: {}", agency, e);
                    stats.errors += 1;
                }
            }
        }

        info!(
            "=== Scrape done: {} agencies | {} offers | {} enriched | {} errors ===",
            stats.agencies_scraped, stats.offers_scraped, stats.offers_enriched, stats.errors
        );
        Ok(stats)
    }

    /// Merge every raw agency file into the unified JSON. Returns the number
    /// of offers kept.
    pub fn process(&self) -> Result<usize> {
        let _t = Timer::start("Processing offers");
        let mappings = load_mappings(&self.config.output.mappings_path);
        info!("{} destination mappings loaded", mappings.len());

        let paths: Vec<_> = Agency::ALL.iter().map(|&a| self.config.raw_path(a)).collect();
        let unified = Normalizer::new(mappings).process_files(&paths);
        save_unified(&self.config.unified_path(), &unified)?;
        Ok(unified.len())
    }

    /// Rebuild the offers table from the unified JSON.
    pub fn create_db(&self) -> Result<usize> {
        let _t = Timer::start("Loading DuckDB");
        let unified_path = self.config.unified_path();
        let offers = load_unified(&unified_path)
            .with_context(|| format!("Run `process` first to create {}", unified_path.display()))?;

        let repo = Repository::open(&self.config.storage.db_path)
            .context("Failed to open DuckDB")?;
        repo.recreate()?;
        let n = repo.load_offers(&offers)?;
        info!(
            "Database {} created with {} offers",
            self.config.storage.db_path.display(),
            n
        );
        Ok(n)
    }

    pub async fn run_all(&self) -> Result<PipelineStats> {
        let mut stats = self.scrape(&Agency::ALL).await?;
        stats.offers_unified = self.process()?;
        stats.offers_loaded = self.create_db()?;

        let repo = Repository::open(&self.config.storage.db_path)?;
        let (min_date, max_date) = repo.date_range().unwrap_or((None, None));
        info!(
            "=== Done: {} scraped | {} unified | {} in DB | {} errors | dates {:?} → {:?} ===",
            stats.offers_scraped,
            stats.offers_unified,
            stats.offers_loaded,
            stats.errors,
            min_date,
            max_date,
        );
        Ok(stats)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PipelineStats {
    pub agencies_scraped: usize,
    pub offers_scraped: usize,
    pub offers_enriched: usize,
    pub offers_unified: usize,
    pub offers_loaded: usize,
    pub errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config_in(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.output.dir = dir.to_path_buf();
        config.output.mappings_path = dir.join("destination_mappings.json");
        config.storage.db_path = dir.join("travel_offers.duckdb");
        config.scraper.angel_raw_path = dir.join("angel_travel_raw.json");
        config
    }

    fn tmp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("travel-pipeline-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_scrape_writes_raw_file() {
        let dir = tmp_dir();
        std::fs::write(
            dir.join("angel_travel_raw.json"),
            r#"[{"title": "Коледа в Прага", "link": "https://angeltravel.bg/o/1", "price": "899 лв.", "destination": "Czech Republic"}]"#,
        )
        .unwrap();

        let pipeline = Pipeline::new(config_in(&dir));
        let stats = pipeline.scrape(&[Agency::AngelTravel]).await.unwrap();
        assert_eq!(stats.agencies_scraped, 1);
        assert_eq!(stats.offers_scraped, 1);
        assert_eq!(stats.errors, 0);
        assert!(dir.join("angel_travel_scrape.json").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_process_and_create_db() {
        let dir = tmp_dir();
        std::fs::write(
            dir.join("destination_mappings.json"),
            r#"{"чехия": "Czech Republic"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("angel_travel_scrape.json"),
            r#"[
              {"title": "Коледа в Прага", "link": "https://angeltravel.bg/o/1", "price": "899 лв", "dates": "", "destination": "Чехия", "scrapedAt": "2025-11-01T10:00:00"},
              {"title": "Промо", "link": "https://angeltravel.bg/o/2", "price": "", "dates": "", "destination": "", "scrapedAt": ""}
            ]"#,
        )
        .unwrap();

        let pipeline = Pipeline::new(config_in(&dir));
        assert_eq!(pipeline.process().unwrap(), 1);

        let unified = load_unified(&dir.join("unified_offers.json")).unwrap();
        assert_eq!(unified[0].agency, "Angel Travel");
        assert_eq!(unified[0].destination, "Czech Republic");
        assert_eq!(unified[0].price_eur, Some(459.65));
        assert_eq!(unified[0].dates_start.map(|d| d.to_string()).as_deref(), Some("2025-12-25"));

        assert_eq!(pipeline.create_db().unwrap(), 1);
        let repo = Repository::open(&dir.join("travel_offers.duckdb")).unwrap();
        assert_eq!(repo.offer_count().unwrap(), 1);
        drop(repo);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_create_db_without_unified_file_fails() {
        let dir = tmp_dir();
        assert!(Pipeline::new(config_in(&dir)).create_db().is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
