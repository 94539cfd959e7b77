pub mod angel_travel;
pub mod aratour;
pub mod aventura;
pub mod bohemia;
pub mod browser;
pub mod cleaner;
pub mod dari_tour;
pub mod http_client;
pub mod luxtravel;
pub mod profitours;
pub mod teztour;

use crate::config::{AppConfig, ScraperConfig};
use crate::models::{Agency, RawOffer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

// ── Source trait ──────────────────────────────────────────────────────────────

/// One agency website.
#[async_trait]
pub trait AgencyScraper: Send + Sync {
    fn agency(&self) -> Agency;
    async fn scrape(&self) -> Result<Vec<RawOffer>>;
}

pub fn build_scraper(agency: Agency, config: &AppConfig) -> Result<Box<dyn AgencyScraper>> {
    let sc = &config.scraper;
    let scraper: Box<dyn AgencyScraper> = match agency {
        Agency::Aratour => Box::new(aratour::AratourScraper::new(sc)?),
        Agency::DariTour => Box::new(dari_tour::DariTourScraper::new(sc)?),
        Agency::Aventura => Box::new(aventura::AventuraScraper::new(sc)?),
        Agency::Bohemia => Box::new(bohemia::BohemiaScraper::new(sc)?),
        Agency::Teztour => Box::new(teztour::TeztourScraper::new(sc)),
        Agency::Luxtravel => Box::new(luxtravel::LuxtravelScraper::new(sc)?),
        Agency::Profitours => Box::new(profitours::ProfitoursScraper::new(sc)?),
        Agency::AngelTravel => Box::new(angel_travel::AngelTravelScraper::new(sc)),
    };
    Ok(scraper)
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Pretty JSON, non-ASCII kept as-is.
pub fn save_results(path: &Path, offers: &[RawOffer]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(offers)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    info!("Saved {} offers to {:?}", offers.len(), path);
    Ok(())
}

pub fn load_raw_offers(path: &Path) -> Result<Vec<RawOffer>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid offer JSON in {:?}", path))
}

/// Dump fetched HTML into the debug dir when debug mode is on.
pub fn save_debug_html(config: &ScraperConfig, name: &str, html: &str) -> Result<()> {
    if !config.debug {
        return Ok(());
    }
    std::fs::create_dir_all(&config.debug_dir)
        .with_context(|| format!("Could not create dir {:?}", config.debug_dir))?;
    let path = config.debug_dir.join(name);
    std::fs::write(&path, html).with_context(|| format!("Failed to write {:?}", path))?;
    debug!("Saved debug HTML to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("travel-offers-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_save_and_load_keeps_cyrillic() {
        let path = tmp_dir("save").join("out.json");
        let mut offer = RawOffer::new("Екскурзия до Рим", "https://x.bg/1");
        offer.price = "499 лв.".into();

        save_results(&path, &[offer.clone()]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Екскурзия до Рим"));

        let loaded = load_raw_offers(&path).unwrap();
        assert_eq!(loaded, vec![offer]);
    }

    #[test]
    fn test_debug_html_only_in_debug_mode() {
        let dir = tmp_dir("debug");
        let mut cfg = ScraperConfig {
            debug_dir: dir.join("dev"),
            ..ScraperConfig::default()
        };
        save_debug_html(&cfg, "page.html", "<html></html>").unwrap();
        assert!(!dir.join("dev/page.html").exists());

        cfg.debug = true;
        save_debug_html(&cfg, "page.html", "<html></html>").unwrap();
        assert!(dir.join("dev/page.html").exists());
    }

    #[test]
    fn test_build_every_scraper() {
        let cfg = AppConfig::default();
        for agency in Agency::ALL {
            assert_eq!(build_scraper(agency, &cfg).unwrap().agency(), agency);
        }
    }
}
