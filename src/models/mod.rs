use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScrapeError;

// ── Agency ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Agency {
    Aratour,
    DariTour,
    Aventura,
    Bohemia,
    Teztour,
    Luxtravel,
    Profitours,
    AngelTravel,
}

impl Agency {
    pub const ALL: [Agency; 8] = [
        Agency::Aratour,
        Agency::DariTour,
        Agency::Aventura,
        Agency::Bohemia,
        Agency::Teztour,
        Agency::Luxtravel,
        Agency::Profitours,
        Agency::AngelTravel,
    ];

    /// Name stored in the `agency` column of unified offers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Agency::Aratour => "Aratur",
            Agency::DariTour => "Dari Tour",
            Agency::Aventura => "Aventura",
            Agency::Bohemia => "Bohemia",
            Agency::Teztour => "Teztour",
            Agency::Luxtravel => "Luxtravel",
            Agency::Profitours => "Profitours",
            Agency::AngelTravel => "Angel Travel",
        }
    }

    /// File the scraper writes into the output dir.
    pub fn raw_file_name(&self) -> &'static str {
        match self {
            Agency::Aratour => "aratur.json",
            Agency::DariTour => "dari_tour_scraped.json",
            Agency::Aventura => "aventura.json",
            Agency::Bohemia => "bohemia.json",
            Agency::Teztour => "teztour.json",
            Agency::Luxtravel => "luxtravel.json",
            Agency::Profitours => "profitours.json",
            Agency::AngelTravel => "angel_travel_scrape.json",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Agency> {
        Agency::ALL.into_iter().find(|a| a.raw_file_name() == name)
    }
}

impl fmt::Display for Agency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Agency {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['_', ' '], "-");
        let agency = match key.as_str() {
            "aratour" | "aratur" => Agency::Aratour,
            "dari-tour" | "daritour" | "dari" => Agency::DariTour,
            "aventura" => Agency::Aventura,
            "bohemia" => Agency::Bohemia,
            "teztour" | "tez-tour" => Agency::Teztour,
            "luxtravel" | "lux-travel" => Agency::Luxtravel,
            "profitours" => Agency::Profitours,
            "angel-travel" | "angeltravel" | "angel" => Agency::AngelTravel,
            _ => return Err(ScrapeError::UnknownAgency(s.to_string())),
        };
        Ok(agency)
    }
}

// ── Raw offer (per-agency JSON) ───────────────────────────────────────────────

/// One scraped record as written by the agency scrapers. Every field is free
/// text and may be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawOffer {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub dates: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub duration: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(rename = "scrapedAt", alias = "scraped_at", default)]
    pub scraped_at: String,
}

impl RawOffer {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            scraped_at: now_stamp(),
            ..Default::default()
        }
    }
}

/// Local timestamp in the format the scrapers write (`2025-11-02T14:03:11.123456`).
pub fn now_stamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

// ── Unified offer ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnifiedOffer {
    pub id: String,
    pub agency: String,
    pub title: String,
    pub destination: String,
    pub price_eur: Option<f64>,
    pub dates_start: Option<NaiveDate>,
    pub dates_end: Option<NaiveDate>,
    pub duration_days: Option<i64>,
    pub link: String,
    pub scraped_at: String,
}
