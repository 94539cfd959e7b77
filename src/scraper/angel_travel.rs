//! Angel Travel serves its offers through an iframe widget, so there is no
//! listing to crawl. A raw dump captured from the widget is re-shaped into
//! [`RawOffer`]s instead.

use super::AgencyScraper;
use super::cleaner::Deduper;
use crate::config::ScraperConfig;
use crate::models::{Agency, RawOffer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{info, warn};

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([\d.,]+)\s*лв").unwrap());
static TITLE_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}[./-]\d{1,2}[./-]\d{4}\s*-\s*\d{1,2}[./-]\d{1,2}[./-]\d{4}").unwrap()
});
static TITLE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}[./-]\d{1,2}[./-]\d{4}").unwrap());

const COUNTRIES: &[(&str, &str)] = &[
    ("Albania", "Албания"),
    ("Austria", "Австрия"),
    ("Belgium", "Белгия"),
    ("Bosnia And Herzegovina", "Босна и Херцеговина"),
    ("Croatia", "Хърватия"),
    ("Czech Republic", "Чехия"),
    ("Denmark", "Дания"),
    ("Egypt", "Египет"),
    ("France", "Франция"),
    ("Germany", "Германия"),
    ("Greece", "Гърция"),
    ("Ireland", "Ирландия"),
    ("Italy", "Италия"),
    ("Malta", "Малта"),
    ("Netherlands", "Холандия"),
    ("Portugal", "Португалия"),
    ("Romania", "Румъния"),
    ("Serbia", "Сърбия"),
    ("Spain", "Испания"),
    ("Sweden", "Швеция"),
    ("Switzerland", "Швейцария"),
    ("Tunisia", "Тунис"),
    ("Turkey", "Турция"),
    ("United Kingdom", "Великобритания"),
    ("Bulgaria", "България"),
    ("Montenegro", "Черна гора"),
    ("Slovenia", "Словения"),
    ("Poland", "Полша"),
    ("Hungary", "Унгария"),
    ("Slovakia", "Словакия"),
    ("Ukraine", "Украйна"),
    ("Moldova", "Молдова"),
    ("Cyprus", "Кипър"),
    ("Morocco", "Мароко"),
    ("Israel", "Израел"),
    ("Jordan", "Йордания"),
    ("Lebanon", "Ливан"),
    ("Dubai", "Дубай"),
    ("UAE", "ОАЕ"),
    ("Thailand", "Тайланд"),
    ("Vietnam", "Виетнам"),
    ("China", "Китай"),
    ("Japan", "Япония"),
    ("South Korea", "Южна Корея"),
    ("India", "Индия"),
    ("Indonesia", "Индонезия"),
    ("Malaysia", "Малайзия"),
    ("Singapore", "Сингапур"),
    ("Philippines", "Филипини"),
    ("Australia", "Австралия"),
    ("New Zealand", "Нова Зеландия"),
    ("USA", "САЩ"),
    ("Canada", "Канада"),
    ("Mexico", "Мексико"),
    ("Cuba", "Куба"),
    ("Brazil", "Бразилия"),
    ("Argentina", "Аржентина"),
    ("Peru", "Перу"),
    ("Chile", "Чили"),
    ("South Africa", "Южна Африка"),
    ("Kenya", "Кения"),
    ("Tanzania", "Танзания"),
    ("Madagascar", "Мадагаскар"),
];

/// Cities, regions and widget categories grouped under their country.
const REGIONS: &[(&[&str], &str)] = &[
    (&["Barcelona", "Madrid", "Valencia", "Seville"], "Испания"),
    (
        &[
            "Rome", "Milan", "Venice", "Florence", "Naples", "Sicily", "Calabria", "Campania",
            "Tuscany", "Toscana", "Pulia", "Puglia", "Lake Garda", "Italian Riviera", "Rimini",
            "Excursions Italy",
        ],
        "Италия",
    ),
    (&["Paris", "Lyon", "Nice", "Côte D'Azur", "French Riviera"], "Франция"),
    (
        &[
            "Corfu", "Crete", "Rhodes", "Santorini", "Mykonos", "Zakynthos", "Thassos", "Halkidiki",
            "Peloponnese", "Athens", "Thessaloniki", "Bus Tours",
        ],
        "Гърция",
    ),
    (
        &[
            "Benidorm", "Costa Brava", "Costa Del Sol", "Costa Del Azahar", "Costa Dorada",
            "Mallorca", "Palma De Mallorca", "La Manga", "Ibiza", "Canary Islands", "Tenerife",
            "Excursions Spain",
        ],
        "Испания",
    ),
    (
        &["Antalya", "Side", "Alanya", "Belek", "Bodrum", "Marmaris", "Kusadasi", "Istanbul", "Cappadocia"],
        "Турция",
    ),
    (&["Sharm El Sheikh", "Hurghada", "Marsa Alam", "Cairo", "Alexandria"], "Египет"),
    (&["Latvijas Republika", "Latvia"], "Латвия"),
    (&["North Macedonia", "Macedonia"], "Северна Македония"),
];

pub struct AngelTravelScraper {
    source: PathBuf,
}

impl AngelTravelScraper {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            source: PathBuf::from(&config.angel_raw_path),
        }
    }
}

#[async_trait]
impl AgencyScraper for AngelTravelScraper {
    fn agency(&self) -> Agency {
        Agency::AngelTravel
    }

    async fn scrape(&self) -> Result<Vec<RawOffer>> {
        if !self.source.exists() {
            warn!("Angel Travel: raw dump {} not found", self.source.display());
            return Ok(Vec::new());
        }
        let text = tokio::fs::read_to_string(&self.source)
            .await
            .with_context(|| format!("Failed to read {}", self.source.display()))?;
        let items: Vec<Value> = serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", self.source.display()))?;

        let total = items.len();
        let offers = Deduper::retain_unique(items.iter().filter_map(reshape).collect());
        if offers.len() < total {
            info!("Angel Travel: {} records dropped (untitled or duplicate)", total - offers.len());
        }
        info!("Angel Travel: {} offers", offers.len());
        Ok(offers)
    }
}

fn field(item: &Value, key: &str) -> String {
    match item.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

/// "1250,00 лв." → "1250,00 лв"; anything without лв is kept trimmed.
pub fn clean_price(raw: &str) -> String {
    match PRICE_RE.captures(raw) {
        Some(c) => format!("{} лв", &c[1]),
        None => raw.trim().to_string(),
    }
}

/// Dates from the record, else a range or single date in the title.
pub fn dates_for(raw_dates: &str, title: &str) -> String {
    if !raw_dates.is_empty() && raw_dates != "None" {
        return raw_dates.to_string();
    }
    TITLE_RANGE_RE
        .find(title)
        .or_else(|| TITLE_DATE_RE.find(title))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// English country or region name to its Bulgarian country name; unknown
/// names pass through.
pub fn destination_bg(raw: &str) -> String {
    if let Some((_, bg)) = COUNTRIES.iter().find(|(en, _)| *en == raw) {
        return bg.to_string();
    }
    REGIONS
        .iter()
        .find(|(names, _)| names.contains(&raw))
        .map(|(_, bg)| bg.to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn reshape(item: &Value) -> Option<RawOffer> {
    let title = field(item, "title");
    let link = field(item, "link");
    if title.is_empty() || link.is_empty() {
        return None;
    }
    let mut offer = RawOffer::new(title.clone(), link);
    offer.price = clean_price(&field(item, "price"));
    offer.dates = dates_for(&field(item, "dates"), &title);
    let dest = field(item, "destination");
    if !dest.is_empty() {
        offer.destination = destination_bg(&dest);
    }
    Some(offer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_price() {
        assert_eq!(clean_price("1250,00 лв."), "1250,00 лв");
        assert_eq!(clean_price("от 899 лв / 459.65 EUR"), "899 лв");
        assert_eq!(clean_price(" 450 EUR "), "450 EUR");
    }

    #[test]
    fn test_dates_for() {
        assert_eq!(dates_for("12.06.2026", "x"), "12.06.2026");
        assert_eq!(dates_for("None", "Нова година 30.12.2025 - 02.01.2026"), "30.12.2025 - 02.01.2026");
        assert_eq!(dates_for("", "Уикенд 14.02.2026"), "14.02.2026");
        assert_eq!(dates_for("", "Уикенд в Охрид"), "");
    }

    #[test]
    fn test_destination_bg() {
        assert_eq!(destination_bg("Greece"), "Гърция");
        assert_eq!(destination_bg("Halkidiki"), "Гърция");
        assert_eq!(destination_bg("Costa Brava"), "Испания");
        assert_eq!(destination_bg("Macedonia"), "Северна Македония");
        assert_eq!(destination_bg("Охрид"), "Охрид");
    }

    #[test]
    fn test_reshape_and_dedupe() {
        let dump = json!([
            {"title": "Халкидики - хотел 4*", "link": "https://angeltravel.bg/o/1", "price": "1120 лв.", "dates": null, "destination": "Halkidiki"},
            {"title": "Халкидики - хотел 4*", "link": "https://angeltravel.bg/o/1", "price": "1120 лв."},
            {"title": "", "link": "https://angeltravel.bg/o/2"},
            {"title": "Рим 05.05.2026", "link": "https://angeltravel.bg/o/3", "price": 700, "destination": "Rome"}
        ]);
        let items = dump.as_array().unwrap();
        let offers = Deduper::retain_unique(items.iter().filter_map(reshape).collect());
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].price, "1120 лв");
        assert_eq!(offers[0].dates, "");
        assert_eq!(offers[0].destination, "Гърция");
        assert_eq!(offers[1].price, "700");
        assert_eq!(offers[1].dates, "05.05.2026");
        assert_eq!(offers[1].destination, "Италия");
    }

    #[tokio::test]
    async fn test_missing_dump_yields_nothing() {
        let config = ScraperConfig {
            angel_raw_path: "/nonexistent/angel_travel_raw.json".into(),
            ..ScraperConfig::default()
        };
        let offers = AngelTravelScraper::new(&config).scrape().await.unwrap();
        assert!(offers.is_empty());
    }
}
