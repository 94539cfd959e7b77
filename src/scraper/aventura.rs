//! aventura.bg: a single server-rendered home page whose offer links point at
//! `pochivka/...` and `ekskurzia/...`.

use super::cleaner::{
    absolute_url, destination_from_keywords, element_text, find_by_class, find_next,
    limit_reached, price_with_currency as parse_price, range_text, sel, valid_day_month,
};
use super::http_client::HttpClient;
use super::{AgencyScraper, save_debug_html};
use crate::config::ScraperConfig;
use crate::models::{Agency, RawOffer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

const BASE_URL: &str = "https://aventura.bg";

static OFFER_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/?(pochivka|ekskurzia)/").unwrap());
static TITLE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"tleft-title|tright-title|tr-hotel").unwrap());
static LOC_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"tr-loc").unwrap());
static PRICE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*от\s*\d+[\d\s,.]*€|\s*от\s*\d+[\d\s,.]*лв.*").unwrap()
});
static TEXT_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+[\d\s,.]*)\s*€|(\d+[\d\s,.]*)\s*лв").unwrap());
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}\.\d{1,2}(?:\.\d{2,4})?\b").unwrap());

const DESTINATIONS: &[&str] = &[
    "египет", "дубай", "испания", "турция", "гърция", "италия", "франция", "португалия",
    "хърватия", "черна гора", "albania", "албания", "кипър", "малдиви", "тайланд", "бали",
    "сейшели", "занзибар", "мавриций", "доминикана", "мексико", "куба", "хургада", "шарм",
    "анталия", "бодрум", "родос", "крит", "тенерифе", "малорка", "барселона", "рим", "париж",
    "дубровник", "будва", "котор", "санторини", "миконос",
];

pub struct AventuraScraper {
    client: HttpClient,
    config: ScraperConfig,
}

impl AventuraScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl AgencyScraper for AventuraScraper {
    fn agency(&self) -> Agency {
        Agency::Aventura
    }

    async fn scrape(&self) -> Result<Vec<RawOffer>> {
        info!("Fetching Aventura offers page");
        let html = self
            .client
            .get_text(BASE_URL)
            .await
            .context("Failed to fetch aventura.bg")?;
        save_debug_html(&self.config, "aventura_offers_page.html", &html)?;

        let offers = parse_listing(&html, self.config.limit)?;
        info!("Aventura: {} offers", offers.len());
        Ok(offers)
    }
}

/// Keeps only `dd.mm[.yyyy]` tokens with a plausible day and month, so
/// prices like "05.61" drop out.
pub fn parse_dates(text: &str) -> String {
    let valid: Vec<&str> = DATE_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|d| {
            let mut parts = d.split('.');
            let day = parts.next().and_then(|p| p.parse().ok());
            let month = parts.next().and_then(|p| p.parse().ok());
            matches!((day, month), (Some(d), Some(m)) if valid_day_month(d, m))
        })
        .collect();
    range_text(&valid)
}

pub fn parse_listing(html: &str, limit: usize) -> Result<Vec<RawOffer>> {
    let doc = Html::parse_document(html);
    let a_sel = sel("a[href]")?;
    let span_sel = sel("span")?;
    let date_sel = sel("div[class*=\"tr-date\"]")?;

    let links: Vec<_> = doc
        .select(&a_sel)
        .filter(|a| a.value().attr("href").is_some_and(|h| OFFER_HREF_RE.is_match(h)))
        .collect();
    debug!("Found {} potential offer links", links.len());

    let mut seen = HashSet::new();
    let mut offers = Vec::new();

    for a in links {
        if limit_reached(offers.len(), limit) {
            break;
        }
        let href = a.value().attr("href").unwrap_or_default();
        if !seen.insert(href.to_string()) {
            continue;
        }
        let Some(link) = absolute_url(BASE_URL, href) else {
            continue;
        };

        let text = element_text(&a);
        let raw_title = find_by_class(&a, &["div"], &TITLE_CLASS_RE)
            .map(|e| element_text(&e))
            .unwrap_or_else(|| text.clone());
        let title = PRICE_SUFFIX_RE.replace_all(&raw_title, "").trim().to_string();
        if title.chars().count() < 5 {
            continue;
        }

        let price = match a.select(&span_sel).next() {
            Some(span) => parse_price(&element_text(&span)),
            None => TEXT_PRICE_RE
                .captures(&text)
                .map(|c| match (c.get(1), c.get(2)) {
                    (Some(eur), _) => parse_price(&format!("{} €", eur.as_str())),
                    (None, Some(bgn)) => parse_price(&format!("{} лв", bgn.as_str())),
                    _ => String::new(),
                })
                .unwrap_or_default(),
        };

        let dates = match find_next(&doc, &a, &date_sel) {
            Some(div) => parse_dates(&element_text(&div)),
            None => parse_dates(&text),
        };

        let destination = find_by_class(&a, &["div"], &LOC_CLASS_RE)
            .map(|e| element_text(&e))
            .or_else(|| destination_from_keywords(&format!("{} {}", title, text), DESTINATIONS))
            .unwrap_or_else(|| "Unknown".to_string());

        let mut offer = RawOffer::new(title, link);
        offer.price = price;
        offer.dates = dates;
        offer.destination = destination;
        offers.push(offer);
    }

    Ok(offers)
}
