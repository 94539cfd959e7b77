//! teztour.bg renders its hotel cards client-side, so the listing goes through
//! headless Chrome: load the home page, scroll, press "ПОКАЖИ ОЩЕ", then parse.

use super::browser::BrowserSession;
use super::cleaner::{
    absolute_url, destination_from_map, element_text, find_by_class,
    limit_reached, sel,
};
use super::{AgencyScraper, save_debug_html};
use crate::config::ScraperConfig;
use crate::models::{Agency, RawOffer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://www.teztour.bg/";
const LOAD_MORE_TEXT: &str = "ПОКАЖИ ОЩЕ";

const CARD_SELECTORS: [&str; 8] = [
    "div.hotel-card",
    "div.offer-card",
    "div.hotel-item",
    "div.tour-card",
    "article.hotel",
    "div[class*=\"hotel\"]",
    "div[class*=\"offer\"]",
    "div[class*=\"tour\"]",
];

static PRICE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price|cost|amount").unwrap());
static DATE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)date|period|night").unwrap());
static PRICE_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+\s*(лв|EUR|€)").unwrap());
static DATE_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d{1,2}\.\d{1,2}|нощувки").unwrap());
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}\.\d{1,2}\.?\d{0,4}").unwrap());
static NIGHTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)за\s+(\d+)\s*нощувки?").unwrap());
static PRICE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+\.?\d*)\s*€",
        r"(?i)(\d+\.?\d*)\s*EUR",
        r"(?i)(\d+\.?\d*)\s*(BGN|лв\.?)",
        r"(?i)(\d+\.?\d*)\s*лв",
        r"(\d+\.?\d*)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const DESTINATIONS: &[(&str, &str)] = &[
    ("египет", "Египет"), ("egypt", "Египет"),
    ("турция", "Турция"), ("turkey", "Турция"),
    ("гърция", "Гърция"), ("greece", "Гърция"),
    ("дубай", "Дубай"), ("dubai", "Дубай"),
    ("малдиви", "Малдиви"), ("maldives", "Малдиви"),
    ("тайланд", "Тайланд"), ("thailand", "Тайланд"),
    ("испания", "Испания"), ("spain", "Испания"),
    ("италия", "Италия"), ("italy", "Италия"),
    ("португалия", "Португалия"), ("portugal", "Португалия"),
    ("франция", "Франция"), ("france", "Франция"),
    ("кипър", "Кипър"), ("cyprus", "Кипър"),
    ("черна гора", "Черна гора"), ("montenegro", "Черна гора"),
    ("хърватия", "Хърватия"), ("croatia", "Хърватия"),
    ("мароко", "Мароко"), ("morocco", "Мароко"),
    ("тунис", "Тунис"), ("tunisia", "Тунис"),
    ("занзибар", "Занзибар"), ("zanzibar", "Занзибар"),
    ("анталия", "Турция"), ("antalya", "Турция"),
    ("бодрум", "Турция"), ("bodrum", "Турция"),
    ("белек", "Турция"), ("belek", "Турция"),
];

pub struct TeztourScraper {
    config: ScraperConfig,
}

impl TeztourScraper {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn render_home_page(user_agent: &str) -> Result<String> {
        let session = BrowserSession::launch(user_agent)?;
        let tab = session.new_tab()?;
        session.fetch_page(&tab, BASE_URL, Some("body"), Duration::from_secs(60))?;
        session.scroll_to_bottom(&tab, Duration::from_millis(1500), 5)?;
        match session.click_load_more(&tab, LOAD_MORE_TEXT, 3, Duration::from_secs(2)) {
            Ok(n) => debug!("Load-more clicked {} times", n),
            Err(e) => debug!("Load-more button unavailable: {}", e),
        }
        session.content(&tab)
    }
}

#[async_trait]
impl AgencyScraper for TeztourScraper {
    fn agency(&self) -> Agency {
        Agency::Teztour
    }

    async fn scrape(&self) -> Result<Vec<RawOffer>> {
        let ua = self.config.user_agent.clone();
        let html = tokio::task::spawn_blocking(move || Self::render_home_page(&ua))
            .await
            .context("Browser task panicked")??;

        let offers = parse_listing(&html, self.config.limit)?;
        if offers.is_empty() {
            warn!("Teztour: no offer cards matched any selector");
            save_debug_html(&self.config, "teztour_debug.html", &html)?;
        }
        info!("Teztour: {} offers", offers.len());
        Ok(offers)
    }
}

/// Amount plus currency; the currency is taken from the match when present,
/// otherwise guessed from the whole text.
pub fn parse_price(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    for re in PRICE_PATTERNS.iter() {
        if let Some(c) = re.captures(text) {
            let currency = match c.get(2) {
                Some(cur) => cur.as_str().to_string(),
                None if text.contains('€') || text.to_uppercase().contains("EUR") => "€".to_string(),
                None => "лв.".to_string(),
            };
            return format!("{} {}", &c[1], currency);
        }
    }
    text.to_string()
}

/// First two date tokens, else "N нощувки", else the text unchanged.
pub fn parse_dates(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    let dates: Vec<&str> = DATE_RE.find_iter(text).map(|m| m.as_str()).collect();
    match dates.as_slice() {
        [first, second, ..] => format!("{} - {}", first, second),
        [only] => only.to_string(),
        [] => match NIGHTS_RE.captures(text) {
            Some(c) => format!("{} нощувки", &c[1]),
            None => text.to_string(),
        },
    }
}

/// Parent element of the first text node matching `re`.
fn text_parent<'a>(el: &ElementRef<'a>, re: &Regex) -> Option<ElementRef<'a>> {
    el.descendants()
        .find(|n| n.value().as_text().is_some_and(|t| re.is_match(t)))
        .and_then(|n| n.parent())
        .and_then(ElementRef::wrap)
}

pub fn parse_listing(html: &str, limit: usize) -> Result<Vec<RawOffer>> {
    let doc = Html::parse_document(html);
    let heading_sel = sel("h2, h3, h4, a")?;
    let a_sel = sel("a[href]")?;

    let mut cards = Vec::new();
    for css in CARD_SELECTORS {
        let found: Vec<_> = doc.select(&sel(css)?).collect();
        if !found.is_empty() {
            debug!("Found {} elements with selector: {}", found.len(), css);
            cards = found;
            break;
        }
    }

    let mut offers = Vec::new();
    for card in cards {
        if limit_reached(offers.len(), limit) {
            break;
        }
        let title = card
            .select(&heading_sel)
            .next()
            .map(|h| element_text(&h))
            .unwrap_or_default();
        if title.chars().count() <= 3 {
            continue;
        }

        let link = card
            .select(&a_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|h| absolute_url(BASE_URL, h))
            .unwrap_or_default();

        let price_el = find_by_class(&card, &["span", "div", "p"], &PRICE_CLASS_RE)
            .or_else(|| text_parent(&card, &PRICE_TEXT_RE));
        let price = parse_price(&price_el.map(|e| element_text(&e)).unwrap_or_default());

        let all_text = element_text(&card);
        let date_el = find_by_class(&card, &["span", "div", "p"], &DATE_CLASS_RE)
            .or_else(|| text_parent(&card, &DATE_TEXT_RE));
        let dates = parse_dates(&date_el.map(|e| element_text(&e)).unwrap_or(all_text.clone()));

        let mut offer = RawOffer::new(title.clone(), link);
        offer.price = price;
        offer.dates = dates;
        offer.destination = destination_from_map(&format!("{} {}", title, all_text), DESTINATIONS)
            .unwrap_or_else(|| "Unknown".to_string());
        offers.push(offer);
    }

    Ok(offers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_patterns() {
        assert_eq!(parse_price("от 612 €"), "612 €");
        assert_eq!(parse_price("1450 BGN"), "1450 BGN");
        assert_eq!(parse_price("899 лв."), "899 лв.");
        assert_eq!(parse_price("EUR 350"), "350 €");
        assert_eq!(parse_price("1200"), "1200 лв.");
        assert_eq!(parse_price("по запитване"), "по запитване");
        assert_eq!(parse_price(""), "");
    }

    #[test]
    fn test_parse_dates() {
        assert_eq!(parse_dates("01.11 - 08.11 - 15.11"), "01.11 - 08.11");
        assert_eq!(parse_dates("01.11.2025"), "01.11.2025");
        assert_eq!(parse_dates("Хотел за 7 нощувки"), "7 нощувки");
        assert_eq!(parse_dates("All inclusive"), "All inclusive");
    }

    #[test]
    fn test_parse_listing_first_matching_selector_wins() {
        let html = r#"
          <div class="hotel-card">
            <h3>Rixos Premium Belek</h3>
            <a href="/hotel/rixos-belek">Виж</a>
            <span class="price-value">1020 €</span>
            <p class="period">12.06.2026 - 19.06.2026</p>
          </div>
          <div class="hotel-card">
            <h3>Sunrise Hurghada</h3>
            <a href="https://www.teztour.bg/hotel/sunrise">Виж</a>
            <p>Цена 850 лв за 7 нощувки</p>
          </div>
          <div class="offer-card"><h3>Ignored</h3></div>
          <div class="hotel-card"><h4>Abc</h4></div>
        "#;
        let offers = parse_listing(html, 0).unwrap();
        assert_eq!(offers.len(), 2);

        assert_eq!(offers[0].title, "Rixos Premium Belek");
        assert_eq!(offers[0].link, "https://www.teztour.bg/hotel/rixos-belek");
        assert_eq!(offers[0].price, "1020 €");
        assert_eq!(offers[0].dates, "12.06.2026 - 19.06.2026");
        assert_eq!(offers[0].destination, "Турция");

        assert_eq!(offers[1].price, "850 лв");
        assert_eq!(offers[1].dates, "7 нощувки");
        assert_eq!(offers[1].destination, "Unknown");
    }
}
