//! profitours.bg: no stable card markup, so cards are found by class-name
//! keywords with `article` and plain-link fallbacks.

use super::cleaner::{
    absolute_url, class_matches, destination_from_keywords, element_lines, element_text,
    find_by_class, is_non_offer_link, limit_reached, price_with_currency, range_text, sel,
};
use super::http_client::HttpClient;
use super::{AgencyScraper, save_debug_html};
use crate::config::ScraperConfig;
use crate::models::{Agency, RawOffer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

const BASE_URL: &str = "https://www.profitours.bg";

static CARD_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)offer|tour|package|program|card|product").unwrap());
static TITLE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)title|name|head").unwrap());
static PRICE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price|cost|цена").unwrap());
static DATE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)date|time|период|дат").unwrap());
static TEXT_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[\s,]*€|\d+[\s,]*лв").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{2}\.\d{2}\.?\d{0,4}").unwrap());

const LINK_KEYWORDS: [&str; 5] = ["/tour", "/offer", "/program", "/excurs", "/destination"];

const DESTINATIONS: &[&str] = &[
    "египет", "дубай", "испания", "турция", "гърция", "италия", "франция", "португалия",
    "хърватия", "черна гора", "albania", "албания", "кипър", "малдиви", "тайланд", "бали",
    "сейшели", "занзибар", "мавриций", "доминикана", "мексико", "куба", "хургада", "шарм",
    "анталия", "бодрум", "родос", "крит", "тенерифе", "малорка", "барселона", "рим", "париж",
    "дубровник", "будва", "котор", "санторини", "миконос", "мадрид", "лисабон",
];

pub struct ProfitoursScraper {
    client: HttpClient,
    config: ScraperConfig,
}

impl ProfitoursScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl AgencyScraper for ProfitoursScraper {
    fn agency(&self) -> Agency {
        Agency::Profitours
    }

    async fn scrape(&self) -> Result<Vec<RawOffer>> {
        let html = self
            .client
            .get_text(BASE_URL)
            .await
            .context("Failed to fetch profitours.bg")?;
        save_debug_html(&self.config, "profitours_offers_page.html", &html)?;

        let offers = parse_listing(&html, self.config.limit)?;
        info!("Profitours: {} offers", offers.len());
        Ok(offers)
    }
}

pub fn parse_dates(text: &str) -> String {
    let dates: Vec<&str> = DATE_RE.find_iter(text).map(|m| m.as_str()).collect();
    if dates.is_empty() {
        text.trim().to_string()
    } else {
        range_text(&dates)
    }
}

/// Card candidates in fallback order: keyword-classed divs, articles, then
/// links whose path looks like an offer.
fn find_cards<'a>(doc: &'a Html) -> Result<Vec<ElementRef<'a>>> {
    let divs: Vec<_> = doc
        .select(&sel("div[class]")?)
        .filter(|d| class_matches(d, &CARD_CLASS_RE))
        .collect();
    if !divs.is_empty() {
        return Ok(divs);
    }

    let articles: Vec<_> = doc.select(&sel("article")?).collect();
    if !articles.is_empty() {
        return Ok(articles);
    }

    Ok(doc
        .select(&sel("a[href]")?)
        .filter(|a| {
            let href = a.value().attr("href").unwrap_or_default().to_lowercase();
            LINK_KEYWORDS.iter().any(|k| href.contains(k))
        })
        .collect())
}

pub fn parse_listing(html: &str, limit: usize) -> Result<Vec<RawOffer>> {
    let doc = Html::parse_document(html);
    let a_sel = sel("a[href]")?;
    let cards = find_cards(&doc)?;
    debug!("Found {} potential offer elements", cards.len());

    let mut seen = HashSet::new();
    let mut offers = Vec::new();

    for card in cards {
        if limit_reached(offers.len(), limit) {
            break;
        }
        let is_link = card.value().name() == "a";
        let link_el = if is_link { Some(card) } else { card.select(&a_sel).next() };
        let Some(link_el) = link_el else { continue };

        let href = link_el.value().attr("href").unwrap_or_default();
        if href.is_empty() || is_non_offer_link(href) {
            continue;
        }
        let Some(link) = absolute_url(BASE_URL, href) else {
            continue;
        };
        if !seen.insert(link.clone()) {
            continue;
        }

        let text = if is_link {
            card.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|p| matches!(p.value().name(), "div" | "article" | "section"))
                .map(|p| element_text(&p))
                .unwrap_or_else(|| element_text(&card))
        } else {
            element_text(&card)
        };

        let title = match find_by_class(&card, &["h1", "h2", "h3", "h4"], &TITLE_CLASS_RE) {
            Some(h) => element_text(&h),
            None if is_link => element_text(&card),
            None => element_lines(&card)
                .into_iter()
                .next()
                .unwrap_or_else(|| "No title".to_string()),
        };
        if title.chars().count() < 5 {
            continue;
        }

        let price = match find_by_class(&card, &["span", "div", "p"], &PRICE_CLASS_RE) {
            Some(p) => price_with_currency(&element_text(&p)),
            None => TEXT_PRICE_RE
                .find(&text)
                .map(|m| price_with_currency(m.as_str()))
                .unwrap_or_default(),
        };

        let dates = match find_by_class(&card, &["span", "div", "p"], &DATE_CLASS_RE) {
            Some(d) => parse_dates(&element_text(&d)),
            None => parse_dates(&text),
        };

        let mut offer = RawOffer::new(title.clone(), link);
        offer.price = price;
        offer.dates = dates;
        offer.destination = destination_from_keywords(&format!("{} {}", title, text), DESTINATIONS)
            .unwrap_or_else(|| "Unknown".to_string());
        offers.push(offer);
    }

    Ok(offers)
}
